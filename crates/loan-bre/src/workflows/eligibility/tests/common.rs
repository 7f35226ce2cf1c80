use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::eligibility::configuration::{
    Lender, LenderConfig, RateTier, ScoreWeights,
};
use crate::workflows::eligibility::domain::{
    CoApplicantFinancials, EmploymentType, LeadId, LeadProfile, LeadStatus,
    LenderAssignmentHistory, LenderId, LoanType, StudentAcademics, TestKind, TestScore,
    UniversityChoice, UniversityTier,
};
use crate::workflows::eligibility::evaluation::{EligibilityPolicy, EligibilityScore};
use crate::workflows::eligibility::insights::InsightThresholds;
use crate::workflows::eligibility::ranking::RecommendationResult;
use crate::workflows::eligibility::repository::{
    ConfigurationStore, EligibilityStore, LeadRepository, RepositoryError,
};
use crate::workflows::eligibility::{
    eligibility_router, AdminRolePolicy, BatchPolicy, BatchRecompute, EligibilityApi,
    RecommendationService, RecomputeQueue, TriggerPolicy,
};

pub(super) type TestService = RecommendationService<MemoryLeads, MemoryConfiguration, MemoryStore>;

/// University S (95), 80% with GRE 320 (79), well-paid salaried co-applicant (100): overall 92.
pub(super) fn strong_lead(id: &str) -> LeadProfile {
    LeadProfile {
        lead_id: LeadId(id.to_string()),
        status: LeadStatus::InProgress,
        loan_amount: Some(2_000_000),
        study_destination: Some("USA".to_string()),
        loan_type: Some(LoanType::Unsecured),
        loan_classification: Some("masters".to_string()),
        intake_month: Some(9),
        intake_year: Some(2026),
        universities: vec![UniversityChoice {
            university_id: "uni-cmu".to_string(),
            name: "Carnegie Mellon University".to_string(),
            reference_tier: Some(UniversityTier::S),
        }],
        student: StudentAcademics {
            percentage: Some(80.0),
            cgpa: None,
            cgpa_scale: None,
            test_scores: vec![TestScore {
                kind: TestKind::Gre,
                score: 320.0,
            }],
        },
        co_applicant: CoApplicantFinancials {
            monthly_salary: Some(200_000),
            existing_emi: Some(0),
            employment_type: Some(EmploymentType::Salaried),
            years_in_current_job: Some(6.0),
        },
        assigned_lender: None,
    }
}

/// University C (50), 50% without tests (35), thin co-applicant income (22): overall 37.
pub(super) fn weak_lead(id: &str) -> LeadProfile {
    LeadProfile {
        loan_amount: Some(3_000_000),
        universities: vec![UniversityChoice {
            university_id: "uni-regional".to_string(),
            name: "Regional State College".to_string(),
            reference_tier: Some(UniversityTier::C),
        }],
        student: StudentAcademics {
            percentage: Some(50.0),
            ..StudentAcademics::default()
        },
        co_applicant: CoApplicantFinancials {
            monthly_salary: Some(20_000),
            existing_emi: Some(5_000),
            employment_type: Some(EmploymentType::Salaried),
            years_in_current_job: Some(2.0),
        },
        ..strong_lead(id)
    }
}

pub(super) fn lead_without_amount(id: &str) -> LeadProfile {
    LeadProfile {
        loan_amount: None,
        ..strong_lead(id)
    }
}

pub(super) fn lender(id: &str, name: &str) -> Lender {
    Lender::onboard(LenderId(id.to_string()), name)
}

/// Same rules as the default lender but a cheaper excellent tier.
pub(super) fn premium_lender(id: &str, name: &str) -> Lender {
    let mut lender = lender(id, name);
    lender.config.rate_config.excellent = RateTier {
        min_rate: 8.0,
        max_rate: 9.0,
        score_threshold: 90,
    };
    lender
}

/// Grades the strong lead's university as B (65), dropping its overall score to 80.
pub(super) fn conservative_lender(id: &str, name: &str) -> Lender {
    let mut lender = lender(id, name);
    lender
        .config
        .university_grade_mapping
        .overrides
        .insert("uni-cmu".to_string(), UniversityTier::B);
    lender
}

pub(super) fn capped_lender(id: &str, name: &str, max_loan_amount: u64) -> Lender {
    let mut lender = lender(id, name);
    lender.config.max_loan_amount = max_loan_amount;
    lender
}

pub(super) fn uk_only_lender(id: &str, name: &str) -> Lender {
    let mut lender = lender(id, name);
    lender.config.supported_destinations = vec!["UK".to_string()];
    lender
}

#[derive(Default)]
pub(super) struct MemoryLeads {
    leads: Mutex<BTreeMap<LeadId, LeadProfile>>,
    malformed: Mutex<BTreeSet<LeadId>>,
    fetch_latency: Mutex<Duration>,
}

impl MemoryLeads {
    pub(super) fn with(leads: Vec<LeadProfile>) -> Self {
        let store = Self::default();
        for lead in leads {
            store.insert(lead);
        }
        store
    }

    pub(super) fn insert(&self, lead: LeadProfile) {
        self.leads
            .lock()
            .unwrap()
            .insert(lead.lead_id.clone(), lead);
    }

    /// Makes every fetch block the calling thread, like a synchronous CRM client.
    pub(super) fn slow_fetches(&self, latency: Duration) {
        *self.fetch_latency.lock().unwrap() = latency;
    }

    pub(super) fn mark_malformed(&self, id: &str) {
        self.malformed.lock().unwrap().insert(LeadId(id.to_string()));
    }

    pub(super) fn get(&self, id: &str) -> LeadProfile {
        self.leads
            .lock()
            .unwrap()
            .get(&LeadId(id.to_string()))
            .cloned()
            .expect("lead seeded")
    }
}

impl LeadRepository for MemoryLeads {
    fn fetch(&self, id: &LeadId) -> Result<Option<LeadProfile>, RepositoryError> {
        let latency = *self.fetch_latency.lock().unwrap();
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        if self.malformed.lock().unwrap().contains(id) {
            return Err(RepositoryError::Malformed(format!(
                "lead {id} has an unparseable financial section"
            )));
        }
        Ok(self.leads.lock().unwrap().get(id).cloned())
    }

    fn non_terminal(&self, limit: usize) -> Result<Vec<LeadId>, RepositoryError> {
        Ok(self
            .leads
            .lock()
            .unwrap()
            .values()
            .filter(|lead| !lead.status.is_terminal())
            .map(|lead| lead.lead_id.clone())
            .take(limit)
            .collect())
    }

    fn assign_lender(&self, id: &LeadId, lender: &LenderId) -> Result<(), RepositoryError> {
        let mut leads = self.leads.lock().unwrap();
        let lead = leads.get_mut(id).ok_or(RepositoryError::NotFound)?;
        lead.assigned_lender = Some(lender.clone());
        Ok(())
    }
}

pub(super) struct MemoryConfiguration {
    lenders: Mutex<Vec<Lender>>,
    weights: Mutex<ScoreWeights>,
}

impl MemoryConfiguration {
    pub(super) fn with(lenders: Vec<Lender>) -> Self {
        Self {
            lenders: Mutex::new(lenders),
            weights: Mutex::new(ScoreWeights::default()),
        }
    }

    /// Bypasses validation, as a hand-edited row in the config table would.
    pub(super) fn force_weights(&self, weights: ScoreWeights) {
        *self.weights.lock().unwrap() = weights;
    }

    pub(super) fn active_lender_config(&self, id: &str) -> LenderConfig {
        self.lenders
            .lock()
            .unwrap()
            .iter()
            .find(|lender| lender.id.0 == id)
            .map(|lender| lender.config.clone())
            .expect("lender seeded")
    }

    pub(super) fn force_lender_config(&self, id: &str, config: LenderConfig) {
        let mut lenders = self.lenders.lock().unwrap();
        let lender = lenders
            .iter_mut()
            .find(|lender| lender.id.0 == id)
            .expect("lender seeded");
        lender.config = config;
    }
}

impl ConfigurationStore for MemoryConfiguration {
    fn active_lenders(&self) -> Result<Vec<Lender>, RepositoryError> {
        Ok(self
            .lenders
            .lock()
            .unwrap()
            .iter()
            .filter(|lender| lender.active)
            .cloned()
            .collect())
    }

    fn lender(&self, id: &LenderId) -> Result<Option<Lender>, RepositoryError> {
        Ok(self
            .lenders
            .lock()
            .unwrap()
            .iter()
            .find(|lender| &lender.id == id)
            .cloned())
    }

    fn score_weights(&self) -> Result<ScoreWeights, RepositoryError> {
        Ok(*self.weights.lock().unwrap())
    }

    fn save_score_weights(&self, weights: ScoreWeights) -> Result<(), RepositoryError> {
        *self.weights.lock().unwrap() = weights;
        Ok(())
    }

    fn save_lender_config(
        &self,
        id: &LenderId,
        config: LenderConfig,
    ) -> Result<u64, RepositoryError> {
        let mut lenders = self.lenders.lock().unwrap();
        let lender = lenders
            .iter_mut()
            .find(|lender| &lender.id == id)
            .ok_or(RepositoryError::NotFound)?;
        lender.config = config;
        lender.config_revision += 1;
        Ok(lender.config_revision)
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    scores: Mutex<HashMap<LeadId, EligibilityScore>>,
    recommendations: Mutex<HashMap<LeadId, RecommendationResult>>,
    history: Mutex<Vec<LenderAssignmentHistory>>,
    pub(super) score_writes: Mutex<usize>,
    failing_appends: Mutex<usize>,
}

impl MemoryStore {
    pub(super) fn score(&self, id: &str) -> Option<EligibilityScore> {
        self.scores
            .lock()
            .unwrap()
            .get(&LeadId(id.to_string()))
            .cloned()
    }

    pub(super) fn writes(&self) -> usize {
        *self.score_writes.lock().unwrap()
    }

    /// The next `count` history appends fail as if the audit store were down.
    pub(super) fn fail_next_appends(&self, count: usize) {
        *self.failing_appends.lock().unwrap() = count;
    }
}

impl EligibilityStore for MemoryStore {
    fn upsert_score(&self, score: EligibilityScore) -> Result<(), RepositoryError> {
        *self.score_writes.lock().unwrap() += 1;
        self.scores
            .lock()
            .unwrap()
            .insert(score.lead_id.clone(), score);
        Ok(())
    }

    fn fetch_score(&self, lead: &LeadId) -> Result<Option<EligibilityScore>, RepositoryError> {
        Ok(self.scores.lock().unwrap().get(lead).cloned())
    }

    fn save_recommendation(&self, result: RecommendationResult) -> Result<(), RepositoryError> {
        self.recommendations
            .lock()
            .unwrap()
            .insert(result.lead_id.clone(), result);
        Ok(())
    }

    fn fetch_recommendation(
        &self,
        lead: &LeadId,
    ) -> Result<Option<RecommendationResult>, RepositoryError> {
        Ok(self.recommendations.lock().unwrap().get(lead).cloned())
    }

    fn append_assignment(&self, entry: LenderAssignmentHistory) -> Result<(), RepositoryError> {
        let mut failing = self.failing_appends.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(RepositoryError::Unavailable("audit store offline".to_string()));
        }
        self.history.lock().unwrap().push(entry);
        Ok(())
    }

    fn assignment_history(
        &self,
        lead: &LeadId,
    ) -> Result<Vec<LenderAssignmentHistory>, RepositoryError> {
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| &entry.lead_id == lead)
            .cloned()
            .collect())
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) leads: Arc<MemoryLeads>,
    pub(super) configuration: Arc<MemoryConfiguration>,
    pub(super) store: Arc<MemoryStore>,
}

pub(super) fn build_service(leads: Vec<LeadProfile>, lenders: Vec<Lender>) -> Harness {
    let leads = Arc::new(MemoryLeads::with(leads));
    let configuration = Arc::new(MemoryConfiguration::with(lenders));
    let store = Arc::new(MemoryStore::default());
    let service = Arc::new(RecommendationService::new(
        leads.clone(),
        configuration.clone(),
        store.clone(),
        EligibilityPolicy::default(),
        InsightThresholds::default(),
    ));
    Harness {
        service,
        leads,
        configuration,
        store,
    }
}

pub(super) fn default_harness() -> Harness {
    build_service(
        vec![strong_lead("lead-1"), weak_lead("lead-2")],
        vec![
            lender("credila", "Credila"),
            conservative_lender("avanse", "Avanse"),
        ],
    )
}

pub(super) fn fast_batch_policy() -> BatchPolicy {
    BatchPolicy {
        inter_lead_delay: Duration::ZERO,
        ..BatchPolicy::default()
    }
}

pub(super) fn fast_trigger_policy() -> TriggerPolicy {
    TriggerPolicy {
        debounce: Duration::from_millis(30),
        ..TriggerPolicy::default()
    }
}

pub(super) fn api_router(harness: &Harness) -> axum::Router {
    let api = EligibilityApi {
        service: harness.service.clone(),
        queue: RecomputeQueue::new(
            harness.service.clone(),
            fast_trigger_policy(),
            tokio::runtime::Handle::current(),
        ),
        batch: BatchRecompute::new(
            harness.service.clone(),
            Arc::new(AdminRolePolicy),
            fast_batch_policy(),
        ),
    };
    eligibility_router(Arc::new(api))
}

pub(super) async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&body).expect("json body");
    (status, value)
}
