use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use loan_bre::config::EngineConfig;
use loan_bre::workflows::eligibility::{
    CoApplicantFinancials, ConfigurationStore, EligibilityScore, EligibilityStore,
    EmploymentType, LeadId, LeadProfile, LeadRepository, LeadStatus, Lender,
    LenderAssignmentHistory, LenderConfig, LenderId, LoanType, RateConfig, RateTier,
    RecommendationResult, RecommendationService, RepositoryError, ScoreWeights,
    StudentAcademics, TestKind, TestScore, UniversityChoice, UniversityTier,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type DemoService = RecommendationService<
    InMemoryLeadRepository,
    InMemoryConfigurationStore,
    InMemoryEligibilityStore,
>;

#[derive(Default, Clone)]
pub(crate) struct InMemoryLeadRepository {
    leads: Arc<Mutex<Vec<LeadProfile>>>,
}

impl InMemoryLeadRepository {
    pub(crate) fn seeded(leads: Vec<LeadProfile>) -> Self {
        Self {
            leads: Arc::new(Mutex::new(leads)),
        }
    }
}

impl LeadRepository for InMemoryLeadRepository {
    fn fetch(&self, id: &LeadId) -> Result<Option<LeadProfile>, RepositoryError> {
        let guard = self.leads.lock().expect("lead mutex poisoned");
        Ok(guard.iter().find(|lead| &lead.lead_id == id).cloned())
    }

    fn non_terminal(&self, limit: usize) -> Result<Vec<LeadId>, RepositoryError> {
        let guard = self.leads.lock().expect("lead mutex poisoned");
        Ok(guard
            .iter()
            .filter(|lead| !lead.status.is_terminal())
            .take(limit)
            .map(|lead| lead.lead_id.clone())
            .collect())
    }

    fn assign_lender(&self, id: &LeadId, lender: &LenderId) -> Result<(), RepositoryError> {
        let mut guard = self.leads.lock().expect("lead mutex poisoned");
        let lead = guard
            .iter_mut()
            .find(|lead| &lead.lead_id == id)
            .ok_or(RepositoryError::NotFound)?;
        lead.assigned_lender = Some(lender.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub(crate) struct InMemoryConfigurationStore {
    lenders: Arc<Mutex<Vec<Lender>>>,
    weights: Arc<Mutex<ScoreWeights>>,
}

impl InMemoryConfigurationStore {
    pub(crate) fn seeded(lenders: Vec<Lender>) -> Self {
        Self {
            lenders: Arc::new(Mutex::new(lenders)),
            weights: Arc::new(Mutex::new(ScoreWeights::default())),
        }
    }
}

impl ConfigurationStore for InMemoryConfigurationStore {
    fn active_lenders(&self) -> Result<Vec<Lender>, RepositoryError> {
        let guard = self.lenders.lock().expect("lender mutex poisoned");
        Ok(guard.iter().filter(|lender| lender.active).cloned().collect())
    }

    fn lender(&self, id: &LenderId) -> Result<Option<Lender>, RepositoryError> {
        let guard = self.lenders.lock().expect("lender mutex poisoned");
        Ok(guard.iter().find(|lender| &lender.id == id).cloned())
    }

    fn score_weights(&self) -> Result<ScoreWeights, RepositoryError> {
        Ok(*self.weights.lock().expect("weights mutex poisoned"))
    }

    fn save_score_weights(&self, weights: ScoreWeights) -> Result<(), RepositoryError> {
        *self.weights.lock().expect("weights mutex poisoned") = weights;
        Ok(())
    }

    fn save_lender_config(
        &self,
        id: &LenderId,
        config: LenderConfig,
    ) -> Result<u64, RepositoryError> {
        let mut guard = self.lenders.lock().expect("lender mutex poisoned");
        let lender = guard
            .iter_mut()
            .find(|lender| &lender.id == id)
            .ok_or(RepositoryError::NotFound)?;
        lender.config = config;
        lender.config_revision += 1;
        Ok(lender.config_revision)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEligibilityStore {
    scores: Arc<Mutex<HashMap<LeadId, EligibilityScore>>>,
    recommendations: Arc<Mutex<HashMap<LeadId, RecommendationResult>>>,
    history: Arc<Mutex<Vec<LenderAssignmentHistory>>>,
}

impl EligibilityStore for InMemoryEligibilityStore {
    fn upsert_score(&self, score: EligibilityScore) -> Result<(), RepositoryError> {
        let mut guard = self.scores.lock().expect("score mutex poisoned");
        guard.insert(score.lead_id.clone(), score);
        Ok(())
    }

    fn fetch_score(&self, lead: &LeadId) -> Result<Option<EligibilityScore>, RepositoryError> {
        let guard = self.scores.lock().expect("score mutex poisoned");
        Ok(guard.get(lead).cloned())
    }

    fn save_recommendation(&self, result: RecommendationResult) -> Result<(), RepositoryError> {
        let mut guard = self
            .recommendations
            .lock()
            .expect("recommendation mutex poisoned");
        guard.insert(result.lead_id.clone(), result);
        Ok(())
    }

    fn fetch_recommendation(
        &self,
        lead: &LeadId,
    ) -> Result<Option<RecommendationResult>, RepositoryError> {
        let guard = self
            .recommendations
            .lock()
            .expect("recommendation mutex poisoned");
        Ok(guard.get(lead).cloned())
    }

    fn append_assignment(&self, entry: LenderAssignmentHistory) -> Result<(), RepositoryError> {
        self.history
            .lock()
            .expect("history mutex poisoned")
            .push(entry);
        Ok(())
    }

    fn assignment_history(
        &self,
        lead: &LeadId,
    ) -> Result<Vec<LenderAssignmentHistory>, RepositoryError> {
        let guard = self.history.lock().expect("history mutex poisoned");
        Ok(guard
            .iter()
            .filter(|entry| &entry.lead_id == lead)
            .cloned()
            .collect())
    }
}

pub(crate) fn build_service(engine: &EngineConfig) -> Arc<DemoService> {
    Arc::new(RecommendationService::new(
        Arc::new(InMemoryLeadRepository::seeded(demo_leads())),
        Arc::new(InMemoryConfigurationStore::seeded(demo_lenders())),
        Arc::new(InMemoryEligibilityStore::default()),
        engine.eligibility,
        engine.insights,
    ))
}

/// Three lenders with distinct grading, caps, and pricing so rankings differ per lead.
pub(crate) fn demo_lenders() -> Vec<Lender> {
    let credila = Lender::onboard(LenderId("credila".to_string()), "Credila");

    let mut avanse = Lender::onboard(LenderId("avanse".to_string()), "Avanse");
    avanse.config.max_loan_amount = 5_000_000;
    avanse.config.supported_destinations =
        vec!["USA".to_string(), "UK".to_string(), "Canada".to_string()];
    let overrides = &mut avanse.config.university_grade_mapping.overrides;
    overrides.insert("uni-toronto".to_string(), UniversityTier::S);
    overrides.insert("uni-asu".to_string(), UniversityTier::B);

    let mut prodigy = Lender::onboard(LenderId("prodigy".to_string()), "Prodigy Finance");
    prodigy.config.max_loan_amount = 10_000_000;
    prodigy.config.university_grade_mapping.accept_unmapped = false;
    prodigy.config.rate_config = RateConfig {
        excellent: RateTier {
            min_rate: 8.25,
            max_rate: 9.25,
            score_threshold: 88,
        },
        good: RateTier {
            min_rate: 9.5,
            max_rate: 10.5,
            score_threshold: 72,
        },
        average: RateTier {
            min_rate: 10.75,
            max_rate: 11.75,
            score_threshold: 58,
        },
        below_average: RateTier {
            min_rate: 12.25,
            max_rate: 13.5,
            score_threshold: 0,
        },
    };

    vec![credila, avanse, prodigy]
}

pub(crate) fn demo_leads() -> Vec<LeadProfile> {
    vec![
        LeadProfile {
            lead_id: LeadId("lead-1001".to_string()),
            status: LeadStatus::InProgress,
            loan_amount: Some(4_000_000),
            study_destination: Some("Canada".to_string()),
            loan_type: Some(LoanType::Secured),
            loan_classification: Some("masters".to_string()),
            intake_month: Some(9),
            intake_year: Some(2026),
            universities: vec![UniversityChoice {
                university_id: "uni-toronto".to_string(),
                name: "University of Toronto".to_string(),
                reference_tier: Some(UniversityTier::A),
            }],
            student: StudentAcademics {
                percentage: None,
                cgpa: Some(8.6),
                cgpa_scale: Some(10.0),
                test_scores: vec![TestScore {
                    kind: TestKind::Ielts,
                    score: 7.5,
                }],
            },
            co_applicant: CoApplicantFinancials {
                monthly_salary: Some(250_000),
                existing_emi: Some(40_000),
                employment_type: Some(EmploymentType::SelfEmployed),
                years_in_current_job: Some(8.0),
            },
            assigned_lender: None,
        },
        LeadProfile {
            lead_id: LeadId("lead-1002".to_string()),
            status: LeadStatus::New,
            loan_amount: Some(6_500_000),
            study_destination: Some("USA".to_string()),
            loan_type: Some(LoanType::Unsecured),
            loan_classification: Some("masters".to_string()),
            intake_month: Some(1),
            intake_year: Some(2027),
            universities: vec![UniversityChoice {
                university_id: "uni-asu".to_string(),
                name: "Arizona State University".to_string(),
                reference_tier: Some(UniversityTier::A),
            }],
            student: StudentAcademics {
                percentage: Some(72.0),
                cgpa: None,
                cgpa_scale: None,
                test_scores: vec![TestScore {
                    kind: TestKind::Gre,
                    score: 310.0,
                }],
            },
            co_applicant: CoApplicantFinancials {
                monthly_salary: Some(150_000),
                existing_emi: Some(20_000),
                employment_type: Some(EmploymentType::Salaried),
                years_in_current_job: Some(4.0),
            },
            assigned_lender: None,
        },
        LeadProfile {
            lead_id: LeadId("lead-1003".to_string()),
            status: LeadStatus::DocumentsPending,
            loan_amount: None,
            study_destination: Some("Germany".to_string()),
            loan_type: None,
            loan_classification: None,
            intake_month: None,
            intake_year: None,
            universities: Vec::new(),
            student: StudentAcademics {
                percentage: Some(64.0),
                ..StudentAcademics::default()
            },
            co_applicant: CoApplicantFinancials::default(),
            assigned_lender: None,
        },
    ]
}
