use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use super::configuration::{ConfigurationError, LenderConfig, ScoreWeights};
use super::domain::{LeadId, LeadProfile, LenderAssignmentHistory, LenderId};
use super::evaluation::{EligibilityPolicy, EvaluationEngine};
use super::insights::{classify_factors, explain_score, Insight, InsightThresholds};
use super::ranking::{rank_lenders, RecommendationResult};
use super::repository::{
    ConfigurationStore, EligibilityStore, EligibilityView, LeadRepository, RepositoryError,
};

/// Actor recorded in the assignment history for engine-driven changes.
pub const ENGINE_ACTOR: &str = "system:recommendation-engine";

/// Service composing the lead reader, configuration store, and engine outputs.
pub struct RecommendationService<L, C, S> {
    leads: Arc<L>,
    configuration: Arc<C>,
    store: Arc<S>,
    policy: EligibilityPolicy,
    thresholds: InsightThresholds,
}

impl<L, C, S> RecommendationService<L, C, S>
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
{
    pub fn new(
        leads: Arc<L>,
        configuration: Arc<C>,
        store: Arc<S>,
        policy: EligibilityPolicy,
        thresholds: InsightThresholds,
    ) -> Self {
        Self {
            leads,
            configuration,
            store,
            policy,
            thresholds,
        }
    }

    pub fn leads(&self) -> &Arc<L> {
        &self.leads
    }

    /// Scores the lead against every active lender and persists the outcome.
    pub fn compute_recommendation(
        &self,
        lead_id: &LeadId,
    ) -> Result<RecommendationResult, RecommendationError> {
        let lead = self
            .leads
            .fetch(lead_id)?
            .ok_or(RepositoryError::NotFound)?;

        let weights = self.configuration.score_weights()?;
        weights.validate().map_err(|err| {
            error!(lead_id = %lead_id, error = %err, "stored score weights are invalid");
            err
        })?;

        let lenders = self.configuration.active_lenders()?;
        if lenders.is_empty() {
            return Err(RecommendationError::NoActiveLenders);
        }

        let engine = EvaluationEngine::new(weights, self.policy);
        let ranking = rank_lenders(&engine, &lead, &lenders, Utc::now()).map_err(|err| {
            error!(lead_id = %lead_id, error = %err, "lender configuration blocked scoring");
            err
        })?;

        if let Some(score) = ranking.selected {
            self.store.upsert_score(score)?;
        }
        self.store.save_recommendation(ranking.result.clone())?;

        if let Some(top) = ranking.result.top() {
            self.record_assignment(
                &lead,
                &top.lender_id,
                ENGINE_ACTOR,
                "engine_recommendation",
                Some(format!(
                    "{} ranked first with score {}",
                    top.lender_name,
                    top.score.unwrap_or_default()
                )),
            )?;
        }

        info!(
            lead_id = %lead_id,
            top_lender = ?ranking.result.top_lender_id.as_ref().map(|id| id.0.as_str()),
            evaluated = ranking.result.evaluations.len(),
            "recommendation computed"
        );

        Ok(ranking.result)
    }

    /// Stored eligibility for display, flagged stale when the lender config moved on.
    pub fn eligibility(&self, lead_id: &LeadId) -> Result<EligibilityView, RecommendationError> {
        let score = self
            .store
            .fetch_score(lead_id)?
            .ok_or(RepositoryError::NotFound)?;
        let recommendation = self.store.fetch_recommendation(lead_id)?;

        let stale = match &score.lender_id {
            Some(lender_id) => match self.configuration.lender(lender_id)? {
                Some(lender) => score.is_stale(lender.config_revision),
                None => true,
            },
            None => false,
        };

        let insight = recommendation.as_ref().and_then(|result| {
            let top = result.top()?;
            Some(self.explain_score(top.score?, &top.lender_name, None, None))
        });

        Ok(EligibilityView {
            decision_rationale: score.decision_rationale(),
            factors: classify_factors(&score),
            score,
            recommendation,
            stale,
            insight,
        })
    }

    pub fn explain_score(
        &self,
        score: u8,
        lender_name: &str,
        top_lender_name: Option<&str>,
        gap_reason: Option<&str>,
    ) -> Insight {
        explain_score(
            score,
            lender_name,
            top_lender_name,
            gap_reason,
            &self.thresholds,
        )
    }

    pub fn save_score_weights(
        &self,
        weights: ScoreWeights,
    ) -> Result<ScoreWeights, RecommendationError> {
        weights.validate()?;
        self.configuration.save_score_weights(weights)?;
        info!(
            university = weights.university_weight,
            student = weights.student_weight,
            co_applicant = weights.co_applicant_weight,
            "score weights updated"
        );
        Ok(weights)
    }

    /// Validates and stores a lender configuration, returning the new revision.
    pub fn save_lender_config(
        &self,
        lender_id: &LenderId,
        config: LenderConfig,
    ) -> Result<u64, RecommendationError> {
        config.validate()?;
        self.configuration
            .lender(lender_id)?
            .ok_or(RepositoryError::NotFound)?;
        let revision = self.configuration.save_lender_config(lender_id, config)?;
        info!(lender_id = %lender_id, revision, "lender configuration updated");
        Ok(revision)
    }

    /// Manual admin reassignment; returns the history entry when the lender changed.
    pub fn reassign_lender(
        &self,
        lead_id: &LeadId,
        lender_id: &LenderId,
        changed_by: &str,
        change_reason: &str,
        notes: Option<String>,
    ) -> Result<Option<LenderAssignmentHistory>, RecommendationError> {
        let lead = self
            .leads
            .fetch(lead_id)?
            .ok_or(RepositoryError::NotFound)?;
        self.configuration
            .lender(lender_id)?
            .ok_or(RepositoryError::NotFound)?;
        self.record_assignment(&lead, lender_id, changed_by, change_reason, notes)
    }

    pub fn assignment_history(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<LenderAssignmentHistory>, RecommendationError> {
        Ok(self.store.assignment_history(lead_id)?)
    }

    fn record_assignment(
        &self,
        lead: &LeadProfile,
        lender_id: &LenderId,
        changed_by: &str,
        change_reason: &str,
        notes: Option<String>,
    ) -> Result<Option<LenderAssignmentHistory>, RecommendationError> {
        if lead.assigned_lender.as_ref() == Some(lender_id) {
            return Ok(None);
        }

        let entry = LenderAssignmentHistory {
            lead_id: lead.lead_id.clone(),
            old_lender_id: lead.assigned_lender.clone(),
            new_lender_id: lender_id.clone(),
            changed_by: changed_by.to_string(),
            change_reason: change_reason.to_string(),
            assignment_notes: notes,
            created_at: Utc::now(),
        };
        // History first: a failed append must leave the lead unbound so the next run retries.
        self.store.append_assignment(entry.clone())?;
        self.leads.assign_lender(&lead.lead_id, lender_id)?;
        info!(
            lead_id = %lead.lead_id,
            old_lender = ?entry.old_lender_id.as_ref().map(|id| id.0.as_str()),
            new_lender = %lender_id,
            changed_by,
            "lender assignment changed"
        );
        Ok(Some(entry))
    }
}

/// Error raised by the recommendation service.
#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("no active lenders are configured")]
    NoActiveLenders,
}
