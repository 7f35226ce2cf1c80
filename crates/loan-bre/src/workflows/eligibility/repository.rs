use serde::Serialize;

use super::configuration::{Lender, LenderConfig, ScoreWeights};
use super::domain::{LeadId, LeadProfile, LenderAssignmentHistory, LenderId};
use super::evaluation::EligibilityScore;
use super::insights::{Insight, InsightFactor};
use super::ranking::RecommendationResult;

/// Read access to CRM leads plus the one write the engine makes to them.
pub trait LeadRepository: Send + Sync {
    fn fetch(&self, id: &LeadId) -> Result<Option<LeadProfile>, RepositoryError>;
    /// Leads whose status is not terminal, in a stable order, at most `limit`.
    fn non_terminal(&self, limit: usize) -> Result<Vec<LeadId>, RepositoryError>;
    fn assign_lender(&self, id: &LeadId, lender: &LenderId) -> Result<(), RepositoryError>;
}

/// Admin-owned configuration: lender directory and score weights.
///
/// Implementations must return current values on every call; callers never cache them.
pub trait ConfigurationStore: Send + Sync {
    /// Active lenders in onboarding order.
    fn active_lenders(&self) -> Result<Vec<Lender>, RepositoryError>;
    fn lender(&self, id: &LenderId) -> Result<Option<Lender>, RepositoryError>;
    fn score_weights(&self) -> Result<ScoreWeights, RepositoryError>;
    fn save_score_weights(&self, weights: ScoreWeights) -> Result<(), RepositoryError>;
    /// Overwrites the lender's configuration and returns the new revision.
    fn save_lender_config(
        &self,
        id: &LenderId,
        config: LenderConfig,
    ) -> Result<u64, RepositoryError>;
}

/// Engine-owned outputs plus the shared assignment audit log.
pub trait EligibilityStore: Send + Sync {
    fn upsert_score(&self, score: EligibilityScore) -> Result<(), RepositoryError>;
    fn fetch_score(&self, lead: &LeadId) -> Result<Option<EligibilityScore>, RepositoryError>;
    fn save_recommendation(&self, result: RecommendationResult) -> Result<(), RepositoryError>;
    fn fetch_recommendation(
        &self,
        lead: &LeadId,
    ) -> Result<Option<RecommendationResult>, RepositoryError>;
    fn append_assignment(&self, entry: LenderAssignmentHistory) -> Result<(), RepositoryError>;
    fn assignment_history(
        &self,
        lead: &LeadId,
    ) -> Result<Vec<LenderAssignmentHistory>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("stored record is malformed: {0}")]
    Malformed(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Stored eligibility together with the ranking it came from, for display.
#[derive(Debug, Clone, Serialize)]
pub struct EligibilityView {
    pub score: EligibilityScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<RecommendationResult>,
    pub decision_rationale: String,
    /// The lender configuration changed after this snapshot was computed.
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<Insight>,
    pub factors: Vec<InsightFactor>,
}
