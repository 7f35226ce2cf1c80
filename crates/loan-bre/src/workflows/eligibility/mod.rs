//! Eligibility scoring and lender recommendation.
//!
//! A lead is scored against every active lender's rules, lenders are ranked, and the top
//! pick is persisted together with an audit trail of assignment changes. Background edits
//! feed a debounced recompute queue; administrators can also recompute in bulk.

pub mod batch;
pub mod configuration;
pub mod domain;
pub mod evaluation;
pub mod insights;
pub mod ranking;
pub mod repository;
pub mod router;
pub mod service;
pub mod trigger;

#[cfg(test)]
mod tests;

pub use batch::{
    AccessPolicy, AdminRolePolicy, AuthorizationError, BatchError, BatchFailure, BatchPolicy,
    BatchRecompute, BatchRequest, BatchResult,
};
pub use configuration::{
    ConfigurationError, Lender, LenderConfig, LoanBand, RateConfig, RateTier, RateTierName,
    ScoreWeights, TierScores, UniversityGradeMapping,
};
pub use domain::{
    Caller, CallerRole, CoApplicantFinancials, EmploymentType, LeadId, LeadProfile, LeadStatus,
    LenderAssignmentHistory, LenderId, LoanType, StudentAcademics, TestKind, TestScore,
    UniversityChoice, UniversityTier,
};
pub use evaluation::{
    ApprovalStatus, EligibilityPolicy, EligibilityScore, EvaluationEngine, MissingField,
    RejectionReason,
};
pub use insights::{
    classify_factors, explain_score, FactorCategory, Impact, Insight, InsightFactor,
    InsightThresholds, InsightVariant,
};
pub use ranking::{
    rank_lenders, GapReason, IneligibilityReason, LenderEvaluation, Ranking, RecommendationResult,
};
pub use repository::{
    ConfigurationStore, EligibilityStore, EligibilityView, LeadRepository, RepositoryError,
};
pub use router::{eligibility_router, EligibilityApi, USER_ID_HEADER, USER_ROLE_HEADER};
pub use service::{RecommendationError, RecommendationService, ENGINE_ACTOR};
pub use trigger::{
    is_material_change, RecomputeJob, RecomputeQueue, TriggerDecision, TriggerPolicy,
    TriggerState, WatchedField,
};
