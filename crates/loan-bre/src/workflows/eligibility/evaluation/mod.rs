mod policy;
mod resolver;
mod scorers;

pub use policy::{
    overall_score, Aggregate, ApprovalStatus, ComponentScores, EligibilityPolicy, MissingField,
    RejectionReason,
};
pub use resolver::{resolve_band, resolve_offer, resolve_rate_tier, LoanOffer};
pub use scorers::{
    score_co_applicant, score_student, score_university, AcademicSource, CoApplicantBreakdown,
    GradeSource, Scored, StudentBreakdown, UniversityBreakdown,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::configuration::{ConfigurationError, Lender, RateTierName, ScoreWeights};
use super::domain::{LeadId, LeadProfile, LenderId};
use policy::aggregate;

/// Stateless evaluator scoring one lead against one lender.
///
/// Weights are handed in per run so a saved configuration applies to the next computation.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationEngine {
    weights: ScoreWeights,
    policy: EligibilityPolicy,
}

impl EvaluationEngine {
    pub fn new(weights: ScoreWeights, policy: EligibilityPolicy) -> Self {
        Self { weights, policy }
    }

    pub fn assess(
        &self,
        lead: &LeadProfile,
        lender: &Lender,
        computed_at: DateTime<Utc>,
    ) -> Result<EligibilityScore, ConfigurationError> {
        lender.config.validate()?;

        let mut hard_failure = None;

        let university = match score_university(lead, &lender.config.university_grade_mapping) {
            Ok(scored) => scored,
            Err(field) => {
                hard_failure = hard_failure.or(Some(field));
                Scored {
                    score: 0,
                    breakdown: UniversityBreakdown::default(),
                }
            }
        };
        let student = score_student(&lead.student);
        let co_applicant = match score_co_applicant(&lead.co_applicant, lead.loan_amount) {
            Ok(scored) => scored,
            Err(field) => {
                hard_failure = hard_failure.or(Some(field));
                Scored {
                    score: 0,
                    breakdown: CoApplicantBreakdown::default(),
                }
            }
        };

        let components = ComponentScores {
            university: university.score,
            student: student.score,
            co_applicant: co_applicant.score,
        };
        let decision = aggregate(&components, &self.weights, &self.policy, hard_failure)?;

        let offer = match (decision.approval_status.is_eligible(), lead.loan_amount) {
            (true, Some(requested)) => Some(resolve_offer(
                &lender.config,
                decision.overall_score,
                requested,
            )?),
            _ => None,
        };

        Ok(EligibilityScore {
            lead_id: lead.lead_id.clone(),
            lender_id: Some(lender.id.clone()),
            config_revision: Some(lender.config_revision),
            university_score: components.university,
            student_score: components.student,
            co_applicant_score: components.co_applicant,
            overall_score: decision.overall_score,
            approval_status: decision.approval_status,
            rejection_reason: decision.rejection_reason,
            eligible_loan_min: offer.as_ref().map_or(0, |offer| offer.eligible_loan_min),
            eligible_loan_max: offer.as_ref().map_or(0, |offer| offer.eligible_loan_max),
            loan_band_percentage: offer.as_ref().map(|offer| offer.band_label.clone()),
            interest_rate_min: offer.as_ref().map(|offer| offer.interest_rate_min),
            interest_rate_max: offer.as_ref().map(|offer| offer.interest_rate_max),
            rate_tier: offer.as_ref().map(|offer| offer.rate_tier),
            university_breakdown: university.breakdown,
            student_breakdown: student.breakdown,
            co_applicant_breakdown: co_applicant.breakdown,
            computed_at,
        })
    }
}

/// Current-state eligibility snapshot for a lead; overwritten on every recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityScore {
    pub lead_id: LeadId,
    pub lender_id: Option<LenderId>,
    /// Revision of the lender configuration that produced the labels below.
    pub config_revision: Option<u64>,
    pub university_score: u8,
    pub student_score: u8,
    pub co_applicant_score: u8,
    pub overall_score: u8,
    pub approval_status: ApprovalStatus,
    pub rejection_reason: Option<RejectionReason>,
    pub eligible_loan_min: u64,
    pub eligible_loan_max: u64,
    pub loan_band_percentage: Option<String>,
    pub interest_rate_min: Option<f64>,
    pub interest_rate_max: Option<f64>,
    pub rate_tier: Option<RateTierName>,
    pub university_breakdown: UniversityBreakdown,
    pub student_breakdown: StudentBreakdown,
    pub co_applicant_breakdown: CoApplicantBreakdown,
    pub computed_at: DateTime<Utc>,
}

impl EligibilityScore {
    pub fn rate_midpoint(&self) -> Option<f64> {
        match (self.interest_rate_min, self.interest_rate_max) {
            (Some(min), Some(max)) => Some((min + max) / 2.0),
            _ => None,
        }
    }

    /// Labels drift once the lender saves a newer configuration than the one scored against.
    pub fn is_stale(&self, current_revision: u64) -> bool {
        self.config_revision
            .map_or(true, |revision| revision != current_revision)
    }

    /// Forces the snapshot to a rejection, clearing any resolved offer.
    pub(crate) fn reject(mut self, reason: RejectionReason) -> Self {
        self.approval_status = ApprovalStatus::Rejected;
        self.rejection_reason = Some(reason);
        self.eligible_loan_min = 0;
        self.eligible_loan_max = 0;
        self.loan_band_percentage = None;
        self.interest_rate_min = None;
        self.interest_rate_max = None;
        self.rate_tier = None;
        self
    }

    pub fn decision_rationale(&self) -> String {
        match &self.rejection_reason {
            Some(reason) => reason.summary(),
            None => match (&self.loan_band_percentage, self.rate_tier) {
                (Some(band), Some(tier)) => format!(
                    "{}: score {} in band {} at {} tier",
                    self.approval_status.label(),
                    self.overall_score,
                    band,
                    tier.label()
                ),
                _ => format!(
                    "{}: score {}",
                    self.approval_status.label(),
                    self.overall_score
                ),
            },
        }
    }
}
