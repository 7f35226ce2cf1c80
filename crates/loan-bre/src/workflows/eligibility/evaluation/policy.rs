use serde::{Deserialize, Serialize};

use crate::workflows::eligibility::configuration::{ConfigurationError, ScoreWeights};

/// Deployment policy for turning an overall score into an approval decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    /// Scores below this floor are rejected.
    pub minimum_score: u8,
    /// Width of the conditional band directly above the floor; 0 disables it.
    pub conditional_band: u8,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            minimum_score: 40,
            conditional_band: 5,
        }
    }
}

/// Required identifying field whose absence hard-rejects a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingField {
    LoanAmount,
    UniversitySelection,
}

impl MissingField {
    pub const fn label(self) -> &'static str {
        match self {
            MissingField::LoanAmount => "loan amount",
            MissingField::UniversitySelection => "university selection",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Approved,
    Conditional,
    Rejected,
}

impl ApprovalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Conditional => "conditional",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub const fn is_eligible(self) -> bool {
        !matches!(self, ApprovalStatus::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    MissingField { field: MissingField },
    BelowMinimumScore { minimum: u8, actual: u8 },
    NoEligibleLender,
}

impl RejectionReason {
    pub fn summary(&self) -> String {
        match self {
            RejectionReason::MissingField { field } => {
                format!("rejected: {} is missing", field.label())
            }
            RejectionReason::BelowMinimumScore { minimum, actual } => format!(
                "rejected: overall score {actual} is below the minimum of {minimum}"
            ),
            RejectionReason::NoEligibleLender => {
                "rejected: no active lender accepts this profile".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub university: u8,
    pub student: u8,
    pub co_applicant: u8,
}

/// Overall score plus the decision reached on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub overall_score: u8,
    pub approval_status: ApprovalStatus,
    pub rejection_reason: Option<RejectionReason>,
}

/// Weighted sum of the component scores, rounded half up.
pub fn overall_score(
    scores: &ComponentScores,
    weights: &ScoreWeights,
) -> Result<u8, ConfigurationError> {
    weights.validate()?;

    let weighted = u32::from(scores.university) * u32::from(weights.university_weight)
        + u32::from(scores.student) * u32::from(weights.student_weight)
        + u32::from(scores.co_applicant) * u32::from(weights.co_applicant_weight);

    Ok(((weighted + 50) / 100).min(100) as u8)
}

pub(crate) fn aggregate(
    scores: &ComponentScores,
    weights: &ScoreWeights,
    policy: &EligibilityPolicy,
    hard_failure: Option<MissingField>,
) -> Result<Aggregate, ConfigurationError> {
    let overall_score = overall_score(scores, weights)?;

    if let Some(field) = hard_failure {
        return Ok(Aggregate {
            overall_score,
            approval_status: ApprovalStatus::Rejected,
            rejection_reason: Some(RejectionReason::MissingField { field }),
        });
    }

    if overall_score < policy.minimum_score {
        return Ok(Aggregate {
            overall_score,
            approval_status: ApprovalStatus::Rejected,
            rejection_reason: Some(RejectionReason::BelowMinimumScore {
                minimum: policy.minimum_score,
                actual: overall_score,
            }),
        });
    }

    let conditional_ceiling = policy.minimum_score.saturating_add(policy.conditional_band);
    let approval_status = if overall_score < conditional_ceiling {
        ApprovalStatus::Conditional
    } else {
        ApprovalStatus::Approved
    };

    Ok(Aggregate {
        overall_score,
        approval_status,
        rejection_reason: None,
    })
}
