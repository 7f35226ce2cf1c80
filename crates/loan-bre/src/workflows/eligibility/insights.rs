//! Display-side explanation of scores. Nothing here reads or writes state.

use serde::{Deserialize, Serialize};

use super::configuration::RateTierName;
use super::domain::UniversityTier;
use super::evaluation::{ApprovalStatus, EligibilityScore, GradeSource};

/// Score cut-offs for each insight variant, configurable per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightThresholds {
    pub excellent: u8,
    pub strong: u8,
    pub good: u8,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            excellent: 85,
            strong: 70,
            good: 55,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightVariant {
    Excellent,
    Strong,
    Good,
    Explore,
}

impl InsightVariant {
    pub fn for_score(score: u8, thresholds: &InsightThresholds) -> Self {
        if score >= thresholds.excellent {
            InsightVariant::Excellent
        } else if score >= thresholds.strong {
            InsightVariant::Strong
        } else if score >= thresholds.good {
            InsightVariant::Good
        } else {
            InsightVariant::Explore
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            InsightVariant::Excellent => "Excellent Match",
            InsightVariant::Strong => "Strong Match",
            InsightVariant::Good => "Good Match",
            InsightVariant::Explore => "Explore Options",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub variant: InsightVariant,
    pub label: String,
    pub message: String,
}

pub fn explain_score(
    score: u8,
    lender_name: &str,
    top_lender_name: Option<&str>,
    gap_reason: Option<&str>,
    thresholds: &InsightThresholds,
) -> Insight {
    let variant = InsightVariant::for_score(score, thresholds);

    let mut message = match variant {
        InsightVariant::Excellent => {
            format!("{lender_name} is an excellent match with a score of {score}.")
        }
        InsightVariant::Strong => {
            format!("{lender_name} is a strong match with a score of {score}.")
        }
        InsightVariant::Good => format!("{lender_name} is a good option with a score of {score}."),
        InsightVariant::Explore => format!(
            "{lender_name} scored {score}; explore other lenders or strengthen the profile."
        ),
    };

    let runner_up = top_lender_name
        .map(str::trim)
        .filter(|top| !top.is_empty() && !top.eq_ignore_ascii_case(lender_name.trim()));
    if let Some(top) = runner_up {
        message.push_str(&format!(" {top} is the top pick"));
        match gap_reason.map(str::trim).filter(|gap| !gap.is_empty()) {
            Some(gap) => message.push_str(&format!(" ({gap}).")),
            None => message.push('.'),
        }
    }

    Insight {
        variant,
        label: variant.label().to_string(),
        message,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    Strength,
    Eligibility,
    Consideration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightFactor {
    pub category: FactorCategory,
    pub title: String,
    pub detail: String,
    pub impact: Impact,
}

impl InsightFactor {
    fn new(
        category: FactorCategory,
        impact: Impact,
        title: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            category,
            title: title.into(),
            detail: detail.into(),
            impact,
        }
    }
}

/// Qualitative reading of a stored eligibility snapshot.
pub fn classify_factors(score: &EligibilityScore) -> Vec<InsightFactor> {
    let mut factors = Vec::new();

    let university = &score.university_breakdown;
    match (university.grade, university.grade_source) {
        (Some(UniversityTier::S | UniversityTier::A), _) => factors.push(InsightFactor::new(
            FactorCategory::Strength,
            Impact::Positive,
            "Top-tier university",
            format!(
                "{} is graded {}",
                university.university_name.as_deref().unwrap_or("Primary university"),
                university.grade.map_or("-", UniversityTier::label)
            ),
        )),
        (None, Some(GradeSource::Unmapped)) => factors.push(InsightFactor::new(
            FactorCategory::Consideration,
            Impact::Negative,
            "University not graded",
            "a conservative default score was applied",
        )),
        _ => {}
    }

    if score.student_score >= 70 {
        factors.push(InsightFactor::new(
            FactorCategory::Strength,
            Impact::Positive,
            "Strong academic profile",
            format!("student score {}", score.student_score),
        ));
    } else if score.student_score < 40 {
        factors.push(InsightFactor::new(
            FactorCategory::Consideration,
            Impact::Negative,
            "Academic profile needs support",
            format!("student score {}", score.student_score),
        ));
    }

    let co_applicant = &score.co_applicant_breakdown;
    match co_applicant.income_to_loan_ratio {
        None => factors.push(InsightFactor::new(
            FactorCategory::Consideration,
            Impact::Negative,
            "Co-applicant income not provided",
            "co-applicant component scored 0",
        )),
        Some(ratio) if ratio >= 1.0 => factors.push(InsightFactor::new(
            FactorCategory::Eligibility,
            Impact::Positive,
            "Co-applicant income sufficient",
            format!("annual net income covers {:.1}x the loan", ratio),
        )),
        Some(ratio) if ratio < 0.5 => factors.push(InsightFactor::new(
            FactorCategory::Consideration,
            Impact::Negative,
            "Co-applicant income low relative to loan",
            format!("annual net income covers {:.0}% of the loan", ratio * 100.0),
        )),
        Some(_) => {}
    }

    if let Some(band) = &score.loan_band_percentage {
        factors.push(InsightFactor::new(
            FactorCategory::Eligibility,
            Impact::Neutral,
            "Eligible loan range",
            format!(
                "{} to {} in score band {}",
                score.eligible_loan_min, score.eligible_loan_max, band
            ),
        ));
    }

    if let Some(tier @ (RateTierName::Excellent | RateTierName::Good)) = score.rate_tier {
        factors.push(InsightFactor::new(
            FactorCategory::Eligibility,
            Impact::Positive,
            "Preferential rate tier",
            format!("qualifies for the {} tier", tier.label()),
        ));
    }

    match score.approval_status {
        ApprovalStatus::Conditional => factors.push(InsightFactor::new(
            FactorCategory::Consideration,
            Impact::Neutral,
            "Conditional approval",
            "score sits just above the eligibility floor",
        )),
        ApprovalStatus::Rejected => factors.push(InsightFactor::new(
            FactorCategory::Consideration,
            Impact::Negative,
            "Not eligible",
            score.decision_rationale(),
        )),
        ApprovalStatus::Approved => {}
    }

    factors
}
