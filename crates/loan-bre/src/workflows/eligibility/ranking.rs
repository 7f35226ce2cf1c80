use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::configuration::{ConfigurationError, Lender, RateTierName};
use super::domain::{LeadId, LeadProfile, LenderId};
use super::evaluation::{
    ApprovalStatus, EligibilityScore, EvaluationEngine, RejectionReason,
};

/// Hard gate a lender's rules exclude the lead on before any scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IneligibilityReason {
    ExceedsMaxLoan { requested: u64, max: u64 },
    DestinationNotSupported { destination: String },
    UniversityNotMapped { university_id: String },
}

impl IneligibilityReason {
    pub fn summary(&self) -> String {
        match self {
            IneligibilityReason::ExceedsMaxLoan { requested, max } => {
                format!("requested {requested} exceeds lender maximum {max}")
            }
            IneligibilityReason::DestinationNotSupported { destination } => {
                format!("study destination {destination} not supported")
            }
            IneligibilityReason::UniversityNotMapped { university_id } => {
                format!("university {university_id} is not graded by this lender")
            }
        }
    }
}

/// Why an evaluated lender ranked below the top pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GapReason {
    ScoreBelow { points: u8 },
    RateTierHigher { steps: u8 },
    ScoreAndRateTier { points: u8, steps: u8 },
    HigherRate { basis_points: u32 },
    TieBreak,
    Ineligible { reason: IneligibilityReason },
    Rejected { reason: RejectionReason },
}

impl GapReason {
    pub fn summary(&self) -> String {
        match self {
            GapReason::ScoreBelow { points } => {
                format!("score {points} points below top pick")
            }
            GapReason::RateTierHigher { steps } => {
                format!("rate tier {} higher", steps_phrase(*steps))
            }
            GapReason::ScoreAndRateTier { points, steps } => format!(
                "score {points} points below top pick and rate tier {} higher",
                steps_phrase(*steps)
            ),
            GapReason::HigherRate { basis_points } => format!(
                "rate {:.2}% higher than top pick",
                f64::from(*basis_points) / 100.0
            ),
            GapReason::TieBreak => "tied with top pick; ranked by onboarding order".to_string(),
            GapReason::Ineligible { reason } => format!("not eligible: {}", reason.summary()),
            GapReason::Rejected { reason } => reason.summary(),
        }
    }
}

fn steps_phrase(steps: u8) -> String {
    match steps {
        1 => "one step".to_string(),
        2 => "two steps".to_string(),
        3 => "three steps".to_string(),
        other => format!("{other} steps"),
    }
}

/// One lender's line in a recommendation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LenderEvaluation {
    pub lender_id: LenderId,
    pub lender_name: String,
    pub score: Option<u8>,
    pub eligible: bool,
    pub approval_status: Option<ApprovalStatus>,
    pub rate_tier: Option<RateTierName>,
    pub rate_midpoint: Option<f64>,
    pub gap_reason: Option<GapReason>,
}

/// Ordered outcome of evaluating every candidate lender for a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub lead_id: LeadId,
    pub top_lender_id: Option<LenderId>,
    pub evaluations: Vec<LenderEvaluation>,
    pub computed_at: DateTime<Utc>,
}

impl RecommendationResult {
    pub fn top(&self) -> Option<&LenderEvaluation> {
        let top_id = self.top_lender_id.as_ref()?;
        self.evaluations
            .iter()
            .find(|evaluation| &evaluation.lender_id == top_id)
    }
}

/// Ranking output: the result to publish plus the snapshot to persist for the lead.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub result: RecommendationResult,
    pub selected: Option<EligibilityScore>,
}

pub(crate) fn check_gates(lead: &LeadProfile, lender: &Lender) -> Result<(), IneligibilityReason> {
    let config = &lender.config;

    if let Some(requested) = lead.loan_amount {
        if requested > config.max_loan_amount {
            return Err(IneligibilityReason::ExceedsMaxLoan {
                requested,
                max: config.max_loan_amount,
            });
        }
    }

    if let Some(destination) = lead.study_destination.as_deref() {
        if !config.supports_destination(destination) {
            return Err(IneligibilityReason::DestinationNotSupported {
                destination: destination.to_string(),
            });
        }
    }

    if let Some(university) = lead.primary_university() {
        let mapping = &config.university_grade_mapping;
        if mapping.grade(university).is_none() && !mapping.accept_unmapped {
            return Err(IneligibilityReason::UniversityNotMapped {
                university_id: university.university_id.clone(),
            });
        }
    }

    Ok(())
}

struct Candidate<'a> {
    position: usize,
    lender: &'a Lender,
    assessment: EligibilityScore,
}

fn compare_candidates(left: &Candidate<'_>, right: &Candidate<'_>) -> Ordering {
    right
        .assessment
        .overall_score
        .cmp(&left.assessment.overall_score)
        .then_with(|| {
            let left_rate = left.assessment.rate_midpoint().unwrap_or(f64::MAX);
            let right_rate = right.assessment.rate_midpoint().unwrap_or(f64::MAX);
            left_rate.total_cmp(&right_rate)
        })
        .then_with(|| left.position.cmp(&right.position))
}

fn gap_against(top: &EligibilityScore, candidate: &EligibilityScore) -> GapReason {
    let points = top.overall_score.saturating_sub(candidate.overall_score);
    let steps = match (top.rate_tier, candidate.rate_tier) {
        (Some(top_tier), Some(tier)) => tier.rank().saturating_sub(top_tier.rank()),
        _ => 0,
    };

    match (points, steps) {
        (0, 0) => {
            let top_rate = top.rate_midpoint().unwrap_or(0.0);
            let rate = candidate.rate_midpoint().unwrap_or(0.0);
            let basis_points = ((rate - top_rate) * 100.0).round();
            if basis_points > 0.0 {
                GapReason::HigherRate {
                    basis_points: basis_points as u32,
                }
            } else {
                GapReason::TieBreak
            }
        }
        (0, steps) => GapReason::RateTierHigher { steps },
        (points, 0) => GapReason::ScoreBelow { points },
        (points, steps) => GapReason::ScoreAndRateTier { points, steps },
    }
}

fn evaluation_line(
    lender: &Lender,
    assessment: Option<&EligibilityScore>,
    eligible: bool,
    gap_reason: Option<GapReason>,
) -> LenderEvaluation {
    LenderEvaluation {
        lender_id: lender.id.clone(),
        lender_name: lender.name.clone(),
        score: assessment.map(|score| score.overall_score),
        eligible,
        approval_status: assessment.map(|score| score.approval_status),
        rate_tier: assessment.and_then(|score| score.rate_tier),
        rate_midpoint: assessment.and_then(|score| score.rate_midpoint()),
        gap_reason,
    }
}

/// Evaluates every lender, ranks the eligible ones and picks the recommendation.
///
/// Ranking order: overall score descending, rate midpoint ascending, directory order.
pub fn rank_lenders(
    engine: &EvaluationEngine,
    lead: &LeadProfile,
    lenders: &[Lender],
    computed_at: DateTime<Utc>,
) -> Result<Ranking, ConfigurationError> {
    let mut eligible: Vec<Candidate<'_>> = Vec::new();
    let mut rejected: Vec<Candidate<'_>> = Vec::new();
    let mut gated: Vec<(usize, &Lender, IneligibilityReason)> = Vec::new();

    for (position, lender) in lenders.iter().enumerate() {
        // Gates read the same configuration, so even a gated lender must be valid.
        lender.config.validate()?;
        if let Err(reason) = check_gates(lead, lender) {
            gated.push((position, lender, reason));
            continue;
        }

        let assessment = engine.assess(lead, lender, computed_at)?;
        let candidate = Candidate {
            position,
            lender,
            assessment,
        };
        if candidate.assessment.approval_status.is_eligible() {
            eligible.push(candidate);
        } else {
            rejected.push(candidate);
        }
    }

    eligible.sort_by(compare_candidates);

    let mut evaluations = Vec::with_capacity(lenders.len());
    let top = eligible.first().map(|candidate| &candidate.assessment);

    for (index, candidate) in eligible.iter().enumerate() {
        let gap = match (index, top) {
            (0, _) | (_, None) => None,
            (_, Some(top)) => Some(gap_against(top, &candidate.assessment)),
        };
        evaluations.push(evaluation_line(
            candidate.lender,
            Some(&candidate.assessment),
            true,
            gap,
        ));
    }

    let mut ineligible: Vec<(usize, LenderEvaluation)> = Vec::new();
    for candidate in &rejected {
        let reason = candidate
            .assessment
            .rejection_reason
            .clone()
            .unwrap_or(RejectionReason::NoEligibleLender);
        ineligible.push((
            candidate.position,
            evaluation_line(
                candidate.lender,
                Some(&candidate.assessment),
                false,
                Some(GapReason::Rejected { reason }),
            ),
        ));
    }
    for (position, lender, reason) in &gated {
        ineligible.push((
            *position,
            evaluation_line(
                lender,
                None,
                false,
                Some(GapReason::Ineligible {
                    reason: reason.clone(),
                }),
            ),
        ));
    }
    ineligible.sort_by_key(|(position, _)| *position);
    evaluations.extend(ineligible.into_iter().map(|(_, line)| line));

    let top_lender_id = eligible
        .first()
        .map(|candidate| candidate.lender.id.clone());

    let selected = match eligible.into_iter().next() {
        Some(top) => Some(top.assessment),
        None => fallback_snapshot(engine, lead, rejected, &gated, computed_at)?,
    };

    Ok(Ranking {
        result: RecommendationResult {
            lead_id: lead.lead_id.clone(),
            top_lender_id,
            evaluations,
            computed_at,
        },
        selected,
    })
}

/// Snapshot persisted when no lender is eligible: the best rejected assessment, or the
/// first gated lender's assessment forced to a rejection.
fn fallback_snapshot(
    engine: &EvaluationEngine,
    lead: &LeadProfile,
    rejected: Vec<Candidate<'_>>,
    gated: &[(usize, &Lender, IneligibilityReason)],
    computed_at: DateTime<Utc>,
) -> Result<Option<EligibilityScore>, ConfigurationError> {
    let best_rejected = rejected.into_iter().min_by(|left, right| {
        right
            .assessment
            .overall_score
            .cmp(&left.assessment.overall_score)
            .then_with(|| left.position.cmp(&right.position))
    });
    if let Some(candidate) = best_rejected {
        return Ok(Some(candidate.assessment));
    }

    match gated.first() {
        Some((_, lender, _)) => {
            let assessment = engine.assess(lead, lender, computed_at)?;
            Ok(Some(assessment.reject(RejectionReason::NoEligibleLender)))
        }
        None => Ok(None),
    }
}
