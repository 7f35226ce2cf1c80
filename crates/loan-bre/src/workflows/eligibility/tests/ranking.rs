use super::common::*;
use chrono::{TimeZone, Utc};

use crate::workflows::eligibility::configuration::{
    ConfigurationError, RateTier, RateTierName, ScoreWeights,
};
use crate::workflows::eligibility::domain::LenderId;
use crate::workflows::eligibility::evaluation::{
    ApprovalStatus, EligibilityPolicy, EvaluationEngine, MissingField, RejectionReason,
};
use crate::workflows::eligibility::ranking::{rank_lenders, GapReason, IneligibilityReason};

fn engine() -> EvaluationEngine {
    EvaluationEngine::new(ScoreWeights::default(), EligibilityPolicy::default())
}

fn at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
}

#[test]
fn strong_lead_scores_expected_components() {
    let score = engine()
        .assess(&strong_lead("lead-1"), &lender("credila", "Credila"), at())
        .unwrap();

    assert_eq!(score.university_score, 95);
    assert_eq!(score.student_score, 79);
    assert_eq!(score.co_applicant_score, 100);
    assert_eq!(score.overall_score, 92);
    assert_eq!(score.approval_status, ApprovalStatus::Approved);
    assert_eq!(score.loan_band_percentage.as_deref(), Some("90-100"));
    assert_eq!(score.eligible_loan_min, 1_800_000);
    assert_eq!(score.eligible_loan_max, 2_000_000);
    assert_eq!(score.rate_tier, Some(RateTierName::Excellent));
    assert_eq!(score.config_revision, Some(1));
}

#[test]
fn assessment_is_deterministic() {
    let lead = strong_lead("lead-1");
    let lender = conservative_lender("avanse", "Avanse");
    let first = engine().assess(&lead, &lender, at()).unwrap();
    let second = engine().assess(&lead, &lender, at()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn missing_loan_amount_rejects_with_reason() {
    let score = engine()
        .assess(&lead_without_amount("lead-3"), &lender("credila", "Credila"), at())
        .unwrap();

    assert_eq!(score.approval_status, ApprovalStatus::Rejected);
    assert_eq!(
        score.rejection_reason,
        Some(RejectionReason::MissingField {
            field: MissingField::LoanAmount
        })
    );
    assert_eq!(score.co_applicant_score, 0);
    assert_eq!(score.eligible_loan_max, 0);
    assert_eq!(score.rate_tier, None);
}

#[test]
fn missing_salary_scores_zero_without_rejecting() {
    let mut lead = strong_lead("lead-4");
    lead.co_applicant.monthly_salary = None;
    let score = engine()
        .assess(&lead, &lender("credila", "Credila"), at())
        .unwrap();

    assert_eq!(score.co_applicant_score, 0);
    assert_ne!(
        score.rejection_reason,
        Some(RejectionReason::MissingField {
            field: MissingField::LoanAmount
        })
    );
    // 95 * 0.4 + 79 * 0.3 + 0 * 0.3
    assert_eq!(score.overall_score, 62);
    assert_eq!(score.approval_status, ApprovalStatus::Approved);
}

#[test]
fn ranks_by_score_and_explains_gap() {
    let lenders = vec![
        conservative_lender("avanse", "Avanse"),
        lender("credila", "Credila"),
    ];
    let ranking = rank_lenders(&engine(), &strong_lead("lead-1"), &lenders, at()).unwrap();

    let result = &ranking.result;
    assert_eq!(result.top_lender_id, Some(LenderId("credila".to_string())));
    assert_eq!(result.evaluations[0].lender_id.0, "credila");
    assert_eq!(result.evaluations[0].gap_reason, None);

    let runner_up = &result.evaluations[1];
    assert_eq!(runner_up.score, Some(80));
    assert_eq!(runner_up.rate_tier, Some(RateTierName::Good));
    assert_eq!(
        runner_up.gap_reason,
        Some(GapReason::ScoreAndRateTier {
            points: 12,
            steps: 1
        })
    );
    assert_eq!(
        runner_up.gap_reason.as_ref().map(GapReason::summary).as_deref(),
        Some("score 12 points below top pick and rate tier one step higher")
    );

    let selected = ranking.selected.expect("selected snapshot");
    assert_eq!(selected.lender_id, Some(LenderId("credila".to_string())));
}

#[test]
fn equal_scores_prefer_lower_rate_then_directory_order() {
    let lenders = vec![
        lender("credila", "Credila"),
        lender("hdfc", "HDFC Credila"),
        premium_lender("prodigy", "Prodigy"),
    ];
    let ranking = rank_lenders(&engine(), &strong_lead("lead-1"), &lenders, at()).unwrap();
    let order: Vec<&str> = ranking
        .result
        .evaluations
        .iter()
        .map(|evaluation| evaluation.lender_id.0.as_str())
        .collect();

    assert_eq!(order, vec!["prodigy", "credila", "hdfc"]);
    assert_eq!(
        ranking.result.evaluations[1].gap_reason,
        Some(GapReason::HigherRate { basis_points: 50 })
    );
    assert_eq!(
        ranking.result.evaluations[2].gap_reason,
        Some(GapReason::HigherRate { basis_points: 50 })
    );
}

#[test]
fn rate_gap_wording_holds_when_runner_up_sits_on_a_better_tier() {
    let mut strict = lender("strict", "Strict Bank");
    strict.config.rate_config.excellent = RateTier {
        min_rate: 6.0,
        max_rate: 7.0,
        score_threshold: 95,
    };
    strict.config.rate_config.good = RateTier {
        min_rate: 8.0,
        max_rate: 8.5,
        score_threshold: 75,
    };
    let lenders = vec![lender("credila", "Credila"), strict];
    let ranking = rank_lenders(&engine(), &strong_lead("lead-1"), &lenders, at()).unwrap();

    let top = &ranking.result.evaluations[0];
    assert_eq!(top.lender_id, LenderId("strict".to_string()));
    assert_eq!(top.rate_tier, Some(RateTierName::Good));

    let runner_up = &ranking.result.evaluations[1];
    assert_eq!(runner_up.rate_tier, Some(RateTierName::Excellent));
    assert_eq!(
        runner_up.gap_reason,
        Some(GapReason::HigherRate { basis_points: 75 })
    );
    assert_eq!(
        runner_up.gap_reason.as_ref().map(GapReason::summary).as_deref(),
        Some("rate 0.75% higher than top pick")
    );
}

#[test]
fn identical_lenders_fall_back_to_onboarding_order() {
    let lenders = vec![lender("first", "First"), lender("second", "Second")];
    let ranking = rank_lenders(&engine(), &strong_lead("lead-1"), &lenders, at()).unwrap();

    assert_eq!(ranking.result.top_lender_id, Some(LenderId("first".to_string())));
    assert_eq!(
        ranking.result.evaluations[1].gap_reason,
        Some(GapReason::TieBreak)
    );
}

#[test]
fn gated_lenders_are_listed_but_never_recommended() {
    let lenders = vec![
        capped_lender("small", "Small Ticket", 1_000_000),
        uk_only_lender("uk", "UK Only"),
        lender("credila", "Credila"),
    ];
    let ranking = rank_lenders(&engine(), &strong_lead("lead-1"), &lenders, at()).unwrap();
    let result = ranking.result;

    assert_eq!(result.top_lender_id, Some(LenderId("credila".to_string())));
    assert_eq!(result.evaluations.len(), 3);

    let small = &result.evaluations[1];
    assert_eq!(small.lender_id.0, "small");
    assert!(!small.eligible);
    assert_eq!(small.score, None);
    assert_eq!(
        small.gap_reason,
        Some(GapReason::Ineligible {
            reason: IneligibilityReason::ExceedsMaxLoan {
                requested: 2_000_000,
                max: 1_000_000
            }
        })
    );

    let uk = &result.evaluations[2];
    assert!(matches!(
        uk.gap_reason,
        Some(GapReason::Ineligible {
            reason: IneligibilityReason::DestinationNotSupported { .. }
        })
    ));
}

#[test]
fn unmapped_university_is_gated_when_lender_refuses_defaults() {
    let mut strict = lender("strict", "Strict");
    strict.config.university_grade_mapping.accept_unmapped = false;
    let mut lead = strong_lead("lead-5");
    lead.universities[0].reference_tier = None;

    let ranking = rank_lenders(&engine(), &lead, &[strict], at()).unwrap();
    assert_eq!(ranking.result.top_lender_id, None);
    assert_eq!(
        ranking.result.evaluations[0].gap_reason,
        Some(GapReason::Ineligible {
            reason: IneligibilityReason::UniversityNotMapped {
                university_id: "uni-cmu".to_string()
            }
        })
    );

    let fallback = ranking.selected.expect("fallback snapshot");
    assert_eq!(fallback.approval_status, ApprovalStatus::Rejected);
    assert_eq!(fallback.rejection_reason, Some(RejectionReason::NoEligibleLender));
}

#[test]
fn rejected_leads_keep_best_rejected_snapshot() {
    let lenders = vec![lender("credila", "Credila"), lender("avanse", "Avanse")];
    let ranking = rank_lenders(&engine(), &weak_lead("lead-2"), &lenders, at()).unwrap();

    assert_eq!(ranking.result.top_lender_id, None);
    assert!(ranking
        .result
        .evaluations
        .iter()
        .all(|evaluation| !evaluation.eligible));

    let snapshot = ranking.selected.expect("rejected snapshot");
    assert_eq!(snapshot.overall_score, 37);
    assert_eq!(snapshot.lender_id, Some(LenderId("credila".to_string())));
    assert_eq!(
        snapshot.rejection_reason,
        Some(RejectionReason::BelowMinimumScore {
            minimum: 40,
            actual: 37
        })
    );
    assert_eq!(snapshot.eligible_loan_max, 0);
}

#[test]
fn broken_lender_config_blocks_the_run() {
    let mut broken = lender("broken", "Broken");
    broken.config.loan_bands.pop();
    let lenders = vec![lender("credila", "Credila"), broken];

    let err = rank_lenders(&engine(), &strong_lead("lead-1"), &lenders, at()).unwrap_err();
    assert_eq!(err, ConfigurationError::BandsDoNotStartAtZero { min_score: 60 });
}
