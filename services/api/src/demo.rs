use crate::infra::{build_service, demo_leads};
use clap::Args;
use loan_bre::config::AppConfig;
use loan_bre::error::AppError;
use loan_bre::workflows::eligibility::{
    explain_score, EligibilityView, LeadId, LenderEvaluation, RecommendationResult,
};
use serde::Serialize;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Lead ids to score (defaults to every seeded lead)
    #[arg(long = "lead")]
    pub(crate) leads: Vec<String>,
    /// Print the raw recommendation payloads as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExplainArgs {
    /// Overall score for the lender being explained
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub(crate) score: u8,
    /// Lender the score belongs to
    #[arg(long)]
    pub(crate) lender: String,
    /// Top-ranked lender, when different from the one being explained
    #[arg(long)]
    pub(crate) top_lender: Option<String>,
    /// Short description of the gap to the top pick
    #[arg(long)]
    pub(crate) gap: Option<String>,
}

#[derive(Serialize)]
struct DemoPayload<'a> {
    recommendation: &'a RecommendationResult,
    eligibility: Option<&'a EligibilityView>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { leads, json } = args;
    let config = AppConfig::load()?;
    let service = build_service(&config.engine);

    let lead_ids: Vec<LeadId> = if leads.is_empty() {
        demo_leads().into_iter().map(|lead| lead.lead_id).collect()
    } else {
        leads.into_iter().map(LeadId).collect()
    };

    if !json {
        println!("Lender recommendation demo");
    }

    for lead_id in &lead_ids {
        let result = service.compute_recommendation(lead_id)?;
        let view = service.eligibility(lead_id).ok();

        if json {
            let payload = DemoPayload {
                recommendation: &result,
                eligibility: view.as_ref(),
            };
            let rendered =
                serde_json::to_string_pretty(&payload).map_err(std::io::Error::from)?;
            println!("{rendered}");
            continue;
        }

        render_recommendation(&result, view.as_ref());
    }

    Ok(())
}

pub(crate) fn run_explain(args: ExplainArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let insight = explain_score(
        args.score,
        &args.lender,
        args.top_lender.as_deref(),
        args.gap.as_deref(),
        &config.engine.insights,
    );
    println!("{}: {}", insight.label, insight.message);
    Ok(())
}

fn render_recommendation(result: &RecommendationResult, view: Option<&EligibilityView>) {
    println!("\nLead {}", result.lead_id);
    match result.top() {
        Some(top) => println!(
            "- Recommended lender: {} (score {})",
            top.lender_name,
            top.score.unwrap_or_default()
        ),
        None => println!("- No eligible lender"),
    }

    println!("Ranking:");
    for (position, evaluation) in result.evaluations.iter().enumerate() {
        println!("  {}. {}", position + 1, describe_evaluation(evaluation));
    }

    let Some(view) = view else {
        return;
    };
    let score = &view.score;
    println!(
        "Eligibility: {} | components university {} / student {} / co-applicant {} | overall {}",
        score.approval_status.label(),
        score.university_score,
        score.student_score,
        score.co_applicant_score,
        score.overall_score
    );
    if score.eligible_loan_max > 0 {
        println!(
            "- Eligible amount {} to {} ({})",
            score.eligible_loan_min,
            score.eligible_loan_max,
            score.loan_band_percentage.as_deref().unwrap_or("no band")
        );
    }
    if let Some(reason) = &score.rejection_reason {
        println!("- Rejected: {}", reason.summary());
    }
    if let Some(insight) = &view.insight {
        println!("- {}: {}", insight.label, insight.message);
    }
    for factor in &view.factors {
        println!("  * {}: {}", factor.title, factor.detail);
    }
}

fn describe_evaluation(evaluation: &LenderEvaluation) -> String {
    let mut line = evaluation.lender_name.clone();
    match evaluation.score {
        Some(score) => line.push_str(&format!(" | score {score}")),
        None => line.push_str(" | not scored"),
    }
    if let Some(status) = evaluation.approval_status {
        line.push_str(&format!(" | {}", status.label()));
    }
    if let (Some(tier), Some(rate)) = (evaluation.rate_tier, evaluation.rate_midpoint) {
        line.push_str(&format!(" | {} ~{rate:.2}%", tier.label()));
    }
    if let Some(gap) = &evaluation.gap_reason {
        line.push_str(&format!(" | {}", gap.summary()));
    }
    line
}
