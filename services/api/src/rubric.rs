use crate::infra::default_thresholds;
use clap::Args;
use qualify::config::AppConfig;
use qualify::error::AppError;
use qualify::rubric::{validate, RubricDefinition, RubricImporter, StoreError, WeightPolicy};
use qualify::Thresholds;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct RubricCheckArgs {
    /// Rubric CSV (pillar_id,pillar_name,pillar_weight,question_id,question_text,max_points)
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Minimum total for "low risk"
    #[arg(long)]
    pub(crate) low: Option<f64>,
    /// Minimum total for "medium risk"
    #[arg(long)]
    pub(crate) medium: Option<f64>,
    /// Minimum total for "high risk"; anything below is critical
    #[arg(long)]
    pub(crate) high: Option<f64>,
    /// Accept weights that do not total the configured amount
    #[arg(long)]
    pub(crate) allow_draft: bool,
}

pub(crate) fn run_rubric_check(args: RubricCheckArgs) -> Result<(), AppError> {
    let defaults = default_thresholds();
    let thresholds = Thresholds {
        low: args.low.unwrap_or(defaults.low),
        medium: args.medium.unwrap_or(defaults.medium),
        high: args.high.unwrap_or(defaults.high),
    };

    let policy = if args.allow_draft {
        WeightPolicy::DraftAllowed
    } else {
        AppConfig::load()?.scoring.weight_policy
    };

    let definition = RubricImporter::from_path(&args.csv, thresholds)?;
    render_rubric(&definition);

    match validate(&definition, policy) {
        Ok(()) => {
            println!("\nRubric is valid under the {} weight policy.", policy_label(policy));
            Ok(())
        }
        Err(error) => {
            println!("\nRubric rejected:");
            for issue in &error.issues {
                println!("- {issue}");
            }
            Err(StoreError::Validation(error).into())
        }
    }
}

fn render_rubric(definition: &RubricDefinition) {
    let thresholds = definition.thresholds;
    println!(
        "Thresholds: low risk >= {} | medium risk >= {} | high risk >= {}",
        thresholds.low, thresholds.medium, thresholds.high
    );
    println!("Total weight: {}", definition.total_weight());
    for pillar in &definition.pillars {
        println!(
            "- {} ({}) weight {} | {} question(s), {} point(s)",
            pillar.name,
            pillar.id,
            pillar.weight,
            pillar.questions.len(),
            pillar.max_points()
        );
    }
}

fn policy_label(policy: WeightPolicy) -> String {
    match policy {
        WeightPolicy::Strict { total } => format!("strict (total {total})"),
        WeightPolicy::DraftAllowed => "draft".to_string(),
    }
}
