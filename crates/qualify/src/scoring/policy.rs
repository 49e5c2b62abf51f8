use super::RiskLevel;
use crate::rubric::Thresholds;

/// Map a total onto the rubric's bands. Each cutoff is inclusive at its lower
/// edge: `total >= low` is low risk, anything under `high` is critical.
pub fn classify(total: f64, thresholds: &Thresholds) -> RiskLevel {
    if total >= thresholds.low {
        RiskLevel::Low
    } else if total >= thresholds.medium {
        RiskLevel::Medium
    } else if total >= thresholds.high {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}
