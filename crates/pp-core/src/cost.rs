//! Cost aggregation.
//!
//! Turns material lines, labor time and markup percentages into a
//! [`CostBreakdown`].
//!
//! # Algorithm
//!
//! 1. `yarn = Σ yarn line costs`
//! 2. `materials = Σ material line costs + waste`
//! 3. `labor = productive hours × hourly rate`
//! 4. `rework = rework hours × hourly rate`
//! 5. `total = yarn + materials + labor + rework`
//! 6. `with_indirects = total × (1 + indirect% / 100)`
//! 7. `final = with_indirects × (1 + margin% / 100)`
//!
//! Nothing is rounded here; rounding belongs to presentation.

use serde::{Deserialize, Serialize};

use crate::materials::{MaterialLine, YarnLine};
use crate::numeric::non_negative;
use crate::timer::SECONDS_PER_HOUR;

/// Average number of weeks in a month, used by the hourly-rate helper.
pub const WEEKS_PER_MONTH: f64 = 4.33;

/// Every input of the breakdown, already parsed.
#[derive(Debug, Clone, Copy)]
pub struct CostInputs<'a> {
    pub yarns: &'a [YarnLine],
    pub materials: &'a [MaterialLine],
    pub waste_cost: f64,
    pub hourly_rate: f64,
    pub productive_seconds: u64,
    pub rework_seconds: u64,
    pub indirect_percent: f64,
    pub margin_percent: f64,
}

/// Computed cost and price of a piece.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub yarn_cost: f64,
    /// Material lines plus waste.
    pub materials_cost: f64,
    pub waste_cost: f64,
    pub labor_cost: f64,
    pub rework_cost: f64,
    pub total_cost: f64,
    pub cost_with_indirects: f64,
    pub final_price: f64,
}

impl CostBreakdown {
    /// Every amount paired with its field name.
    pub const fn amounts(&self) -> [(&'static str, f64); 8] {
        [
            ("yarn_cost", self.yarn_cost),
            ("materials_cost", self.materials_cost),
            ("waste_cost", self.waste_cost),
            ("labor_cost", self.labor_cost),
            ("rework_cost", self.rework_cost),
            ("total_cost", self.total_cost),
            ("cost_with_indirects", self.cost_with_indirects),
            ("final_price", self.final_price),
        ]
    }
}

/// Computes the breakdown. Never fails: unusable numbers count as zero.
///
/// Every field is finite and non-negative, including `+0.0` for an empty
/// form. Overflowing terms count as zero.
pub fn aggregate(inputs: &CostInputs<'_>) -> CostBreakdown {
    let yarn_cost = line_total(inputs.yarns.iter().map(YarnLine::cost));
    let waste_cost = non_negative(inputs.waste_cost);
    let materials_cost =
        non_negative(line_total(inputs.materials.iter().map(MaterialLine::cost)) + waste_cost);
    let hourly_rate = non_negative(inputs.hourly_rate);
    let labor_cost = non_negative(seconds_to_hours(inputs.productive_seconds) * hourly_rate);
    let rework_cost = non_negative(seconds_to_hours(inputs.rework_seconds) * hourly_rate);

    let total_cost = non_negative(yarn_cost + materials_cost + labor_cost + rework_cost);
    let cost_with_indirects =
        non_negative(total_cost * (1.0 + non_negative(inputs.indirect_percent) / 100.0));
    let final_price =
        non_negative(cost_with_indirects * (1.0 + non_negative(inputs.margin_percent) / 100.0));

    CostBreakdown {
        yarn_cost,
        materials_cost,
        waste_cost,
        labor_cost,
        rework_cost,
        total_cost,
        cost_with_indirects,
        final_price,
    }
}

// `Iterator::sum` of no floats is `-0.0`.
fn line_total(costs: impl Iterator<Item = f64>) -> f64 {
    non_negative(costs.fold(0.0, |acc, cost| acc + non_negative(cost)))
}

#[expect(
    clippy::cast_precision_loss,
    reason = "second counts stay far below 2^52"
)]
fn seconds_to_hours(seconds: u64) -> f64 {
    seconds as f64 / SECONDS_PER_HOUR as f64
}

/// Price per gram of a skein, if both figures are positive.
pub fn price_per_gram(skein_price: f64, skein_weight: f64) -> Option<f64> {
    (skein_price.is_finite() && skein_price > 0.0 && skein_weight.is_finite() && skein_weight > 0.0)
        .then(|| skein_price / skein_weight)
}

/// Hourly rate that earns `monthly_salary` working the given schedule.
pub fn suggested_hourly_rate(
    monthly_salary: f64,
    hours_per_day: f64,
    days_per_week: f64,
) -> Option<f64> {
    let all_positive = [monthly_salary, hours_per_day, days_per_week]
        .iter()
        .all(|value| value.is_finite() && *value > 0.0);
    all_positive.then(|| monthly_salary / (hours_per_day * days_per_week * WEEKS_PER_MONTH))
}
