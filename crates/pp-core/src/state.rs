//! Calculator session state and its persisted form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cost::{CostBreakdown, CostInputs, aggregate};
use crate::materials::{MaterialLine, YarnLine};
use crate::numeric::{
    DEFAULT_INDIRECT_PERCENT, DEFAULT_MARGIN_PERCENT, parse_or, parse_or_zero,
};
use crate::piece::{PieceSnapshot, RecipeSnapshot};
use crate::timer::{TimerEngine, TimerSnapshot};

/// Hourly rate used before the user sets one.
pub const DEFAULT_BASE_HOURLY_RATE: f64 = 30.0;

/// Everything the calculator knows about the piece being priced.
///
/// Free-text form fields (waste, custom rate, percentages) are kept as
/// typed and parsed on every recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingState {
    pub piece_name: String,
    pub piece_type: String,
    pub timer: TimerEngine,
    pub yarns: Vec<YarnLine>,
    pub materials: Vec<MaterialLine>,
    pub waste_input: String,
    pub custom_rate_input: String,
    pub indirect_input: String,
    pub margin_input: String,
    pub base_hourly_rate: f64,
}

impl Default for PricingState {
    fn default() -> Self {
        Self::with_base_rate(DEFAULT_BASE_HOURLY_RATE)
    }
}

impl PricingState {
    /// Creates an empty form using `base_hourly_rate`.
    pub fn with_base_rate(base_hourly_rate: f64) -> Self {
        Self {
            piece_name: String::new(),
            piece_type: String::new(),
            timer: TimerEngine::new(),
            yarns: Vec::new(),
            materials: Vec::new(),
            waste_input: String::new(),
            custom_rate_input: String::new(),
            indirect_input: String::new(),
            margin_input: String::new(),
            base_hourly_rate,
        }
    }

    /// Rebuilds the session from persisted state.
    ///
    /// The base hourly rate lives outside the form and is passed separately.
    pub fn restore(saved: SerializedState, base_hourly_rate: f64) -> Self {
        Self {
            piece_name: saved.piece_name,
            piece_type: saved.piece_type,
            timer: TimerEngine::restore(&saved.timer),
            yarns: saved.yarns,
            materials: saved.other_materials,
            waste_input: saved.waste_cost,
            custom_rate_input: saved.custom_hourly_rate,
            indirect_input: saved.indirect_costs,
            margin_input: saved.profit_margin,
            base_hourly_rate,
        }
    }

    /// Returns the persisted form of the session.
    pub fn to_serialized(&self) -> SerializedState {
        SerializedState {
            piece_name: self.piece_name.clone(),
            piece_type: self.piece_type.clone(),
            yarns: self.yarns.clone(),
            other_materials: self.materials.clone(),
            waste_cost: self.waste_input.clone(),
            custom_hourly_rate: self.custom_rate_input.clone(),
            indirect_costs: self.indirect_input.clone(),
            profit_margin: self.margin_input.clone(),
            timer: self.timer.snapshot(),
        }
    }

    /// Whether a positive per-piece rate overrides the base rate.
    pub fn has_custom_rate(&self) -> bool {
        parse_or_zero(&self.custom_rate_input) > 0.0
    }

    /// Custom rate if one is set and positive, otherwise the base rate.
    pub fn hourly_rate(&self) -> f64 {
        if self.has_custom_rate() {
            parse_or_zero(&self.custom_rate_input)
        } else {
            self.base_hourly_rate
        }
    }

    pub fn waste_cost(&self) -> f64 {
        parse_or_zero(&self.waste_input)
    }

    pub fn indirect_percent(&self) -> f64 {
        parse_or(&self.indirect_input, DEFAULT_INDIRECT_PERCENT)
    }

    pub fn margin_percent(&self) -> f64 {
        parse_or(&self.margin_input, DEFAULT_MARGIN_PERCENT)
    }

    /// Gathers the aggregator inputs from the form.
    pub fn cost_inputs(&self) -> CostInputs<'_> {
        CostInputs {
            yarns: &self.yarns,
            materials: &self.materials,
            waste_cost: self.waste_cost(),
            hourly_rate: self.hourly_rate(),
            productive_seconds: self.timer.total_productive_seconds(),
            rework_seconds: self.timer.rework_seconds(),
            indirect_percent: self.indirect_percent(),
            margin_percent: self.margin_percent(),
        }
    }

    pub fn breakdown(&self) -> CostBreakdown {
        aggregate(&self.cost_inputs())
    }

    /// Captures the current form as a priced piece.
    pub fn piece_snapshot(&self, saved_at: DateTime<Utc>) -> PieceSnapshot {
        PieceSnapshot {
            name: self.piece_name.trim().to_string(),
            piece_type: self.piece_type.trim().to_string(),
            breakdown: self.breakdown(),
            yarns: self.yarns.clone(),
            materials: self.materials.clone(),
            productive_seconds: self.timer.total_productive_seconds(),
            rework_seconds: self.timer.rework_seconds(),
            hourly_rate: self.hourly_rate(),
            indirect_percent: self.indirect_percent(),
            margin_percent: self.margin_percent(),
            saved_at,
        }
    }

    /// Captures the current material lists as a recipe.
    pub fn recipe_snapshot(
        &self,
        name: &str,
        description: &str,
        steps: &str,
        sale_price: f64,
        created_at: DateTime<Utc>,
    ) -> RecipeSnapshot {
        RecipeSnapshot {
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            steps: steps.trim().to_string(),
            sale_price,
            piece_type: self.piece_type.trim().to_string(),
            yarns: self.yarns.clone(),
            materials: self.materials.clone(),
            productive_seconds: self.timer.total_productive_seconds(),
            indirect_percent: Some(self.indirect_percent()),
            margin_percent: Some(self.margin_percent()),
            created_at,
        }
    }
}

/// Persisted form state.
///
/// Every field defaults, so partial or older payloads still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializedState {
    pub piece_name: String,
    pub piece_type: String,
    pub yarns: Vec<YarnLine>,
    pub other_materials: Vec<MaterialLine>,
    pub waste_cost: String,
    pub custom_hourly_rate: String,
    pub indirect_costs: String,
    pub profit_margin: String,
    #[serde(flatten)]
    pub timer: TimerSnapshot,
}

impl SerializedState {
    /// Parses a stored payload, returning `None` if it is unreadable.
    pub fn from_json(payload: &str) -> Option<Self> {
        match serde_json::from_str(payload) {
            Ok(state) => Some(state),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable saved form state");
                None
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LineId;
    use chrono::TimeZone;

    fn sample_state() -> PricingState {
        let mut state = PricingState::with_base_rate(20.0);
        state.piece_name = "Bunny".to_string();
        state.piece_type = "Amigurumi".to_string();
        state.yarns.push(YarnLine {
            id: LineId::new(1),
            name: "Cotton".to_string(),
            price_per_gram: 0.05,
            initial_weight: 100.0,
            final_weight: 60.0,
        });
        state.materials.push(MaterialLine {
            id: LineId::new(2),
            name: "Safety eyes".to_string(),
            quantity: 2,
            unit_price: 1.5,
        });
        state.timer.add_manual_time(1, 0).unwrap();
        state
    }

    #[test]
    fn empty_percent_fields_use_defaults() {
        let state = PricingState::default();
        assert!((state.indirect_percent() - 15.0).abs() < f64::EPSILON);
        assert!((state.margin_percent() - 30.0).abs() < f64::EPSILON);
        assert!((state.hourly_rate() - DEFAULT_BASE_HOURLY_RATE).abs() < f64::EPSILON);
    }

    #[test]
    fn explicit_zero_percent_is_respected() {
        let mut state = PricingState::default();
        state.indirect_input = "0".to_string();
        assert!(state.indirect_percent().abs() < f64::EPSILON);
    }

    #[test]
    fn custom_rate_overrides_base_when_positive() {
        let mut state = PricingState::with_base_rate(20.0);
        state.custom_rate_input = "35".to_string();
        assert!((state.hourly_rate() - 35.0).abs() < f64::EPSILON);
        state.custom_rate_input = "0".to_string();
        assert!((state.hourly_rate() - 20.0).abs() < f64::EPSILON);
        state.custom_rate_input = "abc".to_string();
        assert!((state.hourly_rate() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn breakdown_of_sample_state() {
        let breakdown = sample_state().breakdown();
        assert!((breakdown.total_cost - 25.0).abs() < 1e-9);
        assert!((breakdown.final_price - 37.375).abs() < 1e-9);
    }

    #[test]
    fn serialized_state_round_trips() {
        let mut state = sample_state();
        state.waste_input = "0,75".to_string();
        state.timer.start(Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap());

        let json = state.to_serialized().to_json().unwrap();
        let loaded = SerializedState::from_json(&json).unwrap();
        assert_eq!(PricingState::restore(loaded, 20.0), state);
    }

    #[test]
    fn corrupt_payload_loads_as_none() {
        assert_eq!(SerializedState::from_json("{not json"), None);
        assert_eq!(SerializedState::from_json(r#"{"yarns": 3}"#), None);
    }

    #[test]
    fn partial_payload_fills_defaults() {
        let loaded = SerializedState::from_json(r#"{"piece_name": "Hat"}"#).unwrap();
        let state = PricingState::restore(loaded, 30.0);
        assert_eq!(state.piece_name, "Hat");
        assert!(state.yarns.is_empty());
        assert_eq!(state.timer, TimerEngine::new());
    }

    #[test]
    fn piece_snapshot_captures_totals() {
        let saved_at = Utc.with_ymd_and_hms(2025, 2, 2, 10, 0, 0).unwrap();
        let piece = sample_state().piece_snapshot(saved_at);
        assert_eq!(piece.productive_seconds, 3600);
        assert_eq!(piece.yarns.len(), 1);
        assert!((piece.hourly_rate - 20.0).abs() < f64::EPSILON);
        assert!((piece.breakdown.final_price - 37.375).abs() < 1e-9);
        assert_eq!(piece.saved_at, saved_at);
    }
}
