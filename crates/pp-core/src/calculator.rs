//! Calculator controller.
//!
//! [`Calculator`] owns the [`PricingState`] of one session. Each operation
//! is a synchronous state transition; after every successful mutation the
//! breakdown is recomputed and handed to the registered [`Effect`]s
//! (persistence, display). Rejected operations change nothing and dispatch
//! nothing.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::cost::CostBreakdown;
use crate::materials::{
    MaterialLine, NewMaterial, NewYarn, YarnLine, next_line_id, validate_quantity, validate_weights,
};
use crate::notify::{Notifier, Severity};
use crate::numeric::{parse_or_zero, to_input};
use crate::piece::{PieceSnapshot, RecipeSnapshot};
use crate::state::PricingState;
use crate::timer::TimerError;
use crate::types::{LineId, ValidationError, require_non_negative, require_text};

/// Errors returned by calculator operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalcError {
    /// Rejected user input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A timer precondition was not met.
    #[error(transparent)]
    Timer(#[from] TimerError),

    /// No line with the given id exists.
    #[error("no {kind} with id {id}")]
    UnknownLine { kind: &'static str, id: LineId },
}

impl CalcError {
    /// Precondition failures are harmless no-ops; everything else is an error.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timer(_))
    }

    pub const fn severity(&self) -> Severity {
        if self.is_recoverable() {
            Severity::Info
        } else {
            Severity::Error
        }
    }
}

/// Reports a rejected operation through `notifier`.
///
/// Recoverable failures become `Ok(None)` after notifying; other errors are
/// notified and returned.
pub fn settle<T>(
    result: Result<T, CalcError>,
    notifier: &mut dyn Notifier,
) -> Result<Option<T>, CalcError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            notifier.notify(&err.to_string(), err.severity());
            if err.is_recoverable() {
                Ok(None)
            } else {
                Err(err)
            }
        }
    }
}

/// Side effect run after every state change.
pub trait Effect {
    fn apply(&mut self, state: &PricingState, breakdown: &CostBreakdown);
}

/// Session controller: state transitions plus effect dispatch.
pub struct Calculator<'a> {
    state: PricingState,
    effects: Vec<Box<dyn Effect + 'a>>,
}

impl std::fmt::Debug for Calculator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Calculator")
            .field("state", &self.state)
            .field("effects", &self.effects.len())
            .finish()
    }
}

impl<'a> Calculator<'a> {
    pub fn new(state: PricingState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    /// Registers an effect to run after every change.
    pub fn subscribe(&mut self, effect: Box<dyn Effect + 'a>) {
        self.effects.push(effect);
    }

    pub const fn state(&self) -> &PricingState {
        &self.state
    }

    pub fn into_state(self) -> PricingState {
        self.state
    }

    pub fn breakdown(&self) -> CostBreakdown {
        self.state.breakdown()
    }

    fn dispatch(&mut self) {
        let breakdown = self.state.breakdown();
        for effect in &mut self.effects {
            effect.apply(&self.state, &breakdown);
        }
    }

    /// Dispatches only when an operation reports a mutation.
    fn changed_if(&mut self, changed: bool) -> bool {
        if changed {
            self.dispatch();
        }
        changed
    }

    // ========== Timer ==========

    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        let changed = self.state.timer.start(now);
        self.changed_if(changed)
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        let changed = self.state.timer.pause(now);
        self.changed_if(changed)
    }

    pub fn tick(&mut self) -> bool {
        let changed = self.state.timer.tick();
        self.changed_if(changed)
    }

    /// Credits elapsed wall-clock time to a running timer.
    pub fn catch_up(&mut self, now: DateTime<Utc>) -> u64 {
        let credited = self.state.timer.catch_up(now);
        self.changed_if(credited > 0);
        credited
    }

    pub fn toggle_rework(&mut self, now: DateTime<Utc>) -> bool {
        let rework = self.state.timer.toggle_rework(now);
        self.dispatch();
        rework
    }

    pub fn reset(&mut self, now: DateTime<Utc>, confirmed: bool) -> Result<(), CalcError> {
        self.state.timer.reset(now, confirmed)?;
        self.dispatch();
        Ok(())
    }

    pub fn add_manual_time(&mut self, hours: u64, minutes: u64) -> Result<u64, CalcError> {
        let added = self.state.timer.add_manual_time(hours, minutes)?;
        self.dispatch();
        Ok(added)
    }

    pub fn save_session(&mut self, now: DateTime<Utc>) -> Result<u64, CalcError> {
        let folded = self.state.timer.save_session(now)?;
        self.dispatch();
        Ok(folded)
    }

    pub fn edit_total(&mut self, hours: u64, minutes: u64) {
        self.state.timer.edit_total(hours, minutes);
        self.dispatch();
    }

    // ========== Materials ==========

    pub fn add_yarn(&mut self, yarn: NewYarn) -> Result<LineId, CalcError> {
        yarn.validate()?;
        let id = next_line_id(&self.state.yarns, &self.state.materials);
        self.state.yarns.push(yarn.into_line(id));
        self.dispatch();
        Ok(id)
    }

    /// Records the weights of a yarn before and after use.
    pub fn weigh_yarn(
        &mut self,
        id: LineId,
        initial_weight: f64,
        final_weight: f64,
    ) -> Result<(), CalcError> {
        validate_weights(initial_weight, final_weight)?;
        let yarn = self
            .state
            .yarns
            .iter_mut()
            .find(|yarn| yarn.id == id)
            .ok_or(CalcError::UnknownLine { kind: "yarn", id })?;
        yarn.initial_weight = initial_weight;
        yarn.final_weight = final_weight;
        self.dispatch();
        Ok(())
    }

    pub fn remove_yarn(&mut self, id: LineId) -> Result<YarnLine, CalcError> {
        let index = self
            .state
            .yarns
            .iter()
            .position(|yarn| yarn.id == id)
            .ok_or(CalcError::UnknownLine { kind: "yarn", id })?;
        let removed = self.state.yarns.remove(index);
        self.dispatch();
        Ok(removed)
    }

    pub fn add_material(&mut self, material: NewMaterial) -> Result<LineId, CalcError> {
        material.validate()?;
        let id = next_line_id(&self.state.yarns, &self.state.materials);
        self.state.materials.push(material.into_line(id));
        self.dispatch();
        Ok(id)
    }

    /// Changes how many units of a material the piece uses.
    pub fn set_material_quantity(&mut self, id: LineId, quantity: u32) -> Result<(), CalcError> {
        validate_quantity(quantity)?;
        let material = self
            .state
            .materials
            .iter_mut()
            .find(|material| material.id == id)
            .ok_or(CalcError::UnknownLine {
                kind: "material",
                id,
            })?;
        material.quantity = quantity;
        self.dispatch();
        Ok(())
    }

    pub fn remove_material(&mut self, id: LineId) -> Result<MaterialLine, CalcError> {
        let index = self
            .state
            .materials
            .iter()
            .position(|material| material.id == id)
            .ok_or(CalcError::UnknownLine {
                kind: "material",
                id,
            })?;
        let removed = self.state.materials.remove(index);
        self.dispatch();
        Ok(removed)
    }

    // ========== Form fields ==========

    pub fn set_waste_cost(&mut self, input: &str) {
        self.state.waste_input = input.trim().to_string();
        self.dispatch();
    }

    pub fn set_indirect_percent(&mut self, input: &str) {
        self.state.indirect_input = input.trim().to_string();
        self.dispatch();
    }

    pub fn set_margin_percent(&mut self, input: &str) {
        self.state.margin_input = input.trim().to_string();
        self.dispatch();
    }

    /// Sets or clears (empty input) the per-piece hourly rate override.
    pub fn set_custom_rate(&mut self, input: &str) {
        self.state.custom_rate_input = input.trim().to_string();
        self.dispatch();
    }

    pub fn set_base_rate(&mut self, rate: f64) -> Result<(), CalcError> {
        require_non_negative(rate, "base hourly rate")?;
        self.state.base_hourly_rate = rate;
        self.dispatch();
        Ok(())
    }

    pub fn set_piece_details(&mut self, name: Option<&str>, piece_type: Option<&str>) {
        if let Some(name) = name {
            self.state.piece_name = name.trim().to_string();
        }
        if let Some(piece_type) = piece_type {
            self.state.piece_type = piece_type.trim().to_string();
        }
        self.dispatch();
    }

    // ========== Pieces and recipes ==========

    /// Validates the form and captures it as a finished piece.
    ///
    /// Pauses the timer so the captured time is final. The form itself is
    /// left intact until [`clear_form`](Self::clear_form) is called, so a
    /// failed save loses nothing.
    pub fn finalize_piece(&mut self, now: DateTime<Utc>) -> Result<PieceSnapshot, CalcError> {
        require_text(&self.state.piece_name, "piece name")?;
        require_text(&self.state.piece_type, "piece type")?;
        if self.state.timer.pause(now) {
            self.dispatch();
        }
        Ok(self.state.piece_snapshot(now))
    }

    /// Starts a fresh piece: empties the form and resets the timer.
    ///
    /// Rates and markup percentages are kept.
    pub fn clear_form(&mut self) {
        self.state.piece_name.clear();
        self.state.piece_type.clear();
        self.state.yarns.clear();
        self.state.materials.clear();
        self.state.waste_input.clear();
        self.state.timer.clear();
        self.dispatch();
    }

    /// Loads a saved piece back into the form.
    pub fn load_piece(&mut self, piece: &PieceSnapshot, now: DateTime<Utc>) {
        self.state.piece_name.clone_from(&piece.name);
        self.state.piece_type.clone_from(&piece.piece_type);
        self.state.indirect_input = to_input(piece.indirect_percent);
        self.state.margin_input = to_input(piece.margin_percent);
        self.state.custom_rate_input.clear();
        self.state.yarns.clone_from(&piece.yarns);
        self.state.materials.clone_from(&piece.materials);
        self.state
            .timer
            .load_totals(now, piece.productive_seconds, piece.rework_seconds);
        self.dispatch();
    }

    /// Captures the current lists as a recipe.
    pub fn recipe_snapshot(
        &self,
        name: &str,
        description: &str,
        steps: &str,
        sale_price: &str,
        now: DateTime<Utc>,
    ) -> Result<RecipeSnapshot, CalcError> {
        require_text(name, "recipe name")?;
        Ok(self
            .state
            .recipe_snapshot(name, description, steps, parse_or_zero(sale_price), now))
    }

    /// Loads a recipe's materials and time into the form.
    ///
    /// Percentages missing from the recipe fall back to the defaults.
    pub fn load_recipe(&mut self, recipe: &RecipeSnapshot, now: DateTime<Utc>) {
        self.state.piece_name.clone_from(&recipe.name);
        self.state.piece_type.clone_from(&recipe.piece_type);
        self.state.indirect_input = recipe.indirect_percent.map(to_input).unwrap_or_default();
        self.state.margin_input = recipe.margin_percent.map(to_input).unwrap_or_default();
        self.state.yarns.clone_from(&recipe.yarns);
        self.state.materials.clone_from(&recipe.materials);
        self.state
            .timer
            .load_totals(now, recipe.productive_seconds, 0);
        self.dispatch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use chrono::{Duration, TimeZone};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 14, 0, 0).unwrap()
    }

    /// Records the final price seen by each dispatch.
    struct PriceLog(Rc<RefCell<Vec<f64>>>);

    impl Effect for PriceLog {
        fn apply(&mut self, _state: &PricingState, breakdown: &CostBreakdown) {
            self.0.borrow_mut().push(breakdown.final_price);
        }
    }

    fn calculator_with_log() -> (Calculator<'static>, Rc<RefCell<Vec<f64>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut calc = Calculator::new(PricingState::with_base_rate(20.0));
        calc.subscribe(Box::new(PriceLog(Rc::clone(&log))));
        (calc, log)
    }

    fn cotton() -> NewYarn {
        NewYarn {
            name: "Cotton".to_string(),
            price_per_gram: 0.05,
            initial_weight: 0.0,
            final_weight: 0.0,
        }
    }

    #[test]
    fn worked_example_through_operations() {
        let (mut calc, log) = calculator_with_log();
        let yarn = calc.add_yarn(cotton()).unwrap();
        calc.weigh_yarn(yarn, 100.0, 60.0).unwrap();
        calc.add_material(NewMaterial {
            name: "Safety eyes".to_string(),
            quantity: 2,
            unit_price: 1.5,
        })
        .unwrap();
        calc.add_manual_time(1, 0).unwrap();

        let breakdown = calc.breakdown();
        assert!((breakdown.total_cost - 25.0).abs() < 1e-9);
        assert!((breakdown.final_price - 37.375).abs() < 1e-9);
        assert_eq!(log.borrow().len(), 4);
        let last = *log.borrow().last().unwrap();
        assert!((last - 37.375).abs() < 1e-9);
    }

    #[test]
    fn rejected_operations_do_not_dispatch() {
        let (mut calc, log) = calculator_with_log();
        let mut bad = cotton();
        bad.name = String::new();
        assert!(matches!(
            calc.add_yarn(bad),
            Err(CalcError::Validation(ValidationError::Empty { .. }))
        ));
        assert_eq!(
            calc.add_manual_time(0, 0),
            Err(CalcError::Timer(TimerError::ZeroManualTime))
        );
        assert!(calc.weigh_yarn(LineId::new(9), 10.0, 5.0).is_err());
        assert!(!calc.pause(t0()));
        assert!(log.borrow().is_empty());
        assert!(calc.state().yarns.is_empty());
    }

    #[test]
    fn weigh_yarn_rejects_final_above_initial() {
        let (mut calc, _log) = calculator_with_log();
        let id = calc.add_yarn(cotton()).unwrap();
        let err = calc.weigh_yarn(id, 50.0, 80.0).unwrap_err();
        assert!(matches!(
            err,
            CalcError::Validation(ValidationError::FinalExceedsInitial { .. })
        ));
        assert!(calc.state().yarns[0].initial_weight.abs() < f64::EPSILON);
    }

    #[test]
    fn material_quantity_edits_recompute() {
        let (mut calc, log) = calculator_with_log();
        let id = calc
            .add_material(NewMaterial {
                name: "Safety eyes".to_string(),
                quantity: 2,
                unit_price: 1.5,
            })
            .unwrap();

        calc.set_material_quantity(id, 4).unwrap();
        assert_eq!(calc.state().materials[0].quantity, 4);
        assert!((calc.breakdown().materials_cost - 6.0).abs() < 1e-9);
        assert_eq!(log.borrow().len(), 2);

        assert!(matches!(
            calc.set_material_quantity(id, 0),
            Err(CalcError::Validation(ValidationError::NotPositive { field: "quantity", .. }))
        ));
        assert!(matches!(
            calc.set_material_quantity(LineId::new(9), 1),
            Err(CalcError::UnknownLine { kind: "material", .. })
        ));
        assert_eq!(calc.state().materials[0].quantity, 4);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn line_ids_follow_insertion_order_across_lists() {
        let (mut calc, _log) = calculator_with_log();
        let first = calc.add_yarn(cotton()).unwrap();
        let second = calc
            .add_material(NewMaterial {
                name: "Bell".to_string(),
                quantity: 1,
                unit_price: 0.8,
            })
            .unwrap();
        let third = calc.add_yarn(cotton()).unwrap();
        assert_eq!([first, second, third].map(LineId::get), [1, 2, 3]);

        let removed = calc.remove_material(second).unwrap();
        assert_eq!(removed.name, "Bell");
        assert_eq!(
            calc.remove_material(second),
            Err(CalcError::UnknownLine {
                kind: "material",
                id: second
            })
        );
        calc.remove_yarn(first).unwrap();
        assert_eq!(calc.state().yarns.len(), 1);
        assert_eq!(calc.state().yarns[0].id, third);
    }

    #[test]
    fn ticks_trigger_recomputation() {
        let (mut calc, log) = calculator_with_log();
        calc.start(t0());
        for _ in 0..3 {
            assert!(calc.tick());
        }
        assert_eq!(calc.catch_up(t0() + Duration::seconds(3)), 0);
        assert_eq!(calc.catch_up(t0() + Duration::seconds(5)), 2);
        assert_eq!(log.borrow().len(), 5);
        assert_eq!(calc.state().timer.current_session_seconds(), 5);
    }

    #[test]
    fn reset_needs_confirmation_with_session_time() {
        let (mut calc, _log) = calculator_with_log();
        calc.start(t0());
        calc.catch_up(t0() + Duration::seconds(30));
        assert!(matches!(
            calc.reset(t0() + Duration::seconds(30), false),
            Err(CalcError::Timer(TimerError::ConfirmationRequired { seconds: 30 }))
        ));
        assert_eq!(calc.state().timer.current_session_seconds(), 30);
        calc.reset(t0() + Duration::seconds(30), true).unwrap();
        assert!(!calc.state().timer.is_running());
    }

    #[test]
    fn rejected_reset_changes_nothing() {
        let (mut calc, log) = calculator_with_log();
        calc.start(t0());
        let dispatched = log.borrow().len();
        let before = calc.state().clone();

        assert!(calc.reset(t0() + Duration::seconds(30), false).is_err());
        assert_eq!(calc.state(), &before);
        assert_eq!(log.borrow().len(), dispatched);
    }

    #[test]
    fn finalize_piece_requires_name_and_type() {
        let (mut calc, _log) = calculator_with_log();
        calc.start(t0());
        assert!(calc.finalize_piece(t0()).is_err());
        assert!(calc.state().timer.is_running());

        calc.set_piece_details(Some("Bunny"), Some("Amigurumi"));
        let piece = calc.finalize_piece(t0() + Duration::seconds(1800)).unwrap();
        assert!(calc.state().timer.is_paused());
        assert_eq!(piece.productive_seconds, 1800);
        assert!((piece.breakdown.labor_cost - 10.0).abs() < 1e-9);
        assert_eq!(calc.state().piece_name, "Bunny");
    }

    #[test]
    fn clear_form_keeps_rates_and_markup() {
        let (mut calc, _log) = calculator_with_log();
        calc.add_yarn(cotton()).unwrap();
        calc.set_margin_percent("50");
        calc.set_custom_rate("40");
        calc.add_manual_time(2, 0).unwrap();
        calc.clear_form();
        assert!(calc.state().yarns.is_empty());
        assert_eq!(calc.state().timer.total_seconds_for_labor(), 0);
        assert_eq!(calc.state().margin_input, "50");
        assert!((calc.state().hourly_rate() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn load_piece_restores_form_and_clears_custom_rate() {
        let (mut calc, _log) = calculator_with_log();
        calc.set_piece_details(Some("Bunny"), Some("Amigurumi"));
        calc.add_yarn(cotton()).unwrap();
        calc.set_indirect_percent("10");
        calc.add_manual_time(1, 30).unwrap();
        let piece = calc.finalize_piece(t0()).unwrap();
        calc.clear_form();

        calc.set_custom_rate("99");
        calc.start(t0());
        calc.load_piece(&piece, t0() + Duration::seconds(10));
        let state = calc.state();
        assert_eq!(state.piece_name, "Bunny");
        assert_eq!(state.indirect_input, "10");
        assert_eq!(state.margin_input, "30");
        assert!(state.custom_rate_input.is_empty());
        assert_eq!(state.yarns.len(), 1);
        assert_eq!(state.timer.accumulated_seconds(), 5400);
        assert!(state.timer.is_paused());
    }

    #[test]
    fn recipe_round_trip_into_form() {
        let (mut calc, _log) = calculator_with_log();
        calc.set_piece_details(None, Some("Keychain"));
        calc.add_yarn(cotton()).unwrap();
        calc.add_manual_time(0, 45).unwrap();
        assert!(matches!(
            calc.recipe_snapshot(" ", "", "", "", t0()),
            Err(CalcError::Validation(ValidationError::Empty { field: "recipe name" }))
        ));
        let mut recipe = calc
            .recipe_snapshot("Mini bunny", "Small", "1. Magic ring", "25,90", t0())
            .unwrap();
        assert!((recipe.sale_price - 25.9).abs() < 1e-9);
        recipe.indirect_percent = None;

        calc.clear_form();
        calc.load_recipe(&recipe, t0());
        let state = calc.state();
        assert_eq!(state.piece_name, "Mini bunny");
        assert_eq!(state.piece_type, "Keychain");
        assert!((state.indirect_percent() - 15.0).abs() < f64::EPSILON);
        assert_eq!(state.timer.accumulated_seconds(), 2700);
        assert_eq!(state.yarns.len(), 1);
    }

    #[test]
    fn base_rate_rejects_negative() {
        let (mut calc, _log) = calculator_with_log();
        assert!(calc.set_base_rate(-1.0).is_err());
        calc.set_base_rate(25.0).unwrap();
        assert!((calc.state().hourly_rate() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn settle_notifies_and_classifies() {
        let mut notifier = RecordingNotifier::default();
        let (mut calc, _log) = calculator_with_log();

        let outcome = settle(calc.add_manual_time(0, 0), &mut notifier).unwrap();
        assert_eq!(outcome, None);

        let err = settle(calc.remove_yarn(LineId::new(3)), &mut notifier).unwrap_err();
        assert_eq!(err.severity(), Severity::Error);

        let added = settle(calc.add_manual_time(0, 5), &mut notifier).unwrap();
        assert_eq!(added, Some(300));

        assert_eq!(
            notifier.messages,
            vec![
                (Severity::Info, "enter a number of hours or minutes to add".to_string()),
                (Severity::Error, "no yarn with id 3".to_string()),
            ]
        );
    }
}
