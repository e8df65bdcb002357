//! Status command: the current form, timer and price breakdown.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use pp_core::{CostBreakdown, MaterialLine, PricingState, YarnLine};
use serde::Serialize;

use super::util::{format_hms, format_money, format_per_gram, open_session};
use crate::Config;

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    piece_name: &'a str,
    piece_type: &'a str,
    timer: TimerReport,
    hourly_rate: f64,
    custom_rate: bool,
    indirect_percent: f64,
    margin_percent: f64,
    yarns: &'a [YarnLine],
    materials: &'a [MaterialLine],
    breakdown: CostBreakdown,
}

#[derive(Debug, Serialize)]
struct TimerReport {
    phase: &'static str,
    rework_mode: bool,
    session_seconds: u64,
    accumulated_seconds: u64,
    productive_seconds: u64,
    rework_seconds: u64,
}

fn phase_label(state: &PricingState) -> &'static str {
    if state.timer.is_running() {
        "running"
    } else if state.timer.is_paused() {
        "paused"
    } else {
        "idle"
    }
}

fn build_report(state: &PricingState) -> StatusReport<'_> {
    let timer = &state.timer;
    StatusReport {
        piece_name: &state.piece_name,
        piece_type: &state.piece_type,
        timer: TimerReport {
            phase: phase_label(state),
            rework_mode: timer.is_rework_mode(),
            session_seconds: timer.current_session_seconds(),
            accumulated_seconds: timer.accumulated_seconds(),
            productive_seconds: timer.total_productive_seconds(),
            rework_seconds: timer.rework_seconds(),
        },
        hourly_rate: state.hourly_rate(),
        custom_rate: state.has_custom_rate(),
        indirect_percent: state.indirect_percent(),
        margin_percent: state.margin_percent(),
        yarns: &state.yarns,
        materials: &state.materials,
        breakdown: state.breakdown(),
    }
}

/// Renders the form as a human-readable summary.
pub fn format_status(state: &PricingState, currency: &str) -> String {
    use std::fmt::Write as _;

    let report = build_report(state);
    let money = |amount| format_money(currency, amount);
    let mut out = String::new();

    let name = if report.piece_name.is_empty() {
        "(unnamed)"
    } else {
        report.piece_name
    };
    let _ = write!(out, "Piece: {name}");
    if !report.piece_type.is_empty() {
        let _ = write!(out, " ({})", report.piece_type);
    }
    out.push('\n');

    let timer = &report.timer;
    let mode = if timer.rework_mode { ", rework mode" } else { "" };
    let _ = writeln!(out, "Timer: {}{mode}", timer.phase);
    let _ = writeln!(out, "  Session:    {}", format_hms(timer.session_seconds));
    let _ = writeln!(out, "  Productive: {}", format_hms(timer.productive_seconds));
    let _ = writeln!(out, "  Rework:     {}", format_hms(timer.rework_seconds));

    out.push_str("\nYarns:\n");
    if report.yarns.is_empty() {
        out.push_str("  (none)\n");
    }
    for yarn in report.yarns {
        let _ = writeln!(
            out,
            "  [{}] {}: {} g x {} = {}",
            yarn.id,
            yarn.name,
            yarn.used_weight(),
            format_per_gram(currency, yarn.price_per_gram),
            money(yarn.cost())
        );
    }

    out.push_str("Materials:\n");
    if report.materials.is_empty() {
        out.push_str("  (none)\n");
    }
    for material in report.materials {
        let _ = writeln!(
            out,
            "  [{}] {}: {} x {} = {}",
            material.id,
            material.name,
            material.quantity,
            money(material.unit_price),
            money(material.cost())
        );
    }

    let rate_source = if report.custom_rate { "custom" } else { "base" };
    let _ = writeln!(
        out,
        "\nHourly rate: {}/h ({rate_source})",
        money(report.hourly_rate)
    );
    let _ = writeln!(out, "Indirect costs: {}%", report.indirect_percent);
    let _ = writeln!(out, "Profit margin: {}%", report.margin_percent);

    let b = &report.breakdown;
    let _ = writeln!(out, "\nYarn:           {}", money(b.yarn_cost));
    let _ = writeln!(
        out,
        "Materials:      {} (waste {})",
        money(b.materials_cost),
        money(b.waste_cost)
    );
    let _ = writeln!(out, "Labor:          {}", money(b.labor_cost));
    let _ = writeln!(out, "Rework:         {}", money(b.rework_cost));
    let _ = writeln!(out, "Total cost:     {}", money(b.total_cost));
    let _ = writeln!(out, "With indirects: {}", money(b.cost_with_indirects));
    let _ = writeln!(out, "Final price:    {}", money(b.final_price));
    out
}

/// Renders the form as JSON.
pub fn format_status_json(state: &PricingState) -> Result<String> {
    Ok(serde_json::to_string_pretty(&build_report(state))?)
}

pub fn run<W: Write>(writer: &mut W, json: bool, config: &Config) -> Result<()> {
    run_at(writer, json, config, Utc::now())
}

pub fn run_at<W: Write>(
    writer: &mut W,
    json: bool,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<()> {
    let session = open_session(config, now)?;
    if json {
        writeln!(writer, "{}", format_status_json(session.state())?)?;
    } else {
        write!(writer, "{}", format_status(session.state(), &config.currency))?;
    }
    Ok(())
}
