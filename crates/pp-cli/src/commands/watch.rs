//! Live stopwatch.
//!
//! Runs on a current-thread tokio runtime. A one-second interval exists only
//! while the timer is running; every tick credits the wall-clock time elapsed
//! since the last credited instant, so a late tick never loses or doubles a
//! second. Commands are read line by line from stdin.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use pp_core::{Calculator, CostBreakdown, Effect, PricingState};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::{Interval, MissedTickBehavior};

use super::util::{format_hms, format_money, note, open_session, settle, success};
use crate::Config;

const HELP: &str = "commands: s = start, p = pause, r = toggle rework, save = save session, q = quit";

/// Redraws a one-line stopwatch after every change.
pub struct LiveLine<W: Write> {
    out: W,
    currency: String,
}

impl<W: Write> LiveLine<W> {
    pub const fn new(out: W, currency: String) -> Self {
        Self { out, currency }
    }
}

impl<W: Write> Effect for LiveLine<W> {
    fn apply(&mut self, state: &PricingState, breakdown: &CostBreakdown) {
        let timer = &state.timer;
        let mode = if timer.is_rework_mode() {
            "rework"
        } else if timer.is_running() {
            "running"
        } else {
            "paused"
        };
        let drawn = write!(
            self.out,
            "\r{} [{mode}] total {} | price {}   ",
            format_hms(timer.display_seconds()),
            format_hms(timer.total_seconds_for_labor()),
            format_money(&self.currency, breakdown.final_price)
        )
        .and_then(|()| self.out.flush());
        if let Err(err) = drawn {
            tracing::debug!(error = %err, "failed to redraw stopwatch");
        }
    }
}

pub fn run(config: &Config) -> Result<()> {
    let mut session = open_session(config, Utc::now())?;
    session.calculator.subscribe(Box::new(LiveLine::new(
        std::io::stdout(),
        config.currency.clone(),
    )));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize tokio runtime")?;
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{HELP}")?;
    let input = BufReader::new(tokio::io::stdin());
    let result = runtime.block_on(watch_loop(&mut session.calculator, input, &mut stdout));
    // The stdin reader blocks a worker thread; don't wait for it.
    runtime.shutdown_background();
    writeln!(stdout)?;
    result
}

fn new_ticker() -> Interval {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Drives the calculator until `q`, end of input or Ctrl-C.
///
/// `q` and Ctrl-C pause the timer. End of input leaves it in whatever phase
/// it is in, so a running timer keeps counting for the next command.
pub async fn watch_loop<R, W>(
    calc: &mut Calculator<'_>,
    input: R,
    writer: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut ticker = calc.state().timer.is_running().then(new_ticker);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut pause_on_exit = true;

    loop {
        tokio::select! {
            () = next_tick(&mut ticker) => {
                calc.catch_up(Utc::now());
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    pause_on_exit = false;
                    break;
                };
                let now = Utc::now();
                match line.trim() {
                    "s" | "start" => {
                        calc.start(now);
                    }
                    "p" | "pause" => {
                        calc.pause(now);
                    }
                    "r" | "rework" => {
                        calc.toggle_rework(now);
                    }
                    "save" => {
                        if let Some(folded) = settle(writer, calc.save_session(now))? {
                            success(writer, &format!("Saved session of {}.", format_hms(folded)));
                        }
                    }
                    "q" | "quit" => break,
                    "" => {}
                    other => note(writer, &format!("unknown command {other:?}; {HELP}")),
                }
            }
            _ = &mut ctrl_c => break,
        }

        // The ticker follows the phase, so a paused timer has nothing left to tick it.
        match (calc.state().timer.is_running(), ticker.is_some()) {
            (true, false) => ticker = Some(new_ticker()),
            (false, true) => ticker = None,
            _ => {}
        }
    }

    if pause_on_exit {
        calc.pause(Utc::now());
    } else {
        calc.catch_up(Utc::now());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn quitting_leaves_timer_paused() {
        let mut calc = Calculator::new(PricingState::with_base_rate(20.0));
        let mut output = Vec::new();
        watch_loop(&mut calc, &b"s\nbogus\nq\n"[..], &mut output)
            .await
            .unwrap();

        assert!(calc.state().timer.is_paused());
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("note: unknown command \"bogus\""));
    }

    #[tokio::test]
    async fn end_of_input_keeps_timer_running() {
        let mut calc = Calculator::new(PricingState::with_base_rate(20.0));
        let mut output = Vec::new();
        watch_loop(&mut calc, &b"s\nr\n"[..], &mut output)
            .await
            .unwrap();

        assert!(calc.state().timer.is_running());
        assert!(calc.state().timer.is_rework_mode());
    }

    #[tokio::test]
    async fn end_of_input_leaves_paused_timer_paused() {
        let mut calc = Calculator::new(PricingState::with_base_rate(20.0));
        let mut output = Vec::new();
        watch_loop(&mut calc, &b"s\np\n"[..], &mut output)
            .await
            .unwrap();

        assert!(calc.state().timer.is_paused());
    }

    #[tokio::test]
    async fn save_with_empty_session_is_a_note() {
        let mut calc = Calculator::new(PricingState::with_base_rate(20.0));
        let mut output = Vec::new();
        watch_loop(&mut calc, &b"save\n"[..], &mut output)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "note: there is no session time to save\n"
        );
    }

    #[test]
    fn live_line_shows_display_counter_and_price() {
        let mut state = PricingState::with_base_rate(20.0);
        state.timer.add_manual_time(1, 0).unwrap();
        state
            .timer
            .start(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        state.timer.tick();
        let breakdown = state.breakdown();

        let mut line = LiveLine::new(Vec::new(), "R$".to_string());
        line.apply(&state, &breakdown);
        let drawn = String::from_utf8(line.out).unwrap();
        assert!(drawn.starts_with("\r00:00:01 [running] total 01:00:01 | price R$ "));
    }
}
