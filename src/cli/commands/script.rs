//! `script` command
//!
//! Prints the step table resolved against a timing configuration: the
//! action of each step, the lock it holds and when autoplay fires it.

use std::time::Duration;

use serde::Serialize;

use crate::cli::args::{OutputFormat, ScriptArgs};
use crate::config::schema::IntroConfig;
use crate::error::IntroError;
use crate::sequencer::script::{Action, STEP_COUNT, StepScript};

use super::load_config;

#[derive(Debug, Serialize)]
struct ScriptRow {
    step: usize,
    #[serde(flatten)]
    action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    next: usize,
    lock_ms: u64,
    delay_ms: Option<u64>,
    at_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ScriptTable {
    steps: Vec<ScriptRow>,
    settle_ms: Option<u64>,
    run_time_ms: u64,
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn table(config: &IntroConfig) -> ScriptTable {
    let timing = &config.timing;
    let mut at = Duration::ZERO;
    let steps = StepScript::standard()
        .iter()
        .map(|row| {
            let delay = timing.autoplay_delays.get(row.step).copied();
            if let Some(delay) = delay {
                at += delay;
            }
            ScriptRow {
                step: row.step,
                action: row.action,
                label: row.action.word().and_then(|i| config.words.get(i).cloned()),
                next: row.next,
                lock_ms: millis(row.action.lock_kind().duration(timing)),
                delay_ms: delay.map(millis),
                at_ms: delay.map(|_| millis(at)),
            }
        })
        .collect();

    ScriptTable {
        steps,
        settle_ms: timing.autoplay_delays.get(STEP_COUNT).copied().map(millis),
        run_time_ms: millis(timing.autoplay_run_time()),
    }
}

fn render_human(table: &ScriptTable) -> String {
    let ms = |v: Option<u64>| {
        v.map_or_else(
            || "-".to_string(),
            |ms| humantime::format_duration(Duration::from_millis(ms)).to_string(),
        )
    };

    let mut out = format!(
        "{:<5} {:<32} {:<8} {:<8} {}\n",
        "STEP", "ACTION", "LOCK", "DELAY", "AT"
    );
    for row in &table.steps {
        let action = row
            .label
            .as_ref()
            .map_or_else(|| row.action.to_string(), |l| format!("{} ({l})", row.action));
        out.push_str(&format!(
            "{:<5} {:<32} {:<8} {:<8} {}\n",
            row.step,
            action,
            ms(Some(row.lock_ms)),
            ms(row.delay_ms),
            ms(row.at_ms),
        ));
    }
    out.push_str(&format!(
        "settle {}, terminal step at {}\n",
        ms(table.settle_ms),
        ms(Some(table.run_time_ms))
    ));
    out
}

/// Print the step script.
///
/// # Errors
///
/// Returns a config error if the configuration cannot be loaded, or a
/// JSON error if serialization fails.
pub fn run(args: &ScriptArgs) -> Result<(), IntroError> {
    let config = load_config(args.config.as_deref())?;
    let table = table(&config);

    match args.format {
        OutputFormat::Human => print!("{}", render_human(&table)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&table)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_fire_times() {
        let table = table(&IntroConfig::default());
        let at: Vec<u64> = table.steps.iter().filter_map(|r| r.at_ms).collect();
        assert_eq!(
            at,
            vec![
                1000, 3000, 4500, 6500, 8000, 10000, 11500, 13500, 15000, 18000, 20500, 22500
            ]
        );
        assert_eq!(table.run_time_ms, 22_500);
        assert_eq!(table.settle_ms, Some(2000));
    }

    #[test]
    fn test_rows_carry_word_labels_and_locks() {
        let table = table(&IntroConfig::default());
        assert_eq!(table.steps[0].label.as_deref(), Some("Noise"));
        assert_eq!(table.steps[7].label.as_deref(), Some("Shortcuts"));
        assert_eq!(table.steps[8].label, None);
        assert_eq!(table.steps[1].lock_ms, 1000);
        assert_eq!(table.steps[2].lock_ms, 800);
        assert_eq!(table.steps[11].lock_ms, 500);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(table(&IntroConfig::default())).unwrap();
        let first = &json["steps"][0];
        assert_eq!(first["action"], "reveal_word");
        assert_eq!(first["word"], 0);
        assert_eq!(first["next"], 1);
        assert_eq!(json["steps"][11]["action"], "complete");
    }

    #[test]
    fn test_human_render_lists_every_step() {
        let out = render_human(&table(&IntroConfig::default()));
        assert_eq!(out.lines().count(), STEP_COUNT + 2);
        assert!(out.contains("strike word 2 (Hype)"));
        assert!(out.contains("terminal step at 22s 500ms"));
    }
}
