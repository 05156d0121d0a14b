//! Time-of-day activation windows
//!
//! A window `[start, end)` in minutes of the day. When `start >= end` the
//! window wraps around midnight; `start == end` means always active.

use super::{Abstract, Detail, DialoguePlugin};
use crate::channels::state::SessionState;
use crate::core::errors::DialogueError;
use crate::core::session::Session;
use crate::core::types::{Dialogue, DialogueTest};
use crate::engine::Engine;
use crate::storage::{CmpOp, Expr, NumField};
use crate::teach::{text, TeachArgv};
use async_trait::async_trait;

pub struct TimePlugin;

/// Parse `H` or `H:MM` into minutes of the day
pub fn parse_time(option: &str, source: &str) -> Result<u32, DialogueError> {
    let invalid = || DialogueError::invalid_option(option, "expected a time such as 8 or 8:30");
    let (hours, minutes) = match source.split_once(':') {
        Some((hours, minutes)) if minutes.len() == 2 => (hours, minutes),
        Some(_) => return Err(invalid()),
        None => (source, "0"),
    };
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 24 || minutes >= 60 || hours * 60 + minutes > 24 * 60 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

pub fn format_time(minutes: u32) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

fn window(dialogue: &Dialogue) -> Option<String> {
    (dialogue.start_time != dialogue.end_time).then(|| {
        format!(
            "{}-{}",
            format_time(dialogue.start_time),
            format_time(dialogue.end_time)
        )
    })
}

fn match_time(time: u32) -> Expr {
    Expr::Or(vec![
        Expr::And(vec![
            Expr::CompareFields(NumField::StartTime, CmpOp::Lt, NumField::EndTime),
            Expr::Compare(NumField::StartTime, CmpOp::Le, time),
            Expr::Compare(NumField::EndTime, CmpOp::Gt, time),
        ]),
        Expr::And(vec![
            Expr::CompareFields(NumField::StartTime, CmpOp::Ge, NumField::EndTime),
            Expr::Or(vec![
                Expr::Compare(NumField::StartTime, CmpOp::Le, time),
                Expr::Compare(NumField::EndTime, CmpOp::Gt, time),
            ]),
        ]),
    ])
}

#[async_trait]
impl DialoguePlugin for TimePlugin {
    fn name(&self) -> &'static str {
        "time"
    }

    async fn receive(&self, engine: &Engine, state: &mut SessionState, _session: &Session) -> bool {
        state.test.match_time = Some(engine.clock.minutes_of_day());
        false
    }

    fn modify(&self, _engine: &Engine, argv: &TeachArgv, dialogue: &mut Dialogue) {
        if let Some(start) = argv.options.start_time {
            dialogue.start_time = start;
        }
        if let Some(end) = argv.options.end_time {
            dialogue.end_time = end;
        }
    }

    fn detail(&self, _engine: &Engine, dialogue: &Dialogue, detail: &mut Detail, _argv: &TeachArgv) {
        if let Some(window) = window(dialogue) {
            detail.add(50, text::active_hours(&window));
        }
    }

    fn abstract_tags(&self, _engine: &Engine, dialogue: &Dialogue, output: &mut Abstract, _argv: &TeachArgv) {
        if let Some(window) = window(dialogue) {
            output.push(window);
        }
    }

    fn usage(&self, _engine: &Engine, _authority: u32, output: &mut Vec<String>) {
        output.push("  -t / -T <time>  start / end of the active hours".to_string());
    }

    fn query(&self, _engine: &Engine, test: &DialogueTest, output: &mut Vec<Expr>) {
        if let Some(time) = test.match_time {
            output.push(match_time(time));
        }
        if let Some(time) = test.mismatch_time {
            output.push(Expr::not(match_time(time)));
        }
    }

    fn before_search(&self, _engine: &Engine, argv: &TeachArgv, test: &mut DialogueTest) -> bool {
        test.match_time = argv.options.start_time;
        test.mismatch_time = argv.options.end_time;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windowed(start: u32, end: u32) -> Dialogue {
        Dialogue {
            start_time: start,
            end_time: end,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("-t", "8").unwrap(), 480);
        assert_eq!(parse_time("-t", "8:30").unwrap(), 510);
        assert_eq!(parse_time("-T", "24").unwrap(), 1440);
        assert!(parse_time("-t", "baz").is_err());
        assert!(parse_time("-t", "8:5").is_err());
        assert!(parse_time("-t", "25").is_err());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(480), "8:00");
        assert_eq!(format_time(965), "16:05");
        assert_eq!(window(&windowed(480, 960)).as_deref(), Some("8:00-16:00"));
        assert!(window(&windowed(0, 0)).is_none());
    }

    #[test]
    fn test_daytime_window() {
        let d = windowed(480, 960);
        assert!(match_time(720).matches(&d));
        assert!(match_time(480).matches(&d));
        assert!(!match_time(960).matches(&d));
        assert!(!match_time(1200).matches(&d));
    }

    #[test]
    fn test_overnight_window() {
        let d = windowed(1320, 360);
        assert!(match_time(1380).matches(&d));
        assert!(match_time(60).matches(&d));
        assert!(!match_time(720).matches(&d));
        assert!(match_time(720).matches(&windowed(0, 0)));
    }
}
