//! Trigger probabilities and nickname activation

use super::{Abstract, Detail, DialoguePlugin};
use crate::channels::state::{expire_later, SessionState};
use crate::core::errors::DialogueError;
use crate::core::session::Session;
use crate::core::stamp::Stamp;
use crate::core::types::Dialogue;
use crate::core::weighting;
use crate::engine::Engine;
use crate::teach::{text, TeachArgv};
use async_trait::async_trait;

pub struct ProbabilityPlugin;

fn check_unit(option: &str, value: Option<f64>) -> Result<(), DialogueError> {
    match value {
        Some(p) if !(0.0..=1.0).contains(&p) => Err(DialogueError::invalid_option(
            option,
            "probability must be between 0 and 1",
        )),
        _ => Ok(()),
    }
}

#[async_trait]
impl DialoguePlugin for ProbabilityPlugin {
    fn name(&self) -> &'static str {
        "probability"
    }

    fn validate(&self, _engine: &Engine, argv: &mut TeachArgv) -> Result<(), DialogueError> {
        check_unit("-p", argv.options.prob_s)?;
        check_unit("-P", argv.options.prob_a)
    }

    fn modify(&self, _engine: &Engine, argv: &TeachArgv, dialogue: &mut Dialogue) {
        let options = &argv.options;
        if argv.create && argv.target.is_none() {
            let appellative = if argv.appellative { 1.0 } else { 0.0 };
            dialogue.prob_s = options.prob_s.unwrap_or(1.0 - appellative);
            dialogue.prob_a = options.prob_a.unwrap_or(appellative);
        } else {
            if let Some(prob_s) = options.prob_s {
                dialogue.prob_s = prob_s;
            }
            if let Some(prob_a) = options.prob_a {
                dialogue.prob_a = prob_a;
            }
        }
    }

    fn prepare(&self, _engine: &Engine, state: &mut SessionState) {
        let activated = state.is_activated();
        weighting::assign_weights(&mut state.dialogues, &state.test, activated);
    }

    async fn before_send(&self, engine: &Engine, state: &mut SessionState, _session: &mut Session) -> bool {
        if !state.test.activated {
            return false;
        }
        let stamp = Stamp::now();
        let user = state.user_id.clone();
        state.with_channel(|channel| channel.activated.insert(user.clone(), stamp));
        expire_later(
            &state.channel,
            engine.config.appellation_timeout(),
            stamp,
            user,
            |channel, user, stamp| {
                if channel.activated.get(user) == Some(&stamp) {
                    channel.activated.remove(user);
                }
            },
        );
        false
    }

    fn detail(&self, _engine: &Engine, dialogue: &Dialogue, detail: &mut Detail, _argv: &TeachArgv) {
        if dialogue.prob_s < 1.0 || dialogue.prob_a > 0.0 {
            detail.add(100, text::probability_detail(dialogue.prob_s, dialogue.prob_a));
        }
    }

    fn abstract_tags(&self, _engine: &Engine, dialogue: &Dialogue, output: &mut Abstract, _argv: &TeachArgv) {
        if dialogue.prob_s < 1.0 {
            output.push(format!("p={}", dialogue.prob_s));
        }
        if dialogue.prob_a > 0.0 {
            output.push(format!("P={}", dialogue.prob_a));
        }
    }

    fn usage(&self, _engine: &Engine, _authority: u32, output: &mut Vec<String>) {
        output.push("  -p <prob>       trigger probability without nickname".to_string());
        output.push("  -P <prob>       trigger probability with nickname".to_string());
    }
}
