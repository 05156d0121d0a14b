//! Question/answer details and history annotations

use super::{Abstract, Detail, DialoguePlugin};
use crate::core::types::Dialogue;
use crate::engine::Engine;
use crate::teach::text::{self, entity};
use crate::teach::{format_age, TeachArgv};
use async_trait::async_trait;

pub struct ReviewPlugin;

#[async_trait]
impl DialoguePlugin for ReviewPlugin {
    fn name(&self) -> &'static str {
        "review"
    }

    fn detail(&self, _engine: &Engine, dialogue: &Dialogue, detail: &mut Detail, _argv: &TeachArgv) {
        let question_type = if dialogue.is_regexp() {
            entity::REGEXP
        } else {
            entity::QUESTION
        };
        detail.add(1000, text::detail(question_type, &dialogue.original));
        detail.add(1000, text::detail(entity::ANSWER, &dialogue.answer));
        if let Some(mark) = &dialogue.meta.history {
            detail.add(-100, text::review(mark.kind, &format_age(mark.stamp.elapsed())));
        }
    }

    fn abstract_tags(&self, _engine: &Engine, dialogue: &Dialogue, output: &mut Abstract, _argv: &TeachArgv) {
        if let Some(mark) = &dialogue.meta.history {
            output.unshift(format!(
                "{}-{}",
                text::operation(mark.kind),
                format_age(mark.stamp.elapsed())
            ));
        }
    }

    fn usage(&self, _engine: &Engine, _authority: u32, output: &mut Vec<String>) {
        output.push("  -v / -V         review / revert recent changes".to_string());
        output.push("  -l / -L [n]     include / exclude the last n changes or a duration".to_string());
        output.push("  -r              remove".to_string());
    }
}
