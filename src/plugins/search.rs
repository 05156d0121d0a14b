//! Redirection expansion in search results

use super::internal::REDIRECT_PREFIX;
use super::{Abstract, DialoguePlugin};
use crate::core::types::{Dialogue, DialogueTest};
use crate::engine::Engine;
use crate::teach::text::entity;
use crate::teach::TeachArgv;
use anyhow::Result;
use async_trait::async_trait;

pub struct SearchPlugin;

/// Question a redirecting answer points to
fn redirect_target(answer: &str) -> Option<&str> {
    answer
        .strip_prefix(REDIRECT_PREFIX)?
        .strip_suffix(')')
        .map(str::trim_start)
}

#[async_trait]
impl DialoguePlugin for SearchPlugin {
    fn name(&self) -> &'static str {
        "search"
    }

    fn abstract_tags(&self, _engine: &Engine, dialogue: &Dialogue, output: &mut Abstract, _argv: &TeachArgv) {
        if dialogue.is_regexp() {
            output.question_type = Some(entity::REGEXP);
        }
    }

    fn appendix(
        &self,
        engine: &Engine,
        dialogue: &Dialogue,
        output: &mut Vec<String>,
        prefix: &str,
        argv: &TeachArgv,
    ) {
        if let Some(redirections) = &dialogue.meta.redirections {
            output.extend(engine.format_answers(argv, redirections, &format!("{prefix}= ")));
        }
    }

    fn usage(&self, _engine: &Engine, _authority: u32, output: &mut Vec<String>) {
        output.push("  -R              do not expand redirections in searches".to_string());
        output.push("  / <page>        page of search results".to_string());
        output.push("  | <command>     apply options to every search result".to_string());
    }

    fn before_search(&self, _engine: &Engine, argv: &TeachArgv, test: &mut DialogueTest) -> bool {
        test.no_recursive = argv.options.recursive == Some(false);
        test.appellative = argv.appellative;
        false
    }

    async fn search(
        &self,
        engine: &Engine,
        argv: &mut TeachArgv,
        test: &DialogueTest,
        dialogues: &mut Vec<Dialogue>,
    ) -> Result<()> {
        if argv.visited_questions.is_empty() {
            argv.visited_questions
                .insert(test.question.clone().unwrap_or_default());
        }
        for dialogue in dialogues.iter_mut() {
            let Some(target) = redirect_target(&dialogue.answer) else {
                continue;
            };
            let Ok(question) = engine.normalizer.strip_question(target) else {
                continue;
            };
            if !argv.visited_questions.insert(question.parsed.clone()) {
                continue;
            }
            let nested_test = DialogueTest {
                regexp: None,
                question: Some(question.parsed),
                original: Some(question.original),
                ..test.clone()
            };
            let mut redirections = engine.find(&nested_test).await?;
            engine
                .plugins
                .search(engine, argv, test, &mut redirections)
                .await?;
            dialogue.meta.redirections = Some(redirections);
        }
        Ok(())
    }
}
