//! Argument parsing, hints and the text part of queries

use super::{Detail, DialoguePlugin};
use crate::core::errors::DialogueError;
use crate::core::normalizer::ALLOWED_ELEMENTS;
use crate::core::segment;
use crate::core::types::{Dialogue, DialogueTest, Flag};
use crate::engine::Engine;
use crate::storage::{Expr, TextField};
use crate::teach::{text, Confirmation, TeachArgv};
use async_trait::async_trait;
use regex::Regex;

/// Marker of an answer that only redirects to another question
pub const REDIRECT_PREFIX: &str = "$(dialogue ";

pub struct InternalPlugin;

/// `~`, `～` and empty arguments unset the field
fn parse_argument(arg: Option<String>) -> String {
    match arg {
        Some(arg) if arg != "~" && arg != "～" => arg.trim().to_string(),
        _ => String::new(),
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == *cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

/// The operator probably meant to change the answer of every target
fn maybe_answer(question: &str, dialogues: &[Dialogue]) -> bool {
    dialogues.iter().all(|dialogue| {
        let distance = levenshtein(question, &dialogue.answer);
        (distance as f64) < dialogue.answer.chars().count() as f64 / 2.0
            && distance < levenshtein(question, &dialogue.question)
    })
}

fn maybe_regexp(question: &str) -> bool {
    question.starts_with('^') || question.ends_with('$')
}

#[async_trait]
impl DialoguePlugin for InternalPlugin {
    fn name(&self) -> &'static str {
        "internal"
    }

    fn validate(&self, engine: &Engine, argv: &mut TeachArgv) -> Result<(), DialogueError> {
        let mut args = std::mem::take(&mut argv.args).into_iter();
        let question = parse_argument(args.next());
        let answer = match &argv.options.redirect {
            Some(redirect) => format!("{REDIRECT_PREFIX}{redirect})"),
            None => parse_argument(args.next()),
        };
        if args.next().is_some() {
            return Err(DialogueError::TooManyArguments);
        }
        if segment::has_element_except(&question, ALLOWED_ELEMENTS) {
            return Err(DialogueError::InvalidQuestionKind);
        }

        let (original, parsed, appellative) = if argv.options.regexp == Some(true) {
            (segment::unescape(&question), question, false)
        } else {
            let stripped = engine.normalizer.strip_question(&question)?;
            (stripped.original, stripped.parsed, stripped.appellative)
        };
        argv.original = original;
        argv.appellative = appellative;
        argv.args = if parsed.is_empty() && answer.is_empty() {
            Vec::new()
        } else {
            vec![parsed, answer]
        };
        Ok(())
    }

    async fn before_modify(&self, engine: &Engine, argv: &mut TeachArgv) -> Option<String> {
        let question = argv.question().to_string();
        let has_answer = !argv.answer().is_empty();
        let ignore_hint = argv.options.ignore_hint;
        let regexp = argv.options.regexp;

        if argv.target.is_some()
            && !ignore_hint
            && !question.is_empty()
            && !has_answer
            && maybe_answer(&question, &argv.dialogues)
        {
            engine.pending.insert(argv, Confirmation::Answer);
            return Some(text::PROBABLY_MODIFY_ANSWER.to_string());
        }

        if !question.is_empty()
            && regexp.is_none()
            && !ignore_hint
            && maybe_regexp(&question)
            && (argv.target.is_none() || !argv.dialogues.iter().all(Dialogue::is_regexp))
        {
            engine.pending.insert(argv, Confirmation::Regexp);
            let operation = if argv.target.is_some() { "modify" } else { "create" };
            return Some(text::probably_regexp(operation));
        }

        let checks_regexp = regexp == Some(true)
            || (regexp.is_none()
                && !question.is_empty()
                && argv.dialogues.iter().any(Dialogue::is_regexp));
        if checks_regexp {
            let questions: Vec<&str> = if question.is_empty() {
                argv.dialogues.iter().map(|d| d.question.as_str()).collect()
            } else {
                vec![question.as_str()]
            };
            if questions.iter().any(|q| Regex::new(q).is_err()) {
                return Some(DialogueError::IllegalRegexp.to_string());
            }
        }

        if argv.create && argv.target.is_none() && (question.is_empty() || !has_answer) {
            return Some(DialogueError::MissingQuestionOrAnswer.to_string());
        }

        if let (true, Some(assets)) = (has_answer, &engine.assets) {
            match assets.transform(argv.answer()).await {
                Ok(answer) => argv.set_answer(answer),
                Err(e) => {
                    tracing::warn!("Asset upload failed: {}", e);
                    return Some(text::UPLOAD_FAILED.to_string());
                }
            }
        }
        None
    }

    fn modify(&self, _engine: &Engine, argv: &TeachArgv, dialogue: &mut Dialogue) {
        if !argv.answer().is_empty() {
            dialogue.answer = argv.answer().to_string();
        }
        if let Some(regexp) = argv.options.regexp {
            dialogue.flag.set(Flag::Regexp, regexp);
        }
        if !argv.question().is_empty() {
            dialogue.question = argv.question().to_string();
            dialogue.original = argv.original.clone();
        }
    }

    fn detail(&self, engine: &Engine, dialogue: &Dialogue, detail: &mut Detail, argv: &TeachArgv) {
        if let Some(redirections) = dialogue.meta.redirections.as_ref().filter(|r| !r.is_empty()) {
            let mut lines = vec![text::REDIRECTIONS.to_string()];
            lines.extend(engine.list(argv, redirections));
            detail.add(-1000, lines.join("\n"));
        }
    }

    fn usage(&self, engine: &Engine, authority: u32, output: &mut Vec<String>) {
        output.push("  -I              ignore hints".to_string());
        if authority >= engine.config.authority.regexp {
            output.push("  -x / -X         question is / is not a regular expression".to_string());
        }
        output.push("  => <question>   answer by redirecting to another question".to_string());
    }

    fn query(&self, _engine: &Engine, test: &DialogueTest, output: &mut Vec<Expr>) {
        if test.regexp == Some(true) {
            if let Some(answer) = &test.answer {
                output.push(Expr::Regex(TextField::Answer, answer.clone()));
            }
            if let Some(original) = &test.original {
                output.push(Expr::Regex(TextField::Original, original.clone()));
            }
            return;
        }
        if let Some(answer) = &test.answer {
            output.push(Expr::Eq(TextField::Answer, answer.clone()));
        }
        if test.regexp == Some(false) {
            if let Some(question) = &test.question {
                output.push(Expr::Eq(TextField::Question, question.clone()));
            }
        } else if let Some(original) = &test.original {
            let mut branches = vec![Expr::all(vec![
                Expr::BitsAllSet(Flag::Regexp.bit()),
                Expr::RegexFor(TextField::Original, original.clone()),
            ])];
            if let Some(question) = &test.question {
                branches.push(Expr::all(vec![
                    Expr::BitsAllClear(Flag::Regexp.bit()),
                    Expr::Eq(TextField::Question, question.clone()),
                ]));
            }
            output.push(Expr::Or(branches));
        }
    }
}
