//! Dialogue service
//!
//! Store access with snapshot bookkeeping, history recording, and the
//! listing formats shared by the teach pipeline and the plugins.

use crate::core::segment;
use crate::core::types::{Dialogue, DialogueId, DialoguePatch, DialogueTest, ModifyType};
use crate::engine::Engine;
use crate::plugins::{Abstract, Detail};
use crate::storage::DialogueStats;
use crate::teach::text::{self, entity};
use crate::teach::{join_ids, TeachArgv};
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

static LINE_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n|\$n").unwrap());

/// Shorten an answer for listings: first line only, images summarized,
/// at most `max_length` characters
pub fn format_answer(source: &str, max_length: usize) -> String {
    let mut trimmed = false;
    let mut answer = match LINE_BREAK_RE.split(source).next() {
        Some(first) if first.len() < source.len() => {
            trimmed = true;
            first.trim().to_string()
        }
        _ => source.to_string(),
    };
    answer = segment::summarize_images(&answer);
    if answer.chars().count() > max_length {
        trimmed = true;
        answer = answer.chars().take(max_length).collect();
    }
    if trimmed && !answer.ends_with('…') {
        answer.push('…');
    }
    answer
}

/// `12. [tag, tag] `
fn format_abstract(dialogue: &Dialogue, output: &Abstract) -> String {
    if output.tags.is_empty() {
        format!("{}. ", dialogue.id)
    } else {
        format!("{}. [{}] ", dialogue.id, output.tags.join(", "))
    }
}

fn with_backup(mut dialogues: Vec<Dialogue>) -> Vec<Dialogue> {
    for dialogue in dialogues.iter_mut() {
        dialogue.meta.backup = Some(Box::new(dialogue.snapshot()));
    }
    dialogues
}

impl Engine {
    /// Dialogues matching `test`, each carrying a snapshot for diffing
    pub async fn find(&self, test: &DialogueTest) -> Result<Vec<Dialogue>> {
        let expr = self.plugins.query(self, test);
        Ok(with_backup(self.store.query(&expr).await?))
    }

    /// Dialogues by id, each carrying a snapshot for diffing
    pub async fn get(&self, ids: &[DialogueId]) -> Result<Vec<Dialogue>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(with_backup(self.store.get(ids).await?))
    }

    pub async fn stats(&self) -> Result<DialogueStats> {
        self.store.stats().await
    }

    /// Drop the dialogues the operator may not touch, noting them as forbidden
    pub fn prepare_targets(&self, argv: &mut TeachArgv, dialogues: Vec<Dialogue>) -> Vec<Dialogue> {
        let (forbidden, allowed): (Vec<Dialogue>, Vec<Dialogue>) = dialogues
            .into_iter()
            .partition(|dialogue| self.plugins.permit(self, argv, dialogue));
        for dialogue in forbidden {
            if !argv.forbidden.contains(&dialogue.id) {
                argv.forbidden.push(dialogue.id);
            }
        }
        allowed
    }

    pub async fn create(&self, argv: &TeachArgv, dialogue: Dialogue) -> Result<Dialogue> {
        let created = self.store.create(dialogue).await?;
        self.history
            .record(&created, ModifyType::Create, argv.operator());
        tracing::info!("Dialogue {} created by {}", created.id, argv.operator());
        Ok(created)
    }

    /// Persist modified targets, sorting them into updated and skipped
    pub async fn update(&self, argv: &mut TeachArgv, dialogues: Vec<Dialogue>) -> Result<()> {
        let mut patches = Vec::new();
        let mut backups = Vec::new();
        for mut dialogue in dialogues {
            let patch = match dialogue.meta.backup.as_deref() {
                Some(backup) => dialogue.diff(backup),
                None => DialoguePatch::full(&dialogue),
            };
            if patch.is_empty() {
                argv.skipped.push(dialogue.id);
                continue;
            }
            argv.updated.push(dialogue.id);
            patches.push(patch);
            backups.push(
                dialogue
                    .meta
                    .backup
                    .take()
                    .map(|backup| *backup)
                    .unwrap_or_else(|| dialogue.snapshot()),
            );
        }
        if patches.is_empty() {
            return Ok(());
        }
        self.store.upsert(patches).await?;
        for backup in &backups {
            self.history
                .record(backup, ModifyType::Modify, argv.operator());
        }
        tracing::info!(
            "Dialogues {} modified by {}",
            join_ids(&backups.iter().map(|d| d.id).collect::<Vec<_>>()),
            argv.operator()
        );
        Ok(())
    }

    /// Remove `dialogues`, keeping their last state in the history
    pub async fn remove(&self, argv: &TeachArgv, dialogues: &[Dialogue]) -> Result<Vec<DialogueId>> {
        let ids: Vec<DialogueId> = dialogues.iter().map(|d| d.id).collect();
        self.store.remove(&ids).await?;
        for dialogue in dialogues {
            let last = argv.dialogue_map.get(&dialogue.id).unwrap_or(dialogue);
            self.history
                .record(last, ModifyType::Remove, argv.operator());
        }
        tracing::info!("Dialogues {} removed by {}", join_ids(&ids), argv.operator());
        Ok(ids)
    }

    /// Undo history entries: created dialogues are deleted, the others restored
    pub async fn revert(&self, argv: &TeachArgv, dialogues: Vec<Dialogue>) -> Result<String> {
        let (created, edited): (Vec<Dialogue>, Vec<Dialogue>) = dialogues.into_iter().partition(|d| {
            d.meta
                .history
                .as_ref()
                .is_some_and(|mark| mark.kind == ModifyType::Create)
        });

        let created_ids: Vec<DialogueId> = created.iter().map(|d| d.id).collect();
        if !created_ids.is_empty() {
            self.store.remove(&created_ids).await?;
        }
        if !edited.is_empty() {
            self.store
                .upsert(edited.iter().map(DialoguePatch::full).collect())
                .await?;
        }

        let mut ids: Vec<DialogueId> = created_ids;
        ids.extend(edited.iter().map(|d| d.id));
        for id in &ids {
            self.history.forget(*id);
        }
        ids.sort_unstable();
        tracing::info!("Dialogues {} reverted by {}", join_ids(&ids), argv.operator());
        Ok(text::revert_success(&join_ids(&ids)))
    }

    pub fn abstract_of(&self, argv: &TeachArgv, dialogue: &Dialogue) -> Abstract {
        self.plugins.abstract_tags(self, dialogue, argv)
    }

    /// `id. [tags] Question: q, Answer: a`
    pub fn format_dialogue(&self, argv: &TeachArgv, dialogue: &Dialogue) -> String {
        let output = self.abstract_of(argv, dialogue);
        let question_type = output.question_type.unwrap_or(entity::QUESTION);
        let answer_type = output.answer_type.unwrap_or(entity::ANSWER);
        format!(
            "{}{}, {}",
            format_abstract(dialogue, &output),
            text::detail(question_type, &dialogue.original),
            text::detail(
                answer_type,
                &format_answer(&dialogue.answer, self.config.display.max_answer_length)
            ),
        )
    }

    /// `id. [tags] [Regexp] `
    pub fn format_prefix(&self, argv: &TeachArgv, dialogue: &Dialogue, show_answer_type: bool) -> String {
        let output = self.abstract_of(argv, dialogue);
        let mut result = format_abstract(dialogue, &output);
        if let Some(question_type) = output.question_type {
            result.push_str(&format!("[{question_type}] "));
        }
        if let (true, Some(answer_type)) = (show_answer_type, output.answer_type) {
            result.push_str(&format!("[{answer_type}] "));
        }
        result
    }

    pub fn list(&self, argv: &TeachArgv, dialogues: &[Dialogue]) -> Vec<String> {
        self.list_with_prefix(argv, dialogues, "")
    }

    /// One entry per dialogue followed by its appendix lines
    pub fn list_with_prefix(&self, argv: &TeachArgv, dialogues: &[Dialogue], prefix: &str) -> Vec<String> {
        dialogues
            .iter()
            .map(|dialogue| {
                let mut output = vec![format!("{prefix}{}", self.format_dialogue(argv, dialogue))];
                self.plugins
                    .appendix(self, dialogue, &mut output, prefix, argv);
                output.join("\n")
            })
            .collect()
    }

    /// Answers with their tags, as listed by a question search
    pub fn format_answers(&self, argv: &TeachArgv, dialogues: &[Dialogue], prefix: &str) -> Vec<String> {
        dialogues
            .iter()
            .map(|dialogue| {
                let mut output = vec![format!(
                    "{prefix}{}{}",
                    self.format_prefix(argv, dialogue, true),
                    format_answer(&dialogue.answer, self.config.display.max_answer_length)
                )];
                self.plugins
                    .appendix(self, dialogue, &mut output, prefix, argv);
                output.join("\n")
            })
            .collect()
    }

    /// Detail lines of one dialogue in display order
    pub fn format_detail(&self, argv: &TeachArgv, dialogue: &Dialogue) -> Vec<String> {
        let mut detail = Detail::new();
        self.plugins.detail(self, dialogue, &mut detail, argv);
        detail.into_lines()
    }
}
