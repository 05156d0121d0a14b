//! `##` searches and the `##ids` batch view

use super::{join_ids, text, TeachArgv};
use crate::channels::state::SessionState;
use crate::channels::total_weight;
use crate::core::traits::OutputSink;
use crate::core::types::{Dialogue, DialogueId, DialogueTest};
use crate::engine::Engine;
use anyhow::Result;
use std::collections::HashMap;

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// List the search results
pub async fn show(engine: &Engine, argv: &mut TeachArgv, sink: &dyn OutputSink) -> Result<String> {
    let question = argv.question().to_string();
    let answer = argv.answer().to_string();
    let original = argv.original.clone();
    let regexp = argv.options.regexp;
    let auto_merge = argv.options.auto_merge;

    let mut test = DialogueTest {
        question: non_empty(&question),
        original: non_empty(&original),
        answer: non_empty(&answer),
        regexp,
        ..Default::default()
    };
    if engine.plugins.before_search(engine, argv, &mut test) {
        return Ok(String::new());
    }
    let mut dialogues = engine.find(&test).await?;

    if let Some(pipe) = argv.options.pipe.clone() {
        if dialogues.is_empty() {
            return Ok(text::SEARCH_EMPTY.to_string());
        }
        let ids: Vec<String> = dialogues.iter().map(|d| d.id.to_string()).collect();
        let command = format!("{}{} {}", engine.config.general.prefix, ids.join(","), pipe);
        tracing::debug!("Piping search results into {}", command);
        let session = argv.session.with_content(command);
        return Ok(engine.teach(&session, sink).await.unwrap_or_default());
    }

    if argv.options.recursive != Some(false) && !auto_merge {
        engine
            .plugins
            .search(engine, argv, &test, &mut dialogues)
            .await?;
    }

    if original.is_empty() && answer.is_empty() {
        if dialogues.is_empty() {
            return Ok(text::search::empty("dialogues", ""));
        }
        let output = engine.list(argv, &dialogues);
        return Ok(paginate(engine, argv, "dialogues", output, None));
    }

    if regexp != Some(true) {
        let hint = if regexp.is_none() { text::REGEXP_HINT } else { "" };
        if original.is_empty() {
            let subject = format!("questions with answer \"{answer}\"");
            if dialogues.is_empty() {
                return Ok(text::search::empty(&subject, hint));
            }
            let output = dialogues
                .iter()
                .map(|d| format!("{}{}", engine.format_prefix(argv, d, false), d.original))
                .collect();
            return Ok(paginate(engine, argv, &subject, output, None));
        }
        if answer.is_empty() {
            let subject = format!("answers to question \"{original}\"");
            if dialogues.is_empty() {
                return Ok(text::search::empty(&subject, hint));
            }
            let output = engine.format_answers(argv, &dialogues, "");
            let epilog = if dialogues.len() > 1 {
                let total = search_weight(engine, argv, test, dialogues).await;
                Some(text::probability_epilog(total))
            } else {
                None
            };
            return Ok(paginate(engine, argv, &subject, output, epilog));
        }
        let subject = format!("dialogues with question \"{original}\" and answer \"{answer}\"");
        if dialogues.is_empty() {
            return Ok(text::search::empty(&subject, hint));
        }
        let ids: Vec<DialogueId> = dialogues.iter().map(|d| d.id).collect();
        return Ok(paginate(engine, argv, &subject, vec![join_ids(&ids)], None));
    }

    let subject = match (original.is_empty(), answer.is_empty()) {
        (true, _) => format!("dialogues with answers matching \"{answer}\""),
        (false, true) => format!("dialogues with questions matching \"{original}\""),
        (false, false) => format!(
            "dialogues with questions matching \"{original}\" and answers matching \"{answer}\""
        ),
    };
    if dialogues.is_empty() {
        return Ok(text::search::empty(&subject, ""));
    }
    let output = if !auto_merge || (!original.is_empty() && !answer.is_empty()) {
        engine.list(argv, &dialogues)
    } else {
        merge_by_key(&dialogues, !original.is_empty(), engine.config.display.merge_threshold)
    };
    Ok(paginate(engine, argv, &subject, output, None))
}

/// Total weight the candidates would have if the question were sent here
async fn search_weight(engine: &Engine, argv: &TeachArgv, test: DialogueTest, dialogues: Vec<Dialogue>) -> f64 {
    let session = &argv.session;
    let channel = engine.states.get_or_create(&session.channel_id, |state| {
        engine.plugins.init_state(engine, state)
    });
    let mut state = SessionState::new(channel, session.user_id.clone());
    state.is_search = true;
    state.test = test;
    state.dialogues = dialogues;
    total_weight(engine, &mut state, session).await
}

/// Group results by question (when searching questions) or by answer
fn merge_by_key(dialogues: &[Dialogue], by_question: bool, threshold: usize) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<DialogueId>> = HashMap::new();
    for dialogue in dialogues {
        let key = if by_question {
            dialogue.original.as_str()
        } else {
            dialogue.answer.as_str()
        };
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(dialogue.id);
    }
    let entity = if by_question { "answer" } else { "question" };
    order
        .into_iter()
        .map(|key| {
            let ids = &groups[key];
            if ids.len() <= threshold {
                let refs: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                format!("{key} (#{})", refs.join(", #"))
            } else {
                format!("{key} ({})", text::merged_count(ids.len(), entity))
            }
        })
        .collect()
}

fn paginate(
    engine: &Engine,
    argv: &TeachArgv,
    subject: &str,
    output: Vec<String>,
    epilog: Option<String>,
) -> String {
    let per_page = engine.config.display.items_per_page.max(1);
    let mut lines = Vec::new();
    if output.len() <= per_page {
        lines.push(text::search::result(subject, ""));
        lines.extend(output);
        lines.extend(epilog);
    } else {
        let count = output.len().div_ceil(per_page);
        let page = argv.options.page.unwrap_or(1).max(1);
        lines.push(text::search::result(subject, &text::page_hint(page, count)));
        lines.extend(output.into_iter().skip((page - 1) * per_page).take(per_page));
        lines.extend(epilog);
        lines.push(text::PAGE_FOOTER.to_string());
    }
    lines.join("\n")
}

/// `##ids`: one line per dialogue
pub async fn batch_view(engine: &Engine, argv: &mut TeachArgv, ids: &[DialogueId]) -> Result<String> {
    let dialogues = engine.get(ids).await?;
    let unknown: Vec<DialogueId> = ids
        .iter()
        .filter(|id| !dialogues.iter().any(|d| d.id == **id))
        .copied()
        .collect();
    let mut output = engine.list(argv, &dialogues);
    if !unknown.is_empty() {
        output.push(text::modify_unknown(&join_ids(&unknown)));
    }
    Ok(output.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialogue(id: DialogueId, question: &str, answer: &str) -> Dialogue {
        Dialogue {
            id,
            question: question.into(),
            original: question.into(),
            answer: answer.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_by_answer_keeps_first_seen_order() {
        let dialogues = vec![
            dialogue(1, "a", "x"),
            dialogue(2, "b", "y"),
            dialogue(3, "c", "x"),
        ];
        assert_eq!(
            merge_by_key(&dialogues, false, 5),
            vec!["x (#1, #3)".to_string(), "y (#2)".to_string()]
        );
    }

    #[test]
    fn test_merge_large_groups_show_count() {
        let dialogues: Vec<Dialogue> = (1..=3).map(|id| dialogue(id, "q", "a")).collect();
        assert_eq!(merge_by_key(&dialogues, true, 2), vec!["q (3 answers)".to_string()]);
    }
}
