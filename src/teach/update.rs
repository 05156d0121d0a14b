//! Create, modify, remove and preview

use super::parser::{Action, TeachCommand};
use super::{join_ids, review, search, text, Confirmation, TeachArgv};
use crate::core::errors::DialogueError;
use crate::core::session::Session;
use crate::core::traits::OutputSink;
use crate::core::types::{Dialogue, DialogueTest};
use crate::engine::Engine;
use anyhow::Result;
use std::collections::HashMap;

/// Run a parsed teach command and return the reply
pub async fn execute(
    engine: &Engine,
    command: TeachCommand,
    session: &Session,
    sink: &dyn OutputSink,
) -> Result<String> {
    let TeachCommand {
        action,
        options,
        args,
    } = command;
    match action {
        Action::Help => return Ok(usage(engine, session.user.authority)),
        Action::Stats => {
            let stats = engine.stats().await?;
            return Ok(text::stats(stats.questions, stats.dialogues));
        }
        _ => {}
    }

    let mut argv = TeachArgv::new(session.clone(), options, args);
    if let Action::Target(ids) = &action {
        argv.target = Some(ids.clone());
    }
    engine.plugins.validate(engine, &mut argv)?;

    match action {
        Action::BatchView(ids) => search::batch_view(engine, &mut argv, &ids).await,
        Action::Search => search::show(engine, &mut argv, sink).await,
        _ if (argv.options.review || argv.options.revert) && argv.target.is_none() => {
            review::run(engine, &mut argv).await
        }
        Action::Target(_) => update(engine, &mut argv, sink).await,
        _ => create(engine, &mut argv, sink).await,
    }
}

/// Re-run a command suspended by a hint, with the suggestion applied
pub async fn resume(
    engine: &Engine,
    mut argv: TeachArgv,
    confirmation: Confirmation,
    sink: &dyn OutputSink,
) -> Result<String> {
    tracing::debug!("Applying {:?} to a suspended command", confirmation);
    confirmation.apply(&mut argv);
    argv.options.ignore_hint = true;
    argv.dialogues.clear();
    argv.dialogue_map.clear();
    argv.updated.clear();
    argv.skipped.clear();
    argv.unknown.clear();
    argv.forbidden.clear();
    if argv.target.is_some() && !argv.create {
        update(engine, &mut argv, sink).await
    } else {
        argv.target = None;
        create(engine, &mut argv, sink).await
    }
}

fn usage(engine: &Engine, authority: u32) -> String {
    let prefix = &engine.config.general.prefix;
    let mut lines = vec![
        format!("{prefix} <question> <answer>    teach a dialogue"),
        format!("{prefix}<ids> [options]        view or modify dialogues"),
        format!("{prefix}{prefix} <question> [answer]   search dialogues"),
        format!("{prefix}{prefix}                     show statistics"),
        "Options:".to_string(),
    ];
    lines.extend(engine.plugins.usage(engine, authority));
    lines.join("\n")
}

/// `#ids ...`: preview, or modify, remove or revert the targets
pub async fn update(engine: &Engine, argv: &mut TeachArgv, sink: &dyn OutputSink) -> Result<String> {
    let ids = argv.target.clone().unwrap_or_default();
    let options = &argv.options;
    let history = options.review || options.revert;
    argv.modify = !options.review && !options.search && (!options.is_empty() || !argv.args.is_empty());

    let max_previews = engine.config.display.max_previews;
    if !argv.modify && ids.len() > max_previews {
        return Ok(text::max_previews(max_previews));
    }

    let dialogues = if history {
        engine.history.get(&ids)
    } else {
        engine.get(&ids).await?
    };
    argv.dialogue_map = dialogues.iter().map(|d| (d.id, d.clone())).collect();
    argv.unknown = ids
        .iter()
        .filter(|id| !argv.dialogue_map.contains_key(id))
        .copied()
        .collect();
    argv.dialogues = dialogues;
    engine.plugins.before_detail(engine, argv).await?;

    if !argv.modify {
        return preview(engine, argv, sink).await;
    }

    let dialogues = std::mem::take(&mut argv.dialogues);
    let targets = engine.prepare_targets(argv, dialogues);

    if argv.options.revert {
        argv.dialogues = targets.clone();
        let message = if targets.is_empty() {
            String::new()
        } else {
            engine.revert(argv, targets).await?
        };
        return Ok(send_result(engine, argv, message));
    }

    if argv.options.remove {
        return remove(engine, argv, targets, sink).await;
    }

    if !targets.is_empty() {
        argv.dialogues = targets;
        if let Some(message) = engine.plugins.before_modify(engine, argv).await {
            return Ok(message);
        }
        modify(engine, argv, sink).await?;
    }
    Ok(send_result(engine, argv, String::new()))
}

/// Send the details of every target, one message each
async fn preview(engine: &Engine, argv: &mut TeachArgv, sink: &dyn OutputSink) -> Result<String> {
    let mut dialogues = argv.dialogues.clone();
    engine
        .plugins
        .search(engine, argv, &DialogueTest::default(), &mut dialogues)
        .await?;

    if !argv.unknown.is_empty() {
        let ids = join_ids(&argv.unknown);
        let message = if argv.options.review {
            text::revert_unknown(&ids)
        } else {
            text::modify_unknown(&ids)
        };
        sink.send(message).await?;
    }
    for (index, dialogue) in dialogues.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(engine.config.preview_delay()).await;
        }
        let mut output = vec![text::detail_header(dialogue.id, argv.options.review)];
        output.extend(engine.format_detail(argv, dialogue));
        sink.send(output.join("\n")).await?;
    }
    argv.dialogues = dialogues;
    Ok(String::new())
}

/// `#q a`: modify an identical dialogue or create a new one
pub async fn create(engine: &Engine, argv: &mut TeachArgv, sink: &dyn OutputSink) -> Result<String> {
    argv.create = true;
    argv.modify = true;

    let question = argv.question().to_string();
    let answer = argv.answer().to_string();
    argv.dialogues = if question.is_empty() && answer.is_empty() {
        Vec::new()
    } else {
        let test = DialogueTest {
            question: (!question.is_empty()).then_some(question),
            answer: (!answer.is_empty()).then_some(answer),
            regexp: Some(false),
            ..Default::default()
        };
        engine.find(&test).await?
    };
    engine.plugins.before_detail(engine, argv).await?;
    if let Some(message) = engine.plugins.before_modify(engine, argv).await {
        return Ok(message);
    }

    if !argv.dialogues.is_empty() {
        argv.target = Some(argv.dialogues.iter().map(|d| d.id).collect());
        argv.dialogue_map = argv
            .dialogues
            .iter()
            .map(|d| (d.id, d.clone()))
            .collect::<HashMap<_, _>>();
        let dialogues = std::mem::take(&mut argv.dialogues);
        let targets = engine.prepare_targets(argv, dialogues);
        if argv.options.remove {
            return remove(engine, argv, targets, sink).await;
        }
        argv.dialogues = targets;
        modify(engine, argv, sink).await?;
        return Ok(send_result(engine, argv, String::new()));
    }

    let mut dialogue = Dialogue::default();
    if engine.plugins.permit(engine, argv, &dialogue) {
        return Ok(text::LOW_PERMISSION.to_string());
    }
    engine.plugins.modify(engine, argv, &mut dialogue);
    let created = engine.create(argv, dialogue).await?;
    let message = text::create_success(created.id);
    argv.dialogues = vec![created];
    engine.plugins.after_modify(engine, argv, sink).await?;
    Ok(send_result(engine, argv, message))
}

/// Apply the options to `argv.dialogues` and persist them
async fn modify(engine: &Engine, argv: &mut TeachArgv, sink: &dyn OutputSink) -> Result<()> {
    let mut targets = std::mem::take(&mut argv.dialogues);
    for dialogue in targets.iter_mut() {
        engine.plugins.modify(engine, argv, dialogue);
    }
    engine.update(argv, targets.clone()).await?;
    argv.dialogues = targets;
    engine.plugins.after_modify(engine, argv, sink).await
}

async fn remove(
    engine: &Engine,
    argv: &mut TeachArgv,
    targets: Vec<Dialogue>,
    sink: &dyn OutputSink,
) -> Result<String> {
    let mut message = String::new();
    if !targets.is_empty() {
        let removed = engine.remove(argv, &targets).await?;
        message = text::remove_success(&join_ids(&removed));
    }
    argv.dialogues = targets;
    engine.plugins.after_modify(engine, argv, sink).await?;
    Ok(send_result(engine, argv, message))
}

/// Summarize what happened to every target
fn send_result(engine: &Engine, argv: &TeachArgv, prefix: String) -> String {
    let mut output = Vec::new();
    if !prefix.is_empty() {
        output.push(prefix);
    }
    if !argv.updated.is_empty() {
        let ids = join_ids(&argv.updated);
        output.push(if argv.create {
            text::create_modified(&ids)
        } else {
            text::modify_success(&ids)
        });
    }
    if !argv.skipped.is_empty() {
        output.push(if argv.create {
            let target = join_ids(argv.target.as_deref().unwrap_or_default());
            let skipped: Vec<String> = argv.skipped.iter().map(|id| id.to_string()).collect();
            let command = format!("{}{}", engine.config.general.prefix, skipped.join(","));
            text::create_unchanged(&target, &command)
        } else {
            text::unchanged(&join_ids(&argv.skipped))
        });
    }
    if !argv.forbidden.is_empty() {
        output.push(
            DialogueError::PermissionDenied {
                operation: argv.operation().to_string(),
                ids: join_ids(&argv.forbidden),
            }
            .to_string(),
        );
    }
    if !argv.unknown.is_empty() {
        let ids = join_ids(&argv.unknown);
        output.push(if argv.options.revert {
            text::revert_unknown(&ids)
        } else {
            text::modify_unknown(&ids)
        });
    }
    output.join("\n")
}
