//! Predecessor chains
//!
//! A dialogue with predecessors only fires within a window after one of its
//! predecessors fired, and while it is eligible it outranks dialogues
//! without predecessors. The window is tracked per user, or channel-wide for
//! dialogues with the context flag.

use super::{Abstract, Detail, DialoguePlugin, FlagBinding};
use crate::channels::state::{expire_later, Scope, SessionState};
use crate::core::errors::DialogueError;
use crate::core::session::Session;
use crate::core::stamp::Stamp;
use crate::core::traits::OutputSink;
use crate::core::types::{Dialogue, DialogueId, DialogueTest, Flag};
use crate::engine::Engine;
use crate::storage::{Expr, ListField};
use crate::teach::text::{self, flow as flow_text};
use crate::teach::{FlowEdit, TeachArgv};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

pub struct FlowPlugin {
    context: FlagBinding,
}

impl FlowPlugin {
    pub fn new() -> Self {
        Self {
            context: FlagBinding::new(Flag::Context),
        }
    }

    /// Point the listed successors at the modified dialogues, unlinking
    /// dropped ones when overwriting
    async fn sync_successors(&self, engine: &Engine, argv: &mut TeachArgv) -> Result<()> {
        let Some(successors) = argv.flow.successors.clone() else {
            return Ok(());
        };
        let predecessors: Vec<DialogueId> = argv.dialogues.iter().map(|d| d.id).collect();
        let mut successor_dialogues = engine.get(&successors).await?;
        let mut known: Vec<DialogueId> = successor_dialogues.iter().map(|d| d.id).collect();
        argv.unknown = successors
            .iter()
            .filter(|id| !known.contains(id))
            .copied()
            .collect();

        if argv.flow.succ_overwrite && !predecessors.is_empty() {
            let test = DialogueTest {
                predecessors: Some(predecessors.clone()),
                ..Default::default()
            };
            for dialogue in engine.find(&test).await? {
                if !known.contains(&dialogue.id) {
                    known.push(dialogue.id);
                    successor_dialogues.push(dialogue);
                }
            }
        }

        let mut targets = engine.prepare_targets(argv, successor_dialogues);
        for target in targets.iter_mut() {
            if !successors.contains(&target.id) {
                target.predecessors.retain(|id| !predecessors.contains(id));
            } else if !predecessors.iter().all(|id| target.predecessors.contains(id)) {
                let merged: BTreeSet<DialogueId> = target
                    .predecessors
                    .iter()
                    .chain(predecessors.iter())
                    .copied()
                    .collect();
                target.predecessors = merged.into_iter().collect();
            }
        }
        engine.update(argv, targets).await
    }

    /// `>#`: teach a new dialogue whose predecessors are the modified ones
    async fn create_successor(&self, engine: &Engine, argv: &TeachArgv, sink: &dyn OutputSink) -> Result<()> {
        let Some(line) = &argv.options.create_successor else {
            return Ok(());
        };
        if argv.dialogues.is_empty() {
            return sink.send(text::SUCCESSOR_NOT_FOUND.to_string()).await;
        }
        let ids: Vec<String> = argv.dialogues.iter().map(|d| d.id.to_string()).collect();
        let command = format!("{} {} < {}", engine.config.general.prefix, line, ids.join(","));
        let session = argv.session.with_content(command);
        match engine.teach(&session, sink).await {
            Some(reply) if !reply.is_empty() => sink.send(reply).await,
            _ => Ok(()),
        }
    }
}

impl Default for FlowPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn flow_edit(argv: &TeachArgv) -> Result<FlowEdit, DialogueError> {
    let options = &argv.options;
    let mut edit = FlowEdit::default();
    match (&options.set_pred, &options.add_pred) {
        (Some(_), Some(_)) => return Err(DialogueError::OptionsConflict("<, <<".into())),
        (Some(ids), None) => {
            edit.predecessors = Some(ids.clone());
            edit.pred_overwrite = true;
        }
        (None, Some(ids)) => edit.predecessors = Some(ids.clone()),
        (None, None) => {}
    }
    match (&options.set_succ, &options.add_succ) {
        (Some(_), Some(_)) => return Err(DialogueError::OptionsConflict(">, >>".into())),
        (Some(ids), None) => {
            edit.successors = Some(ids.clone());
            edit.succ_overwrite = true;
        }
        (None, Some(ids)) => edit.successors = Some(ids.clone()),
        (None, None) => {}
    }
    if options.remove {
        edit.successors = Some(Vec::new());
        edit.succ_overwrite = true;
    }
    Ok(edit)
}

fn same_ids(a: &[DialogueId], b: &[DialogueId]) -> bool {
    let a: BTreeSet<_> = a.iter().collect();
    let b: BTreeSet<_> = b.iter().collect();
    a == b
}

#[async_trait]
impl DialoguePlugin for FlowPlugin {
    fn name(&self) -> &'static str {
        "flow"
    }

    async fn receive(&self, _engine: &Engine, state: &mut SessionState, _session: &Session) -> bool {
        let user = state.user_id.clone();
        let visible = state.with_channel(|channel| channel.predecessors.visible_keys(&user));
        state.test.stateful = true;
        state.test.predecessors = Some(visible);
        false
    }

    fn prepare(&self, _engine: &Engine, state: &mut SessionState) {
        if state.is_search {
            for dialogue in state.dialogues.iter_mut() {
                if !dialogue.predecessors.is_empty() {
                    dialogue.suppress();
                }
            }
        } else if state.dialogues.iter().any(|d| !d.predecessors.is_empty()) {
            for dialogue in state.dialogues.iter_mut() {
                if dialogue.predecessors.is_empty() {
                    dialogue.suppress();
                }
            }
        }
    }

    async fn before_send(&self, engine: &Engine, state: &mut SessionState, _session: &mut Session) -> bool {
        let Some(dialogue) = &state.dialogue else {
            return false;
        };
        let scope = if dialogue.has(Flag::Context) {
            Scope::Channel
        } else {
            Scope::user(state.user_id.clone())
        };
        let stamp = Stamp::now();
        let id = dialogue.id;
        let timeout = match dialogue.successor_timeout {
            0 => engine.config.successor_timeout(),
            millis => Duration::from_millis(millis),
        };
        state.with_channel(|channel| {
            for predecessor in &dialogue.predecessors {
                channel.predecessors.remove(&scope, predecessor);
            }
            channel.predecessors.insert(&scope, id, stamp);
        });
        expire_later(&state.channel, timeout, stamp, id, move |channel, id, stamp| {
            let current = channel
                .predecessors
                .scope(&scope)
                .and_then(|map| map.get(id))
                .copied();
            if current == Some(stamp) {
                channel.predecessors.remove(&scope, id);
            }
        });
        false
    }

    fn validate(&self, _engine: &Engine, argv: &mut TeachArgv) -> Result<(), DialogueError> {
        argv.flow = flow_edit(argv)?;
        Ok(())
    }

    async fn before_detail(&self, engine: &Engine, argv: &mut TeachArgv) -> Result<()> {
        if argv.modify {
            return Ok(());
        }
        let ids: BTreeSet<DialogueId> = argv
            .dialogues
            .iter()
            .flat_map(|d| d.predecessors.iter().copied())
            .collect();
        let ids: Vec<DialogueId> = ids.into_iter().collect();
        let found: HashMap<DialogueId, Dialogue> = engine
            .get(&ids)
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();
        for dialogue in argv.dialogues.iter_mut() {
            let predecessors = dialogue
                .predecessors
                .iter()
                .filter_map(|id| found.get(id).cloned())
                .collect();
            dialogue.meta.predecessors = Some(predecessors);
        }
        Ok(())
    }

    fn modify(&self, _engine: &Engine, argv: &TeachArgv, dialogue: &mut Dialogue) {
        self.context.modify(argv.options.context, dialogue);
        if let Some(predecessors) = &argv.flow.predecessors {
            if argv.flow.pred_overwrite {
                if !same_ids(&dialogue.predecessors, predecessors) {
                    dialogue.predecessors = predecessors.clone();
                }
            } else if !predecessors.iter().all(|id| dialogue.predecessors.contains(id)) {
                let merged: BTreeSet<DialogueId> = dialogue
                    .predecessors
                    .iter()
                    .chain(predecessors.iter())
                    .copied()
                    .collect();
                dialogue.predecessors = merged.into_iter().collect();
            }
        }
        if let Some(secs) = argv.options.successor_timeout.filter(|secs| *secs > 0) {
            dialogue.successor_timeout = secs * 1000;
        }
    }

    async fn after_modify(&self, engine: &Engine, argv: &mut TeachArgv, sink: &dyn OutputSink) -> Result<()> {
        self.sync_successors(engine, argv).await?;
        self.create_successor(engine, argv, sink).await
    }

    fn detail(&self, engine: &Engine, dialogue: &Dialogue, detail: &mut Detail, argv: &TeachArgv) {
        if dialogue.has(Flag::Context) {
            detail.add(300, flow_text::CONTEXT_MODE);
        }
        let default = engine.config.trigger.successor_timeout_ms;
        if dialogue.successor_timeout != 0 && dialogue.successor_timeout != default {
            detail.add(300, flow_text::timeout(dialogue.successor_timeout));
        }
        for (title, related) in [
            (flow_text::PREDECESSORS, &dialogue.meta.predecessors),
            (flow_text::SUCCESSORS, &dialogue.meta.successors),
        ] {
            if let Some(related) = related.as_ref().filter(|r| !r.is_empty()) {
                let mut lines = vec![title.to_string()];
                lines.extend(engine.list(argv, related));
                detail.add(300, lines.join("\n"));
            }
        }
    }

    fn abstract_tags(&self, engine: &Engine, dialogue: &Dialogue, output: &mut Abstract, _argv: &TeachArgv) {
        let default = engine.config.trigger.successor_timeout_ms;
        if dialogue.successor_timeout != 0 && dialogue.successor_timeout != default {
            output.push(format!("z={}", dialogue.successor_timeout as f64 / 1000.0));
        }
        if !dialogue.predecessors.is_empty() {
            output.push(flow_text::ABSTRACT_HAS_PRED);
        }
        if dialogue.has(Flag::Context) {
            output.push(flow_text::ABSTRACT_CONTEXT);
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
        if let Some(successors) = &dialogue.meta.successors {
            output.extend(engine.list_with_prefix(argv, successors, &format!("{prefix}> ")));
        }
    }

    fn usage(&self, _engine: &Engine, _authority: u32, output: &mut Vec<String>) {
        output.push("  < / << <ids>    set / add predecessors".to_string());
        output.push("  > / >> <ids>    set / add successors".to_string());
        output.push("  ># <question> <answer>  teach a successor".to_string());
        output.push("  -z <secs>       successor window".to_string());
        output.push("  -c / -C         successors open to / closed to the whole channel".to_string());
    }

    fn query(&self, _engine: &Engine, test: &DialogueTest, output: &mut Vec<Expr>) {
        self.context.query(test, output);
        if test.no_recursive {
            output.push(Expr::SizeEq(ListField::Predecessors, 0));
        } else if let Some(predecessors) = &test.predecessors {
            let mut branches = Vec::new();
            if test.stateful {
                branches.push(Expr::SizeEq(ListField::Predecessors, 0));
            }
            if !predecessors.is_empty() {
                branches.push(Expr::ContainsAny(
                    ListField::Predecessors,
                    predecessors.iter().map(|id| id.to_string()).collect(),
                ));
            }
            if !branches.is_empty() {
                output.push(Expr::Or(branches));
            }
        }
    }

    fn before_search(&self, _engine: &Engine, argv: &TeachArgv, test: &mut DialogueTest) -> bool {
        self.context.search(argv.options.context, test);
        false
    }

    async fn search(
        &self,
        engine: &Engine,
        argv: &mut TeachArgv,
        test: &DialogueTest,
        dialogues: &mut Vec<Dialogue>,
    ) -> Result<()> {
        let mut predecessors = Vec::new();
        for dialogue in dialogues.iter_mut() {
            if dialogue.meta.successors.is_some() {
                continue;
            }
            argv.visited_ids.insert(dialogue.id);
            dialogue.meta.successors = Some(Vec::new());
            predecessors.push(dialogue.id);
        }
        if predecessors.is_empty() {
            return Ok(());
        }

        let successor_test = DialogueTest {
            question: None,
            answer: None,
            original: None,
            predecessors: Some(predecessors),
            ..test.clone()
        };
        let mut successors: Vec<Dialogue> = engine
            .find(&successor_test)
            .await?
            .into_iter()
            .filter(|d| !argv.visited_ids.contains(&d.id))
            .collect();
        if successors.is_empty() {
            return Ok(());
        }
        engine
            .plugins
            .search(engine, argv, test, &mut successors)
            .await?;

        for dialogue in dialogues.iter_mut() {
            let attached: Vec<Dialogue> = successors
                .iter()
                .filter(|s| s.predecessors.contains(&dialogue.id))
                .cloned()
                .collect();
            if let Some(list) = dialogue.meta.successors.as_mut() {
                list.extend(attached);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::Session;
    use crate::teach::TeachOptions;

    #[test]
    fn test_pred_options_conflict() {
        let argv = TeachArgv::new(
            Session::guild("300", "100", "#"),
            TeachOptions {
                set_pred: Some(vec![1]),
                add_pred: Some(vec![2]),
                ..Default::default()
            },
            vec![],
        );
        assert!(matches!(flow_edit(&argv), Err(DialogueError::OptionsConflict(_))));
    }

    #[test]
    fn test_remove_clears_successors() {
        let argv = TeachArgv::new(
            Session::guild("300", "100", "#"),
            TeachOptions {
                remove: true,
                add_succ: Some(vec![3]),
                ..Default::default()
            },
            vec![],
        );
        let edit = flow_edit(&argv).unwrap();
        assert_eq!(edit.successors, Some(vec![]));
        assert!(edit.succ_overwrite);
    }

    #[test]
    fn test_same_ids_ignores_order() {
        assert!(same_ids(&[1, 2], &[2, 1]));
        assert!(!same_ids(&[1], &[1, 2]));
    }
}
