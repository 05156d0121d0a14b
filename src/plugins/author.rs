//! Dialogue writers, the frozen and substitute flags, and edit permissions

use super::{Abstract, Detail, DialoguePlugin, FlagBinding};
use crate::channels::state::SessionState;
use crate::core::session::Session;
use crate::core::types::{Dialogue, DialogueTest, Flag};
use crate::engine::Engine;
use crate::storage::{Expr, TextField};
use crate::teach::text::{self, writer as writer_text};
use crate::teach::{TeachArgv, WriterOption};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};

pub struct AuthorPlugin {
    frozen: FlagBinding,
    substitute: FlagBinding,
}

impl AuthorPlugin {
    pub fn new() -> Self {
        Self {
            frozen: FlagBinding::new(Flag::Frozen),
            substitute: FlagBinding::new(Flag::Substitute),
        }
    }
}

impl Default for AuthorPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DialoguePlugin for AuthorPlugin {
    fn name(&self) -> &'static str {
        "author"
    }

    async fn before_detail(&self, engine: &Engine, argv: &mut TeachArgv) -> Result<()> {
        argv.name_map.clear();
        argv.auth_map.clear();
        let mut writers: BTreeSet<String> = argv
            .dialogues
            .iter()
            .map(|d| d.writer.clone())
            .filter(|w| !w.is_empty())
            .collect();

        match &argv.options.writer {
            Some(WriterOption::Anonymous) => argv.writer = Some(String::new()),
            Some(WriterOption::User(reference)) => {
                if let Some(user) = engine.identity.resolve(reference).await? {
                    writers.insert(user.id.clone());
                    argv.writer = Some(user.id);
                }
            }
            None => {}
        }

        let ids: Vec<String> = writers.into_iter().collect();
        let users = engine.identity.get_users(&ids).await?;
        let mut unnamed = Vec::new();
        for user in users {
            argv.auth_map.insert(user.id.clone(), user.authority);
            if argv.modify {
                continue;
            }
            if let Some(name) = &user.name {
                argv.name_map.insert(user.id.clone(), format!("{} ({})", name, user.id));
            } else if user.id == argv.session.user_id {
                argv.name_map.insert(
                    user.id.clone(),
                    format!("{} ({})", argv.session.username, argv.session.user_id),
                );
            } else {
                unnamed.push(user.id);
            }
        }

        if !argv.modify && !unnamed.is_empty() {
            if let Some(guild) = argv.session.guild_id.clone() {
                match engine.identity.member_names(&guild).await {
                    Ok(members) => fill_member_names(&mut argv.name_map, &unnamed, &members),
                    Err(e) => tracing::warn!("Failed to fetch member names of {}: {}", guild, e),
                }
            }
        }
        Ok(())
    }

    async fn before_modify(&self, _engine: &Engine, argv: &mut TeachArgv) -> Option<String> {
        if argv.options.writer.is_some() && argv.writer.is_none() {
            return Some(text::WRITER_NOT_FOUND.to_string());
        }
        None
    }

    fn permit(&self, engine: &Engine, argv: &TeachArgv, dialogue: &Dialogue) -> bool {
        let authority = argv.authority();
        let operator = argv.operator();
        let levels = &engine.config.authority;

        let new_writer_outranks = argv.writer.as_deref().is_some_and(|writer| {
            !writer.is_empty()
                && writer != operator
                && argv
                    .auth_map
                    .get(writer)
                    .is_some_and(|level| authority <= *level)
        });
        let frozen = dialogue.has(Flag::Frozen) && authority < levels.frozen;
        let foreign = dialogue.writer != operator && {
            let substitute = argv.options.substitute == Some(true) || dialogue.has(Flag::Substitute);
            let writer_level = argv
                .auth_map
                .get(&dialogue.writer)
                .copied()
                .filter(|level| *level > 0)
                .unwrap_or(levels.base);
            (argv.target.is_some() && authority < levels.admin)
                || (substitute && authority <= writer_level)
        };
        new_writer_outranks || frozen || foreign
    }

    fn modify(&self, _engine: &Engine, argv: &TeachArgv, dialogue: &mut Dialogue) {
        self.frozen.modify(argv.options.frozen, dialogue);
        self.substitute.modify(argv.options.substitute, dialogue);
        if let Some(writer) = &argv.writer {
            dialogue.writer = writer.clone();
        } else if argv.target.is_none() {
            dialogue.writer = argv.operator().to_string();
        }
    }

    async fn before_send(&self, engine: &Engine, state: &mut SessionState, session: &mut Session) -> bool {
        let Some(dialogue) = &state.dialogue else {
            return false;
        };
        if !dialogue.has(Flag::Substitute) || dialogue.writer.is_empty() || session.user.id == dialogue.writer {
            return false;
        }
        match engine.identity.get_users(&[dialogue.writer.clone()]).await {
            Ok(users) => {
                if let Some(writer) = users.into_iter().next() {
                    tracing::debug!("Dialogue {} answers as {}", dialogue.id, writer.id);
                    session.user_id = writer.id.clone();
                    session.user = writer;
                }
            }
            Err(e) => tracing::warn!("Failed to load writer {}: {}", dialogue.writer, e),
        }
        false
    }

    fn detail(&self, _engine: &Engine, dialogue: &Dialogue, detail: &mut Detail, argv: &TeachArgv) {
        if dialogue.has(Flag::Frozen) {
            detail.add(200, writer_text::FROZEN);
        }
        if !dialogue.writer.is_empty() {
            let name = argv
                .name_map
                .get(&dialogue.writer)
                .map(String::as_str)
                .unwrap_or(writer_text::UNKNOWN);
            detail.add(200, writer_text::detail(name));
            if dialogue.has(Flag::Substitute) {
                detail.add(200, writer_text::SUBSTITUTE);
            }
        }
    }

    fn abstract_tags(&self, _engine: &Engine, dialogue: &Dialogue, output: &mut Abstract, _argv: &TeachArgv) {
        if dialogue.has(Flag::Frozen) {
            output.push(writer_text::ABSTRACT_FROZEN);
        }
        if dialogue.has(Flag::Substitute) {
            output.push(writer_text::ABSTRACT_SUBSTITUTE);
        }
    }

    fn usage(&self, engine: &Engine, authority: u32, output: &mut Vec<String>) {
        let levels = &engine.config.authority;
        if authority >= levels.frozen {
            output.push("  -f / -F         freeze / unfreeze".to_string());
        }
        output.push("  -w <user>       set the writer".to_string());
        if authority >= levels.writer {
            output.push("  -W              make anonymous".to_string());
        }
        output.push("  -s / -S         answer as / not as the writer".to_string());
    }

    fn query(&self, _engine: &Engine, test: &DialogueTest, output: &mut Vec<Expr>) {
        self.frozen.query(test, output);
        self.substitute.query(test, output);
        if let Some(writer) = &test.writer {
            output.push(Expr::Eq(TextField::Writer, writer.clone()));
        }
    }

    fn before_search(&self, _engine: &Engine, argv: &TeachArgv, test: &mut DialogueTest) -> bool {
        self.frozen.search(argv.options.frozen, test);
        self.substitute.search(argv.options.substitute, test);
        test.writer = argv.writer.clone();
        false
    }
}

fn fill_member_names(
    name_map: &mut HashMap<String, String>,
    unnamed: &[String],
    members: &HashMap<String, String>,
) {
    for id in unnamed {
        if let Some(name) = members.get(id) {
            name_map.entry(id.clone()).or_insert_with(|| name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_names_fill_gaps_only() {
        let mut name_map = HashMap::from([("1".to_string(), "Alice (1)".to_string())]);
        let members = HashMap::from([
            ("1".to_string(), "alice".to_string()),
            ("2".to_string(), "bob".to_string()),
        ]);
        fill_member_names(&mut name_map, &["1".into(), "2".into(), "3".into()], &members);
        assert_eq!(name_map["1"], "Alice (1)");
        assert_eq!(name_map["2"], "bob");
        assert!(!name_map.contains_key("3"));
    }
}
