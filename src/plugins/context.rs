//! Guild scoping
//!
//! A dialogue carries a guild list and the complement flag. With the flag
//! clear the list is an allow list; with it set, a deny list.

use super::{Abstract, Detail, DialoguePlugin};
use crate::channels::state::SessionState;
use crate::core::errors::DialogueError;
use crate::core::session::Session;
use crate::core::types::{Dialogue, DialogueTest, Flag};
use crate::engine::Engine;
use crate::storage::{Expr, ListField};
use crate::teach::{text, ContextScope, TeachArgv};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static GUILDS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(,\d+)*$").unwrap());

pub struct ContextPlugin;

/// Derive the guild scope from the context options
fn resolve_scope(argv: &TeachArgv) -> Result<ContextScope, DialogueError> {
    let options = &argv.options;
    let conflict = [
        (options.disable && options.enable, "-d, -e"),
        (options.disable_global && options.enable_global, "-D, -E"),
        (options.disable_global && options.disable, "-D, -d"),
        (options.enable && options.enable_global, "-E, -e"),
    ];
    if let Some((_, pair)) = conflict.iter().find(|(hit, _)| *hit) {
        return Err(DialogueError::OptionsConflict(pair.to_string()));
    }

    let current: Vec<String> = argv.session.gid().into_iter().collect();
    let mut no_context_options = false;
    let mut scope = ContextScope::default();
    let mut guilds = None;
    if options.disable {
        scope.reversed = true;
        scope.partial = !options.enable_global;
        guilds = Some(current);
    } else if options.disable_global {
        scope.reversed = options.guilds.is_some();
        guilds = Some(if options.enable { current } else { Vec::new() });
    } else if options.enable_global {
        scope.reversed = options.guilds.is_none();
        guilds = Some(Vec::new());
    } else {
        no_context_options = !options.enable;
        let scoped = if argv.target.is_some() {
            options.enable
        } else {
            !options.global
        };
        if scoped {
            scope.partial = true;
            guilds = Some(current);
        }
    }

    if let Some(ids) = &options.guilds {
        if no_context_options {
            return Err(DialogueError::invalid_option("-g", text::MODIFIER_EXPECTED));
        }
        if !ids.is_empty() && !GUILDS_RE.is_match(ids) {
            return Err(DialogueError::invalid_option("-g", "expected comma-separated guild ids"));
        }
        scope.guilds = Some(
            ids.split(',')
                .filter(|id| !id.is_empty())
                .map(|id| format!("{}:{}", argv.session.platform, id))
                .collect(),
        );
    } else if argv.session.is_direct() && scope.partial {
        return Err(DialogueError::invalid_option("-d/-e", text::PRIVATE_CONTEXT));
    } else {
        scope.guilds = guilds;
    }
    Ok(scope)
}

#[async_trait]
impl DialoguePlugin for ContextPlugin {
    fn name(&self) -> &'static str {
        "context"
    }

    fn validate(&self, _engine: &Engine, argv: &mut TeachArgv) -> Result<(), DialogueError> {
        argv.context = resolve_scope(argv)?;
        Ok(())
    }

    fn modify(&self, _engine: &Engine, argv: &TeachArgv, dialogue: &mut Dialogue) {
        let scope = &argv.context;
        let Some(guilds) = &scope.guilds else {
            return;
        };
        if scope.partial {
            let current: BTreeSet<String> = dialogue.guilds.iter().cloned().collect();
            let changes: BTreeSet<String> = guilds.iter().cloned().collect();
            let next: BTreeSet<String> = if !dialogue.has(Flag::Complement) == scope.reversed {
                current.difference(&changes).cloned().collect()
            } else {
                current.union(&changes).cloned().collect()
            };
            if next != current {
                dialogue.guilds = next.into_iter().collect();
            }
        } else {
            dialogue.flag.set(Flag::Complement, scope.reversed);
            let mut sorted = guilds.clone();
            sorted.sort();
            sorted.dedup();
            let mut existing = dialogue.guilds.clone();
            existing.sort();
            if existing != sorted {
                dialogue.guilds = sorted;
            }
        }
    }

    fn before_search(&self, _engine: &Engine, argv: &TeachArgv, test: &mut DialogueTest) -> bool {
        test.partial = argv.context.partial;
        test.reversed = argv.context.reversed;
        test.guilds = argv.context.guilds.clone();
        false
    }

    async fn receive(&self, _engine: &Engine, state: &mut SessionState, session: &Session) -> bool {
        state.test.partial = true;
        state.test.reversed = false;
        state.test.guilds = Some(session.gid().into_iter().collect());
        false
    }

    fn detail(&self, _engine: &Engine, dialogue: &Dialogue, detail: &mut Detail, argv: &TeachArgv) {
        let includes_current = argv
            .session
            .gid()
            .is_some_and(|gid| dialogue.guilds.contains(&gid));
        detail.add(
            500,
            text::context::detail(
                dialogue.has(Flag::Complement),
                includes_current,
                dialogue.guilds.len(),
            ),
        );
    }

    fn abstract_tags(&self, _engine: &Engine, dialogue: &Dialogue, output: &mut Abstract, argv: &TeachArgv) {
        let Some(gid) = argv.session.gid() else {
            return;
        };
        if argv.context.guilds.is_some() {
            return;
        }
        let reversed = dialogue.has(Flag::Complement);
        let has_guild = dialogue.guilds.contains(&gid);
        let tag = match (!reversed == has_guild, reversed) {
            (true, true) => "E",
            (true, false) => "e",
            (false, true) => "d",
            (false, false) => "D",
        };
        output.unshift(tag);
    }

    fn usage(&self, engine: &Engine, authority: u32, output: &mut Vec<String>) {
        output.push("  -e / -d         enable / disable in this guild".to_string());
        if authority >= engine.config.authority.context {
            output.push("  -E / -D         enable / disable everywhere".to_string());
            output.push("  -g <ids>        guilds the context options apply to".to_string());
            output.push("  -G              search regardless of context".to_string());
        }
    }

    fn query(&self, _engine: &Engine, test: &DialogueTest, output: &mut Vec<Expr>) {
        let Some(guilds) = test.guilds.as_ref().filter(|guilds| !guilds.is_empty()) else {
            return;
        };
        let bit = Flag::Complement.bit();
        let (listed, unlisted) = if test.reversed {
            (Expr::BitsAllSet(bit), Expr::BitsAllClear(bit))
        } else {
            (Expr::BitsAllClear(bit), Expr::BitsAllSet(bit))
        };
        let mut contains_all = vec![listed];
        contains_all.extend(
            guilds
                .iter()
                .map(|gid| Expr::Contains(ListField::Guilds, gid.clone())),
        );
        output.push(Expr::Or(vec![
            Expr::all(contains_all),
            Expr::all(vec![
                unlisted,
                Expr::not(Expr::ContainsAny(ListField::Guilds, guilds.clone())),
            ]),
        ]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::Session;
    use crate::teach::TeachOptions;

    fn argv(options: TeachOptions) -> TeachArgv {
        TeachArgv::new(Session::guild("300", "100", "#"), options, vec![])
    }

    #[test]
    fn test_default_scope_is_current_guild() {
        let scope = resolve_scope(&argv(TeachOptions::default())).unwrap();
        assert!(scope.partial);
        assert!(!scope.reversed);
        assert_eq!(scope.guilds, Some(vec!["ditto:100".to_string()]));
    }

    #[test]
    fn test_enable_global_is_empty_deny_list() {
        let scope = resolve_scope(&argv(TeachOptions {
            enable_global: true,
            ..Default::default()
        }))
        .unwrap();
        assert!(scope.reversed);
        assert!(!scope.partial);
        assert_eq!(scope.guilds, Some(vec![]));
    }

    #[test]
    fn test_guild_list_needs_modifier() {
        let err = resolve_scope(&argv(TeachOptions {
            guilds: Some("1,2".into()),
            ..Default::default()
        }))
        .unwrap_err();
        assert!(matches!(err, DialogueError::InvalidOption { .. }));

        let scope = resolve_scope(&argv(TeachOptions {
            enable_global: true,
            guilds: Some("1,2".into()),
            ..Default::default()
        }))
        .unwrap();
        assert!(!scope.reversed);
        assert_eq!(
            scope.guilds,
            Some(vec!["ditto:1".to_string(), "ditto:2".to_string()])
        );
    }

    #[test]
    fn test_conflicts() {
        let err = resolve_scope(&argv(TeachOptions {
            disable: true,
            enable: true,
            ..Default::default()
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Options -d, -e cannot be used together.");
    }

    #[test]
    fn test_direct_message_needs_global_option() {
        let direct = TeachArgv::new(Session::direct("300", "#"), TeachOptions::default(), vec![]);
        assert!(resolve_scope(&direct).is_err());
    }
}
