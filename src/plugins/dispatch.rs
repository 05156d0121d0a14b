//! Ordered hook dispatch

use super::{Abstract, Detail, DialoguePlugin};
use crate::channels::state::{ChannelState, SessionState};
use crate::core::errors::DialogueError;
use crate::core::session::Session;
use crate::core::traits::OutputSink;
use crate::core::types::{Dialogue, DialogueTest};
use crate::engine::Engine;
use crate::storage::Expr;
use crate::teach::TeachArgv;
use anyhow::Result;
use std::sync::Arc;

/// Plugins in registration order
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn DialoguePlugin>>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|plugin| plugin.name()))
            .finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn DialoguePlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn register(&mut self, plugin: Arc<dyn DialoguePlugin>) {
        tracing::debug!("Registered plugin {}", plugin.name());
        self.plugins.push(plugin);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    pub fn init_state(&self, engine: &Engine, state: &mut ChannelState) {
        for plugin in &self.plugins {
            plugin.init_state(engine, state);
        }
    }

    pub async fn receive(&self, engine: &Engine, state: &mut SessionState, session: &Session) -> bool {
        for plugin in &self.plugins {
            if plugin.receive(engine, state, session).await {
                tracing::debug!("Receive stopped by {}", plugin.name());
                return true;
            }
        }
        false
    }

    pub fn prepare(&self, engine: &Engine, state: &mut SessionState) {
        for plugin in &self.plugins {
            plugin.prepare(engine, state);
        }
    }

    pub async fn attach_user(&self, engine: &Engine, state: &mut SessionState, session: &Session) -> bool {
        for plugin in &self.plugins {
            if plugin.attach_user(engine, state, session).await {
                return true;
            }
        }
        false
    }

    pub async fn before_send(
        &self,
        engine: &Engine,
        state: &mut SessionState,
        session: &mut Session,
    ) -> bool {
        for plugin in &self.plugins {
            if plugin.before_send(engine, state, session).await {
                tracing::debug!("Send stopped by {}", plugin.name());
                return true;
            }
        }
        false
    }

    pub async fn after_send(&self, engine: &Engine, state: &SessionState, session: &Session) {
        for plugin in &self.plugins {
            plugin.after_send(engine, state, session).await;
        }
    }

    pub fn validate(&self, engine: &Engine, argv: &mut TeachArgv) -> Result<(), DialogueError> {
        for plugin in &self.plugins {
            plugin.validate(engine, argv)?;
        }
        Ok(())
    }

    pub async fn before_detail(&self, engine: &Engine, argv: &mut TeachArgv) -> Result<()> {
        for plugin in &self.plugins {
            plugin.before_detail(engine, argv).await?;
        }
        Ok(())
    }

    /// Runs every plugin; the last message returned wins
    pub async fn before_modify(&self, engine: &Engine, argv: &mut TeachArgv) -> Option<String> {
        let mut verdict = None;
        for plugin in &self.plugins {
            if let Some(message) = plugin.before_modify(engine, argv).await {
                tracing::debug!("Modification rejected by {}: {}", plugin.name(), message);
                verdict = Some(message);
            }
        }
        verdict
    }

    pub fn permit(&self, engine: &Engine, argv: &TeachArgv, dialogue: &Dialogue) -> bool {
        self.plugins
            .iter()
            .any(|plugin| plugin.permit(engine, argv, dialogue))
    }

    pub fn modify(&self, engine: &Engine, argv: &TeachArgv, dialogue: &mut Dialogue) {
        for plugin in &self.plugins {
            plugin.modify(engine, argv, dialogue);
        }
    }

    pub async fn after_modify(
        &self,
        engine: &Engine,
        argv: &mut TeachArgv,
        sink: &dyn OutputSink,
    ) -> Result<()> {
        for plugin in &self.plugins {
            plugin.after_modify(engine, argv, sink).await?;
        }
        Ok(())
    }

    pub fn detail(&self, engine: &Engine, dialogue: &Dialogue, detail: &mut Detail, argv: &TeachArgv) {
        for plugin in &self.plugins {
            plugin.detail(engine, dialogue, detail, argv);
        }
    }

    pub fn abstract_tags(&self, engine: &Engine, dialogue: &Dialogue, argv: &TeachArgv) -> Abstract {
        let mut output = Abstract::default();
        for plugin in &self.plugins {
            plugin.abstract_tags(engine, dialogue, &mut output, argv);
        }
        output
    }

    pub fn appendix(
        &self,
        engine: &Engine,
        dialogue: &Dialogue,
        output: &mut Vec<String>,
        prefix: &str,
        argv: &TeachArgv,
    ) {
        for plugin in &self.plugins {
            plugin.appendix(engine, dialogue, output, prefix, argv);
        }
    }

    pub fn usage(&self, engine: &Engine, authority: u32) -> Vec<String> {
        let mut output = Vec::new();
        for plugin in &self.plugins {
            plugin.usage(engine, authority, &mut output);
        }
        output
    }

    /// Conjunction of every plugin's predicates
    pub fn query(&self, engine: &Engine, test: &DialogueTest) -> Expr {
        let mut parts = Vec::new();
        for plugin in &self.plugins {
            plugin.query(engine, test, &mut parts);
        }
        Expr::all(parts)
    }

    pub fn before_search(&self, engine: &Engine, argv: &TeachArgv, test: &mut DialogueTest) -> bool {
        for plugin in &self.plugins {
            if plugin.before_search(engine, argv, test) {
                return true;
            }
        }
        false
    }

    pub async fn search(
        &self,
        engine: &Engine,
        argv: &mut TeachArgv,
        test: &DialogueTest,
        dialogues: &mut Vec<Dialogue>,
    ) -> Result<()> {
        for plugin in &self.plugins {
            plugin.search(engine, argv, test, dialogues).await?;
        }
        Ok(())
    }
}
