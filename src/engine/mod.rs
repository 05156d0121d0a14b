//! Dialogue engine
//!
//! Owns the store, the plugins and the per-channel state, and routes every
//! inbound message: pending hint confirmations first, then the teach
//! command, then dialogue matching.

use crate::channels::state::StateManager;
use crate::channels::{self, Notice};
use crate::config::Config;
use crate::core::errors::DialogueError;
use crate::core::identity::MemoryIdentity;
use crate::core::normalizer::Normalizer;
use crate::core::session::Session;
use crate::core::traits::{
    AssetTransformer, Clock, CommandExecutor, Identity, LocalClock, NoCommands, OutputSink, Sampler,
    ThreadRngSampler,
};
use crate::plugins::{self, DialoguePlugin, PluginRegistry};
use crate::storage::{self, DialogueStore, HistoryLog};
use crate::teach::confirm::is_confirmation;
use crate::teach::parser::{check_authority, parse_command};
use crate::teach::{text, update, PendingConfirmations};
use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

pub struct Engine {
    pub config: Config,
    pub store: Arc<dyn DialogueStore>,
    pub history: HistoryLog,
    pub identity: Arc<dyn Identity>,
    pub assets: Option<Arc<dyn AssetTransformer>>,
    pub executor: Arc<dyn CommandExecutor>,
    pub sampler: Arc<dyn Sampler>,
    pub clock: Arc<dyn Clock>,
    pub normalizer: Normalizer,
    pub plugins: PluginRegistry,
    pub states: StateManager,
    pub pending: PendingConfirmations,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("plugins", &self.plugins)
            .field("channels", &self.states.len())
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Engine`]; every collaborator has an in-process default
pub struct EngineBuilder {
    config: Config,
    store: Option<Arc<dyn DialogueStore>>,
    identity: Option<Arc<dyn Identity>>,
    assets: Option<Arc<dyn AssetTransformer>>,
    executor: Option<Arc<dyn CommandExecutor>>,
    sampler: Option<Arc<dyn Sampler>>,
    clock: Option<Arc<dyn Clock>>,
    extra_plugins: Vec<Arc<dyn DialoguePlugin>>,
}

impl EngineBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            identity: None,
            assets: None,
            executor: None,
            sampler: None,
            clock: None,
            extra_plugins: Vec::new(),
        }
    }

    pub fn store(mut self, store: Arc<dyn DialogueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn identity(mut self, identity: Arc<dyn Identity>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn assets(mut self, assets: Arc<dyn AssetTransformer>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Register a plugin after the built-in ones
    pub fn plugin(mut self, plugin: Arc<dyn DialoguePlugin>) -> Self {
        self.extra_plugins.push(plugin);
        self
    }

    pub fn build(self) -> Result<Engine> {
        self.config.validate()?;
        let store = match self.store {
            Some(store) => store,
            None => storage::open(&self.config.storage)?,
        };
        let mut registry = PluginRegistry::new();
        for plugin in plugins::builtin().into_iter().chain(self.extra_plugins) {
            registry.register(plugin);
        }
        tracing::info!("Dialogue engine ready with plugins {:?}", registry.names());
        Ok(Engine {
            history: HistoryLog::new(self.config.history_timeout()),
            normalizer: Normalizer::new(&self.config.nicknames),
            store,
            identity: self
                .identity
                .unwrap_or_else(|| Arc::new(MemoryIdentity::new())),
            assets: self.assets,
            executor: self.executor.unwrap_or_else(|| Arc::new(NoCommands)),
            sampler: self.sampler.unwrap_or_else(|| Arc::new(ThreadRngSampler)),
            clock: self.clock.unwrap_or_else(|| Arc::new(LocalClock)),
            plugins: registry,
            states: StateManager::new(),
            pending: PendingConfirmations::new(),
            config: self.config,
        })
    }
}

impl Engine {
    pub fn builder(config: Config) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Route one inbound message
    ///
    /// Returns whether the engine replied or rendered an answer.
    pub async fn handle_message(&self, mut session: Session, sink: &dyn OutputSink) -> Result<bool> {
        match self.identity.resolve(&session.user_id).await {
            Ok(Some(user)) => session.user = user,
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to resolve user {}: {}", session.user_id, e),
        }

        if let Some((argv, confirmation)) = self.pending.take(&session.channel_id, &session.user_id) {
            if is_confirmation(&session.content) {
                let operation = argv.operation();
                let reply = match update::resume(self, argv, confirmation, sink).await {
                    Ok(reply) => reply,
                    Err(e) => self.describe_error(operation, e),
                };
                send_reply(sink, reply).await?;
                return Ok(true);
            }
        }

        if let Some(reply) = self.teach(&session, sink).await {
            send_reply(sink, reply).await?;
            return Ok(true);
        }

        if session.is_direct() {
            return Ok(false);
        }
        match channels::trigger_dialogue(self, &mut session, sink).await {
            Ok(answered) => Ok(answered),
            Err(e) => {
                tracing::warn!("Failed to trigger dialogue for {:?}: {}", session.content, e);
                Ok(false)
            }
        }
    }

    /// Run the teach command in `session`
    ///
    /// `None` when the message is not a teach command; an empty reply means
    /// everything was already sent through `sink`.
    pub fn teach<'a>(&'a self, session: &'a Session, sink: &'a dyn OutputSink) -> BoxFuture<'a, Option<String>> {
        async move {
            let parsed = parse_command(&self.config.general.prefix, &session.content)?;
            if session.user.authority < self.config.authority.base {
                return Some(text::LOW_AUTHORITY.to_string());
            }
            let command = match parsed {
                Ok(command) => command,
                Err(e) => return Some(e.to_string()),
            };
            if let Err(e) = check_authority(&command.options, &self.config.authority, session.user.authority) {
                return Some(e.to_string());
            }
            tracing::debug!("[teach] {}: {}", session.user_id, session.content);

            let operation = command.operation();
            Some(match update::execute(self, command, session, sink).await {
                Ok(reply) => reply,
                Err(e) => self.describe_error(operation, e),
            })
        }
        .boxed()
    }

    /// Trigger the dialogue bound to a platform event
    pub async fn handle_notice(&self, session: Session, notice: &Notice, sink: &dyn OutputSink) -> Result<bool> {
        let Some(content) = notice.content(&session) else {
            return Ok(false);
        };
        if session.is_direct() {
            return Ok(false);
        }
        let mut session = session.with_content(content);
        channels::trigger_dialogue(self, &mut session, sink).await
    }

    /// User-facing text for a failed teach command
    fn describe_error(&self, operation: &str, error: anyhow::Error) -> String {
        match error.downcast::<DialogueError>() {
            Ok(e) => e.to_string(),
            Err(e) => {
                tracing::warn!("Teach command failed to {}: {:#}", operation, e);
                DialogueError::upstream(operation, e).to_string()
            }
        }
    }
}

async fn send_reply(sink: &dyn OutputSink, reply: String) -> Result<()> {
    if reply.is_empty() {
        return Ok(());
    }
    sink.send(reply).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DialogueId, DialoguePatch, UserProfile};
    use crate::core::Dialogue;
    use crate::storage::{DialogueStats, Expr};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct BrokenStore;

    #[async_trait]
    impl DialogueStore for BrokenStore {
        async fn query(&self, _expr: &Expr) -> Result<Vec<Dialogue>> {
            anyhow::bail!("database is locked")
        }
        async fn get(&self, _ids: &[DialogueId]) -> Result<Vec<Dialogue>> {
            anyhow::bail!("database is locked")
        }
        async fn create(&self, _dialogue: Dialogue) -> Result<Dialogue> {
            anyhow::bail!("database is locked")
        }
        async fn upsert(&self, _patches: Vec<DialoguePatch>) -> Result<()> {
            anyhow::bail!("database is locked")
        }
        async fn remove(&self, _ids: &[DialogueId]) -> Result<()> {
            anyhow::bail!("database is locked")
        }
        async fn stats(&self) -> Result<DialogueStats> {
            anyhow::bail!("database is locked")
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    #[async_trait]
    impl OutputSink for Collect {
        async fn send(&self, message: String) -> Result<()> {
            self.0.lock().unwrap().push(message);
            Ok(())
        }
        async fn send_queued(&self, message: String) -> Result<()> {
            self.send(message).await
        }
    }

    fn broken_engine() -> Engine {
        let identity = Arc::new(MemoryIdentity::new());
        identity.insert(UserProfile::new("1", 4));
        Engine::builder(Config::default())
            .store(Arc::new(BrokenStore))
            .identity(identity)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_store_failure_becomes_generic_message() {
        let engine = broken_engine();
        let sink = Collect::default();
        let session = Session::guild("1", "10000", "# hi hello");
        assert!(engine.handle_message(session, &sink).await.unwrap());
        assert_eq!(
            *sink.0.lock().unwrap(),
            vec!["An error occurred while trying to create."]
        );
    }

    #[tokio::test]
    async fn test_store_failure_on_receive_is_silent() {
        let engine = broken_engine();
        let sink = Collect::default();
        let session = Session::guild("1", "10000", "hi");
        assert!(!engine.handle_message(session, &sink).await.unwrap());
        assert!(sink.0.lock().unwrap().is_empty());
    }
}
