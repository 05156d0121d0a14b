//! Feature modules of the dialogue engine
//!
//! Every feature (probabilities, guild scoping, predecessor chains, rate
//! limiting, ...) is a [`DialoguePlugin`] that hooks into the receive path
//! and the teach pipeline. The [`PluginRegistry`] calls the hooks in
//! registration order.
//!
//! # Hook kinds
//!
//! - **emit**: every plugin runs
//! - **bail**: the first plugin returning `true` (or an error) stops the chain
//! - **serial**: every plugin runs, the last message returned wins

pub mod author;
pub mod context;
pub mod dispatch;
pub mod flag;
pub mod flow;
pub mod internal;
pub mod probability;
pub mod rate_limit;
pub mod review;
pub mod search;
pub mod time;

pub use dispatch::PluginRegistry;
pub use flag::FlagBinding;

use crate::channels::state::{ChannelState, SessionState};
use crate::core::errors::DialogueError;
use crate::core::session::Session;
use crate::core::traits::OutputSink;
use crate::core::types::{Dialogue, DialogueTest};
use crate::engine::Engine;
use crate::storage::Expr;
use crate::teach::TeachArgv;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Ordered detail lines of a dialogue; higher order comes first
#[derive(Debug, Clone, Default)]
pub struct Detail {
    entries: Vec<(i32, String)>,
}

impl Detail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, order: i32, line: impl Into<String>) {
        self.entries.push((order, line.into()));
    }

    pub fn into_lines(mut self) -> Vec<String> {
        self.entries.sort_by(|a, b| b.0.cmp(&a.0));
        self.entries.into_iter().map(|(_, line)| line).collect()
    }
}

/// Short tags shown in listings, e.g. `[p=0.5, E]`
#[derive(Debug, Clone, Default)]
pub struct Abstract {
    pub tags: Vec<String>,
    /// Overrides the "Question" label
    pub question_type: Option<&'static str>,
    /// Overrides the "Answer" label
    pub answer_type: Option<&'static str>,
}

impl Abstract {
    pub fn push(&mut self, tag: impl Into<String>) {
        self.tags.push(tag.into());
    }

    pub fn unshift(&mut self, tag: impl Into<String>) {
        self.tags.insert(0, tag.into());
    }
}

/// A feature module
///
/// Every hook has a no-op default so plugins only implement what they use.
#[async_trait]
pub trait DialoguePlugin: Send + Sync {
    fn name(&self) -> &'static str;

    // ---- receive path ----

    /// Initialise this plugin's part of a new channel state
    fn init_state(&self, _engine: &Engine, _state: &mut ChannelState) {}

    /// Fill in the match test; `true` drops the message (bail)
    async fn receive(&self, _engine: &Engine, _state: &mut SessionState, _session: &Session) -> bool {
        false
    }

    /// Weight or suppress candidates
    fn prepare(&self, _engine: &Engine, _state: &mut SessionState) {}

    /// `true` drops the message after weighting (bail)
    async fn attach_user(&self, _engine: &Engine, _state: &mut SessionState, _session: &Session) -> bool {
        false
    }

    /// Last chance to drop the answer; may switch the acting user (bail)
    async fn before_send(
        &self,
        _engine: &Engine,
        _state: &mut SessionState,
        _session: &mut Session,
    ) -> bool {
        false
    }

    async fn after_send(&self, _engine: &Engine, _state: &SessionState, _session: &Session) {}

    // ---- teach pipeline ----

    /// Reject or normalise the command before anything is loaded (bail)
    fn validate(&self, _engine: &Engine, _argv: &mut TeachArgv) -> Result<(), DialogueError> {
        Ok(())
    }

    /// Resolve whatever the detail and permit hooks need
    async fn before_detail(&self, _engine: &Engine, _argv: &mut TeachArgv) -> Result<()> {
        Ok(())
    }

    /// A message aborts the modification (serial)
    async fn before_modify(&self, _engine: &Engine, _argv: &mut TeachArgv) -> Option<String> {
        None
    }

    /// `true` forbids modifying `dialogue` (bail)
    fn permit(&self, _engine: &Engine, _argv: &TeachArgv, _dialogue: &Dialogue) -> bool {
        false
    }

    /// Apply the options to one target
    fn modify(&self, _engine: &Engine, _argv: &TeachArgv, _dialogue: &mut Dialogue) {}

    async fn after_modify(
        &self,
        _engine: &Engine,
        _argv: &mut TeachArgv,
        _sink: &dyn OutputSink,
    ) -> Result<()> {
        Ok(())
    }

    // ---- rendering ----

    fn detail(&self, _engine: &Engine, _dialogue: &Dialogue, _detail: &mut Detail, _argv: &TeachArgv) {}

    fn abstract_tags(
        &self,
        _engine: &Engine,
        _dialogue: &Dialogue,
        _output: &mut Abstract,
        _argv: &TeachArgv,
    ) {
    }

    /// Extra lines below a listed dialogue
    fn appendix(
        &self,
        _engine: &Engine,
        _dialogue: &Dialogue,
        _output: &mut Vec<String>,
        _prefix: &str,
        _argv: &TeachArgv,
    ) {
    }

    fn usage(&self, _engine: &Engine, _authority: u32, _output: &mut Vec<String>) {}

    // ---- querying ----

    /// Contribute predicates for `test`
    fn query(&self, _engine: &Engine, _test: &DialogueTest, _output: &mut Vec<Expr>) {}

    /// Copy search options into the test; `true` aborts the search (bail)
    fn before_search(&self, _engine: &Engine, _argv: &TeachArgv, _test: &mut DialogueTest) -> bool {
        false
    }

    /// Attach related dialogues to search results
    async fn search(
        &self,
        _engine: &Engine,
        _argv: &mut TeachArgv,
        _test: &DialogueTest,
        _dialogues: &mut Vec<Dialogue>,
    ) -> Result<()> {
        Ok(())
    }
}

/// The built-in plugins in their fixed order
pub fn builtin() -> Vec<Arc<dyn DialoguePlugin>> {
    vec![
        Arc::new(internal::InternalPlugin),
        Arc::new(probability::ProbabilityPlugin),
        Arc::new(search::SearchPlugin),
        Arc::new(review::ReviewPlugin),
        Arc::new(author::AuthorPlugin::new()),
        Arc::new(context::ContextPlugin),
        Arc::new(flow::FlowPlugin::new()),
        Arc::new(time::TimePlugin),
        Arc::new(rate_limit::RateLimitPlugin),
    ]
}
