//! Shared harness for the engine integration tests

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use ditto_cli::channels::Notice;
use ditto_cli::core::identity::MemoryIdentity;
use ditto_cli::core::session::Session;
use ditto_cli::core::traits::{CommandExecutor, FixedSampler, ManualClock, NoCommands, OutputSink};
use ditto_cli::core::types::UserProfile;
use ditto_cli::{Config, Engine};
use std::sync::{Arc, Mutex};

pub const GUILD: &str = "10000";
pub const OTHER_GUILD: &str = "20000";

/// Authority 4, may use every option
pub const ADMIN: &str = "100";
/// Authority 2, may teach
pub const ALICE: &str = "200";
/// Authority 2, may teach
pub const MALLORY: &str = "300";
/// Authority 1, may only talk
pub const BOB: &str = "400";

/// Records every message the engine sends
#[derive(Default)]
pub struct Collect(Mutex<Vec<String>>);

impl Collect {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

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

pub struct Harness {
    pub engine: Engine,
    pub identity: Arc<MemoryIdentity>,
    pub clock: Arc<ManualClock>,
    pub sink: Collect,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, Arc::new(NoCommands))
    }

    /// Harness whose answers run `$( ... )` commands through `executor`
    pub fn with_executor(executor: Arc<dyn CommandExecutor>) -> Self {
        Self::build(Config::default(), executor)
    }

    fn build(config: Config, executor: Arc<dyn CommandExecutor>) -> Self {
        let identity = Arc::new(MemoryIdentity::new());
        identity.insert(UserProfile::new(ADMIN, 4));
        identity.insert(UserProfile::new(ALICE, 2));
        identity.insert(UserProfile::new(MALLORY, 2));
        identity.insert(UserProfile::new(BOB, 1));
        let clock = Arc::new(ManualClock::new(12, 0));
        let engine = Engine::builder(config)
            .identity(identity.clone())
            .clock(clock.clone())
            .sampler(Arc::new(FixedSampler(0.0)))
            .executor(executor)
            .build()
            .unwrap();
        Self {
            engine,
            identity,
            clock,
            sink: Collect::default(),
        }
    }

    /// Send `content` as `user` in the default guild and return the output
    pub async fn say(&self, user: &str, content: &str) -> Vec<String> {
        self.say_in(GUILD, user, content).await
    }

    pub async fn say_in(&self, guild: &str, user: &str, content: &str) -> Vec<String> {
        self.send(Session::guild(user, guild, content)).await
    }

    pub async fn say_direct(&self, user: &str, content: &str) -> Vec<String> {
        self.send(Session::direct(user, content)).await
    }

    pub async fn notice(&self, user: &str, notice: &Notice) -> Vec<String> {
        self.sink.take();
        let session = Session::guild(user, GUILD, "");
        self.engine.handle_notice(session, notice, &self.sink).await.unwrap();
        self.sink.take()
    }

    async fn send(&self, session: Session) -> Vec<String> {
        self.sink.take();
        self.engine.handle_message(session, &self.sink).await.unwrap();
        self.sink.take()
    }

    /// Teach and assert the dialogue was added
    pub async fn teach(&self, user: &str, command: &str) -> u64 {
        let output = self.say(user, command).await;
        let line = output
            .iter()
            .find_map(|line| line.strip_prefix("Dialogue added, id="))
            .unwrap_or_else(|| panic!("{command:?} did not add a dialogue: {output:?}"));
        line.trim_end_matches('.').parse().unwrap()
    }
}

/// Config answering to the nickname `ditto`
pub fn with_nickname() -> Config {
    Config {
        nicknames: vec!["ditto".to_string()],
        ..Config::default()
    }
}
