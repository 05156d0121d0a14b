//! Core traits for the domain layer
//!
//! These traits define the collaborators the dialogue engine depends on,
//! allowing infrastructure to be injected and tests to use mocks.

use crate::core::session::Session;
use crate::core::types::UserProfile;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Timelike;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Destination for outbound messages
///
/// `send` and `send_queued` are identical for a real channel. Buffering
/// sinks treat `send` as "append" and `send_queued` as "flush with this".
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn send(&self, message: String) -> Result<()>;

    async fn send_queued(&self, message: String) -> Result<()>;
}

/// User lookup and permission source
#[async_trait]
pub trait Identity: Send + Sync {
    /// Resolve a platform user reference to a profile
    async fn resolve(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Fetch profiles by internal id, unknown ids are skipped
    async fn get_users(&self, ids: &[String]) -> Result<Vec<UserProfile>>;

    /// Display names of a guild's members keyed by user id
    async fn member_names(&self, guild_id: &str) -> Result<HashMap<String, String>>;
}

/// Uploads attachments embedded in an answer and rewrites them to durable URLs
#[async_trait]
pub trait AssetTransformer: Send + Sync {
    async fn transform(&self, answer: &str) -> Result<String>;
}

/// Executes commands interpolated into answers
///
/// The built-in `dialogue` command never reaches the executor.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Returns `Ok(false)` when the command is not known
    async fn execute(&self, line: &str, session: &Session, sink: &dyn OutputSink) -> Result<bool>;
}

/// Random source for the weighted draw
pub trait Sampler: Send + Sync {
    /// Uniform real in `[0, upper)`
    fn real(&self, upper: f64) -> f64;
}

/// Thread-local RNG backed sampler
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSampler;

impl Sampler for ThreadRngSampler {
    fn real(&self, upper: f64) -> f64 {
        if upper <= 0.0 {
            return 0.0;
        }
        rand::thread_rng().gen_range(0.0..upper)
    }
}

/// Sampler returning a fixed fraction of the upper bound
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler(pub f64);

impl Sampler for FixedSampler {
    fn real(&self, upper: f64) -> f64 {
        upper * self.0.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

/// Wall clock used for time-of-day windows
pub trait Clock: Send + Sync {
    /// Minutes since local midnight
    fn minutes_of_day(&self) -> u32;
}

/// The system's local time
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn minutes_of_day(&self) -> u32 {
        let now = chrono::Local::now();
        now.hour() * 60 + now.minute()
    }
}

/// Clock that can be set by hand
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU32);

impl ManualClock {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self(AtomicU32::new(hour * 60 + minute))
    }

    pub fn set(&self, hour: u32, minute: u32) {
        self.0.store(hour * 60 + minute, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn minutes_of_day(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Executor that knows no commands
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCommands;

#[async_trait]
impl CommandExecutor for NoCommands {
    async fn execute(&self, _line: &str, _session: &Session, _sink: &dyn OutputSink) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_rng_sampler_in_range() {
        let sampler = ThreadRngSampler;
        for _ in 0..100 {
            let value = sampler.real(1.5);
            assert!((0.0..1.5).contains(&value));
        }
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(8, 30);
        assert_eq!(clock.minutes_of_day(), 510);
        clock.set(20, 0);
        assert_eq!(clock.minutes_of_day(), 1200);
        assert!(LocalClock.minutes_of_day() < 24 * 60);
    }

    #[test]
    fn test_fixed_sampler_never_reaches_upper() {
        assert!(FixedSampler(1.0).real(2.0) < 2.0);
        assert_eq!(FixedSampler(0.0).real(2.0), 0.0);
        assert_eq!(FixedSampler(0.5).real(2.0), 1.0);
    }
}
