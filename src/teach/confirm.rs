//! Pending hint confirmations
//!
//! When a hint suspends a teach command, the command is parked here until
//! the same user speaks again in the same channel. An empty reply, `.` or
//! `。` confirms it; anything else is handled as a normal message.

use super::TeachArgv;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

pub const CONFIRM_TIMEOUT: Duration = Duration::from_secs(300);

/// The correction a hint proposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Treat the given question as the new answer
    Answer,
    /// Run again with `-x`, taking the question literally as a pattern
    Regexp,
}

impl Confirmation {
    pub fn apply(self, argv: &mut TeachArgv) {
        match self {
            Confirmation::Answer => {
                let answer = argv.original.clone();
                argv.args = vec![String::new(), answer];
            }
            Confirmation::Regexp => {
                let pattern = argv.original.clone();
                argv.set_question(pattern);
                argv.appellative = false;
                argv.options.regexp = Some(true);
            }
        }
    }
}

/// Whether `content` confirms a pending hint
pub fn is_confirmation(content: &str) -> bool {
    matches!(content.trim(), "" | "." | "。")
}

#[derive(Debug)]
struct Pending {
    argv: TeachArgv,
    confirmation: Confirmation,
    created: Instant,
}

/// Parked commands keyed by (channel, user)
#[derive(Debug, Default)]
pub struct PendingConfirmations {
    pending: DashMap<(String, String), Pending>,
}

impl PendingConfirmations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `argv`, replacing an older pending command of the same user
    pub fn insert(&self, argv: &TeachArgv, confirmation: Confirmation) {
        let key = (argv.session.channel_id.clone(), argv.session.user_id.clone());
        tracing::debug!("Awaiting confirmation {:?} from {}", confirmation, key.1);
        self.pending.insert(
            key,
            Pending {
                argv: argv.clone(),
                confirmation,
                created: Instant::now(),
            },
        );
    }

    /// Remove and return the pending command, if it has not expired
    ///
    /// The entry is consumed whatever the reply, like a one-shot middleware.
    pub fn take(&self, channel_id: &str, user_id: &str) -> Option<(TeachArgv, Confirmation)> {
        let (_, pending) = self
            .pending
            .remove(&(channel_id.to_string(), user_id.to_string()))?;
        if pending.created.elapsed() >= CONFIRM_TIMEOUT {
            return None;
        }
        Some((pending.argv, pending.confirmation))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
