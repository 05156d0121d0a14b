//! Per-channel ephemeral state
//!
//! A [`ChannelState`] is created lazily the first time a channel is seen and
//! lives as long as the engine. Each trigger works on a [`SessionState`],
//! which pairs the shared channel state with the trigger-local fields.

use crate::core::stamp::Stamp;
use crate::core::types::{Dialogue, DialogueId, DialogueTest};
use dashmap::DashMap;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Which part of a [`ScopedMap`] an entry belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Visible to every user of the channel
    Channel,
    User(String),
}

impl Scope {
    pub fn user(id: impl Into<String>) -> Self {
        Scope::User(id.into())
    }
}

/// Channel-wide entries plus one map per user
///
/// Lookups for a user consult the user's own map first and fall back to the
/// channel-wide map.
#[derive(Debug, Clone)]
pub struct ScopedMap<K, V> {
    channel: HashMap<K, V>,
    users: HashMap<String, HashMap<K, V>>,
}

impl<K, V> Default for ScopedMap<K, V> {
    fn default() -> Self {
        Self {
            channel: HashMap::new(),
            users: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> ScopedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(&self, scope: &Scope) -> Option<&HashMap<K, V>> {
        match scope {
            Scope::Channel => Some(&self.channel),
            Scope::User(id) => self.users.get(id),
        }
    }

    pub fn scope_mut(&mut self, scope: &Scope) -> &mut HashMap<K, V> {
        match scope {
            Scope::Channel => &mut self.channel,
            Scope::User(id) => self.users.entry(id.clone()).or_default(),
        }
    }

    pub fn insert(&mut self, scope: &Scope, key: K, value: V) -> Option<V> {
        self.scope_mut(scope).insert(key, value)
    }

    pub fn remove(&mut self, scope: &Scope, key: &K) -> Option<V> {
        match scope {
            Scope::Channel => self.channel.remove(key),
            Scope::User(id) => self.users.get_mut(id).and_then(|map| map.remove(key)),
        }
    }

    /// The user's entry, or the channel-wide one
    pub fn lookup(&self, user_id: &str, key: &K) -> Option<&V> {
        self.users
            .get(user_id)
            .and_then(|map| map.get(key))
            .or_else(|| self.channel.get(key))
    }

    /// Keys visible to the user: channel-wide ones and the user's own
    pub fn visible_keys(&self, user_id: &str) -> Vec<K> {
        let mut keys: Vec<K> = self.channel.keys().cloned().collect();
        if let Some(own) = self.users.get(user_id) {
            for key in own.keys() {
                if !self.channel.contains_key(key) {
                    keys.push(key.clone());
                }
            }
        }
        keys
    }
}

/// Shared state of one channel
#[derive(Debug)]
pub struct ChannelState {
    pub channel_id: String,
    /// Users who recently addressed the bot by a bare nickname
    pub activated: HashMap<String, Stamp>,
    /// Recently fired dialogues, used to unlock their successors
    pub predecessors: ScopedMap<DialogueId, Stamp>,
    /// Remaining responses per throttle window, indexed like the config
    pub counters: Vec<i64>,
    /// Senders of recent replies, newest first
    pub initiators: Vec<String>,
    pub loop_timestamp: Option<Instant>,
}

impl ChannelState {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            activated: HashMap::new(),
            predecessors: ScopedMap::new(),
            counters: Vec::new(),
            initiators: Vec::new(),
            loop_timestamp: None,
        }
    }
}

pub type SharedChannelState = Arc<Mutex<ChannelState>>;

/// Lazily created channel states
#[derive(Debug, Default)]
pub struct StateManager {
    channels: DashMap<String, SharedChannelState>,
}

impl StateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The channel's state, running `init` once when it is first created
    pub fn get_or_create(
        &self,
        channel_id: &str,
        init: impl FnOnce(&mut ChannelState),
    ) -> SharedChannelState {
        if let Some(existing) = self.channels.get(channel_id) {
            return Arc::clone(existing.value());
        }
        let entry = self.channels.entry(channel_id.to_string()).or_insert_with(|| {
            let mut state = ChannelState::new(channel_id);
            init(&mut state);
            tracing::debug!("Created state for channel {}", channel_id);
            Arc::new(Mutex::new(state))
        });
        Arc::clone(entry.value())
    }

    pub fn get(&self, channel_id: &str) -> Option<SharedChannelState> {
        self.channels.get(channel_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// View of the channel state for one trigger
#[derive(Debug)]
pub struct SessionState {
    pub channel: SharedChannelState,
    pub user_id: String,
    pub test: DialogueTest,
    pub dialogues: Vec<Dialogue>,
    pub dialogue: Option<Dialogue>,
    pub answer: Option<String>,
    /// Set when weights are computed for a search listing
    pub is_search: bool,
}

impl SessionState {
    pub fn new(channel: SharedChannelState, user_id: impl Into<String>) -> Self {
        Self {
            channel,
            user_id: user_id.into(),
            test: DialogueTest::default(),
            dialogues: Vec::new(),
            dialogue: None,
            answer: None,
            is_search: false,
        }
    }

    /// Run `f` with the channel state locked
    pub fn with_channel<R>(&self, f: impl FnOnce(&mut ChannelState) -> R) -> R {
        let mut channel = self.channel.lock().unwrap();
        f(&mut channel)
    }

    pub fn is_activated(&self) -> bool {
        self.with_channel(|channel| channel.activated.contains_key(&self.user_id))
    }
}

/// Delete `key` from the map selected by `pick` after `timeout`, unless it
/// was written again in the meantime
pub fn expire_later<K, F>(channel: &SharedChannelState, timeout: Duration, stamp: Stamp, key: K, pick: F)
where
    K: Send + 'static,
    F: Fn(&mut ChannelState, &K, Stamp) + Send + 'static,
{
    let channel = Arc::clone(channel);
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        let mut state = channel.lock().unwrap();
        pick(&mut state, &key, stamp);
    });
}
