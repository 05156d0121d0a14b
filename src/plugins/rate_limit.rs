//! Throttling and loop prevention
//!
//! Both only apply to top-level messages; answers triggered through
//! redirections are exempt.

use super::DialoguePlugin;
use crate::channels::state::{ChannelState, SessionState};
use crate::config::LoopConfig;
use crate::core::session::Session;
use crate::engine::Engine;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub struct RateLimitPlugin;

/// Whether a reply to `user` now would continue a conversation loop.
/// Sets the loop timestamp when it does.
fn detect_loop(state: &mut ChannelState, rules: &[LoopConfig], user: &str, now: Instant) -> bool {
    for rule in rules {
        if state.initiators.len() < rule.length {
            break;
        }
        let mut recent: Vec<&str> = state.initiators[..rule.length]
            .iter()
            .map(String::as_str)
            .collect();
        recent.sort_unstable();
        recent.dedup();
        let debounced = match (rule.debounce_ms, state.loop_timestamp) {
            (Some(debounce), Some(last)) => {
                now.duration_since(last) < Duration::from_millis(debounce)
            }
            _ => false,
        };
        if recent.len() <= rule.participants && recent.contains(&user) && !debounced {
            state.loop_timestamp = Some(now);
            return true;
        }
    }
    false
}

#[async_trait]
impl DialoguePlugin for RateLimitPlugin {
    fn name(&self) -> &'static str {
        "rate-limit"
    }

    fn init_state(&self, engine: &Engine, state: &mut ChannelState) {
        state.counters = engine
            .config
            .rate_limit
            .throttle
            .iter()
            .map(|throttle| throttle.responses)
            .collect();
        state.initiators.clear();
    }

    async fn receive(&self, engine: &Engine, state: &mut SessionState, session: &Session) -> bool {
        if session.redirected > 0 {
            return false;
        }
        let rules = &engine.config.rate_limit.prevent_loop;
        let user = state.user_id.clone();
        state.with_channel(|channel| {
            if channel.counters.iter().any(|count| *count <= 0) {
                tracing::debug!("Channel {} is throttled", channel.channel_id);
                return true;
            }
            if detect_loop(channel, rules, &user, Instant::now()) {
                tracing::debug!("Loop detected in channel {}", channel.channel_id);
                return true;
            }
            false
        })
    }

    async fn before_send(&self, engine: &Engine, state: &mut SessionState, session: &mut Session) -> bool {
        if session.redirected > 0 {
            return false;
        }
        let rate_limit = &engine.config.rate_limit;
        let keep = rate_limit
            .prevent_loop
            .iter()
            .map(|rule| rule.length)
            .max()
            .unwrap_or(0);
        let user = state.user_id.clone();
        state.with_channel(|channel| {
            for counter in channel.counters.iter_mut() {
                *counter -= 1;
            }
            channel.initiators.insert(0, user);
            channel.initiators.truncate(keep);
            channel.loop_timestamp = None;
        });

        for (index, throttle) in rate_limit.throttle.iter().enumerate() {
            let channel = Arc::clone(&state.channel);
            let interval = Duration::from_millis(throttle.interval_ms);
            tokio::spawn(async move {
                tokio::time::sleep(interval).await;
                if let Some(counter) = channel.lock().unwrap().counters.get_mut(index) {
                    *counter += 1;
                }
            });
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(initiators: &[&str]) -> ChannelState {
        let mut state = ChannelState::new("100");
        state.initiators = initiators.iter().map(|s| s.to_string()).collect();
        state
    }

    fn rule(participants: usize, length: usize, debounce_ms: Option<u64>) -> LoopConfig {
        LoopConfig {
            participants,
            length,
            debounce_ms,
        }
    }

    #[test]
    fn test_short_history_is_not_a_loop() {
        let mut s = state(&["200", "300"]);
        assert!(!detect_loop(&mut s, &[rule(2, 5, None)], "200", Instant::now()));
    }

    #[test]
    fn test_two_party_loop() {
        let rules = [rule(2, 5, None)];
        let mut s = state(&["200", "300", "300", "200", "200"]);
        assert!(detect_loop(&mut s, &rules, "200", Instant::now()));
        assert!(s.loop_timestamp.is_some());
        assert!(!detect_loop(&mut s, &rules, "400", Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce() {
        let rules = [rule(1, 2, Some(1000))];
        let mut s = state(&["200", "200"]);
        assert!(detect_loop(&mut s, &rules, "200", Instant::now()));
        assert!(!detect_loop(&mut s, &rules, "200", Instant::now()));
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(detect_loop(&mut s, &rules, "200", Instant::now()));
    }
}
