//! Throttling and loop prevention

mod common;

use common::{Harness, ADMIN, ALICE, BOB, MALLORY};
use ditto_cli::config::{LoopConfig, ThrottleConfig};
use ditto_cli::Config;
use std::time::Duration;

fn throttled(responses: i64, interval_ms: u64) -> Config {
    let mut config = Config::default();
    config.rate_limit.throttle = vec![ThrottleConfig {
        interval_ms,
        responses,
    }];
    config
}

#[tokio::test(start_paused = true)]
async fn test_throttle() {
    let h = Harness::with_config(throttled(2, 10_000));
    h.teach(ALICE, "# hi hello").await;
    assert_eq!(h.say(BOB, "hi").await, vec!["hello"]);
    assert_eq!(h.say(BOB, "hi").await, vec!["hello"]);
    assert!(h.say(BOB, "hi").await.is_empty());

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(h.say(BOB, "hi").await, vec!["hello"]);
}

#[tokio::test(start_paused = true)]
async fn test_throttle_is_per_channel() {
    let h = Harness::with_config(throttled(1, 10_000));
    h.teach(ADMIN, "# hi hello -E").await;
    assert_eq!(h.say(BOB, "hi").await, vec!["hello"]);
    assert!(h.say(BOB, "hi").await.is_empty());
    assert_eq!(h.say_in(common::OTHER_GUILD, BOB, "hi").await, vec!["hello"]);
}

#[tokio::test(start_paused = true)]
async fn test_redirections_are_not_throttled() {
    let h = Harness::with_config(throttled(1, 10_000));
    h.teach(ALICE, "# hi hello").await;
    h.teach(ALICE, r#"# hey "well, $(dialogue hi)""#).await;
    assert_eq!(h.say(BOB, "hey").await, vec!["well, hello"]);
}

#[tokio::test]
async fn test_loop_prevention() {
    let mut config = Config::default();
    config.rate_limit.prevent_loop = vec![LoopConfig {
        participants: 1,
        length: 2,
        debounce_ms: None,
    }];
    let h = Harness::with_config(config);
    h.teach(ALICE, "# hi hello").await;

    assert_eq!(h.say(BOB, "hi").await, vec!["hello"]);
    assert_eq!(h.say(BOB, "hi").await, vec!["hello"]);
    assert!(h.say(BOB, "hi").await.is_empty());
    assert_eq!(h.say(MALLORY, "hi").await, vec!["hello"]);
}

#[test]
fn test_zero_interval_is_rejected() {
    assert!(ditto_cli::Engine::builder(throttled(1, 0)).build().is_err());
}
