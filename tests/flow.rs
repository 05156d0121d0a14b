//! Predecessor chains and successor windows

mod common;

use common::{Harness, ADMIN, ALICE, BOB};
use std::time::Duration;

async fn chained() -> Harness {
    let h = Harness::new();
    h.teach(ALICE, "# hi hello").await;
    h.teach(ALICE, r#"# "how are you" fine < 1"#).await;
    h
}

#[tokio::test(start_paused = true)]
async fn test_successor_needs_predecessor() {
    let h = chained().await;
    assert!(h.say(BOB, "how are you").await.is_empty());
    assert_eq!(h.say(BOB, "hi").await, vec!["hello"]);
    assert_eq!(h.say(BOB, "how are you").await, vec!["fine"]);
}

#[tokio::test(start_paused = true)]
async fn test_window_is_per_user() {
    let h = chained().await;
    h.say(BOB, "hi").await;
    assert!(h.say(ADMIN, "how are you").await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_context_window_is_shared() {
    let h = chained().await;
    assert_eq!(h.say(ALICE, "#1 -c").await, vec!["Dialogue 1 modified."]);
    h.say(BOB, "hi").await;
    assert_eq!(h.say(ADMIN, "how are you").await, vec!["fine"]);
}

#[tokio::test(start_paused = true)]
async fn test_window_expires() {
    let h = chained().await;
    h.say(BOB, "hi").await;
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert!(h.say(BOB, "how are you").await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_custom_window() {
    let h = chained().await;
    assert_eq!(h.say(ALICE, "#1 -z 60").await, vec!["Dialogue 1 modified."]);
    h.say(BOB, "hi").await;
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(h.say(BOB, "how are you").await, vec!["fine"]);
}

#[tokio::test(start_paused = true)]
async fn test_successor_outranks_plain_answer() {
    let h = chained().await;
    h.teach(ALICE, r#"# "how are you" "who knows""#).await;
    assert_eq!(h.say(BOB, "how are you").await, vec!["who knows"]);
    h.say(BOB, "hi").await;
    assert_eq!(h.say(BOB, "how are you").await, vec!["fine"]);
}

#[tokio::test(start_paused = true)]
async fn test_create_successor() {
    let h = Harness::new();
    h.teach(ALICE, "# hi hello").await;
    let output = h.say(ALICE, "#1 ># bye cya").await;
    assert!(output.contains(&"Dialogue added, id=2.".to_string()));

    assert!(h.say(BOB, "bye").await.is_empty());
    h.say(BOB, "hi").await;
    assert_eq!(h.say(BOB, "bye").await, vec!["cya"]);
}

#[tokio::test(start_paused = true)]
async fn test_link_successors() {
    let h = Harness::new();
    h.teach(ALICE, "# hi hello").await;
    h.teach(ALICE, "# bye cya").await;
    assert_eq!(
        h.say(ALICE, "#1 > 2").await,
        vec!["Dialogue 2 modified.\nDialogue 1 unchanged."]
    );
    assert!(h.say(BOB, "bye").await.is_empty());
    h.say(BOB, "hi").await;
    assert_eq!(h.say(BOB, "bye").await, vec!["cya"]);

    let detail = h.say(ALICE, "#2").await;
    assert!(detail[0].contains("Predecessors:"));
}

#[tokio::test(start_paused = true)]
async fn test_conflicting_flow_options() {
    let h = chained().await;
    assert_eq!(
        h.say(ALICE, "#2 < 1 << 1").await,
        vec!["Options <, << cannot be used together."]
    );
}
