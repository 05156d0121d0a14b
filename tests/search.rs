//! `##` searches, pipes and the batch view

mod common;

use common::{Harness, ADMIN, ALICE, BOB};

async fn seeded() -> Harness {
    let h = Harness::new();
    h.teach(ALICE, "# hi hello -p 0.5").await;
    h.teach(ALICE, "# hi world -p 0.25").await;
    h.teach(ALICE, "# bye hello").await;
    h
}

#[tokio::test]
async fn test_search_answers_to_question() {
    let h = seeded().await;
    let output = h.say(ALICE, "## hi").await;
    let lines: Vec<&str> = output[0].lines().collect();
    assert_eq!(lines[0], "Found answers to question \"hi\":");
    assert!(lines[1].starts_with("1. ") && lines[1].ends_with("hello"));
    assert!(lines[2].starts_with("2. ") && lines[2].ends_with("world"));
    assert_eq!(lines[3], "Total trigger probability: 0.750");
}

#[tokio::test]
async fn test_search_questions_with_answer() {
    let h = seeded().await;
    let output = h.say(ALICE, "## ~ hello").await;
    let lines: Vec<&str> = output[0].lines().collect();
    assert_eq!(lines[0], "Found questions with answer \"hello\":");
    assert!(lines[1].ends_with("hi"));
    assert!(lines[2].ends_with("bye"));
}

#[tokio::test]
async fn test_search_exact_pair() {
    let h = seeded().await;
    assert_eq!(
        h.say(ALICE, "## hi world").await,
        vec!["Found dialogues with question \"hi\" and answer \"world\":\n2"]
    );
}

#[tokio::test]
async fn test_search_nothing() {
    let h = seeded().await;
    assert_eq!(
        h.say(ALICE, "## nope").await,
        vec!["No answers to question \"nope\" found. Try a regular expression search with -x."]
    );
}

#[tokio::test]
async fn test_search_is_scoped_to_the_guild() {
    let h = seeded().await;
    let output = h.say_in(common::OTHER_GUILD, ALICE, "## hi").await;
    assert!(output[0].starts_with("No answers to question \"hi\" found."));
}

#[tokio::test]
async fn test_regexp_search() {
    let h = seeded().await;
    let output = h.say(ADMIN, "## ~ ^h -x").await;
    let lines: Vec<&str> = output[0].lines().collect();
    assert_eq!(lines[0], "Found dialogues with answers matching \"^h\":");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("Question: hi, Answer: hello"));
    assert!(lines[2].contains("Question: bye, Answer: hello"));
}

#[tokio::test]
async fn test_merged_search() {
    let h = seeded().await;
    let output = h.say(ADMIN, "### ~ hello").await;
    assert_eq!(
        output,
        vec!["Found dialogues with answers matching \"hello\":\nhello (#1, #3)"]
    );
}

#[tokio::test]
async fn test_search_redirections() {
    let h = seeded().await;
    h.teach(ALICE, "# hey => hi").await;
    let output = h.say(ALICE, "## hey").await;
    let text = &output[0];
    assert!(text.contains("4. "));
    assert!(text.lines().any(|line| line.starts_with("= 1. ") && line.ends_with("hello")));
    assert!(text.lines().any(|line| line.starts_with("= 2. ") && line.ends_with("world")));

    let flat = h.say(ALICE, "## hey -R").await;
    assert!(!flat[0].contains("= 1."));
}

#[tokio::test]
async fn test_pipe_modifies_results() {
    let h = seeded().await;
    assert_eq!(h.say(ALICE, "## hi | -p 1").await, vec!["Dialogue 1, 2 modified."]);
    assert_eq!(h.say(ALICE, "## nope | -p 1").await, vec!["No dialogues found."]);
    let output = h.say(ALICE, "## hi").await;
    assert!(output[0].ends_with("Total trigger probability: 1.000"));
}

#[tokio::test]
async fn test_pagination() {
    let mut config = ditto_cli::Config::default();
    config.display.items_per_page = 2;
    let h = Harness::with_config(config);
    for answer in ["a", "b", "c"] {
        h.teach(ALICE, &format!("# hi {answer}")).await;
    }

    let first = h.say(ALICE, "## hi").await;
    assert!(first[0].starts_with("Found answers to question \"hi\" (page 1/2):"));
    assert!(first[0].contains("Use / <page> to view other pages."));

    let second = h.say(ALICE, "## hi / 2").await;
    let lines: Vec<&str> = second[0].lines().collect();
    assert_eq!(lines[0], "Found answers to question \"hi\" (page 2/2):");
    assert!(lines[1].ends_with("c"));
}

#[tokio::test]
async fn test_batch_view() {
    let h = seeded().await;
    let output = h.say(ALICE, "##1,3,9").await;
    let lines: Vec<&str> = output[0].lines().collect();
    assert!(lines[0].starts_with("1. ") && lines[0].contains("Answer: hello"));
    assert!(lines[1].starts_with("3. ") && lines[1].contains("Question: bye"));
    assert_eq!(lines[2], "Dialogue 9 not found.");
}

#[tokio::test]
async fn test_search_needs_teach_authority() {
    let h = seeded().await;
    assert_eq!(
        h.say(BOB, "## hi").await,
        vec![ditto_cli::teach::text::LOW_AUTHORITY]
    );
}
