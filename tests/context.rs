//! Guild scoping and active hours

mod common;

use common::{Harness, ADMIN, ALICE, BOB, OTHER_GUILD};

#[tokio::test]
async fn test_dialogue_stays_in_its_guild() {
    let h = Harness::new();
    h.teach(ALICE, "# hi hello").await;
    assert_eq!(h.say(BOB, "hi").await, vec!["hello"]);
    assert!(h.say_in(OTHER_GUILD, BOB, "hi").await.is_empty());
}

#[tokio::test]
async fn test_enable_everywhere() {
    let h = Harness::new();
    h.teach(ALICE, "# hi hello").await;
    assert_eq!(
        h.say(ALICE, "#1 -E").await,
        vec!["Insufficient authority to use option -E."]
    );
    assert_eq!(h.say(ADMIN, "#1 -E").await, vec!["Dialogue 1 modified."]);
    assert_eq!(h.say_in(OTHER_GUILD, BOB, "hi").await, vec!["hello"]);

    assert_eq!(h.say(ADMIN, "#1 -d").await, vec!["Dialogue 1 modified."]);
    assert!(h.say(BOB, "hi").await.is_empty());
    assert_eq!(h.say_in(OTHER_GUILD, BOB, "hi").await, vec!["hello"]);
}

#[tokio::test]
async fn test_enable_in_another_guild() {
    let h = Harness::new();
    h.teach(ALICE, "# hi hello").await;
    assert_eq!(h.say_in(OTHER_GUILD, ALICE, "#1 -e").await, vec!["Dialogue 1 modified."]);
    assert_eq!(h.say_in(OTHER_GUILD, BOB, "hi").await, vec!["hello"]);

    let detail = h.say(ALICE, "#1").await;
    assert!(detail[0].contains("Context: Disabled in all guilds, enabled in the current guild and 1 more."));
}

#[tokio::test]
async fn test_explicit_guild_list() {
    let h = Harness::new();
    h.teach(ADMIN, "# hi hello -E -g 20000").await;
    assert!(h.say(BOB, "hi").await.is_empty());
    assert_eq!(h.say_in(OTHER_GUILD, BOB, "hi").await, vec!["hello"]);
}

#[tokio::test]
async fn test_conflicting_context_options() {
    let h = Harness::new();
    h.teach(ALICE, "# hi hello").await;
    assert_eq!(
        h.say(ALICE, "#1 -d -e").await,
        vec!["Options -d, -e cannot be used together."]
    );
    assert_eq!(
        h.say(ADMIN, "#1 -g 20000").await,
        vec!["Invalid value for option -g: requires one of -d, -D, -e or -E"]
    );
}

#[tokio::test]
async fn test_active_hours() {
    let h = Harness::new();
    h.teach(ALICE, "# hi hello -t 8 -T 10:30").await;
    assert!(h.say(BOB, "hi").await.is_empty());
    h.clock.set(9, 0);
    assert_eq!(h.say(BOB, "hi").await, vec!["hello"]);
    h.clock.set(10, 30);
    assert!(h.say(BOB, "hi").await.is_empty());

    let detail = h.say(ALICE, "#1").await;
    assert!(detail[0].contains("Active hours: 8:00-10:30"));
}

#[tokio::test]
async fn test_active_hours_wrap_midnight() {
    let h = Harness::new();
    h.teach(ALICE, "# hi hello -t 22 -T 2").await;
    assert!(h.say(BOB, "hi").await.is_empty());
    h.clock.set(23, 15);
    assert_eq!(h.say(BOB, "hi").await, vec!["hello"]);
    h.clock.set(1, 0);
    assert_eq!(h.say(BOB, "hi").await, vec!["hello"]);
}

#[tokio::test]
async fn test_invalid_time() {
    let h = Harness::new();
    assert_eq!(
        h.say(ALICE, "# hi hello -t 25").await,
        vec!["Invalid value for option -t: expected a time such as 8 or 8:30"]
    );
}
