//! Writers and the substitute flag

mod common;

use common::{Harness, ADMIN, ALICE, BOB, GUILD, MALLORY};
use ditto_cli::teach::text;

#[tokio::test]
async fn test_writer_names_in_detail() {
    let h = Harness::new();
    h.teach(ALICE, "# hi hello").await;
    h.identity.set_member_name(GUILD, ALICE, "Alice");

    let own = h.say(ALICE, "#1").await;
    assert!(own[0].contains(&format!("Writer: {ALICE} ({ALICE})")));

    let other = h.say(ADMIN, "#1").await;
    assert!(other[0].contains("Writer: Alice"));
}

#[tokio::test]
async fn test_anonymous_dialogue() {
    let h = Harness::new();
    h.teach(ALICE, "# hi hello").await;
    assert_eq!(h.say(ALICE, "#1 -W").await, vec!["Dialogue 1 modified."]);
    assert!(!h.say(ADMIN, "#1").await[0].contains("Writer:"));
    assert_eq!(
        h.say(ALICE, "#1 ~ bye").await,
        vec!["You do not have permission to modify dialogue 1."]
    );
}

#[tokio::test]
async fn test_set_writer() {
    let h = Harness::new();
    assert_eq!(h.say(ALICE, "# hi hello -w 999").await, vec![text::WRITER_NOT_FOUND]);
    // writers of equal or higher authority are refused
    assert_eq!(h.say(ALICE, &format!("# hi hello -w {MALLORY}")).await, vec![text::LOW_PERMISSION]);

    let id = h.teach(ALICE, &format!("# hi hello -w {BOB}")).await;
    h.identity.set_member_name(GUILD, BOB, "Bob");
    let detail = h.say(ADMIN, &format!("#{id}")).await;
    assert!(detail[0].contains("Writer: Bob"));
    assert_eq!(
        h.say(ALICE, &format!("#{id} ~ bye")).await,
        vec![format!("You do not have permission to modify dialogue {id}.")]
    );
}

#[tokio::test]
async fn test_substitute_flag() {
    let h = Harness::new();
    assert_eq!(h.say(ALICE, "# hi hello -s").await, vec![text::LOW_PERMISSION]);

    h.teach(ADMIN, "# hi hello -s").await;
    let detail = h.say(ADMIN, "#1").await;
    assert!(detail[0].contains(text::writer::SUBSTITUTE));
    assert_eq!(h.say(BOB, "hi").await, vec!["hello"]);
}
