//! User-facing messages of the teach command

use crate::core::types::ModifyType;

pub const LOW_AUTHORITY: &str = "You do not have permission to use the teach command.";
pub const LOW_PERMISSION: &str = "You do not have permission to add this dialogue.";
pub const NO_HISTORY: &str = "No recent changes found.";
pub const RECENT_HISTORY: &str = "Recent changes:";
pub const UPLOAD_FAILED: &str = "Failed to upload assets.";
pub const PROBABLY_MODIFY_ANSWER: &str = "It looks like you want to modify the answer rather than the question. Send a period to modify the answer, or use -I to ignore this hint.";
pub const REDIRECTIONS: &str = "Redirections:";
pub const WRITER_NOT_FOUND: &str = "The specified writer does not exist.";
pub const MODIFIER_EXPECTED: &str = "requires one of -d, -D, -e or -E";
pub const PRIVATE_CONTEXT: &str = "use -E or -D to set the context in a direct message";
pub const SUCCESSOR_NOT_FOUND: &str = "No dialogue to attach the successor to.";
pub const SEARCH_EMPTY: &str = "No dialogues found.";
pub const REGEXP_HINT: &str = " Try a regular expression search with -x.";
pub const PAGE_FOOTER: &str = "Use / <page> to view other pages.";

pub fn create_success(id: u64) -> String {
    format!("Dialogue added, id={id}.")
}

pub fn create_modified(ids: &str) -> String {
    format!("Modified existing dialogue, id={ids}.")
}

pub fn create_unchanged(ids: &str, command: &str) -> String {
    format!("Dialogue already exists, id={ids}. Use {command} to modify it.")
}

pub fn modify_success(ids: &str) -> String {
    format!("Dialogue {ids} modified.")
}

pub fn unchanged(ids: &str) -> String {
    format!("Dialogue {ids} unchanged.")
}

pub fn remove_success(ids: &str) -> String {
    format!("Dialogue {ids} removed.")
}

pub fn revert_success(ids: &str) -> String {
    format!("Dialogue {ids} reverted.")
}

pub fn modify_unknown(ids: &str) -> String {
    format!("Dialogue {ids} not found.")
}

pub fn revert_unknown(ids: &str) -> String {
    format!("No recent change of dialogue {ids} found.")
}

pub fn max_previews(limit: usize) -> String {
    format!("At most {limit} dialogues can be previewed at once.")
}

pub fn detail_header(id: u64, history: bool) -> String {
    if history {
        format!("History of dialogue {id}:")
    } else {
        format!("Details of dialogue {id}:")
    }
}

pub fn detail(entity: &str, value: &str) -> String {
    format!("{entity}: {value}")
}

pub fn probably_regexp(operation: &str) -> String {
    format!(
        "The question looks like a regular expression. Send a period to {operation} the dialogue with -x, or use -I to ignore this hint."
    )
}

pub fn operation(kind: ModifyType) -> &'static str {
    match kind {
        ModifyType::Create => "create",
        ModifyType::Modify => "modify",
        ModifyType::Remove => "remove",
    }
}

pub fn review(kind: ModifyType, age: &str) -> String {
    format!("Last change: {} {} ago", operation(kind), age)
}

pub fn stats(questions: usize, dialogues: usize) -> String {
    format!("{questions} questions and {dialogues} answers in total.")
}

pub fn probability_detail(prob_s: f64, prob_a: f64) -> String {
    format!("Trigger weight: p={prob_s}, P={prob_a}")
}

pub fn probability_epilog(total: f64) -> String {
    format!("Total trigger probability: {:.3}", total.min(1.0))
}

pub fn page_hint(page: usize, count: usize) -> String {
    format!(" (page {page}/{count})")
}

pub fn merged_count(count: usize, entity: &str) -> String {
    format!("{count} {entity}s")
}

/// Search result headers; `subject` reads like `answers to question "foo"`
pub mod search {
    pub fn empty(subject: &str, hint: &str) -> String {
        format!("No {subject} found.{hint}")
    }

    pub fn result(subject: &str, page: &str) -> String {
        format!("Found {subject}{page}:")
    }
}

pub mod entity {
    pub const QUESTION: &str = "Question";
    pub const REGEXP: &str = "Regexp";
    pub const ANSWER: &str = "Answer";
}

pub mod writer {
    pub const FROZEN: &str = "This dialogue is frozen.";
    pub const UNKNOWN: &str = "unknown user";
    pub const SUBSTITUTE: &str = "The answer is executed as its writer.";
    pub const ABSTRACT_FROZEN: &str = "frozen";
    pub const ABSTRACT_SUBSTITUTE: &str = "substitute";

    pub fn detail(name: &str) -> String {
        format!("Writer: {name}")
    }
}

pub mod context {
    /// `complement` tells whether the guild list is a deny list
    pub fn detail(complement: bool, includes_current: bool, count: usize) -> String {
        let (state, other) = if complement {
            ("Enabled", "disabled")
        } else {
            ("Disabled", "enabled")
        };
        let scope = match (includes_current, count) {
            (true, 1) => format!(", {other} in the current guild only"),
            (true, n) => format!(", {other} in the current guild and {} more", n - 1),
            (false, 0) => String::new(),
            (false, n) => format!(", {other} in {n} guilds"),
        };
        format!("Context: {state} in all guilds{scope}.")
    }
}

pub mod flow {
    pub const CONTEXT_MODE: &str = "Successors can be triggered by anyone in the channel.";
    pub const PREDECESSORS: &str = "Predecessors:";
    pub const SUCCESSORS: &str = "Successors:";
    pub const ABSTRACT_HAS_PRED: &str = "has-pred";
    pub const ABSTRACT_CONTEXT: &str = "context";

    pub fn timeout(millis: u64) -> String {
        format!("Successor window: {}s", millis as f64 / 1000.0)
    }
}

pub fn active_hours(window: &str) -> String {
    format!("Active hours: {window}")
}
