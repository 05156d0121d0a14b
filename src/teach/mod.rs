//! Teach command pipeline
//!
//! ```text
//! parser    # "# q a -x" -> TeachArgv
//! update    # create / modify / remove / preview
//! review    # history listing and revert
//! search    # ##, ### and batch view
//! confirm   # pending hint confirmations
//! text      # user-facing messages
//! ```

pub mod confirm;
pub mod parser;
pub mod review;
pub mod search;
pub mod text;
pub mod update;

pub use confirm::{Confirmation, PendingConfirmations};
pub use parser::{parse_command, TeachCommand};

use crate::core::session::Session;
use crate::core::types::{Dialogue, DialogueId};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Range selected by `-l` / `-L`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastSpan {
    /// The most recent `n` entries
    Count(usize),
    /// Entries younger than the interval
    Interval(Duration),
}

/// `-w uid` or `-W`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterOption {
    User(String),
    Anonymous,
}

/// Options as typed by the operator
#[derive(Debug, Clone, Default)]
pub struct TeachOptions {
    /// Names of every option that appeared, in order
    pub given: Vec<String>,

    pub remove: bool,
    pub review: bool,
    pub revert: bool,
    pub include_last: Option<LastSpan>,
    pub exclude_last: Option<LastSpan>,

    pub search: bool,
    pub auto_merge: bool,
    pub page: Option<usize>,
    /// `Some(false)` with `-R`
    pub recursive: Option<bool>,
    pub pipe: Option<String>,

    pub ignore_hint: bool,
    pub regexp: Option<bool>,
    pub redirect: Option<String>,

    pub prob_s: Option<f64>,
    pub prob_a: Option<f64>,

    pub frozen: Option<bool>,
    pub writer: Option<WriterOption>,
    pub substitute: Option<bool>,

    pub disable: bool,
    pub disable_global: bool,
    pub enable: bool,
    pub enable_global: bool,
    pub guilds: Option<String>,
    pub global: bool,

    pub set_pred: Option<Vec<DialogueId>>,
    pub add_pred: Option<Vec<DialogueId>>,
    pub set_succ: Option<Vec<DialogueId>>,
    pub add_succ: Option<Vec<DialogueId>>,
    pub create_successor: Option<String>,
    /// Seconds
    pub successor_timeout: Option<u64>,
    pub context: Option<bool>,

    /// Minutes of the day
    pub start_time: Option<u32>,
    pub end_time: Option<u32>,
}

impl TeachOptions {
    pub fn has(&self, name: &str) -> bool {
        self.given.iter().any(|given| given == name)
    }

    pub fn is_empty(&self) -> bool {
        self.given.is_empty()
    }
}

/// Guild scope derived from the context options
#[derive(Debug, Clone, Default)]
pub struct ContextScope {
    pub reversed: bool,
    pub partial: bool,
    /// `None` leaves the guild list untouched
    pub guilds: Option<Vec<String>>,
}

/// Predecessor and successor edits derived from the flow options
#[derive(Debug, Clone, Default)]
pub struct FlowEdit {
    pub predecessors: Option<Vec<DialogueId>>,
    pub pred_overwrite: bool,
    pub successors: Option<Vec<DialogueId>>,
    pub succ_overwrite: bool,
}

/// One invocation of the teach command as it moves through the pipeline
#[derive(Debug, Clone)]
pub struct TeachArgv {
    pub session: Session,
    pub options: TeachOptions,
    /// Positional arguments; after validation `[question, answer]` or empty
    pub args: Vec<String>,
    pub target: Option<Vec<DialogueId>>,

    /// Unescaped question, set during validation
    pub original: String,
    pub appellative: bool,
    pub create: bool,
    pub modify: bool,

    pub context: ContextScope,
    pub flow: FlowEdit,
    /// Resolved `-w` / `-W`: `Some("")` is anonymous
    pub writer: Option<String>,
    pub name_map: HashMap<String, String>,
    pub auth_map: HashMap<String, u32>,

    pub dialogues: Vec<Dialogue>,
    pub dialogue_map: HashMap<DialogueId, Dialogue>,
    pub updated: Vec<DialogueId>,
    pub skipped: Vec<DialogueId>,
    pub unknown: Vec<DialogueId>,
    pub forbidden: Vec<DialogueId>,

    /// Questions already expanded while following redirections
    pub visited_questions: HashSet<String>,
    /// Dialogues already listed while following successors
    pub visited_ids: HashSet<DialogueId>,
}

impl TeachArgv {
    pub fn new(session: Session, options: TeachOptions, args: Vec<String>) -> Self {
        Self {
            session,
            options,
            args,
            target: None,
            original: String::new(),
            appellative: false,
            create: false,
            modify: false,
            context: ContextScope::default(),
            flow: FlowEdit::default(),
            writer: None,
            name_map: HashMap::new(),
            auth_map: HashMap::new(),
            dialogues: Vec::new(),
            dialogue_map: HashMap::new(),
            updated: Vec::new(),
            skipped: Vec::new(),
            unknown: Vec::new(),
            forbidden: Vec::new(),
            visited_questions: HashSet::new(),
            visited_ids: HashSet::new(),
        }
    }

    pub fn question(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or_default()
    }

    pub fn answer(&self) -> &str {
        self.args.get(1).map(String::as_str).unwrap_or_default()
    }

    pub fn set_question(&mut self, question: impl Into<String>) {
        self.ensure_args();
        self.args[0] = question.into();
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) {
        self.ensure_args();
        self.args[1] = answer.into();
    }

    fn ensure_args(&mut self) {
        if self.args.len() < 2 {
            self.args.resize(2, String::new());
        }
    }

    /// Name of the mutation for permission and error messages
    pub fn operation(&self) -> &'static str {
        if self.options.revert {
            "revert"
        } else if self.options.remove {
            "remove"
        } else if self.create && self.target.is_none() {
            "create"
        } else {
            "modify"
        }
    }

    /// Id of the operator, used as writer and history operator
    pub fn operator(&self) -> &str {
        &self.session.user.id
    }

    pub fn authority(&self) -> u32 {
        self.session.user.authority
    }
}

/// Render ids as `1, 2, 3`
pub fn join_ids(ids: &[DialogueId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Human-readable age such as `45s` or `3m`
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}
