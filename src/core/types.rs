//! Dialogue records, flags and match criteria
//!
//! A [`Dialogue`] is the persisted unit. Everything that only lives for the
//! duration of one operation (weights, captures, history marks, resolved
//! relations) sits in [`Annotations`] and never reaches the store.

use crate::core::stamp::Stamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned dialogue identifier
pub type DialogueId = u64;

/// The fixed set of boolean traits a dialogue can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Only users with the frozen authority may edit
    Frozen,
    /// The question is a regular expression
    Regexp,
    /// Successors can be triggered by anyone in the channel
    Context,
    /// The answer is executed as its writer
    Substitute,
    /// The guild list is a deny list
    Complement,
}

impl Flag {
    pub const ALL: [Flag; 5] = [
        Flag::Frozen,
        Flag::Regexp,
        Flag::Context,
        Flag::Substitute,
        Flag::Complement,
    ];

    pub const fn bit(self) -> u32 {
        match self {
            Flag::Frozen => 1,
            Flag::Regexp => 2,
            Flag::Context => 4,
            Flag::Substitute => 8,
            Flag::Complement => 16,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Flag::Frozen => "frozen",
            Flag::Regexp => "regexp",
            Flag::Context => "context",
            Flag::Substitute => "substitute",
            Flag::Complement => "complement",
        }
    }
}

/// Bitset over [`Flag`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogueFlags(u32);

impl DialogueFlags {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Unknown bits are dropped
    pub fn from_bits(bits: u32) -> Self {
        let known = Flag::ALL.iter().fold(0, |acc, flag| acc | flag.bit());
        Self(bits & known)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, flag: Flag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn set(&mut self, flag: Flag, value: bool) {
        if value {
            self.0 |= flag.bit();
        } else {
            self.0 &= !flag.bit();
        }
    }

    pub fn with(mut self, flag: Flag) -> Self {
        self.set(flag, true);
        self
    }
}

impl From<Flag> for DialogueFlags {
    fn from(flag: Flag) -> Self {
        Self(flag.bit())
    }
}

/// Kind of mutation recorded in the history log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifyType {
    Create,
    Modify,
    Remove,
}

impl ModifyType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModifyType::Create => "create",
            ModifyType::Modify => "modify",
            ModifyType::Remove => "remove",
        }
    }
}

impl fmt::Display for ModifyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who changed a dialogue, how, and when
#[derive(Debug, Clone)]
pub struct HistoryMark {
    pub kind: ModifyType,
    pub operator: String,
    pub stamp: Stamp,
}

/// Per-operation data attached to a dialogue
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    /// Match weight computed during selection
    pub weight: f64,
    /// Set by zeroing rules; a suppressed candidate always weighs zero
    pub suppressed: bool,
    /// Capture groups from the weighting phase, index 0 is the whole match
    pub capture: Option<Vec<Option<String>>>,
    pub history: Option<HistoryMark>,
    /// Snapshot taken when the record was loaded
    pub backup: Option<Box<Dialogue>>,
    pub redirections: Option<Vec<Dialogue>>,
    pub predecessors: Option<Vec<Dialogue>>,
    pub successors: Option<Vec<Dialogue>>,
}

/// A persisted question/answer rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dialogue {
    pub id: DialogueId,
    pub question: String,
    pub original: String,
    pub answer: String,
    pub flag: DialogueFlags,
    pub prob_s: f64,
    pub prob_a: f64,
    /// Author id, empty when anonymous
    #[serde(default)]
    pub writer: String,
    #[serde(default)]
    pub guilds: Vec<String>,
    #[serde(default)]
    pub predecessors: Vec<DialogueId>,
    /// Successor window override in milliseconds, 0 uses the global default
    #[serde(default)]
    pub successor_timeout: u64,
    /// Activation window in minutes of the day
    #[serde(default)]
    pub start_time: u32,
    #[serde(default)]
    pub end_time: u32,
    #[serde(skip)]
    pub meta: Annotations,
}

impl Default for Dialogue {
    fn default() -> Self {
        Self {
            id: 0,
            question: String::new(),
            original: String::new(),
            answer: String::new(),
            flag: DialogueFlags::empty(),
            prob_s: 1.0,
            prob_a: 0.0,
            writer: String::new(),
            guilds: Vec::new(),
            predecessors: Vec::new(),
            successor_timeout: 0,
            start_time: 0,
            end_time: 0,
            meta: Annotations::default(),
        }
    }
}

impl Dialogue {
    pub fn is_regexp(&self) -> bool {
        self.flag.contains(Flag::Regexp)
    }

    pub fn has(&self, flag: Flag) -> bool {
        self.flag.contains(flag)
    }

    /// Effective weight, honoring suppression
    pub fn weight(&self) -> f64 {
        if self.meta.suppressed {
            0.0
        } else {
            self.meta.weight
        }
    }

    pub fn suppress(&mut self) {
        self.meta.suppressed = true;
        self.meta.weight = 0.0;
    }

    /// Copy of the persisted fields without annotations
    pub fn snapshot(&self) -> Dialogue {
        Dialogue {
            meta: Annotations::default(),
            ..self.clone()
        }
    }

    /// Fields that differ from `before`
    pub fn diff(&self, before: &Dialogue) -> DialoguePatch {
        fn changed<T: PartialEq + Clone>(now: &T, then: &T) -> Option<T> {
            (now != then).then(|| now.clone())
        }

        DialoguePatch {
            id: self.id,
            question: changed(&self.question, &before.question),
            original: changed(&self.original, &before.original),
            answer: changed(&self.answer, &before.answer),
            flag: changed(&self.flag, &before.flag),
            prob_s: changed(&self.prob_s, &before.prob_s),
            prob_a: changed(&self.prob_a, &before.prob_a),
            writer: changed(&self.writer, &before.writer),
            guilds: changed(&self.guilds, &before.guilds),
            predecessors: changed(&self.predecessors, &before.predecessors),
            successor_timeout: changed(&self.successor_timeout, &before.successor_timeout),
            start_time: changed(&self.start_time, &before.start_time),
            end_time: changed(&self.end_time, &before.end_time),
        }
    }
}

/// Partial update keyed by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialoguePatch {
    pub id: DialogueId,
    pub question: Option<String>,
    pub original: Option<String>,
    pub answer: Option<String>,
    pub flag: Option<DialogueFlags>,
    pub prob_s: Option<f64>,
    pub prob_a: Option<f64>,
    pub writer: Option<String>,
    pub guilds: Option<Vec<String>>,
    pub predecessors: Option<Vec<DialogueId>>,
    pub successor_timeout: Option<u64>,
    pub start_time: Option<u32>,
    pub end_time: Option<u32>,
}

impl DialoguePatch {
    /// A patch carrying every persisted field, used to restore snapshots
    pub fn full(dialogue: &Dialogue) -> Self {
        Self {
            id: dialogue.id,
            question: Some(dialogue.question.clone()),
            original: Some(dialogue.original.clone()),
            answer: Some(dialogue.answer.clone()),
            flag: Some(dialogue.flag),
            prob_s: Some(dialogue.prob_s),
            prob_a: Some(dialogue.prob_a),
            writer: Some(dialogue.writer.clone()),
            guilds: Some(dialogue.guilds.clone()),
            predecessors: Some(dialogue.predecessors.clone()),
            successor_timeout: Some(dialogue.successor_timeout),
            start_time: Some(dialogue.start_time),
            end_time: Some(dialogue.end_time),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self
            == Self {
                id: self.id,
                ..Self::default()
            }
    }

    pub fn apply_to(&self, dialogue: &mut Dialogue) {
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(value) = &self.$field {
                    dialogue.$field = value.clone();
                })*
            };
        }
        apply!(
            question,
            original,
            answer,
            flag,
            prob_s,
            prob_a,
            writer,
            guilds,
            predecessors,
            successor_timeout,
            start_time,
            end_time
        );
    }
}

/// Filter criteria translated into a store predicate by the query builder
#[derive(Debug, Clone, Default)]
pub struct DialogueTest {
    pub original: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
    /// `Some(true)` searches by pattern, `Some(false)` matches literal questions only
    pub regexp: Option<bool>,
    pub activated: bool,
    pub appellative: bool,
    pub no_recursive: bool,
    /// Required flag states
    pub flags: Vec<(Flag, bool)>,
    pub writer: Option<String>,
    pub guilds: Option<Vec<String>>,
    pub reversed: bool,
    pub partial: bool,
    pub predecessors: Option<Vec<DialogueId>>,
    pub stateful: bool,
    pub match_time: Option<u32>,
    pub mismatch_time: Option<u32>,
}

/// Identity of a user as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Internal id, also used as the writer id
    pub id: String,
    pub authority: u32,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, authority: u32) -> Self {
        Self {
            id: id.into(),
            authority,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
