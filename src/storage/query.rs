//! Predicate language understood by dialogue stores
//!
//! Stores may translate an [`Expr`] into their native query language or,
//! like the bundled stores, evaluate it row by row with [`Expr::matches`].

use crate::core::types::{Dialogue, DialogueId};
use regex::RegexBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Question,
    Original,
    Answer,
    Writer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListField {
    Guilds,
    Predecessors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumField {
    StartTime,
    EndTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn holds(self, left: u32, right: u32) -> bool {
        match self {
            CmpOp::Lt => left < right,
            CmpOp::Le => left <= right,
            CmpOp::Gt => left > right,
            CmpOp::Ge => left >= right,
        }
    }
}

/// Predicate tree over dialogue records
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    True,
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Eq(TextField, String),
    /// Field matches the pattern, case-insensitively
    Regex(TextField, String),
    /// Field, read as a pattern, matches the text, case-insensitively
    RegexFor(TextField, String),
    BitsAllSet(u32),
    BitsAllClear(u32),
    /// List contains the value
    Contains(ListField, String),
    /// List contains at least one of the values
    ContainsAny(ListField, Vec<String>),
    SizeEq(ListField, usize),
    Compare(NumField, CmpOp, u32),
    CompareFields(NumField, CmpOp, NumField),
    IdIn(Vec<DialogueId>),
}

impl Expr {
    /// Conjunction that collapses trivial cases
    pub fn all(mut parts: Vec<Expr>) -> Expr {
        parts.retain(|part| *part != Expr::True);
        match parts.len() {
            0 => Expr::True,
            1 => parts.remove(0),
            _ => Expr::And(parts),
        }
    }

    pub fn not(expr: Expr) -> Expr {
        Expr::Not(Box::new(expr))
    }

    pub fn matches(&self, dialogue: &Dialogue) -> bool {
        match self {
            Expr::True => true,
            Expr::And(parts) => parts.iter().all(|part| part.matches(dialogue)),
            Expr::Or(parts) => parts.iter().any(|part| part.matches(dialogue)),
            Expr::Not(inner) => !inner.matches(dialogue),
            Expr::Eq(field, value) => text(dialogue, *field) == value,
            Expr::Regex(field, pattern) => is_match(pattern, text(dialogue, *field)),
            Expr::RegexFor(field, subject) => is_match(text(dialogue, *field), subject),
            Expr::BitsAllSet(bits) => dialogue.flag.bits() & bits == *bits,
            Expr::BitsAllClear(bits) => dialogue.flag.bits() & bits == 0,
            Expr::Contains(field, value) => list(dialogue, *field).iter().any(|v| v == value),
            Expr::ContainsAny(field, values) => list(dialogue, *field)
                .iter()
                .any(|v| values.contains(v)),
            Expr::SizeEq(field, size) => list(dialogue, *field).len() == *size,
            Expr::Compare(field, op, value) => op.holds(number(dialogue, *field), *value),
            Expr::CompareFields(left, op, right) => {
                op.holds(number(dialogue, *left), number(dialogue, *right))
            }
            Expr::IdIn(ids) => ids.contains(&dialogue.id),
        }
    }
}

fn text(dialogue: &Dialogue, field: TextField) -> &str {
    match field {
        TextField::Question => &dialogue.question,
        TextField::Original => &dialogue.original,
        TextField::Answer => &dialogue.answer,
        TextField::Writer => &dialogue.writer,
    }
}

fn list(dialogue: &Dialogue, field: ListField) -> Vec<String> {
    match field {
        ListField::Guilds => dialogue.guilds.clone(),
        ListField::Predecessors => dialogue.predecessors.iter().map(|id| id.to_string()).collect(),
    }
}

fn number(dialogue: &Dialogue, field: NumField) -> u32 {
    match field {
        NumField::StartTime => dialogue.start_time,
        NumField::EndTime => dialogue.end_time,
    }
}

/// Invalid patterns never match
fn is_match(pattern: &str, subject: &str) -> bool {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(|re| re.is_match(subject))
        .unwrap_or(false)
}
