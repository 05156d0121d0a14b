//! Boolean option bound to a dialogue flag
//!
//! `-f/-F`, `-s/-S` and `-c/-C` all work the same way: the option sets or
//! clears a bit on modify, and in searches it becomes a bit predicate.

use crate::core::types::{Dialogue, DialogueTest, Flag};
use crate::storage::Expr;

#[derive(Debug, Clone, Copy)]
pub struct FlagBinding {
    pub flag: Flag,
}

impl FlagBinding {
    pub const fn new(flag: Flag) -> Self {
        Self { flag }
    }

    /// Require the flag state in searches when the option was given
    pub fn search(&self, option: Option<bool>, test: &mut DialogueTest) {
        if let Some(value) = option {
            test.flags.retain(|(flag, _)| *flag != self.flag);
            test.flags.push((self.flag, value));
        }
    }

    pub fn modify(&self, option: Option<bool>, dialogue: &mut Dialogue) {
        if let Some(value) = option {
            dialogue.flag.set(self.flag, value);
        }
    }

    pub fn query(&self, test: &DialogueTest, output: &mut Vec<Expr>) {
        for (flag, value) in &test.flags {
            if *flag == self.flag {
                output.push(if *value {
                    Expr::BitsAllSet(flag.bit())
                } else {
                    Expr::BitsAllClear(flag.bit())
                });
            }
        }
    }
}
