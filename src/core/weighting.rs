//! Candidate weighting and weighted selection
//!
//! Zeroing rules contributed by plugins run first and mark candidates as
//! suppressed; [`assign_weights`] then fills in probabilities without ever
//! reviving a suppressed candidate.

use crate::core::traits::Sampler;
use crate::core::types::{Dialogue, DialogueTest};
use regex::Regex;

/// Compute the match weight of every candidate
///
/// `activated` tells whether the sender recently addressed the bot by a
/// bare nickname.
pub fn assign_weights(dialogues: &mut [Dialogue], test: &DialogueTest, activated: bool) {
    let has_literal = dialogues.iter().any(|d| !d.is_regexp());
    let question = test.question.as_deref().unwrap_or_default();
    let original = test.original.as_deref().unwrap_or_default();

    for dialogue in dialogues.iter_mut() {
        let weight = if has_literal && dialogue.is_regexp() {
            0.0
        } else if activated {
            dialogue.prob_s.max(dialogue.prob_a)
        } else if !test.appellative || !dialogue.is_regexp() {
            if test.appellative {
                dialogue.prob_a
            } else {
                dialogue.prob_s
            }
        } else {
            weigh_appellative_regexp(dialogue, original, question)
        };

        if !dialogue.meta.suppressed {
            dialogue.meta.weight = weight;
        }
    }
}

/// Try the more probable branch first, strict wins ties
fn weigh_appellative_regexp(dialogue: &mut Dialogue, original: &str, parsed: &str) -> f64 {
    let Ok(pattern) = Regex::new(&dialogue.question) else {
        return 0.0;
    };
    let queue = if dialogue.prob_s >= dialogue.prob_a {
        [(original, dialogue.prob_s), (parsed, dialogue.prob_a)]
    } else {
        [(parsed, dialogue.prob_a), (original, dialogue.prob_s)]
    };
    for (subject, weight) in queue {
        if let Some(capture) = capture_groups(&pattern, subject) {
            dialogue.meta.capture = Some(capture);
            return weight;
        }
    }
    dialogue.meta.capture = None;
    0.0
}

/// All groups of the first match, index 0 being the whole match
pub fn capture_groups(pattern: &Regex, subject: &str) -> Option<Vec<Option<String>>> {
    pattern.captures(subject).map(|captures| {
        captures
            .iter()
            .map(|group| group.map(|m| m.as_str().to_string()))
            .collect()
    })
}

pub fn total_weight(dialogues: &[Dialogue]) -> f64 {
    dialogues.iter().map(Dialogue::weight).sum()
}

/// Weighted draw over `[0, max(1, total))`
///
/// Probabilities are not renormalized: a total below 1 leaves room for
/// nothing to fire. Returns the index of the winner.
pub fn select(dialogues: &[Dialogue], sampler: &dyn Sampler) -> Option<usize> {
    let total = total_weight(dialogues);
    if total <= 0.0 {
        return None;
    }
    let target = sampler.real(total.max(1.0));
    let mut pointer = 0.0;
    for (index, dialogue) in dialogues.iter().enumerate() {
        pointer += dialogue.weight();
        if target < pointer {
            return Some(index);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::{FixedSampler, ThreadRngSampler};
    use crate::core::types::{DialogueFlags, Flag};

    fn literal(id: u64, prob_s: f64, prob_a: f64) -> Dialogue {
        Dialogue {
            id,
            question: "foo".into(),
            original: "foo".into(),
            answer: format!("a{id}"),
            prob_s,
            prob_a,
            ..Default::default()
        }
    }

    fn regexp(id: u64, pattern: &str, prob_s: f64, prob_a: f64) -> Dialogue {
        Dialogue {
            id,
            question: pattern.into(),
            original: pattern.into(),
            answer: format!("r{id}"),
            flag: DialogueFlags::from(Flag::Regexp),
            prob_s,
            prob_a,
            ..Default::default()
        }
    }

    fn test(original: &str, question: &str, appellative: bool) -> DialogueTest {
        DialogueTest {
            original: Some(original.into()),
            question: Some(question.into()),
            appellative,
            ..Default::default()
        }
    }

    #[test]
    fn test_sole_strict_candidate_always_fires() {
        let mut dialogues = vec![literal(1, 1.0, 0.0)];
        assign_weights(&mut dialogues, &test("foo", "foo", false), false);
        for fraction in [0.0, 0.5, 0.999] {
            assert_eq!(select(&dialogues, &FixedSampler(fraction)), Some(0));
        }
    }

    #[test]
    fn test_low_total_can_miss() {
        let mut dialogues = vec![literal(1, 0.5, 0.0)];
        assign_weights(&mut dialogues, &test("foo", "foo", false), false);
        assert_eq!(select(&dialogues, &FixedSampler(0.4)), Some(0));
        assert_eq!(select(&dialogues, &FixedSampler(0.6)), None);
    }

    #[test]
    fn test_total_above_one_is_proportional() {
        let mut dialogues = vec![literal(1, 1.0, 0.0), literal(2, 0.5, 0.0)];
        assign_weights(&mut dialogues, &test("foo", "foo", false), false);
        // target drawn from [0, 1.5)
        assert_eq!(select(&dialogues, &FixedSampler(0.6)), Some(0));
        assert_eq!(select(&dialogues, &FixedSampler(0.7)), Some(1));

        let sampler = ThreadRngSampler;
        let mut hits = [0usize; 2];
        for _ in 0..3000 {
            let index = select(&dialogues, &sampler).expect("always fires");
            hits[index] += 1;
        }
        let ratio = hits[0] as f64 / hits[1] as f64;
        assert!((1.6..2.5).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn test_literal_suppresses_regexp() {
        let mut dialogues = vec![regexp(1, "^fo", 1.0, 0.0), literal(2, 1.0, 0.0)];
        assign_weights(&mut dialogues, &test("foo", "foo", false), false);
        assert_eq!(dialogues[0].weight(), 0.0);
        assert_eq!(dialogues[1].weight(), 1.0);
        for fraction in [0.0, 0.3, 0.99] {
            assert_eq!(select(&dialogues, &FixedSampler(fraction)), Some(1));
        }
    }

    #[test]
    fn test_appellative_uses_prob_a() {
        let mut dialogues = vec![literal(1, 0.0, 1.0)];
        assign_weights(&mut dialogues, &test("koishi, foo", "foo", true), false);
        assert_eq!(dialogues[0].weight(), 1.0);

        assign_weights(&mut dialogues, &test("foo", "foo", false), false);
        assert_eq!(dialogues[0].weight(), 0.0);
    }

    #[test]
    fn test_activation_takes_max() {
        let mut dialogues = vec![literal(1, 0.2, 0.7)];
        assign_weights(&mut dialogues, &test("foo", "foo", false), true);
        assert_eq!(dialogues[0].weight(), 0.7);
    }

    #[test]
    fn test_appellative_regexp_prefers_strict_on_tie() {
        let mut dialogues = vec![regexp(1, "^(.*)foo", 0.5, 0.5)];
        assign_weights(&mut dialogues, &test("koishi, foo", "foo", true), false);
        let capture = dialogues[0].meta.capture.clone().unwrap();
        assert_eq!(capture[1].as_deref(), Some("koishi, "));
        assert_eq!(dialogues[0].weight(), 0.5);
    }

    #[test]
    fn test_appellative_regexp_falls_back() {
        let mut dialogues = vec![regexp(1, "^foo$", 1.0, 0.5)];
        assign_weights(&mut dialogues, &test("koishi, foo", "foo", true), false);
        assert_eq!(dialogues[0].weight(), 0.5);
        assert!(dialogues[0].meta.capture.is_some());

        let mut dialogues = vec![regexp(1, "^bar$", 1.0, 0.5)];
        assign_weights(&mut dialogues, &test("koishi, foo", "foo", true), false);
        assert_eq!(dialogues[0].weight(), 0.0);
        assert!(dialogues[0].meta.capture.is_none());
    }

    #[test]
    fn test_suppressed_stays_zero() {
        let mut dialogues = vec![literal(1, 1.0, 0.0), literal(2, 1.0, 0.0)];
        dialogues[0].suppress();
        assign_weights(&mut dialogues, &test("foo", "foo", false), false);
        assert_eq!(total_weight(&dialogues), 1.0);
        assert_eq!(select(&dialogues, &FixedSampler(0.0)), Some(1));
    }

    #[test]
    fn test_empty_pool_never_fires() {
        assert_eq!(select(&[], &FixedSampler(0.0)), None);
    }
}
