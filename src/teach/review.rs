//! `-v` / `-V` without targets: the operator's own recent changes

use super::{text, LastSpan, TeachArgv};
use crate::core::types::Dialogue;
use crate::engine::Engine;
use anyhow::Result;

fn age(dialogue: &Dialogue) -> std::time::Duration {
    dialogue
        .meta
        .history
        .as_ref()
        .map(|mark| mark.stamp.elapsed())
        .unwrap_or_default()
}

/// Keep the entries selected by `-l` and drop those selected by `-L`
///
/// `entries` must be newest first.
pub fn select_entries(
    entries: Vec<Dialogue>,
    include: Option<LastSpan>,
    exclude: Option<LastSpan>,
) -> Vec<Dialogue> {
    entries
        .into_iter()
        .enumerate()
        .filter(|(index, dialogue)| {
            let included = match include {
                Some(LastSpan::Count(count)) => *index < count,
                Some(LastSpan::Interval(interval)) => age(dialogue) < interval,
                None => true,
            };
            let excluded = match exclude {
                Some(LastSpan::Count(count)) => *index < count,
                Some(LastSpan::Interval(interval)) => age(dialogue) < interval,
                None => false,
            };
            included && !excluded
        })
        .map(|(_, dialogue)| dialogue)
        .collect()
}

pub async fn run(engine: &Engine, argv: &mut TeachArgv) -> Result<String> {
    let operator = argv.operator().to_string();
    let own: Vec<Dialogue> = engine
        .history
        .entries()
        .into_iter()
        .filter(|dialogue| {
            dialogue
                .meta
                .history
                .as_ref()
                .is_some_and(|mark| mark.operator == operator)
        })
        .collect();
    let dialogues = select_entries(own, argv.options.include_last, argv.options.exclude_last);
    if dialogues.is_empty() {
        return Ok(text::NO_HISTORY.to_string());
    }

    if argv.options.review {
        let mut output = vec![text::RECENT_HISTORY.to_string()];
        output.extend(dialogues.iter().map(|d| engine.format_dialogue(argv, d)));
        return Ok(output.join("\n"));
    }
    engine.revert(argv, dialogues).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stamp::Stamp;
    use crate::core::types::{HistoryMark, ModifyType};
    use std::time::Duration;

    fn entry(id: u64, stamp: Stamp) -> Dialogue {
        let mut dialogue = Dialogue {
            id,
            ..Default::default()
        };
        dialogue.meta.history = Some(HistoryMark {
            kind: ModifyType::Modify,
            operator: "100".into(),
            stamp,
        });
        dialogue
    }

    fn ids(dialogues: &[Dialogue]) -> Vec<u64> {
        dialogues.iter().map(|d| d.id).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_by_count_and_interval() {
        let old = entry(1, Stamp::now());
        tokio::time::advance(Duration::from_secs(60)).await;
        let middle = entry(2, Stamp::now());
        tokio::time::advance(Duration::from_secs(60)).await;
        let newest = entry(3, Stamp::now());
        let entries = vec![newest, middle, old];

        let all = select_entries(entries.clone(), None, None);
        assert_eq!(ids(&all), vec![3, 2, 1]);

        let last = select_entries(entries.clone(), Some(LastSpan::Count(2)), None);
        assert_eq!(ids(&last), vec![3, 2]);

        let older = select_entries(entries.clone(), None, Some(LastSpan::Count(1)));
        assert_eq!(ids(&older), vec![2, 1]);

        let recent = select_entries(
            entries.clone(),
            Some(LastSpan::Interval(Duration::from_secs(90))),
            None,
        );
        assert_eq!(ids(&recent), vec![3, 2]);

        let between = select_entries(
            entries,
            Some(LastSpan::Interval(Duration::from_secs(90))),
            Some(LastSpan::Interval(Duration::from_secs(30))),
        );
        assert_eq!(ids(&between), vec![2]);
    }
}
