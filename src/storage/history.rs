//! Recent mutations kept for review and revert
//!
//! Each entry is the snapshot of a dialogue taken before a mutation. An entry
//! expires after the configured timeout unless a newer mutation of the same
//! dialogue replaced it, in which case the newer entry's own timer applies.

use crate::core::stamp::Stamp;
use crate::core::types::{Dialogue, DialogueId, HistoryMark, ModifyType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: Arc<Mutex<HashMap<DialogueId, Dialogue>>>,
    timeout: Duration,
}

impl HistoryLog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Record `dialogue` (a pre-mutation snapshot) and schedule its expiry
    pub fn record(&self, dialogue: &Dialogue, kind: ModifyType, operator: &str) {
        let stamp = Stamp::now();
        let mut entry = dialogue.snapshot();
        entry.meta.history = Some(HistoryMark {
            kind,
            operator: operator.to_string(),
            stamp,
        });
        let id = entry.id;
        self.entries.lock().unwrap().insert(id, entry);
        tracing::debug!("History: {} #{} by {}", kind, id, operator);

        let entries = Arc::clone(&self.entries);
        let timeout = self.timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let mut entries = entries.lock().unwrap();
            let current = entries
                .get(&id)
                .and_then(|entry| entry.meta.history.as_ref())
                .map(|mark| mark.stamp);
            if current == Some(stamp) {
                entries.remove(&id);
            }
        });
    }

    pub fn forget(&self, id: DialogueId) {
        self.entries.lock().unwrap().remove(&id);
    }

    /// Entries for the given ids in ascending id order
    pub fn get(&self, ids: &[DialogueId]) -> Vec<Dialogue> {
        let entries = self.entries.lock().unwrap();
        let mut found: Vec<Dialogue> = ids
            .iter()
            .filter_map(|id| entries.get(id).cloned())
            .collect();
        found.sort_by_key(|dialogue| dialogue.id);
        found.dedup_by_key(|dialogue| dialogue.id);
        found
    }

    /// All live entries, newest first
    pub fn entries(&self) -> Vec<Dialogue> {
        let mut all: Vec<Dialogue> = self.entries.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| {
            let at = |d: &Dialogue| d.meta.history.as_ref().map(|mark| mark.stamp);
            at(b).cmp(&at(a))
        });
        all
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialogue(id: DialogueId) -> Dialogue {
        Dialogue {
            id,
            question: "foo".into(),
            original: "foo".into(),
            answer: format!("bar{id}"),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_timeout() {
        let log = HistoryLog::new(Duration::from_secs(60));
        log.record(&dialogue(1), ModifyType::Modify, "200");
        assert_eq!(log.get(&[1]).len(), 1);
        assert_eq!(
            log.get(&[1])[0].meta.history.as_ref().unwrap().kind,
            ModifyType::Modify
        );

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(log.get(&[1]).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_entry_survives_older_timer() {
        let log = HistoryLog::new(Duration::from_secs(60));
        log.record(&dialogue(1), ModifyType::Create, "200");
        tokio::time::sleep(Duration::from_secs(30)).await;
        log.record(&dialogue(1), ModifyType::Modify, "300");

        tokio::time::sleep(Duration::from_secs(40)).await;
        let kept = log.get(&[1]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].meta.history.as_ref().unwrap().operator, "300");

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(log.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_newest_first_and_forget() {
        let log = HistoryLog::new(Duration::from_secs(60));
        log.record(&dialogue(2), ModifyType::Remove, "200");
        log.record(&dialogue(1), ModifyType::Modify, "200");
        let ids: Vec<_> = log.entries().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2]);

        log.forget(1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.get(&[2, 2, 1]).len(), 1);
    }
}
