//! In-memory dialogue store

use super::{DialogueStats, DialogueStore, Expr};
use crate::core::types::{Dialogue, DialogueId, DialoguePatch};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    rows: BTreeMap<DialogueId, Dialogue>,
    last_id: DialogueId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DialogueStore for MemoryStore {
    async fn query(&self, expr: &Expr) -> Result<Vec<Dialogue>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .rows
            .values()
            .filter(|dialogue| expr.matches(dialogue))
            .map(Dialogue::snapshot)
            .collect())
    }

    async fn get(&self, ids: &[DialogueId]) -> Result<Vec<Dialogue>> {
        let wanted: HashSet<_> = ids.iter().copied().collect();
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .rows
            .values()
            .filter(|dialogue| wanted.contains(&dialogue.id))
            .map(Dialogue::snapshot)
            .collect())
    }

    async fn create(&self, dialogue: Dialogue) -> Result<Dialogue> {
        let mut inner = self.inner.lock().unwrap();
        inner.last_id += 1;
        let created = Dialogue {
            id: inner.last_id,
            ..dialogue.snapshot()
        };
        inner.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn upsert(&self, patches: Vec<DialoguePatch>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        for patch in patches {
            inner.last_id = inner.last_id.max(patch.id);
            let row = inner.rows.entry(patch.id).or_insert_with(|| Dialogue {
                id: patch.id,
                ..Default::default()
            });
            patch.apply_to(row);
        }
        Ok(())
    }

    async fn remove(&self, ids: &[DialogueId]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        for id in ids {
            inner.rows.remove(id);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<DialogueStats> {
        let inner = self.inner.lock().unwrap();
        let questions: HashSet<_> = inner.rows.values().map(|d| d.question.as_str()).collect();
        Ok(DialogueStats {
            questions: questions.len(),
            dialogues: inner.rows.len(),
        })
    }
}
