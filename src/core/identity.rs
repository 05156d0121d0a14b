//! In-process identity directory
//!
//! Backs the terminal driver and the test harness. Platform user ids and
//! internal ids are the same thing here.

use crate::core::traits::Identity;
use crate::core::types::UserProfile;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryIdentity {
    users: DashMap<String, UserProfile>,
    members: DashMap<String, HashMap<String, String>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: UserProfile) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn set_authority(&self, user_id: &str, authority: u32) {
        self.users
            .entry(user_id.to_string())
            .and_modify(|user| user.authority = authority)
            .or_insert_with(|| UserProfile::new(user_id, authority));
    }

    pub fn set_member_name(&self, guild_id: &str, user_id: &str, name: &str) {
        self.members
            .entry(guild_id.to_string())
            .or_default()
            .insert(user_id.to_string(), name.to_string());
    }
}

#[async_trait]
impl Identity for MemoryIdentity {
    async fn resolve(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.users.get(user_id).map(|user| user.clone()))
    }

    async fn get_users(&self, ids: &[String]) -> Result<Vec<UserProfile>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|user| user.clone()))
            .collect())
    }

    async fn member_names(&self, guild_id: &str) -> Result<HashMap<String, String>> {
        Ok(self
            .members
            .get(guild_id)
            .map(|names| names.clone())
            .unwrap_or_default())
    }
}
