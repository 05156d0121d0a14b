//! Inbound message context

use crate::core::types::UserProfile;

pub const DEFAULT_PLATFORM: &str = "ditto";

/// One inbound message together with the resolved sender
#[derive(Debug, Clone)]
pub struct Session {
    pub platform: String,
    pub channel_id: String,
    /// `None` for direct messages
    pub guild_id: Option<String>,
    /// Platform user id of the sender
    pub user_id: String,
    pub self_id: String,
    pub username: String,
    pub content: String,
    pub user: UserProfile,
    /// Depth of nested dialogue triggering
    pub redirected: u32,
}

impl Session {
    /// Guild message from `user_id` in `guild_id`, the channel shares the guild id
    pub fn guild(user_id: &str, guild_id: &str, content: impl Into<String>) -> Self {
        Self {
            platform: DEFAULT_PLATFORM.to_string(),
            channel_id: guild_id.to_string(),
            guild_id: Some(guild_id.to_string()),
            user_id: user_id.to_string(),
            self_id: "bot".to_string(),
            username: user_id.to_string(),
            content: content.into(),
            user: UserProfile::new(user_id, 1),
            redirected: 0,
        }
    }

    pub fn direct(user_id: &str, content: impl Into<String>) -> Self {
        Self {
            platform: DEFAULT_PLATFORM.to_string(),
            channel_id: format!("private:{user_id}"),
            guild_id: None,
            user_id: user_id.to_string(),
            self_id: "bot".to_string(),
            username: user_id.to_string(),
            content: content.into(),
            user: UserProfile::new(user_id, 1),
            redirected: 0,
        }
    }

    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.user = user;
        self
    }

    pub fn is_direct(&self) -> bool {
        self.guild_id.is_none()
    }

    /// Platform-qualified guild id as stored in dialogue guild lists
    pub fn gid(&self) -> Option<String> {
        self.guild_id
            .as_ref()
            .map(|guild| format!("{}:{}", self.platform, guild))
    }

    /// Copy with other content, used for nested and synthetic triggers
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gid_is_platform_qualified() {
        let session = Session::guild("200", "100", "foo");
        assert_eq!(session.gid().as_deref(), Some("ditto:100"));
        assert!(!session.is_direct());
        assert!(Session::direct("200", "foo").gid().is_none());
    }
}
