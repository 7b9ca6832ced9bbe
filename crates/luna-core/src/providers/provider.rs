use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Luna only ever sends the user turn; persona and context ride inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Content of the first choice, or `None` when the service answered
    /// without one. Transport failures, non-2xx statuses and bodies that
    /// are not JSON are errors.
    async fn complete(&self, messages: &[Message]) -> Result<Option<String>>;

    fn model(&self) -> &str;
}
