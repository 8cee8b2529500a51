pub mod in_memory;

use crate::core::errors::ForumError;
use crate::core::models::audit::AppLog;
use async_trait::async_trait;

/// Records user-facing actions (registration, login) for later inspection.
#[async_trait]
pub trait LoggingService: Send + Sync {
    async fn log_action(
        &self,
        action: &str,
        details: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), ForumError>;
    async fn get_logs(&self) -> Result<Vec<AppLog>, ForumError>;
}
