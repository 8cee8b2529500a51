use crate::core::errors::ForumError;
use crate::core::models::audit::AppLog;
use crate::infrastructure::logging::LoggingService;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const DEFAULT_RETAINED: usize = 10_000;

/// Keeps the most recent `retained` entries; older ones are dropped.
#[derive(Clone)]
pub struct InMemoryLogging {
    logs: Arc<RwLock<VecDeque<AppLog>>>,
    retained: usize,
}

impl InMemoryLogging {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETAINED)
    }

    pub fn with_retention(retained: usize) -> Self {
        InMemoryLogging {
            logs: Arc::new(RwLock::new(VecDeque::new())),
            retained: retained.max(1),
        }
    }
}

impl Default for InMemoryLogging {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoggingService for InMemoryLogging {
    async fn log_action(
        &self,
        action: &str,
        details: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), ForumError> {
        if !details.is_object() {
            return Err(ForumError::LoggingError(format!(
                "Log details for `{}` must be an object",
                action
            )));
        }
        let mut logs = self.logs.write().await;
        if logs.len() == self.retained {
            logs.pop_front();
        }
        logs.push_back(AppLog {
            id: Uuid::new_v4().to_string(),
            action: action.to_string(),
            user_id: user_id.map(String::from),
            details,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    async fn get_logs(&self) -> Result<Vec<AppLog>, ForumError> {
        let logs = self.logs.read().await;
        Ok(logs.iter().cloned().collect())
    }
}
