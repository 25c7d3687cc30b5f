use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Serialize, TS, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast. Never blocks the session.
#[derive(Debug, Clone, Serialize, TS, PartialEq)]
#[ts(export)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        let notice = Self {
            level,
            message: message.into(),
            created_at: Utc::now(),
        };
        notice.log();
        notice
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    /// Error notice; the full cause chain goes to the log, the toast keeps the summary.
    pub fn failure(summary: &str, err: &anyhow::Error) -> Self {
        for (depth, cause) in err.chain().skip(1).enumerate() {
            error!(cause_depth = depth + 1, cause = %cause, "caused by");
        }
        Self::new(NoticeLevel::Error, format!("{summary}: {err}"))
    }

    fn log(&self) {
        match self.level {
            NoticeLevel::Info | NoticeLevel::Success => info!(message = %self.message, "notice"),
            NoticeLevel::Warning => warn!(message = %self.message, "notice"),
            NoticeLevel::Error => error!(message = %self.message, "notice"),
        }
    }
}
