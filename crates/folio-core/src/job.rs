use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a crawl job.
///
/// Transitions only go `Pending -> Running -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(JobStatus::Pending),
            "RUNNING" => Ok(JobStatus::Running),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// One crawl invocation, owned by the job lifecycle manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlJob {
    pub id: Uuid,
    pub target_url: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub items_found: u64,
    pub created_at: DateTime<Utc>,
}

impl CrawlJob {
    /// A freshly started job, as recorded when a crawl is triggered.
    pub fn started(target_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            target_url: target_url.into(),
            status: JobStatus::Running,
            started_at: now,
            finished_at: None,
            error: None,
            items_found: 0,
            created_at: now,
        }
    }

    /// Apply a terminal outcome. Returns `false` (and changes nothing) if the
    /// job already reached a terminal state.
    pub fn finish(&mut self, outcome: &CrawlOutcome, at: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        match outcome {
            CrawlOutcome::Completed { items_found } => {
                self.status = JobStatus::Completed;
                self.items_found = *items_found;
            }
            CrawlOutcome::Failed { error } => {
                self.status = JobStatus::Failed;
                self.error = Some(error.clone());
            }
        }
        self.finished_at = Some(at);
        true
    }
}

/// What a finished run reports back to the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    Completed { items_found: u64 },
    Failed { error: String },
}

impl CrawlOutcome {
    /// Build a failure outcome, guaranteeing a non-empty description.
    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            "unknown error".to_string()
        } else {
            error
        };
        CrawlOutcome::Failed { error }
    }
}
