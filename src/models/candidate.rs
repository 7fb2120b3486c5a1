use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::stage::Stage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub current_stage: Stage,
    pub status: String,
    pub resume_url: Option<String>,
    /// Placeholder record created without a full profile.
    pub is_temp_candidate: bool,
    pub interview: Option<InterviewDetails>,
    pub disqualification: Option<Disqualification>,
    pub notes: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewDetails {
    pub scheduled_at: DateTime<Utc>,
    pub meeting_link: String,
}

/// Snapshot recorded when a candidate is disqualified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disqualification {
    pub stage: Stage,
    pub status: String,
    pub reason: String,
    pub feedback: Option<String>,
}

impl Candidate {
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            self.email.as_deref().unwrap_or(self.id.as_str())
        } else {
            name
        }
    }

    pub(crate) fn matches(&self, needle: &str) -> bool {
        let contains = |value: Option<&str>| {
            value
                .map(|v| v.to_lowercase().contains(needle))
                .unwrap_or(false)
        };
        contains(Some(self.name.as_str()))
            || contains(self.email.as_deref())
            || contains(self.location.as_deref())
    }
}
