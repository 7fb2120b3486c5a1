use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const STATUS_PENDING: &str = "Pending";
pub const STATUS_CV_RECEIVED: &str = "CV Received";
pub const STATUS_DISQUALIFIED: &str = "Disqualified";

const SOURCING_STATUSES: &[&str] = &[
    STATUS_PENDING,
    "Communication Sent",
    "Interested",
    "Not Interested",
    "No Response",
    STATUS_CV_RECEIVED,
    STATUS_DISQUALIFIED,
];

const SCREENING_STATUSES: &[&str] = &[
    STATUS_PENDING,
    "Screening Scheduled",
    "Screening Completed",
    "Shortlisted",
    "On Hold",
    STATUS_DISQUALIFIED,
];

const CLIENT_REVIEW_STATUSES: &[&str] = &[
    STATUS_PENDING,
    "Submitted to Client",
    "Client Approved",
    "Client Rejected",
    "On Hold",
    STATUS_DISQUALIFIED,
];

/// A step in the hiring funnel, in funnel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Sourcing,
    Screening,
    #[serde(rename = "Client Review")]
    ClientReview,
    Interview,
    Verification,
    Onboarding,
    Hired,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Sourcing,
        Stage::Screening,
        Stage::ClientReview,
        Stage::Interview,
        Stage::Verification,
        Stage::Onboarding,
        Stage::Hired,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Sourcing => "Sourcing",
            Stage::Screening => "Screening",
            Stage::ClientReview => "Client Review",
            Stage::Interview => "Interview",
            Stage::Verification => "Verification",
            Stage::Onboarding => "Onboarding",
            Stage::Hired => "Hired",
        }
    }

    /// Built-in permitted statuses. Only the early stages carry a fixed set;
    /// `None` means any status is accepted unless the backend says otherwise.
    pub fn default_statuses(self) -> Option<&'static [&'static str]> {
        match self {
            Stage::Sourcing => Some(SOURCING_STATUSES),
            Stage::Screening => Some(SCREENING_STATUSES),
            Stage::ClientReview => Some(CLIENT_REVIEW_STATUSES),
            _ => None,
        }
    }

    /// Stage changes into these stages need extra details before they can be committed.
    pub fn requires_interview_details(self) -> bool {
        self == Stage::Interview
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.label().replace(' ', "").to_ascii_lowercase() == wanted)
            .ok_or_else(|| format!("unknown pipeline stage `{}`", s))
    }
}

/// Compares status labels the way recruiters type them.
pub fn same_status(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// A stage as the pipeline presents it, with the statuses allowed inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub stage: Stage,
    /// Empty means unconstrained.
    pub statuses: Vec<String>,
}

impl StageDefinition {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            statuses: stage
                .default_statuses()
                .map(|set| set.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default(),
        }
    }

    pub fn with_statuses(stage: Stage, statuses: Vec<String>) -> Self {
        if statuses.is_empty() {
            return Self::new(stage);
        }
        Self { stage, statuses }
    }

    pub fn is_constrained(&self) -> bool {
        !self.statuses.is_empty()
    }

    pub fn permits(&self, status: &str) -> bool {
        !self.is_constrained() || self.statuses.iter().any(|s| same_status(s, status))
    }

    pub fn default_funnel() -> Vec<StageDefinition> {
        Stage::ALL.into_iter().map(StageDefinition::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_and_loose_spellings() {
        assert_eq!("Client Review".parse::<Stage>(), Ok(Stage::ClientReview));
        assert_eq!("client_review".parse::<Stage>(), Ok(Stage::ClientReview));
        assert_eq!("INTERVIEW".parse::<Stage>(), Ok(Stage::Interview));
        assert!("Offer".parse::<Stage>().is_err());
    }

    #[test]
    fn serializes_with_display_labels() {
        let json = serde_json::to_string(&Stage::ClientReview).unwrap();
        assert_eq!(json, "\"Client Review\"");
        let stage: Stage = serde_json::from_str("\"Onboarding\"").unwrap();
        assert_eq!(stage, Stage::Onboarding);
    }

    #[test]
    fn funnel_order_is_stable() {
        assert!(Stage::Sourcing < Stage::Hired);
        assert_eq!(Stage::ALL[3], Stage::Interview);
    }

    #[test]
    fn only_early_stages_constrain_statuses() {
        let sourcing = StageDefinition::new(Stage::Sourcing);
        assert!(sourcing.permits("cv received"));
        assert!(!sourcing.permits("Client Approved"));

        let verification = StageDefinition::new(Stage::Verification);
        assert!(!verification.is_constrained());
        assert!(verification.permits("Background Check"));
    }

    #[test]
    fn backend_statuses_override_defaults() {
        let def = StageDefinition::with_statuses(Stage::Screening, vec!["Phone Screen".into()]);
        assert!(def.permits("Phone Screen"));
        assert!(!def.permits("Shortlisted"));

        let empty = StageDefinition::with_statuses(Stage::Screening, Vec::new());
        assert!(empty.permits("Shortlisted"));
    }
}
