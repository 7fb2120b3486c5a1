use validator::{Validate, ValidationError};

use crate::models::candidate::Candidate;
use crate::models::stage::{same_status, StageDefinition, STATUS_CV_RECEIVED};

pub fn validate<T: Validate>(val: &T) -> Result<(), validator::ValidationErrors> {
    val.validate()
}

pub fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Result of a transition guard. Call sites match every arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allowed,
    Blocked { reason: String },
    /// The change must go through the temp-to-full candidate conversion instead.
    RedirectToConversion,
}

impl GuardOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardOutcome::Allowed)
    }
}

pub fn validate_temp_candidate_stage_change(candidate: &Candidate) -> GuardOutcome {
    if !candidate.is_temp_candidate {
        return GuardOutcome::Allowed;
    }
    GuardOutcome::Blocked {
        reason: format!(
            "{} is a temporary candidate. Create a full candidate profile before changing their stage.",
            candidate.display_name()
        ),
    }
}

pub fn validate_temp_candidate_status_change(
    candidate: &Candidate,
    new_status: &str,
) -> GuardOutcome {
    if !candidate.is_temp_candidate {
        return GuardOutcome::Allowed;
    }
    if same_status(new_status, STATUS_CV_RECEIVED) {
        return GuardOutcome::RedirectToConversion;
    }
    GuardOutcome::Blocked {
        reason: format!(
            "{} is a temporary candidate. Only \"{}\" can be set until their profile is created.",
            candidate.display_name(),
            STATUS_CV_RECEIVED
        ),
    }
}

pub fn validate_status_for_stage(definition: &StageDefinition, status: &str) -> GuardOutcome {
    if definition.permits(status) {
        return GuardOutcome::Allowed;
    }
    GuardOutcome::Blocked {
        reason: format!(
            "\"{}\" is not a valid status for the {} stage.",
            status.trim(),
            definition.stage
        ),
    }
}
