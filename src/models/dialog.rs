use crate::models::candidate::Candidate;
use crate::models::stage::Stage;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingStageChange {
    pub candidate: Candidate,
    pub from: Stage,
    pub to: Stage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingStatusChange {
    pub candidate: Candidate,
    pub stage: Stage,
    pub from: String,
    pub to: String,
}

/// The single source of truth for which dialog the pipeline screen shows.
/// Only one variant can be active, so two dialogs can never be open at once.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DialogState {
    #[default]
    Idle,
    ConfirmingStage(PendingStageChange),
    ConfirmingStatus(PendingStatusChange),
    /// Disqualification form, prefilled with the candidate's current stage and status.
    ConfirmingDisqualification(PendingStatusChange),
    ShowingInterviewForm(PendingStageChange),
    /// A temporary candidate's status is moving to the conversion trigger.
    ShowingConversionForm(PendingStatusChange),
    ConfirmingRemoval { candidate: Candidate },
    ShowingTempAlert { candidate_name: String, message: String },
    /// The requested status is outside the stage's permitted set.
    ShowingBlockedAlert { candidate_name: String, message: String },
    ShowingError { message: String },
}

impl DialogState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DialogState::Idle)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DialogState::Idle => "idle",
            DialogState::ConfirmingStage(_) => "confirming_stage",
            DialogState::ConfirmingStatus(_) => "confirming_status",
            DialogState::ConfirmingDisqualification(_) => "confirming_disqualification",
            DialogState::ShowingInterviewForm(_) => "showing_interview_form",
            DialogState::ShowingConversionForm(_) => "showing_conversion_form",
            DialogState::ConfirmingRemoval { .. } => "confirming_removal",
            DialogState::ShowingTempAlert { .. } => "showing_temp_alert",
            DialogState::ShowingBlockedAlert { .. } => "showing_blocked_alert",
            DialogState::ShowingError { .. } => "showing_error",
        }
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            DialogState::ConfirmingStage(p) | DialogState::ShowingInterviewForm(p) => {
                Some(&p.candidate)
            }
            DialogState::ConfirmingStatus(p)
            | DialogState::ConfirmingDisqualification(p)
            | DialogState::ShowingConversionForm(p) => Some(&p.candidate),
            DialogState::ConfirmingRemoval { candidate } => Some(candidate),
            _ => None,
        }
    }

    /// Text the dialog shows. `None` while idle.
    pub fn prompt(&self) -> Option<String> {
        let text = match self {
            DialogState::Idle => return None,
            DialogState::ConfirmingStage(p) => format!(
                "Move {} from {} to {}?",
                p.candidate.display_name(),
                p.from,
                p.to
            ),
            DialogState::ConfirmingStatus(p) => format!(
                "Change status of {} from {} to {}?",
                p.candidate.display_name(),
                p.from,
                p.to
            ),
            DialogState::ConfirmingDisqualification(p) => format!(
                "Disqualify {} at {} ({})? A reason is required.",
                p.candidate.display_name(),
                p.stage,
                p.from
            ),
            DialogState::ShowingInterviewForm(p) => format!(
                "Schedule the interview for {}: date, time and meeting link are required.",
                p.candidate.display_name()
            ),
            DialogState::ShowingConversionForm(p) => format!(
                "{} is a temporary candidate. Complete their profile to mark them as {}.",
                p.candidate.display_name(),
                p.to
            ),
            DialogState::ConfirmingRemoval { candidate } => format!(
                "Remove {} from this pipeline?",
                candidate.display_name()
            ),
            DialogState::ShowingTempAlert {
                candidate_name,
                message,
            }
            | DialogState::ShowingBlockedAlert {
                candidate_name,
                message,
            } => format!("{}: {}", candidate_name, message),
            DialogState::ShowingError { message } => message.clone(),
        };
        Some(text)
    }
}
