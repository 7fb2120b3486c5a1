use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::models::stage::Stage;
use crate::utils::time::{parse_date, parse_time};
use crate::utils::validation::non_blank;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStagePayload {
    pub new_stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview_meeting_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    pub status: String,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disqualification_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disqualification_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disqualification_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disqualification_feedback: Option<String>,
}

impl UpdateStatusPayload {
    pub fn plain(stage: Stage, status: impl Into<String>, notes: Option<String>) -> Self {
        Self {
            status: status.into(),
            stage,
            notes,
            disqualification_stage: None,
            disqualification_status: None,
            disqualification_reason: None,
            disqualification_feedback: None,
        }
    }
}

/// Interview details collected before a move into the Interview stage.
/// `date` and `time` are the recruiter's wall clock at `utc_offset`
/// (UTC when unset).
#[derive(Debug, Clone, Default, Validate)]
pub struct InterviewForm {
    #[validate(required)]
    pub date: Option<NaiveDate>,
    #[validate(required)]
    pub time: Option<NaiveTime>,
    #[validate(required, url)]
    pub meeting_link: Option<String>,
    pub notes: Option<String>,
    pub utc_offset: Option<FixedOffset>,
}

impl InterviewForm {
    /// Builds the form from raw text inputs. Blank inputs stay unset so
    /// validation reports them as missing.
    pub fn from_input(date: &str, time: &str, meeting_link: &str) -> Result<Self> {
        let date = match date.trim() {
            "" => None,
            raw => Some(parse_date(raw)?),
        };
        let time = match time.trim() {
            "" => None,
            raw => Some(parse_time(raw)?),
        };
        let meeting_link = Some(meeting_link.trim().to_string()).filter(|l| !l.is_empty());
        Ok(Self {
            date,
            time,
            meeting_link,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Validate)]
pub struct DisqualificationForm {
    pub stage: Stage,
    #[validate(custom(function = "non_blank"))]
    pub status: String,
    #[validate(custom(function = "non_blank"))]
    pub reason: String,
    pub feedback: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCandidatePayload {
    #[validate(custom(function = "non_blank"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[validate(url)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
}

/// Placeholder candidate generated from another source (sourcing sheet, referral, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TempCandidatePayload {
    #[validate(custom(function = "non_blank"))]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Body of the add-candidate call; exactly one of the three shapes is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddCandidatePayload {
    #[serde(rename_all = "camelCase")]
    Existing { candidate_id: String },
    New { candidate: NewCandidatePayload },
    #[serde(rename_all = "camelCase")]
    Temporary { temp_candidate: TempCandidatePayload },
}

impl Validate for AddCandidatePayload {
    fn validate(&self) -> std::result::Result<(), validator::ValidationErrors> {
        match self {
            AddCandidatePayload::Existing { candidate_id } => {
                let mut errors = validator::ValidationErrors::new();
                if let Err(err) = non_blank(candidate_id) {
                    errors.add("candidate_id", err);
                    return Err(errors);
                }
                Ok(())
            }
            AddCandidatePayload::New { candidate } => candidate.validate(),
            AddCandidatePayload::Temporary { temp_candidate } => temp_candidate.validate(),
        }
    }
}

/// Completes a temporary candidate's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConvertCandidateForm {
    #[validate(custom(function = "non_blank"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    #[validate(url)]
    pub resume_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertCandidatePayload {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    pub status: String,
    pub stage: Stage,
}

impl ConvertCandidatePayload {
    pub fn from_form(form: ConvertCandidateForm, stage: Stage, status: impl Into<String>) -> Self {
        Self {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone,
            location: form.location,
            resume_url: form.resume_url,
            status: status.into(),
            stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn stage_payload_omits_missing_interview_fields() {
        let payload = UpdateStagePayload {
            new_stage: Stage::ClientReview,
            interview_date: None,
            interview_meeting_link: None,
            notes: Some("strong profile".into()),
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({ "newStage": "Client Review", "notes": "strong profile" })
        );
    }

    #[test]
    fn add_candidate_payload_shapes() {
        let existing = AddCandidatePayload::Existing {
            candidate_id: "c9".into(),
        };
        assert_eq!(serde_json::to_value(&existing).unwrap(), json!({ "candidateId": "c9" }));

        let temp = AddCandidatePayload::Temporary {
            temp_candidate: TempCandidatePayload {
                name: "Referral".into(),
                source: Some("linkedin".into()),
                phone: None,
            },
        };
        assert_eq!(
            serde_json::to_value(&temp).unwrap(),
            json!({ "tempCandidate": { "name": "Referral", "source": "linkedin" } })
        );
    }

    #[test]
    fn interview_form_requires_every_field() {
        let mut form = InterviewForm {
            date: NaiveDate::from_ymd_opt(2026, 11, 2),
            time: None,
            meeting_link: Some("https://meet.example.com/x".into()),
            ..Default::default()
        };
        assert_err!(form.validate());
        form.time = NaiveTime::from_hms_opt(10, 0, 0);
        assert_ok!(form.validate());
        form.meeting_link = Some("not a link".into());
        assert_err!(form.validate());
    }

    #[test]
    fn interview_form_from_text_inputs() {
        let form = InterviewForm::from_input("2026-11-02", " 14:30 ", "").unwrap();
        assert_eq!(form.date, NaiveDate::from_ymd_opt(2026, 11, 2));
        assert_eq!(form.time, NaiveTime::from_hms_opt(14, 30, 0));
        assert!(form.meeting_link.is_none());
        assert_err!(form.validate());

        assert!(InterviewForm::from_input("next tuesday", "14:30", "https://x.io").is_err());
    }

    #[test]
    fn blank_ids_and_names_are_rejected() {
        let existing = AddCandidatePayload::Existing {
            candidate_id: "  ".into(),
        };
        assert_err!(existing.validate());

        let new = AddCandidatePayload::New {
            candidate: NewCandidatePayload {
                name: "Aziz".into(),
                email: "aziz@example.com".into(),
                phone: None,
                location: None,
                resume_url: None,
            },
        };
        assert_ok!(new.validate());
    }
}
