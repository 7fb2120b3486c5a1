use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, Disqualification, InterviewDetails};
use crate::models::job::Job;
use crate::models::stage::{Stage, StageDefinition, STATUS_PENDING};

/// Some backend routes wrap the payload as `{ "success": true, "data": ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiEnvelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> ApiEnvelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            ApiEnvelope::Wrapped { data } => data,
            ApiEnvelope::Bare(data) => data,
        }
    }
}

/// Document-store backends send `_id` next to (or instead of) `id`, so every
/// alternate key gets its own field and is resolved during mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "_id")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub stages: Vec<StageResponse>,
    #[serde(default)]
    pub candidates: Vec<PipelineCandidateResponse>,
}

/// Stages arrive either as plain labels or as `{ name, statuses }` objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageResponse {
    Label(String),
    Detailed {
        name: String,
        #[serde(default)]
        statuses: Vec<String>,
    },
}

/// One pipeline entry. `candidateId` references the candidate, `_id` is the
/// entry itself; both may be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineCandidateResponse {
    #[serde(default)]
    pub candidate_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "_id")]
    pub object_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub current_stage: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub resume: Option<String>,
    #[serde(default)]
    pub is_temp_candidate: bool,
    #[serde(default)]
    pub is_temp: bool,
    #[serde(default)]
    pub interview_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub interview_meeting_link: Option<String>,
    #[serde(default)]
    pub disqualification: Option<DisqualificationResponse>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisqualificationResponse {
    pub stage: String,
    pub status: String,
    pub reason: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

fn parse_stage(raw: &str) -> Result<Stage> {
    raw.parse::<Stage>().map_err(Error::UnexpectedResponse)
}

/// First non-blank value among the alternate keys of one field.
fn first_present<const N: usize>(values: [Option<String>; N]) -> Option<String> {
    values.into_iter().flatten().find(|v| !v.trim().is_empty())
}

impl TryFrom<StageResponse> for StageDefinition {
    type Error = Error;

    fn try_from(value: StageResponse) -> Result<Self> {
        match value {
            StageResponse::Label(name) => Ok(StageDefinition::new(parse_stage(&name)?)),
            StageResponse::Detailed { name, statuses } => Ok(StageDefinition::with_statuses(
                parse_stage(&name)?,
                statuses,
            )),
        }
    }
}

impl TryFrom<PipelineCandidateResponse> for Candidate {
    type Error = Error;

    fn try_from(value: PipelineCandidateResponse) -> Result<Self> {
        let interview = match (value.interview_date, value.interview_meeting_link) {
            (Some(scheduled_at), Some(link)) if !link.trim().is_empty() => Some(InterviewDetails {
                scheduled_at,
                meeting_link: link,
            }),
            _ => None,
        };
        let disqualification = value
            .disqualification
            .map(|d| -> Result<Disqualification> {
                Ok(Disqualification {
                    stage: parse_stage(&d.stage)?,
                    status: d.status,
                    reason: d.reason,
                    feedback: d.feedback,
                })
            })
            .transpose()?;

        let id = first_present([value.candidate_id, value.id, value.object_id]).ok_or_else(|| {
            Error::UnexpectedResponse(format!("pipeline candidate `{}` has no id", value.name))
        })?;
        let stage = first_present([value.current_stage, value.stage]).ok_or_else(|| {
            Error::UnexpectedResponse(format!("pipeline candidate `{}` has no stage", id))
        })?;

        Ok(Candidate {
            id,
            name: value.name,
            email: value.email.filter(|e| !e.trim().is_empty()),
            phone: value.phone.filter(|p| !p.trim().is_empty()),
            location: value.location,
            current_stage: parse_stage(&stage)?,
            status: value
                .status
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| STATUS_PENDING.to_string()),
            resume_url: first_present([value.resume_url, value.resume]),
            is_temp_candidate: value.is_temp_candidate || value.is_temp,
            interview,
            disqualification,
            notes: value.notes,
            updated_at: value.updated_at,
        })
    }
}

impl TryFrom<PipelineResponse> for Job {
    type Error = Error;

    /// An entry the screen cannot place (unknown stage, missing id) is logged
    /// and left off the board; the rest of the pipeline still loads.
    fn try_from(value: PipelineResponse) -> Result<Self> {
        let id = first_present([value.id, value.object_id])
            .ok_or_else(|| Error::UnexpectedResponse("pipeline payload has no id".to_string()))?;
        let title = first_present([value.title, value.job_title]).ok_or_else(|| {
            Error::UnexpectedResponse(format!("pipeline `{}` has no job title", id))
        })?;

        let mut stages: Vec<StageDefinition> = value
            .stages
            .into_iter()
            .filter_map(|raw| match StageDefinition::try_from(raw) {
                Ok(def) => Some(def),
                Err(err) => {
                    warn!(pipeline_id = %id, error = %err, "Skipping stage definition");
                    None
                }
            })
            .collect();
        if stages.is_empty() {
            stages = StageDefinition::default_funnel();
        } else {
            stages.sort_by_key(|def| def.stage);
        }

        let candidates = value
            .candidates
            .into_iter()
            .filter_map(|raw| match Candidate::try_from(raw) {
                Ok(candidate) => Some(candidate),
                Err(err) => {
                    warn!(pipeline_id = %id, error = %err, "Skipping pipeline candidate");
                    None
                }
            })
            .collect();

        Ok(Job {
            id,
            title,
            client_name: first_present([value.client_name, value.client]),
            stages,
            candidates,
        })
    }
}
