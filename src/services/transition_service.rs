use std::sync::Arc;

use chrono::{Offset, Utc};
use tracing::{error, info, warn};

use crate::dto::transition_dto::{
    AddCandidatePayload, ConvertCandidateForm, ConvertCandidatePayload, DisqualificationForm,
    InterviewForm, UpdateStagePayload, UpdateStatusPayload,
};
use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::models::dialog::{DialogState, PendingStageChange, PendingStatusChange};
use crate::models::stage::{same_status, Stage, StageDefinition, STATUS_DISQUALIFIED};
use crate::services::pipeline_service::PipelineApi;
use crate::services::pipeline_store::PipelineStore;
use crate::utils::time::combine_date_time;
use crate::utils::validation::{
    validate, validate_status_for_stage, validate_temp_candidate_stage_change,
    validate_temp_candidate_status_change, GuardOutcome,
};

/// One committed backend mutation.
enum Mutation {
    Stage {
        candidate_id: String,
        payload: UpdateStagePayload,
    },
    Status {
        candidate_id: String,
        payload: UpdateStatusPayload,
    },
    Remove {
        candidate_id: String,
    },
    Add {
        payload: AddCandidatePayload,
    },
    Convert {
        candidate_id: String,
        payload: ConvertCandidatePayload,
    },
}

impl Mutation {
    fn label(&self) -> &'static str {
        match self {
            Mutation::Stage { .. } => "stage update",
            Mutation::Status { .. } => "status update",
            Mutation::Remove { .. } => "candidate removal",
            Mutation::Add { .. } => "candidate addition",
            Mutation::Convert { .. } => "candidate conversion",
        }
    }
}

/// Drives the dialogs of one pipeline screen. Guards run before any dialog
/// opens; backend calls happen only on confirm or form submit.
pub struct TransitionDispatcher {
    pipeline_id: String,
    api: Arc<dyn PipelineApi>,
    store: Arc<PipelineStore>,
    state: DialogState,
}

impl TransitionDispatcher {
    pub fn new(
        pipeline_id: impl Into<String>,
        api: Arc<dyn PipelineApi>,
        store: Arc<PipelineStore>,
    ) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            api,
            store,
            state: DialogState::Idle,
        }
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn state(&self) -> &DialogState {
        &self.state
    }

    fn stage_definition(&self, stage: Stage) -> StageDefinition {
        self.store
            .cached(&self.pipeline_id)
            .map(|job| job.stage_definition(stage))
            .unwrap_or_else(|| StageDefinition::new(stage))
    }

    fn block(&mut self, candidate: &Candidate, reason: String) -> &DialogState {
        info!(candidate_id = %candidate.id, %reason, "Temporary candidate transition blocked");
        self.state = DialogState::ShowingTempAlert {
            candidate_name: candidate.display_name().to_string(),
            message: reason,
        };
        &self.state
    }

    fn block_status(&mut self, candidate: &Candidate, reason: String) -> &DialogState {
        info!(candidate_id = %candidate.id, %reason, "Status outside stage set");
        self.state = DialogState::ShowingBlockedAlert {
            candidate_name: candidate.display_name().to_string(),
            message: reason,
        };
        &self.state
    }

    pub fn request_stage_change(&mut self, candidate: &Candidate, new_stage: Stage) -> &DialogState {
        if candidate.current_stage == new_stage {
            self.state = DialogState::Idle;
            return &self.state;
        }

        match validate_temp_candidate_stage_change(candidate) {
            GuardOutcome::Blocked { reason } => return self.block(candidate, reason),
            // Conversion is only ever triggered by a status change.
            GuardOutcome::RedirectToConversion | GuardOutcome::Allowed => {}
        }

        let pending = PendingStageChange {
            candidate: candidate.clone(),
            from: candidate.current_stage,
            to: new_stage,
        };
        self.state = if new_stage.requires_interview_details() {
            DialogState::ShowingInterviewForm(pending)
        } else {
            DialogState::ConfirmingStage(pending)
        };
        &self.state
    }

    pub fn request_status_change(&mut self, candidate: &Candidate, new_status: &str) -> &DialogState {
        let new_status = new_status.trim();
        if new_status.is_empty() || same_status(&candidate.status, new_status) {
            self.state = DialogState::Idle;
            return &self.state;
        }

        let pending = PendingStatusChange {
            candidate: candidate.clone(),
            stage: candidate.current_stage,
            from: candidate.status.clone(),
            to: new_status.to_string(),
        };

        match validate_temp_candidate_status_change(candidate, new_status) {
            GuardOutcome::Blocked { reason } => return self.block(candidate, reason),
            GuardOutcome::RedirectToConversion => {
                self.state = DialogState::ShowingConversionForm(pending);
                return &self.state;
            }
            GuardOutcome::Allowed => {}
        }

        if same_status(new_status, STATUS_DISQUALIFIED) {
            self.state = DialogState::ConfirmingDisqualification(pending);
            return &self.state;
        }

        let definition = self.stage_definition(candidate.current_stage);
        match validate_status_for_stage(&definition, new_status) {
            GuardOutcome::Blocked { reason } => return self.block_status(candidate, reason),
            GuardOutcome::RedirectToConversion | GuardOutcome::Allowed => {}
        }

        self.state = DialogState::ConfirmingStatus(pending);
        &self.state
    }

    pub fn request_removal(&mut self, candidate: &Candidate) -> &DialogState {
        self.state = DialogState::ConfirmingRemoval {
            candidate: candidate.clone(),
        };
        &self.state
    }

    /// Commits the pending plain stage change, status change or removal.
    pub async fn confirm(&mut self, notes: Option<String>) -> Result<&DialogState> {
        let notes = notes.filter(|n| !n.trim().is_empty());
        let mutation = match &self.state {
            DialogState::ConfirmingStage(p) => Mutation::Stage {
                candidate_id: p.candidate.id.clone(),
                payload: UpdateStagePayload {
                    new_stage: p.to,
                    interview_date: None,
                    interview_meeting_link: None,
                    notes,
                },
            },
            DialogState::ConfirmingStatus(p) => Mutation::Status {
                candidate_id: p.candidate.id.clone(),
                payload: UpdateStatusPayload::plain(p.stage, p.to.clone(), notes),
            },
            DialogState::ConfirmingRemoval { candidate } => Mutation::Remove {
                candidate_id: candidate.id.clone(),
            },
            other => {
                return Err(Error::InvalidState(format!(
                    "nothing to confirm while {}",
                    other.kind()
                )))
            }
        };
        Ok(self.commit(mutation).await)
    }

    /// Submits the interview form. An incomplete form keeps the dialog open
    /// and nothing is sent.
    pub async fn submit_interview(&mut self, form: InterviewForm) -> Result<&DialogState> {
        let DialogState::ShowingInterviewForm(pending) = &self.state else {
            return Err(Error::InvalidState(format!(
                "interview form is not open ({})",
                self.state.kind()
            )));
        };
        validate(&form)?;

        let (Some(date), Some(time), Some(link)) = (form.date, form.time, form.meeting_link) else {
            return Err(Error::Internal("validated interview form is incomplete".to_string()));
        };
        let offset = form.utc_offset.unwrap_or_else(|| Utc.fix());
        let mutation = Mutation::Stage {
            candidate_id: pending.candidate.id.clone(),
            payload: UpdateStagePayload {
                new_stage: pending.to,
                interview_date: Some(combine_date_time(date, time, offset)?),
                interview_meeting_link: Some(link.trim().to_string()),
                notes: form.notes.filter(|n| !n.trim().is_empty()),
            },
        };
        Ok(self.commit(mutation).await)
    }

    pub async fn submit_disqualification(
        &mut self,
        form: DisqualificationForm,
    ) -> Result<&DialogState> {
        let DialogState::ConfirmingDisqualification(pending) = &self.state else {
            return Err(Error::InvalidState(format!(
                "disqualification form is not open ({})",
                self.state.kind()
            )));
        };
        validate(&form)?;

        let mutation = Mutation::Status {
            candidate_id: pending.candidate.id.clone(),
            payload: UpdateStatusPayload {
                status: STATUS_DISQUALIFIED.to_string(),
                stage: pending.stage,
                notes: form.notes.filter(|n| !n.trim().is_empty()),
                disqualification_stage: Some(form.stage),
                disqualification_status: Some(form.status.trim().to_string()),
                disqualification_reason: Some(form.reason.trim().to_string()),
                disqualification_feedback: form.feedback.filter(|f| !f.trim().is_empty()),
            },
        };
        Ok(self.commit(mutation).await)
    }

    /// Prefilled disqualification form for the open dialog: the snapshot
    /// defaults to the candidate's current stage and status.
    pub fn disqualification_form(&self) -> Option<DisqualificationForm> {
        match &self.state {
            DialogState::ConfirmingDisqualification(p) => Some(DisqualificationForm {
                stage: p.stage,
                status: p.from.clone(),
                reason: String::new(),
                feedback: None,
                notes: None,
            }),
            _ => None,
        }
    }

    pub async fn submit_conversion(&mut self, form: ConvertCandidateForm) -> Result<&DialogState> {
        let DialogState::ShowingConversionForm(pending) = &self.state else {
            return Err(Error::InvalidState(format!(
                "conversion form is not open ({})",
                self.state.kind()
            )));
        };
        validate(&form)?;

        let mutation = Mutation::Convert {
            candidate_id: pending.candidate.id.clone(),
            payload: ConvertCandidatePayload::from_form(form, pending.stage, pending.to.clone()),
        };
        Ok(self.commit(mutation).await)
    }

    /// Adds an existing, new or temporary candidate. Allowed only while no
    /// dialog is open.
    pub async fn add_candidate(&mut self, payload: AddCandidatePayload) -> Result<&DialogState> {
        if !self.state.is_idle() {
            return Err(Error::InvalidState(format!(
                "cannot add a candidate while {}",
                self.state.kind()
            )));
        }
        validate(&payload)?;
        Ok(self.commit(Mutation::Add { payload }).await)
    }

    pub fn cancel(&mut self) -> &DialogState {
        self.state = DialogState::Idle;
        &self.state
    }

    /// Closes an alert. Same as `cancel`, named for the alert dialogs.
    pub fn dismiss(&mut self) -> &DialogState {
        self.cancel()
    }

    async fn commit(&mut self, mutation: Mutation) -> &DialogState {
        let label = mutation.label();
        let result = match mutation {
            Mutation::Stage {
                candidate_id,
                payload,
            } => {
                self.api
                    .update_stage(&self.pipeline_id, &candidate_id, payload)
                    .await
            }
            Mutation::Status {
                candidate_id,
                payload,
            } => {
                self.api
                    .update_status(&self.pipeline_id, &candidate_id, payload)
                    .await
            }
            Mutation::Remove { candidate_id } => {
                self.api
                    .remove_candidate(&self.pipeline_id, &candidate_id)
                    .await
            }
            Mutation::Add { payload } => self.api.add_candidate(&self.pipeline_id, payload).await,
            Mutation::Convert {
                candidate_id,
                payload,
            } => {
                self.api
                    .convert_temp_candidate(&self.pipeline_id, &candidate_id, payload)
                    .await
            }
        };

        match result {
            Ok(()) => {
                info!(pipeline_id = %self.pipeline_id, action = label, "Pipeline mutation succeeded");
                self.state = DialogState::Idle;
                self.store.invalidate(&self.pipeline_id);
                if let Err(err) = self.store.refetch(&self.pipeline_id).await {
                    warn!(pipeline_id = %self.pipeline_id, action = label, error = %err, "Pipeline refetch failed");
                }
            }
            Err(err) => {
                error!(pipeline_id = %self.pipeline_id, action = label, error = %err, "Pipeline mutation failed");
                self.state = DialogState::ShowingError {
                    message: err.user_message(),
                };
            }
        }
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::fixtures::{candidate, temp_candidate};
    use crate::models::job::fixtures::job;
    use crate::services::pipeline_service::MockPipelineApi;
    use chrono::{NaiveDate, NaiveTime};
    use tokio_test::assert_err;

    fn dispatcher(api: MockPipelineApi) -> TransitionDispatcher {
        let api: Arc<dyn PipelineApi> = Arc::new(api);
        let store = Arc::new(PipelineStore::new(api.clone(), None));
        TransitionDispatcher::new("pipe-1", api, store)
    }

    fn expect_refetch(api: &mut MockPipelineApi, times: usize) {
        api.expect_fetch_pipeline()
            .withf(|id| id == "pipe-1")
            .times(times)
            .returning(|_| Ok(Some(job())));
    }

    #[tokio::test]
    async fn temp_candidate_stage_change_never_reaches_backend() {
        let mut api = MockPipelineApi::new();
        api.expect_update_stage().never();
        let mut dispatcher = dispatcher(api);
        let temp = temp_candidate("t1", Stage::Sourcing, "Pending");

        for stage in [Stage::Screening, Stage::Interview, Stage::Hired] {
            let state = dispatcher.request_stage_change(&temp, stage);
            assert!(matches!(state, DialogState::ShowingTempAlert { candidate_name, .. } if candidate_name == "Candidate t1"));
            assert_err!(dispatcher.confirm(None).await);
            dispatcher.dismiss();
        }
    }

    #[tokio::test]
    async fn temp_candidate_cv_received_opens_conversion() {
        let mut api = MockPipelineApi::new();
        api.expect_update_status().never();
        api.expect_convert_temp_candidate()
            .withf(|pipeline_id, candidate_id, payload| {
                pipeline_id == "pipe-1"
                    && candidate_id == "t1"
                    && payload.status == "CV Received"
                    && payload.stage == Stage::Sourcing
                    && payload.email == "farrukh@example.com"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        expect_refetch(&mut api, 1);
        let mut dispatcher = dispatcher(api);
        let temp = temp_candidate("t1", Stage::Sourcing, "Communication Sent");

        let state = dispatcher.request_status_change(&temp, "CV Received");
        assert!(matches!(state, DialogState::ShowingConversionForm(_)));
        assert_err!(dispatcher.confirm(None).await);

        let state = dispatcher
            .submit_conversion(ConvertCandidateForm {
                name: "Farrukh".into(),
                email: " farrukh@example.com ".into(),
                phone: None,
                location: None,
                resume_url: None,
            })
            .await;
        // the padded email fails validation before anything is sent
        assert!(matches!(state, Err(Error::Validation(_))));
        assert!(matches!(dispatcher.state(), DialogState::ShowingConversionForm(_)));

        let state = dispatcher
            .submit_conversion(ConvertCandidateForm {
                name: "Farrukh".into(),
                email: "farrukh@example.com".into(),
                phone: None,
                location: None,
                resume_url: Some("https://files.example.com/cv.pdf".into()),
            })
            .await
            .unwrap();
        assert!(state.is_idle());
    }

    #[tokio::test]
    async fn temp_candidate_other_status_is_blocked() {
        let mut api = MockPipelineApi::new();
        api.expect_update_status().never();
        let mut dispatcher = dispatcher(api);
        let temp = temp_candidate("t1", Stage::Sourcing, "Pending");

        let state = dispatcher.request_status_change(&temp, "Disqualified");
        assert!(matches!(state, DialogState::ShowingTempAlert { .. }));
    }

    #[tokio::test]
    async fn interview_stage_waits_for_date_and_link() {
        let mut api = MockPipelineApi::new();
        api.expect_update_stage()
            .withf(|pipeline_id, candidate_id, payload| {
                pipeline_id == "pipe-1"
                    && candidate_id == "c2"
                    && payload.new_stage == Stage::Interview
                    && payload.interview_meeting_link.as_deref()
                        == Some("https://meet.example.com/c2")
                    && payload.interview_date.map(|d| d.to_rfc3339()).as_deref()
                        == Some("2026-11-02T10:00:00+00:00")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        expect_refetch(&mut api, 1);
        let mut dispatcher = dispatcher(api);
        let c2 = candidate("c2", Stage::Screening, "Shortlisted");

        let state = dispatcher.request_stage_change(&c2, Stage::Interview);
        assert!(matches!(state, DialogState::ShowingInterviewForm(_)));
        assert!(matches!(
            dispatcher.confirm(None).await,
            Err(Error::InvalidState(_))
        ));

        let missing_date = InterviewForm {
            meeting_link: Some("https://meet.example.com/c2".into()),
            ..Default::default()
        };
        assert!(matches!(
            dispatcher.submit_interview(missing_date).await,
            Err(Error::Validation(_))
        ));
        let missing_link = InterviewForm {
            date: NaiveDate::from_ymd_opt(2026, 11, 2),
            time: NaiveTime::from_hms_opt(10, 0, 0),
            ..Default::default()
        };
        assert!(matches!(
            dispatcher.submit_interview(missing_link).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(dispatcher.state(), DialogState::ShowingInterviewForm(_)));

        let complete = InterviewForm {
            date: NaiveDate::from_ymd_opt(2026, 11, 2),
            time: NaiveTime::from_hms_opt(10, 0, 0),
            meeting_link: Some("https://meet.example.com/c2".into()),
            ..Default::default()
        };
        let state = dispatcher.submit_interview(complete).await.unwrap();
        assert!(state.is_idle());
        assert!(dispatcher.store.cached("pipe-1").is_some());
    }

    #[tokio::test]
    async fn disqualification_requires_reason() {
        let mut api = MockPipelineApi::new();
        api.expect_update_status()
            .withf(|_, candidate_id, payload| {
                candidate_id == "c2"
                    && payload.status == "Disqualified"
                    && payload.stage == Stage::Screening
                    && payload.disqualification_stage == Some(Stage::Screening)
                    && payload.disqualification_status.as_deref() == Some("Shortlisted")
                    && payload.disqualification_reason.as_deref() == Some("Salary mismatch")
                    && payload.disqualification_feedback.is_none()
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        expect_refetch(&mut api, 1);
        let mut dispatcher = dispatcher(api);
        let c2 = candidate("c2", Stage::Screening, "Shortlisted");

        let state = dispatcher.request_status_change(&c2, "disqualified");
        assert!(matches!(state, DialogState::ConfirmingDisqualification(_)));

        let mut form = dispatcher.disqualification_form().unwrap();
        assert_eq!(form.status, "Shortlisted");
        form.reason = "   ".into();
        assert!(matches!(
            dispatcher.submit_disqualification(form.clone()).await,
            Err(Error::Validation(_))
        ));

        form.reason = " Salary mismatch ".into();
        form.feedback = Some("".into());
        let state = dispatcher.submit_disqualification(form).await.unwrap();
        assert!(state.is_idle());
    }

    #[tokio::test]
    async fn plain_stage_change_confirms_then_refetches() {
        let mut api = MockPipelineApi::new();
        api.expect_update_stage()
            .withf(|_, candidate_id, payload| {
                candidate_id == "c1"
                    && payload.new_stage == Stage::Screening
                    && payload.notes.as_deref() == Some("called twice")
                    && payload.interview_date.is_none()
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        expect_refetch(&mut api, 1);
        let mut dispatcher = dispatcher(api);
        let c1 = candidate("c1", Stage::Sourcing, "Pending");

        let state = dispatcher.request_stage_change(&c1, Stage::Screening);
        assert_eq!(
            state.prompt().as_deref(),
            Some("Move Candidate c1 from Sourcing to Screening?")
        );
        let state = dispatcher.confirm(Some("called twice".into())).await.unwrap();
        assert!(state.is_idle());
        assert_eq!(
            dispatcher.store.snapshot("pipe-1").data.map(|j| j.candidates.len()),
            Some(3)
        );
    }

    #[tokio::test]
    async fn same_stage_or_status_is_a_no_op() {
        let mut dispatcher = dispatcher(MockPipelineApi::new());
        let c1 = candidate("c1", Stage::Sourcing, "Pending");

        assert!(dispatcher.request_stage_change(&c1, Stage::Sourcing).is_idle());
        assert!(dispatcher.request_status_change(&c1, " pending").is_idle());
        assert!(dispatcher.request_status_change(&c1, "").is_idle());
    }

    #[tokio::test]
    async fn status_outside_stage_set_is_blocked() {
        let mut api = MockPipelineApi::new();
        api.expect_update_status().never();
        let mut dispatcher = dispatcher(api);
        let c1 = candidate("c1", Stage::Sourcing, "Pending");

        let state = dispatcher.request_status_change(&c1, "Client Approved");
        match state {
            DialogState::ShowingBlockedAlert { message, .. } => {
                assert!(message.contains("Sourcing"))
            }
            other => panic!("expected alert, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn backend_failure_shows_error_and_skips_refetch() {
        let mut api = MockPipelineApi::new();
        api.expect_update_status()
            .times(1)
            .returning(|_, _, _| {
                Err(Error::Api {
                    status: 409,
                    message: "Candidate was moved by someone else".into(),
                })
            });
        api.expect_fetch_pipeline().never();
        let mut dispatcher = dispatcher(api);
        let c1 = candidate("c1", Stage::Sourcing, "Pending");

        dispatcher.request_status_change(&c1, "Interested");
        let state = dispatcher.confirm(None).await.unwrap();
        assert_eq!(
            state,
            &DialogState::ShowingError {
                message: "Candidate was moved by someone else".into()
            }
        );
        assert!(dispatcher.store.cached("pipe-1").is_none());
        assert!(dispatcher.dismiss().is_idle());
    }

    #[tokio::test]
    async fn removal_and_addition_refetch() {
        let mut api = MockPipelineApi::new();
        api.expect_remove_candidate()
            .withf(|pipeline_id, candidate_id| pipeline_id == "pipe-1" && candidate_id == "c1")
            .times(1)
            .returning(|_, _| Ok(()));
        api.expect_add_candidate()
            .withf(|_, payload| {
                payload
                    == &AddCandidatePayload::Existing {
                        candidate_id: "c7".into(),
                    }
            })
            .times(1)
            .returning(|_, _| Ok(()));
        expect_refetch(&mut api, 2);
        let mut dispatcher = dispatcher(api);
        let c1 = candidate("c1", Stage::Sourcing, "Pending");

        dispatcher.request_removal(&c1);
        assert!(dispatcher.confirm(None).await.unwrap().is_idle());

        let state = dispatcher
            .add_candidate(AddCandidatePayload::Existing {
                candidate_id: "c7".into(),
            })
            .await
            .unwrap();
        assert!(state.is_idle());
    }

    #[tokio::test]
    async fn add_candidate_rejected_while_dialog_open() {
        let mut api = MockPipelineApi::new();
        api.expect_add_candidate().never();
        let mut dispatcher = dispatcher(api);
        let c1 = candidate("c1", Stage::Sourcing, "Pending");

        dispatcher.request_removal(&c1);
        let result = dispatcher
            .add_candidate(AddCandidatePayload::Existing {
                candidate_id: "c7".into(),
            })
            .await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
        assert!(matches!(
            dispatcher.state(),
            DialogState::ConfirmingRemoval { .. }
        ));
    }
}
