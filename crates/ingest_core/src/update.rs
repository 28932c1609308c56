use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::{
    validate_url, Applied, ClientError, DashboardState, DashboardStep, Effect, Msg,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: DashboardState, msg: Msg) -> (DashboardState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileChosen(file) => {
            if !accepts_new_task(&state) {
                return (state, Vec::new());
            }
            if let Err(err) = state.policy().check(&file) {
                engine_info!("Rejected file before upload: {}", err);
                state.record_error(err);
                return (state, Vec::new());
            }
            let submission = state.begin_submission();
            vec![Effect::SubmitFile { submission, file }]
        }
        Msg::UrlSubmitted(raw) => {
            if !accepts_new_task(&state) {
                return (state, Vec::new());
            }
            match validate_url(&raw) {
                Ok(url) => {
                    let submission = state.begin_submission();
                    vec![Effect::SubmitUrl {
                        submission,
                        url: url.to_string(),
                    }]
                }
                Err(err) => {
                    state.record_error(err);
                    Vec::new()
                }
            }
        }
        Msg::SubmissionAccepted {
            submission,
            task_id,
        } => {
            if !state.finish_submission(submission) {
                engine_debug!("Ignoring stale submission {} ({})", submission, task_id);
                return (state, Vec::new());
            }
            engine_info!("Task {} started (submission {})", task_id, submission);
            let (subscription, replaced) = state.start_task(task_id.clone());
            let mut effects = Vec::with_capacity(2);
            // Close first so there is never a second live subscription.
            if let Some(previous) = replaced {
                effects.push(Effect::CloseSubscription {
                    subscription: previous,
                });
            }
            effects.push(Effect::Subscribe {
                subscription,
                task_id,
            });
            effects
        }
        Msg::SubmissionFailed { submission, error } => {
            if !state.finish_submission(submission) {
                return (state, Vec::new());
            }
            engine_warn!("Submission {} failed: {}", submission, error);
            let effects = auth_effects(&error);
            state.record_error(error);
            effects
        }
        Msg::Snapshot {
            subscription,
            status,
        } => {
            if !state.is_current_subscription(subscription) {
                engine_debug!("Dropping snapshot from stale subscription {}", subscription);
                return (state, Vec::new());
            }
            let final_snapshot = status.is_complete;
            match state.machine_mut().apply(status) {
                Ok(Applied::Completed) => {
                    let closed = state.complete_task();
                    closed
                        .map(|subscription| Effect::CloseSubscription { subscription })
                        .into_iter()
                        .collect()
                }
                Ok(Applied::Updated | Applied::Ignored) => Vec::new(),
                // The server stops streaming after its final snapshot, so a
                // rejected one leaves nothing to wait for.
                Err(violation) if final_snapshot => {
                    engine_warn!(
                        "Final snapshot on stream {} rejected: {}",
                        subscription,
                        violation
                    );
                    let error = ClientError::from(violation);
                    state
                        .machine_mut()
                        .mark_stalled(format!("stream ended on a rejected final update: {error}"));
                    let closed = state.release_subscription();
                    state.record_error(error);
                    closed
                        .map(|subscription| Effect::CloseSubscription { subscription })
                        .into_iter()
                        .collect()
                }
                // Already recorded by the machine; the last good snapshot stays visible.
                Err(_) => Vec::new(),
            }
        }
        Msg::StreamFailed {
            subscription,
            error,
        } => {
            if !state.is_current_subscription(subscription) {
                return (state, Vec::new());
            }
            if let ClientError::Protocol(message) = &error {
                engine_warn!("Undecodable snapshot on stream {}: {}", subscription, message);
                state.machine_mut().record_protocol_error(message.clone());
                return (state, Vec::new());
            }
            engine_warn!("Progress stream {} ended: {}", subscription, error);
            state.release_subscription();
            state.machine_mut().mark_stalled(error.to_string());
            let effects = auth_effects(&error);
            state.record_error(error);
            effects
        }
        Msg::CustomizationFinished => {
            if state.step() == DashboardStep::Customize {
                state.set_step(DashboardStep::Complete);
            }
            Vec::new()
        }
        Msg::QuestionAsked(question) => {
            let question = question.trim().to_string();
            let Some(collection) = state.collection_name().map(ToOwned::to_owned) else {
                return (state, Vec::new());
            };
            if question.is_empty() {
                state.record_error(ClientError::Validation("question is empty".to_string()));
                return (state, Vec::new());
            }
            state.begin_question();
            vec![Effect::Ask {
                question,
                collection,
            }]
        }
        Msg::AnswerReceived(result) => match result {
            Ok(answer) => {
                state.finish_question(Some(answer));
                Vec::new()
            }
            Err(error) => {
                if !state.finish_question(None) {
                    return (state, Vec::new());
                }
                let effects = auth_effects(&error);
                state.record_error(error);
                effects
            }
        },
        Msg::ResetClicked => {
            let live = state.reset();
            live.map(|subscription| Effect::CloseSubscription { subscription })
                .into_iter()
                .collect()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn accepts_new_task(state: &DashboardState) -> bool {
    matches!(
        state.step(),
        DashboardStep::Upload | DashboardStep::Processing
    )
}

fn auth_effects(error: &ClientError) -> Vec<Effect> {
    if *error == ClientError::AuthenticationExpired {
        vec![Effect::ClearCredential]
    } else {
        Vec::new()
    }
}
