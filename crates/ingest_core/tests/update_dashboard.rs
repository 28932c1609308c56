use std::sync::Once;

use ingest_core::{
    update, ClientError, DashboardState, DashboardStep, Effect, FileUpload, IngestionStatus, Msg,
    StageName, StageState, StageStates, StageStatus, SubmissionId, SubscriptionId, TaskId,
    UploadPolicy,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn pdf() -> FileUpload {
    FileUpload::new("manual.pdf", "application/pdf", b"%PDF-1.7".to_vec())
}

fn status(crawling: StageStatus, progress: u8, is_complete: bool) -> IngestionStatus {
    let mut states = StageStates::default();
    states.crawling = StageState::new(crawling, progress, "fetching");
    if is_complete {
        for stage in StageName::ALL {
            *states.get_mut(stage) = StageState::new(StageStatus::Completed, 100, "");
        }
    }
    IngestionStatus {
        states,
        current_state: StageName::Crawling,
        is_complete,
    }
}

fn submission_of(effects: &[Effect]) -> SubmissionId {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::SubmitFile { submission, .. } | Effect::SubmitUrl { submission, .. } => {
                Some(*submission)
            }
            _ => None,
        })
        .expect("submit effect")
}

fn subscription_of(effects: &[Effect]) -> SubscriptionId {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Subscribe { subscription, .. } => Some(*subscription),
            _ => None,
        })
        .expect("subscribe effect")
}

/// Submits a file and has the server accept it as `task_id`.
fn start_task(state: DashboardState, task_id: &str) -> (DashboardState, Vec<Effect>) {
    let (state, effects) = update(state, Msg::FileChosen(pdf()));
    let submission = submission_of(&effects);
    update(
        state,
        Msg::SubmissionAccepted {
            submission,
            task_id: TaskId::new(task_id),
        },
    )
}

#[test]
fn file_submission_emits_effect_and_marks_submitting() {
    init_logging();
    let (mut state, effects) = update(DashboardState::new(), Msg::FileChosen(pdf()));

    assert_eq!(
        effects,
        vec![Effect::SubmitFile {
            submission: 1,
            file: pdf(),
        }]
    );
    assert_eq!(state.step(), DashboardStep::Upload);
    assert!(state.view().submitting);
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn invalid_inputs_never_reach_the_network() {
    init_logging();
    let txt = FileUpload::new("notes.txt", "text/plain", b"hello".to_vec());
    let (state, effects) = update(DashboardState::new(), Msg::FileChosen(txt));
    assert!(effects.is_empty());
    assert!(matches!(
        state.view().last_error,
        Some(ClientError::Validation(_))
    ));

    let (state, effects) = update(state, Msg::UrlSubmitted("   ".to_string()));
    assert!(effects.is_empty());
    let (state, effects) = update(state, Msg::UrlSubmitted("not a url".to_string()));
    assert!(effects.is_empty());
    assert!(!state.has_pending_submission());
}

#[test]
fn custom_policy_limits_size() {
    let policy = UploadPolicy {
        allowed_extensions: vec!["pdf".to_string()],
        max_bytes: 4,
    };
    let (state, effects) = update(DashboardState::with_policy(policy), Msg::FileChosen(pdf()));
    assert!(effects.is_empty());
    assert!(state.view().last_error.is_some());
}

#[test]
fn url_submission_is_normalized() {
    let (_state, effects) = update(
        DashboardState::new(),
        Msg::UrlSubmitted(" https://example.com ".to_string()),
    );
    assert_eq!(
        effects,
        vec![Effect::SubmitUrl {
            submission: 1,
            url: "https://example.com/".to_string(),
        }]
    );
}

#[test]
fn accepted_submission_subscribes_and_enters_processing() {
    init_logging();
    let (state, effects) = start_task(DashboardState::new(), "t1");

    assert_eq!(
        effects,
        vec![Effect::Subscribe {
            subscription: 1,
            task_id: TaskId::new("t1"),
        }]
    );
    let view = state.view();
    assert_eq!(view.step, DashboardStep::Processing);
    assert_eq!(view.step_number, 2);
    assert_eq!(view.task_id, Some(TaskId::new("t1")));
    assert!(!view.submitting);
    assert!(view.progress.initializing);
    assert_eq!(state.live_subscription(), Some(1));
}

#[test]
fn full_scenario_reaches_customize_once() {
    init_logging();
    let (state, effects) = start_task(DashboardState::new(), "t1");
    let subscription = subscription_of(&effects);

    let (state, effects) = update(
        state,
        Msg::Snapshot {
            subscription,
            status: status(StageStatus::Active, 30, false),
        },
    );
    assert!(effects.is_empty());
    let row = &state.view().progress.stages[0];
    assert_eq!((row.status, row.percent), (StageStatus::Active, 30));

    let mut second = status(StageStatus::Completed, 100, false);
    second.states.processing = StageState::new(StageStatus::Active, 10, "");
    second.current_state = StageName::Processing;
    let (state, _) = update(
        state,
        Msg::Snapshot {
            subscription,
            status: second,
        },
    );
    let view = state.view();
    assert_eq!(view.progress.protocol_error, None);
    assert_eq!(view.progress.stages[0].status, StageStatus::Completed);
    assert_eq!(view.progress.stages[1].status, StageStatus::Active);
    assert_eq!(view.progress.stages[1].percent, 10);

    let (state, effects) = update(
        state,
        Msg::Snapshot {
            subscription,
            status: status(StageStatus::Completed, 100, true),
        },
    );
    assert_eq!(effects, vec![Effect::CloseSubscription { subscription }]);
    let view = state.view();
    assert_eq!(view.step, DashboardStep::Customize);
    assert_eq!(view.task_id, None);
    assert_eq!(view.collection_name.as_deref(), Some("t1"));
    assert_eq!(state.live_subscription(), None);

    // A late terminal snapshot does nothing: the task reference is gone.
    let (state, effects) = update(
        state,
        Msg::Snapshot {
            subscription,
            status: status(StageStatus::Completed, 100, true),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.step(), DashboardStep::Customize);

    let (state, _) = update(state, Msg::CustomizationFinished);
    assert_eq!(state.step(), DashboardStep::Complete);
}

#[test]
fn malformed_snapshot_keeps_last_good_state() {
    init_logging();
    let (state, effects) = start_task(DashboardState::new(), "t1");
    let subscription = subscription_of(&effects);
    let (state, _) = update(
        state,
        Msg::Snapshot {
            subscription,
            status: status(StageStatus::Active, 30, false),
        },
    );

    let (state, effects) = update(
        state,
        Msg::StreamFailed {
            subscription,
            error: ClientError::Protocol("undecodable snapshot: missing field `states`".into()),
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.step, DashboardStep::Processing);
    assert_eq!(state.live_subscription(), Some(subscription));
    assert!(view.progress.protocol_error.is_some());
    assert_eq!(view.progress.stalled, None);
    assert_eq!(view.progress.stages[0].percent, 30);
}

#[test]
fn regressing_snapshot_is_reported_without_leaving_processing() {
    let (state, effects) = start_task(DashboardState::new(), "t1");
    let subscription = subscription_of(&effects);
    let (state, _) = update(
        state,
        Msg::Snapshot {
            subscription,
            status: status(StageStatus::Completed, 100, false),
        },
    );
    let (state, effects) = update(
        state,
        Msg::Snapshot {
            subscription,
            status: status(StageStatus::Pending, 0, false),
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.step, DashboardStep::Processing);
    assert_eq!(view.progress.stages[0].status, StageStatus::Completed);
    assert!(view.progress.protocol_error.is_some());
}

#[test]
fn rejected_final_snapshot_releases_the_subscription() {
    init_logging();
    let (state, effects) = start_task(DashboardState::new(), "t1");
    let subscription = subscription_of(&effects);
    let (state, _) = update(
        state,
        Msg::Snapshot {
            subscription,
            status: status(StageStatus::Completed, 100, false),
        },
    );
    let mut last = status(StageStatus::Active, 40, true);
    last.states.crawling = StageState::new(StageStatus::Active, 40, "");

    let (state, effects) = update(
        state,
        Msg::Snapshot {
            subscription,
            status: last,
        },
    );

    // The server sends nothing after a final snapshot.
    assert_eq!(effects, vec![Effect::CloseSubscription { subscription }]);
    assert_eq!(state.live_subscription(), None);
    assert!(!state.has_pending_submission());
    let view = state.view();
    assert_eq!(view.step, DashboardStep::Processing);
    assert!(!view.progress.complete);
    assert!(view.progress.stalled.is_some());
    assert_eq!(
        view.last_error,
        Some(ClientError::Protocol(
            "stage crawling regressed from completed to active".to_string()
        ))
    );
    assert_eq!(view.progress.stages[0].status, StageStatus::Completed);
}

#[test]
fn second_task_closes_first_subscription_before_subscribing() {
    init_logging();
    let (state, effects) = start_task(DashboardState::new(), "t1");
    let first = subscription_of(&effects);

    let (state, effects) = start_task(state, "t2");

    assert_eq!(
        effects,
        vec![
            Effect::CloseSubscription {
                subscription: first
            },
            Effect::Subscribe {
                subscription: first + 1,
                task_id: TaskId::new("t2"),
            },
        ]
    );
    assert_eq!(state.live_subscription(), Some(first + 1));
    assert_eq!(state.active_task(), Some(&TaskId::new("t2")));

    // Stragglers from the closed stream are ignored.
    let (state, effects) = update(
        state,
        Msg::Snapshot {
            subscription: first,
            status: status(StageStatus::Completed, 100, true),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.step(), DashboardStep::Processing);
    assert!(state.view().progress.initializing);
}

#[test]
fn only_one_live_subscription_across_many_submissions() {
    let mut state = DashboardState::new();
    let mut live: Vec<SubscriptionId> = Vec::new();
    for n in 0..4 {
        let (next, effects) = start_task(state, &format!("t{n}"));
        state = next;
        for effect in effects {
            match effect {
                Effect::CloseSubscription { subscription } => {
                    live.retain(|id| *id != subscription)
                }
                Effect::Subscribe { subscription, .. } => live.push(subscription),
                other => panic!("unexpected effect {other:?}"),
            }
            assert!(live.len() <= 1);
        }
    }
    assert_eq!(live, vec![4]);
}

#[test]
fn stream_failure_shows_stalled_and_stays_processing() {
    init_logging();
    let (state, effects) = start_task(DashboardState::new(), "t1");
    let subscription = subscription_of(&effects);

    let (state, effects) = update(
        state,
        Msg::StreamFailed {
            subscription,
            error: ClientError::Stalled { idle_secs: 120 },
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.step, DashboardStep::Processing);
    assert_eq!(
        view.progress.stalled.as_deref(),
        Some("no progress received for 120s")
    );
    assert_eq!(view.last_error, Some(ClientError::Stalled { idle_secs: 120 }));
    assert_eq!(state.live_subscription(), None);

    // The user restarts explicitly.
    let (state, effects) = start_task(state, "t2");
    assert_eq!(
        effects,
        vec![Effect::Subscribe {
            subscription: 2,
            task_id: TaskId::new("t2"),
        }]
    );
    assert_eq!(state.view().progress.stalled, None);
}

#[test]
fn expired_credential_is_cleared() {
    init_logging();
    let (state, effects) = update(DashboardState::new(), Msg::FileChosen(pdf()));
    let submission = submission_of(&effects);

    let (state, effects) = update(
        state,
        Msg::SubmissionFailed {
            submission,
            error: ClientError::AuthenticationExpired,
        },
    );

    assert_eq!(effects, vec![Effect::ClearCredential]);
    let view = state.view();
    assert!(view.login_required);
    assert!(!view.submitting);
    assert_eq!(view.step, DashboardStep::Upload);
}

#[test]
fn missing_credential_only_prompts_login() {
    let (state, effects) = update(
        DashboardState::new(),
        Msg::UrlSubmitted("https://example.com".into()),
    );
    let submission = submission_of(&effects);
    let (state, effects) = update(
        state,
        Msg::SubmissionFailed {
            submission,
            error: ClientError::AuthenticationRequired,
        },
    );
    assert!(effects.is_empty());
    assert!(state.view().login_required);
}

#[test]
fn reset_closes_subscription_and_drops_pending_submissions() {
    init_logging();
    let (state, effects) = start_task(DashboardState::new(), "t1");
    let subscription = subscription_of(&effects);
    let (state, effects) = update(state, Msg::FileChosen(pdf()));
    let pending = submission_of(&effects);

    let (state, effects) = update(state, Msg::ResetClicked);
    assert_eq!(effects, vec![Effect::CloseSubscription { subscription }]);
    assert_eq!(state.step(), DashboardStep::Upload);
    assert_eq!(state.live_subscription(), None);
    assert!(!state.has_pending_submission());

    // The dropped submission's acceptance arrives late and is ignored.
    let (state, effects) = update(
        state,
        Msg::SubmissionAccepted {
            submission: pending,
            task_id: TaskId::new("t2"),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.step(), DashboardStep::Upload);

    // Reset with nothing live emits nothing.
    let (_state, effects) = update(state, Msg::ResetClicked);
    assert!(effects.is_empty());
}

#[test]
fn new_uploads_are_ignored_after_completion() {
    let (state, effects) = start_task(DashboardState::new(), "t1");
    let subscription = subscription_of(&effects);
    let (state, _) = update(
        state,
        Msg::Snapshot {
            subscription,
            status: status(StageStatus::Completed, 100, true),
        },
    );

    let (state, effects) = update(state, Msg::FileChosen(pdf()));
    assert!(effects.is_empty());
    assert_eq!(state.step(), DashboardStep::Customize);
}

#[test]
fn questions_target_the_finished_collection() {
    init_logging();
    let (state, effects) = update(DashboardState::new(), Msg::QuestionAsked("hi?".into()));
    assert!(effects.is_empty(), "no collection yet");

    let (state, effects) = start_task(state, "t9");
    let subscription = subscription_of(&effects);
    let (state, _) = update(
        state,
        Msg::Snapshot {
            subscription,
            status: status(StageStatus::Completed, 100, true),
        },
    );

    let (state, effects) = update(state, Msg::QuestionAsked("  What is covered? ".into()));
    assert_eq!(
        effects,
        vec![Effect::Ask {
            question: "What is covered?".to_string(),
            collection: "t9".to_string(),
        }]
    );
    assert!(state.view().awaiting_answer);

    let (state, _) = update(state, Msg::AnswerReceived(Ok("Chapter one.".into())));
    let view = state.view();
    assert!(!view.awaiting_answer);
    assert_eq!(view.last_answer.as_deref(), Some("Chapter one."));

    let (state, effects) = update(state, Msg::QuestionAsked("   ".into()));
    assert!(effects.is_empty());
    assert!(matches!(
        state.view().last_error,
        Some(ClientError::Validation(_))
    ));
}
