use std::collections::BTreeSet;

use crate::view_model::DashboardView;
use crate::{ClientError, IngestionMachine, TaskId, UploadPolicy};

pub type SubmissionId = u64;
pub type SubscriptionId = u64;

/// Macro steps of the dashboard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DashboardStep {
    #[default]
    Upload,
    Processing,
    Customize,
    Complete,
}

impl DashboardStep {
    /// 1-based position used by the step indicator.
    pub fn number(self) -> u8 {
        match self {
            DashboardStep::Upload => 1,
            DashboardStep::Processing => 2,
            DashboardStep::Customize => 3,
            DashboardStep::Complete => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DashboardStep::Upload => "Upload Content",
            DashboardStep::Processing => "Processing",
            DashboardStep::Customize => "Customize",
            DashboardStep::Complete => "Deploy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveTask {
    pub(crate) task_id: TaskId,
    /// `None` once the stream has ended on its own.
    pub(crate) subscription: Option<SubscriptionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardState {
    step: DashboardStep,
    policy: UploadPolicy,
    pending_submissions: BTreeSet<SubmissionId>,
    next_submission: SubmissionId,
    next_subscription: SubscriptionId,
    active: Option<ActiveTask>,
    collection_name: Option<String>,
    machine: IngestionMachine,
    last_error: Option<ClientError>,
    login_required: bool,
    awaiting_answer: bool,
    last_answer: Option<String>,
    dirty: bool,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: UploadPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn step(&self) -> DashboardStep {
        self.step
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn machine(&self) -> &IngestionMachine {
        &self.machine
    }

    /// The subscription currently feeding the state machine, if any.
    pub fn live_subscription(&self) -> Option<SubscriptionId> {
        self.active.as_ref().and_then(|task| task.subscription)
    }

    pub fn active_task(&self) -> Option<&TaskId> {
        self.active.as_ref().map(|task| &task.task_id)
    }

    pub fn collection_name(&self) -> Option<&str> {
        self.collection_name.as_deref()
    }

    pub fn has_pending_submission(&self) -> bool {
        !self.pending_submissions.is_empty()
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            step: self.step,
            step_number: self.step.number(),
            task_id: self.active_task().cloned(),
            collection_name: self.collection_name.clone(),
            submitting: self.has_pending_submission(),
            progress: self.machine.view(),
            last_error: self.last_error.clone(),
            login_required: self.login_required,
            awaiting_answer: self.awaiting_answer,
            last_answer: self.last_answer.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn begin_submission(&mut self) -> SubmissionId {
        self.next_submission += 1;
        let id = self.next_submission;
        self.pending_submissions.insert(id);
        self.last_error = None;
        self.mark_dirty();
        id
    }

    /// Returns false if the submission was unknown (e.g. dropped by a reset).
    pub(crate) fn finish_submission(&mut self, submission: SubmissionId) -> bool {
        let known = self.pending_submissions.remove(&submission);
        if known {
            self.mark_dirty();
        }
        known
    }

    /// Installs a new task and returns its subscription id together with the
    /// subscription it replaces, if one was still live.
    pub(crate) fn start_task(
        &mut self,
        task_id: TaskId,
    ) -> (SubscriptionId, Option<SubscriptionId>) {
        let replaced = self.live_subscription();
        self.next_subscription += 1;
        let subscription = self.next_subscription;
        self.active = Some(ActiveTask {
            task_id,
            subscription: Some(subscription),
        });
        self.machine = IngestionMachine::new();
        self.collection_name = None;
        self.last_answer = None;
        self.step = DashboardStep::Processing;
        self.mark_dirty();
        (subscription, replaced)
    }

    pub(crate) fn is_current_subscription(&self, subscription: SubscriptionId) -> bool {
        self.live_subscription() == Some(subscription)
    }

    pub(crate) fn machine_mut(&mut self) -> &mut IngestionMachine {
        self.mark_dirty();
        &mut self.machine
    }

    /// Drops the subscription reference, keeping the task on screen.
    pub(crate) fn release_subscription(&mut self) -> Option<SubscriptionId> {
        self.active.as_mut().and_then(|task| task.subscription.take())
    }

    /// Moves to the customization step, keeping the task id only as the
    /// collection name.
    pub(crate) fn complete_task(&mut self) -> Option<SubscriptionId> {
        let task = self.active.take();
        let subscription = task.as_ref().and_then(|task| task.subscription);
        self.collection_name = task.map(|task| task.task_id.into_string());
        self.step = DashboardStep::Customize;
        self.mark_dirty();
        subscription
    }

    pub(crate) fn set_step(&mut self, step: DashboardStep) {
        self.step = step;
        self.mark_dirty();
    }

    pub(crate) fn record_error(&mut self, error: ClientError) {
        if error.is_auth() {
            self.login_required = true;
        }
        self.last_error = Some(error);
        self.mark_dirty();
    }

    pub(crate) fn begin_question(&mut self) {
        self.awaiting_answer = true;
        self.last_answer = None;
        self.last_error = None;
        self.mark_dirty();
    }

    pub(crate) fn finish_question(&mut self, answer: Option<String>) -> bool {
        if !self.awaiting_answer {
            return false;
        }
        self.awaiting_answer = false;
        self.last_answer = answer;
        self.mark_dirty();
        true
    }

    /// Back to the upload step; returns the live subscription that must be closed.
    pub(crate) fn reset(&mut self) -> Option<SubscriptionId> {
        let live = self.live_subscription();
        let policy = std::mem::take(&mut self.policy);
        let next_submission = self.next_submission;
        let next_subscription = self.next_subscription;
        *self = Self {
            policy,
            next_submission,
            next_subscription,
            ..Self::default()
        };
        self.mark_dirty();
        live
    }
}
