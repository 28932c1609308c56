use ingest_core::{DashboardView, ProgressView, StageRow, StageStatus};

const BAR_WIDTH: usize = 20;
const STEP_COUNT: u8 = 4;

/// Text lines for one dashboard frame.
pub fn render(view: &DashboardView) -> Vec<String> {
    let mut lines = Vec::new();

    let mut header = format!(
        "Step {}/{}: {}",
        view.step_number,
        STEP_COUNT,
        view.step.label()
    );
    if let Some(task_id) = &view.task_id {
        header.push_str(&format!(" | task {task_id}"));
    }
    if view.submitting {
        header.push_str(" | submitting...");
    }
    lines.push(header);

    if view.task_id.is_some() {
        lines.extend(render_progress(&view.progress));
    }

    if let Some(collection) = &view.collection_name {
        lines.push(format!("Collection ready: {collection}"));
    }
    if view.awaiting_answer {
        lines.push("Waiting for answer...".to_string());
    }
    if let Some(answer) = &view.last_answer {
        lines.push(format!("Answer: {answer}"));
    }
    if let Some(error) = &view.last_error {
        lines.push(format!("Error: {error}"));
    }
    if view.login_required {
        lines.push("Login required: run `ingest login <TOKEN>`".to_string());
    }

    lines
}

fn render_progress(progress: &ProgressView) -> Vec<String> {
    let mut lines = Vec::new();
    if progress.initializing {
        lines.push("  Initializing...".to_string());
    }
    lines.extend(progress.stages.iter().map(format_stage_row));
    if let Some(reason) = &progress.stalled {
        lines.push(format!("  ! progress stopped: {reason}"));
    }
    if let Some(reason) = &progress.protocol_error {
        lines.push(format!("  ! ignored malformed update: {reason}"));
    }
    lines
}

fn format_stage_row(row: &StageRow) -> String {
    let marker = match row.status {
        StageStatus::Completed => "[x]",
        StageStatus::Active => "[>]",
        StageStatus::Pending => "[ ]",
    };
    let pointer = if row.is_current { "*" } else { " " };
    let mut line = format!(
        "{pointer} {marker} {label:<22} {bar} {percent:>3}%",
        label = row.label,
        bar = progress_bar(row.percent),
        percent = row.percent
    );
    if !row.message.is_empty() {
        line.push_str("  ");
        line.push_str(&row.message);
    }
    line
}

fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}
