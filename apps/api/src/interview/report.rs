//! Evaluation reports: generation over the full transcript, persistence, and
//! the decision-line status extractor.
//!
//! KNOWN LIMITATION: pass/fail is read from free text with a substring
//! match, not parsed. The label's *last* occurrence wins, only the first
//! line after it is inspected, and any `PASS` substring on that line counts
//! (so an unfilled `[PASS/FAIL]` placeholder reads as a pass). The model's
//! output has no schema, so this matching is kept exactly as is.

use bytes::Bytes;
use chrono::Local;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::errors::AppError;
use crate::interview::prompts::evaluation_request;
use crate::interview::session::ReportOutcome;
use crate::llm_client::{ChatMessage, ModelPurpose};
use crate::models::candidate::Candidate;
use crate::state::AppState;
use crate::storage::ArtifactKey;

pub const OVERALL_DECISION_LABEL: &str = "OVERALL DECISION:";
pub const FINAL_DECISION_LABEL: &str = "FINAL DECISION:";
pub const PASS_TOKEN: &str = "PASS";

/// Text after the last `label`, first line only, tested for `PASS`.
/// When the label is absent the first line of the whole text is tested.
pub fn extract_decision(report: &str, label: &str) -> bool {
    report
        .rsplit(label)
        .next()
        .and_then(|after| after.split('\n').next())
        .is_some_and(|line| line.contains(PASS_TOKEN))
}

/// The pass/fail signal used everywhere a candidate's status is needed.
pub fn report_passed(report: &str) -> bool {
    extract_decision(report, OVERALL_DECISION_LABEL)
}

/// Both decision lines, for the reviewer's report view.
#[derive(Debug, Serialize)]
pub struct ReportView {
    pub report: String,
    pub passed: bool,
    pub final_decision_passed: bool,
}

impl ReportView {
    pub fn from_text(report: String) -> Self {
        Self {
            passed: report_passed(&report),
            final_decision_passed: extract_decision(&report, FINAL_DECISION_LABEL),
            report,
        }
    }
}

/// Reads the stored report, if any, and extracts the decision.
/// No report yet is `false`, not an error.
pub async fn candidate_status(
    state: &AppState,
    job_title: &str,
    candidate_id: &str,
) -> Result<bool, AppError> {
    let key = ArtifactKey::report(job_title, candidate_id);
    if key.validate().is_err() {
        return Ok(false);
    }
    Ok(match state.store.get(&key).await? {
        Some(bytes) => report_passed(&String::from_utf8_lossy(&bytes)),
        None => false,
    })
}

/// The evaluation request plus the model's report for it.
pub struct GeneratedReport {
    pub request: ChatMessage,
    pub text: String,
}

/// Issues one evaluation completion over `context` (the whole conversation
/// so far) with the evaluation request appended.
pub async fn generate_report(
    state: &AppState,
    context: Vec<ChatMessage>,
    candidate: &Candidate,
    job_title: &str,
) -> Result<GeneratedReport, AppError> {
    let today = Local::now().format("%Y-%m-%d").to_string();
    let request = ChatMessage::user(evaluation_request(
        &candidate.full_name,
        &candidate.candidate_id,
        job_title,
        &today,
    ));

    let mut messages = context;
    messages.push(request.clone());

    let text = state
        .chat
        .complete(ModelPurpose::Evaluation, &messages)
        .await?;
    debug!(
        "Report generated for {}: {}...",
        candidate.candidate_id,
        text.chars().take(100).collect::<String>()
    );

    Ok(GeneratedReport { request, text })
}

/// Writes the report and links it to the candidate.
///
/// Never fails: a write error is logged and returned as `Unsaved` so the
/// session can still complete and the write can be retried later.
pub async fn persist_report(
    state: &AppState,
    job_title: &str,
    candidate_id: &str,
    text: String,
) -> ReportOutcome {
    let key = ArtifactKey::report(job_title, candidate_id);

    if let Err(e) = state.store.put(&key, Bytes::from(text.clone())).await {
        error!("Report for {candidate_id} was generated but could not be saved: {e}");
        return ReportOutcome::Unsaved {
            text,
            error: e.to_string(),
        };
    }

    if let Err(e) = state
        .candidates
        .attach_report(candidate_id, &key.to_string())
        .await
    {
        // Status is derived from the artifact, so the link is informational.
        warn!("Report saved at {key} but candidate record not updated: {e}");
    }

    let passed = report_passed(&text);
    info!("Report saved at {key} (passed: {passed})");
    ReportOutcome::Saved { passed }
}
