//! Interview engine. Drives one session from greeting to report.
//!
//! Flow per request: resolve the session → lock it → run every backend call
//! (completion, speech, report) → mutate the session only if all of them
//! succeeded. A failed call therefore never advances `turn_count` or
//! `completed`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::candidates::registry::get_candidate;
use crate::errors::AppError;
use crate::interview::prompts::{
    interview_brief, CLOSING_NOTICE, CONCLUDE_INSTRUCTION, KICKOFF_INSTRUCTION,
};
use crate::interview::report::{generate_report, persist_report};
use crate::interview::session::{
    InterviewSession, ReportOutcome, SessionEntry, SessionInfo, SessionState,
};
use crate::interview::transcript::Transcript;
use crate::llm_client::{ChatMessage, ModelPurpose};
use crate::state::AppState;
use crate::storage::ArtifactKey;

/// What the candidate page receives after each step.
#[derive(Debug, Serialize)]
pub struct InterviewReply {
    pub message: String,
    /// Base64 audio of `message`, `null` when no speech was produced.
    pub audio: Option<String>,
    pub interview_completed: bool,
    /// Present once the interview has concluded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_saved: Option<bool>,
}

fn encode_audio(audio: Option<Bytes>) -> Option<String> {
    audio.map(|bytes| BASE64.encode(bytes))
}

async fn find_session(
    state: &AppState,
    token: Uuid,
    missing: &str,
) -> Result<std::sync::Arc<SessionEntry>, AppError> {
    state
        .sessions
        .get(token)
        .await
        .ok_or_else(|| AppError::InvalidSession(missing.to_string()))
}

/// Fails when a cascade removed the session while this request waited.
/// Callers hold the job's shared lock.
async fn ensure_still_registered(state: &AppState, entry: &SessionEntry) -> Result<(), AppError> {
    if state.sessions.contains(entry.token).await {
        return Ok(());
    }
    Err(AppError::NotFound(format!(
        "Candidate {} was removed during the interview",
        entry.candidate_id
    )))
}

/// `Created → Active`: builds the brief, asks for the greeting and speaks it.
pub async fn start_interview(
    state: &AppState,
    token: Uuid,
    job_title: &str,
    candidate_id: &str,
) -> Result<InterviewReply, AppError> {
    let entry = find_session(state, token, "Invalid or already started session").await?;
    if entry.job_title != job_title || entry.candidate_id != candidate_id {
        return Err(AppError::InvalidSession(
            "Session does not belong to this job and candidate".to_string(),
        ));
    }

    let mut session = entry.lock().await;
    if session.started() {
        return Err(AppError::InvalidSession(
            "Invalid or already started session".to_string(),
        ));
    }

    let description = state
        .store
        .get(&ArtifactKey::job(job_title))
        .await?
        .ok_or_else(|| AppError::NotFound("Job description not found".to_string()))?;
    let candidate = get_candidate(state, candidate_id).await?;

    let brief = interview_brief(
        &candidate.full_name,
        &String::from_utf8_lossy(&description),
        state.config.turn_limit,
    );

    let greeting = state
        .chat
        .complete(
            ModelPurpose::Interview,
            &Transcript::opening_request(&brief, KICKOFF_INSTRUCTION),
        )
        .await?;
    let audio = state.speech.synthesize(&greeting).await?;

    session.open(Transcript::open(brief, KICKOFF_INSTRUCTION, greeting.clone()))?;
    info!("Interview started for {candidate_id} ('{job_title}', session {token})");

    Ok(InterviewReply {
        message: greeting,
        audio: encode_audio(audio),
        interview_completed: false,
        report_saved: None,
    })
}

/// One candidate message. The answer that reaches the turn limit concludes
/// the interview and generates the report before returning.
pub async fn post_message(
    state: &AppState,
    token: Uuid,
    text: &str,
) -> Result<InterviewReply, AppError> {
    let entry = find_session(state, token, "Invalid or not started session").await?;
    let mut session = entry.lock().await;

    if !session.started() {
        return Err(AppError::InvalidSession(
            "Invalid or not started session".to_string(),
        ));
    }

    if session.completed() {
        return Ok(InterviewReply {
            message: CLOSING_NOTICE.to_string(),
            audio: None,
            interview_completed: true,
            report_saved: Some(session.report().is_saved()),
        });
    }

    let turn_limit = state.config.turn_limit;
    let answer = ChatMessage::user(text);

    if session.turn_count() + 1 < turn_limit {
        let reply = state
            .chat
            .complete(
                ModelPurpose::Interview,
                &session.transcript().with_pending(std::slice::from_ref(&answer)),
            )
            .await?;
        let audio = state.speech.synthesize(&reply).await?;

        session.record_turn(answer, ChatMessage::assistant(reply.clone()), turn_limit)?;

        return Ok(InterviewReply {
            message: reply,
            audio: encode_audio(audio),
            interview_completed: false,
            report_saved: None,
        });
    }

    conclude(state, &entry, &mut session, answer).await
}

/// The answer that reaches the turn limit is kept in the transcript, and the
/// conclude instruction takes the place of the follow-up prompt, so the final
/// turn counts toward the limit like every other answer.
async fn conclude(
    state: &AppState,
    entry: &SessionEntry,
    session: &mut InterviewSession,
    answer: ChatMessage,
) -> Result<InterviewReply, AppError> {
    let mut pending = vec![answer, ChatMessage::user(CONCLUDE_INSTRUCTION)];

    let closing = state
        .chat
        .complete(
            ModelPurpose::Interview,
            &session.transcript().with_pending(&pending),
        )
        .await?;
    let audio = state.speech.synthesize(&closing).await?;
    pending.push(ChatMessage::assistant(closing.clone()));

    let candidate = get_candidate(state, &entry.candidate_id).await?;
    let report = generate_report(
        state,
        session.transcript().with_pending(&pending),
        &candidate,
        &entry.job_title,
    )
    .await?;
    pending.push(report.request);

    // Job and candidate deletes hold the exclusive side, so once the shared
    // side is held the candidate either is already gone or stays until the
    // report is written.
    let _guard = state.job_locks.shared(&entry.job_title).await;
    ensure_still_registered(state, entry).await?;
    let outcome = persist_report(state, &entry.job_title, &entry.candidate_id, report.text).await;
    let report_saved = outcome.is_saved();

    session.conclude(pending, state.config.turn_limit, outcome)?;
    info!(
        "Interview completed for {} (session {}, report saved: {report_saved})",
        entry.candidate_id, entry.token
    );

    Ok(InterviewReply {
        message: closing,
        audio: encode_audio(audio),
        interview_completed: true,
        report_saved: Some(report_saved),
    })
}

/// Re-attempts the write of a report that was generated but not saved.
/// Never regenerates; a saved report is left as is.
pub async fn retry_report_persist(state: &AppState, token: Uuid) -> Result<bool, AppError> {
    let entry = find_session(state, token, "Invalid session").await?;
    let mut session = entry.lock().await;

    if !session.completed() {
        return Err(AppError::InvalidSession(
            "The interview has not concluded yet".to_string(),
        ));
    }

    match session.report().clone() {
        ReportOutcome::Saved { .. } => Ok(true),
        ReportOutcome::NotGenerated => Err(AppError::InvalidSession(
            "No report was generated for this session".to_string(),
        )),
        ReportOutcome::Unsaved { text, error } => {
            info!(
                "Retrying report write for {} (last error: {error})",
                entry.candidate_id
            );
            let _guard = state.job_locks.shared(&entry.job_title).await;
            ensure_still_registered(state, &entry).await?;
            let outcome = persist_report(state, &entry.job_title, &entry.candidate_id, text).await;
            let saved = outcome.is_saved();
            session.set_report(outcome);
            Ok(saved)
        }
    }
}

pub async fn session_info(state: &AppState, token: Uuid) -> Result<SessionInfo, AppError> {
    let entry = state
        .sessions
        .get(token)
        .await
        .ok_or_else(|| AppError::NotFound("Invalid interview session".to_string()))?;
    let session = entry.lock().await;

    Ok(SessionInfo {
        session_id: entry.token,
        job_title: entry.job_title.clone(),
        candidate_id: entry.candidate_id.clone(),
        state: session.state(),
        turn_count: session.turn_count(),
        turn_limit: state.config.turn_limit,
        report_saved: session.state() == SessionState::Completed && session.report().is_saved(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::registry::{
        delete_candidate, list_candidates, register_candidate, Registration,
    };
    use crate::interview::report::candidate_status;
    use crate::jobs::catalog::create_job;
    use crate::interview::transcript::PREAMBLE_LEN;
    use crate::llm_client::Role;
    use crate::storage::ArtifactStore;
    use crate::test_support::{
        test_state, test_state_with_backends, test_state_with_store, FailingSpeech,
        ScriptedChat, SlowReportStore,
    };
    use std::sync::Arc;
    use std::time::Duration;

    const PASS_REPORT: &str = "CANDIDATE EVALUATION REPORT\nOVERALL DECISION: PASS\nFINAL DECISION: PASS\n";
    const FAIL_REPORT: &str = "CANDIDATE EVALUATION REPORT\nOVERALL DECISION: FAIL\nFINAL DECISION: FAIL\n";

    async fn registered(state: &AppState) -> (Uuid, String) {
        create_job(state, "Analyst", Bytes::from_static(b"Data Analyst at Acme, Netanya"))
            .await
            .unwrap();
        let r = register_candidate(
            state,
            Registration {
                full_name: "Yonatan Levi".to_string(),
                email: "y@example.com".to_string(),
                phone: "0501234567".to_string(),
                job_title: "Analyst".to_string(),
                cv: Bytes::from_static(b"%PDF"),
            },
        )
        .await
        .unwrap();
        (r.session_id, r.candidate_id)
    }

    async fn started(state: &AppState) -> (Uuid, String) {
        let (token, candidate_id) = registered(state).await;
        start_interview(state, token, "Analyst", &candidate_id)
            .await
            .unwrap();
        (token, candidate_id)
    }

    #[tokio::test]
    async fn test_start_opens_with_single_brief_and_audio() {
        let (state, _dir) = test_state(5).await;
        let (token, candidate_id) = registered(&state).await;

        let reply = start_interview(&state, token, "Analyst", &candidate_id)
            .await
            .unwrap();
        assert!(!reply.message.is_empty());
        assert!(reply.audio.is_some());
        assert!(!reply.interview_completed);

        let entry = state.sessions.get(token).await.unwrap();
        let session = entry.lock().await;
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.transcript().system_messages(), 1);
        assert_eq!(session.transcript().len(), 1);
        let brief = session.transcript().messages().next().unwrap();
        assert_eq!(brief.role, Role::System);
        assert!(brief.content.contains("Yonatan Levi"));
        assert!(brief.content.contains("Data Analyst at Acme, Netanya"));
    }

    #[tokio::test]
    async fn test_start_twice_is_invalid() {
        let (state, _dir) = test_state(5).await;
        let (token, candidate_id) = started(&state).await;
        let err = start_interview(&state, token, "Analyst", &candidate_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSession(_)));
    }

    #[tokio::test]
    async fn test_start_rejects_unknown_or_mismatched_session() {
        let (state, _dir) = test_state(5).await;
        let (token, candidate_id) = registered(&state).await;
        assert!(matches!(
            start_interview(&state, Uuid::new_v4(), "Analyst", &candidate_id).await,
            Err(AppError::InvalidSession(_))
        ));
        assert!(matches!(
            start_interview(&state, token, "Engineer", &candidate_id).await,
            Err(AppError::InvalidSession(_))
        ));
    }

    #[tokio::test]
    async fn test_start_without_description_is_not_found() {
        let (state, _dir) = test_state(5).await;
        let (token, candidate_id) = registered(&state).await;
        state.store.delete(&ArtifactKey::job("Analyst")).await.unwrap();

        assert!(matches!(
            start_interview(&state, token, "Analyst", &candidate_id).await,
            Err(AppError::NotFound(_))
        ));
        let entry = state.sessions.get(token).await.unwrap();
        assert!(!entry.lock().await.started());
    }

    #[tokio::test]
    async fn test_message_before_start_is_invalid() {
        let (state, _dir) = test_state(5).await;
        let (token, _) = registered(&state).await;
        assert!(matches!(
            post_message(&state, token, "hello").await,
            Err(AppError::InvalidSession(_))
        ));
    }

    #[tokio::test]
    async fn test_turn_count_and_transcript_length_track_messages() {
        let (state, _dir) = test_state(5).await;
        let (token, _) = started(&state).await;

        for n in 1..5u32 {
            let reply = post_message(&state, token, &format!("answer {n}"))
                .await
                .unwrap();
            assert!(!reply.interview_completed);

            let entry = state.sessions.get(token).await.unwrap();
            let session = entry.lock().await;
            assert_eq!(session.turn_count(), n);
            assert_eq!(session.transcript().len(), 1 + 2 * n as usize);
            // The model additionally sees the kick-off and the greeting.
            assert_eq!(
                session.transcript().messages().count(),
                1 + 2 * n as usize + PREAMBLE_LEN
            );
        }
    }

    #[tokio::test]
    async fn test_limit_reached_completes_and_writes_report() {
        let chat = Arc::new(ScriptedChat::with_report(PASS_REPORT));
        let (state, _dir) = test_state_with_backends(5, chat.clone()).await;
        let (token, candidate_id) = started(&state).await;

        for n in 1..=4 {
            let reply = post_message(&state, token, &format!("answer {n}"))
                .await
                .unwrap();
            assert!(!reply.interview_completed);
        }
        {
            let entry = state.sessions.get(token).await.unwrap();
            assert_eq!(entry.lock().await.turn_count(), 4);
        }
        assert!(!candidate_status(&state, "Analyst", &candidate_id)
            .await
            .unwrap());

        let last = post_message(&state, token, "answer 5").await.unwrap();
        assert!(last.interview_completed);
        assert_eq!(last.report_saved, Some(true));

        let stored = state
            .store
            .get(&ArtifactKey::report("Analyst", &candidate_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&stored[..], PASS_REPORT.as_bytes());
        assert!(candidate_status(&state, "Analyst", &candidate_id)
            .await
            .unwrap());

        let entry = state.sessions.get(token).await.unwrap();
        let session = entry.lock().await;
        assert_eq!(session.turn_count(), 5);
        assert!(session.completed());

        // The final answer is kept, followed by the conclude instruction.
        let turns = session.transcript().turns();
        let n = turns.len();
        assert_eq!(turns[n - 4].content, "answer 5");
        assert_eq!(turns[n - 3].content, CONCLUDE_INSTRUCTION);
        assert_eq!(turns[n - 2].role, Role::Assistant);
        assert!(turns[n - 1].content.contains("OVERALL DECISION:"));

        // The evaluation call saw the whole conversation, brief first.
        let evaluation = chat.last_evaluation_context().unwrap();
        assert_eq!(evaluation[0].role, Role::System);
        assert!(evaluation.iter().any(|m| m.content == "answer 3"));
        assert_eq!(chat.evaluation_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_report_decision_reaches_listing() {
        let chat = Arc::new(ScriptedChat::with_report(FAIL_REPORT));
        let (state, _dir) = test_state_with_backends(1, chat).await;
        let (token, candidate_id) = started(&state).await;

        let reply = post_message(&state, token, "only answer").await.unwrap();
        assert!(reply.interview_completed);

        let listed = list_candidates(&state, "Analyst").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].candidate.candidate_id, candidate_id);
        assert!(!listed[0].passed);
        assert_eq!(
            listed[0].candidate.report_key.as_deref(),
            Some(format!("report:Analyst:{candidate_id}").as_str())
        );
    }

    #[tokio::test]
    async fn test_after_completion_messages_are_no_ops() {
        let chat = Arc::new(ScriptedChat::with_report(PASS_REPORT));
        let (state, _dir) = test_state_with_backends(2, chat.clone()).await;
        let (token, _) = started(&state).await;
        post_message(&state, token, "a1").await.unwrap();
        post_message(&state, token, "a2").await.unwrap();

        let calls_before = chat.total_calls();
        let (turns_before, len_before) = {
            let entry = state.sessions.get(token).await.unwrap();
            let session = entry.lock().await;
            (session.turn_count(), session.transcript().len())
        };

        for _ in 0..3 {
            let reply = post_message(&state, token, "anything else?").await.unwrap();
            assert_eq!(reply.message, CLOSING_NOTICE);
            assert!(reply.audio.is_none());
            assert!(reply.interview_completed);
        }

        let entry = state.sessions.get(token).await.unwrap();
        let session = entry.lock().await;
        assert_eq!(session.turn_count(), turns_before);
        assert_eq!(session.transcript().len(), len_before);
        assert_eq!(chat.total_calls(), calls_before);
        assert_eq!(chat.evaluation_calls(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_does_not_advance_session() {
        let chat = Arc::new(ScriptedChat::with_report(PASS_REPORT));
        let (state, _dir) = test_state_with_backends(5, chat.clone()).await;
        let (token, _) = started(&state).await;
        post_message(&state, token, "a1").await.unwrap();

        chat.fail_next();
        assert!(matches!(
            post_message(&state, token, "a2").await,
            Err(AppError::Llm(_))
        ));

        let entry = state.sessions.get(token).await.unwrap();
        let session = entry.lock().await;
        assert_eq!(session.turn_count(), 1);
        assert_eq!(session.transcript().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_evaluation_leaves_interview_open() {
        let chat = Arc::new(ScriptedChat::with_report(PASS_REPORT));
        let (state, _dir) = test_state_with_backends(1, chat.clone()).await;
        let (token, candidate_id) = started(&state).await;

        chat.fail_evaluation();
        assert!(post_message(&state, token, "final").await.is_err());
        {
            let entry = state.sessions.get(token).await.unwrap();
            let session = entry.lock().await;
            assert!(!session.completed());
            assert_eq!(session.turn_count(), 0);
        }
        assert!(state
            .store
            .get(&ArtifactKey::report("Analyst", &candidate_id))
            .await
            .unwrap()
            .is_none());

        // Retrying the same answer now succeeds and reports exactly once.
        let reply = post_message(&state, token, "final").await.unwrap();
        assert!(reply.interview_completed);
        assert_eq!(chat.evaluation_calls(), 1);
    }

    #[tokio::test]
    async fn test_speech_failure_does_not_advance_session() {
        let chat = Arc::new(ScriptedChat::with_report(PASS_REPORT));
        let (mut state, _dir) = test_state_with_backends(5, chat).await;
        let (token, _) = started(&state).await;

        state.speech = Arc::new(FailingSpeech);
        assert!(post_message(&state, token, "a1").await.is_err());

        let entry = state.sessions.get(token).await.unwrap();
        assert_eq!(entry.lock().await.turn_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_messages_on_one_session_are_serialized() {
        let (state, _dir) = test_state(10).await;
        let (token, _) = started(&state).await;

        let mut handles = Vec::new();
        for n in 0..6 {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                post_message(&state, token, &format!("answer {n}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let entry = state.sessions.get(token).await.unwrap();
        let session = entry.lock().await;
        assert_eq!(session.turn_count(), 6);
        let roles: Vec<Role> = session.transcript().turns().iter().map(|m| m.role).collect();
        for pair in roles.chunks(2) {
            assert_eq!(pair, [Role::User, Role::Assistant]);
        }
    }

    #[tokio::test]
    async fn test_unsaved_report_can_be_retried() {
        let chat = Arc::new(ScriptedChat::with_report(PASS_REPORT));
        let (state, dir) = test_state_with_backends(1, chat.clone()).await;
        let (token, candidate_id) = started(&state).await;

        // A plain file where the job's report folder should be makes the write fail.
        std::fs::write(dir.path().join("reports").join("Analyst"), b"blocker").unwrap();

        let reply = post_message(&state, token, "final").await.unwrap();
        assert!(reply.interview_completed);
        assert_eq!(reply.report_saved, Some(false));
        assert!(!retry_report_persist(&state, token).await.unwrap());

        std::fs::remove_file(dir.path().join("reports").join("Analyst")).unwrap();
        assert!(retry_report_persist(&state, token).await.unwrap());
        assert!(candidate_status(&state, "Analyst", &candidate_id)
            .await
            .unwrap());
        assert_eq!(chat.evaluation_calls(), 1);

        let info = session_info(&state, token).await.unwrap();
        assert_eq!(info.state, SessionState::Completed);
        assert!(info.report_saved);
    }

    #[tokio::test]
    async fn test_candidate_delete_during_report_write_leaves_no_report() {
        let (state, _dir) = test_state_with_store(1, |store| -> Arc<dyn ArtifactStore> {
            Arc::new(SlowReportStore::wrap(store, Duration::from_millis(200)))
        })
        .await;
        let (token, candidate_id) = started(&state).await;

        let interview = {
            let state = state.clone();
            tokio::spawn(async move { post_message(&state, token, "final").await })
        };
        // Let the interview reach the report write before deleting.
        tokio::time::sleep(Duration::from_millis(50)).await;
        delete_candidate(&state, "Analyst", &candidate_id)
            .await
            .unwrap();

        let reply = interview.await.unwrap().unwrap();
        assert!(reply.interview_completed);

        assert!(state.candidates.get(&candidate_id).await.unwrap().is_none());
        assert!(state
            .store
            .get(&ArtifactKey::report("Analyst", &candidate_id))
            .await
            .unwrap()
            .is_none());
        assert!(state.sessions.get(token).await.is_none());
    }

    #[tokio::test]
    async fn test_retry_before_completion_is_invalid() {
        let (state, _dir) = test_state(5).await;
        let (token, _) = started(&state).await;
        assert!(matches!(
            retry_report_persist(&state, token).await,
            Err(AppError::InvalidSession(_))
        ));
    }
}
