//! Axum route handlers for the Coach API.

use std::convert::Infallible;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{mpsc, OwnedMutexGuard};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::coach::message::Message;
use crate::coach::session::CoachSession;
use crate::coach::stager::StagedUnits;
use crate::errors::AppError;
use crate::state::AppState;

/// Buffered SSE events per reply. Units are paced, so a small buffer is plenty.
const STREAM_BUFFER: usize = 8;

const BUSY_MESSAGE: &str = "A reply is still being delivered";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct StartersResponse {
    pub questions: Vec<&'static str>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/coach/history
///
/// Waits for any in-flight reply to finish, then returns the history.
pub async fn handle_get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let session = state.coach.lock().await;
    Json(HistoryResponse {
        messages: session.history().to_vec(),
    })
}

/// DELETE /api/v1/coach/history
pub async fn handle_clear_history(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let mut session = state
        .coach
        .try_lock()
        .map_err(|_| AppError::Conflict(BUSY_MESSAGE.to_string()))?;
    session.clear_history();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/coach/starters
pub async fn handle_starters() -> Json<StartersResponse> {
    Json(StartersResponse {
        questions: CoachSession::starter_questions().to_vec(),
    })
}

/// POST /api/v1/coach/messages
///
/// Runs the completion up front so failures come back as plain HTTP errors,
/// then streams the staged reply as server-sent events: one `message` event
/// per unit and a final `done` event. A second submit while a reply is still
/// streaming is rejected with 409.
pub async fn handle_send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let mut session = state
        .coach
        .clone()
        .try_lock_owned()
        .map_err(|_| AppError::Conflict(BUSY_MESSAGE.to_string()))?;

    let units = session.request_reply(&request.text).await?;

    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    tokio::spawn(stream_reply(session, units, tx));

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}

/// Delivers `units` into the SSE channel while holding the session lock.
///
/// A channel slot is reserved before each unit is taken, so a unit only enters
/// history once it has a place in the stream. A client disconnect cancels the
/// delivery, including a pause in progress; units already sent stay in history.
async fn stream_reply(
    mut session: OwnedMutexGuard<CoachSession>,
    units: StagedUnits,
    tx: mpsc::Sender<Result<Event, Infallible>>,
) {
    let mut reply = session.deliver(units);

    let watcher = {
        let tx = tx.clone();
        let cancel = reply.cancellation();
        tokio::spawn(async move {
            tx.closed().await;
            cancel.cancel();
        })
    };

    loop {
        let Ok(permit) = tx.reserve().await else {
            reply.cancel();
            break;
        };
        let Some(message) = reply.next().await else {
            break;
        };
        match Event::default().event("message").json_data(&message) {
            Ok(event) => permit.send(Ok(event)),
            Err(e) => warn!("Skipping unserializable coach message {}: {e}", message.id()),
        }
    }
    watcher.abort();

    let delivered = reply.delivered();
    drop(reply);

    if tx.is_closed() {
        info!("Coach client disconnected after {delivered} units");
        return;
    }
    if let Ok(done) = Event::default()
        .event("done")
        .json_data(json!({ "delivered": delivered }))
    {
        // The client may have left since the check; nothing left to cancel then.
        let _ = tx.send(Ok(done)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::coach::session::{CoachConfig, WELCOME_MESSAGE};
    use crate::llm_client::{GenerationConfig, LlmError, TextCompleter};

    struct ThreeSentences;

    #[async_trait]
    impl TextCompleter for ThreeSentences {
        async fn complete(&self, _prompt: &str, _config: &GenerationConfig) -> Result<String, LlmError> {
            Ok("One. Two. Three.".to_string())
        }
    }

    async fn staged() -> (Arc<Mutex<CoachSession>>, OwnedMutexGuard<CoachSession>, StagedUnits) {
        let coach = Arc::new(Mutex::new(CoachSession::new(
            CoachConfig::default(),
            Arc::new(ThreeSentences),
        )));
        let mut session = coach.clone().lock_owned().await;
        let units = session.request_reply("Go").await.unwrap();
        (coach, session, units)
    }

    async fn history_texts(coach: &Mutex<CoachSession>) -> Vec<String> {
        let session = coach.lock().await;
        session.history().iter().map(|m| m.text().to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_reply_streams_units_then_done() {
        let (coach, session, units) = staged().await;
        let (tx, mut rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(stream_reply(session, units, tx));

        let mut events = 0;
        while rx.recv().await.is_some() {
            events += 1;
        }
        // Three units plus `done`.
        assert_eq!(events, 4);
        assert_eq!(
            history_texts(&coach).await,
            vec![WELCOME_MESSAGE, "Go", "One.", "Two.", "Three."]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_stream_commits_no_unit() {
        let (coach, session, units) = staged().await;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        drop(rx);

        stream_reply(session, units, tx).await;

        assert_eq!(history_texts(&coach).await, vec![WELCOME_MESSAGE, "Go"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_during_pause_keeps_sent_units_only() {
        let (coach, session, units) = staged().await;
        let (tx, mut rx) = mpsc::channel(STREAM_BUFFER);
        let delivery = tokio::spawn(stream_reply(session, units, tx));

        assert!(rx.recv().await.is_some());
        drop(rx);
        delivery.await.unwrap();

        assert_eq!(history_texts(&coach).await, vec![WELCOME_MESSAGE, "Go", "One."]);
    }
}
