use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};

use crate::error::AppError;
use crate::services::queue_sync::{QueueSession, QueueSnapshot, QueueView};
use crate::state::AppState;

/// One-shot queue fetch: the manual-refresh path, and the seed for clients
/// that do not hold a live stream.
pub async fn get_queue(State(state): State<AppState>) -> Result<Json<QueueSnapshot>, AppError> {
    let requests = state.requests.list_review_queue(&state.pool).await?;
    let mut view = QueueView::new();
    let now = Utc::now();
    view.seed(requests, now);
    Ok(Json(view.snapshot(now)))
}

/// Live queue stream for one doctor session. Each SSE message is a full
/// sorted snapshot; closing the connection tears the session down.
pub async fn stream_queue(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(16);
    let session = QueueSession::new(state.pool.clone(), state.requests.clone(), state.feed.clone());
    tokio::spawn(session.run(tx));

    let stream = ReceiverStream::new(rx).map(|snapshot| {
        let event = Event::default().event("queue");
        Ok(match serde_json::to_string(&snapshot) {
            Ok(body) => event.data(body),
            Err(err) => {
                tracing::error!(error = %err, "queue snapshot serialization failed");
                event.comment("snapshot unavailable")
            }
        })
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
