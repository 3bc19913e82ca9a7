//! Server-sent-event framing for streaming runs.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use futures_util::Stream;
use serde_json::json;
use std::convert::Infallible;
use tokio::sync::mpsc;

use super::models::StreamEvent;

const END_FRAME: &str = "event: end\n\n";

/// Sent when the producer goes away without finishing the run
const ABORTED_MESSAGE: &str = "Internal Server Error";

/// Frame a single event
pub fn encode_event(event: &StreamEvent) -> Bytes {
    let frame = match event {
        StreamEvent::Metadata { run_id } => {
            format!("event: metadata\ndata: {}\n\n", json!({ "run_id": run_id }))
        }
        StreamEvent::Snapshot(snapshot) => format!("event: data\ndata: {}\n\n", snapshot),
        StreamEvent::Error { message } => format!(
            "event: error\ndata: {}\n\n",
            json!({ "status_code": 500, "message": message })
        ),
        StreamEvent::End => END_FRAME.to_string(),
    };
    Bytes::from(frame)
}

/// Encode run events into an SSE body. The body stops after the first `end`
/// or `error` event. A channel that closes before either one ends the body
/// with an error frame, never with `end`.
pub fn encode(
    mut rx: mpsc::Receiver<StreamEvent>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let terminal = matches!(event, StreamEvent::End | StreamEvent::Error { .. });
            yield Ok::<Bytes, Infallible>(encode_event(&event));
            if terminal {
                return;
            }
        }
        tracing::warn!("Run event channel closed before the run finished");
        yield Ok(encode_event(&StreamEvent::Error {
            message: ABORTED_MESSAGE.to_string(),
        }));
    }
}

pub fn sse_response<S>(stream: S) -> Response
where
    S: Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    (headers, Body::from_stream(stream)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    async fn frames(events: Vec<StreamEvent>) -> String {
        let (tx, rx) = mpsc::channel(8);
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx);

        let chunks: Vec<Bytes> = encode(rx).map(|r| r.unwrap()).collect().await;
        chunks
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect()
    }

    #[test]
    fn test_snapshot_frame() {
        let frame = encode_event(&StreamEvent::Snapshot(json!({ "messages": [] })));
        assert_eq!(frame, Bytes::from("event: data\ndata: {\"messages\":[]}\n\n"));
    }

    #[tokio::test]
    async fn test_completed_run_ends_with_end_frame() {
        let body = frames(vec![
            StreamEvent::Metadata { run_id: "r1".into() },
            StreamEvent::Snapshot(json!("S1")),
            StreamEvent::Snapshot(json!("S2")),
            StreamEvent::End,
            StreamEvent::Snapshot(json!("late")),
        ])
        .await;

        assert_eq!(
            body,
            concat!(
                "event: metadata\ndata: {\"run_id\":\"r1\"}\n\n",
                "event: data\ndata: \"S1\"\n\n",
                "event: data\ndata: \"S2\"\n\n",
                "event: end\n\n",
            )
        );
    }

    #[tokio::test]
    async fn test_closed_channel_without_end_is_an_error() {
        let body = frames(vec![
            StreamEvent::Metadata { run_id: "r1".into() },
            StreamEvent::Snapshot(json!("S1")),
        ])
        .await;

        assert_eq!(
            body,
            concat!(
                "event: metadata\ndata: {\"run_id\":\"r1\"}\n\n",
                "event: data\ndata: \"S1\"\n\n",
                "event: error\ndata: {\"message\":\"Internal Server Error\",\"status_code\":500}\n\n",
            )
        );
        assert!(!body.contains("event: end"));
    }

    #[tokio::test]
    async fn test_error_is_terminal_and_suppresses_end() {
        let body = frames(vec![
            StreamEvent::Snapshot(json!("S1")),
            StreamEvent::Error {
                message: "Internal Server Error".into(),
            },
            StreamEvent::Snapshot(json!("late")),
        ])
        .await;

        assert_eq!(
            body,
            concat!(
                "event: data\ndata: \"S1\"\n\n",
                "event: error\ndata: {\"message\":\"Internal Server Error\",\"status_code\":500}\n\n",
            )
        );
    }

    #[test]
    fn test_sse_response_headers() {
        let response = sse_response(futures_util::stream::empty());
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-cache");
    }
}
