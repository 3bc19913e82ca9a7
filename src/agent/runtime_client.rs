use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::{Agent, SnapshotStream};
use crate::models::RunConfig;

#[derive(Debug, Serialize)]
struct RuntimeRequest<'a> {
    input: &'a Value,
    config: &'a RunConfig,
}

/// Agent hosted by the external agent runtime service
pub struct RuntimeAgent {
    client: Client,
    base_url: String,
}

impl RuntimeAgent {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, path: &str, input: &Value, config: &RunConfig) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(&RuntimeRequest { input, config })
            .send()
            .await
            .map_err(|e| anyhow!("Agent runtime request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Agent runtime error ({}): {}", status, text));
        }

        Ok(response)
    }
}

#[async_trait]
impl Agent for RuntimeAgent {
    async fn invoke(&self, input: Value, config: &RunConfig) -> Result<Value> {
        let response = self.post("invoke", &input, config).await?;
        let mut body: Value = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse agent runtime response: {}", e))?;

        Ok(match body.get_mut("output") {
            Some(output) => output.take(),
            None => body,
        })
    }

    async fn stream(&self, input: Value, config: &RunConfig) -> Result<SnapshotStream> {
        let response = self.post("stream", &input, config).await?;
        Ok(parse_snapshots(response.bytes_stream()))
    }
}

/// Decode an SSE body into snapshots. Bytes are buffered until a full line is
/// available, so characters split across chunks decode intact.
fn parse_snapshots<S, B, E>(byte_stream: S) -> SnapshotStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();
        let mut event_name: Option<String> = None;
        let mut pending_data: Vec<String> = Vec::new();
        futures_util::pin_mut!(byte_stream);

        'outer: while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(anyhow!("Agent runtime stream interrupted: {}", e));
                    break;
                }
            };

            buffer.extend_from_slice(chunk.as_ref());

            while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                let line = match std::str::from_utf8(&raw[..line_end]) {
                    Ok(line) => line.trim_end_matches('\r'),
                    Err(e) => {
                        yield Err(anyhow!("Agent runtime sent invalid UTF-8: {}", e));
                        break 'outer;
                    }
                };

                if line.is_empty() {
                    let event = event_name.take();
                    if pending_data.is_empty() && event.is_none() {
                        continue;
                    }
                    let data = pending_data.join("\n");
                    pending_data.clear();

                    match event.as_deref() {
                        None | Some("data") => match serde_json::from_str::<Value>(&data) {
                            Ok(snapshot) => yield Ok(snapshot),
                            Err(e) => {
                                yield Err(anyhow!("Invalid snapshot from agent runtime: {}", e));
                                break 'outer;
                            }
                        },
                        Some("error") => {
                            yield Err(anyhow!("Agent runtime reported an error: {}", data));
                            break 'outer;
                        }
                        Some("end") => break 'outer,
                        Some(other) => {
                            tracing::debug!("Ignoring agent runtime event '{}'", other);
                        }
                    }
                } else if line.starts_with(':') {
                    continue;
                } else if let Some(rest) = line.strip_prefix("event:") {
                    event_name = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("data:") {
                    let rest = rest.strip_prefix(' ').unwrap_or(rest);
                    pending_data.push(rest.to_string());
                }
            }
        }
    };

    Box::pin(stream)
}
