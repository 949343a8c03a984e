//! Streaming query client over HTTP.
//!
//! A question is sent as `POST {base_url}/query` with the JSON body
//! `{"question": "..."}`. A 2xx response body is read incrementally as UTF-8
//! text; every decoded piece becomes one chunk.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use parley_application::ports::query_client::{ChunkStream, QueryClient, QueryError};
use serde_json::json;
use tracing::debug;

use super::decoder::Utf8StreamDecoder;

/// Endpoint used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// [`QueryClient`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpQueryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQueryClient {
    /// Build a client for `base_url`. No request is made here.
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| QueryError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Probe `GET {base_url}/health`. Any 2xx status counts as healthy.
    pub async fn health(&self) -> Result<(), QueryError> {
        let url = self.endpoint("health");
        debug!("Probing {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| QueryError::Network(format!("Failed to reach {}: {}", url, e)))?;

        check_status(&response)
    }
}

fn check_status(response: &reqwest::Response) -> Result<(), QueryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(QueryError::Protocol {
        status: status.as_u16(),
        message: status.canonical_reason().unwrap_or("Unknown").to_string(),
    })
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn stream(&self, query: &str) -> Result<ChunkStream, QueryError> {
        let url = self.endpoint("query");
        debug!("POST {} ({} bytes)", url, query.len());

        let response = self
            .client
            .post(&url)
            .json(&json!({ "question": query }))
            .send()
            .await
            .map_err(|e| QueryError::Network(format!("Failed to reach {}: {}", url, e)))?;

        check_status(&response)?;

        Ok(decode_text_stream(response.bytes_stream()))
    }
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: Utf8StreamDecoder,
    done: bool,
}

/// Turn a raw byte stream into a [`ChunkStream`] of decoded text.
///
/// Pieces that decode to nothing (a character split over a boundary) are
/// skipped. A transport error ends the stream with [`QueryError::Network`];
/// a body that ends inside a character ends it with [`QueryError::Decode`].
pub fn decode_text_stream<S, B, E>(body: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: Utf8StreamDecoder::new(),
        done: false,
    };

    let chunks = stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            match state.body.next().await {
                Some(Ok(bytes)) => match state.decoder.decode(bytes.as_ref()) {
                    Ok(text) if text.is_empty() => continue,
                    Ok(text) => return Some((Ok(text), state)),
                    Err(e) => {
                        state.done = true;
                        return Some((Err(e), state));
                    }
                },
                Some(Err(e)) => {
                    state.done = true;
                    let err = QueryError::Network(format!("Failed to read response body: {}", e));
                    return Some((Err(err), state));
                }
                None => {
                    state.done = true;
                    return match state.decoder.finish() {
                        Ok(()) => None,
                        Err(e) => Some((Err(e), state)),
                    };
                }
            }
        }
    });

    ChunkStream::new(chunks.boxed())
}
