//! Query client port
//!
//! Defines how the application layer sends a question to the remote
//! assistant endpoint and receives its answer as a lazy sequence of text
//! chunks.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use parley_domain::{ErrorInfo, QueryErrorKind};
use thiserror::Error;

/// Errors that can occur while issuing or consuming a query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Endpoint returned HTTP {status}: {message}")]
    Protocol { status: u16, message: String },

    #[error("Response is not valid UTF-8: {0}")]
    Decode(String),
}

impl QueryError {
    pub fn kind(&self) -> QueryErrorKind {
        match self {
            QueryError::Network(_) => QueryErrorKind::Network,
            QueryError::Protocol { .. } => QueryErrorKind::Protocol,
            QueryError::Decode(_) => QueryErrorKind::Decode,
        }
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo::new(self.kind(), self.to_string())
    }
}

/// A finite, non-restartable sequence of decoded text chunks.
///
/// Once the sequence has ended (normally or with an error) it yields
/// nothing further. Dropping it releases the underlying connection.
pub struct ChunkStream {
    inner: BoxStream<'static, Result<String, QueryError>>,
    finished: bool,
}

impl ChunkStream {
    pub fn new(inner: BoxStream<'static, Result<String, QueryError>>) -> Self {
        Self {
            inner,
            finished: false,
        }
    }

    /// Stream that yields `items` in order and then ends.
    pub fn from_items(items: Vec<Result<String, QueryError>>) -> Self {
        Self::new(stream::iter(items).boxed())
    }

    /// Await the next chunk. `None` means the response is complete.
    pub async fn next_chunk(&mut self) -> Option<Result<String, QueryError>> {
        if self.finished {
            return None;
        }
        let item = self.inner.next().await;
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        item
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Consume the stream and collect all text into a single string.
    pub async fn collect_text(mut self) -> Result<String, QueryError> {
        let mut full_text = String::new();
        while let Some(chunk) = self.next_chunk().await {
            full_text.push_str(&chunk?);
        }
        Ok(full_text)
    }
}

/// Client for the remote query endpoint
///
/// One call to `stream` issues exactly one outbound request. Failures that
/// happen before the body starts are returned directly; failures while the
/// body is being read show up as an `Err` item in the [`ChunkStream`].
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn stream(&self, query: &str) -> Result<ChunkStream, QueryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_is_fused_after_end() {
        let mut stream = ChunkStream::from_items(vec![Ok("a".to_string())]);
        assert_eq!(stream.next_chunk().await, Some(Ok("a".to_string())));
        assert_eq!(stream.next_chunk().await, None);
        assert!(stream.is_finished());
        assert_eq!(stream.next_chunk().await, None);
    }

    #[tokio::test]
    async fn test_stream_is_fused_after_error() {
        let mut stream = ChunkStream::from_items(vec![
            Err(QueryError::Network("reset".to_string())),
            Ok("late".to_string()),
        ]);
        assert!(matches!(stream.next_chunk().await, Some(Err(_))));
        assert_eq!(stream.next_chunk().await, None);
    }

    #[tokio::test]
    async fn test_collect_text() {
        let stream = ChunkStream::from_items(vec![Ok("Hi".to_string()), Ok(" there".to_string())]);
        assert_eq!(stream.collect_text().await.unwrap(), "Hi there");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            QueryError::Network("x".into()).kind(),
            QueryErrorKind::Network
        );
        assert_eq!(
            QueryError::Protocol {
                status: 502,
                message: "Bad Gateway".into()
            }
            .kind(),
            QueryErrorKind::Protocol
        );
        assert_eq!(QueryError::Decode("x".into()).kind(), QueryErrorKind::Decode);
    }

    #[test]
    fn test_error_info_keeps_message() {
        let info = QueryError::Protocol {
            status: 500,
            message: "Internal Server Error".into(),
        }
        .to_error_info();
        assert_eq!(info.kind, QueryErrorKind::Protocol);
        assert_eq!(info.message, "Endpoint returned HTTP 500: Internal Server Error");
    }
}
