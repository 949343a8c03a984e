//! Session engine use case.
//!
//! Drives one exchange at a time against the remote endpoint:
//!
//! ```text
//! Idle|Error --submit--> AwaitingFirstChunk --chunk--> Streaming --end--> Idle
//!                              |                          |
//!                              +------ failure -----------+--> Error --delay--> Idle
//! ```
//!
//! Every chunk is appended to an accumulator and the placeholder assistant
//! message is replaced with the full text so far. A failed query removes the
//! placeholder, so only the user's message remains. All transitions run on
//! the caller's task; the engine only suspends while awaiting the endpoint.

use crate::config::SessionConfig;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger, QUERY_CANCELLED, QUERY_FAILED,
    QUERY_SUBMITTED, RESPONSE_COMPLETED,
};
use crate::ports::query_client::QueryClient;
use crate::ports::session_observer::{NoSessionObserver, SessionObserver};
use crate::repository::{ConversationRepository, RepositoryError};
use parley_domain::{
    Conversation, ConversationId, ErrorInfo, Message, QueryErrorKind, SessionSignals,
    SessionState, preview,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors returned to the caller of an engine operation.
///
/// Streaming failures are not errors at this level: they move the engine to
/// [`SessionState::Error`] and are reported through [`SessionSignals`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("A query is in flight")]
    Busy,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// What became of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty input, or a query was already in flight. Nothing changed.
    Ignored,
    /// The stream ended normally.
    Completed {
        conversation: ConversationId,
        content: String,
    },
    /// The query failed; the engine is now in `Error`.
    Failed(ErrorInfo),
    /// The caller cancelled; `partial` is whatever had arrived.
    Cancelled {
        conversation: ConversationId,
        partial: String,
    },
}

/// Orchestrates the repository and the query client for one user.
pub struct SessionEngine {
    repository: ConversationRepository,
    client: Arc<dyn QueryClient>,
    observer: Arc<dyn SessionObserver>,
    conversation_logger: Arc<dyn ConversationLogger>,
    config: SessionConfig,
    state: SessionState,
    last_error: Option<ErrorInfo>,
    recovery_deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl SessionEngine {
    /// Create an engine over a bootstrapped repository.
    pub fn new(repository: ConversationRepository, client: Arc<dyn QueryClient>) -> Self {
        Self {
            repository,
            client,
            observer: Arc::new(NoSessionObserver),
            conversation_logger: Arc::new(NoConversationLogger),
            config: SessionConfig::default(),
            state: SessionState::Idle,
            last_error: None,
            recovery_deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    // ==================== Signals ====================

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn signals(&self) -> SessionSignals {
        SessionSignals::derive(self.state, self.last_error.as_ref())
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    // ==================== Conversations ====================

    pub fn conversations(&self) -> &[Conversation] {
        self.repository.conversations()
    }

    pub fn active_id(&self) -> Option<&ConversationId> {
        self.repository.active_id()
    }

    pub fn active_messages(&self) -> &[Message] {
        self.repository.active_messages()
    }

    pub fn repository(&self) -> &ConversationRepository {
        &self.repository
    }

    pub fn create_conversation(&mut self) -> Result<Conversation, SessionError> {
        self.ensure_not_loading()?;
        Ok(self.repository.create_conversation()?)
    }

    pub fn select_conversation(&mut self, id: &ConversationId) -> Result<&[Message], SessionError> {
        self.ensure_not_loading()?;
        Ok(self.repository.select_conversation(id)?)
    }

    pub fn delete_conversation(&mut self, id: &ConversationId) -> Result<(), SessionError> {
        self.ensure_not_loading()?;
        Ok(self.repository.delete_conversation(id)?)
    }

    // ==================== Exchange ====================

    /// Token that cancels the submission in flight.
    ///
    /// Take it right before calling [`submit`](Self::submit). A cancelled
    /// token is replaced once its submission has stopped, or when the next
    /// submission starts if it was cancelled while nothing was in flight.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Submit `text` to the active conversation and stream the answer.
    ///
    /// Returns once the stream has ended, failed or been cancelled.
    /// Repository errors while recording the question are returned as
    /// [`SessionError`]; everything that goes wrong afterwards is reported
    /// through the outcome and the `Error` state.
    pub async fn submit(&mut self, text: &str) -> Result<SubmitOutcome, SessionError> {
        if text.trim().is_empty() {
            debug!("Ignoring empty submission");
            return Ok(SubmitOutcome::Ignored);
        }
        if !self.state.accepts_input() {
            debug!("Ignoring submission while {:?}", self.state);
            return Ok(SubmitOutcome::Ignored);
        }
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        let conversation = self.repository.ensure_active()?;
        let question = Message::user(text);
        self.repository
            .append_message(&conversation, question.clone())?;
        self.observer.on_message_updated(&conversation, &question);
        self.repository
            .append_message(&conversation, Message::placeholder())?;
        self.observer
            .on_message_updated(&conversation, &Message::placeholder());

        info!(
            "Submitting query to {}: {}",
            conversation,
            preview(text, 100)
        );
        self.conversation_logger.log(ConversationEvent::new(
            QUERY_SUBMITTED,
            serde_json::json!({
                "conversation": conversation.as_str(),
                "question": text,
            }),
        ));

        self.last_error = None;
        self.recovery_deadline = None;
        self.set_state(SessionState::AwaitingFirstChunk);

        let cancel = self.cancel.clone();
        let outcome = self.drive(&conversation, text, &cancel).await;
        Ok(outcome)
    }

    async fn drive(
        &mut self,
        conversation: &ConversationId,
        query: &str,
        cancel: &CancellationToken,
    ) -> SubmitOutcome {
        let client = Arc::clone(&self.client);
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = client.stream(query) => Some(result),
        };

        let mut stream = match opened {
            None => return self.finish_cancelled(conversation, String::new()),
            Some(Err(e)) => return self.fail(conversation, e.to_error_info()),
            Some(Ok(stream)) => stream,
        };

        let mut accumulated = String::new();
        let mut chunks = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = stream.next_chunk() => Some(item),
            };

            match next {
                None => {
                    drop(stream);
                    return self.finish_cancelled(conversation, accumulated);
                }
                Some(None) => return self.finish_completed(conversation, accumulated, chunks),
                Some(Some(Err(e))) => return self.fail(conversation, e.to_error_info()),
                Some(Some(Ok(chunk))) => {
                    chunks += 1;
                    accumulated.push_str(&chunk);
                    debug!(
                        "Chunk {} ({} bytes, {} total)",
                        chunks,
                        chunk.len(),
                        accumulated.len()
                    );

                    let message = Message::assistant(accumulated.clone());
                    if let Err(e) = self
                        .repository
                        .replace_last_message(conversation, message.clone())
                    {
                        drop(stream);
                        let info = ErrorInfo::new(QueryErrorKind::Storage, e.to_string());
                        return self.fail(conversation, info);
                    }
                    if self.state != SessionState::Streaming {
                        self.set_state(SessionState::Streaming);
                    }
                    self.observer.on_message_updated(conversation, &message);
                }
            }
        }
    }

    fn finish_completed(
        &mut self,
        conversation: &ConversationId,
        content: String,
        chunks: usize,
    ) -> SubmitOutcome {
        info!(
            "Response complete: {} chunks, {} bytes",
            chunks,
            content.len()
        );
        self.conversation_logger.log(ConversationEvent::new(
            RESPONSE_COMPLETED,
            serde_json::json!({
                "conversation": conversation.as_str(),
                "chunks": chunks,
                "bytes": content.len(),
                "text": content,
            }),
        ));
        self.set_state(SessionState::Idle);
        SubmitOutcome::Completed {
            conversation: conversation.clone(),
            content,
        }
    }

    fn finish_cancelled(&mut self, conversation: &ConversationId, partial: String) -> SubmitOutcome {
        info!("Query cancelled after {} bytes", partial.len());
        if partial.is_empty() {
            self.remove_placeholder(conversation);
        }
        self.conversation_logger.log(ConversationEvent::new(
            QUERY_CANCELLED,
            serde_json::json!({
                "conversation": conversation.as_str(),
                "bytes": partial.len(),
            }),
        ));
        self.cancel = CancellationToken::new();
        self.set_state(SessionState::Idle);
        SubmitOutcome::Cancelled {
            conversation: conversation.clone(),
            partial,
        }
    }

    fn fail(&mut self, conversation: &ConversationId, info: ErrorInfo) -> SubmitOutcome {
        warn!("{}", info);
        self.remove_placeholder(conversation);
        self.conversation_logger.log(ConversationEvent::new(
            QUERY_FAILED,
            serde_json::json!({
                "conversation": conversation.as_str(),
                "kind": info.kind.as_str(),
                "error": info.message,
            }),
        ));
        self.last_error = Some(info.clone());
        self.recovery_deadline = Some(Instant::now() + self.config.error_recovery_delay);
        self.set_state(SessionState::Error);
        SubmitOutcome::Failed(info)
    }

    fn remove_placeholder(&mut self, conversation: &ConversationId) {
        match self.repository.discard_last_message(conversation) {
            Ok((_, store_error)) => {
                if store_error.is_some() {
                    warn!("Placeholder removed from {} but the store is behind", conversation);
                }
                self.observer.on_message_removed(conversation);
            }
            Err(e) => error!("Could not remove placeholder from {}: {}", conversation, e),
        }
    }

    // ==================== Error recovery ====================

    /// When the engine will leave `Error` on its own, if it is in `Error`.
    pub fn recovery_deadline(&self) -> Option<Instant> {
        self.recovery_deadline
    }

    /// Apply the timed `Error -> Idle` transition if its deadline has passed.
    ///
    /// Returns `true` when the transition happened.
    pub fn poll_recovery(&mut self, now: Instant) -> bool {
        match self.recovery_deadline {
            Some(deadline) if self.state == SessionState::Error && now >= deadline => {
                self.recover();
                true
            }
            _ => false,
        }
    }

    /// Sleep until the recovery deadline and apply it. Returns immediately
    /// when the engine is not in `Error`.
    pub async fn wait_for_recovery(&mut self) {
        let Some(deadline) = self.recovery_deadline else {
            return;
        };
        if self.state != SessionState::Error {
            return;
        }
        tokio::time::sleep_until(deadline).await;
        self.recover();
    }

    fn recover(&mut self) {
        debug!("Recovery delay elapsed, returning to idle");
        self.recovery_deadline = None;
        self.last_error = None;
        self.set_state(SessionState::Idle);
    }

    fn ensure_not_loading(&self) -> Result<(), SessionError> {
        if self.state.is_loading() {
            return Err(SessionError::Busy);
        }
        Ok(())
    }

    fn set_state(&mut self, state: SessionState) {
        debug!("Session state {:?} -> {:?}", self.state, state);
        self.state = state;
        self.observer.on_signals_changed(&self.signals());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::clock::FixedClock;
    use crate::ports::conversation_store::{
        ConversationStore, InMemoryConversationStore, StoreError,
    };
    use crate::ports::query_client::{ChunkStream, QueryError};
    use async_trait::async_trait;
    use futures::StreamExt;
    use futures::stream;
    use parley_domain::{AnimationCue, Role};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    enum Script {
        Chunks(Vec<Result<String, QueryError>>),
        Refuse(QueryError),
        /// Yields the chunks, then never ends. Sets the flag when dropped.
        Hang(Vec<String>, Arc<AtomicBool>),
        /// The request never gets a response.
        Unanswered,
    }

    struct DropFlag(Arc<AtomicBool>);

    impl DropFlag {
        fn touch(&self) {}
    }

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct ScriptedClient {
        scripts: Mutex<VecDeque<Script>>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
                queries: Mutex::new(Vec::new()),
            })
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryClient for ScriptedClient {
        async fn stream(&self, query: &str) -> Result<ChunkStream, QueryError> {
            self.queries.lock().unwrap().push(query.to_string());
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected query");
            match script {
                Script::Chunks(items) => Ok(ChunkStream::from_items(items)),
                Script::Refuse(err) => Err(err),
                Script::Unanswered => std::future::pending().await,
                Script::Hang(chunks, dropped) => {
                    let guard = DropFlag(dropped);
                    let inner = stream::iter(chunks.into_iter().map(Ok::<String, QueryError>))
                        .chain(stream::pending())
                        .map(move |item| {
                            guard.touch();
                            item
                        });
                    Ok(ChunkStream::new(inner.boxed()))
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        contents: Mutex<Vec<String>>,
        cues: Mutex<Vec<AnimationCue>>,
    }

    impl SessionObserver for RecordingObserver {
        fn on_signals_changed(&self, signals: &SessionSignals) {
            self.cues.lock().unwrap().push(signals.animation_cue);
        }

        fn on_message_updated(&self, _conversation: &ConversationId, message: &Message) {
            if message.role == Role::Assistant {
                self.contents.lock().unwrap().push(message.content.clone());
            }
        }
    }

    fn chunks(parts: &[&str]) -> Script {
        Script::Chunks(parts.iter().map(|p| Ok(p.to_string())).collect())
    }

    fn engine_with(
        client: Arc<ScriptedClient>,
    ) -> (SessionEngine, Arc<InMemoryConversationStore>) {
        let store = Arc::new(InMemoryConversationStore::new());
        let mut repository =
            ConversationRepository::new(store.clone(), Arc::new(FixedClock::from_millis(1_000)));
        repository.bootstrap().unwrap();
        let engine = SessionEngine::new(repository, client)
            .with_config(SessionConfig::with_error_recovery_ms(3000));
        (engine, store)
    }

    #[tokio::test]
    async fn test_submit_streams_full_answer() {
        let client = ScriptedClient::new(vec![chunks(&["Hi", " there"])]);
        let (mut engine, store) = engine_with(client.clone());

        let outcome = engine.submit("hello").await.unwrap();

        let id = engine.active_id().unwrap().clone();
        assert_eq!(
            outcome,
            SubmitOutcome::Completed {
                conversation: id,
                content: "Hi there".to_string()
            }
        );
        assert_eq!(
            engine.active_messages(),
            &[Message::user("hello"), Message::assistant("Hi there")]
        );
        let signals = engine.signals();
        assert!(!signals.is_loading);
        assert_eq!(signals.animation_cue, AnimationCue::Idle);
        assert_eq!(client.queries(), vec!["hello".to_string()]);
        assert_eq!(store.snapshot()[0].messages(), engine.active_messages());
    }

    #[tokio::test]
    async fn test_assistant_content_is_prefix_concatenation() {
        let client = ScriptedClient::new(vec![chunks(&["a", "bc", "", "def"])]);
        let (engine, _) = engine_with(client);
        let observer = Arc::new(RecordingObserver::default());
        let mut engine = engine.with_observer(observer.clone());

        engine.submit("q").await.unwrap();

        // Placeholder first, then the full text so far after every chunk.
        assert_eq!(
            *observer.contents.lock().unwrap(),
            vec!["", "a", "abc", "abc", "abcdef"]
        );
        assert_eq!(
            *observer.cues.lock().unwrap(),
            vec![
                AnimationCue::Thinking,
                AnimationCue::Thinking,
                AnimationCue::Idle
            ]
        );
    }

    #[tokio::test]
    async fn test_user_message_recorded_before_any_assistant_content() {
        let client = ScriptedClient::new(vec![chunks(&["x"])]);
        let (mut engine, _) = engine_with(client);
        engine.submit("  spaced question ").await.unwrap();

        let messages = engine.active_messages();
        assert_eq!(messages[0], Message::user("  spaced question "));
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_empty_submission_is_noop() {
        let client = ScriptedClient::new(vec![]);
        let (mut engine, store) = engine_with(client.clone());
        let before = store.snapshot();
        let saves = store.save_count();

        assert_eq!(engine.submit("").await.unwrap(), SubmitOutcome::Ignored);
        assert_eq!(engine.submit("  \n\t ").await.unwrap(), SubmitOutcome::Ignored);

        assert_eq!(store.snapshot(), before);
        assert_eq!(store.save_count(), saves);
        assert!(client.queries().is_empty());
        assert_eq!(engine.state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_before_first_chunk() {
        let client = ScriptedClient::new(vec![Script::Refuse(QueryError::Network(
            "connection refused".to_string(),
        ))]);
        let (mut engine, store) = engine_with(client);

        let outcome = engine.submit("x").await.unwrap();

        assert!(matches!(
            outcome,
            SubmitOutcome::Failed(ErrorInfo {
                kind: QueryErrorKind::Network,
                ..
            })
        ));
        assert_eq!(engine.active_messages(), &[Message::user("x")]);
        assert_eq!(store.snapshot()[0].messages(), &[Message::user("x")]);
        let signals = engine.signals();
        assert_eq!(signals.animation_cue, AnimationCue::Error);
        assert!(!signals.is_loading);
        assert_eq!(
            signals.last_error.map(|e| e.kind),
            Some(QueryErrorKind::Network)
        );

        let start = Instant::now();
        engine.wait_for_recovery().await;
        assert!(start.elapsed() >= Duration::from_millis(3000));
        assert_eq!(engine.signals().animation_cue, AnimationCue::Idle);
        assert_eq!(engine.state(), SessionState::Idle);
        assert!(engine.signals().last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_recovery_respects_deadline() {
        let client = ScriptedClient::new(vec![Script::Refuse(QueryError::Protocol {
            status: 500,
            message: "Internal Server Error".to_string(),
        })]);
        let (mut engine, _) = engine_with(client);
        engine.submit("x").await.unwrap();

        assert!(!engine.poll_recovery(Instant::now()));
        tokio::time::advance(Duration::from_millis(2999)).await;
        assert!(!engine.poll_recovery(Instant::now()));
        assert_eq!(engine.state(), SessionState::Error);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(engine.poll_recovery(Instant::now()));
        assert_eq!(engine.state(), SessionState::Idle);
        assert!(engine.recovery_deadline().is_none());
    }

    #[tokio::test]
    async fn test_mid_stream_failure_removes_partial_answer() {
        let client = ScriptedClient::new(vec![Script::Chunks(vec![
            Ok("partial".to_string()),
            Err(QueryError::Decode("invalid utf-8 sequence".to_string())),
        ])]);
        let (mut engine, store) = engine_with(client);
        let before = engine.active_messages().len();

        let outcome = engine.submit("q").await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Failed(ref e) if e.kind == QueryErrorKind::Decode));
        assert_eq!(engine.active_messages().len(), before + 1);
        assert_eq!(engine.active_messages(), &[Message::user("q")]);
        assert_eq!(store.snapshot()[0].messages(), &[Message::user("q")]);
    }

    #[tokio::test]
    async fn test_submit_from_error_is_accepted_immediately() {
        let client = ScriptedClient::new(vec![
            Script::Refuse(QueryError::Network("down".to_string())),
            chunks(&["ok"]),
        ]);
        let (mut engine, _) = engine_with(client);

        engine.submit("first").await.unwrap();
        assert_eq!(engine.state(), SessionState::Error);

        let outcome = engine.submit("second").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
        assert_eq!(engine.state(), SessionState::Idle);
        assert!(engine.recovery_deadline().is_none());
        assert_eq!(
            engine.active_messages(),
            &[
                Message::user("first"),
                Message::user("second"),
                Message::assistant("ok")
            ]
        );
    }

    #[tokio::test]
    async fn test_store_failure_recording_question_is_returned() {
        let client = ScriptedClient::new(vec![chunks(&["a"])]);
        let (mut engine, store) = engine_with(client.clone());
        store.set_fail_saves(true);

        let result = engine.submit("q").await;
        assert!(matches!(
            result,
            Err(SessionError::Repository(RepositoryError::Store(_)))
        ));
        assert_eq!(engine.state(), SessionState::Idle);
        assert!(engine.active_messages().is_empty());
        assert!(client.queries().is_empty());
    }

    /// Store that starts failing after a number of successful saves.
    struct CountdownStore {
        inner: InMemoryConversationStore,
        remaining: Mutex<usize>,
    }

    impl ConversationStore for CountdownStore {
        fn load(&self) -> Vec<Conversation> {
            self.inner.load()
        }

        fn save(&self, conversations: &[Conversation]) -> Result<(), StoreError> {
            let mut remaining = self.remaining.lock().unwrap();
            if *remaining == 0 {
                return Err(StoreError::Io("disk full".to_string()));
            }
            *remaining -= 1;
            self.inner.save(conversations)
        }
    }

    #[tokio::test]
    async fn test_store_failure_while_streaming_enters_error() {
        let client = ScriptedClient::new(vec![chunks(&["a", "b"])]);
        // bootstrap, user message, placeholder, first chunk
        let store = Arc::new(CountdownStore {
            inner: InMemoryConversationStore::new(),
            remaining: Mutex::new(4),
        });
        let mut repository =
            ConversationRepository::new(store.clone(), Arc::new(FixedClock::from_millis(1_000)));
        repository.bootstrap().unwrap();
        let mut engine = SessionEngine::new(repository, client);

        let outcome = engine.submit("q").await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Failed(ref e) if e.kind == QueryErrorKind::Storage));
        assert_eq!(engine.state(), SessionState::Error);
        // Only the question remains in memory, even though the store could
        // not record the removal of the partial answer.
        assert_eq!(engine.active_messages(), &[Message::user("q")]);
        assert_eq!(
            store.inner.snapshot()[0].messages(),
            &[Message::user("q"), Message::assistant("a")]
        );
    }

    #[tokio::test]
    async fn test_cancel_before_first_chunk_removes_placeholder() {
        let dropped = Arc::new(AtomicBool::new(false));
        let client = ScriptedClient::new(vec![Script::Hang(vec![], dropped.clone())]);
        let (mut engine, _) = engine_with(client);
        let token = engine.cancel_token();

        let (outcome, _) = tokio::join!(engine.submit("q"), async {
            tokio::task::yield_now().await;
            token.cancel();
        });

        let outcome = outcome.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Cancelled { ref partial, .. } if partial.is_empty()));
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(engine.active_messages(), &[Message::user("q")]);
        assert_eq!(engine.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_cancel_while_request_is_pending() {
        let client = ScriptedClient::new(vec![Script::Unanswered, chunks(&["ok"])]);
        let (mut engine, store) = engine_with(client.clone());
        let token = engine.cancel_token();

        let (outcome, _) = tokio::join!(engine.submit("q"), async {
            tokio::task::yield_now().await;
            token.cancel();
        });

        let outcome = outcome.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Cancelled { ref partial, .. } if partial.is_empty()));
        assert_eq!(client.queries(), vec!["q".to_string()]);
        assert_eq!(engine.active_messages(), &[Message::user("q")]);
        assert_eq!(store.snapshot()[0].messages(), &[Message::user("q")]);
        assert_eq!(engine.state(), SessionState::Idle);
        assert!(engine.signals().last_error.is_none());

        let outcome = engine.submit("again").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed { ref content, .. } if content == "ok"));
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_keeps_partial_answer() {
        let dropped = Arc::new(AtomicBool::new(false));
        let client = ScriptedClient::new(vec![
            Script::Hang(vec!["half ".to_string(), "done".to_string()], dropped.clone()),
            chunks(&["next"]),
        ]);
        let (mut engine, _) = engine_with(client);
        let token = engine.cancel_token();

        let (outcome, _) = tokio::join!(engine.submit("q"), async {
            tokio::task::yield_now().await;
            token.cancel();
        });

        assert_eq!(
            outcome.unwrap(),
            SubmitOutcome::Cancelled {
                conversation: engine.active_id().unwrap().clone(),
                partial: "half done".to_string()
            }
        );
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(
            engine.active_messages(),
            &[Message::user("q"), Message::assistant("half done")]
        );

        // The cancelled token does not leak into the next submission.
        assert!(token.is_cancelled());
        assert!(!engine.cancel_token().is_cancelled());
        let outcome = engine.submit("again").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn test_submit_without_active_conversation_creates_one() {
        let client = ScriptedClient::new(vec![chunks(&["a"])]);
        let (mut engine, _) = engine_with(client);
        let id = engine.active_id().unwrap().clone();
        engine.delete_conversation(&id).unwrap();
        assert!(engine.conversations().is_empty());

        engine.submit("q").await.unwrap();
        assert_eq!(engine.conversations().len(), 1);
        assert_eq!(engine.active_messages().len(), 2);
    }

    #[tokio::test]
    async fn test_conversation_operations_pass_through() {
        let client = ScriptedClient::new(vec![chunks(&["in a"])]);
        let (mut engine, _) = engine_with(client);
        let first = engine.active_id().unwrap().clone();
        engine.submit("q").await.unwrap();

        let second = engine.create_conversation().unwrap();
        assert_eq!(engine.active_id(), Some(second.id()));
        assert!(engine.active_messages().is_empty());

        let messages = engine.select_conversation(&first).unwrap();
        assert_eq!(messages.len(), 2);

        let missing = ConversationId::new("missing");
        assert_eq!(
            engine.select_conversation(&missing).unwrap_err(),
            SessionError::Repository(RepositoryError::NotFound(missing))
        );
    }
}
