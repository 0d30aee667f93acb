//! Session channel management for the SSE transport.
//!
//! Every client gets a session when it opens the event stream. A session owns:
//!
//! - a bounded outbound channel feeding that client's stream (and nobody
//!   else's),
//! - a bounded job queue drained by a single worker task, so messages of one
//!   session are handled and answered in arrival order, one at a time,
//! - an open flag checked before anything is delivered.
//!
//! A client that stops reading its stream fills the outbound channel, which
//! stalls the worker until the job queue fills and new messages are refused.
//!
//! Closing a session (stream dropped, explicit close, or shutdown) removes it
//! from the live set. A handler already running finishes, but its result is
//! dropped rather than delivered.

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures::{FutureExt, Stream};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::protocol::JsonRpcResponse;
use crate::domains::tools::executor::PreparedCall;
use crate::domains::tools::{ToolError, ToolExecutor};

// ============================================================================
// Types
// ============================================================================

/// Opaque, unique session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `tools/call` addressed to a session.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// JSON-RPC id the answer must carry.
    pub request_id: Option<Value>,
    pub tool_name: String,
    pub arguments: Value,
}

/// What a session's event stream yields.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// First frame of every stream: the id to post messages with.
    Endpoint(SessionId),
    /// A JSON-RPC message for the client.
    Message(Value),
}

/// Errors that can occur while routing a message to a session.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No live session has this id.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The session has too many messages waiting.
    #[error("Session {0} is busy, try again later")]
    QueueFull(String),

    /// The call was rejected before execution.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

enum Job {
    Reply(Value),
    Call {
        request_id: Option<Value>,
        call: PreparedCall,
    },
}

struct Session {
    jobs: mpsc::Sender<Job>,
    open: Arc<AtomicBool>,
    /// Dropping this ends the client's stream.
    _hangup: oneshot::Sender<()>,
}

// ============================================================================
// Manager
// ============================================================================

struct Inner {
    sessions: Mutex<HashMap<SessionId, Session>>,
    executor: Arc<ToolExecutor>,
    queue_capacity: usize,
}

/// Owns every live session. Cheap to clone.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(executor: Arc<ToolExecutor>, queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: Mutex::new(HashMap::new()),
                executor,
                queue_capacity: queue_capacity.max(1),
            }),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Session>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a session and return the stream feeding its client.
    ///
    /// Dropping the stream closes the session.
    pub fn open_session(&self) -> SessionStream {
        let id = SessionId::generate();
        let (jobs_tx, jobs_rx) = mpsc::channel(self.inner.queue_capacity);
        let (out_tx, out_rx) = mpsc::channel(self.inner.queue_capacity);
        let (hangup_tx, hangup_rx) = oneshot::channel();
        let open = Arc::new(AtomicBool::new(true));

        // Fresh channel with room for at least one frame.
        let _ = out_tx.try_send(OutboundFrame::Endpoint(id.clone()));

        tokio::spawn(run_session(id.clone(), jobs_rx, out_tx, open.clone()));

        self.sessions().insert(
            id.clone(),
            Session {
                jobs: jobs_tx,
                open,
                _hangup: hangup_tx,
            },
        );
        info!("Session {} opened ({} live)", id, self.len());

        SessionStream {
            frames: out_rx,
            hangup: hangup_rx,
            ended: false,
            guard: SessionGuard {
                manager: self.clone(),
                id,
            },
        }
    }

    /// Close a session. Returns `false` if it was already closed.
    pub fn close_session(&self, id: &SessionId) -> bool {
        let removed = self.sessions().remove(id);
        match removed {
            Some(session) => {
                session.open.store(false, Ordering::Release);
                info!("Session {} closed ({} live)", id, self.len());
                true
            }
            None => false,
        }
    }

    /// Close every session, ending all open streams.
    pub fn close_all(&self) {
        let drained: Vec<(SessionId, Session)> = self.sessions().drain().collect();
        for (_, session) in &drained {
            session.open.store(false, Ordering::Release);
        }
        if !drained.is_empty() {
            info!("Closed {} session(s)", drained.len());
        }
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate a tool call and queue it on the session.
    ///
    /// Unknown tools and invalid arguments are rejected here, before anything
    /// is queued; the handler itself runs later on the session's worker.
    pub fn dispatch(&self, id: &SessionId, request: InvocationRequest) -> Result<(), ChannelError> {
        let jobs = self.jobs(id)?;
        let call = self
            .inner
            .executor
            .prepare(&request.tool_name, request.arguments)?;

        debug!("Queueing '{}' on session {}", call.tool_name(), id);
        enqueue(
            &jobs,
            id,
            Job::Call {
                request_id: request.request_id,
                call,
            },
        )
    }

    /// Queue an already computed message for delivery on the session, behind
    /// anything queued before it.
    pub fn reply(&self, id: &SessionId, message: JsonRpcResponse) -> Result<(), ChannelError> {
        let jobs = self.jobs(id)?;
        let value = serde_json::to_value(&message)
            .map_err(|e| ToolError::internal(format!("failed to encode reply: {}", e)))?;
        enqueue(&jobs, id, Job::Reply(value))
    }

    fn jobs(&self, id: &SessionId) -> Result<mpsc::Sender<Job>, ChannelError> {
        self.sessions()
            .get(id)
            .map(|s| s.jobs.clone())
            .ok_or_else(|| ChannelError::SessionNotFound(id.to_string()))
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("live", &self.len())
            .field("queue_capacity", &self.inner.queue_capacity)
            .finish()
    }
}

fn enqueue(jobs: &mpsc::Sender<Job>, id: &SessionId, job: Job) -> Result<(), ChannelError> {
    jobs.try_send(job).map_err(|e| match e {
        mpsc::error::TrySendError::Full(_) => {
            warn!("Session {} queue is full", id);
            ChannelError::QueueFull(id.to_string())
        }
        mpsc::error::TrySendError::Closed(_) => ChannelError::SessionNotFound(id.to_string()),
    })
}

/// Worker draining one session's queue in order.
async fn run_session(
    id: SessionId,
    mut jobs: mpsc::Receiver<Job>,
    outbound: mpsc::Sender<OutboundFrame>,
    open: Arc<AtomicBool>,
) {
    while let Some(job) = jobs.recv().await {
        if !open.load(Ordering::Acquire) {
            break;
        }

        let message = match job {
            Job::Reply(message) => message,
            Job::Call { request_id, call } => {
                let result = call.run().await;
                let response = match serde_json::to_value(&result) {
                    Ok(value) => JsonRpcResponse::success(request_id, value),
                    Err(e) => JsonRpcResponse::internal_error(request_id, e.to_string()),
                };
                match serde_json::to_value(&response) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!("Failed to encode response on session {}: {}", id, e);
                        continue;
                    }
                }
            }
        };

        if !open.load(Ordering::Acquire) {
            debug!("Session {} closed, dropping late result", id);
            break;
        }
        if outbound.send(OutboundFrame::Message(message)).await.is_err() {
            break;
        }
    }
    debug!("Session {} worker stopped", id);
}

// ============================================================================
// Stream
// ============================================================================

/// Closes its session when dropped.
struct SessionGuard {
    manager: SessionManager,
    id: SessionId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.manager.close_session(&self.id);
    }
}

/// The outbound side of a session, as a stream of frames.
///
/// Ends when the session is closed.
pub struct SessionStream {
    frames: mpsc::Receiver<OutboundFrame>,
    hangup: oneshot::Receiver<()>,
    ended: bool,
    guard: SessionGuard,
}

impl SessionStream {
    pub fn id(&self) -> &SessionId {
        &self.guard.id
    }
}

impl Stream for SessionStream {
    type Item = OutboundFrame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.ended {
            return Poll::Ready(None);
        }
        // The sender is never used; completion means the session was removed.
        if this.hangup.poll_unpin(cx).is_ready() {
            this.ended = true;
            return Poll::Ready(None);
        }
        match this.frames.poll_recv(cx) {
            Poll::Ready(None) => {
                this.ended = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl fmt::Debug for SessionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStream")
            .field("id", &self.guard.id)
            .field("ended", &self.ended)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::{ToolDefinition, ToolRegistry};
    use futures::StreamExt;
    use rmcp::handler::server::tool::schema_for_type;
    use rmcp::model::{CallToolResult, Content, Tool};
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoParams {
        text: String,
    }

    fn tool(name: &str) -> Tool {
        Tool {
            name: name.to_string().into(),
            description: None,
            input_schema: schema_for_type::<EchoParams>().into(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    struct Fixture {
        manager: SessionManager,
        gate: Arc<Notify>,
        finished: Arc<AtomicUsize>,
    }

    /// `echo` answers immediately; `gated` waits for `gate` before answering.
    fn fixture() -> Fixture {
        let gate = Arc::new(Notify::new());
        let finished = Arc::new(AtomicUsize::new(0));

        let mut registry = ToolRegistry::new();
        registry
            .register(ToolDefinition::new(tool("echo"), |p: EchoParams| async move {
                Ok(CallToolResult::success(vec![Content::text(p.text)]))
            }).unwrap())
            .unwrap();
        let (g, f) = (gate.clone(), finished.clone());
        registry
            .register(ToolDefinition::new(tool("gated"), move |p: EchoParams| {
                let (gate, finished) = (g.clone(), f.clone());
                async move {
                    gate.notified().await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(CallToolResult::success(vec![Content::text(p.text)]))
                }
            }).unwrap())
            .unwrap();

        let executor = Arc::new(ToolExecutor::new(registry));
        Fixture {
            manager: SessionManager::new(executor, 8),
            gate,
            finished,
        }
    }

    fn call(id: i64, tool: &str, text: &str) -> InvocationRequest {
        InvocationRequest {
            request_id: Some(json!(id)),
            tool_name: tool.to_string(),
            arguments: json!({ "text": text }),
        }
    }

    async fn next_message(stream: &mut SessionStream) -> Value {
        match tokio::time::timeout(Duration::from_secs(5), stream.next()).await {
            Ok(Some(OutboundFrame::Message(message))) => message,
            other => panic!("expected a message frame, got {:?}", other),
        }
    }

    async fn skip_endpoint(stream: &mut SessionStream) {
        let frame = stream.next().await;
        assert_eq!(frame, Some(OutboundFrame::Endpoint(stream.id().clone())));
    }

    #[tokio::test]
    async fn test_open_sessions_are_unique() {
        let fx = fixture();
        let a = fx.manager.open_session();
        let b = fx.manager.open_session();
        assert_ne!(a.id(), b.id());
        assert_eq!(fx.manager.len(), 2);
    }

    #[tokio::test]
    async fn test_results_reach_only_their_session() {
        let fx = fixture();
        let mut a = fx.manager.open_session();
        let mut b = fx.manager.open_session();
        skip_endpoint(&mut a).await;
        skip_endpoint(&mut b).await;

        fx.manager.dispatch(a.id(), call(1, "echo", "for a")).unwrap();

        let message = next_message(&mut a).await;
        assert_eq!(message["id"], json!(1));
        assert_eq!(message["result"]["content"][0]["text"], json!("for a"));

        let nothing = tokio::time::timeout(Duration::from_millis(100), b.next()).await;
        assert!(nothing.is_err(), "session B must not receive A's result");
    }

    #[tokio::test]
    async fn test_messages_are_answered_in_order() {
        let fx = fixture();
        let mut stream = fx.manager.open_session();
        skip_endpoint(&mut stream).await;
        let id = stream.id().clone();

        fx.manager.dispatch(&id, call(1, "gated", "slow")).unwrap();
        fx.manager.dispatch(&id, call(2, "echo", "fast")).unwrap();
        fx.manager
            .reply(&id, JsonRpcResponse::success(Some(json!(3)), json!({})))
            .unwrap();
        fx.gate.notify_one();

        assert_eq!(next_message(&mut stream).await["id"], json!(1));
        assert_eq!(next_message(&mut stream).await["id"], json!(2));
        assert_eq!(next_message(&mut stream).await["id"], json!(3));
    }

    #[tokio::test]
    async fn test_close_session_twice_is_noop() {
        let fx = fixture();
        let stream = fx.manager.open_session();
        let id = stream.id().clone();

        assert!(fx.manager.close_session(&id));
        assert!(!fx.manager.close_session(&id));
        assert!(fx.manager.is_empty());

        // Dropping the stream closes again; still fine.
        drop(stream);
        assert!(fx.manager.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_to_unknown_session() {
        let fx = fixture();
        let err = fx
            .manager
            .dispatch(&SessionId::from("missing"), call(1, "echo", "x"))
            .unwrap_err();
        assert!(matches!(err, ChannelError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_structural_errors_are_returned_not_queued() {
        let fx = fixture();
        let mut stream = fx.manager.open_session();
        skip_endpoint(&mut stream).await;
        let id = stream.id().clone();

        let err = fx.manager.dispatch(&id, call(1, "nope", "x")).unwrap_err();
        assert!(matches!(err, ChannelError::Tool(ToolError::NotFound(_))));

        let invalid = InvocationRequest {
            request_id: Some(json!(2)),
            tool_name: "echo".into(),
            arguments: json!({}),
        };
        let err = fx.manager.dispatch(&id, invalid).unwrap_err();
        assert!(matches!(err, ChannelError::Tool(ToolError::Validation { .. })));

        let nothing = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_late_result_is_dropped_after_close() {
        let fx = fixture();
        let mut stream = fx.manager.open_session();
        skip_endpoint(&mut stream).await;
        let id = stream.id().clone();

        fx.manager.dispatch(&id, call(1, "gated", "late")).unwrap();
        // Let the worker pick the job up before closing.
        tokio::time::sleep(Duration::from_millis(50)).await;
        fx.manager.close_session(&id);
        fx.gate.notify_one();

        let end = tokio::time::timeout(Duration::from_secs(5), stream.next()).await;
        assert_eq!(end.unwrap(), None);

        // The handler still ran to completion.
        tokio::time::timeout(Duration::from_secs(5), async {
            while fx.finished.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert!(matches!(
            fx.manager.dispatch(&id, call(2, "echo", "x")),
            Err(ChannelError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_close_all_ends_streams() {
        let fx = fixture();
        let mut a = fx.manager.open_session();
        let mut b = fx.manager.open_session();
        skip_endpoint(&mut a).await;
        skip_endpoint(&mut b).await;

        fx.manager.close_all();

        assert_eq!(a.next().await, None);
        assert_eq!(b.next().await, None);
        assert!(fx.manager.is_empty());
    }

    #[tokio::test]
    async fn test_queue_full() {
        let fx = fixture();
        let stream = fx.manager.open_session();
        let id = stream.id().clone();

        // The worker is blocked on the first call; fill the rest of the queue.
        fx.manager.dispatch(&id, call(0, "gated", "block")).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        for i in 1..=8 {
            fx.manager.dispatch(&id, call(i, "echo", "x")).unwrap();
        }
        let err = fx.manager.dispatch(&id, call(9, "echo", "x")).unwrap_err();
        assert!(matches!(err, ChannelError::QueueFull(_)));
    }

    #[tokio::test]
    async fn test_unread_stream_backs_up_into_queue_full() {
        let fx = fixture();
        let mut stream = fx.manager.open_session();
        let id = stream.id().clone();

        // Never read the stream; keep posting in batches the worker can drain.
        let mut accepted = 0i64;
        let mut refused = false;
        'batches: for _ in 0..50 {
            for _ in 0..8 {
                match fx.manager.dispatch(&id, call(accepted, "echo", "x")) {
                    Ok(()) => accepted += 1,
                    Err(ChannelError::QueueFull(_)) => {
                        refused = true;
                        break 'batches;
                    }
                    Err(other) => panic!("unexpected error: {:?}", other),
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert!(refused, "queue never filled after {} calls", accepted);
        // Outbound frames, the job queue and the job in flight.
        assert!(accepted <= 8 + 8 + 1, "accepted {} calls", accepted);

        // Nothing was lost: every accepted call is answered, in order.
        skip_endpoint(&mut stream).await;
        for expected in 0..accepted {
            assert_eq!(next_message(&mut stream).await["id"], json!(expected));
        }
        fx.manager.dispatch(&id, call(accepted, "echo", "x")).unwrap();
        assert_eq!(next_message(&mut stream).await["id"], json!(accepted));
    }
}
