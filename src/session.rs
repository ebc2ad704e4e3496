//! Chat session state and the streaming turn controller.
//!
//! [`ChatSession`] owns the transcript and the per-conversation flags; any UI
//! binding is an adapter reading it after each mutation. [`ChatController`]
//! drives one send-message turn end to end: it opens the stream, applies
//! every decoded event to the session synchronously and in arrival order,
//! and closes the turn at `done`, on transport failure, or on cancellation.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::client::{ApiClient, CancelToken};
use crate::error::Result;
use crate::models::{
    ChatMessage, ChatStreamRequest, ConversationDetail, MessageRole, Source, ToolCallInfo,
};
use crate::sse::StreamEvent;

/// Fallback shown for an `error` frame that carries no message.
pub const ERROR_FALLBACK: &str = "Something went wrong. Please try again later.";

/// Prefix that distinguishes in-band error text from normal tokens.
const ERROR_MARKER: &str = "\u{26a0}\u{fe0f} ";

/// Short in-progress hints keyed by tool name, shown while the agent works.
static TOOL_HINTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut hints = HashMap::new();
    hints.insert("rag_query", "\u{1f50d} Searching the knowledge base");
    hints
});

/// Look up the in-progress hint for a tool, if one is defined.
pub fn tool_hint_for(tool_name: &str) -> Option<&'static str> {
    TOOL_HINTS.get(tool_name).copied()
}

/// Mutable chat state for one end-user session.
///
/// At most one message is open for appends at any time: the last message in
/// the transcript, and only while it is an assistant message.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    pub messages: Vec<ChatMessage>,
    pub is_streaming: bool,
    pub conversation_id: Option<String>,
    /// Routing identifier for the selected bot, sent with every request
    pub bot_id: Option<String>,
    /// In-progress hint derived from the current tool call, if any
    pub tool_hint: Option<String>,
    next_message_id: u64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> String {
        self.next_message_id += 1;
        format!("msg-{}", self.next_message_id)
    }

    /// Append a user message with the given content, verbatim.
    pub fn add_user_message(&mut self, content: &str) {
        let id = self.next_id();
        self.messages
            .push(ChatMessage::new(id, MessageRole::User, content.to_string()));
    }

    /// Open a new, empty assistant message at the end of the transcript.
    pub fn start_assistant_message(&mut self) {
        let id = self.next_id();
        self.messages
            .push(ChatMessage::new(id, MessageRole::Assistant, String::new()));
    }

    /// Append a token to the open assistant message.
    ///
    /// No-op when the last message is not an assistant message.
    pub fn append_to_assistant(&mut self, token: &str) {
        if let Some(msg) = self.open_assistant_mut() {
            msg.append_token(token);
        }
    }

    /// Attach citations and tool calls to the open assistant message, closing it.
    pub fn finalize_assistant(&mut self, sources: Vec<Source>, tool_calls: Vec<ToolCallInfo>) {
        if let Some(msg) = self.open_assistant_mut() {
            msg.finalize(sources, tool_calls);
        }
    }

    fn open_assistant_mut(&mut self) -> Option<&mut ChatMessage> {
        self.messages
            .last_mut()
            .filter(|msg| msg.role == MessageRole::Assistant)
    }

    pub fn set_streaming(&mut self, is_streaming: bool) {
        self.is_streaming = is_streaming;
    }

    /// Record the server-assigned conversation id (last write wins).
    pub fn set_conversation_id(&mut self, id: String) {
        self.conversation_id = Some(id);
    }

    pub fn set_bot_id(&mut self, bot_id: Option<String>) {
        self.bot_id = bot_id;
    }

    pub fn set_tool_hint(&mut self, hint: Option<String>) {
        self.tool_hint = hint;
    }

    /// Reset the transcript and conversation id for a fresh conversation.
    ///
    /// Does not cancel an in-flight stream; callers wanting that use
    /// [`ChatController::cancel`] first.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.conversation_id = None;
    }

    /// Replace the transcript wholesale from a persisted conversation.
    ///
    /// A loaded conversation is never mid-stream, so the streaming flag is
    /// left untouched.
    pub fn load_conversation(&mut self, detail: &ConversationDetail) {
        self.messages = detail
            .messages
            .iter()
            .map(|msg| {
                let role = if msg.role == "user" {
                    MessageRole::User
                } else {
                    MessageRole::Assistant
                };
                ChatMessage {
                    id: msg.id.clone(),
                    role,
                    content: msg.content.clone(),
                    sources: None,
                    tool_calls: None,
                    timestamp: msg.created_at,
                }
            })
            .collect();
        self.conversation_id = Some(detail.id.clone());
        self.bot_id = detail.bot_id.clone();
    }
}

/// Turn-scoped buffers for citations and tool calls.
///
/// Attached to the open assistant message only at `done`; a turn that ends
/// any other way drops them.
#[derive(Debug, Default)]
struct TurnBuffers {
    sources: Vec<Source>,
    tool_calls: Vec<ToolCallInfo>,
}

/// Apply one decoded stream event to the session state.
fn apply_stream_event(session: &mut ChatSession, turn: &mut TurnBuffers, event: &StreamEvent) {
    match event {
        StreamEvent::Token { content } => {
            session.set_tool_hint(None);
            session.append_to_assistant(content);
        }
        StreamEvent::Sources { sources } => {
            turn.sources = sources.clone();
        }
        StreamEvent::ToolCalls { tool_calls } => {
            if let Some(hint) = tool_calls.first().and_then(|t| tool_hint_for(&t.tool_name)) {
                session.set_tool_hint(Some(hint.to_string()));
            }
            turn.tool_calls = tool_calls.clone();
        }
        StreamEvent::ConversationId { conversation_id } => {
            session.set_conversation_id(conversation_id.clone());
        }
        StreamEvent::Error { message } => {
            session.set_tool_hint(None);
            let text = message
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(ERROR_FALLBACK);
            session.append_to_assistant(&format!("{}{}", ERROR_MARKER, text));
        }
        StreamEvent::Done => {
            session.finalize_assistant(
                std::mem::take(&mut turn.sources),
                std::mem::take(&mut turn.tool_calls),
            );
            session.set_tool_hint(None);
            session.set_streaming(false);
        }
        StreamEvent::Unknown => {}
    }
}

/// Close a turn that ended without a `done` frame, keeping partial content.
fn close_turn(session: &mut ChatSession) {
    session.set_tool_hint(None);
    session.set_streaming(false);
}

/// Drives send-message turns against a [`ChatSession`].
pub struct ChatController {
    client: ApiClient,
    session: ChatSession,
    cancel: CancelToken,
}

impl ChatController {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            session: ChatSession::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Read-only view of the session state.
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// The underlying API client, for REST reads alongside the chat flow.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session_mut(&mut self) -> &mut ChatSession {
        &mut self.session
    }

    /// Handle for cancelling the current turn from another task.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cancellation of the in-flight turn ("stop generating").
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Send one user message and stream the assistant's answer into the session.
    ///
    /// Fire-and-forget from the UI's perspective: every failure mode degrades
    /// to "the assistant message stops updating and the streaming flag turns
    /// off". Nothing panics or propagates to the caller.
    pub async fn send_message(&mut self, text: &str) {
        self.send_message_with(text, |_, _| {}).await;
    }

    /// Like [`send_message`](Self::send_message), invoking `observe` with the
    /// event and the session state after each event has been applied. UI
    /// adapters hook re-rendering here.
    pub async fn send_message_with(
        &mut self,
        text: &str,
        mut observe: impl FnMut(&StreamEvent, &ChatSession),
    ) {
        // Silent guard: without a credential this must be a complete no-op.
        if !self.client.is_authenticated() {
            debug!("send_message called without credential; ignoring");
            return;
        }

        // Fresh token per turn so an earlier cancel cannot leak into this one.
        self.cancel = CancelToken::new();

        let request = ChatStreamRequest {
            message: text.to_string(),
            conversation_id: self.session.conversation_id.clone(),
            bot_id: self.session.bot_id.clone(),
        };

        self.session.add_user_message(text);
        self.session.start_assistant_message();
        self.session.set_streaming(true);
        self.session.set_tool_hint(None);

        let mut turn = TurnBuffers::default();
        let Self {
            client,
            session,
            cancel,
        } = self;

        let result = client
            .stream_chat(&request, cancel, |event| {
                apply_stream_event(session, &mut turn, &event);
                observe(&event, session);
            })
            .await;

        match result {
            Ok(()) => {
                // A well-behaved stream closed the turn via `done`. If the
                // body ended without one, the turn still must not stay open.
                if session.is_streaming {
                    warn!("chat stream ended without done frame");
                    close_turn(session);
                }
            }
            Err(err) if err.is_cancelled() => {
                info!("turn cancelled; partial content kept");
                close_turn(session);
            }
            Err(err) => {
                warn!(error = %err, "chat stream failed; partial content kept");
                if session.is_streaming {
                    close_turn(session);
                }
            }
        }
    }

    /// Fetch a persisted conversation and load it into the session.
    pub async fn load_conversation(&mut self, conversation_id: &str) -> Result<()> {
        let detail = self.client.fetch_conversation(conversation_id).await?;
        self.session.load_conversation(&detail);
        Ok(())
    }

    /// Reset the transcript for a fresh conversation.
    pub fn clear_messages(&mut self) {
        self.session.clear_messages();
    }
}
