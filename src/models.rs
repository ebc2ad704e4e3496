use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A retrieval citation attached to an assistant answer.
///
/// Created once by the backend, never mutated client-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    /// Name of the document the snippet was retrieved from
    pub document_name: String,
    /// The retrieved text fragment
    pub content_snippet: String,
    /// Relevance score in 0..1
    pub score: f64,
}

/// A record of one tool invocation made by the agent while answering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallInfo {
    pub tool_name: String,
    pub reasoning: String,
}

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One message in the chat transcript.
///
/// The newest assistant message is the only one open for appends, and only
/// while the session's streaming flag is set. `finalize` attaches citations
/// and tool calls exactly once, after which the message is immutable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Unique within one session's transcript
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallInfo>>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new message with empty attachments.
    pub fn new(id: String, role: MessageRole, content: String) -> Self {
        Self {
            id,
            role,
            content,
            sources: None,
            tool_calls: None,
            timestamp: Utc::now(),
        }
    }

    /// Append a streamed token to the message content.
    pub fn append_token(&mut self, token: &str) {
        self.content.push_str(token);
    }

    /// Attach the turn's citations and tool calls, closing the message.
    pub fn finalize(&mut self, sources: Vec<Source>, tool_calls: Vec<ToolCallInfo>) {
        self.sources = Some(sources);
        self.tool_calls = Some(tool_calls);
    }
}

/// Request body for the streaming chat endpoint.
///
/// `conversation_id` and `bot_id` serialize as JSON null when absent; the
/// backend treats a null conversation_id as "start a new conversation".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatStreamRequest {
    pub message: String,
    pub conversation_id: Option<String>,
    pub bot_id: Option<String>,
}

impl ChatStreamRequest {
    /// Create a request that starts a new conversation.
    pub fn new(message: String) -> Self {
        Self {
            message,
            conversation_id: None,
            bot_id: None,
        }
    }

    /// Create a request that continues an existing conversation.
    pub fn with_conversation(message: String, conversation_id: String) -> Self {
        Self {
            message,
            conversation_id: Some(conversation_id),
            bot_id: None,
        }
    }
}

/// Summary row from the conversation list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationSummary {
    pub id: String,
    pub tenant_id: String,
    pub bot_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One persisted message inside a conversation detail record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageDetail {
    pub id: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub latency_ms: Option<i64>,
    #[serde(default)]
    pub retrieved_chunks: Option<Vec<serde_json::Value>>,
}

/// Full conversation history returned by the detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationDetail {
    pub id: String,
    pub tenant_id: String,
    pub bot_id: Option<String>,
    pub messages: Vec<MessageDetail>,
    pub created_at: DateTime<Utc>,
}
