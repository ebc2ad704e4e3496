//! Prelude module for convenient imports.
//!
//! ```ignore
//! use ragchat::prelude::*;
//! ```

pub use crate::client::{ApiClient, CancelToken};
pub use crate::config::ClientConfig;
pub use crate::error::{ApiError, Result};
pub use crate::models::{
    ChatMessage, ChatStreamRequest, ConversationDetail, ConversationSummary, MessageDetail,
    MessageRole, Source, ToolCallInfo,
};
pub use crate::session::{ChatController, ChatSession};
pub use crate::sse::{FrameDecoder, StreamEvent};
