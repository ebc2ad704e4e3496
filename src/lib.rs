//! Ragchat - streaming chat client for a RAG customer-service backend
//!
//! The core pipeline: [`client::ApiClient`] opens a streaming HTTP POST,
//! [`sse::FrameDecoder`] turns the chunked body into typed
//! [`sse::StreamEvent`]s, and [`session::ChatController`] applies them to the
//! [`session::ChatSession`] transcript under strict ordering.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod prelude;
pub mod session;
pub mod sse;
