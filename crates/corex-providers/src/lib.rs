//! The LLM Client Abstraction (a sum type over model providers sharing one
//! chat-complete + stream capability) and the Tool Registry (a capability
//! interface checked at startup, never dynamically loaded).

pub mod client;
pub mod error;
pub mod registry;
pub mod tool;

pub use client::{ChatDelta, ChatMessage, ChatRequest, ChatRole, EndpointConfig, ModelProvider};
pub use error::{Error, Result};
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolContext, ToolDescriptor};
