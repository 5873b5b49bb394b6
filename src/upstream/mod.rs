//! Upstream provider clients
//!
//! Thin reqwest clients for the auth provider and the chat-completion provider.

pub mod openai;
pub mod supabase;

pub use openai::{ChatClient, ChatMessage, ChatRequest, ChatStream, Completion, Usage};
pub use supabase::{Session, SessionUser, SupabaseClient};
