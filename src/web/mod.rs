//! HTTP gateway: JSON-over-POST routes for users, cases, chats and documents.

pub mod handlers;
pub mod server;
pub mod types;

pub use server::{GatewayState, build_router, start_server};
