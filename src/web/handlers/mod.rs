//! Route handlers, one module per entity.

pub mod cases;
pub mod chats;
pub mod documents;
pub mod users;
