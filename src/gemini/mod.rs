pub mod client;
pub mod schema;

pub use client::{ChatRole, ChatTurn, GeminiClient};
pub use schema::Schema;
