//! Bugle Redis Layer
//!
//! The broker bridge (Pub/Sub publisher and auto-reconnecting subscriber),
//! the read-through cache helpers, and the post-commit hooks that mutation
//! services run after a durable write.

pub mod cache;
pub mod client;
pub mod hooks;
pub mod publisher;
pub mod subscriber;

pub use client::{init_pool, RedisError, RedisPool, RedisResult};
pub use hooks::PostCommitHooks;
pub use publisher::EventPublisher;
pub use subscriber::EventSubscriber;
