//! Bugle Core
//!
//! Shared types for the real-time fan-out subsystem: the event model that
//! crosses the broker, the client control protocol, environment
//! configuration, and the backoff helper used by everything that reconnects.

pub mod backoff;
pub mod config;
pub mod error;
pub mod event;
pub mod protocol;

pub use backoff::Backoff;
pub use config::Config;
pub use error::{BugleError, BugleResult};
pub use event::{Envelope, Event, NOTIFICATIONS_CHANNEL};
pub use protocol::{ClientMessage, OrganizationRef};
