//! girder-core library.
//!
//! Client-side engagement state for the girder network: the vote, like,
//! save, comment, and accepted-answer transitions, the normalized content
//! store that every view reads from, and the optimistic command ledger that
//! lets a failed backend sync be reverted.
//!
//! # Conventions
//!
//! - **Errors**: module errors are `thiserror` enums mapped onto [`error::ErrorCode`];
//!   binaries wrap them in `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod answers;
pub mod api;
pub mod command;
pub mod config;
pub mod engage;
pub mod error;
pub mod lock;
pub mod model;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod thread;

pub use engage::{apply_like, apply_save, apply_vote};
pub use model::{ContentId, VoteDirection};
pub use store::{Action, ContentStore};
