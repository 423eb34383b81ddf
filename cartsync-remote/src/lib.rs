//! # cartsync-remote
//!
//! The list-service capability the sync engine drives, plus its backends:
//!
//! - [`backend::checklist`]: Markdown checklist files (the note side)
//! - [`backend::bring`]: the Bring! REST API (the shopping side)
//! - [`backend::memory`]: in-process lists for tests and embedding
//!
//! [`session`] caches login tokens between process runs.

pub mod backend;
pub mod error;
pub mod service;
pub mod session;

pub use backend::{from_config, ChecklistService, MemoryService};
pub use error::RemoteError;
pub use service::ListService;
