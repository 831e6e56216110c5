//! fsgate - serialized storage accessor with bounded-memory HTTP streaming.
//!
//! All filesystem access is single-threaded behind one worker task; callers
//! submit operations over a bounded channel and block for their own result.
//! See [`accessor`] for the core, [`server`] for the HTTP front end, and
//! [`net`]/[`input`] for the hardware-facing collaborators.

pub mod accessor;
pub mod config;
pub mod error;
pub mod input;
pub mod net;
pub mod server;

pub use accessor::{StorageAccessor, WorkerConfig, HTTP_CHUNK_SIZE};
pub use config::ServeConfig;
pub use error::{StorageError, StorageResult};
