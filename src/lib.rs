//! Stowage - streaming file storage service
//!
//! Accepts chunked uploads, stores each file under a collision-resistant
//! name, streams files back in bounded frames, and lists stored files.
//! Each operation class is subject to its own concurrency limit.

pub mod admission;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod transfer;
pub mod web;

pub use admission::{AdmissionController, AdmissionPermit, OperationClass};
pub use config::Config;
pub use db::Database;
pub use error::{ErrorKind, Result, StowageError};
pub use file::{FileRepository, FileService, LocalBlobStore};
