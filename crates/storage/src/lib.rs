//! Storage seam for the submission service.
//!
//! [`FormStore`] is what the HTTP layer talks to. [`SurrealStore`] implements
//! it against the document store's text-command endpoint; the `memory`
//! feature adds in-process implementations for tests.

mod command;
pub mod conformance;
mod envelope;
mod error;
#[cfg(any(test, feature = "memory"))]
mod memory;
mod surreal;
mod traits;
mod transport;

pub use error::{StorageError, UploadError};
#[cfg(any(test, feature = "memory"))]
pub use memory::{MemoryObjectStorage, MemoryStore};
pub use surreal::SurrealStore;
pub use traits::{FormStore, ObjectStorage};
pub use transport::{HttpTransport, StoreConfig, Transport};
