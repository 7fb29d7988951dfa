//! Storage is organized through [blob_storage::BlobStorage].
//! The basic idea is:
//!  - Every piece of state is a JSON blob addressed by a [blob_storage::BlobKey].
//!  - [time_store::TimeStore] is the in-memory task collection.
//!  - [gateway::PersistenceGateway] moves state between the two and validates what it reads.

pub mod blob_storage;
pub mod entities;
pub mod gateway;
pub mod time_store;
