//! # txlab Core
//!
//! Explicit transaction boundaries over the txlab record store.
//!
//! This crate provides:
//! - [`BoundaryConfig`]: declarative boundary configuration (propagation,
//!   isolation, read-only flag, rollback rule)
//! - [`BoundaryRunner`]: the only way to open a boundary; runs a body
//!   closure and guarantees commit-or-rollback on every exit path
//! - [`Lazy`]: explicit detached-association marker that fails with
//!   `StaleAccess` outside its owning boundary
//! - [`RecordRepository`]: typed data access for the demo entities
//! - [`CoreError`]: the failure taxonomy consulted by rollback rules
//!
//! A boundary exists only where [`BoundaryRunner::execute`] opened one.
//! Calling another operation's body function directly, instead of going
//! through the runner, silently skips that operation's configuration. This
//! is a deliberate property of the explicit-wrapper design, and one of the
//! pitfalls the workspace demonstrates.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod boundary;
mod codec;
mod config;
mod error;
mod lazy;
mod model;
mod record;
mod repository;

pub use boundary::{BoundaryCtx, BoundaryRunner, BoundaryToken, Completion};
pub use codec::{from_cbor, to_cbor, RecordCodec};
pub use config::{BoundaryConfig, Propagation, RollbackRule};
pub use error::{CoreError, CoreResult, FailureCategory};
pub use lazy::{Deferred, Lazy};
pub use model::{ContactCard, FetchedPerson, Person};
pub use record::RecordId;
pub use repository::{RecordRepository, CONTACT_TABLE, PERSON_TABLE};

pub use txlab_store::{IsolationLevel, RecordStore, Version};
