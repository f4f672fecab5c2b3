//! Store lifecycle facade.
//!
//! # Responsibility
//! - Own the embedded store handle from open to close.
//! - Route repository operations through the owned connection.
//!
//! # Invariants
//! - Every open failure is surfaced as an error; no handle is returned
//!   half-initialized.
//! - Closing consumes the store, so a closed handle cannot be reused.

pub mod entity_store;
