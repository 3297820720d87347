//! Parcel domain model.
//!
//! # Responsibility
//! - Define the stored parcel record and its creation input.
//! - Encode the status values that carry behavior.
//!
//! # Invariants
//! - A parcel `number` is assigned by storage and never reused by callers.
//! - Only `registered` parcels accept address changes and deletion.

pub mod parcel;
