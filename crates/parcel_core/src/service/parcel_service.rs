//! Parcel use-case service.
//!
//! # Responsibility
//! - Register parcels with default status and creation time.
//! - Move parcels along `registered -> sent -> delivered`.
//! - Delegate guarded address changes and deletion to the repository.
//!
//! # Invariants
//! - Service APIs never bypass repository persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::parcel::{ClientId, NewParcel, Parcel, ParcelNumber, ParcelStatus};
use crate::repo::parcel_repo::{ChangeOutcome, ParcelRepository, RepoResult};

/// Use-case service wrapper for parcel tracking.
pub struct ParcelService<R: ParcelRepository> {
    repo: R,
}

impl<R: ParcelRepository> ParcelService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the underlying repository for direct CRUD access.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Registers a new parcel for `client`.
    ///
    /// # Contract
    /// - Status is `registered`.
    /// - `created_at` is the current UTC time.
    /// - Returns the stored parcel including its assigned number.
    pub fn register(&self, client: ClientId, address: impl Into<String>) -> RepoResult<Parcel> {
        let input = NewParcel::registered(client, address);
        let number = self.repo.add(&input)?;
        Ok(input.into_parcel(number))
    }

    /// Gets one parcel by number.
    pub fn parcel(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        self.repo.get(number)
    }

    /// Lists all parcels owned by `client`.
    pub fn client_parcels(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        self.repo.get_by_client(client)
    }

    /// Advances the parcel one step along the delivery progression.
    ///
    /// Returns the new status, or `None` without writing when the parcel is
    /// already `delivered` or carries a caller-defined status.
    pub fn next_status(&self, number: ParcelNumber) -> RepoResult<Option<ParcelStatus>> {
        let parcel = self.repo.get(number)?;
        let Some(next) = parcel.status.next() else {
            return Ok(None);
        };

        self.repo.set_status(number, &next)?;
        Ok(Some(next))
    }

    /// Changes the address; rejected unless the parcel is `registered`.
    pub fn change_address(
        &self,
        number: ParcelNumber,
        address: &str,
    ) -> RepoResult<ChangeOutcome> {
        self.repo.set_address(number, address)
    }

    /// Deletes the parcel; rejected unless it is `registered`.
    pub fn delete(&self, number: ParcelNumber) -> RepoResult<ChangeOutcome> {
        self.repo.delete(number)
    }
}
