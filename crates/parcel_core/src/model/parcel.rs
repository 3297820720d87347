//! Parcel record, creation input and status values.
//!
//! # Invariants
//! - `number` is assigned by the store on insert and is immutable afterwards.
//! - `client` and `created_at` are set once at creation.
//! - Unknown status strings are preserved verbatim, never rejected.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Store-assigned parcel identifier.
pub type ParcelNumber = i64;

/// Identifier of the client owning a parcel. Not validated by the store.
pub type ClientId = i64;

const STATUS_REGISTERED: &str = "registered";
const STATUS_SENT: &str = "sent";
const STATUS_DELIVERED: &str = "delivered";

/// Delivery status of a parcel.
///
/// Serialized as its plain string form. Equality and hashing compare that
/// form, so `Other("sent")` equals `Sent` just as it does in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParcelStatus {
    /// Accepted but not yet handed over for delivery.
    Registered,
    /// On its way to the recipient.
    Sent,
    /// Handed to the recipient.
    Delivered,
    /// Any other status written by callers.
    Other(String),
}

impl ParcelStatus {
    /// Returns the storage form of this status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Registered => STATUS_REGISTERED,
            Self::Sent => STATUS_SENT,
            Self::Delivered => STATUS_DELIVERED,
            Self::Other(value) => value.as_str(),
        }
    }

    /// Whether address changes and deletion are allowed in this status.
    pub fn is_registered(&self) -> bool {
        self.as_str() == STATUS_REGISTERED
    }

    /// Next status along `registered -> sent -> delivered`.
    ///
    /// Returns `None` for `delivered` and for caller-defined statuses.
    pub fn next(&self) -> Option<Self> {
        match self.as_str() {
            STATUS_REGISTERED => Some(Self::Sent),
            STATUS_SENT => Some(Self::Delivered),
            _ => None,
        }
    }
}

impl PartialEq for ParcelStatus {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ParcelStatus {}

impl Hash for ParcelStatus {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<&str> for ParcelStatus {
    fn from(value: &str) -> Self {
        match value {
            STATUS_REGISTERED => Self::Registered,
            STATUS_SENT => Self::Sent,
            STATUS_DELIVERED => Self::Delivered,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ParcelStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            STATUS_REGISTERED => Self::Registered,
            STATUS_SENT => Self::Sent,
            STATUS_DELIVERED => Self::Delivered,
            _ => Self::Other(value),
        }
    }
}

impl From<ParcelStatus> for String {
    fn from(value: ParcelStatus) -> Self {
        match value {
            ParcelStatus::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for ParcelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored delivery record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub number: ParcelNumber,
    pub client: ClientId,
    pub status: ParcelStatus,
    pub address: String,
    /// RFC 3339 text, stored verbatim.
    pub created_at: String,
}

/// Creation input for a parcel: every field except the store-assigned number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParcel {
    pub client: ClientId,
    pub status: ParcelStatus,
    pub address: String,
    pub created_at: String,
}

impl NewParcel {
    /// Creates an input with explicit status and creation timestamp.
    pub fn new(
        client: ClientId,
        status: ParcelStatus,
        address: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            client,
            status,
            address: address.into(),
            created_at: created_at.into(),
        }
    }

    /// Creates a `registered` parcel stamped with the current UTC time.
    pub fn registered(client: ClientId, address: impl Into<String>) -> Self {
        Self::new(client, ParcelStatus::Registered, address, now_timestamp())
    }

    /// Builds the stored shape once the store has assigned `number`.
    pub fn into_parcel(self, number: ParcelNumber) -> Parcel {
        Parcel {
            number,
            client: self.client,
            status: self.status,
            address: self.address,
            created_at: self.created_at,
        }
    }
}

/// Current UTC time as RFC 3339 with second precision, e.g. `2024-05-01T10:00:00Z`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
