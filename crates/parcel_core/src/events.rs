//! Diagnostics and user-facing notices emitted by the parcel store.
//!
//! # Responsibility
//! - Give the store an injected sink instead of a process-wide logger.
//! - Describe status-guard outcomes as typed notices.
//!
//! # Invariants
//! - Every storage failure is reported exactly once before it is returned.
//! - Notices never change the outcome returned to the caller.

use crate::db::DbError;
use crate::model::parcel::{ParcelNumber, ParcelStatus};
use log::{error, info};
use std::fmt::{Display, Formatter};

/// User-facing notice about a status-guarded mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelNotice {
    AddressChanged {
        number: ParcelNumber,
        address: String,
    },
    AddressRejected {
        number: ParcelNumber,
        status: ParcelStatus,
    },
    Deleted {
        number: ParcelNumber,
    },
    DeleteRejected {
        number: ParcelNumber,
        status: ParcelStatus,
    },
}

impl ParcelNotice {
    /// Whether the notice reports a rejected change.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::AddressRejected { .. } | Self::DeleteRejected { .. }
        )
    }
}

impl Display for ParcelNotice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AddressChanged { number, address } => {
                write!(f, "parcel #{number} has a new address: {address}")
            }
            Self::AddressRejected { number, status } => write!(
                f,
                "cannot change the address of parcel #{number}, parcel status: {status}"
            ),
            Self::Deleted { number } => write!(f, "parcel #{number} deleted"),
            Self::DeleteRejected { number, status } => {
                write!(f, "cannot delete parcel #{number}, parcel status: {status}")
            }
        }
    }
}

/// Sink for store diagnostics and notices.
///
/// `op` is the store operation name (`add`, `get`, `set_address`, ...).
/// `subject` carries the identifying context, e.g. `number=5` or `client=1000`.
pub trait StoreEvents {
    fn storage_error(&self, op: &'static str, subject: &str, err: &DbError);
    fn notice(&self, notice: &ParcelNotice);
}

impl<E: StoreEvents + ?Sized> StoreEvents for &E {
    fn storage_error(&self, op: &'static str, subject: &str, err: &DbError) {
        (**self).storage_error(op, subject, err);
    }

    fn notice(&self, notice: &ParcelNotice) {
        (**self).notice(notice);
    }
}

/// Default sink routing everything to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEvents;

impl StoreEvents for LogEvents {
    fn storage_error(&self, op: &'static str, subject: &str, err: &DbError) {
        error!(
            "event=parcel_store module=repo op={} status=error {} error={}",
            op, subject, err
        );
    }

    fn notice(&self, notice: &ParcelNotice) {
        let status = if notice.is_rejection() {
            "rejected"
        } else {
            "ok"
        };
        info!(
            "event=parcel_notice module=repo status={} message={}",
            status, notice
        );
    }
}
