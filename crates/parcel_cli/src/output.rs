//! Console rendering and the notice sink used by the CLI.

use anyhow::Result;
use parcel_core::{
    ChangeOutcome, DbError, LogEvents, Parcel, ParcelNotice, ParcelNumber, ParcelStatus,
    StoreEvents,
};
use serde::Serialize;

/// Logs like [`LogEvents`] and also prints notices to stdout.
pub struct ConsoleEvents {
    /// Off in JSON mode so stdout stays machine-readable.
    pub print_notices: bool,
}

impl StoreEvents for ConsoleEvents {
    fn storage_error(&self, op: &'static str, subject: &str, err: &DbError) {
        LogEvents.storage_error(op, subject, err);
    }

    fn notice(&self, notice: &ParcelNotice) {
        LogEvents.notice(notice);
        if self.print_notices {
            println!("{notice}");
        }
    }
}

#[derive(Serialize)]
struct StatusView<'a> {
    number: ParcelNumber,
    status: Option<&'a str>,
}

#[derive(Serialize)]
struct OutcomeView<'a> {
    number: ParcelNumber,
    applied: bool,
    /// Status that blocked the change, when rejected.
    status: Option<&'a str>,
}

#[derive(Serialize)]
struct ClearedView {
    cleared: bool,
}

pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn parcel(&self, parcel: &Parcel) -> Result<()> {
        if self.json {
            return emit_json(parcel);
        }
        println!("{}", parcel_line(parcel));
        Ok(())
    }

    pub fn parcels(&self, parcels: &[Parcel]) -> Result<()> {
        if self.json {
            return emit_json(&parcels);
        }
        if parcels.is_empty() {
            println!("no parcels");
        }
        for parcel in parcels {
            println!("{}", parcel_line(parcel));
        }
        Ok(())
    }

    /// `status` is `None` when the parcel had no next status.
    pub fn status(&self, number: ParcelNumber, status: Option<&ParcelStatus>) -> Result<()> {
        if self.json {
            return emit_json(&StatusView {
                number,
                status: status.map(ParcelStatus::as_str),
            });
        }
        match status {
            Some(status) => println!("parcel #{number} status: {status}"),
            None => println!("parcel #{number} has no next status"),
        }
        Ok(())
    }

    /// In text mode the store's notice has already been printed.
    pub fn outcome(&self, number: ParcelNumber, outcome: &ChangeOutcome) -> Result<()> {
        if !self.json {
            return Ok(());
        }
        let status = match outcome {
            ChangeOutcome::Applied => None,
            ChangeOutcome::Rejected { status } => Some(status.as_str()),
        };
        emit_json(&OutcomeView {
            number,
            applied: outcome.is_applied(),
            status,
        })
    }

    pub fn cleared(&self) -> Result<()> {
        if self.json {
            return emit_json(&ClearedView { cleared: true });
        }
        println!("all parcels removed");
        Ok(())
    }
}

fn emit_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parcel_line(parcel: &Parcel) -> String {
    format!(
        "#{} client={} status={} address={:?} created_at={}",
        parcel.number, parcel.client, parcel.status, parcel.address, parcel.created_at
    )
}
