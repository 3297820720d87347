//! Parcel repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `parcel` table.
//! - Enforce the `registered` status guard for address changes and deletion.
//! - Report storage failures and guard notices to the injected sink.
//!
//! # Invariants
//! - `number` is assigned by SQLite on insert and never written afterwards.
//! - Guarded mutations run as one conditional statement; the current status
//!   is only read back (inside the same savepoint) when nothing changed.
//! - A status-guard rejection is not an error.

use crate::db::{DbError, DbResult};
use crate::events::{LogEvents, ParcelNotice, StoreEvents};
use crate::model::parcel::{ClientId, NewParcel, Parcel, ParcelNumber, ParcelStatus};
use rusqlite::{named_params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PARCEL_TABLE: &str = "parcel";
const PARCEL_COLUMNS: [&str; 5] = ["number", "client", "status", "address", "created_at"];

const PARCEL_SELECT_SQL: &str = "SELECT
    number,
    client,
    status,
    address,
    created_at
FROM parcel";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for parcel store operations.
///
/// `Db` is the storage failure kind; it is reported to [`StoreEvents`]
/// before being returned.
#[derive(Debug)]
pub enum RepoError {
    NotFound(ParcelNumber),
    Db(DbError),
}

impl RepoError {
    /// Whether no parcel matched the requested number.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(number) => write!(f, "parcel not found: {number}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result of a mutation gated on `registered` status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    Applied,
    /// Nothing was written; `status` is the parcel's status at the time.
    Rejected { status: ParcelStatus },
}

impl ChangeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Repository interface for parcel CRUD operations.
pub trait ParcelRepository {
    /// Inserts a parcel and returns its store-assigned number.
    fn add(&self, parcel: &NewParcel) -> RepoResult<ParcelNumber>;
    /// Reads one parcel; `RepoError::NotFound` when no row matches.
    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel>;
    /// Reads every parcel of `client`, ordered by number. Empty when none match.
    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>>;
    /// Overwrites the status. Succeeds without effect for unknown numbers.
    fn set_status(&self, number: ParcelNumber, status: &ParcelStatus) -> RepoResult<()>;
    /// Changes the address of a `registered` parcel.
    ///
    /// Runs in a savepoint, so it may be called inside an open transaction;
    /// the change then commits or rolls back with that transaction.
    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<ChangeOutcome>;
    /// Deletes a `registered` parcel. Savepoint semantics as `set_address`.
    fn delete(&self, number: ParcelNumber) -> RepoResult<ChangeOutcome>;
    /// Removes every parcel and restarts numbering at 1.
    ///
    /// The two statements are not atomic: a failure after the delete leaves
    /// the counter as it was.
    fn clear(&self) -> RepoResult<()>;
}

/// SQLite-backed parcel store.
pub struct SqliteParcelStore<'conn, E: StoreEvents = LogEvents> {
    conn: &'conn Connection,
    events: E,
}

impl<'conn> SqliteParcelStore<'conn, LogEvents> {
    /// Constructs a store that reports through the `log` facade.
    pub fn try_new(conn: &'conn Connection) -> DbResult<Self> {
        Self::with_events(conn, LogEvents)
    }
}

impl<'conn, E: StoreEvents> SqliteParcelStore<'conn, E> {
    /// Constructs a store reporting to `events`.
    ///
    /// Fails when the connection has no usable `parcel` table.
    pub fn with_events(conn: &'conn Connection, events: E) -> DbResult<Self> {
        ensure_parcel_connection_ready(conn)?;
        Ok(Self { conn, events })
    }

    fn report<T>(&self, op: &'static str, subject: &str, result: RepoResult<T>) -> RepoResult<T> {
        if let Err(RepoError::Db(err)) = &result {
            self.events.storage_error(op, subject, err);
        }
        result
    }
}

impl<E: StoreEvents> ParcelRepository for SqliteParcelStore<'_, E> {
    fn add(&self, parcel: &NewParcel) -> RepoResult<ParcelNumber> {
        let subject = format!("client={}", parcel.client);
        self.report("add", &subject, insert_parcel(self.conn, parcel))
    }

    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        let subject = format!("number={number}");
        self.report("get", &subject, select_parcel(self.conn, number))
    }

    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        let subject = format!("client={client}");
        self.report(
            "get_by_client",
            &subject,
            select_client_parcels(self.conn, client),
        )
    }

    fn set_status(&self, number: ParcelNumber, status: &ParcelStatus) -> RepoResult<()> {
        let subject = format!("number={number}");
        let result = self
            .conn
            .execute(
                "UPDATE parcel SET status = :status WHERE number = :number;",
                named_params! { ":status": status.as_str(), ":number": number },
            )
            .map(|_| ())
            .map_err(RepoError::from);
        self.report("set_status", &subject, result)
    }

    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<ChangeOutcome> {
        let subject = format!("number={number}");
        let outcome = self.report(
            "set_address",
            &subject,
            update_address_if_registered(self.conn, number, address),
        )?;

        let notice = match &outcome {
            ChangeOutcome::Applied => ParcelNotice::AddressChanged {
                number,
                address: address.to_string(),
            },
            ChangeOutcome::Rejected { status } => ParcelNotice::AddressRejected {
                number,
                status: status.clone(),
            },
        };
        self.events.notice(&notice);
        Ok(outcome)
    }

    fn delete(&self, number: ParcelNumber) -> RepoResult<ChangeOutcome> {
        let subject = format!("number={number}");
        let outcome = self.report(
            "delete",
            &subject,
            delete_if_registered(self.conn, number),
        )?;

        let notice = match &outcome {
            ChangeOutcome::Applied => ParcelNotice::Deleted { number },
            ChangeOutcome::Rejected { status } => ParcelNotice::DeleteRejected {
                number,
                status: status.clone(),
            },
        };
        self.events.notice(&notice);
        Ok(outcome)
    }

    fn clear(&self) -> RepoResult<()> {
        self.report("clear", "table=parcel", clear_parcels(self.conn))
    }
}

fn insert_parcel(conn: &Connection, parcel: &NewParcel) -> RepoResult<ParcelNumber> {
    conn.execute(
        "INSERT INTO parcel (client, status, address, created_at)
         VALUES (:client, :status, :address, :created_at);",
        named_params! {
            ":client": parcel.client,
            ":status": parcel.status.as_str(),
            ":address": parcel.address.as_str(),
            ":created_at": parcel.created_at.as_str(),
        },
    )?;
    Ok(conn.last_insert_rowid())
}

fn select_parcel(conn: &Connection, number: ParcelNumber) -> RepoResult<Parcel> {
    conn.query_row(
        &format!("{PARCEL_SELECT_SQL} WHERE number = :number;"),
        named_params! { ":number": number },
        parse_parcel_row,
    )
    .map_err(|err| match err {
        rusqlite::Error::QueryReturnedNoRows => RepoError::NotFound(number),
        other => other.into(),
    })
}

fn select_client_parcels(conn: &Connection, client: ClientId) -> RepoResult<Vec<Parcel>> {
    let mut stmt = conn.prepare(&format!(
        "{PARCEL_SELECT_SQL} WHERE client = :client ORDER BY number ASC;"
    ))?;
    let mut rows = stmt.query(named_params! { ":client": client })?;
    let mut parcels = Vec::new();

    while let Some(row) = rows.next()? {
        parcels.push(parse_parcel_row(row)?);
    }

    Ok(parcels)
}

fn update_address_if_registered(
    conn: &Connection,
    number: ParcelNumber,
    address: &str,
) -> RepoResult<ChangeOutcome> {
    with_savepoint(conn, |conn| {
        let changed = conn.execute(
            "UPDATE parcel
             SET address = :address
             WHERE number = :number
               AND status = :registered;",
            named_params! {
                ":address": address,
                ":number": number,
                ":registered": ParcelStatus::Registered.as_str(),
            },
        )?;
        resolve_guard(conn, number, changed)
    })
}

fn delete_if_registered(conn: &Connection, number: ParcelNumber) -> RepoResult<ChangeOutcome> {
    with_savepoint(conn, |conn| {
        let changed = conn.execute(
            "DELETE FROM parcel
             WHERE number = :number
               AND status = :registered;",
            named_params! {
                ":number": number,
                ":registered": ParcelStatus::Registered.as_str(),
            },
        )?;
        resolve_guard(conn, number, changed)
    })
}

/// Runs `body` inside a savepoint, which nests inside a caller's open
/// transaction as well as starting one when none is active.
fn with_savepoint<T>(
    conn: &Connection,
    body: impl FnOnce(&Connection) -> RepoResult<T>,
) -> RepoResult<T> {
    conn.execute_batch("SAVEPOINT parcel_guard;")?;
    match body(conn) {
        Ok(value) => {
            conn.execute_batch("RELEASE parcel_guard;")?;
            Ok(value)
        }
        Err(err) => {
            // The body's error is the one worth returning.
            let _ = conn.execute_batch("ROLLBACK TO parcel_guard; RELEASE parcel_guard;");
            Err(err)
        }
    }
}

/// Turns the affected-row count of a guarded statement into an outcome.
fn resolve_guard(
    conn: &Connection,
    number: ParcelNumber,
    changed: usize,
) -> RepoResult<ChangeOutcome> {
    if changed > 0 {
        return Ok(ChangeOutcome::Applied);
    }

    let status = conn
        .query_row(
            "SELECT status FROM parcel WHERE number = :number;",
            named_params! { ":number": number },
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    match status {
        Some(status) => Ok(ChangeOutcome::Rejected {
            status: status.into(),
        }),
        None => Err(RepoError::NotFound(number)),
    }
}

fn clear_parcels(conn: &Connection) -> RepoResult<()> {
    conn.execute("DELETE FROM parcel;", [])?;
    conn.execute(
        "UPDATE sqlite_sequence SET seq = 0 WHERE name = 'parcel';",
        [],
    )?;
    Ok(())
}

fn parse_parcel_row(row: &Row<'_>) -> rusqlite::Result<Parcel> {
    Ok(Parcel {
        number: row.get("number")?,
        client: row.get("client")?,
        status: row.get::<_, String>("status")?.into(),
        address: row.get("address")?,
        created_at: row.get("created_at")?,
    })
}

fn ensure_parcel_connection_ready(conn: &Connection) -> DbResult<()> {
    if !table_exists(conn, PARCEL_TABLE)? {
        return Err(DbError::MissingRequiredTable(PARCEL_TABLE));
    }

    for column in PARCEL_COLUMNS {
        if !table_has_column(conn, PARCEL_TABLE, column)? {
            return Err(DbError::MissingRequiredColumn {
                table: PARCEL_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
