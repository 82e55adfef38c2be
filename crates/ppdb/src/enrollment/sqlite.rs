use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::domain::{
    Application, ApplicationFields, ApplicationId, ApplicationStatus, NewApplication,
    StatusCounts, UserId,
};
use super::repository::{ApplicationRepository, Page, PageRequest, RepositoryError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS applications (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id         INTEGER NOT NULL UNIQUE,
    student_name    TEXT NOT NULL,
    birth_date      TEXT NOT NULL,
    full_address    TEXT NOT NULL,
    previous_school TEXT NOT NULL,
    parent_name     TEXT NOT NULL,
    parent_contact  TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'accepted', 'rejected')),
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS applications_user_id_index ON applications (user_id);
CREATE INDEX IF NOT EXISTS applications_status_index ON applications (status);
CREATE INDEX IF NOT EXISTS applications_status_created_at_index
    ON applications (status, created_at);
";

const COLUMNS: &str = "id, user_id, student_name, birth_date, full_address, previous_school, \
                       parent_name, parent_contact, status, created_at, updated_at";

const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed application store. A single connection is shared behind a mutex.
pub struct SqliteApplicationRepository {
    conn: Mutex<Connection>,
}

impl SqliteApplicationRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path).map_err(unavailable)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, RepositoryError> {
        conn.execute_batch("PRAGMA busy_timeout = 5000;")
            .map_err(unavailable)?;
        conn.execute_batch(SCHEMA).map_err(unavailable)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::Unavailable("connection mutex poisoned".to_string()))
    }

    fn fetch_with(
        conn: &Connection,
        id: ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM applications WHERE id = ?1"),
            params![id.0],
            row_to_application,
        )
        .optional()
        .map_err(unavailable)
    }

    fn fetch_existing(
        conn: &Connection,
        id: ApplicationId,
    ) -> Result<Application, RepositoryError> {
        Self::fetch_with(conn, id)?.ok_or(RepositoryError::NotFound)
    }
}

impl ApplicationRepository for SqliteApplicationRepository {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError> {
        let conn = self.connection()?;
        let NewApplication {
            user_id,
            fields,
            status,
            created_at,
        } = application;
        let timestamp = format_timestamp(created_at);

        conn.execute(
            "INSERT INTO applications (
                user_id, student_name, birth_date, full_address, previous_school,
                parent_name, parent_contact, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                user_id.0,
                fields.student_name,
                fields.birth_date.format(BIRTH_DATE_FORMAT).to_string(),
                fields.full_address,
                fields.previous_school,
                fields.parent_name,
                fields.parent_contact,
                status.as_str(),
                timestamp,
            ],
        )
        .map_err(|err| {
            if is_constraint_violation(&err) {
                RepositoryError::Conflict
            } else {
                unavailable(err)
            }
        })?;

        let id = ApplicationId(conn.last_insert_rowid());
        Self::fetch_existing(&conn, id)
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let conn = self.connection()?;
        Self::fetch_with(&conn, id)
    }

    fn fetch_by_user(&self, user_id: UserId) -> Result<Option<Application>, RepositoryError> {
        let conn = self.connection()?;
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM applications WHERE user_id = ?1"),
            params![user_id.0],
            row_to_application,
        )
        .optional()
        .map_err(unavailable)
    }

    fn update_pending_fields(
        &self,
        id: ApplicationId,
        fields: ApplicationFields,
        updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "UPDATE applications
                 SET student_name = ?1, birth_date = ?2, full_address = ?3,
                     previous_school = ?4, parent_name = ?5, parent_contact = ?6,
                     updated_at = ?7
                 WHERE id = ?8 AND status = 'pending'",
                params![
                    fields.student_name,
                    fields.birth_date.format(BIRTH_DATE_FORMAT).to_string(),
                    fields.full_address,
                    fields.previous_school,
                    fields.parent_name,
                    fields.parent_contact,
                    format_timestamp(updated_at),
                    id.0,
                ],
            )
            .map_err(unavailable)?;

        match changed {
            0 => match Self::fetch_with(&conn, id)? {
                Some(_) => Err(RepositoryError::Locked),
                None => Err(RepositoryError::NotFound),
            },
            _ => Self::fetch_existing(&conn, id),
        }
    }

    fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "UPDATE applications SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), format_timestamp(updated_at), id.0],
            )
            .map_err(unavailable)?;

        if changed == 0 {
            return Err(RepositoryError::NotFound);
        }
        Self::fetch_existing(&conn, id)
    }

    fn list(&self, request: &PageRequest) -> Result<Page<Application>, RepositoryError> {
        let conn = self.connection()?;
        let status = request.status.map(ApplicationStatus::as_str);
        let limit = i64::from(request.per_page);
        let offset = i64::try_from(request.offset()).unwrap_or(i64::MAX);

        let total: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM applications WHERE ?1 IS NULL OR status = ?1",
                params![status],
                |row| row.get(0),
            )
            .map_err(unavailable)?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM applications
                 WHERE ?1 IS NULL OR status = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2 OFFSET ?3"
            ))
            .map_err(unavailable)?;
        let data = stmt
            .query_map(params![status, limit, offset], row_to_application)
            .map_err(unavailable)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(unavailable)?;

        Ok(Page::new(data, request, u64::try_from(total).unwrap_or(0)))
    }

    fn status_counts(&self) -> Result<StatusCounts, RepositoryError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM applications GROUP BY status")
            .map_err(unavailable)?;
        let rows = stmt
            .query_map([], |row| {
                let status: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((status, count))
            })
            .map_err(unavailable)?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let (status, count) = row.map_err(unavailable)?;
            let status = ApplicationStatus::parse(&status).ok_or_else(|| {
                RepositoryError::Unavailable(format!("unknown status '{status}' in store"))
            })?;
            counts.record(status, u64::try_from(count).unwrap_or(0));
        }
        Ok(counts)
    }
}

fn row_to_application(row: &Row<'_>) -> Result<Application, rusqlite::Error> {
    let status_raw: String = row.get("status")?;
    let status = ApplicationStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            format!("unknown status '{status_raw}'").into(),
        )
    })?;

    let birth_date_raw: String = row.get("birth_date")?;
    let birth_date = NaiveDate::parse_from_str(&birth_date_raw, BIRTH_DATE_FORMAT)
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(err))
        })?;

    Ok(Application {
        id: ApplicationId(row.get("id")?),
        user_id: UserId(row.get("user_id")?),
        fields: ApplicationFields {
            student_name: row.get("student_name")?,
            birth_date,
            full_address: row.get("full_address")?,
            previous_school: row.get("previous_school")?,
            parent_name: row.get("parent_name")?,
            parent_contact: row.get("parent_contact")?,
        },
        status,
        created_at: parse_timestamp(row, "created_at", 9)?,
        updated_at: parse_timestamp(row, "updated_at", 10)?,
    })
}

fn parse_timestamp(
    row: &Row<'_>,
    column: &str,
    index: usize,
) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                rusqlite::types::Type::Text,
                Box::new(err),
            )
        })
}

/// Fixed-width UTC so lexical order matches chronological order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn unavailable(err: rusqlite::Error) -> RepositoryError {
    RepositoryError::Unavailable(err.to_string())
}
