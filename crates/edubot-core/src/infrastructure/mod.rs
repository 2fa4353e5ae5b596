//! Infrastructure layer
//!
//! SQLite implementations of the domain repository traits.

pub mod conversation;
pub mod curriculum;
pub mod knowledge;
pub mod taxonomy;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::Error;

/// Parse a stored timestamp
///
/// Rows written by the repositories hold RFC 3339; seeded rows hold
/// SQLite's `CURRENT_TIMESTAMP` format.
pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

/// Map a UNIQUE constraint violation to `DuplicateName`
pub(crate) fn unique_violation(name: &str) -> impl FnOnce(sqlx::Error) -> Error + '_ {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::DuplicateName(name.to_string())
        }
        _ => Error::DatabaseError(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2025-03-01T08:30:00+00:00");
        assert_eq!((rfc.year(), rfc.month(), rfc.hour()), (2025, 3, 8));

        let sqlite = parse_timestamp("2025-03-01 08:30:00");
        assert_eq!(sqlite, rfc);
    }
}
