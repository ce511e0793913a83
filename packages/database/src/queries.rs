//! SQL for the `immigration` table.
//!
//! Every statement here runs unchanged on `PostgreSQL` and `SQLite`:
//! positional `$n` parameters, `ON CONFLICT ... DO UPDATE`, and
//! `RETURNING` are supported by both.

use chrono::NaiveDate;
use hk_immigration_database_models::{StoredRecord, UpsertOutcome};
use hk_immigration_source_models::{NaturalKey, TrafficRecord};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Storage date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn count_value(count: u64) -> DatabaseValue {
    DatabaseValue::Int64(i64::try_from(count).unwrap_or(i64::MAX))
}

fn key_params(key: &NaturalKey) -> [DatabaseValue; 3] {
    [
        DatabaseValue::String(key.date.format(DATE_FORMAT).to_string()),
        DatabaseValue::String(key.control_point.clone()),
        DatabaseValue::String(key.direction.as_ref().to_string()),
    ]
}

/// Returns the surrogate id of the row with natural key `key`, if any.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn find_record_id(db: &dyn Database, key: &NaturalKey) -> Result<Option<i64>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id FROM immigration
             WHERE date = $1 AND control_point = $2 AND direction = $3",
            &key_params(key),
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let id: i64 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse record id: {e}"),
    })?;

    Ok(Some(id))
}

/// Inserts `record`, or overwrites the counts of the row sharing its
/// natural key.
///
/// The write itself is a single `INSERT ... ON CONFLICT DO UPDATE`, so it
/// is atomic and converges under repetition. The preceding lookup only
/// decides whether the outcome is reported as an insert or an update.
///
/// # Errors
///
/// Returns [`DbError`] if either statement fails.
pub async fn upsert_record(
    db: &dyn Database,
    record: &TrafficRecord,
) -> Result<UpsertOutcome, DbError> {
    let key = record.key();
    let existing = find_record_id(db, &key).await?;

    let [date, control_point, direction] = key_params(&key);
    let rows = db
        .query_raw_params(
            "INSERT INTO immigration (
                date, control_point, direction,
                hk_residents, mainland_visitors, other_visitors, total
             ) VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (date, control_point, direction) DO UPDATE SET
                 hk_residents = EXCLUDED.hk_residents,
                 mainland_visitors = EXCLUDED.mainland_visitors,
                 other_visitors = EXCLUDED.other_visitors,
                 total = EXCLUDED.total
             RETURNING id",
            &[
                date,
                control_point,
                direction,
                count_value(record.hk_residents),
                count_value(record.mainland_visitors),
                count_value(record.other_visitors),
                count_value(record.total),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: format!("Upsert of {key} returned no id"),
    })?;

    let id: i64 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse record id: {e}"),
    })?;

    Ok(match existing {
        Some(_) => UpsertOutcome::Updated { id },
        None => UpsertOutcome::Inserted { id },
    })
}

/// Reads every row of the `immigration` table.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails, a text or id column cannot be
/// decoded, or a stored date is not `YYYY-MM-DD`.
pub async fn list_records(db: &dyn Database) -> Result<Vec<StoredRecord>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, date, control_point, direction,
                    hk_residents, mainland_visitors, other_visitors, total
             FROM immigration",
            &[],
        )
        .await?;

    let mut records = Vec::with_capacity(rows.len());

    for row in &rows {
        let id: i64 = row.to_value("id").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse record id: {e}"),
        })?;
        let text = |column: &str| -> Result<String, DbError> {
            row.to_value(column).map_err(|e| DbError::Conversion {
                message: format!("Row {id} has unreadable {column}: {e}"),
            })
        };

        let raw_date = text("date")?;
        let date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT).map_err(|e| {
            DbError::Conversion {
                message: format!("Row {id} has unparsable date {raw_date:?}: {e}"),
            }
        })?;

        let count = |column: &str| -> u64 {
            let value: i64 = row.to_value(column).unwrap_or(0);
            u64::try_from(value).unwrap_or(0)
        };

        records.push(StoredRecord {
            id,
            date,
            control_point: text("control_point")?,
            direction: text("direction")?,
            hk_residents: count("hk_residents"),
            mainland_visitors: count("mainland_visitors"),
            other_visitors: count("other_visitors"),
            total: count("total"),
        });
    }

    Ok(records)
}

/// Runs a trivial query to check the connection.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn ping(db: &dyn Database) -> Result<(), DbError> {
    db.query_raw_params("SELECT 1 AS ok", &[]).await?;
    Ok(())
}
