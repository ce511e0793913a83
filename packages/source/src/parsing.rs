//! Row parsing for the daily passenger traffic CSV.
//!
//! Column layout (header row first):
//!
//! | # | column |
//! |---|--------|
//! | 0 | date, `DD-MM-YYYY` |
//! | 1 | control point |
//! | 2 | `Arrival` / `Departure` |
//! | 3 | Hong Kong residents |
//! | 4 | Mainland visitors |
//! | 5 | other visitors |
//! | 6 | total |
//!
//! Date errors reject the row. Count errors do not: the feed occasionally
//! publishes blank cells, which read as zero.

use chrono::NaiveDate;
use hk_immigration_source_models::{ParseFailure, ParseFailureKind, TrafficRecord};
use hk_immigration_traffic_models::Direction;

/// Date layout used by the feed's first column.
pub const FEED_DATE_FORMAT: &str = "%d-%m-%Y";

/// Minimum number of fields in a data row.
pub const MIN_FIELDS: usize = 7;

/// Parses one data row into a [`TrafficRecord`].
///
/// `line` is the 1-based line number, used only for the failure report.
/// The caller is responsible for skipping the header row.
///
/// # Errors
///
/// Returns a [`ParseFailure`] of kind [`ParseFailureKind::MalformedRow`]
/// when the row has fewer than [`MIN_FIELDS`] fields, or
/// [`ParseFailureKind::InvalidDate`] when the first field is not a
/// `DD-MM-YYYY` date.
pub fn parse_row(fields: &[&str], line: u64) -> Result<TrafficRecord, ParseFailure> {
    if fields.len() < MIN_FIELDS {
        return Err(ParseFailure {
            line,
            kind: ParseFailureKind::MalformedRow,
            reason: format!(
                "expected at least {MIN_FIELDS} fields, found {}",
                fields.len()
            ),
        });
    }

    let raw_date = fields[0].trim();
    let date = parse_feed_date(raw_date).ok_or_else(|| ParseFailure {
        line,
        kind: ParseFailureKind::InvalidDate,
        reason: format!("unparsable date {raw_date:?}"),
    })?;

    let (direction, _) = Direction::normalize(fields[2].trim());

    Ok(TrafficRecord {
        date,
        control_point: fields[1].trim().to_string(),
        direction,
        hk_residents: parse_count(fields[3]),
        mainland_visitors: parse_count(fields[4]),
        other_visitors: parse_count(fields[5]),
        total: parse_count(fields[6]),
    })
}

/// Parses a `DD-MM-YYYY` date.
#[must_use]
pub fn parse_feed_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), FEED_DATE_FORMAT).ok()
}

/// Parses a count cell, reading anything unparsable as zero.
///
/// Thousands separators and surrounding whitespace are stripped first, so
/// `" 1,234 "` reads as `1234`. Negative numbers are not valid counts and
/// also read as zero.
#[must_use]
pub fn parse_count(s: &str) -> u64 {
    let cleaned: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    cleaned.parse().unwrap_or(0)
}

/// One data row pulled from a feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRow {
    /// 1-based line number of the row.
    pub line: u64,
    /// The parsed record, or why it was rejected.
    pub result: Result<TrafficRecord, ParseFailure>,
}

/// Streams data rows out of a CSV document, skipping the header.
///
/// Line numbers count records, header included, so they hold for both
/// `\n` and `\r\n` line endings. Blank lines are dropped by the CSV reader
/// and do not advance the count.
///
/// Rows are parsed lazily, one per [`Iterator::next`] call, so a consumer
/// can write each record before the next one is read. Lines the CSV reader
/// itself cannot decode surface as [`ParseFailureKind::MalformedRow`]
/// failures rather than ending the iteration.
pub struct FeedRows<R: std::io::Read> {
    records: csv::StringRecordsIntoIter<R>,
    index: u64,
}

impl<R: std::io::Read> FeedRows<R> {
    /// Wraps a reader positioned at the start of the document.
    pub fn new(reader: R) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader)
            .into_records();

        Self { records, index: 0 }
    }
}

impl<R: std::io::Read> Iterator for FeedRows<R> {
    type Item = FeedRow;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.records.next()?;
            self.index += 1;
            let line = self.index;

            // Header row, whether or not it decodes.
            if line == 1 {
                continue;
            }

            let record = match next {
                Ok(record) => record,
                Err(e) => {
                    return Some(FeedRow {
                        line,
                        result: Err(ParseFailure {
                            line,
                            kind: ParseFailureKind::MalformedRow,
                            reason: e.to_string(),
                        }),
                    });
                }
            };

            let fields: Vec<&str> = record.iter().collect();
            if let Some(raw) = fields.get(2).map(|f| f.trim())
                && Direction::normalize(raw).1
            {
                log::warn!("line {line}: direction {raw:?} folded into Departure");
            }

            return Some(FeedRow {
                line,
                result: parse_row(&fields, line),
            });
        }
    }
}
