// Raw record shapes that become Headlines.
//
// Sources disagree on layout, so each shape gets a small adapter. A record
// that cannot become a Headline is dropped and counted, never fatal to the
// batch.

use chrono::{Datelike, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, warn};

use super::headline::{Headline, HeadlineRecord, DATETIME_FORMAT, SHARE_COUNT_KEY};
use crate::error::CorpusError;

/// Harvard-style CSV column positions.
const HARVARD_TITLE: usize = 1;
const HARVARD_DATE: usize = 3;
const HARVARD_SHARES: usize = 11;
const HARVARD_MIN_COLUMNS: usize = HARVARD_SHARES + 1;

/// Counts from converting a batch of raw records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordStats {
    /// Records that became headlines.
    pub parsed: usize,
    /// Records that could not be parsed.
    pub dropped: usize,
    /// Valid records excluded by a caller filter.
    pub skipped: usize,
}

impl RecordStats {
    pub fn merge(&mut self, other: RecordStats) {
        self.parsed += other.parsed;
        self.dropped += other.dropped;
        self.skipped += other.skipped;
    }

    fn log(&self, source: &str) {
        if self.dropped > 0 {
            warn!(
                source,
                parsed = self.parsed,
                dropped = self.dropped,
                "Dropped malformed records"
            );
        } else {
            debug!(source, parsed = self.parsed, skipped = self.skipped, "Parsed records");
        }
    }
}

/// Convert flat JSON records into headlines.
pub fn headlines_from_records<I>(records: I) -> (Vec<Headline>, RecordStats)
where
    I: IntoIterator<Item = Value>,
{
    let mut stats = RecordStats::default();
    let mut headlines = Vec::new();

    for value in records {
        let parsed = serde_json::from_value::<HeadlineRecord>(value)
            .map_err(|e| CorpusError::MalformedRecord(e.to_string()))
            .and_then(Headline::try_from);
        match parsed {
            Ok(h) => {
                headlines.push(h);
                stats.parsed += 1;
            }
            Err(e) => {
                debug!(error = %e, "Dropping record");
                stats.dropped += 1;
            }
        }
    }

    stats.log("records");
    (headlines, stats)
}

/// Parse one Harvard-style CSV row: lowercased title at column 1, publish
/// datetime at column 3, share count at column 11.
pub fn headline_from_harvard_row<S: AsRef<str>>(fields: &[S]) -> Result<Headline, CorpusError> {
    if fields.len() < HARVARD_MIN_COLUMNS {
        return Err(CorpusError::MalformedRecord(format!(
            "expected at least {HARVARD_MIN_COLUMNS} columns, found {}",
            fields.len()
        )));
    }

    let raw_date = fields[HARVARD_DATE].as_ref().trim();
    if raw_date.eq_ignore_ascii_case("undateable") {
        return Err(CorpusError::MalformedRecord("undateable row".to_string()));
    }
    let dt = NaiveDateTime::parse_from_str(raw_date, DATETIME_FORMAT)
        .map_err(|e| CorpusError::MalformedRecord(format!("bad date '{raw_date}': {e}")))?;

    let raw_shares = fields[HARVARD_SHARES].as_ref().trim();
    let shares: i64 = raw_shares
        .parse()
        .map_err(|_| CorpusError::MalformedRecord(format!("bad share count '{raw_shares}'")))?;

    Ok(Headline::new(fields[HARVARD_TITLE].as_ref().to_lowercase(), dt)
        .with_attr(SHARE_COUNT_KEY, shares))
}

/// Filters applied to Harvard rows after parsing.
#[derive(Debug, Clone, Default)]
pub struct HarvardFilter {
    /// Keep only rows published in this calendar year.
    pub year: Option<i32>,
    /// Keep only rows mentioning at least one of these terms.
    pub target_terms: Vec<String>,
}

impl HarvardFilter {
    fn admits(&self, headline: &Headline) -> bool {
        if self.year.is_some_and(|y| headline.dt().year() != y) {
            return false;
        }
        self.target_terms.is_empty() || headline.has_topic_hit(&self.target_terms)
    }
}

/// Convert a batch of Harvard rows, applying `filter`.
pub fn headlines_from_harvard_rows<I, R, S>(
    rows: I,
    filter: &HarvardFilter,
) -> (Vec<Headline>, RecordStats)
where
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut stats = RecordStats::default();
    let mut headlines = Vec::new();

    for row in rows {
        match headline_from_harvard_row(row.as_ref()) {
            Ok(h) if filter.admits(&h) => {
                headlines.push(h);
                stats.parsed += 1;
            }
            Ok(_) => stats.skipped += 1,
            Err(_) => stats.dropped += 1,
        }
    }

    stats.log("harvard");
    (headlines, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(title: &str, date: &str, shares: &str) -> Vec<String> {
        let mut fields = vec![String::new(); 12];
        fields[1] = title.to_string();
        fields[3] = date.to_string();
        fields[11] = shares.to_string();
        fields
    }

    #[test]
    fn test_records_drop_and_count_malformed() {
        let records = vec![
            json!({"headline": "ok", "datetime": "2016-01-03 10:00:00"}),
            json!({"headline": "no date"}),
            json!({"headline": "bad date", "datetime": "2016-01-03T10:00:00"}),
            json!("not an object"),
        ];
        let (headlines, stats) = headlines_from_records(records);
        assert_eq!(headlines.len(), 1);
        assert_eq!(stats, RecordStats { parsed: 1, dropped: 3, skipped: 0 });
    }

    #[test]
    fn test_harvard_row_fields() {
        let h = headline_from_harvard_row(&row("Trump Wins", "2016-11-09 01:00:00", "120")).unwrap();
        assert_eq!(h.headline, "trump wins");
        assert_eq!(h.share_count(), 120);
    }

    #[test]
    fn test_harvard_rejects_short_and_undateable() {
        assert!(headline_from_harvard_row(&["a", "b", "c"]).is_err());
        assert!(headline_from_harvard_row(&row("x", "undateable", "1")).is_err());
        assert!(headline_from_harvard_row(&row("x", "2016-01-01 00:00:00", "many")).is_err());
    }

    #[test]
    fn test_harvard_filter_year_and_terms() {
        let rows = vec![
            row("clinton speaks", "2016-03-01 00:00:00", "1"),
            row("clinton speaks", "2015-03-01 00:00:00", "1"),
            row("weather report", "2016-03-01 00:00:00", "1"),
            row("broken", "undateable", "1"),
        ];
        let filter = HarvardFilter {
            year: Some(2016),
            target_terms: vec!["clinton".to_string()],
        };
        let (headlines, stats) = headlines_from_harvard_rows(rows, &filter);
        assert_eq!(headlines.len(), 1);
        assert_eq!(stats, RecordStats { parsed: 1, dropped: 1, skipped: 2 });
    }
}
