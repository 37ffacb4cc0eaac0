// Headline: the atomic scored document.
//
// A headline carries a title, a description and an append-only auxiliary
// text field (signal-term hits pulled from a longer article body). The
// timestamp is the single source of truth for date filtering and binning;
// the ISO week/year are derived from it once and kept in sync by
// `set_timestamp`, so the fields are private.
//
// The pipeline mutates the three text fields in place. `full_text()` is
// always recomputed from them and never cached.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CorpusError;

/// Timestamp format used by the flat record form (no `T`, no microseconds).
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Attribute key holding a headline's social share count.
pub const SHARE_COUNT_KEY: &str = "share_count";

/// Web-archive snapshot prefix, e.g. `/web/20161023014621/`.
static ARCHIVE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/web/\d{14}").expect("archive prefix regex is valid"));

#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub headline: String,
    pub description: String,
    /// Scratch text appended from a longer source document.
    pub aux_text: String,
    dt: NaiveDateTime,
    iso_week: u32,
    iso_year: i32,
    pub rank: i64,
    pub id: i64,
    pub uri: String,
    pub authors: String,
    pub thumbnail: String,
    pub archive_source: String,
    /// Free-form attributes: share counts, per-algorithm scores, etc.
    pub attrib: BTreeMap<String, Value>,
}

impl Headline {
    pub fn new(headline: impl Into<String>, dt: NaiveDateTime) -> Self {
        let iso = dt.date().iso_week();
        Self {
            headline: headline.into(),
            description: String::new(),
            aux_text: String::new(),
            dt,
            iso_week: iso.week(),
            iso_year: iso.year(),
            rank: -1,
            id: -1,
            uri: String::new(),
            authors: String::new(),
            thumbnail: String::new(),
            archive_source: String::new(),
            attrib: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_aux_text(mut self, aux_text: impl Into<String>) -> Self {
        self.aux_text = aux_text.into();
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    pub fn with_rank(mut self, rank: i64) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrib.insert(key.into(), value.into());
        self
    }

    pub fn dt(&self) -> NaiveDateTime {
        self.dt
    }

    pub fn date(&self) -> NaiveDate {
        self.dt.date()
    }

    /// ISO-8601 week number (1-53) of the timestamp.
    pub fn iso_week(&self) -> u32 {
        self.iso_week
    }

    /// ISO year owning `iso_week()`. Differs from the calendar year for the
    /// first and last few days of some years.
    pub fn iso_year(&self) -> i32 {
        self.iso_year
    }

    /// Replace the timestamp, re-deriving the cached ISO week.
    pub fn set_timestamp(&mut self, dt: NaiveDateTime) {
        let iso = dt.date().iso_week();
        self.dt = dt;
        self.iso_week = iso.week();
        self.iso_year = iso.year();
    }

    /// Description, title and auxiliary text joined by single spaces.
    pub fn full_text(&self) -> String {
        [
            self.description.as_str(),
            self.headline.as_str(),
            self.aux_text.as_str(),
        ]
        .join(" ")
    }

    pub fn append_aux_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.aux_text.is_empty() {
            self.aux_text.push(' ');
        }
        self.aux_text.push_str(text);
    }

    /// Remove every occurrence of each term from the three text fields.
    ///
    /// Substring removal, case-sensitive: stripping "trump" from "trumps"
    /// leaves "s". Callers that care pass longer terms first.
    pub fn strip_terms<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for term in terms {
            let term = term.as_ref();
            if term.is_empty() {
                continue;
            }
            self.headline = self.headline.replace(term, "");
            self.description = self.description.replace(term, "");
            self.aux_text = self.aux_text.replace(term, "");
        }
    }

    pub fn replace_term(&mut self, target: &str, replacement: &str) {
        if target.is_empty() {
            return;
        }
        self.headline = self.headline.replace(target, replacement);
        self.description = self.description.replace(target, replacement);
        self.aux_text = self.aux_text.replace(target, replacement);
    }

    /// Whether the title alone mentions any of `topics`.
    ///
    /// Restricting the check to the title is what makes cross-topic
    /// disambiguation work: article bodies routinely mention several topics.
    pub fn has_topical_headline_hit<S: AsRef<str>>(&self, topics: &[S]) -> bool {
        topics.iter().any(|topic| {
            let topic = topic.as_ref();
            !topic.is_empty() && self.headline.contains(&topic.to_lowercase())
        })
    }

    /// Whether the full text mentions any of `topics`, case-insensitively.
    pub fn has_topic_hit<S: AsRef<str>>(&self, topics: &[S]) -> bool {
        self.count_topic_hits(topics) > 0
    }

    /// Total occurrences of all `topics` in the lowercased full text.
    pub fn count_topic_hits<S: AsRef<str>>(&self, topics: &[S]) -> usize {
        let text = self.full_text().to_lowercase();
        topics
            .iter()
            .map(|t| t.as_ref().to_lowercase())
            .filter(|t| !t.is_empty())
            .map(|t| text.matches(t.as_str()).count())
            .sum()
    }

    /// Inclusive date-range check on the timestamp's calendar date.
    pub fn is_in_date_range(&self, low: NaiveDate, high: NaiveDate) -> bool {
        let date = self.date();
        low <= date && date <= high
    }

    pub fn field_value(&self, field: HeadlineField) -> String {
        match field {
            HeadlineField::Uri => self.uri.clone(),
            HeadlineField::Headline => self.headline.clone(),
            HeadlineField::Description => self.description.clone(),
            HeadlineField::Id => self.id.to_string(),
            HeadlineField::Rank => self.rank.to_string(),
            HeadlineField::Authors => self.authors.clone(),
            HeadlineField::Thumbnail => self.thumbnail.clone(),
            HeadlineField::ArchiveSource => self.archive_source.clone(),
        }
    }

    /// Share count from the attribute map, 0 when absent or non-numeric.
    pub fn share_count(&self) -> i64 {
        self.attrib
            .get(SHARE_COUNT_KEY)
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    /// A numeric score stored under `key`. `None` when absent or null.
    pub fn score(&self, key: &str) -> Option<f64> {
        self.attrib.get(key).and_then(Value::as_f64)
    }

    /// Convert to the flat record form. With `filter_source`, web-archive
    /// prefixes are stripped from links and the archive source is omitted.
    pub fn to_record(&self, filter_source: bool) -> HeadlineRecord {
        let (uri, thumbnail, archive_source) = if filter_source {
            (
                strip_archive_prefix(&self.uri).to_string(),
                strip_archive_prefix(&self.thumbnail).to_string(),
                None,
            )
        } else {
            (
                self.uri.clone(),
                self.thumbnail.clone(),
                Some(self.archive_source.clone()),
            )
        };

        HeadlineRecord {
            description: self.description.clone(),
            headline: self.headline.clone(),
            datetime: Some(self.dt.format(DATETIME_FORMAT).to_string()),
            rank: self.rank,
            uri,
            thumbnail,
            authors: self.authors.clone(),
            id: self.id,
            full_text: self.aux_text.clone(),
            iso_week: Some(self.iso_week),
            attrib: self.attrib.clone(),
            archive_source,
        }
    }
}

impl fmt::Display for Headline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.headline, self.uri, self.dt)
    }
}

/// Strip a web-archive snapshot prefix from a link, if present.
pub fn strip_archive_prefix(url: &str) -> &str {
    match ARCHIVE_PREFIX.find(url) {
        Some(m) => url[m.end()..].trim_start_matches('/'),
        None => url,
    }
}

/// Headline fields usable as deduplication keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadlineField {
    Uri,
    Headline,
    Description,
    Id,
    Rank,
    Authors,
    Thumbnail,
    ArchiveSource,
}

impl FromStr for HeadlineField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uri" | "url" => Ok(Self::Uri),
            "headline" | "title" => Ok(Self::Headline),
            "description" => Ok(Self::Description),
            "id" => Ok(Self::Id),
            "rank" => Ok(Self::Rank),
            "authors" | "author" => Ok(Self::Authors),
            "thumbnail" => Ok(Self::Thumbnail),
            "archivesource" => Ok(Self::ArchiveSource),
            other => Err(format!("unknown headline field: {other}")),
        }
    }
}

fn unset() -> i64 {
    -1
}

/// Flat key/value form of a headline, the persisted round-trip shape.
///
/// `isoWeek` is written for readers of the file but ignored on load; the
/// week is always re-derived from `datetime`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlineRecord {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default = "unset")]
    pub rank: i64,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default = "unset")]
    pub id: i64,
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub iso_week: Option<u32>,
    #[serde(default)]
    pub attrib: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_source: Option<String>,
}

impl TryFrom<HeadlineRecord> for Headline {
    type Error = CorpusError;

    fn try_from(record: HeadlineRecord) -> Result<Self, Self::Error> {
        let raw = record
            .datetime
            .ok_or_else(|| CorpusError::MalformedRecord("record has no datetime".to_string()))?;
        let dt = NaiveDateTime::parse_from_str(raw.trim(), DATETIME_FORMAT).map_err(|e| {
            CorpusError::MalformedRecord(format!("unparsable datetime '{raw}': {e}"))
        })?;

        let mut headline = Headline::new(record.headline, dt);
        headline.description = record.description;
        headline.aux_text = record.full_text;
        headline.rank = record.rank;
        headline.id = record.id;
        headline.uri = record.uri;
        headline.thumbnail = record.thumbnail;
        headline.authors = record.authors;
        headline.attrib = record.attrib;
        headline.archive_source = record.archive_source.unwrap_or_default();
        Ok(headline)
    }
}
