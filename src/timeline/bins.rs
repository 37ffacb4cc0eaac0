// Temporal binning over an explicit, inclusive date range.
//
// Every calendar day in [low, high] is enumerated and mapped to a bin key,
// so the bin list is dense: a week with no headlines still gets an (empty)
// bin, which keeps per-topic series aligned index-for-index. Bins come out
// in first-seen order, which is chronological.
//
// Weekly keys carry the ISO year rather than the calendar year. Jan 1-3 can
// belong to week 52/53 of the previous ISO year; keying them that way puts
// them in the same bin as the preceding December days, at the front of the
// sequence where they belong.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::corpus::Headline;
use crate::error::CorpusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinGrouping {
    #[default]
    Weekly,
    Monthly,
}

impl BinGrouping {
    pub fn key_for_date(&self, date: NaiveDate) -> BinKey {
        match self {
            BinGrouping::Weekly => {
                let iso = date.iso_week();
                BinKey::new(iso.week(), iso.year())
            }
            BinGrouping::Monthly => BinKey::new(date.month(), date.year()),
        }
    }

    /// Key for a headline, using its cached ISO week when weekly.
    pub fn key_for(&self, headline: &Headline) -> BinKey {
        match self {
            BinGrouping::Weekly => BinKey::new(headline.iso_week(), headline.iso_year()),
            BinGrouping::Monthly => self.key_for_date(headline.date()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BinGrouping::Weekly => "week",
            BinGrouping::Monthly => "month",
        }
    }
}

impl FromStr for BinGrouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            other => Err(format!("unknown bin grouping: {other} (expected weekly or monthly)")),
        }
    }
}

/// `(period, year)`: ISO week and ISO year, or month and calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinKey {
    pub period: u32,
    pub year: i32,
}

impl BinKey {
    pub fn new(period: u32, year: i32) -> Self {
        Self { period, year }
    }
}

impl fmt::Display for BinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.period)
    }
}

// Persisted as a two-element array, `[period, year]`.
impl Serialize for BinKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.period, self.year).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BinKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (period, year) = <(u32, i32)>::deserialize(deserializer)?;
        Ok(Self::new(period, year))
    }
}

/// One bucket and the headlines assigned to it.
#[derive(Debug, Clone)]
pub struct TimeBin<'a> {
    pub key: BinKey,
    pub headlines: Vec<&'a Headline>,
}

/// Dense, ordered bin keys covering `[low, high]`. Empty when `low > high`.
pub fn bin_keys(low: NaiveDate, high: NaiveDate, grouping: BinGrouping) -> Vec<BinKey> {
    let mut keys: Vec<BinKey> = Vec::new();
    for day in low.iter_days().take_while(|d| *d <= high) {
        let key = grouping.key_for_date(day);
        // Days arrive in order, so a repeat key is always the last one
        if keys.last() != Some(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Assign every headline to its bin.
///
/// Input must already be date-filtered to `[low, high]`. A headline outside
/// the range is a pipeline-ordering bug and fails the whole call with
/// `OutOfRange` rather than being dropped.
pub fn bin_headlines<'a, I>(
    headlines: I,
    low: NaiveDate,
    high: NaiveDate,
    grouping: BinGrouping,
) -> Result<Vec<TimeBin<'a>>, CorpusError>
where
    I: IntoIterator<Item = &'a Headline>,
{
    let mut bins: Vec<TimeBin<'a>> = bin_keys(low, high, grouping)
        .into_iter()
        .map(|key| TimeBin {
            key,
            headlines: Vec::new(),
        })
        .collect();

    for headline in headlines {
        if !headline.is_in_date_range(low, high) {
            return Err(CorpusError::OutOfRange {
                uri: headline.uri.clone(),
                date: headline.date(),
                low,
                high,
            });
        }
        let key = grouping.key_for(headline);
        // In range implies the key was enumerated above
        if let Some(bin) = bins.iter_mut().find(|b| b.key == key) {
            bin.headlines.push(headline);
        }
    }
    Ok(bins)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekly_keys_across_year_boundary() {
        // Dec 28 2015 (Mon) .. Jan 10 2016: ISO weeks 53/2015, 1/2016
        let keys = bin_keys(date(2015, 12, 28), date(2016, 1, 10), BinGrouping::Weekly);
        assert_eq!(keys, vec![BinKey::new(53, 2015), BinKey::new(1, 2016)]);
    }

    #[test]
    fn test_range_starting_mid_iso_week() {
        // Jan 1-3 2016 sit in week 53 of 2015 and must come first
        let keys = bin_keys(date(2016, 1, 1), date(2016, 1, 31), BinGrouping::Weekly);
        assert_eq!(keys.first(), Some(&BinKey::new(53, 2015)));
        assert_eq!(keys.last(), Some(&BinKey::new(4, 2016)));
        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn test_monthly_keys() {
        let keys = bin_keys(date(2016, 11, 15), date(2017, 2, 1), BinGrouping::Monthly);
        assert_eq!(
            keys,
            vec![
                BinKey::new(11, 2016),
                BinKey::new(12, 2016),
                BinKey::new(1, 2017),
                BinKey::new(2, 2017),
            ]
        );
    }

    #[test]
    fn test_inverted_range_is_empty() {
        assert!(bin_keys(date(2016, 2, 1), date(2016, 1, 1), BinGrouping::Weekly).is_empty());
    }

    #[test]
    fn test_bin_key_serializes_as_pair() {
        let json = serde_json::to_string(&BinKey::new(53, 2015)).unwrap();
        assert_eq!(json, "[53,2015]");
        let back: BinKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BinKey::new(53, 2015));
    }

    #[test]
    fn test_grouping_parse() {
        assert_eq!("Monthly".parse::<BinGrouping>(), Ok(BinGrouping::Monthly));
        assert!("daily".parse::<BinGrouping>().is_err());
    }
}
