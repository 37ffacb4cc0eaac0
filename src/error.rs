// Typed errors for the library layers.
//
// Only precondition violations surface as errors. Bad records, missing
// lexicon terms and empty documents are counted and logged by the stages
// that meet them, and never reach the caller as an Err.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the corpus, binning and scoring layers.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// A lexicon folder, lexicon file or model file does not exist.
    #[error("Path not found: {}", .0.display())]
    MissingPath(PathBuf),

    /// A vector was requested for a term the model does not contain.
    #[error("Term not found in vector model: {0}")]
    TermNotFound(String),

    /// A vector of the wrong length was added to a model.
    #[error("Vector for '{term}' has dimension {actual}, model expects {expected}")]
    DimensionMismatch {
        term: String,
        expected: usize,
        actual: usize,
    },

    /// A headline handed to the binner lies outside the declared range.
    /// The binner expects date-filtered input, so this is a pipeline bug.
    #[error("Headline '{uri}' dated {date} is outside the bin range {low}..={high}; filter by date before binning")]
    OutOfRange {
        uri: String,
        date: NaiveDate,
        low: NaiveDate,
        high: NaiveDate,
    },

    /// Two query results in one collection carry the same topic set.
    #[error("Collection '{collection}' already has a result for topics {topics:?}")]
    DuplicateTopics {
        collection: String,
        topics: Vec<String>,
    },

    /// A single raw record could not be turned into a headline.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CorpusError::TermNotFound("zebra".to_string());
        assert_eq!(err.to_string(), "Term not found in vector model: zebra");

        let err = CorpusError::MissingPath(PathBuf::from("lexica/sentiment"));
        assert_eq!(err.to_string(), "Path not found: lexica/sentiment");
    }

    #[test]
    fn test_out_of_range_mentions_dates() {
        let err = CorpusError::OutOfRange {
            uri: "cnn.com/a".to_string(),
            date: NaiveDate::from_ymd_opt(2015, 12, 31).unwrap(),
            low: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap(),
            high: NaiveDate::from_ymd_opt(2016, 1, 7).unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2015-12-31"));
        assert!(msg.contains("2016-01-01..=2016-01-07"));
    }
}
