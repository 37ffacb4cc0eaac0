// Topic-partitioned headline collections.
//
// A ResultCollection is one source's results (one aggregator, one outlet)
// split into QueryResults, each owning a sorted topic-term list and the
// headlines believed to be about it. Within a collection no two results may
// carry the same topic set. Headlines are owned by exactly one QueryResult;
// a headline matching two topics is cloned into both.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::headline::Headline;
use super::records::{headlines_from_records, RecordStats};
use crate::error::CorpusError;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    topics: Vec<String>,
    pub headlines: Vec<Headline>,
}

impl QueryResult {
    pub fn new(mut topics: Vec<String>, headlines: Vec<Headline>) -> Self {
        topics.sort();
        topics.dedup();
        Self { topics, headlines }
    }

    /// Topic terms, sorted.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn set_topics(&mut self, mut topics: Vec<String>) {
        topics.sort();
        topics.dedup();
        self.topics = topics;
    }

    pub fn topic_set(&self) -> BTreeSet<String> {
        self.topics.iter().cloned().collect()
    }

    /// First topic term, used to label output.
    pub fn head_topic(&self) -> &str {
        self.topics.first().map(String::as_str).unwrap_or("")
    }

    pub fn summary(&self) -> String {
        format!("[{}]:{}", self.topics.join(", "), self.headlines.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultCollection {
    pub name: String,
    results: Vec<QueryResult>,
}

impl ResultCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            results: Vec::new(),
        }
    }

    /// Partition `headlines` by topic. A headline is admitted to every topic
    /// whose terms appear anywhere in its text.
    pub fn from_headlines<S: AsRef<str>>(
        name: impl Into<String>,
        headlines: &[Headline],
        topic_lists: &[Vec<S>],
    ) -> Result<Self, CorpusError> {
        let mut collection = Self::new(name);
        for topics in topic_lists {
            let matching = headlines
                .iter()
                .filter(|h| h.has_topic_hit(topics))
                .cloned()
                .collect();
            let topics = topics.iter().map(|t| t.as_ref().to_string()).collect();
            collection.add_result(topics, matching)?;
        }
        Ok(collection)
    }

    /// Add a result, rejecting a topic set this collection already holds.
    pub fn add_result(&mut self, topics: Vec<String>, headlines: Vec<Headline>) -> Result<(), CorpusError> {
        let result = QueryResult::new(topics, headlines);
        if self.results.iter().any(|r| r.topics == result.topics) {
            return Err(CorpusError::DuplicateTopics {
                collection: self.name.clone(),
                topics: result.topics,
            });
        }
        self.results.push(result);
        Ok(())
    }

    /// Fold results whose topic lists have become equal into the first of
    /// them, concatenating headlines in result order. Topic rewrites
    /// (normalization, condensation) call this so the unique-topic-set rule
    /// still holds afterwards. Returns the topic lists that were merged.
    pub fn merge_duplicate_topics(&mut self) -> Vec<Vec<String>> {
        let mut merged = Vec::new();
        let mut kept: Vec<QueryResult> = Vec::with_capacity(self.results.len());
        for result in std::mem::take(&mut self.results) {
            match kept.iter_mut().find(|k| k.topics == result.topics) {
                Some(existing) => {
                    warn!(
                        collection = %self.name,
                        topics = ?result.topics,
                        headlines = result.headlines.len(),
                        "Topic lists collided after rewrite; merging results"
                    );
                    existing.headlines.extend(result.headlines);
                    merged.push(result.topics);
                }
                None => kept.push(result),
            }
        }
        self.results = kept;
        merged
    }

    pub fn results(&self) -> &[QueryResult] {
        &self.results
    }

    /// Mutable access to the results. A slice, so the topic-set uniqueness
    /// check in `add_result` cannot be bypassed by pushing.
    pub fn results_mut(&mut self) -> &mut [QueryResult] {
        &mut self.results
    }

    pub fn result_for(&self, topics: &[String]) -> Option<&QueryResult> {
        let mut sorted = topics.to_vec();
        sorted.sort();
        sorted.dedup();
        self.results.iter().find(|r| r.topics == sorted)
    }

    pub fn headline_count(&self) -> usize {
        self.results.iter().map(|r| r.headlines.len()).sum()
    }

    /// Headlines in the result whose topic list equals `topics`.
    pub fn count_topical_headlines(&self, topics: &[String]) -> usize {
        self.result_for(topics).map_or(0, |r| r.headlines.len())
    }

    pub fn summary(&self) -> String {
        let parts: Vec<String> = self.results.iter().map(QueryResult::summary).collect();
        format!("{}: {}", self.name, parts.join(" "))
    }

    /// Earliest and latest timestamp across all results.
    pub fn min_max_dt(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        min_max_dt(std::slice::from_ref(self))
    }
}

/// Earliest and latest timestamp across many collections.
pub fn min_max_dt(collections: &[ResultCollection]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let mut dts = collections
        .iter()
        .flat_map(|c| c.results.iter())
        .flat_map(|r| r.headlines.iter())
        .map(Headline::dt);
    let first = dts.next()?;
    Some(dts.fold((first, first), |(lo, hi), dt| (lo.min(dt), hi.max(dt))))
}

/// Distinct topic sets across collections, in sorted order.
pub fn topic_sets(collections: &[ResultCollection]) -> Vec<BTreeSet<String>> {
    collections
        .iter()
        .flat_map(|c| c.results.iter())
        .map(QueryResult::topic_set)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Headlines per topic list merged across collections, optionally limited to
/// an inclusive date range. Topic lists come out in sorted order.
pub fn topical_headline_pairs(
    collections: &[ResultCollection],
    range: Option<(NaiveDate, NaiveDate)>,
) -> Vec<(Vec<String>, Vec<Headline>)> {
    let mut merged: BTreeMap<Vec<String>, Vec<Headline>> = BTreeMap::new();
    for result in collections.iter().flat_map(|c| c.results.iter()) {
        let entry = merged.entry(result.topics.clone()).or_default();
        entry.extend(
            result
                .headlines
                .iter()
                .filter(|h| range.is_none_or(|(low, high)| h.is_in_date_range(low, high)))
                .cloned(),
        );
    }
    merged.into_iter().collect()
}

// Persisted layout: [{"Name", "QueryResults": [{"Topics", "Headlines"}]}]

#[derive(Serialize, Deserialize)]
struct StoredResult {
    #[serde(rename = "Topics")]
    topics: Vec<String>,
    #[serde(rename = "Headlines")]
    headlines: Vec<Value>,
}

#[derive(Serialize, Deserialize)]
struct StoredCollection {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "QueryResults")]
    query_results: Vec<StoredResult>,
}

/// Write collections as pretty JSON. With `filter_source`, archive prefixes
/// are stripped from links.
pub fn save_collections(collections: &[ResultCollection], path: &Path, filter_source: bool) -> Result<()> {
    let stored: Vec<StoredCollection> = collections
        .iter()
        .map(|c| {
            let query_results = c
                .results
                .iter()
                .map(|r| {
                    let headlines = r
                        .headlines
                        .iter()
                        .map(|h| serde_json::to_value(h.to_record(filter_source)))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(StoredResult {
                        topics: r.topics.clone(),
                        headlines,
                    })
                })
                .collect::<Result<Vec<_>, serde_json::Error>>()?;
            Ok(StoredCollection {
                name: c.name.clone(),
                query_results,
            })
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()
        .context("Failed to serialize collections")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&stored)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), collections = collections.len(), "Saved collections");
    Ok(())
}

/// Read collections saved by `save_collections`. Malformed headline records
/// are dropped and counted; a duplicate topic set within one collection is
/// an error.
pub fn load_collections(path: &Path) -> Result<(Vec<ResultCollection>, RecordStats)> {
    if !path.is_file() {
        return Err(CorpusError::MissingPath(path.to_path_buf()).into());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let stored: Vec<StoredCollection> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse collections from {}", path.display()))?;

    let mut stats = RecordStats::default();
    let mut collections = Vec::with_capacity(stored.len());
    for sc in stored {
        let mut collection = ResultCollection::new(sc.name);
        for sr in sc.query_results {
            let (headlines, s) = headlines_from_records(sr.headlines);
            stats.merge(s);
            collection.add_result(sr.topics, headlines)?;
        }
        collections.push(collection);
    }

    info!(
        path = %path.display(),
        collections = collections.len(),
        headlines = stats.parsed,
        dropped = stats.dropped,
        "Loaded collections"
    );
    Ok((collections, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn topics(terms: &[&str]) -> Vec<String> {
        terms.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_topics_sorted_and_unique_per_collection() {
        let mut c = ResultCollection::new("cnn");
        c.add_result(topics(&["trump", "donald"]), vec![]).unwrap();
        assert_eq!(c.results()[0].topics(), &["donald", "trump"]);

        let err = c.add_result(topics(&["donald", "trump"]), vec![]).unwrap_err();
        assert!(matches!(err, CorpusError::DuplicateTopics { .. }));
    }

    #[test]
    fn test_merge_duplicate_topics_concatenates_headlines() {
        let mut c = ResultCollection::new("cnn");
        c.add_result(topics(&["Trump"]), vec![Headline::new("a", at(2016, 1, 1))])
            .unwrap();
        c.add_result(topics(&["clinton"]), vec![Headline::new("b", at(2016, 1, 2))])
            .unwrap();
        c.add_result(topics(&["trump"]), vec![Headline::new("c", at(2016, 1, 3))])
            .unwrap();

        assert!(c.merge_duplicate_topics().is_empty());
        c.results_mut()[0].set_topics(topics(&["trump"]));

        let merged = c.merge_duplicate_topics();
        assert_eq!(merged, vec![topics(&["trump"])]);
        assert_eq!(c.results().len(), 2);
        let titles: Vec<&str> = c.results()[0].headlines.iter().map(|h| h.headline.as_str()).collect();
        assert_eq!(titles, ["a", "c"]);
        assert_eq!(c.results()[1].topics(), &["clinton"]);
    }

    #[test]
    fn test_from_headlines_clones_into_each_topic() {
        let headlines = vec![
            Headline::new("trump and clinton debate", at(2016, 9, 26)),
            Headline::new("clinton emails", at(2016, 9, 27)),
        ];
        let c = ResultCollection::from_headlines(
            "cnn",
            &headlines,
            &[vec!["trump"], vec!["clinton", "hillary"]],
        )
        .unwrap();
        assert_eq!(c.count_topical_headlines(&topics(&["trump"])), 1);
        assert_eq!(c.count_topical_headlines(&topics(&["hillary", "clinton"])), 2);
        assert_eq!(c.headline_count(), 3);
    }

    #[test]
    fn test_min_max_dt_and_topic_sets() {
        let mut a = ResultCollection::new("a");
        a.add_result(topics(&["x"]), vec![Headline::new("x", at(2016, 2, 1))])
            .unwrap();
        let mut b = ResultCollection::new("b");
        b.add_result(topics(&["x"]), vec![Headline::new("x", at(2016, 1, 1))])
            .unwrap();
        b.add_result(topics(&["y"]), vec![Headline::new("y", at(2016, 3, 1))])
            .unwrap();

        let (lo, hi) = min_max_dt(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(lo, at(2016, 1, 1));
        assert_eq!(hi, at(2016, 3, 1));
        assert_eq!(topic_sets(&[a.clone(), b.clone()]).len(), 2);

        let pairs = topical_headline_pairs(
            &[a, b],
            Some((
                NaiveDate::from_ymd_opt(2016, 1, 15).unwrap(),
                NaiveDate::from_ymd_opt(2016, 12, 31).unwrap(),
            )),
        );
        assert_eq!(pairs[0].0, topics(&["x"]));
        assert_eq!(pairs[0].1.len(), 1);
        assert_eq!(pairs[1].1.len(), 1);
    }

    #[test]
    fn test_empty_collection_has_no_span() {
        assert!(ResultCollection::new("empty").min_max_dt().is_none());
        assert_eq!(
            ResultCollection::new("empty").summary(),
            "empty: "
        );
    }
}
