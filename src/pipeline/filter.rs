// Corpus filter pipeline: raw, duplicate-laden, multi-topic collections in,
// clean and disambiguated collections out.
//
// Stages run in a fixed order because later stages match on text produced
// by earlier ones:
//
//   date range -> dedup -> normalize -> condense multi-word topics
//     -> cross-topic filter -> off-topic strip -> stop words
//
// Every stage is idempotent on its own. None of them fails on empty input;
// an empty corpus after date filtering simply flows through as empty.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::corpus::normalize::TextNormalizer;
use crate::corpus::{collection, Headline, HeadlineField, ResultCollection};
use crate::scoring::lexicon::Lexicon;

/// Pipeline configuration, built once and passed in.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub low: NaiveDate,
    pub high: NaiveDate,
    /// Collapse same-day duplicates of this field.
    pub dedup_field: Option<HeadlineField>,
    pub normalizer: TextNormalizer,
    /// Drop headlines whose title names another tracked topic.
    pub topic_cross_filter: bool,
    /// Erase other topics' terms from each headline's text.
    pub remove_off_topic_terms: bool,
    /// Whole-token stop words removed last. Normalized before use.
    pub stop_words: Option<Lexicon>,
}

impl FilterOptions {
    /// Date filtering and normalization only; every optional stage off.
    pub fn new(low: NaiveDate, high: NaiveDate) -> Self {
        Self {
            low,
            high,
            dedup_field: None,
            normalizer: TextNormalizer::default(),
            topic_cross_filter: false,
            remove_off_topic_terms: false,
            stop_words: None,
        }
    }

    pub fn with_dedup(mut self, field: HeadlineField) -> Self {
        self.dedup_field = Some(field);
        self
    }

    pub fn with_cross_filter(mut self) -> Self {
        self.topic_cross_filter = true;
        self
    }

    pub fn with_off_topic_removal(mut self) -> Self {
        self.remove_off_topic_terms = true;
        self
    }

    pub fn with_stop_words(mut self, stop_words: Lexicon) -> Self {
        self.stop_words = Some(stop_words);
        self
    }

    pub fn with_normalizer(mut self, normalizer: TextNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }
}

/// Headline counts after each stage, plus what the stages changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub input: usize,
    pub after_date: usize,
    pub after_dedup: usize,
    pub after_cross_filter: usize,
    /// Multi-word topic terms and the tokens they were condensed to.
    pub condensed: Vec<(String, String)>,
    /// Pairs of topic sets that share a term.
    pub overlapping_topics: Vec<(BTreeSet<String>, BTreeSet<String>)>,
}

/// Run the full pipeline in place.
pub fn run(collections: &mut [ResultCollection], options: &FilterOptions) -> FilterReport {
    let mut report = FilterReport {
        input: total_headlines(collections),
        ..Default::default()
    };

    filter_by_date(collections, options.low, options.high);
    report.after_date = total_headlines(collections);

    if let Some(field) = options.dedup_field {
        for result in results_mut(collections) {
            let headlines = std::mem::take(&mut result.headlines);
            result.headlines = uniquify_by_day(headlines, field);
        }
    }
    report.after_dedup = total_headlines(collections);

    normalize_collections(collections, &options.normalizer);
    report.condensed = condense_multiword_topics(collections);

    if options.topic_cross_filter {
        report.overlapping_topics = topic_cross_filter(collections);
    }
    report.after_cross_filter = total_headlines(collections);

    if options.remove_off_topic_terms {
        remove_off_topic_terms(collections);
    }

    if let Some(stop_words) = &options.stop_words {
        let stop_words = stop_words.normalized(&options.normalizer);
        remove_stop_words(collections, stop_words.as_set());
    }

    info!(
        input = report.input,
        after_date = report.after_date,
        after_dedup = report.after_dedup,
        output = report.after_cross_filter,
        condensed = report.condensed.len(),
        "Filter pipeline complete"
    );
    report
}

fn results_mut(
    collections: &mut [ResultCollection],
) -> impl Iterator<Item = &mut crate::corpus::QueryResult> {
    collections.iter_mut().flat_map(|c| c.results_mut().iter_mut())
}

fn total_headlines(collections: &[ResultCollection]) -> usize {
    collections.iter().map(ResultCollection::headline_count).sum()
}

/// Keep headlines dated within `[low, high]` inclusive.
pub fn filter_by_date(collections: &mut [ResultCollection], low: NaiveDate, high: NaiveDate) {
    for result in results_mut(collections) {
        result.headlines.retain(|h| h.is_in_date_range(low, high));
    }
}

/// Keep the first headline per `(field value, date)`. Cross-day repeats of
/// the same value survive; input order decides which same-day copy wins.
pub fn uniquify_by_day(headlines: Vec<Headline>, field: HeadlineField) -> Vec<Headline> {
    let mut seen: HashSet<(String, NaiveDate)> = HashSet::new();
    headlines
        .into_iter()
        .filter(|h| seen.insert((h.field_value(field), h.date())))
        .collect()
}

/// Keep the first headline per field value regardless of date.
pub fn uniquify(headlines: Vec<Headline>, field: HeadlineField) -> Vec<Headline> {
    let mut seen: HashSet<String> = HashSet::new();
    headlines
        .into_iter()
        .filter(|h| seen.insert(h.field_value(field)))
        .collect()
}

/// Normalize headline text and topic terms with the same normalizer.
/// Results whose topic lists normalize to the same list are merged.
pub fn normalize_collections(collections: &mut [ResultCollection], normalizer: &TextNormalizer) {
    for result in results_mut(collections) {
        let topics = normalizer.normalize_terms(result.topics());
        result.set_topics(topics);
        for headline in &mut result.headlines {
            normalizer.normalize_headline(headline);
        }
    }
    merge_collided_topics(collections);
}

fn merge_collided_topics(collections: &mut [ResultCollection]) -> usize {
    collections
        .iter_mut()
        .map(|c| c.merge_duplicate_topics().len())
        .sum()
}

/// Condense multi-word topic terms ("north korea" -> "northkorea") in topic
/// lists and document text. Returns the substitutions made. Results whose
/// topic lists become equal are merged.
pub fn condense_multiword_topics(collections: &mut [ResultCollection]) -> Vec<(String, String)> {
    let phrases: BTreeSet<String> = collections
        .iter()
        .flat_map(|c| c.results().iter())
        .flat_map(|r| r.topics().iter())
        .filter(|t| t.contains(' '))
        .cloned()
        .collect();
    if phrases.is_empty() {
        return Vec::new();
    }

    // Longest first so "new york city" is not pre-empted by "new york"
    let mut substitutions: Vec<(String, String)> = phrases
        .into_iter()
        .map(|p| {
            let condensed = p.split_whitespace().collect::<String>();
            (p, condensed)
        })
        .collect();
    substitutions.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

    for result in results_mut(collections) {
        let topics = result
            .topics()
            .iter()
            .map(|t| {
                substitutions
                    .iter()
                    .find(|(from, _)| from == t)
                    .map_or_else(|| t.clone(), |(_, to)| to.clone())
            })
            .collect();
        result.set_topics(topics);

        for headline in &mut result.headlines {
            for (from, to) in &substitutions {
                headline.replace_term(from, to);
            }
        }
    }

    let merged = merge_collided_topics(collections);
    debug!(count = substitutions.len(), merged, "Condensed multi-word topics");
    substitutions
}

/// Pairs of topic sets sharing at least one term. Each pair is logged.
pub fn overlapping_topic_sets(sets: &[BTreeSet<String>]) -> Vec<(BTreeSet<String>, BTreeSet<String>)> {
    let mut overlaps = Vec::new();
    for (i, a) in sets.iter().enumerate() {
        for b in &sets[i + 1..] {
            if !a.is_disjoint(b) {
                warn!(
                    first = ?a,
                    second = ?b,
                    shared = ?a.intersection(b).collect::<Vec<_>>(),
                    "Topic sets are not disjoint; only the disjoint remainder is used"
                );
                overlaps.push((a.clone(), b.clone()));
            }
        }
    }
    overlaps
}

/// Terms of every other topic set, minus this topic's own terms.
fn other_topic_terms(all_sets: &[BTreeSet<String>], own: &BTreeSet<String>) -> Vec<String> {
    let mut terms: Vec<String> = all_sets
        .iter()
        .filter(|s| *s != own)
        .flat_map(|s| s.iter())
        .filter(|t| !own.contains(*t))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    // Longest first so stripping "trumps" is not pre-empted by "trump"
    terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    terms
}

/// Drop from each topic any headline whose title names another topic.
///
/// Idempotent: a second pass over the output removes nothing. Returns the
/// overlapping topic-set pairs found.
pub fn topic_cross_filter(collections: &mut [ResultCollection]) -> Vec<(BTreeSet<String>, BTreeSet<String>)> {
    let sets = collection::topic_sets(collections);
    let overlaps = overlapping_topic_sets(&sets);

    for result in results_mut(collections) {
        let exclusion = other_topic_terms(&sets, &result.topic_set());
        if exclusion.is_empty() {
            continue;
        }
        let before = result.headlines.len();
        result
            .headlines
            .retain(|h| !h.has_topical_headline_hit(&exclusion));
        debug!(
            topics = ?result.topics(),
            removed = before - result.headlines.len(),
            "Cross-topic filter"
        );
    }
    overlaps
}

/// Erase other topics' terms from each headline's text.
pub fn remove_off_topic_terms(collections: &mut [ResultCollection]) {
    let sets = collection::topic_sets(collections);
    if sets.len() < 2 {
        return;
    }
    for result in results_mut(collections) {
        let exclusion = other_topic_terms(&sets, &result.topic_set());
        for headline in &mut result.headlines {
            headline.strip_terms(&exclusion);
        }
    }
}

fn drop_tokens(text: &str, stop_words: &BTreeSet<String>) -> String {
    text.split_whitespace()
        .filter(|token| !stop_words.contains(*token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove whole stop-word tokens from the three text fields.
pub fn remove_stop_words(collections: &mut [ResultCollection], stop_words: &BTreeSet<String>) {
    for result in results_mut(collections) {
        for h in &mut result.headlines {
            h.headline = drop_tokens(&h.headline, stop_words);
            h.description = drop_tokens(&h.description, stop_words);
            h.aux_text = drop_tokens(&h.aux_text, stop_words);
        }
    }
}

/// Keep headlines whose full text mentions any of `topics`.
pub fn filter_inclusive<S: AsRef<str>>(headlines: Vec<Headline>, topics: &[S]) -> Vec<Headline> {
    headlines
        .into_iter()
        .filter(|h| h.has_topic_hit(topics))
        .collect()
}

/// Drop headlines whose title mentions any of `terms`.
pub fn exclude_topical_titles<S: AsRef<str>>(headlines: Vec<Headline>, terms: &[S]) -> Vec<Headline> {
    headlines
        .into_iter()
        .filter(|h| !h.has_topical_headline_hit(terms))
        .collect()
}

/// Keep headlines whose rank is at least `min_rank`. Unranked headlines
/// carry rank -1, so any non-negative threshold drops them.
pub fn filter_by_rank(headlines: Vec<Headline>, min_rank: i64) -> Vec<Headline> {
    headlines
        .into_iter()
        .filter(|h| h.rank >= min_rank)
        .collect()
}

pub fn earliest(headlines: &[Headline]) -> Option<&Headline> {
    headlines.iter().min_by_key(|h| h.dt())
}

pub fn latest(headlines: &[Headline]) -> Option<&Headline> {
    headlines.iter().max_by_key(|h| h.dt())
}

/// Randomly down-sample the larger set to the size of the smaller. Kept
/// headlines retain their original relative order.
pub fn equalize_sets(a: Vec<Headline>, b: Vec<Headline>, seed: u64) -> (Vec<Headline>, Vec<Headline>) {
    let target = a.len().min(b.len());
    let mut rng = StdRng::seed_from_u64(seed);

    let mut sample = |set: Vec<Headline>| -> Vec<Headline> {
        if set.len() == target {
            return set;
        }
        let keep: HashSet<usize> = rand::seq::index::sample(&mut rng, set.len(), target)
            .into_iter()
            .collect();
        set.into_iter()
            .enumerate()
            .filter(|(i, _)| keep.contains(i))
            .map(|(_, h)| h)
            .collect()
    };

    let a = sample(a);
    let b = sample(b);
    (a, b)
}

/// Sum of share counts.
pub fn net_shares(headlines: &[Headline]) -> i64 {
    headlines.iter().map(Headline::share_count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn titled(titles: &[&str]) -> Vec<Headline> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| Headline::new(*t, at(2016, 1, 1 + i as u32)).with_rank(i as i64))
            .collect()
    }

    #[test]
    fn test_uniquify_by_day_keeps_cross_day_copies() {
        let headlines = vec![
            Headline::new("a", at(2016, 1, 1)).with_uri("u1"),
            Headline::new("b", at(2016, 1, 1)).with_uri("u1"),
            Headline::new("c", at(2016, 1, 2)).with_uri("u1"),
        ];
        let out = uniquify_by_day(headlines.clone(), HeadlineField::Uri);
        assert_eq!(out.iter().map(|h| h.headline.as_str()).collect::<Vec<_>>(), ["a", "c"]);
        assert_eq!(uniquify(headlines, HeadlineField::Uri).len(), 1);
    }

    #[test]
    fn test_filter_by_rank_drops_unranked() {
        let mut headlines = titled(&["a", "b", "c"]);
        headlines.push(Headline::new("unranked", at(2016, 1, 9)));
        let out = filter_by_rank(headlines, 1);
        let ranks: Vec<i64> = out.iter().map(|h| h.rank).collect();
        assert_eq!(ranks, vec![1, 2]);
    }

    #[test]
    fn test_filter_by_rank_keeps_ranks_at_or_above_threshold() {
        let headlines = vec![
            Headline::new("low", at(2016, 1, 1)).with_rank(1),
            Headline::new("high", at(2016, 1, 2)).with_rank(10),
        ];
        let out = filter_by_rank(headlines, 5);
        let ranks: Vec<i64> = out.iter().map(|h| h.rank).collect();
        assert_eq!(ranks, vec![10]);
    }

    #[test]
    fn test_exclude_topical_titles_ignores_description() {
        let headlines = vec![
            Headline::new("trump wins", at(2016, 1, 1)),
            Headline::new("markets rally", at(2016, 1, 1)).with_description("trump"),
        ];
        let out = exclude_topical_titles(headlines, &["trump"]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].headline, "markets rally");
    }

    #[test]
    fn test_earliest_latest_and_net_shares() {
        let headlines = vec![
            Headline::new("b", at(2016, 2, 1)).with_attr("share_count", 5),
            Headline::new("a", at(2016, 1, 1)).with_attr("share_count", 7),
        ];
        assert_eq!(earliest(&headlines).unwrap().headline, "a");
        assert_eq!(latest(&headlines).unwrap().headline, "b");
        assert_eq!(net_shares(&headlines), 12);
        assert!(earliest(&[]).is_none());
    }

    #[test]
    fn test_equalize_sets_preserves_order() {
        let big = titled(&["a", "b", "c", "d", "e", "f"]);
        let small = titled(&["x", "y"]);
        let (a, b) = equalize_sets(big.clone(), small, 3);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 2);
        assert!(a[0].dt() < a[1].dt());

        let (again, _) = equalize_sets(big, titled(&["x", "y"]), 3);
        assert_eq!(a, again);
    }

    #[test]
    fn test_stop_words_are_whole_tokens() {
        let mut c = ResultCollection::new("s");
        c.add_result(vec!["trump".into()], vec![Headline::new("the theory of trump", at(2016, 1, 1))])
            .unwrap();
        let stop: BTreeSet<String> = ["the", "of"].iter().map(|s| s.to_string()).collect();
        remove_stop_words(std::slice::from_mut(&mut c), &stop);
        assert_eq!(c.results()[0].headlines[0].headline, "theory trump");
    }

    #[test]
    fn test_other_topic_terms_excludes_shared_terms() {
        let a: BTreeSet<String> = ["trump", "donald"].iter().map(|s| s.to_string()).collect();
        let b: BTreeSet<String> = ["clinton", "donald"].iter().map(|s| s.to_string()).collect();
        let sets = vec![a.clone(), b.clone()];
        assert_eq!(other_topic_terms(&sets, &a), vec!["clinton"]);
        assert_eq!(overlapping_topic_sets(&sets).len(), 1);
    }
}
