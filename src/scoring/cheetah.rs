// Cheetah sentiment scoring.
//
// The net cosine similarity of a document against a lexicon,
//
//     Σ_p cos(v_avg, v_p) - Σ_n cos(v_avg, v_n)
//
// factors into two dot products once the lexicon side is precomputed:
//
//     (v_avg · U_pos - v_avg · U_neg) / ‖v_avg‖,   U = Σ v_t / ‖v_t‖
//
// U is a sum of unit vectors, not itself a unit vector. It is computed once
// per (lexicon, model) pair, after which each document costs one averaging
// pass over its tokens plus O(dimension) arithmetic, independent of lexicon
// size.
//
// A document with no in-vocabulary tokens has no average vector and so no
// score. That case is reported as `None` and written to the attribute map
// according to the scorer's `NoSignal` policy, so callers can tell "neutral"
// from "nothing to measure".

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, info};

use super::lexicon::{known_terms, LexiconCoverage, SentimentLexicon};
use super::traits::{TermLexicon, TermVectorSource};
use super::vectors::{average_into, cosine_similarity, dot, norm};
use crate::corpus::Headline;

/// Attribute key for the positive/negative net score.
pub const SENTIMENT_KEY: &str = "cheetah";
/// Attribute key for the single-lexicon score.
pub const LEXICAL_KEY: &str = "cheetah_lex";

/// What to store for a document with no in-vocabulary tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoSignal {
    /// Store 0.0, indistinguishable from a neutral document.
    #[default]
    Zero,
    /// Store a NaN sentinel. JSON has no NaN, so the attribute holds
    /// `null`, which `Headline::score` reads back as `None`.
    Nan,
}

impl NoSignal {
    fn value(self) -> Value {
        match self {
            NoSignal::Zero => Value::from(0.0),
            NoSignal::Nan => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScorerOptions {
    /// Balance the two lexicon sides (after vocabulary filtering) with this
    /// seed. `None` keeps the sides as they are.
    pub balance_seed: Option<u64>,
    pub no_signal: NoSignal,
}

/// Counts from a scoring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreStats {
    pub scored: usize,
    pub no_signal: usize,
}

impl ScoreStats {
    pub fn merge(&mut self, other: ScoreStats) {
        self.scored += other.scored;
        self.no_signal += other.no_signal;
    }

    pub fn total(&self) -> usize {
        self.scored + self.no_signal
    }
}

#[derive(Debug, Clone)]
enum Reference {
    Net { positive: Vec<f64>, negative: Vec<f64> },
    Single(Vec<f64>),
}

/// A scorer bound to one precomputed lexicon reference.
///
/// Holds no per-document state, so one instance can be shared read-only
/// across any number of workers.
#[derive(Debug, Clone)]
pub struct CheetahScorer {
    reference: Reference,
    dimension: usize,
    key: &'static str,
    no_signal: NoSignal,
    coverage: LexiconCoverage,
    terms_used: (usize, usize),
}

impl CheetahScorer {
    /// Filter the lexicon to the model vocabulary, optionally balance it,
    /// and precompute `U_pos` and `U_neg`.
    pub fn new<M>(model: &M, lexicon: &SentimentLexicon, options: &ScorerOptions) -> Self
    where
        M: TermVectorSource + ?Sized,
    {
        let (filtered, coverage) = lexicon.filtered_to(model);
        let (positive_terms, negative_terms) = match options.balance_seed {
            Some(seed) => filtered.balanced_sets(seed),
            None => (filtered.positive.to_vec(), filtered.negative.to_vec()),
        };

        info!(
            positive_hits = coverage.positive.hits,
            positive_misses = coverage.positive.misses,
            negative_hits = coverage.negative.hits,
            negative_misses = coverage.negative.misses,
            positive_used = positive_terms.len(),
            negative_used = negative_terms.len(),
            "Precomputing sentiment reference vectors"
        );

        let positive = unit_vector_sum(model, positive_terms.iter().map(String::as_str));
        let negative = unit_vector_sum(model, negative_terms.iter().map(String::as_str));

        Self {
            reference: Reference::Net { positive, negative },
            dimension: model.dimension(),
            key: SENTIMENT_KEY,
            no_signal: options.no_signal,
            coverage,
            terms_used: (positive_terms.len(), negative_terms.len()),
        }
    }

    /// Alignment with a single lexicon: one reference vector, no subtraction.
    /// Any term set works, from a loaded `Lexicon` to a plain `BTreeSet`.
    pub fn single<M, L>(model: &M, lexicon: &L, no_signal: NoSignal) -> Self
    where
        M: TermVectorSource + ?Sized,
        L: TermLexicon + ?Sized,
    {
        let (terms, coverage) = known_terms(model, lexicon);
        info!(
            hits = coverage.hits,
            misses = coverage.misses,
            "Precomputing lexicon reference vector"
        );
        let reference = unit_vector_sum(model, terms.iter().map(String::as_str));

        Self {
            reference: Reference::Single(reference),
            dimension: model.dimension(),
            key: LEXICAL_KEY,
            no_signal,
            coverage: LexiconCoverage {
                positive: coverage,
                negative: Default::default(),
            },
            terms_used: (terms.len(), 0),
        }
    }

    /// Attribute key scores are written under.
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn coverage(&self) -> LexiconCoverage {
        self.coverage
    }

    /// Lexicon terms that went into the reference vectors, per side.
    pub fn terms_used(&self) -> (usize, usize) {
        self.terms_used
    }

    pub fn no_signal(&self) -> NoSignal {
        self.no_signal
    }

    /// Score an already-averaged document vector. `None` for a zero vector.
    pub fn score_vector(&self, average: &[f64]) -> Option<f64> {
        let magnitude = norm(average);
        if magnitude == 0.0 || !magnitude.is_finite() {
            return None;
        }
        let raw = match &self.reference {
            Reference::Net { positive, negative } => dot(average, positive) - dot(average, negative),
            Reference::Single(reference) => dot(average, reference),
        };
        Some(raw / magnitude)
    }

    /// Score whitespace-separated text. `buffer` is the caller's averaging
    /// scratch space, reused across calls.
    pub fn score_text<M>(&self, model: &M, text: &str, buffer: &mut Vec<f64>) -> Option<f64>
    where
        M: TermVectorSource + ?Sized,
    {
        let found = average_into(model, text.split_whitespace(), buffer);
        if found == 0 {
            return None;
        }
        self.score_vector(buffer)
    }

    /// Score a headline's full text without touching it.
    pub fn score<M>(&self, model: &M, headline: &Headline) -> Option<f64>
    where
        M: TermVectorSource + ?Sized,
    {
        let mut buffer = Vec::with_capacity(self.dimension);
        self.score_text(model, &headline.full_text(), &mut buffer)
    }

    /// Score a headline and write the result under `key()`. Returns the score.
    pub fn score_headline<M>(&self, model: &M, headline: &mut Headline, buffer: &mut Vec<f64>) -> Option<f64>
    where
        M: TermVectorSource + ?Sized,
    {
        let score = self.score_text(model, &headline.full_text(), buffer);
        let value = match score {
            Some(s) => Value::from(s),
            None => self.no_signal.value(),
        };
        headline.attrib.insert(self.key.to_string(), value);
        score
    }

    /// Score a batch in place with one shared buffer.
    pub fn score_headlines<M>(&self, model: &M, headlines: &mut [Headline]) -> ScoreStats
    where
        M: TermVectorSource + ?Sized,
    {
        let mut buffer = Vec::with_capacity(self.dimension);
        let mut stats = ScoreStats::default();
        for headline in headlines.iter_mut() {
            match self.score_headline(model, headline, &mut buffer) {
                Some(_) => stats.scored += 1,
                None => stats.no_signal += 1,
            }
        }
        debug!(scored = stats.scored, no_signal = stats.no_signal, "Scored batch");
        stats
    }
}

/// `Σ v_t / ‖v_t‖` over the terms the model knows. Zero vectors are skipped.
pub fn unit_vector_sum<'t, M, I>(model: &M, terms: I) -> Vec<f64>
where
    M: TermVectorSource + ?Sized,
    I: IntoIterator<Item = &'t str>,
{
    let mut sum = vec![0.0; model.dimension()];
    for term in terms {
        let Ok(vector) = model.vector(term) else {
            continue;
        };
        let magnitude = norm(vector);
        if magnitude == 0.0 {
            continue;
        }
        for (acc, x) in sum.iter_mut().zip(vector) {
            *acc += x / magnitude;
        }
    }
    sum
}

/// The unfactored double sum, `Σ_p cos(v_avg, v_p) - Σ_n cos(v_avg, v_n)`.
///
/// O(lexicon size) per document. Kept as the reference the factored form is
/// checked against, and for small term lists where it reads more directly.
pub fn sum_cosine<M, S>(model: &M, text: &str, positive: &[S], negative: &[S]) -> Option<f64>
where
    M: TermVectorSource + ?Sized,
    S: AsRef<str>,
{
    let mut average = Vec::new();
    if average_into(model, text.split_whitespace(), &mut average) == 0 || norm(&average) == 0.0 {
        return None;
    }
    let side = |terms: &[S]| -> f64 {
        terms
            .iter()
            .filter_map(|t| model.vector(t.as_ref()).ok())
            .map(|v| cosine_similarity(&average, v))
            .sum()
    };
    Some(side(positive) - side(negative))
}

/// Score headlines across `workers` blocking tasks.
///
/// The model and scorer are shared read-only; each worker owns its slice of
/// headlines and its own averaging buffer. Output order matches input order.
pub async fn score_partitioned<M>(
    scorer: Arc<CheetahScorer>,
    model: Arc<M>,
    mut headlines: Vec<Headline>,
    workers: usize,
) -> Result<(Vec<Headline>, ScoreStats)>
where
    M: TermVectorSource + ?Sized + 'static,
{
    if workers <= 1 || headlines.len() < 2 {
        let stats = scorer.score_headlines(model.as_ref(), &mut headlines);
        return Ok((headlines, stats));
    }

    let chunk_size = headlines.len().div_ceil(workers);
    let mut chunks: Vec<Vec<Headline>> = Vec::with_capacity(workers);
    while headlines.len() > chunk_size {
        let tail = headlines.split_off(chunk_size);
        chunks.push(std::mem::replace(&mut headlines, tail));
    }
    chunks.push(headlines);

    debug!(workers = chunks.len(), chunk_size, "Partitioned scoring");

    let handles = chunks.into_iter().map(|mut chunk| {
        let scorer = Arc::clone(&scorer);
        let model = Arc::clone(&model);
        tokio::task::spawn_blocking(move || {
            let stats = scorer.score_headlines(model.as_ref(), &mut chunk);
            (chunk, stats)
        })
    });

    let parts = try_join_all(handles)
        .await
        .context("Scoring worker panicked")?;

    let mut merged = Vec::new();
    let mut stats = ScoreStats::default();
    for (chunk, chunk_stats) in parts {
        merged.extend(chunk);
        stats.merge(chunk_stats);
    }
    Ok((merged, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::lexicon::Lexicon;
    use crate::scoring::vectors::InMemoryVectors;
    use chrono::NaiveDate;

    fn model() -> InMemoryVectors {
        InMemoryVectors::from_pairs(
            2,
            [
                ("good", vec![1.0, 0.0]),
                ("bad", vec![-1.0, 0.0]),
                ("zero", vec![0.0, 0.0]),
            ],
        )
        .unwrap()
    }

    fn lexicon() -> SentimentLexicon {
        SentimentLexicon::new(Lexicon::new("positive", ["good"]), Lexicon::new("negative", ["bad"]))
    }

    fn headline(text: &str) -> Headline {
        let dt = NaiveDate::from_ymd_opt(2016, 1, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Headline::new(text, dt)
    }

    #[test]
    fn test_good_good_bad_scores_two() {
        let m = model();
        let scorer = CheetahScorer::new(&m, &lexicon(), &ScorerOptions::default());
        let mut buf = Vec::new();
        let score = scorer.score_text(&m, "good good bad", &mut buf).unwrap();
        assert!((score - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_in_vocab_tokens_is_none() {
        let m = model();
        let scorer = CheetahScorer::new(&m, &lexicon(), &ScorerOptions::default());
        let mut buf = Vec::new();
        assert_eq!(scorer.score_text(&m, "nothing known", &mut buf), None);
        assert_eq!(scorer.score_text(&m, "zero", &mut buf), None);
        assert_eq!(scorer.score_text(&m, "", &mut buf), None);
    }

    #[test]
    fn test_no_signal_policy_written_to_attrib() {
        let m = model();
        let mut h = headline("unknown words");
        let mut buf = Vec::new();

        let zero = CheetahScorer::new(&m, &lexicon(), &ScorerOptions::default());
        zero.score_headline(&m, &mut h, &mut buf);
        assert_eq!(h.score(SENTIMENT_KEY), Some(0.0));

        let nan = CheetahScorer::new(
            &m,
            &lexicon(),
            &ScorerOptions {
                no_signal: NoSignal::Nan,
                ..Default::default()
            },
        );
        nan.score_headline(&m, &mut h, &mut buf);
        assert_eq!(h.attrib.get(SENTIMENT_KEY), Some(&Value::Null));
        assert_eq!(h.score(SENTIMENT_KEY), None);
    }

    #[test]
    fn test_single_lexicon_omits_subtraction() {
        let m = model();
        let scorer = CheetahScorer::single(&m, &Lexicon::new("pos", ["good"]), NoSignal::Zero);
        assert_eq!(scorer.key(), LEXICAL_KEY);
        let mut buf = Vec::new();
        let score = scorer.score_text(&m, "good good bad", &mut buf).unwrap();
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_accepts_any_term_lexicon() {
        let m = model();
        let set: std::collections::BTreeSet<String> =
            ["good".to_string(), "absent".to_string()].into_iter().collect();
        let from_set = CheetahScorer::single(&m, &set, NoSignal::Zero);
        let from_lexicon = CheetahScorer::single(&m, &Lexicon::new("pos", ["good"]), NoSignal::Zero);
        assert_eq!(from_set.coverage().positive.misses, 1);

        let mut buf = Vec::new();
        let a = from_set.score_text(&m, "good bad", &mut buf);
        let b = from_lexicon.score_text(&m, "good bad", &mut buf);
        assert_eq!(a, b);
    }

    #[test]
    fn test_lexicon_misses_are_counted_not_fatal() {
        let m = model();
        let lex = SentimentLexicon::new(
            Lexicon::new("positive", ["good", "great"]),
            Lexicon::new("negative", ["bad"]),
        );
        let scorer = CheetahScorer::new(&m, &lex, &ScorerOptions::default());
        assert_eq!(scorer.coverage().positive.misses, 1);
        assert_eq!(scorer.terms_used(), (1, 1));
    }

    #[test]
    fn test_score_headlines_counts() {
        let m = model();
        let scorer = CheetahScorer::new(&m, &lexicon(), &ScorerOptions::default());
        let mut hs = vec![headline("good"), headline("???"), headline("bad news")];
        let stats = scorer.score_headlines(&m, &mut hs);
        assert_eq!(stats, ScoreStats { scored: 2, no_signal: 1 });
        assert!(hs[0].score(SENTIMENT_KEY).unwrap() > 0.0);
        assert!(hs[2].score(SENTIMENT_KEY).unwrap() < 0.0);
    }
}
