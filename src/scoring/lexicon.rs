// Term lexica: flat term sets and positive/negative sentiment pairs.
//
// Lexica are loaded from line-delimited UTF-8 files, one term per line,
// trimmed and lowercased. Lines starting with ';' are comments (the common
// opinion-lexicon distributions ship with a ';' preamble). Terms are kept in
// a BTreeSet so iteration order is stable, which keeps seeded balancing
// reproducible across runs.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use super::traits::{TermLexicon, TermVectorSource};
use crate::corpus::normalize::TextNormalizer;
use crate::error::CorpusError;

/// File names expected inside a sentiment lexicon folder.
pub const POSITIVE_FILE: &str = "positive.txt";
pub const NEGATIVE_FILE: &str = "negative.txt";

/// A named, unordered set of lowercase terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexicon {
    pub name: String,
    terms: BTreeSet<String>,
}

impl Lexicon {
    pub fn new<I, S>(name: impl Into<String>, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            name: name.into(),
            terms,
        }
    }

    /// Parse line-delimited text. Blank lines and `;` comments are skipped.
    pub fn parse(name: impl Into<String>, text: &str) -> Self {
        Self::new(
            name,
            text.lines()
                .map(str::trim)
                .filter(|line| !line.starts_with(';')),
        )
    }

    /// Load a lexicon file; the name is the file stem.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CorpusError::MissingPath(path.to_path_buf()).into());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read lexicon {}", path.display()))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let lexicon = Self::parse(name, &text);
        debug!(path = %path.display(), terms = lexicon.len(), "Loaded lexicon");
        Ok(lexicon)
    }

    /// The English stop-word list bundled with the `stop-words` crate.
    pub fn english_stop_words() -> Self {
        let words: Vec<String> = stop_words::get(stop_words::LANGUAGE::English);
        Self::new("stopwords", words)
    }

    /// A copy without any of `terms`.
    pub fn remove_terms<S: AsRef<str>>(&self, terms: &[S]) -> Self {
        let mut out = self.clone();
        for term in terms {
            out.terms.remove(&term.as_ref().to_lowercase());
        }
        out
    }

    /// A copy with every term passed through `normalizer`. Terms that
    /// normalize to the same string merge; terms that normalize to nothing
    /// are dropped.
    pub fn normalized(&self, normalizer: &TextNormalizer) -> Self {
        Self {
            name: self.name.clone(),
            terms: self
                .terms
                .iter()
                .map(|t| normalizer.normalize(t))
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Split into the terms the model knows and a hit/miss count.
    pub fn filtered_to<M>(&self, model: &M) -> (Self, Coverage)
    where
        M: TermVectorSource + ?Sized,
    {
        let (known, coverage) = known_terms(model, self);
        (
            Self {
                name: self.name.clone(),
                terms: known.into_iter().collect(),
            },
            coverage,
        )
    }

    pub fn coverage<M>(&self, model: &M) -> Coverage
    where
        M: TermVectorSource + ?Sized,
    {
        known_terms(model, self).1
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.terms.iter().cloned().collect()
    }

    pub fn as_set(&self) -> &BTreeSet<String> {
        &self.terms
    }
}

impl TermLexicon for Lexicon {
    fn terms(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.terms.iter().map(String::as_str))
    }

    fn contains(&self, term: &str) -> bool {
        self.terms.contains(term)
    }

    fn len(&self) -> usize {
        self.terms.len()
    }
}

impl TermLexicon for BTreeSet<String> {
    fn terms(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.iter().map(String::as_str))
    }

    fn contains(&self, term: &str) -> bool {
        BTreeSet::contains(self, term)
    }

    fn len(&self) -> usize {
        BTreeSet::len(self)
    }
}

/// Terms of `lexicon` the model has vectors for, in lexicon order, with a
/// hit/miss count. Misses are counted, never fatal.
pub fn known_terms<M, L>(model: &M, lexicon: &L) -> (Vec<String>, Coverage)
where
    M: TermVectorSource + ?Sized,
    L: TermLexicon + ?Sized,
{
    let mut known = Vec::new();
    let mut misses = 0;
    for term in lexicon.terms() {
        if model.has_term(term) {
            known.push(term.to_string());
        } else {
            misses += 1;
        }
    }
    let coverage = Coverage {
        hits: known.len(),
        misses,
    };
    (known, coverage)
}

/// Hit/miss counts of a term set against a vector model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coverage {
    pub hits: usize,
    pub misses: usize,
}

impl Coverage {
    /// Fraction of terms found, 0.0 for an empty set.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// Per-side coverage of a sentiment lexicon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LexiconCoverage {
    pub positive: Coverage,
    pub negative: Coverage,
}

/// A positive/negative lexicon pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentimentLexicon {
    pub positive: Lexicon,
    pub negative: Lexicon,
}

impl SentimentLexicon {
    pub fn new(positive: Lexicon, negative: Lexicon) -> Self {
        Self { positive, negative }
    }

    /// Load `positive.txt` and `negative.txt` from `folder`.
    pub fn load(folder: &Path) -> Result<Self> {
        if !folder.is_dir() {
            return Err(CorpusError::MissingPath(folder.to_path_buf()).into());
        }
        let positive = Lexicon::load(&folder.join(POSITIVE_FILE))?;
        let negative = Lexicon::load(&folder.join(NEGATIVE_FILE))?;
        info!(
            folder = %folder.display(),
            positive = positive.len(),
            negative = negative.len(),
            "Loaded sentiment lexicon"
        );
        Ok(Self::new(positive, negative))
    }

    /// Both sides shuffled with `seed` and truncated to the smaller size.
    ///
    /// The returned lists have equal length `min(|pos|, |neg|)` and each is a
    /// subset of its original side. The same seed always yields the same
    /// lists.
    pub fn balanced_sets(&self, seed: u64) -> (Vec<String>, Vec<String>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut positive = self.positive.to_vec();
        let mut negative = self.negative.to_vec();
        positive.shuffle(&mut rng);
        negative.shuffle(&mut rng);

        let size = positive.len().min(negative.len());
        positive.truncate(size);
        negative.truncate(size);
        (positive, negative)
    }

    /// `balanced_sets` wrapped back into a lexicon pair.
    pub fn balanced(&self, seed: u64) -> Self {
        let (positive, negative) = self.balanced_sets(seed);
        Self::new(
            Lexicon::new(self.positive.name.clone(), positive),
            Lexicon::new(self.negative.name.clone(), negative),
        )
    }

    /// Drop topic terms from both sides so a topic never scores itself.
    pub fn remove_terms<S: AsRef<str>>(&self, terms: &[S]) -> Self {
        Self::new(
            self.positive.remove_terms(terms),
            self.negative.remove_terms(terms),
        )
    }

    pub fn normalized(&self, normalizer: &TextNormalizer) -> Self {
        Self::new(
            self.positive.normalized(normalizer),
            self.negative.normalized(normalizer),
        )
    }

    /// Both sides restricted to the model vocabulary, with coverage.
    pub fn filtered_to<M>(&self, model: &M) -> (Self, LexiconCoverage)
    where
        M: TermVectorSource + ?Sized,
    {
        let (positive, pos_cov) = self.positive.filtered_to(model);
        let (negative, neg_cov) = self.negative.filtered_to(model);
        (
            Self::new(positive, negative),
            LexiconCoverage {
                positive: pos_cov,
                negative: neg_cov,
            },
        )
    }

    pub fn coverage<M>(&self, model: &M) -> LexiconCoverage
    where
        M: TermVectorSource + ?Sized,
    {
        LexiconCoverage {
            positive: self.positive.coverage(model),
            negative: self.negative.coverage(model),
        }
    }
}
