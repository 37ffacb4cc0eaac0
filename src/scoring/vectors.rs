// In-memory term-vector model and vector arithmetic.
//
// Reads the plain-text word2vec/fastText format: an optional
// `<count> <dim>` header line, then one `<term> <v1> ... <vdim>` line per
// term. Lines with the wrong number of components or unparsable floats are
// counted and skipped. The whole model lives in a HashMap; it is loaded once
// before scoring and shared read-only afterwards.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::traits::TermVectorSource;
use crate::error::CorpusError;

/// Counters from parsing a text model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub loaded: usize,
    pub malformed: usize,
    pub duplicates: usize,
}

/// A `HashMap`-backed term-vector model.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVectors {
    dimension: usize,
    vectors: HashMap<String, Vec<f64>>,
}

impl InMemoryVectors {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
        }
    }

    /// Build a model from `(term, vector)` pairs, rejecting any vector whose
    /// length differs from `dimension`.
    pub fn from_pairs<I, S>(dimension: usize, pairs: I) -> Result<Self, CorpusError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut model = Self::new(dimension);
        for (term, vector) in pairs {
            model.insert(term, vector)?;
        }
        Ok(model)
    }

    /// Add or replace a term's vector.
    pub fn insert(&mut self, term: impl Into<String>, vector: Vec<f64>) -> Result<(), CorpusError> {
        let term = term.into();
        if vector.len() != self.dimension {
            return Err(CorpusError::DimensionMismatch {
                term,
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.vectors.insert(term, vector);
        Ok(())
    }

    /// Load a text-format model from disk, reading at most `limit` vectors.
    pub fn load(path: &Path, limit: Option<usize>) -> Result<Self> {
        if !path.exists() {
            return Err(CorpusError::MissingPath(path.to_path_buf()).into());
        }
        let file = File::open(path)
            .with_context(|| format!("Failed to open vector model {}", path.display()))?;
        let (model, stats) = Self::parse_text(BufReader::new(file), limit)
            .with_context(|| format!("Failed to read vector model {}", path.display()))?;

        info!(
            path = %path.display(),
            dimension = model.dimension,
            loaded = stats.loaded,
            malformed = stats.malformed,
            "Loaded term-vector model"
        );
        Ok(model)
    }

    /// Parse the text format from any buffered reader.
    ///
    /// Without a header line the dimension is taken from the first vector.
    pub fn parse_text<R: BufRead>(reader: R, limit: Option<usize>) -> Result<(Self, ParseStats)> {
        let mut stats = ParseStats::default();
        let mut model: Option<InMemoryVectors> = None;

        for (line_no, line) in reader.lines().enumerate() {
            if limit.is_some_and(|max| stats.loaded >= max) {
                break;
            }
            let line = line.with_context(|| format!("I/O error at line {}", line_no + 1))?;
            let mut parts = line.split_whitespace();
            let Some(term) = parts.next() else {
                continue;
            };
            let rest: Vec<&str> = parts.collect();

            if line_no == 0 && rest.len() == 1 {
                if let (Ok(count), Ok(dim)) = (term.parse::<usize>(), rest[0].parse::<usize>()) {
                    debug!(count, dim, "Vector model header");
                    model = Some(Self::new(dim));
                    continue;
                }
            }

            let values: Result<Vec<f64>, _> = rest.iter().map(|v| v.parse::<f64>()).collect();
            // `parse` accepts "nan" and "inf"; one such component poisons every sum it enters
            let Some(values) = values.ok().filter(|vs| vs.iter().all(|v| v.is_finite())) else {
                stats.malformed += 1;
                continue;
            };

            let model = model.get_or_insert_with(|| Self::new(values.len()));
            if values.is_empty() || values.len() != model.dimension {
                stats.malformed += 1;
                continue;
            }
            if model.vectors.contains_key(term) {
                stats.duplicates += 1;
                continue;
            }
            model.vectors.insert(term.to_string(), values);
            stats.loaded += 1;
        }

        if stats.malformed > 0 {
            warn!(malformed = stats.malformed, "Skipped malformed vector lines");
        }
        Ok((model.unwrap_or_default(), stats))
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl TermVectorSource for InMemoryVectors {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn has_term(&self, term: &str) -> bool {
        self.vectors.contains_key(term)
    }

    fn vector(&self, term: &str) -> Result<&[f64], CorpusError> {
        self.vectors
            .get(term)
            .map(Vec::as_slice)
            .ok_or_else(|| CorpusError::TermNotFound(term.to_string()))
    }

    fn vocabulary_size(&self) -> usize {
        self.vectors.len()
    }
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean norm.
pub fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Cosine similarity. Returns 0.0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        return 0.0;
    }
    dot(a, b) / denom
}

/// Mean of in-vocabulary token vectors, accumulated into `buffer`.
///
/// Out-of-vocabulary tokens are skipped and do not count toward the
/// denominator. Returns the number of tokens averaged; when that is zero the
/// buffer holds all zeros. The buffer is reused between calls so a worker
/// allocates it once.
pub fn average_into<'t, M, I>(model: &M, tokens: I, buffer: &mut Vec<f64>) -> usize
where
    M: TermVectorSource + ?Sized,
    I: IntoIterator<Item = &'t str>,
{
    buffer.clear();
    buffer.resize(model.dimension(), 0.0);

    let mut count = 0usize;
    for token in tokens {
        let Ok(vector) = model.vector(token) else {
            continue;
        };
        for (acc, x) in buffer.iter_mut().zip(vector) {
            *acc += x;
        }
        count += 1;
    }

    if count > 0 {
        let n = count as f64;
        for acc in buffer.iter_mut() {
            *acc /= n;
        }
    }
    count
}
