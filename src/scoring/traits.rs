// Capability traits for the scorer's two collaborators.
//
// The scoring engine never loads anything itself. It is handed a ready
// term-vector model and one or two term sets, and only needs the narrow
// interfaces below. Both are object-safe, and the scorer takes them as
// `?Sized` generics, so `&dyn` handles work as well as concrete types.

use crate::error::CorpusError;

/// A lookup from term to a fixed-dimension embedding vector.
///
/// Implementations must be safe to share read-only across worker tasks;
/// partitioned scoring hands the same instance to every worker.
pub trait TermVectorSource: Send + Sync {
    /// Length of every vector this source returns.
    fn dimension(&self) -> usize;

    /// Whether `term` has a vector.
    fn has_term(&self, term: &str) -> bool;

    /// The vector for `term`. Fails with `TermNotFound` when `has_term` is false.
    fn vector(&self, term: &str) -> Result<&[f64], CorpusError>;

    /// Number of terms in the vocabulary.
    fn vocabulary_size(&self) -> usize;
}

/// Anything that behaves like a flat set of terms.
pub trait TermLexicon {
    /// Iterate the terms in a stable order.
    fn terms(&self) -> Box<dyn Iterator<Item = &str> + '_>;

    fn contains(&self, term: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
