// Corpus data model: headlines, topic-partitioned collections, raw record
// adapters and the text normalizer shared with the lexica.

pub mod collection;
pub mod headline;
pub mod normalize;
pub mod records;

pub use collection::{QueryResult, ResultCollection};
pub use headline::{Headline, HeadlineField};
