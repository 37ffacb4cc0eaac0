// Scoring subsystem: vector models, lexica, the Cheetah engine and the
// model-bias report.

pub mod bias;
pub mod cheetah;
pub mod lexicon;
pub mod traits;
pub mod vectors;

pub use cheetah::{CheetahScorer, NoSignal, ScoreStats, ScorerOptions};
pub use traits::{TermLexicon, TermVectorSource};
