// Cheetah: algebraic sentiment bias scoring for news headline corpora.
//
// This is the library root. Each module corresponds to a major subsystem:
// the corpus data model, the filter/analysis pipelines, the scoring engine,
// time binning, and output.

pub mod config;
pub mod corpus;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod timeline;
