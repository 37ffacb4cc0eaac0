// Time partitioning of scored headlines and per-bin aggregation.

pub mod bins;
pub mod series;

pub use bins::{bin_headlines, bin_keys, BinGrouping, BinKey, TimeBin};
