// Pipelines over whole collections: the filter stages, then scoring and
// series assembly.

pub mod analysis;
pub mod filter;
