pub mod aggregator;
pub mod consolidation;
pub mod dedup;
pub mod events;
pub mod extractor;
pub mod handlers;
pub mod normalize;
pub mod pipeline;
pub mod service;
