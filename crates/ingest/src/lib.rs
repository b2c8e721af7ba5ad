pub mod catalog;
pub mod segment;
pub mod segmenter;

pub use catalog::ArtifactCatalog;
pub use segment::Segment;
pub use segmenter::{Segmenter, SegmenterConfig, DEFAULT_MAX_BYTES};

/// Split text into toxicity-sized segments using the default byte limit
pub fn segment_text(text: &str) -> Vec<Segment> {
    Segmenter::default().segment_text(text)
}
