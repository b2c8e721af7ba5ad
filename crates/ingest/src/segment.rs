use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Sentence-aligned piece of text, the unit of toxicity scoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: String,
    pub text: String,
}

impl Segment {
    pub fn new(text: String) -> Self {
        // Generate stable segment_id from content
        let segment_id = Self::generate_segment_id(&text);

        Self { segment_id, text }
    }

    fn generate_segment_id(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8]) // First 8 bytes (16 hex chars)
    }

    pub fn byte_len(&self) -> usize {
        self.text.len()
    }
}
