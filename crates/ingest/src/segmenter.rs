use unicode_segmentation::UnicodeSegmentation;

use crate::segment::Segment;

/// Per-segment limit of the toxicity endpoint
pub const DEFAULT_MAX_BYTES: usize = 1000;

pub struct SegmenterConfig {
    pub max_bytes: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Pack whole sentences into segments of at most `max_bytes` UTF-8 bytes.
    ///
    /// A sentence is never split; one longer than the limit becomes a
    /// segment of its own.
    pub fn segment_text(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut buffer = String::new();

        for sentence in self.split_sentences(text) {
            // +1 for the joining space
            let joined_len = if buffer.is_empty() {
                sentence.len()
            } else {
                buffer.len() + 1 + sentence.len()
            };

            if joined_len <= self.config.max_bytes {
                if !buffer.is_empty() {
                    buffer.push(' ');
                }
                buffer.push_str(sentence);
                continue;
            }

            // Flush buffer, start a new one with this sentence
            if !buffer.is_empty() {
                segments.push(Segment::new(std::mem::take(&mut buffer)));
            }
            buffer.push_str(sentence);
        }

        if !buffer.is_empty() {
            segments.push(Segment::new(buffer));
        }

        segments
    }

    fn split_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_sentence_bounds()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(SegmenterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_short_text_is_one_segment() {
        let segmenter = Segmenter::default();
        let segments = segmenter.segment_text("The patient is stable. Vitals are normal.");

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "The patient is stable. Vitals are normal.");
    }

    #[test]
    fn test_empty_text_has_no_segments() {
        let segmenter = Segmenter::default();
        assert!(segmenter.segment_text("").is_empty());
        assert!(segmenter.segment_text("   \n\n ").is_empty());
    }

    #[test]
    fn test_segments_respect_byte_limit() {
        let segmenter = Segmenter::new(SegmenterConfig { max_bytes: 60 });
        let text = "First sentence is here. Second one follows it. \
                    A third sentence arrives. Fourth and final sentence.";
        let segments = segmenter.segment_text(text);

        assert!(segments.len() > 1);
        for segment in &segments {
            assert!(segment.byte_len() <= 60, "segment too long: {:?}", segment.text);
        }
        let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(without_whitespace(&joined), without_whitespace(text));
    }

    #[test]
    fn test_oversized_sentence_stands_alone() {
        let segmenter = Segmenter::new(SegmenterConfig { max_bytes: 30 });
        let long = "This single sentence is much longer than thirty bytes.";
        let text = format!("Short one. {} Tail.", long);
        let segments = segmenter.segment_text(&text);

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text, "Short one.");
        assert_eq!(segments[1].text, long);
        assert_eq!(segments[2].text, "Tail.");
    }

    #[test]
    fn test_limit_counts_bytes_not_chars() {
        // 21 chars but 27 bytes once joined
        let segmenter = Segmenter::new(SegmenterConfig { max_bytes: 24 });
        let text = "Café élevé. Été café.";
        let segments = segmenter.segment_text(text);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Café élevé.");
        assert_eq!(segments[1].text, "Été café.");
    }

    #[test]
    fn test_reproduces_input_across_many_sentences() {
        let segmenter = Segmenter::default();
        let sentence = "Patients over sixty were monitored weekly for changes in blood pressure. ";
        let text = sentence.repeat(60);
        let segments = segmenter.segment_text(&text);

        assert!(segments.len() >= 4);
        assert!(segments.iter().all(|s| s.byte_len() <= DEFAULT_MAX_BYTES));
        let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(without_whitespace(&joined), without_whitespace(&text));
    }

    #[test]
    fn test_identical_text_has_identical_id() {
        let a = Segment::new("same".to_string());
        let b = Segment::new("same".to_string());
        assert_eq!(a.segment_id, b.segment_id);
        assert_eq!(a.segment_id.len(), 16);
    }
}
