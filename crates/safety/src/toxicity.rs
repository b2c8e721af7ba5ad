use cloud::{Notices, TextAnalysis, ToxicityResult};
use ingest::Segmenter;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

pub const SEGMENT_COLUMN: &str = "SEGMENT";
pub const TOXICITY_COLUMN: &str = "TOXICITY";
pub const MISSING_SCORE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToxicityCategory {
    Profanity,
    HateSpeech,
    Insult,
    Graphic,
    HarassmentOrAbuse,
    Sexual,
    ViolenceOrThreat,
}

impl ToxicityCategory {
    pub const ALL: [ToxicityCategory; 7] = [
        ToxicityCategory::Profanity,
        ToxicityCategory::HateSpeech,
        ToxicityCategory::Insult,
        ToxicityCategory::Graphic,
        ToxicityCategory::HarassmentOrAbuse,
        ToxicityCategory::Sexual,
        ToxicityCategory::ViolenceOrThreat,
    ];

    /// Columns shown unless the full set is requested
    pub const DISPLAYED: [ToxicityCategory; 4] = [
        ToxicityCategory::Profanity,
        ToxicityCategory::HateSpeech,
        ToxicityCategory::Insult,
        ToxicityCategory::ViolenceOrThreat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToxicityCategory::Profanity => "PROFANITY",
            ToxicityCategory::HateSpeech => "HATE_SPEECH",
            ToxicityCategory::Insult => "INSULT",
            ToxicityCategory::Graphic => "GRAPHIC",
            ToxicityCategory::HarassmentOrAbuse => "HARASSMENT_OR_ABUSE",
            ToxicityCategory::Sexual => "SEXUAL",
            ToxicityCategory::ViolenceOrThreat => "VIOLENCE_OR_THREAT",
        }
    }
}

impl fmt::Display for ToxicityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToxicityRow {
    pub segment: String,
    /// One cell per category column, then the overall toxicity
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToxicityTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<ToxicityRow>,
}

impl ToxicityTable {
    fn new(categories: &[ToxicityCategory]) -> Self {
        let mut columns = vec![SEGMENT_COLUMN];
        columns.extend(categories.iter().map(|c| c.as_str()));
        columns.push(TOXICITY_COLUMN);
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    fn push(&mut self, segment: String, categories: &[ToxicityCategory], result: &ToxicityResult) {
        let mut cells: Vec<String> = categories
            .iter()
            .map(|category| {
                result
                    .labels
                    .iter()
                    .find(|label| label.name == category.as_str())
                    .map(|label| format_score(label.score))
                    .unwrap_or_else(|| MISSING_SCORE.to_string())
            })
            .collect();
        cells.push(format_score(result.toxicity));

        self.rows.push(ToxicityRow { segment, cells });
    }
}

fn format_score(score: f64) -> String {
    format!("{:.4}", score)
}

/// Scores a text segment by segment.
pub struct ToxicityAnalyzer<'a> {
    analysis: &'a dyn TextAnalysis,
    segmenter: Segmenter,
    categories: Vec<ToxicityCategory>,
}

impl<'a> ToxicityAnalyzer<'a> {
    pub fn new(analysis: &'a dyn TextAnalysis) -> Self {
        Self {
            analysis,
            segmenter: Segmenter::default(),
            categories: ToxicityCategory::DISPLAYED.to_vec(),
        }
    }

    pub fn with_segmenter(mut self, segmenter: Segmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn with_all_categories(mut self) -> Self {
        self.categories = ToxicityCategory::ALL.to_vec();
        self
    }

    /// One call per segment. The first failure discards the whole table.
    pub async fn analyze(&self, text: &str, notices: &mut Notices) -> Option<ToxicityTable> {
        let segments = self.segmenter.segment_text(text);
        let mut table = ToxicityTable::new(&self.categories);

        for segment in segments {
            debug!(segment_id = %segment.segment_id, bytes = segment.byte_len(), "Scoring segment");
            let request = std::slice::from_ref(&segment.text);
            let results = match self.analysis.detect_toxic_content(request).await {
                Ok(results) => results,
                Err(e) => {
                    notices.failure("Error detecting toxicity", e);
                    return None;
                }
            };

            let Some(result) = results.first() else {
                notices.error("Error detecting toxicity: no result returned for a segment");
                return None;
            };
            table.push(segment.text, &self.categories, result);
        }

        info!(rows = table.rows.len(), "Toxicity analysis complete");
        Some(table)
    }
}
