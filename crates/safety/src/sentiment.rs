use cloud::{Notices, Sentiment, SentimentResult, TextAnalysis};
use serde::Serialize;
use tracing::warn;

/// Allowed drift of the four scores from 1.0
pub const SCORE_SUM_TOLERANCE: f64 = 0.01;

/// Sentiment label and scores, formatted for display
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SentimentReport {
    pub sentiment: Sentiment,
    pub positive: String,
    pub negative: String,
    pub neutral: String,
    pub mixed: String,
}

impl SentimentReport {
    pub fn from_result(result: &SentimentResult) -> Self {
        let scores = &result.sentiment_score;
        let total = scores.total();
        if (total - 1.0).abs() > SCORE_SUM_TOLERANCE {
            warn!(total, "Sentiment scores do not sum to 1.0");
        }

        Self {
            sentiment: result.sentiment,
            positive: as_percent(scores.positive),
            negative: as_percent(scores.negative),
            neutral: as_percent(scores.neutral),
            mixed: as_percent(scores.mixed),
        }
    }
}

/// `0.1234` -> `"12.34%"`
pub fn as_percent(score: f64) -> String {
    format!("{:.2}%", score * 100.0)
}

pub async fn analyze_sentiment(
    analysis: &dyn TextAnalysis,
    text: &str,
    notices: &mut Notices,
) -> Option<SentimentReport> {
    match analysis.detect_sentiment(text).await {
        Ok(result) => Some(SentimentReport::from_result(&result)),
        Err(e) => {
            notices.failure("Error performing sentiment analysis", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloud::SentimentScore;
    use cloud::fakes::FakeTextAnalysis;

    #[test]
    fn test_percent_formatting() {
        assert_eq!(as_percent(0.1234), "12.34%");
        assert_eq!(as_percent(1.0), "100.00%");
        assert_eq!(as_percent(0.0), "0.00%");
        assert_eq!(as_percent(0.00456), "0.46%");
    }

    #[test]
    fn test_report_keeps_label() {
        let result = SentimentResult {
            sentiment: Sentiment::Positive,
            sentiment_score: SentimentScore {
                positive: 0.9,
                negative: 0.02,
                neutral: 0.07,
                mixed: 0.01,
            },
        };
        let report = SentimentReport::from_result(&result);

        assert_eq!(report.sentiment, Sentiment::Positive);
        assert_eq!(report.positive, "90.00%");
        assert_eq!(report.mixed, "1.00%");
    }

    #[tokio::test]
    async fn test_analyze_sentiment_with_fake() {
        let analysis = FakeTextAnalysis::new();
        let mut notices = Notices::new();

        let report = analyze_sentiment(&analysis, "Patients are recovering.", &mut notices)
            .await
            .unwrap();

        assert_eq!(report.sentiment, Sentiment::Neutral);
        assert_eq!(report.neutral, "80.00%");
        assert!(notices.is_empty());
    }

    #[tokio::test]
    async fn test_failure_becomes_notice() {
        let analysis = FakeTextAnalysis::new().failing_sentiment();
        let mut notices = Notices::new();

        let report = analyze_sentiment(&analysis, "text", &mut notices).await;

        assert!(report.is_none());
        assert!(notices.has_errors());
    }
}
