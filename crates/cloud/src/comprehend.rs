use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;
use crate::protocol::JsonProtocolClient;

const LANGUAGE_CODE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SentimentScore {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub mixed: f64,
}

impl SentimentScore {
    pub fn total(&self) -> f64 {
        self.positive + self.negative + self.neutral + self.mixed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    pub sentiment_score: SentimentScore,
}

/// `Name`/`Score` pair, used by toxicity and document classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClassLabel {
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ToxicityResult {
    #[serde(default)]
    pub labels: Vec<ClassLabel>,
    pub toxicity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PiiEntity {
    #[serde(rename = "Type")]
    pub entity_type: String,
    pub score: f64,
    /// Character offsets into the analysed text
    pub begin_offset: usize,
    pub end_offset: usize,
}

#[async_trait]
pub trait TextAnalysis: Send + Sync {
    async fn detect_sentiment(&self, text: &str) -> ServiceResult<SentimentResult>;

    /// One result per input segment, in order
    async fn detect_toxic_content(&self, segments: &[String]) -> ServiceResult<Vec<ToxicityResult>>;

    async fn detect_pii_entities(&self, text: &str) -> ServiceResult<Vec<PiiEntity>>;
}

#[async_trait]
pub trait DocumentClassifier: Send + Sync {
    async fn classify_document(&self, text: &str, endpoint_arn: &str)
    -> ServiceResult<Vec<ClassLabel>>;
}

pub struct ComprehendClient {
    protocol: JsonProtocolClient,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TextRequest<'a> {
    text: &'a str,
    language_code: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SegmentText<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ToxicContentRequest<'a> {
    text_segments: Vec<SegmentText<'a>>,
    language_code: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ToxicContentResponse {
    #[serde(default)]
    result_list: Vec<ToxicityResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PiiEntitiesResponse {
    #[serde(default)]
    entities: Vec<PiiEntity>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ClassifyRequest<'a> {
    text: &'a str,
    endpoint_arn: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ClassifyResponse {
    #[serde(default)]
    classes: Vec<ClassLabel>,
    #[serde(default)]
    labels: Vec<ClassLabel>,
}

impl ClassifyResponse {
    /// Multi-label endpoints answer in `Labels`, multi-class ones in `Classes`
    fn into_labels(self) -> Vec<ClassLabel> {
        if self.labels.is_empty() {
            self.classes
        } else {
            self.labels
        }
    }
}

impl ComprehendClient {
    pub fn new(base_url: String, client: reqwest::Client) -> Self {
        Self {
            protocol: JsonProtocolClient::new(
                base_url,
                "comprehend",
                "Comprehend_20171127",
                "1.1",
                client,
            ),
        }
    }
}

#[async_trait]
impl TextAnalysis for ComprehendClient {
    async fn detect_sentiment(&self, text: &str) -> ServiceResult<SentimentResult> {
        let request = TextRequest {
            text,
            language_code: LANGUAGE_CODE,
        };
        self.protocol.call("DetectSentiment", &request).await
    }

    async fn detect_toxic_content(&self, segments: &[String]) -> ServiceResult<Vec<ToxicityResult>> {
        let request = ToxicContentRequest {
            text_segments: segments.iter().map(|s| SegmentText { text: s }).collect(),
            language_code: LANGUAGE_CODE,
        };
        let response: ToxicContentResponse =
            self.protocol.call("DetectToxicContent", &request).await?;
        Ok(response.result_list)
    }

    async fn detect_pii_entities(&self, text: &str) -> ServiceResult<Vec<PiiEntity>> {
        let request = TextRequest {
            text,
            language_code: LANGUAGE_CODE,
        };
        let response: PiiEntitiesResponse =
            self.protocol.call("DetectPiiEntities", &request).await?;
        Ok(response.entities)
    }
}

#[async_trait]
impl DocumentClassifier for ComprehendClient {
    async fn classify_document(
        &self,
        text: &str,
        endpoint_arn: &str,
    ) -> ServiceResult<Vec<ClassLabel>> {
        let request = ClassifyRequest { text, endpoint_arn };
        let response: ClassifyResponse = self.protocol.call("ClassifyDocument", &request).await?;
        Ok(response.into_labels())
    }
}
