pub mod classifier;
pub mod moderation;
pub mod pipeline;
pub mod redact;
pub mod sentiment;
pub mod toxicity;

pub use classifier::{label_names, top_label};
pub use moderation::{
    ModerationChain, ModerationConfig, ModerationError, ModerationFilter, ModerationViolation,
    PiiFilter, PiiFilterConfig, PromptSafetyConfig, PromptSafetyFilter,
};
pub use pipeline::{admit, Screening, ScreeningFailure, ScreeningPipeline, Stage};
pub use redact::redact_card_numbers;
pub use sentiment::{analyze_sentiment, SentimentReport};
pub use toxicity::{ToxicityAnalyzer, ToxicityCategory, ToxicityRow, ToxicityTable};
