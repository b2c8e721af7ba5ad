//! In-memory stand-ins for every service, for tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::comprehend::{
    ClassLabel, DocumentClassifier, PiiEntity, Sentiment, SentimentResult, SentimentScore,
    TextAnalysis, ToxicityResult,
};
use crate::error::{ServiceError, ServiceResult};
use crate::functions::FunctionInvoker;
use crate::identity::{AuthOutcome, IdentityProvider, NEW_PASSWORD_REQUIRED};
use crate::model::{InvokeRequest, ModelEndpoint, ModelResponse, ContentBlock};
use crate::orchestrator::{
    ExecutionDescription, ExecutionHandle, ExecutionStatus, WorkflowOrchestrator,
};

pub fn fake_error(kind: &str) -> ServiceError {
    ServiceError::Api {
        service: "fake",
        status: 500,
        kind: kind.to_string(),
        message: format!("simulated {}", kind),
    }
}

/// Replays a scripted sequence of statuses; the last one repeats.
#[derive(Default)]
pub struct FakeOrchestrator {
    script: Mutex<VecDeque<ServiceResult<ExecutionDescription>>>,
    fail_start: bool,
    pub started: Mutex<Vec<(String, serde_json::Value)>>,
    pub describe_calls: AtomicUsize,
}

impl FakeOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn then_status(self, status: ExecutionStatus) -> Self {
        self.push(Ok(ExecutionDescription {
            status,
            output: None,
        }))
    }

    pub fn then_output(self, output: &str) -> Self {
        self.push(Ok(ExecutionDescription {
            status: ExecutionStatus::Succeeded,
            output: Some(output.to_string()),
        }))
    }

    pub fn then_error(self) -> Self {
        self.push(Err(fake_error("ExecutionDoesNotExist")))
    }

    fn push(self, step: ServiceResult<ExecutionDescription>) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    pub fn describe_count(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkflowOrchestrator for FakeOrchestrator {
    async fn start_execution(
        &self,
        workflow_id: &str,
        input: &serde_json::Value,
    ) -> ServiceResult<ExecutionHandle> {
        if self.fail_start {
            return Err(fake_error("StateMachineDoesNotExist"));
        }
        let mut started = self.started.lock().unwrap();
        started.push((workflow_id.to_string(), input.clone()));
        Ok(ExecutionHandle::new(format!("{}:execution-{}", workflow_id, started.len())))
    }

    async fn describe_execution(
        &self,
        _handle: &ExecutionHandle,
    ) -> ServiceResult<ExecutionDescription> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        match script.len() {
            0 => Ok(ExecutionDescription {
                status: ExecutionStatus::Running,
                output: None,
            }),
            1 => match script.front() {
                Some(Ok(desc)) => Ok(desc.clone()),
                _ => Err(fake_error("ExecutionDoesNotExist")),
            },
            _ => script.pop_front().unwrap_or_else(|| Err(fake_error("Empty"))),
        }
    }
}

/// Answers every prompt with the same text, or fails.
pub struct FakeModel {
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
    pub guardrails: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            prompts: Mutex::new(Vec::new()),
            guardrails: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
            guardrails: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ModelEndpoint for FakeModel {
    async fn invoke(&self, request: &InvokeRequest<'_>) -> ServiceResult<ModelResponse> {
        self.prompts.lock().unwrap().push(request.prompt.to_string());
        self.guardrails
            .lock()
            .unwrap()
            .push(request.guardrail.id.clone());

        match &self.reply {
            Some(text) => Ok(ModelResponse {
                content: vec![ContentBlock {
                    block_type: Some("text".to_string()),
                    text: Some(text.clone()),
                }],
                stop_reason: Some("end_turn".to_string()),
            }),
            None => Err(fake_error("ThrottlingException")),
        }
    }
}

struct FakeUser {
    password: String,
    must_reset: bool,
    groups: Vec<String>,
}

/// User directory with optional forced password reset.
#[derive(Default)]
pub struct FakeIdentity {
    users: Mutex<HashMap<String, FakeUser>>,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, username: &str, password: &str, groups: &[&str]) -> Self {
        self.insert(username, password, false, groups)
    }

    pub fn with_reset_user(self, username: &str, password: &str, groups: &[&str]) -> Self {
        self.insert(username, password, true, groups)
    }

    fn insert(self, username: &str, password: &str, must_reset: bool, groups: &[&str]) -> Self {
        self.users.lock().unwrap().insert(
            username.to_string(),
            FakeUser {
                password: password.to_string(),
                must_reset,
                groups: groups.iter().map(|g| g.to_string()).collect(),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn authenticate(&self, username: &str, password: &str) -> ServiceResult<AuthOutcome> {
        let users = self.users.lock().unwrap();
        match users.get(username) {
            Some(user) if user.password == password => {
                if user.must_reset {
                    Ok(AuthOutcome::Challenge {
                        name: NEW_PASSWORD_REQUIRED.to_string(),
                        session: format!("session-{}", username),
                    })
                } else {
                    Ok(AuthOutcome::Authenticated)
                }
            }
            _ => Err(fake_error("NotAuthorizedException")),
        }
    }

    async fn respond_to_new_password(
        &self,
        session: &str,
        username: &str,
        new_password: &str,
    ) -> ServiceResult<AuthOutcome> {
        if session != format!("session-{}", username) || new_password.len() < 8 {
            return Err(fake_error("InvalidPasswordException"));
        }
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(username)
            .ok_or_else(|| fake_error("UserNotFoundException"))?;
        user.password = new_password.to_string();
        user.must_reset = false;
        Ok(AuthOutcome::Authenticated)
    }

    async fn list_groups(&self, username: &str) -> ServiceResult<Vec<String>> {
        let users = self.users.lock().unwrap();
        users
            .get(username)
            .map(|u| u.groups.clone())
            .ok_or_else(|| fake_error("UserNotFoundException"))
    }
}

/// Comprehend-like analysis driven by substring rules.
pub struct FakeTextAnalysis {
    sentiment: SentimentResult,
    /// (category, trigger word): a segment containing the word scores 0.9
    toxic_words: Vec<(String, String)>,
    /// (PII type, literal text)
    pii: Vec<(String, String)>,
    fail_toxicity_at: Option<usize>,
    fail_sentiment: bool,
    pub toxicity_calls: AtomicUsize,
}

impl Default for FakeTextAnalysis {
    fn default() -> Self {
        Self {
            sentiment: SentimentResult {
                sentiment: Sentiment::Neutral,
                sentiment_score: SentimentScore {
                    positive: 0.1,
                    negative: 0.05,
                    neutral: 0.8,
                    mixed: 0.05,
                },
            },
            toxic_words: Vec::new(),
            pii: Vec::new(),
            fail_toxicity_at: None,
            fail_sentiment: false,
            toxicity_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeTextAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sentiment(mut self, sentiment: SentimentResult) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn with_toxic_word(mut self, category: &str, word: &str) -> Self {
        self.toxic_words.push((category.to_string(), word.to_string()));
        self
    }

    pub fn with_pii(mut self, pii_type: &str, literal: &str) -> Self {
        self.pii.push((pii_type.to_string(), literal.to_string()));
        self
    }

    /// Fail the n-th (zero-based) toxicity call
    pub fn failing_toxicity_at(mut self, call: usize) -> Self {
        self.fail_toxicity_at = Some(call);
        self
    }

    pub fn failing_sentiment(mut self) -> Self {
        self.fail_sentiment = true;
        self
    }

    fn score_segment(&self, segment: &str) -> ToxicityResult {
        let labels: Vec<ClassLabel> = self
            .toxic_words
            .iter()
            .map(|(category, word)| ClassLabel {
                name: category.clone(),
                score: if segment.contains(word.as_str()) { 0.9 } else { 0.01 },
            })
            .collect();
        let toxicity = labels.iter().map(|l| l.score).fold(0.01, f64::max);
        ToxicityResult { labels, toxicity }
    }
}

#[async_trait]
impl TextAnalysis for FakeTextAnalysis {
    async fn detect_sentiment(&self, _text: &str) -> ServiceResult<SentimentResult> {
        if self.fail_sentiment {
            return Err(fake_error("TextSizeLimitExceededException"));
        }
        Ok(self.sentiment.clone())
    }

    async fn detect_toxic_content(&self, segments: &[String]) -> ServiceResult<Vec<ToxicityResult>> {
        let call = self.toxicity_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_toxicity_at == Some(call) {
            return Err(fake_error("ThrottlingException"));
        }
        Ok(segments.iter().map(|s| self.score_segment(s)).collect())
    }

    async fn detect_pii_entities(&self, text: &str) -> ServiceResult<Vec<PiiEntity>> {
        let mut entities = Vec::new();
        for (pii_type, literal) in &self.pii {
            for (byte_start, _) in text.match_indices(literal.as_str()) {
                let begin = text[..byte_start].chars().count();
                entities.push(PiiEntity {
                    entity_type: pii_type.clone(),
                    score: 0.99,
                    begin_offset: begin,
                    end_offset: begin + literal.chars().count(),
                });
            }
        }
        Ok(entities)
    }
}

/// Fixed labels per endpoint.
#[derive(Default)]
pub struct FakeClassifier {
    endpoints: HashMap<String, Vec<ClassLabel>>,
    failing: bool,
}

impl FakeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_labels(mut self, endpoint_arn: &str, labels: &[(&str, f64)]) -> Self {
        self.endpoints.insert(
            endpoint_arn.to_string(),
            labels
                .iter()
                .map(|(name, score)| ClassLabel {
                    name: name.to_string(),
                    score: *score,
                })
                .collect(),
        );
        self
    }
}

#[async_trait]
impl DocumentClassifier for FakeClassifier {
    async fn classify_document(
        &self,
        _text: &str,
        endpoint_arn: &str,
    ) -> ServiceResult<Vec<ClassLabel>> {
        if self.failing {
            return Err(fake_error("ResourceUnavailableException"));
        }
        Ok(self.endpoints.get(endpoint_arn).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeFunctions {
    failing: bool,
    pub calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl FakeFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl FunctionInvoker for FakeFunctions {
    async fn invoke(
        &self,
        function_name: &str,
        payload: &serde_json::Value,
    ) -> ServiceResult<serde_json::Value> {
        self.calls
            .lock()
            .unwrap()
            .push((function_name.to_string(), payload.clone()));
        if self.failing {
            return Err(fake_error("ResourceNotFoundException"));
        }
        Ok(serde_json::json!({"statusCode": 200}))
    }
}
