use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use cloud::{ClassLabel, Notices};
use eval::{FairnessInput, FairnessReport, GroundTruth, SIMULATED_TRUE_LABELS};
use safety::{ModerationChain, Screening, ScreeningPipeline, admit, label_names};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Dashboard, Demo};
use crate::AppState;
use crate::error::{ActionResponse, Outcome};
use crate::metrics::TimedOperation;

const PAGE: &str = include_str!("../../ui/classifier.html");

pub struct ClassifierDashboard;

impl Dashboard for ClassifierDashboard {
    fn demo(&self) -> Demo {
        Demo::MedicalClassifier
    }

    fn body(&self) -> &'static str {
        PAGE
    }

    fn routes(&self) -> Router<AppState> {
        Router::new().route("/screen", post(screen))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceGroup {
    #[default]
    Asian,
    Black,
    White,
    Other,
}

impl RaceGroup {
    /// Numeric code used as the protected attribute
    pub fn code(&self) -> u8 {
        match self {
            RaceGroup::Asian => 0,
            RaceGroup::Black => 1,
            RaceGroup::White => 2,
            RaceGroup::Other => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeGroup {
    Young,
    #[serde(rename = "Middle-aged")]
    MiddleAged,
    Elderly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenderGroup {
    Male,
    Female,
    Other,
}

#[derive(Debug, Deserialize)]
pub struct ScreenRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub consent: bool,
    /// The form preselects the first group
    #[serde(default)]
    pub race_group: RaceGroup,
    pub age_group: Option<AgeGroup>,
    pub gender_group: Option<GenderGroup>,
    /// One 0/1 label per returned classifier label
    pub ground_truth: Option<Vec<u8>>,
}

#[derive(Debug, Serialize)]
pub struct Attributes {
    pub race_group: RaceGroup,
    pub age_group: Option<AgeGroup>,
    pub gender_group: Option<GenderGroup>,
}

#[derive(Debug, Serialize)]
pub struct ScreenResult {
    pub redacted_text: String,
    pub labels: Vec<ClassLabel>,
    pub top_label: ClassLabel,
    pub fairness: FairnessReport,
    pub attributes: Attributes,
}

/// Fairness of the classification with respect to the selected race group.
/// Every label is one example carrying the same protected attribute.
fn fairness(
    screening: &Screening,
    race_group: RaceGroup,
    privileged: RaceGroup,
    ground_truth: Option<&[u8]>,
) -> FairnessReport {
    let (true_labels, source) = match ground_truth {
        Some(labels) => (labels, GroundTruth::Supplied),
        None => (&SIMULATED_TRUE_LABELS[..], GroundTruth::Simulated),
    };
    let predictions = label_names(&screening.labels);
    let protected = vec![race_group.code(); predictions.len()];

    let input = FairnessInput {
        predictions: &predictions,
        true_labels,
        protected: &protected,
        privileged: privileged.code(),
    };
    input.evaluate(|name| *name == screening.top_label.name, source)
}

/// POST /api/medical-classifier/screen
async fn screen(
    State(state): State<AppState>,
    Json(request): Json<ScreenRequest>,
) -> ActionResponse<ScreenResult> {
    let timer = TimedOperation::start();
    let mut notices = Notices::new();

    if !admit(&request.text, request.consent, &mut notices) {
        return ActionResponse::failed(Outcome::MissingInput, notices);
    }

    let config = &state.config.classifier;
    let moderation = ModerationChain::from_config(
        &config.moderation,
        &state.config.cloud.region,
        state.clients.text.clone(),
        state.clients.classifier.clone(),
    );
    let pipeline = ScreeningPipeline::new(
        moderation,
        state.clients.classifier.clone(),
        config.endpoint_arn.clone(),
        state.clients.functions.clone(),
    )
    .with_enrichment(config.enrichment_function.clone());

    let screening = match pipeline.screen(&request.text).await {
        Ok(screening) => screening,
        Err(failure) => {
            let outcome = if failure.is_rejection() {
                Outcome::Rejected
            } else {
                Outcome::Error
            };
            notices.error(failure.to_string());
            state
                .metrics
                .record_action(Demo::MedicalClassifier, timer.elapsed(), false);
            return ActionResponse::failed(outcome, notices);
        }
    };
    notices.success("Moderation and redaction successful.");

    let fairness = fairness(
        &screening,
        request.race_group,
        config.privileged_race_group,
        request.ground_truth.as_deref(),
    );
    info!(
        label = %screening.top_label.name,
        eod = fairness.equal_opportunity_difference,
        "Screening complete"
    );

    pipeline.enrich(&screening.redacted_text, &mut notices).await;

    state
        .metrics
        .record_action(Demo::MedicalClassifier, timer.elapsed(), true);

    let Screening {
        redacted_text,
        labels,
        top_label,
    } = screening;
    ActionResponse::ok(
        ScreenResult {
            redacted_text,
            labels,
            top_label,
            fairness,
            attributes: Attributes {
                race_group: request.race_group,
                age_group: request.age_group,
                gender_group: request.gender_group,
            },
        },
        notices,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(name: &str, score: f64) -> ClassLabel {
        ClassLabel {
            name: name.to_string(),
            score,
        }
    }

    fn screening() -> Screening {
        let labels = vec![
            label("Cardiology", 0.7),
            label("Oncology", 0.2),
            label("Neurology", 0.05),
            label("Urology", 0.05),
        ];
        Screening {
            redacted_text: String::new(),
            top_label: labels[0].clone(),
            labels,
        }
    }

    #[test]
    fn test_simulated_ground_truth_is_flagged() {
        let report = fairness(&screening(), RaceGroup::Black, RaceGroup::White, None);

        assert_eq!(report.ground_truth, GroundTruth::Simulated);
        // Everyone is unprivileged; Cardiology (label 0) is the only favourable prediction
        assert_eq!(report.unprivileged.size, 4);
        assert_eq!(report.unprivileged.true_positive_rate, 0.0);
        assert_eq!(report.equal_opportunity_difference, 0.0);
    }

    #[test]
    fn test_supplied_ground_truth() {
        let truth = [1, 0, 0, 0];
        let report = fairness(&screening(), RaceGroup::Asian, RaceGroup::White, Some(&truth));

        assert_eq!(report.ground_truth, GroundTruth::Supplied);
        assert_eq!(report.unprivileged.true_positive_rate, 1.0);
        assert_eq!(report.privileged.true_positive_rate, 0.0);
        assert_eq!(report.equal_opportunity_difference, 1.0);
    }

    #[test]
    fn test_group_names_deserialize() {
        let request: ScreenRequest = serde_json::from_str(
            r#"{"text":"x","consent":true,"race_group":"White","age_group":"Middle-aged"}"#,
        )
        .unwrap();
        assert_eq!(request.race_group.code(), 2);
        assert_eq!(request.age_group, Some(AgeGroup::MiddleAged));
        assert!(request.ground_truth.is_none());
    }

    #[test]
    fn test_race_group_defaults_to_first_option() {
        let request: ScreenRequest =
            serde_json::from_str(r#"{"text":"chest pain","consent":true}"#).unwrap();
        assert_eq!(request.race_group, RaceGroup::Asian);
        assert_eq!(request.age_group, None);
    }
}
