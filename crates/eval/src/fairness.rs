use serde::Serialize;

/// Placeholder labels used when the caller has no ground truth
pub const SIMULATED_TRUE_LABELS: [u8; 4] = [0, 1, 0, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroundTruth {
    Supplied,
    Simulated,
}

/// Predictions, true labels and protected attribute for a batch of examples.
/// Examples past the shortest of the three sequences are ignored.
pub struct FairnessInput<'a, P, A> {
    pub predictions: &'a [P],
    pub true_labels: &'a [u8],
    pub protected: &'a [A],
    pub privileged: A,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupRates {
    pub size: usize,
    pub true_positive_rate: f64,
    pub selection_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FairnessReport {
    pub privileged: GroupRates,
    pub unprivileged: GroupRates,
    #[serde(rename = "Equal Opportunity Difference")]
    pub equal_opportunity_difference: f64,
    pub ground_truth: GroundTruth,
}

#[derive(Default)]
struct Confusion {
    tp: usize,
    fp: usize,
    tn: usize,
    fn_: usize,
}

impl Confusion {
    fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.tp += 1,
            (true, false) => self.fp += 1,
            (false, false) => self.tn += 1,
            (false, true) => self.fn_ += 1,
        }
    }

    fn size(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    fn rates(&self) -> GroupRates {
        let positives = self.tp + self.fn_;
        let size = self.size();
        GroupRates {
            size,
            true_positive_rate: if positives > 0 {
                self.tp as f64 / positives as f64
            } else {
                0.0
            },
            selection_rate: if size > 0 {
                (self.tp + self.fp) as f64 / size as f64
            } else {
                0.0
            },
        }
    }
}

impl<'a, P, A: PartialEq> FairnessInput<'a, P, A> {
    /// Group rates for a prediction deemed favourable by `is_favorable`
    pub fn evaluate(
        &self,
        is_favorable: impl Fn(&P) -> bool,
        ground_truth: GroundTruth,
    ) -> FairnessReport {
        let mut privileged = Confusion::default();
        let mut unprivileged = Confusion::default();

        for ((prediction, &label), attribute) in self
            .predictions
            .iter()
            .zip(self.true_labels)
            .zip(self.protected)
        {
            let group = if *attribute == self.privileged {
                &mut privileged
            } else {
                &mut unprivileged
            };
            group.record(is_favorable(prediction), label == 1);
        }

        let privileged = privileged.rates();
        let unprivileged = unprivileged.rates();
        let report = FairnessReport {
            privileged,
            unprivileged,
            equal_opportunity_difference: equal_opportunity_difference(&privileged, &unprivileged),
            ground_truth,
        };

        tracing::debug!(
            privileged = privileged.size,
            unprivileged = unprivileged.size,
            eod = report.equal_opportunity_difference,
            "Computed fairness metrics"
        );
        report
    }
}

/// TPR(unprivileged) - TPR(privileged)
pub fn equal_opportunity_difference(privileged: &GroupRates, unprivileged: &GroupRates) -> f64 {
    unprivileged.true_positive_rate - privileged.true_positive_rate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_per_group() {
        // privileged = "W"
        let predictions = ["A", "A", "B", "A", "B", "A"];
        let labels = [1, 1, 1, 0, 1, 0];
        let groups = ["W", "W", "W", "X", "X", "X"];
        let input = FairnessInput {
            predictions: &predictions,
            true_labels: &labels,
            protected: &groups,
            privileged: "W",
        };

        let report = input.evaluate(|p| *p == "A", GroundTruth::Supplied);

        // W: tp=2 fn=1 -> tpr 2/3, selected 2/3
        assert!((report.privileged.true_positive_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((report.privileged.selection_rate - 2.0 / 3.0).abs() < 1e-9);
        // X: tp=0 fn=1 fp=2 -> tpr 0, selected 2/3
        assert_eq!(report.unprivileged.true_positive_rate, 0.0);
        assert!((report.unprivileged.selection_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((report.equal_opportunity_difference + 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_shortest_sequence_wins() {
        let predictions = ["A", "A", "A", "A", "A"];
        let labels = [1, 1];
        let groups = [0, 1, 0, 1, 0];
        let input = FairnessInput {
            predictions: &predictions,
            true_labels: &labels,
            protected: &groups,
            privileged: 0,
        };

        let report = input.evaluate(|p| *p == "A", GroundTruth::Supplied);

        assert_eq!(report.privileged.size + report.unprivileged.size, 2);
    }

    #[test]
    fn test_everyone_privileged_yields_zero_for_empty_group() {
        // Every example carries the selected group, as with simulated labels
        let predictions = ["Cardiology", "Oncology", "Neurology", "Urology"];
        let groups = [2, 2, 2, 2];
        let input = FairnessInput {
            predictions: &predictions,
            true_labels: &SIMULATED_TRUE_LABELS,
            protected: &groups,
            privileged: 2,
        };

        let report = input.evaluate(|p| *p == "Cardiology", GroundTruth::Simulated);

        assert_eq!(report.unprivileged.size, 0);
        assert_eq!(report.unprivileged.selection_rate, 0.0);
        // Cardiology predicted for a 0 label; no positives hit
        assert_eq!(report.privileged.true_positive_rate, 0.0);
        assert_eq!(report.equal_opportunity_difference, 0.0);
    }

    #[test]
    fn test_report_serialization() {
        let rates = GroupRates {
            size: 1,
            true_positive_rate: 1.0,
            selection_rate: 1.0,
        };
        let report = FairnessReport {
            privileged: rates,
            unprivileged: rates,
            equal_opportunity_difference: 0.0,
            ground_truth: GroundTruth::Simulated,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["Equal Opportunity Difference"], 0.0);
        assert_eq!(json["ground_truth"], "simulated");
    }
}
