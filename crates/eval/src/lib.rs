pub mod fairness;

pub use fairness::{
    equal_opportunity_difference, FairnessInput, FairnessReport, GroupRates, GroundTruth,
    SIMULATED_TRUE_LABELS,
};
