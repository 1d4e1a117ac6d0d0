//! Feature schemas of the solver's built-in work estimators

use crate::errors::{PredictorError, Result};
use crate::features::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Built-in work-unit estimators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorKind {
    /// CPU feasibility-jump heuristic
    CpuFj,
    /// Bounds strengthening presolve pass
    BoundsStrengthening,
}

const CPUFJ_FEATURES: [&str; 4] = ["n_vars", "n_cstrs", "total_nnz", "mem_total_mb"];

const BOUNDS_STRENGTHENING_FEATURES: [&str; 5] =
    ["m", "n", "nnz_processed", "nnz", "bounds_changed"];

impl PredictorKind {
    pub const ALL: [PredictorKind; 2] = [PredictorKind::CpuFj, PredictorKind::BoundsStrengthening];

    pub fn name(self) -> &'static str {
        match self {
            PredictorKind::CpuFj => "cpufj",
            PredictorKind::BoundsStrengthening => "bounds_strengthening",
        }
    }

    pub fn feature_names(self) -> &'static [&'static str] {
        match self {
            PredictorKind::CpuFj => &CPUFJ_FEATURES,
            PredictorKind::BoundsStrengthening => &BOUNDS_STRENGTHENING_FEATURES,
        }
    }

    pub fn schema(self) -> FeatureSchema {
        // Static lists are unique and non-empty.
        FeatureSchema::new(self.feature_names().iter().copied())
            .unwrap_or_else(|e| unreachable!("built-in schema {}: {e}", self.name()))
    }
}

impl fmt::Display for PredictorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PredictorKind {
    type Err = PredictorError;

    fn from_str(s: &str) -> Result<Self> {
        PredictorKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| PredictorError::Config(format!("unknown predictor kind '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_schemas() {
        let cpufj = PredictorKind::CpuFj.schema();
        assert_eq!(cpufj.len(), 4);
        assert_eq!(cpufj.index_of("mem_total_mb"), Some(3));

        let bs = PredictorKind::BoundsStrengthening.schema();
        assert_eq!(bs.len(), 5);
        assert_eq!(bs.names()[2], "nnz_processed");
    }

    #[test]
    fn test_name_roundtrip() {
        for kind in PredictorKind::ALL {
            assert_eq!(kind.to_string().parse::<PredictorKind>().unwrap(), kind);
        }
        assert!("dual_simplex".parse::<PredictorKind>().is_err());
    }
}
