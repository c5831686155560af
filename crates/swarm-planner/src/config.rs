//! Planner configuration
//!
//! Dimensions, cost weights and bounds for the swarm cost model, plus the
//! solver/build settings that are passed through untouched to the solver
//! generator.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ModelError};
use crate::layout::ProblemLayout;

/// Main planner configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Horizon discretization
    pub horizon: HorizonConfig,
    /// Vehicle count and per-vehicle channel counts
    pub dimensions: SwarmDimensions,
    /// Cost function weights
    pub weights: CostWeights,
    /// Inter-vehicle collision term
    pub collision: CollisionConfig,
    /// Control input box bounds
    pub bounds: InputBounds,
    /// Solver settings (not interpreted by the model builder)
    pub solver: SolverConfig,
    /// Build settings (not interpreted by the model builder)
    pub build: BuildConfig,
    /// Generated optimizer metadata
    pub meta: OptimizerMeta,
}

impl PlannerConfig {
    /// Check every range the cost model relies on
    pub fn validate(&self) -> Result<(), ModelError> {
        self.horizon.validate()?;
        self.dimensions.validate()?;
        self.weights.validate()?;
        self.bounds.validate()?;
        ProblemLayout::from_config(self).check_size()?;
        self.collision
            .aggregation
            .check_vehicle_count(self.dimensions.num_vehicles)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Horizon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizonConfig {
    /// Number of control steps (N)
    pub num_steps: usize,
    /// Euler integration step [s]
    pub time_step: f64,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            num_steps: 20,
            time_step: 0.1,
        }
    }
}

impl HorizonConfig {
    /// Total horizon time [s]
    pub fn horizon_time(&self) -> f64 {
        self.num_steps as f64 * self.time_step
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.num_steps < 1 {
            return Err(ModelError::InvalidHorizon {
                num_steps: self.num_steps,
            });
        }
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(ModelError::InvalidTimeStep(self.time_step));
        }
        Ok(())
    }
}

/// Swarm size and per-vehicle vector sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmDimensions {
    /// Number of vehicles (N_MAV)
    pub num_vehicles: usize,
    /// State channels per vehicle (nx); the first 3 are position
    pub state_dim: usize,
    /// Control channels per vehicle (nu); the first 3 are velocity
    pub control_dim: usize,
}

impl Default for SwarmDimensions {
    fn default() -> Self {
        Self {
            num_vehicles: 2,
            state_dim: 3,
            control_dim: 3,
        }
    }
}

impl SwarmDimensions {
    /// Position and velocity channels every vehicle must carry
    pub const MIN_CHANNELS: usize = 3;

    fn validate(&self) -> Result<(), ModelError> {
        if self.state_dim < Self::MIN_CHANNELS {
            return Err(ModelError::InvalidDimension {
                name: "state",
                value: self.state_dim,
                min: Self::MIN_CHANNELS,
            });
        }
        if self.control_dim < Self::MIN_CHANNELS {
            return Err(ModelError::InvalidDimension {
                name: "control",
                value: self.control_dim,
                min: Self::MIN_CHANNELS,
            });
        }
        Ok(())
    }
}

/// Cost function weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    /// Running position tracking weight (qX)
    #[serde(alias = "qX")]
    pub q_x: f64,
    /// Control effort weight (qU)
    #[serde(alias = "qU")]
    pub q_u: f64,
    /// Terminal position tracking weight (qN)
    #[serde(alias = "qN")]
    pub q_n: f64,
    /// Collision penalty weight (qBet)
    #[serde(alias = "qBet")]
    pub q_bet: f64,
    /// Squared-distance collision threshold (dMAV) [m²]
    #[serde(alias = "dMAV")]
    pub d_mav: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            q_x: 10.0,
            q_u: 1.0,
            // Terminal cost ~10x stage cost
            q_n: 100.0,
            q_bet: 50.0,
            // 0.5 m separation
            d_mav: 0.25,
        }
    }
}

impl CostWeights {
    fn validate(&self) -> Result<(), ModelError> {
        for (name, value) in [
            ("q_x", self.q_x),
            ("q_u", self.q_u),
            ("q_n", self.q_n),
            ("q_bet", self.q_bet),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ModelError::InvalidWeight { name, value });
            }
        }
        if !(self.d_mav.is_finite() && self.d_mav > 0.0) {
            return Err(ModelError::InvalidWeight {
                name: "d_mav",
                value: self.d_mav,
            });
        }
        Ok(())
    }
}

/// How pairwise hinge terms are combined across the swarm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairAggregation {
    /// Vehicles 0 and 1 only; requires exactly two vehicles
    #[default]
    LeadingPair,
    /// Sum over every unordered pair
    AllPairs,
    /// Per vehicle, the hinge against its closest neighbour, summed over vehicles
    NearestNeighbor,
}

impl PairAggregation {
    /// Reject vehicle counts this aggregation cannot form pairs for
    pub fn check_vehicle_count(&self, count: usize) -> Result<(), ModelError> {
        let supported = match self {
            PairAggregation::LeadingPair => count == 2,
            PairAggregation::AllPairs | PairAggregation::NearestNeighbor => count >= 2,
        };
        if supported {
            Ok(())
        } else {
            Err(ModelError::UnsupportedVehicleCount {
                count,
                aggregation: *self,
            })
        }
    }
}

impl fmt::Display for PairAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairAggregation::LeadingPair => write!(f, "leading-pair"),
            PairAggregation::AllPairs => write!(f, "all-pairs"),
            PairAggregation::NearestNeighbor => write!(f, "nearest-neighbor"),
        }
    }
}

/// Collision term configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub aggregation: PairAggregation,
}

/// Box bounds applied to every control channel at every step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for InputBounds {
    fn default() -> Self {
        Self { min: -1.0, max: 1.0 }
    }
}

impl InputBounds {
    fn validate(&self) -> Result<(), ModelError> {
        if self.min.is_nan() || self.max.is_nan() || self.min > self.max {
            return Err(ModelError::InvalidBounds {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Convergence tolerance
    pub tolerance: f64,
    /// L-BFGS memory length
    pub lbfgs_memory: usize,
    /// Maximum outer iterations
    pub max_iterations: usize,
    /// Maximum solve time [ms]
    pub max_duration_ms: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-5,
            lbfgs_memory: 10,
            max_iterations: 500,
            max_duration_ms: 5000,
        }
    }
}

/// Build mode of the generated solver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    #[default]
    Debug,
    Release,
}

/// TCP interface of the generated solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpInterfaceConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for TcpInterfaceConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8333,
        }
    }
}

/// Build configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory that receives generated optimizers
    pub build_directory: PathBuf,
    pub build_mode: BuildMode,
    /// `None` builds without a TCP interface
    pub tcp_interface: Option<TcpInterfaceConfig>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            build_directory: PathBuf::from("my_optimizers"),
            build_mode: BuildMode::Debug,
            tcp_interface: Some(TcpInterfaceConfig::default()),
        }
    }
}

/// Generated optimizer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerMeta {
    pub optimizer_name: String,
    pub version: String,
}

impl Default for OptimizerMeta {
    fn default() -> Self {
        Self {
            optimizer_name: "navigation_multiple".to_string(),
            version: "0.0.1".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PlannerConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.horizon.horizon_time() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_invalid_dimensions() {
        let mut config = PlannerConfig::default();
        config.dimensions.state_dim = 2;
        assert_eq!(
            config.validate(),
            Err(ModelError::InvalidDimension {
                name: "state",
                value: 2,
                min: 3
            })
        );

        let mut config = PlannerConfig::default();
        config.dimensions.control_dim = 1;
        assert!(matches!(
            config.validate(),
            Err(ModelError::InvalidDimension { name: "control", .. })
        ));
    }

    #[test]
    fn test_invalid_horizon_and_time_step() {
        let mut config = PlannerConfig::default();
        config.horizon.num_steps = 0;
        assert_eq!(
            config.validate(),
            Err(ModelError::InvalidHorizon { num_steps: 0 })
        );

        let mut config = PlannerConfig::default();
        config.horizon.time_step = 0.0;
        assert!(matches!(config.validate(), Err(ModelError::InvalidTimeStep(_))));

        config.horizon.time_step = f64::NAN;
        assert!(matches!(config.validate(), Err(ModelError::InvalidTimeStep(_))));
    }

    #[test]
    fn test_invalid_weights() {
        let mut config = PlannerConfig::default();
        config.weights.q_u = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ModelError::InvalidWeight { name: "q_u", .. })
        ));

        let mut config = PlannerConfig::default();
        config.weights.d_mav = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ModelError::InvalidWeight { name: "d_mav", .. })
        ));
    }

    #[test]
    fn test_invalid_bounds() {
        let mut config = PlannerConfig::default();
        config.bounds = InputBounds { min: 1.0, max: -1.0 };
        assert!(matches!(config.validate(), Err(ModelError::InvalidBounds { .. })));
    }

    #[test]
    fn test_default_aggregation_requires_two_vehicles() {
        let mut config = PlannerConfig::default();
        assert_eq!(config.collision.aggregation, PairAggregation::LeadingPair);

        config.dimensions.num_vehicles = 3;
        assert_eq!(
            config.validate(),
            Err(ModelError::UnsupportedVehicleCount {
                count: 3,
                aggregation: PairAggregation::LeadingPair
            })
        );

        config.collision.aggregation = PairAggregation::AllPairs;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_horizon_overflowing_vector_length() {
        let mut config = PlannerConfig::default();
        config.horizon.num_steps = usize::MAX / 4;
        assert_eq!(
            config.validate(),
            Err(ModelError::ProblemTooLarge {
                what: "decision vector"
            })
        );

        let mut config = PlannerConfig::default();
        config.dimensions.state_dim = usize::MAX / 2;
        assert_eq!(
            config.validate(),
            Err(ModelError::ProblemTooLarge {
                what: "parameter vector"
            })
        );
    }

    #[test]
    fn test_vehicle_count_per_aggregation() {
        assert!(PairAggregation::LeadingPair.check_vehicle_count(2).is_ok());
        assert!(PairAggregation::LeadingPair.check_vehicle_count(3).is_err());
        assert!(PairAggregation::AllPairs.check_vehicle_count(4).is_ok());
        assert!(PairAggregation::AllPairs.check_vehicle_count(1).is_err());
        assert!(PairAggregation::NearestNeighbor.check_vehicle_count(0).is_err());
    }

    #[test]
    fn test_json_accepts_settings_aliases() {
        let text = r#"{
            "horizon": { "num_steps": 5 },
            "weights": { "qX": 2.0, "qU": 0.5, "qN": 4.0, "qBet": 8.0, "dMAV": 1.0 },
            "collision": { "aggregation": "all_pairs" }
        }"#;
        let config = PlannerConfig::from_json_str(text).unwrap();
        assert_eq!(config.horizon.num_steps, 5);
        assert_eq!(config.horizon.time_step, 0.1);
        assert_eq!(config.weights.q_bet, 8.0);
        assert_eq!(config.collision.aggregation, PairAggregation::AllPairs);
    }

    #[test]
    fn test_json_roundtrip_preserves_config() {
        let config = PlannerConfig::default();
        let text = config.to_json_string().unwrap();
        assert_eq!(PlannerConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn test_json_rejects_invalid_config() {
        let text = r#"{ "dimensions": { "num_vehicles": 1 } }"#;
        assert!(matches!(
            PlannerConfig::from_json_str(text),
            Err(ConfigError::Invalid(ModelError::UnsupportedVehicleCount { count: 1, .. }))
        ));
    }
}
