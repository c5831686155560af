//! Preset swarm scenarios
//!
//! Each scenario pairs a configuration with initial and reference positions,
//! ready to be packed into a parameter vector.

use nalgebra::Vector3;

use crate::config::{PairAggregation, PlannerConfig};
use crate::error::ModelError;
use crate::layout::ProblemLayout;

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    pub config: PlannerConfig,
    pub initial_positions: Vec<Vector3<f64>>,
    pub reference_positions: Vec<Vector3<f64>>,
}

impl Scenario {
    /// Names accepted by [`Scenario::by_name`]
    pub const NAMES: [&'static str; 4] = [
        "two_vehicle_swap",
        "head_on",
        "tracking_offset",
        "four_vehicle_square",
    ];

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "two_vehicle_swap" => Some(two_vehicle_swap()),
            "head_on" => Some(head_on()),
            "tracking_offset" => Some(tracking_offset()),
            "four_vehicle_square" => Some(four_vehicle_square()),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        Self::NAMES.iter().filter_map(|name| Self::by_name(name)).collect()
    }

    pub fn layout(&self) -> ProblemLayout {
        ProblemLayout::from_config(&self.config)
    }

    /// Parameter vector `z0` for this scenario
    pub fn parameters(&self) -> Result<Vec<f64>, ModelError> {
        self.layout()
            .pack_parameters(&self.initial_positions, &self.reference_positions)
    }

    /// All-zero decision vector
    pub fn zero_controls(&self) -> Vec<f64> {
        vec![0.0; self.layout().decision_len()]
    }
}

/// Two vehicles exchange positions along the x axis
pub fn two_vehicle_swap() -> Scenario {
    let a = Vector3::new(-1.0, 0.0, 1.0);
    let b = Vector3::new(1.0, 0.0, 1.0);
    Scenario {
        name: "two_vehicle_swap",
        description: "Two vehicles swap positions; straight-line paths cross",
        config: PlannerConfig::default(),
        initial_positions: vec![a, b],
        reference_positions: vec![b, a],
    }
}

/// Two vehicles hovering closer than the collision threshold
pub fn head_on() -> Scenario {
    Scenario {
        name: "head_on",
        description: "Two vehicles start 0.2 m apart and hold position",
        config: PlannerConfig::default(),
        initial_positions: vec![Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.2, 0.0, 1.0)],
        reference_positions: vec![Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.2, 0.0, 1.0)],
    }
}

/// One vehicle 1 m off its reference, the other on it; cost 3 at zero input
pub fn tracking_offset() -> Scenario {
    let mut config = PlannerConfig::default();
    config.horizon.num_steps = 2;
    config.horizon.time_step = 1.0;
    config.weights.q_x = 1.0;
    config.weights.q_u = 0.0;
    config.weights.q_n = 1.0;
    config.weights.q_bet = 0.0;
    Scenario {
        name: "tracking_offset",
        description: "Vehicle 0 one metre from its reference, vehicle 1 on target",
        config,
        initial_positions: vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(5.0, 0.0, 0.0)],
        reference_positions: vec![Vector3::new(1.0, 0.0, 0.0), Vector3::new(5.0, 0.0, 0.0)],
    }
}

/// Four vehicles on a square move to the diagonally opposite corner
pub fn four_vehicle_square() -> Scenario {
    let mut config = PlannerConfig::default();
    config.dimensions.num_vehicles = 4;
    config.collision.aggregation = PairAggregation::AllPairs;
    config.horizon.num_steps = 30;
    config.meta.optimizer_name = "navigation_multiple_4_drones".to_string();

    let corners = vec![
        Vector3::new(1.0, 1.0, 1.5),
        Vector3::new(-1.0, 1.0, 1.5),
        Vector3::new(-1.0, -1.0, 1.5),
        Vector3::new(1.0, -1.0, 1.5),
    ];
    let opposite = (0..4).map(|i| corners[(i + 2) % 4]).collect();
    Scenario {
        name: "four_vehicle_square",
        description: "Four vehicles cross the centre of a 2 m square",
        config,
        initial_positions: corners,
        reference_positions: opposite,
    }
}
