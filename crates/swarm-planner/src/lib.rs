//! Swarm Motion Planner
//!
//! Builds the symbolic trajectory optimization problem for a swarm of aerial
//! vehicles: each vehicle tracks a reference position while pairs of vehicles
//! are pushed apart by a soft collision penalty.
//!
//! # Architecture
//!
//! The cost model is unrolled over a fixed horizon of `N` steps:
//!
//! ```text
//! minimize    J(u; z0) = Σ (q_x ‖p - r‖² + q_u ‖u‖²) + Σ q_bet max(0, d_MAV - ‖pᵢ - pⱼ‖²)
//!                        + q_n ‖p_N - r‖²
//! subject to  p_{t+1} = p_t + ts · u_t
//!             u_min ≤ u ≤ u_max
//! ```
//!
//! and handed to a solver generator together with the solver/build settings.
//!
//! # Components
//!
//! - [`config`]: Dimensions, weights, bounds, solver/build settings
//! - [`layout`]: Decision and parameter vector indexing
//! - [`model`]: Cost model builder
//! - [`collision`]: Pairwise hinge penalty and separation checks
//! - [`rollout`]: Numeric simulation of a control sequence
//! - [`problem`]: Hand-off to the solver generator
//! - [`scenarios`]: Preset swarm scenarios

pub mod collision;
pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod problem;
pub mod rollout;
pub mod scenarios;

// Re-exports
pub use config::{PairAggregation, PlannerConfig};
pub use error::{ConfigError, ExportError, ModelError};
pub use layout::ProblemLayout;
pub use model::{build_cost_model, BoxBounds, CostBreakdown, CostModel, CostModelBuilder};
pub use problem::{JsonExporter, OptimizerProblem, SolverGenerator};
pub use rollout::Rollout;
pub use scenarios::Scenario;
