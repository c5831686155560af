//! Cost Model Validation Tests
//!
//! Checks the swarm cost model against hand-computed values and against the
//! numeric rollout:
//! 1. Vector dimensions, layout and size limits
//! 2. Zero cost at rest on target
//! 3. Collision hinge values (full threshold, boundary)
//! 4. Weight monotonicity
//! 5. Hand-computed tracking scenario
//! 6. Symbolic / numeric agreement and gradients

use approx::assert_relative_eq;
use nalgebra::Vector3;

use swarm_planner::config::{PairAggregation, PlannerConfig};
use swarm_planner::layout::ProblemLayout;
use swarm_planner::problem::{JsonExporter, OptimizerProblem, SolverGenerator};
use swarm_planner::rollout::Rollout;
use swarm_planner::scenarios::{self, Scenario};
use swarm_planner::{build_cost_model, ModelError};

fn config_with(num_steps: usize, weights: [f64; 5]) -> PlannerConfig {
    let mut config = PlannerConfig::default();
    config.horizon.num_steps = num_steps;
    let [q_x, q_u, q_n, q_bet, d_mav] = weights;
    config.weights.q_x = q_x;
    config.weights.q_u = q_u;
    config.weights.q_n = q_n;
    config.weights.q_bet = q_bet;
    config.weights.d_mav = d_mav;
    config
}

fn pack(config: &PlannerConfig, initial: &[Vector3<f64>], reference: &[Vector3<f64>]) -> Vec<f64> {
    ProblemLayout::from_config(config)
        .pack_parameters(initial, reference)
        .unwrap()
}

/// Deterministic pseudo-random controls in [-1, 1]
fn wobble(len: usize, seed: f64) -> Vec<f64> {
    (0..len).map(|k| ((k as f64 + 1.0) * seed).sin()).collect()
}

mod dimension_tests {
    use super::*;

    #[test]
    fn test_vector_lengths_for_two_vehicles() {
        for n in [1, 2, 7, 20] {
            let config = config_with(n, [1.0, 1.0, 1.0, 1.0, 1.0]);
            let model = build_cost_model(&config).unwrap();
            assert_eq!(model.decision().len(), 3 * n * 2);
            assert_eq!(model.parameters().len(), 2 * 3 * 2);
            assert_eq!(model.bounds().min.len(), model.decision().len());
            assert_eq!(model.bounds().max.len(), model.decision().len());
        }
    }

    #[test]
    fn test_default_bounds_saturate_at_one() {
        let model = build_cost_model(&PlannerConfig::default()).unwrap();
        assert!(model.bounds().min.iter().all(|&v| v == -1.0));
        assert!(model.bounds().max.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_decision_index_addresses_vehicle_step_channel() {
        // Only u[vehicle 1, step 2, channel 1] is non-zero: vehicle 1 moves in y
        let mut config = config_with(4, [0.0, 0.0, 1.0, 0.0, 1.0]);
        config.horizon.time_step = 1.0;
        let layout = ProblemLayout::from_config(&config);
        let model = build_cost_model(&config).unwrap();

        let z0 = pack(&config, &[Vector3::zeros(); 2], &[Vector3::zeros(); 2]);
        let mut u = vec![0.0; layout.decision_len()];
        u[layout.control_index(1, 2, 1)] = 0.5;

        // terminal: vehicle 1 ends at (0, 0.5, 0)
        assert_relative_eq!(model.evaluate(&u, &z0).unwrap(), 0.25, epsilon = 1e-12);
    }
}

mod size_tests {
    use super::*;

    #[test]
    fn test_long_horizon_builds_and_drops() {
        let config = config_with(50_000, [1.0, 1.0, 1.0, 1.0, 0.25]);
        let model = build_cost_model(&config).unwrap();
        assert_eq!(model.decision().len(), 3 * 50_000 * 2);
        assert_eq!(model.bounds().len(), model.decision().len());
        drop(model);
    }

    #[test]
    fn test_overflowing_horizon_fails_before_building() {
        let mut config = PlannerConfig::default();
        config.horizon.num_steps = usize::MAX / 4;
        assert_eq!(
            build_cost_model(&config).unwrap_err(),
            ModelError::ProblemTooLarge {
                what: "decision vector"
            }
        );
        assert!(matches!(
            Rollout::simulate(&config, &[], &[]),
            Err(ModelError::ProblemTooLarge { .. })
        ));
    }

    #[test]
    fn test_overflowing_swarm_fails_before_building() {
        let mut config = PlannerConfig::default();
        config.dimensions.num_vehicles = usize::MAX / 3;
        config.collision.aggregation = PairAggregation::AllPairs;
        assert!(matches!(
            build_cost_model(&config),
            Err(ModelError::ProblemTooLarge { .. })
        ));
    }
}

mod cost_value_tests {
    use super::*;

    #[test]
    fn test_zero_cost_at_rest_on_target() {
        let config = config_with(10, [3.0, 2.0, 7.0, 5.0, 0.25]);
        let positions = [Vector3::new(0.0, 0.0, 1.0), Vector3::new(2.0, 0.0, 1.0)];
        let z0 = pack(&config, &positions, &positions);
        let model = build_cost_model(&config).unwrap();
        let u = vec![0.0; model.decision().len()];

        assert_eq!(model.evaluate(&u, &z0).unwrap(), 0.0);
    }

    #[test]
    fn test_coincident_vehicles_first_step_penalty() {
        let config = config_with(1, [0.0, 0.0, 0.0, 1.0, 4.0]);
        let p = Vector3::new(1.0, -2.0, 3.0);
        let z0 = pack(&config, &[p, p], &[p, p]);
        let model = build_cost_model(&config).unwrap();
        let u = vec![0.0; model.decision().len()];

        let terms = model.evaluate_terms(&u, &z0).unwrap();
        assert_eq!(terms.collision, 4.0);
        assert_eq!(model.evaluate(&u, &z0).unwrap(), 4.0);
    }

    #[test]
    fn test_penalty_vanishes_on_threshold_boundary() {
        // squared separation exactly d_MAV = 4
        let config = config_with(3, [0.0, 0.0, 0.0, 10.0, 4.0]);
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(0.0, 2.0, 0.0);
        let z0 = pack(&config, &[a, b], &[a, b]);
        let model = build_cost_model(&config).unwrap();
        let u = vec![0.0; model.decision().len()];

        assert_eq!(model.evaluate_terms(&u, &z0).unwrap().collision, 0.0);
    }

    #[test]
    fn test_tracking_offset_scenario_costs_three() {
        let scenario = scenarios::tracking_offset();
        let z0 = scenario.parameters().unwrap();
        let u = scenario.zero_controls();
        let model = build_cost_model(&scenario.config).unwrap();

        // two stage steps + one terminal term, vehicle 0 only
        assert_eq!(model.evaluate(&u, &z0).unwrap(), 3.0);

        let terms = model.evaluate_terms(&u, &z0).unwrap();
        assert_eq!(terms.tracking, 2.0);
        assert_eq!(terms.terminal, 1.0);
        assert_eq!(terms.effort, 0.0);
        assert_eq!(terms.collision, 0.0);
    }

    #[test]
    fn test_increasing_tracking_weight_increases_cost() {
        let initial = [Vector3::new(0.0, 0.0, 0.0), Vector3::new(3.0, 0.0, 0.0)];
        let reference = [Vector3::new(0.5, 0.5, 0.0), Vector3::new(3.0, 0.0, 0.0)];
        let mut previous = f64::NEG_INFINITY;

        for q_x in [0.0, 0.5, 1.0, 2.0, 10.0] {
            let config = config_with(5, [q_x, 1.0, 1.0, 1.0, 0.25]);
            let z0 = pack(&config, &initial, &reference);
            let model = build_cost_model(&config).unwrap();
            let u = wobble(model.decision().len(), 0.37);

            let cost = model.evaluate(&u, &z0).unwrap();
            assert!(cost > previous, "q_x = {}: {} <= {}", q_x, cost, previous);
            previous = cost;
        }
    }

    #[test]
    fn test_stage_cost_uses_position_before_update() {
        // One step, vehicle 0 starts on target and moves 1 m away
        let mut config = config_with(1, [1.0, 0.0, 0.0, 0.0, 1.0]);
        config.horizon.time_step = 1.0;
        let z0 = pack(
            &config,
            &[Vector3::zeros(), Vector3::new(9.0, 0.0, 0.0)],
            &[Vector3::zeros(), Vector3::new(9.0, 0.0, 0.0)],
        );
        let model = build_cost_model(&config).unwrap();
        let mut u = vec![0.0; model.decision().len()];
        u[0] = 1.0;

        assert_eq!(model.evaluate(&u, &z0).unwrap(), 0.0);
    }

    #[test]
    fn test_collision_uses_position_after_update() {
        // Vehicles start 3 m apart and close to 1 m in one step
        let mut config = config_with(1, [0.0, 0.0, 0.0, 1.0, 4.0]);
        config.horizon.time_step = 1.0;
        let z0 = pack(
            &config,
            &[Vector3::zeros(), Vector3::new(3.0, 0.0, 0.0)],
            &[Vector3::zeros(), Vector3::new(3.0, 0.0, 0.0)],
        );
        let model = build_cost_model(&config).unwrap();
        let layout = *model.layout();
        let mut u = vec![0.0; layout.decision_len()];
        u[layout.control_index(0, 0, 0)] = 1.0;
        u[layout.control_index(1, 0, 0)] = -1.0;

        // 4 - 1
        assert_relative_eq!(model.evaluate(&u, &z0).unwrap(), 3.0, epsilon = 1e-12);
    }
}

mod aggregation_tests {
    use super::*;

    #[test]
    fn test_leading_pair_requires_two_vehicles() {
        let mut config = PlannerConfig::default();
        config.collision.aggregation = PairAggregation::LeadingPair;
        for count in [0, 1, 3, 4] {
            config.dimensions.num_vehicles = count;
            assert_eq!(
                build_cost_model(&config).unwrap_err(),
                ModelError::UnsupportedVehicleCount {
                    count,
                    aggregation: PairAggregation::LeadingPair
                }
            );
        }
    }

    #[test]
    fn test_aggregations_agree_for_two_vehicles() {
        let scenario = scenarios::two_vehicle_swap();
        let z0 = scenario.parameters().unwrap();
        let u = wobble(scenario.layout().decision_len(), 0.91);

        let cost_with = |aggregation| {
            let mut config = scenario.config.clone();
            config.collision.aggregation = aggregation;
            build_cost_model(&config).unwrap().evaluate_terms(&u, &z0).unwrap()
        };
        let leading = cost_with(PairAggregation::LeadingPair);
        let all = cost_with(PairAggregation::AllPairs);
        let nearest = cost_with(PairAggregation::NearestNeighbor);

        assert_relative_eq!(leading.collision, all.collision, epsilon = 1e-12);
        // both vehicles see the same single neighbour
        assert_relative_eq!(nearest.collision, 2.0 * all.collision, epsilon = 1e-12);
    }

    #[test]
    fn test_four_vehicles_build_with_pairwise_terms() {
        let scenario = scenarios::four_vehicle_square();
        let model = build_cost_model(&scenario.config).unwrap();
        assert_eq!(model.decision().len(), 3 * 30 * 4);
        assert_eq!(model.parameters().len(), 2 * 3 * 4);

        // Everyone drifts towards the centre during the first step
        let layout = scenario.layout();
        let mut u = vec![0.0; layout.decision_len()];
        for (i, p) in scenario.initial_positions.iter().enumerate() {
            for k in 0..2 {
                u[layout.control_index(i, 0, k)] = -0.5 * p[k];
            }
        }
        let z0 = scenario.parameters().unwrap();
        let terms = model.evaluate_terms(&u, &z0).unwrap();
        assert_eq!(terms.collision, 0.0);
        assert!(model.bounds().contains(&u));
    }
}

mod consistency_tests {
    use super::*;

    #[test]
    fn test_symbolic_matches_rollout_for_all_scenarios() {
        for scenario in Scenario::all() {
            let z0 = scenario.parameters().unwrap();
            let model = build_cost_model(&scenario.config).unwrap();
            let mut u = wobble(model.decision().len(), 1.3);
            model.bounds().project(&mut u);

            let symbolic = model.evaluate_terms(&u, &z0).unwrap();
            let rollout = Rollout::simulate(&scenario.config, &u, &z0).unwrap();

            assert_relative_eq!(symbolic.tracking, rollout.terms.tracking, max_relative = 1e-10);
            assert_relative_eq!(symbolic.effort, rollout.terms.effort, max_relative = 1e-10);
            assert_relative_eq!(
                symbolic.collision,
                rollout.terms.collision,
                epsilon = 1e-10,
                max_relative = 1e-10
            );
            assert_relative_eq!(symbolic.terminal, rollout.terms.terminal, max_relative = 1e-10);
            assert_relative_eq!(
                model.evaluate(&u, &z0).unwrap(),
                rollout.total_cost(),
                max_relative = 1e-10
            );
        }
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let scenario = scenarios::two_vehicle_swap();
        let mut config = scenario.config.clone();
        config.horizon.num_steps = 5;
        // large threshold keeps the hinge active and away from its kink
        config.weights.d_mav = 100.0;
        let z0 = pack(&config, &scenario.initial_positions, &scenario.reference_positions);
        let model = build_cost_model(&config).unwrap();
        let tape = model.compile().unwrap();

        let u = wobble(model.decision().len(), 0.53);
        let mut grad = vec![0.0; u.len()];
        let value = tape.gradient(&u, &z0, &mut grad).unwrap();
        assert_relative_eq!(value, model.evaluate(&u, &z0).unwrap(), max_relative = 1e-12);

        let h = 1e-6;
        for k in 0..u.len() {
            let mut up = u.clone();
            let mut down = u.clone();
            up[k] += h;
            down[k] -= h;
            let fd = (tape.eval(&up, &z0).unwrap() - tape.eval(&down, &z0).unwrap()) / (2.0 * h);
            assert_relative_eq!(grad[k], fd, epsilon = 1e-4, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_builds_are_independent_across_threads() {
        let handles: Vec<_> = (1..=4)
            .map(|n| {
                std::thread::spawn(move || {
                    let config = config_with(n, [1.0, 1.0, 1.0, 1.0, 1.0]);
                    build_cost_model(&config).unwrap().decision().len()
                })
            })
            .collect();
        let lengths: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(lengths, vec![6, 12, 18, 24]);
    }
}

mod export_tests {
    use super::*;

    #[test]
    fn test_json_export_writes_problem_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PlannerConfig::default();
        config.horizon.num_steps = 3;
        config.build.build_directory = dir.path().to_path_buf();
        config.meta.optimizer_name = "navigation_multiple".to_string();

        let problem = OptimizerProblem::from_config(&config).unwrap();
        let path = JsonExporter::default().generate(&problem).unwrap();
        assert_eq!(path, dir.path().join("navigation_multiple").join("problem.json"));

        let text = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["layout"]["num_steps"], 3);
        assert_eq!(json["bounds"]["min"].as_array().unwrap().len(), 18);
        assert_eq!(json["cost"]["num_decision"], 18);
        assert_eq!(json["solver"]["tolerance"], 1e-5);
        assert_eq!(json["build"]["tcp_interface"]["port"], 8333);
        assert!(!json["cost"]["instructions"].as_array().unwrap().is_empty());
    }
}
