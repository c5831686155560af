//! Inter-vehicle collision penalty
//!
//! Soft hinge penalty on the squared separation of vehicle pairs:
//!
//! ```text
//! hᵢⱼ = d_MAV - ‖pᵢ - pⱼ‖²
//! Jᵢⱼ = q_bet · max(0, hᵢⱼ)
//! ```
//!
//! The hinge is zero whenever vehicles are farther apart than `√d_MAV` and
//! grows linearly in `h` inside. It is kept non-smooth at `h = 0`.
//!
//! Pair terms are combined according to [`PairAggregation`].

use nalgebra::Vector3;
use swarm_core::{Expr, SymVec3};

use crate::config::{CostWeights, PairAggregation};

/// Collision penalty for one time step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionPenalty {
    /// Penalty weight (q_bet)
    pub weight: f64,
    /// Squared-distance threshold (d_MAV) [m²]
    pub threshold: f64,
    pub aggregation: PairAggregation,
}

impl CollisionPenalty {
    pub fn new(weight: f64, threshold: f64, aggregation: PairAggregation) -> Self {
        Self {
            weight,
            threshold,
            aggregation,
        }
    }

    pub fn from_weights(weights: &CostWeights, aggregation: PairAggregation) -> Self {
        Self::new(weights.q_bet, weights.d_mav, aggregation)
    }

    /// Symbolic penalty for the given vehicle positions
    ///
    /// The vehicle count must already satisfy
    /// [`PairAggregation::check_vehicle_count`].
    pub fn symbolic(&self, positions: &[SymVec3]) -> Expr {
        let gap = |i: usize, j: usize| self.threshold - positions[i].distance_squared(&positions[j]);
        let total = self.aggregate(
            positions.len(),
            gap,
            |g: Expr| g.hinge(),
            |a: Expr, b: Expr| a.max(&b),
            |a: Expr, b: Expr| a + b,
        );
        total * self.weight
    }

    /// Numeric counterpart of [`CollisionPenalty::symbolic`]
    pub fn numeric(&self, positions: &[Vector3<f64>]) -> f64 {
        let gap = |i: usize, j: usize| self.threshold - (positions[i] - positions[j]).norm_squared();
        let total = self.aggregate(
            positions.len(),
            gap,
            |g: f64| g.max(0.0),
            f64::max,
            |a: f64, b: f64| a + b,
        );
        self.weight * total
    }

    /// Combine per-pair gaps; `max` picks the closest neighbour, `sum` accumulates
    fn aggregate<T, G, H, M, S>(&self, n: usize, gap: G, hinge: H, max: M, sum: S) -> T
    where
        T: Clone + From<f64>,
        G: Fn(usize, usize) -> T,
        H: Fn(T) -> T,
        M: Fn(T, T) -> T,
        S: Fn(T, T) -> T,
    {
        let zero = || T::from(0.0);
        match self.aggregation {
            PairAggregation::LeadingPair => {
                if n < 2 {
                    return zero();
                }
                hinge(gap(0, 1))
            }
            PairAggregation::AllPairs => {
                let mut total = zero();
                for i in 0..n {
                    for j in (i + 1)..n {
                        total = sum(total, hinge(gap(i, j)));
                    }
                }
                total
            }
            PairAggregation::NearestNeighbor => {
                let gaps = pair_table(n, &gap);
                let mut total = zero();
                for i in 0..n {
                    // max_j max(0, hᵢⱼ) = max(0, max_j hᵢⱼ)
                    let closest = (0..n)
                        .filter(|&j| j != i)
                        .fold(zero(), |acc, j| max(acc, gaps[i.min(j)][i.max(j)].clone()));
                    total = sum(total, closest);
                }
                total
            }
        }
    }
}

/// Upper-triangular table of pair gaps, `table[i][j]` valid for `i < j`
fn pair_table<T, G>(n: usize, gap: &G) -> Vec<Vec<T>>
where
    T: From<f64>,
    G: Fn(usize, usize) -> T,
{
    (0..n)
        .map(|i| {
            (0..n)
                .map(|j| if j > i { gap(i, j) } else { T::from(0.0) })
                .collect()
        })
        .collect()
}

/// Separation of one vehicle pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairSeparation {
    pub first: usize,
    pub second: usize,
    /// ‖pᵢ - pⱼ‖² [m²]
    pub distance_squared: f64,
    /// d_MAV - ‖pᵢ - pⱼ‖² (positive = inside the threshold)
    pub gap: f64,
}

impl PairSeparation {
    pub fn name(&self) -> String {
        format!("collision_{}_{}", self.first, self.second)
    }
}

/// Result of checking all vehicle pairs against the threshold
#[derive(Debug, Clone, Default)]
pub struct SeparationReport {
    pub pairs: Vec<PairSeparation>,
    /// Whether no pair is inside the threshold
    pub all_clear: bool,
    /// Largest positive gap (0 if all clear)
    pub max_violation: f64,
}

impl SeparationReport {
    /// Check every unordered pair of `positions`
    pub fn evaluate(positions: &[Vector3<f64>], threshold: f64) -> Self {
        let mut report = Self {
            pairs: Vec::new(),
            all_clear: true,
            max_violation: 0.0,
        };
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let distance_squared = (positions[i] - positions[j]).norm_squared();
                report.add(PairSeparation {
                    first: i,
                    second: j,
                    distance_squared,
                    gap: threshold - distance_squared,
                });
            }
        }
        report
    }

    fn add(&mut self, pair: PairSeparation) {
        if pair.gap > 0.0 {
            self.all_clear = false;
            self.max_violation = self.max_violation.max(pair.gap);
        }
        self.pairs.push(pair);
    }

    /// Smallest squared separation over all pairs
    pub fn min_distance_squared(&self) -> Option<f64> {
        self.pairs
            .iter()
            .map(|p| p.distance_squared)
            .min_by(|a, b| a.total_cmp(b))
    }
}
