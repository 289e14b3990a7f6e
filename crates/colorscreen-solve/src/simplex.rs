use colorscreen_progress::ProgressInfo;

use crate::error::SolveError;
use crate::MAX_ITERATIONS;

/// A problem solvable by unconstrained direct search: an objective
/// function over `num_params()` parameters, a starting point, and a
/// per-parameter convergence tolerance used both as the initial simplex
/// edge length and as the final convergence test.
pub trait SimplexProblem {
    fn num_params(&self) -> usize;
    fn start(&self) -> Vec<f64>;
    fn epsilon(&self) -> Vec<f64>;

    /// Projects `params` back into the feasible region in place. The
    /// default is unconstrained.
    fn constrain(&self, _params: &mut [f64]) {}

    fn objfunc(&self, params: &[f64]) -> f64;
}

/// Result of a successful simplex search: the best parameter vector found
/// and the objective value there.
#[derive(Debug, Clone)]
pub struct SimplexResult {
    pub params: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
}

/// Runs Nelder-Mead simplex search to a local minimum of `problem`,
/// checking `progress` for cancellation once per iteration.
pub fn nelder_mead<P: SimplexProblem>(
    problem: &P,
    progress: &ProgressInfo,
) -> Result<SimplexResult, SolveError> {
    let n = problem.num_params();
    if n == 0 {
        return Err(SolveError::InvalidProblem("zero parameters"));
    }
    let start = problem.start();
    let eps = problem.epsilon();
    if start.len() != n || eps.len() != n {
        return Err(SolveError::InvalidProblem(
            "start/epsilon length mismatch with num_params",
        ));
    }

    let eval = |p: &[f64]| -> f64 {
        let mut p = p.to_vec();
        problem.constrain(&mut p);
        let v = problem.objfunc(&p);
        v
    };

    // Initial simplex: the start point plus n points offset by one
    // epsilon along each axis.
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(start.clone());
    for i in 0..n {
        let mut p = start.clone();
        p[i] += if eps[i].abs() > 0.0 { eps[i] } else { 1.0 };
        simplex.push(p);
    }
    let mut values: Vec<f64> = simplex.iter().map(|p| eval(p)).collect();
    if !values[0].is_finite() {
        return Err(SolveError::InvalidProblem(
            "objective is non-finite at the start point",
        ));
    }

    const ALPHA: f64 = 1.0; // reflection
    const GAMMA: f64 = 2.0; // expansion
    const RHO: f64 = 0.5; // contraction
    const SIGMA: f64 = 0.5; // shrink

    for iter in 0..MAX_ITERATIONS {
        if progress.is_cancelled() {
            return Err(SolveError::Cancelled);
        }

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap());
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        if converged(&simplex, &eps, order[0], worst) {
            return Ok(SimplexResult {
                params: simplex[best].clone(),
                value: values[best],
                iterations: iter,
            });
        }

        // Centroid of all points except the worst.
        let mut centroid = vec![0.0; n];
        for &idx in &order[..n] {
            for d in 0..n {
                centroid[d] += simplex[idx][d];
            }
        }
        for d in 0..n {
            centroid[d] /= n as f64;
        }

        let reflect = combine(&centroid, &simplex[worst], 1.0 + ALPHA, -ALPHA);
        let reflect_val = eval(&reflect);

        if reflect_val < values[best] {
            let expand = combine(&centroid, &simplex[worst], 1.0 + GAMMA, -GAMMA);
            let expand_val = eval(&expand);
            if expand_val < reflect_val {
                simplex[worst] = expand;
                values[worst] = expand_val;
            } else {
                simplex[worst] = reflect;
                values[worst] = reflect_val;
            }
        } else if reflect_val < values[second_worst] {
            simplex[worst] = reflect;
            values[worst] = reflect_val;
        } else {
            let contract = combine(&centroid, &simplex[worst], 1.0 - RHO, RHO);
            let contract_val = eval(&contract);
            if contract_val < values[worst] {
                simplex[worst] = contract;
                values[worst] = contract_val;
            } else {
                for &idx in &order[1..=n] {
                    for d in 0..n {
                        simplex[idx][d] = simplex[best][d]
                            + SIGMA * (simplex[idx][d] - simplex[best][d]);
                    }
                    values[idx] = eval(&simplex[idx]);
                }
            }
        }
    }

    Err(SolveError::NotConverged(MAX_ITERATIONS))
}

fn combine(centroid: &[f64], worst: &[f64], c_scale: f64, w_scale: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(worst.iter())
        .map(|(&c, &w)| c_scale * c + w_scale * w)
        .collect()
}

fn converged(simplex: &[Vec<f64>], eps: &[f64], best: usize, worst: usize) -> bool {
    simplex[best]
        .iter()
        .zip(simplex[worst].iter())
        .zip(eps.iter())
        .all(|((&b, &w), &e)| (b - w).abs() <= e.abs().max(1e-12))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Parabola;
    impl SimplexProblem for Parabola {
        fn num_params(&self) -> usize {
            2
        }
        fn start(&self) -> Vec<f64> {
            vec![5.0, -3.0]
        }
        fn epsilon(&self) -> Vec<f64> {
            vec![1e-6, 1e-6]
        }
        fn objfunc(&self, p: &[f64]) -> f64 {
            (p[0] - 1.0).powi(2) + (p[1] - 2.0).powi(2)
        }
    }

    #[test]
    fn finds_minimum_of_a_parabola() {
        let progress = ProgressInfo::new();
        let result = nelder_mead(&Parabola, &progress).unwrap();
        assert!((result.params[0] - 1.0).abs() < 1e-3);
        assert!((result.params[1] - 2.0).abs() < 1e-3);
    }
}
