use std::{hint::black_box, time::Instant};

use ndarray::Array2;

/// The side of the square matrices multiplied on each unit of work.
const SIDE: usize = 64;

/// Measures the throughput of this machine.
///
/// Each unit of work is a product of two `SIDE x SIDE` matrices, the same workload has to be
/// given to every worker for the scores to be comparable.
///
/// # Arguments
/// * `workload` - The amount of units of work to run.
///
/// # Returns
/// The units of work completed per second.
pub fn score(workload: usize) -> f64 {
    let a = Array2::from_shape_fn((SIDE, SIDE), |(i, j)| ((i * SIDE + j) % 7) as f32 / 7.0);
    let b = a.t().to_owned();

    let start = Instant::now();
    for _ in 0..workload {
        black_box(black_box(&a).dot(black_box(&b)));
    }

    let elapsed = start.elapsed().as_secs_f64().max(f64::EPSILON);
    workload as f64 / elapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_positive_and_finite() {
        let s = score(10);
        assert!(s.is_finite() && s > 0.0);
    }

    #[test]
    fn empty_workload_scores_zero() {
        assert_eq!(score(0), 0.0);
    }
}
