//! Target functions and spaces shared by the benchmarks and integration tests.

use smbo::parameter::Hyperparameter;
use smbo::runner::{RunOutcome, RunRequest};
use smbo::space::ConfigurationSpace;

/// Sphere function: unimodal, convex. Global minimum f(0,...,0) = 0.
pub fn sphere(x: &[f64]) -> f64 {
    x.iter().map(|xi| xi * xi).sum()
}

/// Branin function (2D only). Three global minima with f* ≈ 0.397887.
///
/// # Panics
///
/// Panics if `x` does not have exactly 2 elements.
pub fn branin(x: &[f64]) -> f64 {
    assert!(x.len() == 2, "Branin requires exactly 2 dimensions");
    let (x1, x2) = (x[0], x[1]);
    let pi = std::f64::consts::PI;
    let b = 5.1 / (4.0 * pi * pi);
    let c = 5.0 / pi;
    let t = 1.0 / (8.0 * pi);
    (x2 - b * x1 * x1 + c * x1 - 6.0).powi(2) + 10.0 * (1.0 - t) * x1.cos() + 10.0
}

/// The Branin domain: `x1 ∈ [-5, 10]`, `x2 ∈ [0, 15]`.
pub fn branin_space() -> ConfigurationSpace {
    ConfigurationSpace::new()
        .add("x1", Hyperparameter::float(-5.0, 10.0).unwrap())
        .unwrap()
        .add("x2", Hyperparameter::float(0.0, 15.0).unwrap())
        .unwrap()
}

/// Branin evaluated on a normalized configuration vector.
pub fn branin_runner(request: &RunRequest<'_>) -> smbo::Result<RunOutcome> {
    let v = request.configuration.vector();
    let x = [-5.0 + 15.0 * v[0], 15.0 * v[1]];
    Ok(RunOutcome::success(branin(&x), 0.01))
}

/// Sphere centered at `0.5` on a normalized configuration vector.
pub fn shifted_sphere_runner(request: &RunRequest<'_>) -> smbo::Result<RunOutcome> {
    let x: Vec<f64> = request
        .configuration
        .vector()
        .iter()
        .map(|v| v - 0.5)
        .collect();
    Ok(RunOutcome::success(sphere(&x), 0.01))
}
