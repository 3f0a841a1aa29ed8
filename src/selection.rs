use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Exponent applied to min-max normalised scores. With this value the best of
/// two distinct scores is drawn roughly 3000 times as often as the worst.
pub const DEFAULT_SCALING_FACTOR: f64 = 8.0;

/// Turns scores into a probability simplex favouring high scorers:
/// normalise to [0, 1], exponentiate with `scaling`, divide by the total.
/// Equal scores get a uniform distribution.
pub fn exponential_weights(scores: &[i64], scaling: f64) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let min = scores.iter().copied().min().unwrap_or(0) as f64;
    let max = scores.iter().copied().max().unwrap_or(0) as f64;

    let raw: Vec<f64> = if max == min {
        vec![1.0; scores.len()]
    } else {
        scores
            .iter()
            .map(|score| {
                let normalized = (*score as f64 - min) / (max - min);
                (scaling * normalized).exp()
            })
            .collect()
    };

    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|weight| weight / total).collect()
}

/// Draws one index proportionally to `weights`. `None` when there is nothing
/// drawable (empty, all zero, negative or non-finite weights).
pub fn choose<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let dist = WeightedIndex::new(weights).ok()?;
    Some(dist.sample(rng))
}
