use std::collections::{HashMap, HashSet};

/// Zero out failed models and renormalize the remainder to sum to 1,
/// redistributing the failed weight proportionally among the survivors.
///
/// Weight state transitions: configured -> failed-zeroed -> renormalized.
/// If nothing usable remains (all failed, or all weights zero), fall back
/// to equal weighting across every configured model so the ensemble keeps
/// a defined weight vector.
pub fn renormalize(
    weights: &HashMap<String, f64>,
    failed: &HashSet<String>,
) -> HashMap<String, f64> {
    let mut out: HashMap<String, f64> = weights
        .iter()
        .map(|(name, weight)| {
            let weight = if failed.contains(name) {
                0.0
            } else {
                weight.max(0.0)
            };
            (name.clone(), weight)
        })
        .collect();

    let total: f64 = out.values().sum();
    if total <= 0.0 {
        let equal = 1.0 / weights.len().max(1) as f64;
        for weight in out.values_mut() {
            *weight = equal;
        }
    } else {
        for weight in out.values_mut() {
            *weight /= total;
        }
    }
    out
}
