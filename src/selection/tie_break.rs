//! Random tie-breaking
//!
//! Whenever several items share the best score the winner is drawn
//! uniformly with the run's generator, never by index order.

use rand::Rng;

/// Arg-max over `(id, score)` pairs with uniform random tie-break
///
/// NaN scores are skipped. Returns `None` if nothing is left.
pub fn argmax_random_tie<R, I>(scored: I, rng: &mut R) -> Option<u32>
where
    R: Rng + ?Sized,
    I: IntoIterator<Item = (u32, f64)>,
{
    let mut best: Option<(u32, f64)> = None;
    let mut ties = 0u32;

    for (id, score) in scored {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score < top => {}
            Some((_, top)) if score == top => {
                ties += 1;
                // reservoir sampling over the tied ids
                if rng.gen_range(0..ties) == 0 {
                    best = Some((id, score));
                }
            }
            _ => {
                best = Some((id, score));
                ties = 1;
            }
        }
    }

    best.map(|(id, _)| id)
}

/// Uniform draw from a candidate list
pub fn uniform_choice<R: Rng + ?Sized>(candidates: &[u32], rng: &mut R) -> Option<u32> {
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.gen_range(0..candidates.len())])
    }
}
