//! Group cardinality and point order, computed without a Schoof-style
//! point-counting algorithm by combining the Hasse interval with the
//! generic Shanks solver from `dlog`: a single point's order is pinned
//! down by trial-dividing a multiple of it located within the Hasse
//! interval, and the group cardinality itself falls out of accumulating
//! the LCM of several sampled points' orders until that accumulator has
//! a unique multiple left inside the interval.

use std::sync::Arc;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::rngs::ThreadRng;

use crate::curve::Curve;
use crate::dlog;
use crate::error::{CryptoError, Result};
use crate::factor;
use crate::group::FiniteAbelianGroup;
use crate::point::Point;

/// A multiple of `point`'s order within `[lo, hi]`, found via a single
/// Shanks search: writing the unknown multiple as `lo + x`, `x` in
/// `[0, hi-lo]` solves `point.scale(x) == (point.scale(lo)).invert()`.
fn multiple_of_order_in_interval(point: &Point, lo: &BigInt, hi: &BigInt) -> Result<BigInt> {
    let width = hi - lo;
    let target = point.scale(lo).invert();
    let x = dlog::shanks(point, &target, &width)?;
    Ok(lo + x)
}

/// Strips factors from a known multiple of `point`'s order until only the
/// exact order remains, using that `(candidate/q) * point == O` iff `q`
/// was not actually needed.
fn exact_order_from_multiple(point: &Point, multiple: &BigInt) -> Result<BigInt> {
    let factors = factor::factorize(multiple)?;
    let mut order = multiple.clone();
    for (q, _) in factors {
        while order.is_multiple_of(&q) {
            let candidate = &order / &q;
            if point.scale(&candidate).is_identity() {
                order = candidate;
            } else {
                break;
            }
        }
    }
    Ok(order)
}

/// The exact order of `point`, found by locating a multiple of it within
/// the Hasse interval and reducing away unneeded prime factors.
fn order_via_hasse_interval(curve: &Arc<Curve>, point: &Point) -> Result<BigInt> {
    let (lo, hi) = curve.hasse_interval();
    let multiple = multiple_of_order_in_interval(point, &lo, &hi)?;
    if multiple.is_zero() {
        // point.scale(lo) was already the identity and x == 0: the point's
        // order divides lo exactly, which exact_order_from_multiple can't
        // reduce further from zero. Fall back to lo itself as the multiple.
        return exact_order_from_multiple(point, &lo);
    }
    exact_order_from_multiple(point, &multiple)
}

/// The smallest multiple `m` of `lcm` with exactly one instance of `m` in
/// `[lo, hi]` — the signal that sampling has pinned down the group order.
fn unique_multiple_in_interval(lcm: &BigInt, lo: &BigInt, hi: &BigInt) -> Option<BigInt> {
    if lcm.is_zero() {
        return None;
    }
    let first = lo.div_ceil(lcm) * lcm;
    if &first > hi {
        return None;
    }
    let second = &first + lcm;
    if &second <= hi {
        None
    } else {
        Some(first)
    }
}

/// Computes `#C` by sampling random points, accumulating the LCM of their
/// orders (each found via `order_via_hasse_interval`), until that
/// accumulator has a unique multiple within the Hasse interval — which
/// must then be `#C` itself.
pub fn compute_cardinality(curve: &Arc<Curve>, max_samples: usize) -> Result<BigInt> {
    let (lo, hi) = curve.hasse_interval();
    let mut lcm = BigInt::one();
    let mut rng: ThreadRng = rand::thread_rng();

    for _ in 0..max_samples {
        let point = curve.pick_point(&mut rng);
        if point.is_identity() {
            continue;
        }
        let order = order_via_hasse_interval(curve, &point)?;
        lcm = lcm.lcm(&order);
        if let Some(n) = unique_multiple_in_interval(&lcm, &lo, &hi) {
            return Ok(n);
        }
    }
    Err(CryptoError::CardinalityNotDetermined)
}

/// All divisors of a factored integer, sorted ascending, produced by
/// walking the Cartesian product of exponent vectors and sorting the
/// resulting values — this differs from a lexicographic-by-exponent walk
/// for highly composite `n`, but ascending-by-value is what
/// termination-after-two-probes on a prime-order group actually requires.
fn divisors_ascending(factors: &[(BigInt, u32)]) -> Vec<BigInt> {
    let mut divisors = vec![BigInt::one()];
    for (p, e) in factors {
        let mut next = Vec::with_capacity(divisors.len() * (*e as usize + 1));
        for d in &divisors {
            let mut power = d.clone();
            for _ in 0..=*e {
                next.push(power.clone());
                power *= p;
            }
        }
        divisors = next;
    }
    divisors.sort();
    divisors
}

/// The exact order of `point`: the smallest divisor `d` of `#C` with
/// `d * point == O`, found by factoring the (cached) cardinality and
/// linear-scanning its divisors in ascending order.
pub fn compute_order(curve: &Arc<Curve>, point: &Point) -> Result<BigInt> {
    if point.is_identity() {
        return Ok(BigInt::one());
    }
    let n = curve.cardinality()?;
    let factors = factor::factorize(&n)?;
    for d in divisors_ascending(&factors) {
        if point.scale(&d).is_identity() {
            return Ok(d);
        }
    }
    // Lagrange's theorem guarantees some divisor of #C works; reaching
    // here means point didn't actually belong to this curve's group.
    Err(CryptoError::NotOnCurve {
        x: point.x().map(|x| x.to_string()).unwrap_or_default(),
        y: point.y().map(|y| y.to_string()).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_curve_cardinality_matches_known_value() {
        let curve = Curve::new(0.into(), 5.into(), 2.into(), 967.into()).unwrap();
        assert_eq!(compute_cardinality(&curve, 200).unwrap(), BigInt::from(976u32));
    }

    #[test]
    fn medium_curve_cardinality_matches_known_value() {
        let curve = Curve::new(1.into(), 2.into(), 300.into(), 25169.into()).unwrap();
        assert_eq!(compute_cardinality(&curve, 200).unwrap(), BigInt::from(25136u32));
    }

    #[test]
    fn point_order_divides_cardinality() {
        let curve = Curve::new(0.into(), 5.into(), 2.into(), 967.into()).unwrap();
        let p = crate::point::Point::affine(&curve, 8.into(), 39.into()).unwrap();
        let order = compute_order(&curve, &p).unwrap();
        let n = curve.cardinality().unwrap();
        assert!(n.is_multiple_of(&order));
        assert!(p.scale(&order).is_identity());
    }

    #[test]
    fn divisors_ascending_covers_prime_power() {
        let divs = divisors_ascending(&[(BigInt::from(2u8), 3), (BigInt::from(3u8), 1)]);
        let expected: Vec<BigInt> = vec![1u32, 2, 3, 4, 6, 8, 12, 24].into_iter().map(BigInt::from).collect();
        assert_eq!(divs, expected);
    }
}
