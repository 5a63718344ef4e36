//! Curve parameters `(a, b, c, p)` for `y² = x³ + a·x² + b·x + c` over
//! `F_p`, plus the curve-level procedures: membership, random sampling,
//! enumeration, cardinality and generator search. Full short-Weierstrass
//! form (non-zero `x²` coefficient), with a non-singularity check at
//! construction.

use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::Zero;
use openssl::bn::{BigNum, BigNumContext};
use rand::rngs::ThreadRng;

use crate::error::{CryptoError, Result};
use crate::field;
use crate::order;
use crate::point::Point;

/// Curve parameters. Constructed once and never mutated; the cardinality
/// cache is the one piece of interior state, and it is write-once.
#[derive(Debug)]
pub struct Curve {
    pub a: BigInt,
    pub b: BigInt,
    pub c: BigInt,
    pub p: BigInt,
    cardinality: OnceLock<BigInt>,
}

impl PartialEq for Curve {
    fn eq(&self, other: &Self) -> bool {
        self.a == other.a && self.b == other.b && self.c == other.c && self.p == other.p
    }
}

impl Curve {
    /// Validates `p` prime and the curve non-singular, then constructs it
    /// with coefficients canonicalized into `[0, p)`.
    pub fn new(a: BigInt, b: BigInt, c: BigInt, p: BigInt) -> Result<Arc<Curve>> {
        Self::build(a, b, c, p, true)
    }

    /// Constructs a curve without the non-singularity check, accepting any
    /// coefficients; still requires `p` prime since the field arithmetic
    /// is otherwise unsound.
    pub fn new_permissive(a: BigInt, b: BigInt, c: BigInt, p: BigInt) -> Result<Arc<Curve>> {
        Self::build(a, b, c, p, false)
    }

    fn build(a: BigInt, b: BigInt, c: BigInt, p: BigInt, strict: bool) -> Result<Arc<Curve>> {
        if p <= BigInt::from(3u8) || !is_probably_prime(&p) {
            return Err(CryptoError::NotPrime(p.to_string()));
        }

        let a = a.mod_floor(&p);
        let b = b.mod_floor(&p);
        let c = c.mod_floor(&p);

        if strict && discriminant(&a, &b, &c, &p).is_zero() {
            return Err(CryptoError::SingularCurve);
        }

        Ok(Arc::new(Curve {
            a,
            b,
            c,
            p,
            cardinality: OnceLock::new(),
        }))
    }

    /// Right-hand side `x³ + a·x² + b·x + c` mod p.
    pub fn rhs(&self, x: &BigInt) -> BigInt {
        let x2 = field::mul(x, x, &self.p);
        let x3 = field::mul(&x2, x, &self.p);
        let ax2 = field::mul(&self.a, &x2, &self.p);
        let bx = field::mul(&self.b, x, &self.p);
        field::add(&field::add(&x3, &ax2, &self.p), &field::add(&bx, &self.c, &self.p), &self.p)
    }

    /// `true` iff `y² ≡ x³ + a·x² + b·x + c (mod p)`.
    pub fn contains(&self, x: &BigInt, y: &BigInt) -> bool {
        let y2 = field::mul(y, y, &self.p);
        y2 == self.rhs(x)
    }

    /// Samples a uniformly random affine point, resampling `x` until the
    /// right-hand side is a quadratic residue. Expected ~2 attempts.
    pub fn pick_point(self: &Arc<Self>, rng: &mut ThreadRng) -> Point {
        use num_bigint::RandBigInt;
        loop {
            let x = rng.gen_bigint_range(&BigInt::zero(), &self.p);
            let rhs = self.rhs(&x);
            if let Ok((y, _)) = field::sqrt(&rhs, &self.p) {
                return Point::affine(self, x, y).expect("sampled point satisfies the curve equation by construction");
            }
        }
    }

    /// All rational points, including the identity. Emission halts once the
    /// running count reaches `cardinality()`, serving as a consistency
    /// check between enumeration and the sampled cardinality.
    pub fn enumerate_all_points(self: &Arc<Self>) -> Result<Vec<Point>> {
        let n = self.cardinality()?;
        let mut points = Vec::new();
        let mut x = BigInt::zero();
        while &x < &self.p && BigInt::from(points.len() as u64) < n {
            let rhs = self.rhs(&x);
            if let Ok((y1, y2)) = field::sqrt(&rhs, &self.p) {
                points.push(Point::affine(self, x.clone(), y1.clone())?);
                if y1 != y2 {
                    points.push(Point::affine(self, x.clone(), y2)?);
                }
            }
            x += 1;
        }
        points.push(Point::at_infinity(self));
        Ok(points)
    }

    /// The Hasse interval `[p + 1 - 2√p, p + 1 + 2√p]`.
    pub fn hasse_interval(&self) -> (BigInt, BigInt) {
        let root = self.p.sqrt();
        // isqrt can undershoot by one ULP of precision for non-perfect
        // squares; pad by one on both sides so the true bound is never
        // excluded.
        let slack = 2 * (&root + 1);
        let center = &self.p + 1;
        let lo = &center - &slack;
        let hi = &center + &slack;
        let lo = if lo < BigInt::zero() { BigInt::zero() } else { lo };
        (lo, hi)
    }

    /// The cached group cardinality, computing and publishing it on first
    /// use with a generous default sample cap.
    pub fn cardinality(self: &Arc<Self>) -> Result<BigInt> {
        self.cardinality_bounded(10_000)
    }

    /// As `cardinality`, but gives up with `CardinalityNotDetermined` after
    /// `max_samples` points have been drawn without the accumulator
    /// converging to the unique multiple of itself in the Hasse interval.
    pub fn cardinality_bounded(self: &Arc<Self>, max_samples: usize) -> Result<BigInt> {
        if let Some(n) = self.cardinality.get() {
            return Ok(n.clone());
        }

        let n = order::compute_cardinality(self, max_samples)?;
        // Idempotent publish: if another caller raced us, both computed the
        // same value, so whichever wins is fine.
        let _ = self.cardinality.set(n.clone());
        Ok(self.cardinality.get().cloned().unwrap_or(n))
    }

    /// The first sampled point whose order equals `#C`. Bounded so a
    /// non-cyclic group cannot loop forever; gives up after `max_attempts`
    /// samples.
    pub fn pick_generator_bounded(self: &Arc<Self>, rng: &mut ThreadRng, max_attempts: usize) -> Result<Point> {
        let n = self.cardinality()?;
        for _ in 0..max_attempts {
            let p = self.pick_point(rng);
            if p.is_identity() {
                continue;
            }
            if order::compute_order(self, &p)? == n {
                return Ok(p);
            }
        }
        Err(CryptoError::NoGenerator)
    }

    pub fn pick_generator(self: &Arc<Self>, rng: &mut ThreadRng) -> Result<Point> {
        self.pick_generator_bounded(rng, 4_096)
    }
}

impl std::fmt::Display for Curve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "y^2==x^3+{}x^2+{}x+{} over F_{}",
            self.a, self.b, self.c, self.p
        )
    }
}

/// Discriminant of `y² = x³ + A·x² + B·x + C`, non-zero mod p iff the
/// curve is non-singular. Derived from the standard Weierstrass
/// discriminant formula with `a1 = a3 = 0`, `a2 = A`, `a4 = B`, `a6 = C`:
/// `b2 = 4A`, `b4 = 2B`, `b6 = 4C`, `b8 = 4AC - B²`,
/// `Δ = -b2²b8 - 8b4³ - 27b6² + 9 b2 b4 b6`.
fn discriminant(a: &BigInt, b: &BigInt, c: &BigInt, p: &BigInt) -> BigInt {
    let b2 = field::mul(&BigInt::from(4u8), a, p);
    let b4 = field::mul(&BigInt::from(2u8), b, p);
    let b6 = field::mul(&BigInt::from(4u8), c, p);
    let b8 = field::sub(&field::mul(&b2, c, p), &field::mul(b, b, p), p);

    let term1 = field::mul(&field::mul(&b2, &b2, p), &b8, p);
    let term2 = field::mul(&BigInt::from(8u8), &field::mul(&field::mul(&b4, &b4, p), &b4, p), p);
    let term3 = field::mul(&BigInt::from(27u8), &field::mul(&b6, &b6, p), p);
    let term4 = field::mul(&BigInt::from(9u8), &field::mul(&field::mul(&b2, &b4, p), &b6, p), p);

    field::add(
        &field::sub(&field::neg(&term1, p), &term2, p),
        &field::sub(&term4, &term3, p),
        p,
    )
}

/// Probabilistic primality test delegated to OpenSSL's `BN_is_prime`.
fn is_probably_prime(n: &BigInt) -> bool {
    if n <= &BigInt::zero() {
        return false;
    }
    let Ok(bn) = BigNum::from_dec_str(&n.to_str_radix(10)) else {
        return false;
    };
    let Ok(mut ctx) = BigNumContext::new() else {
        return false;
    };
    bn.is_prime(64, &mut ctx).unwrap_or(false)
}

/// Parses a decimal string into a `BigInt`, used by the CLI when reading
/// curve parameters.
pub fn parse_decimal(s: &str) -> Result<BigInt> {
    BigInt::from_str(s).map_err(|_| CryptoError::NotPrime(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_curve() -> Arc<Curve> {
        Curve::new(0.into(), 5.into(), 2.into(), 967.into()).unwrap()
    }

    #[test]
    fn small_curve_arithmetic_matches_known_points() {
        let curve = small_curve();
        let p = Point::affine(&curve, 8.into(), 39.into()).unwrap();
        let q = Point::affine(&curve, 40.into(), 185.into()).unwrap();

        let sum = p.add(&q).unwrap();
        assert_eq!(sum, Point::affine(&curve, 309.into(), 703.into()).unwrap());

        let doubled = p.add(&p).unwrap();
        assert_eq!(doubled, Point::affine(&curve, 756.into(), 105.into()).unwrap());

        assert_eq!(p.mul_scalar(&3.into()), Point::affine(&curve, 157.into(), 602.into()).unwrap());
        assert_eq!(p.mul_scalar(&4.into()), Point::affine(&curve, 783.into(), 349.into()).unwrap());
        assert_eq!(p.mul_scalar(&345.into()), Point::affine(&curve, 697.into(), 843.into()).unwrap());

        assert_eq!(curve.cardinality().unwrap(), BigInt::from(976u32));
    }

    #[test]
    fn identity_laws() {
        let curve = small_curve();
        let o = Point::at_infinity(&curve);
        assert!(o.is_identity());
        assert_eq!(o.mul_scalar(&2.into()), o);
        assert_eq!(o.neg(), o);
        assert_eq!(o.mul_scalar(&50.into()), o);

        let p = Point::affine(&curve, 8.into(), 39.into()).unwrap();
        assert_eq!(p.add(&o).unwrap(), p);
        assert_eq!(o.add(&p).unwrap(), p);
        assert_eq!(p.mul_scalar(&BigInt::zero()), o);
        assert!(p.add(&p.neg()).unwrap().is_identity());
    }

    #[test]
    fn rejects_singular_curve() {
        // y^2 = x^3 (a=b=0, c=0) is singular everywhere.
        let res = Curve::new(0.into(), 0.into(), 0.into(), 967.into());
        assert_eq!(res.unwrap_err(), CryptoError::SingularCurve);
    }

    #[test]
    fn rejects_composite_modulus() {
        let res = Curve::new(0.into(), 5.into(), 2.into(), 968.into());
        assert_eq!(res.unwrap_err(), CryptoError::NotPrime("968".to_string()));
    }

    #[test]
    fn display_matches_textual_form() {
        let curve = small_curve();
        assert_eq!(format!("{curve}"), "y^2==x^3+0x^2+5x+2 over F_967");
    }
}
