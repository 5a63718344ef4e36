//! A curve element: the identity `O`, or an affine `(x, y)` pair. Modeled
//! as a tagged variant so the group-law case split is total and
//! pattern-matched rather than branching on a placeholder coordinate
//! value. Every `Point` carries an `Arc<Curve>` back to its parent curve.

use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::Zero;

use crate::curve::Curve;
use crate::error::{CryptoError, Result};
use crate::field;
use crate::group::FiniteAbelianGroup;

#[derive(Debug, Clone)]
enum Coords {
    Identity,
    Affine { x: BigInt, y: BigInt },
}

#[derive(Debug, Clone)]
pub struct Point {
    curve: Arc<Curve>,
    coords: Coords,
}

impl Point {
    pub fn at_infinity(curve: &Arc<Curve>) -> Point {
        Point {
            curve: curve.clone(),
            coords: Coords::Identity,
        }
    }

    /// Constructs an affine point, validating it lies on the curve.
    pub fn affine(curve: &Arc<Curve>, x: BigInt, y: BigInt) -> Result<Point> {
        let x = field::reduce(&x, &curve.p);
        let y = field::reduce(&y, &curve.p);
        if !curve.contains(&x, &y) {
            return Err(CryptoError::NotOnCurve {
                x: x.to_string(),
                y: y.to_string(),
            });
        }
        Ok(Point {
            curve: curve.clone(),
            coords: Coords::Affine { x, y },
        })
    }

    pub fn curve(&self) -> &Arc<Curve> {
        &self.curve
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.coords, Coords::Identity)
    }

    pub fn x(&self) -> Option<&BigInt> {
        match &self.coords {
            Coords::Identity => None,
            Coords::Affine { x, .. } => Some(x),
        }
    }

    pub fn y(&self) -> Option<&BigInt> {
        match &self.coords {
            Coords::Identity => None,
            Coords::Affine { y, .. } => Some(y),
        }
    }

    fn same_curve(&self, other: &Point) -> bool {
        Arc::ptr_eq(&self.curve, &other.curve) || *self.curve == *other.curve
    }

    /// The chord-and-tangent group law, evaluated in order: identity
    /// cases, vertical chord (mutual inverses, covers doubling a point
    /// with `y = 0`), doubling, then the general chord. `x₃` keeps the
    /// `−a` term the non-zero `x²` coefficient of this curve's equation
    /// requires.
    pub fn add(&self, other: &Point) -> Result<Point> {
        if !self.same_curve(other) {
            return Err(CryptoError::MixedCurves);
        }
        let curve = &self.curve;
        let p = &curve.p;

        let (x1, y1) = match &self.coords {
            Coords::Identity => return Ok(other.clone()),
            Coords::Affine { x, y } => (x, y),
        };
        let (x2, y2) = match &other.coords {
            Coords::Identity => return Ok(self.clone()),
            Coords::Affine { x, y } => (x, y),
        };

        if x1 == x2 && y1 != y2 {
            return Ok(Point::at_infinity(curve));
        }

        let m = if x1 == x2 && y1 == y2 {
            if y1.is_zero() {
                return Ok(Point::at_infinity(curve));
            }
            let num = field::add(
                &field::mul(&BigInt::from(3u8), &field::mul(x1, x1, p), p),
                &field::mul(&BigInt::from(2u8), &field::mul(&curve.a, x1, p), p),
                p,
            );
            let num = field::add(&num, &curve.b, p);
            let den = field::inv(&field::mul(&BigInt::from(2u8), y1, p), p)?;
            field::mul(&num, &den, p)
        } else {
            let num = field::sub(y2, y1, p);
            let den = field::inv(&field::sub(x2, x1, p), p)?;
            field::mul(&num, &den, p)
        };

        let x3 = field::sub(&field::sub(&field::sub(&field::mul(&m, &m, p), &curve.a, p), x1, p), x2, p);
        let y3 = field::sub(&field::mul(&m, &field::sub(x1, &x3, p), p), y1, p);

        Ok(Point {
            curve: curve.clone(),
            coords: Coords::Affine { x: x3, y: y3 },
        })
    }

    pub fn neg(&self) -> Point {
        match &self.coords {
            Coords::Identity => self.clone(),
            Coords::Affine { x, y } => Point {
                curve: self.curve.clone(),
                coords: Coords::Affine {
                    x: x.clone(),
                    y: field::neg(y, &self.curve.p),
                },
            },
        }
    }

    /// Scalar multiplication via the generic double-and-add ladder in
    /// `group::FiniteAbelianGroup`. Negative `k` negates the base first.
    pub fn mul_scalar(&self, k: &BigInt) -> Point {
        self.scale(k)
    }

    /// Canonical byte encoding: `0x00` for the identity, `0x04` followed
    /// by `x` then `y` each padded to `⌈log2(p)/8⌉` bytes big-endian
    /// otherwise. Used for equality keys, the Shanks table and
    /// as the session-key-derivation input.
    pub fn encode(&self) -> Vec<u8> {
        match &self.coords {
            Coords::Identity => vec![0x00],
            Coords::Affine { x, y } => {
                let width = coordinate_width(&self.curve.p);
                let mut out = Vec::with_capacity(1 + 2 * width);
                out.push(0x04);
                out.extend(pad_be(x, width));
                out.extend(pad_be(y, width));
                out
            }
        }
    }

    pub fn decode(curve: &Arc<Curve>, bytes: &[u8]) -> Result<Point> {
        if bytes == [0x00] {
            return Ok(Point::at_infinity(curve));
        }
        let width = coordinate_width(&curve.p);
        if bytes.len() != 1 + 2 * width || bytes[0] != 0x04 {
            return Err(CryptoError::NotOnCurve {
                x: "<malformed encoding>".to_string(),
                y: "<malformed encoding>".to_string(),
            });
        }
        let x = BigInt::from_bytes_be(num_bigint::Sign::Plus, &bytes[1..1 + width]);
        let y = BigInt::from_bytes_be(num_bigint::Sign::Plus, &bytes[1 + width..]);
        Point::affine(curve, x, y)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.same_curve(other) && self.encode() == other.encode()
    }
}
impl Eq for Point {}

impl std::hash::Hash for Point {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.encode().hash(state);
    }
}

impl FiniteAbelianGroup for Point {
    type Key = Vec<u8>;

    fn identity(&self) -> Self {
        Point::at_infinity(&self.curve)
    }

    fn combine(&self, other: &Self) -> Result<Self> {
        self.add(other)
    }

    fn invert(&self) -> Self {
        self.neg()
    }

    fn key(&self) -> Vec<u8> {
        self.encode()
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.coords {
            Coords::Identity => write!(f, "O"),
            Coords::Affine { x, y } => write!(f, "[{x}, {y}]"),
        }
    }
}

fn coordinate_width(p: &BigInt) -> usize {
    (p.bits() as usize).div_ceil(8).max(1)
}

fn pad_be(n: &BigInt, width: usize) -> Vec<u8> {
    let raw = n.to_bytes_be().1;
    let mut out = vec![0u8; width - raw.len()];
    out.extend(raw);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> Arc<Curve> {
        Curve::new(0.into(), 5.into(), 2.into(), 967.into()).unwrap()
    }

    #[test]
    fn encode_roundtrip() {
        let curve = curve();
        let p = Point::affine(&curve, 8.into(), 39.into()).unwrap();
        let decoded = Point::decode(&curve, &p.encode()).unwrap();
        assert_eq!(p, decoded);
    }

    #[test]
    fn identity_encoding_is_distinguishable() {
        let curve = curve();
        let o = Point::at_infinity(&curve);
        let p = Point::affine(&curve, 8.into(), 39.into()).unwrap();
        assert_ne!(o.encode(), p.encode());
        assert_eq!(o.encode(), vec![0x00]);
    }

    #[test]
    fn rejects_off_curve_point() {
        let curve = curve();
        assert!(Point::affine(&curve, 1.into(), 1.into()).is_err());
    }

    #[test]
    fn mixed_curve_add_fails() {
        let c1 = curve();
        let c2 = Curve::new(1.into(), 2.into(), 300.into(), 25169.into()).unwrap();
        let p1 = Point::affine(&c1, 8.into(), 39.into()).unwrap();
        let p2 = c2.pick_point(&mut rand::thread_rng());
        assert_eq!(p1.add(&p2).unwrap_err(), CryptoError::MixedCurves);
    }

    #[test]
    fn negation_and_doubling_with_zero_tangent() {
        // A curve with a point of order 2 (y = 0) exercises the vertical
        // tangent branch of doubling.
        // y^2 = x^3 - x has (0,0) as a 2-torsion point over F_967.
        let curve = Curve::new(0.into(), BigInt::from(966u32), 0.into(), 967.into()).unwrap();
        let p = Point::affine(&curve, 0.into(), 0.into()).unwrap();
        assert!(p.add(&p).unwrap().is_identity());
        assert_eq!(p.neg(), p);
    }
}
