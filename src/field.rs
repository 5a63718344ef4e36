//! Exact arithmetic modulo a prime `p`. Every result is canonicalized into
//! `[0, p)`. Adapted from the extended-Euclidean `invmod` in the RSA
//! challenge and the Tonelli-Shanks `ts_sqrt` used for the invalid-curve
//! attack, generalized into standalone free functions so `Point` and
//! `Curve` can share them instead of re-deriving modular inverses inline.

use num_bigint::{BigInt, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::rngs::ThreadRng;
use rand::thread_rng;

use crate::error::{CryptoError, Result};

pub fn reduce(a: &BigInt, p: &BigInt) -> BigInt {
    a.mod_floor(p)
}

pub fn add(a: &BigInt, b: &BigInt, p: &BigInt) -> BigInt {
    (a + b).mod_floor(p)
}

pub fn sub(a: &BigInt, b: &BigInt, p: &BigInt) -> BigInt {
    (a - b).mod_floor(p)
}

pub fn mul(a: &BigInt, b: &BigInt, p: &BigInt) -> BigInt {
    (a * b).mod_floor(p)
}

pub fn neg(a: &BigInt, p: &BigInt) -> BigInt {
    (-a).mod_floor(p)
}

/// Multiplicative inverse via the extended Euclidean algorithm.
pub fn inv(a: &BigInt, p: &BigInt) -> Result<BigInt> {
    let a = a.mod_floor(p);
    if a.is_zero() {
        return Err(CryptoError::NotInvertible(a.to_string()));
    }

    let (mut old_r, mut r) = (a, p.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());

    while !r.is_zero() {
        let q = &old_r / &r;
        let new_r = &old_r - &q * &r;
        old_r = r;
        r = new_r;
        let new_s = &old_s - &q * &s;
        old_s = s;
        s = new_s;
    }

    if old_r != BigInt::one() {
        return Err(CryptoError::NotInvertible(old_r.to_string()));
    }

    Ok(old_s.mod_floor(p))
}

/// `true` iff `n` has a square root mod `p` (Euler's criterion).
pub fn is_square(n: &BigInt, p: &BigInt) -> bool {
    let n = n.mod_floor(p);
    if n.is_zero() {
        return true;
    }
    let exp = (p - BigInt::one()) / BigInt::from(2u8);
    n.modpow(&exp, p) == BigInt::one()
}

/// Both square roots of `n` mod `p`, or `NotASquare` if `n` is a
/// quadratic non-residue. Uses the p ≡ 3 (mod 4) fast path
/// (`r = n^((p+1)/4) mod p`) and falls back to Tonelli-Shanks otherwise.
pub fn sqrt(n: &BigInt, p: &BigInt) -> Result<(BigInt, BigInt)> {
    let n = n.mod_floor(p);
    if !is_square(&n, p) {
        return Err(CryptoError::NotASquare(n.to_string()));
    }
    if n.is_zero() {
        return Ok((BigInt::zero(), BigInt::zero()));
    }

    let four = BigInt::from(4u8);
    let three = BigInt::from(3u8);
    let r = if p.mod_floor(&four) == three {
        let exp = (p + BigInt::one()) / &four;
        let r = n.modpow(&exp, p);
        debug_assert_eq!(mul(&r, &r, p), n, "fast-path sqrt candidate failed to verify");
        r
    } else {
        tonelli_shanks(&n, p)
    };

    let other = neg(&r, p);
    if r <= other {
        Ok((r, other))
    } else {
        Ok((other, r))
    }
}

/// Adapted from <https://crypto.stanford.edu/pbc/notes/ep/tonelli.html>.
fn tonelli_shanks(n: &BigInt, p: &BigInt) -> BigInt {
    let one = BigInt::one();
    let two = BigInt::from(2u8);

    // p - 1 = q * 2^s, with q odd
    let mut q = p - &one;
    let mut s = BigInt::zero();
    while q.is_even() {
        q = &q / &two;
        s += &one;
    }

    let z = quadratic_non_residue(p);
    let mut m = s;
    let mut c = z.modpow(&q, p);
    let mut t = n.modpow(&q, p);
    let mut r = n.modpow(&((&q + &one) / &two), p);

    loop {
        if t.is_zero() {
            return BigInt::zero();
        }
        if t == one {
            return r;
        }

        let mut i = BigInt::zero();
        let mut t_pow = t.clone();
        while t_pow != one {
            t_pow = mul(&t_pow, &t_pow, p);
            i += &one;
        }

        let exp = two.modpow(&(&m - &i - &one), p);
        let b = c.modpow(&exp, p);
        m = i;
        c = mul(&b, &b, p);
        t = mul(&mul(&t, &b, p), &b, p);
        r = mul(&r, &b, p);
    }
}

fn quadratic_non_residue(p: &BigInt) -> BigInt {
    let mut rng: ThreadRng = thread_rng();
    loop {
        let candidate = rng.gen_bigint_range(&BigInt::zero(), p);
        if !is_square(&candidate, p) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn inv_roundtrip() {
        let p = BigInt::from(967u32);
        for a in 1..900u32 {
            let a = BigInt::from(a);
            let i = inv(&a, &p).unwrap();
            assert_eq!(mul(&a, &i, &p), BigInt::one());
        }
    }

    #[test]
    fn inv_zero_fails() {
        let p = BigInt::from(967u32);
        assert_eq!(
            inv(&BigInt::zero(), &p),
            Err(CryptoError::NotInvertible("0".to_string()))
        );
    }

    #[test]
    fn sqrt_matches_square_for_p_3_mod_4() {
        // 967 is prime and 967 mod 4 == 3
        let p = BigInt::from(967u32);
        for a in 1..200u32 {
            let a = BigInt::from(a);
            let sq = mul(&a, &a, &p);
            let (r1, r2) = sqrt(&sq, &p).unwrap();
            assert!(r1 == a || r1 == neg(&a, &p));
            assert_eq!(r2, neg(&r1, &p));
        }
    }

    #[test]
    fn sqrt_matches_square_for_p_1_mod_4() {
        // 25169 wouldn't exercise the general path (it's 1 mod 4 itself is
        // what we need); take a small prime congruent to 1 mod 4 instead.
        let p = BigInt::from(13u32);
        for a in 1..12u32 {
            let a = BigInt::from(a);
            let sq = mul(&a, &a, &p);
            let (r1, r2) = sqrt(&sq, &p).unwrap();
            assert!(r1 == a || r1 == neg(&a, &p));
            assert_eq!(r2, neg(&r1, &p));
        }
    }

    #[test]
    fn sqrt_rejects_non_residue() {
        let p = BigInt::from_str("967").unwrap();
        // 3 is a quadratic non-residue mod 967 (967 mod 3 != 1 pattern aside,
        // verified computationally: 3^483 mod 967 != 1)
        let three = BigInt::from(3u32);
        if !is_square(&three, &p) {
            assert!(sqrt(&three, &p).is_err());
        }
    }
}
