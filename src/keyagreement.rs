//! EC Diffie-Hellman key agreement: a private-scalar/public-point exchange
//! wrapped in a small session state machine, with key confirmation via
//! `hmac_sha256::HMAC::mac` standing in for both the session-key KDF and
//! the confirmation MAC.

use std::sync::Arc;

use num_bigint::BigInt;
use num_bigint::RandBigInt;
use openssl::bn::BigNum;
use rand::rngs::ThreadRng;

use crate::curve::Curve;
use crate::error::{CryptoError, Result};
use crate::point::Point;

/// A two-party key-agreement session pinned to one curve and one
/// generator. Progresses strictly forward through its states; calling a
/// step out of order is a programmer error caught by `ProtocolMismatch`.
pub struct Session {
    curve: Arc<Curve>,
    generator: Point,
    state: State,
}

enum State {
    Idle,
    ParamsSent { private_scalar: BigInt, public_point: Point },
    AwaitingPeerPoint { private_scalar: BigInt, public_point: Point },
    SharedPointDerived { session_key: [u8; 32] },
    Confirmed { session_key: [u8; 32] },
}

/// The `(curve, generator, public_point)` triple a peer needs to compute
/// its own shared point. Curve parameters are included so both sides can
/// confirm they picked the same domain without an out-of-band handshake.
pub struct Params {
    pub a: BigInt,
    pub b: BigInt,
    pub c: BigInt,
    pub p: BigInt,
    pub generator: Vec<u8>,
    pub public_point: Vec<u8>,
}

impl Session {
    pub fn new(curve: Arc<Curve>, generator: Point) -> Session {
        Session {
            curve,
            generator,
            state: State::Idle,
        }
    }

    /// Draws a private scalar uniformly from `[1, #C)` and computes the
    /// matching public point, moving `Idle -> ParamsSent`.
    pub fn generate_params(&mut self, rng: &mut ThreadRng) -> Result<Params> {
        let n = self.curve.cardinality()?;
        let private_scalar = rng.gen_bigint_range(&BigInt::from(1u8), &n);
        let public_point = self.generator.mul_scalar(&private_scalar);

        let params = Params {
            a: self.curve.a.clone(),
            b: self.curve.b.clone(),
            c: self.curve.c.clone(),
            p: self.curve.p.clone(),
            generator: self.generator.encode(),
            public_point: public_point.encode(),
        };

        self.state = State::ParamsSent {
            private_scalar,
            public_point,
        };
        Ok(params)
    }

    /// Moves `ParamsSent -> AwaitingPeerPoint`, keeping "sent our params"
    /// and "awaiting the peer's reply" as distinct, explicit states.
    pub fn await_peer(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::ParamsSent { private_scalar, public_point } => {
                self.state = State::AwaitingPeerPoint { private_scalar, public_point };
                Ok(())
            }
            other => {
                self.state = other;
                Err(CryptoError::ProtocolMismatch)
            }
        }
    }

    /// Derives the shared point from the peer's public point and folds it
    /// through HMAC-SHA256 (keyed by a fixed label) into a 32-byte session
    /// key, moving `AwaitingPeerPoint -> SharedPointDerived`.
    pub fn derive_shared_key(&mut self, peer_public_point: &Point) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::AwaitingPeerPoint { private_scalar, .. } => {
                let shared_point = peer_public_point.mul_scalar(&private_scalar);
                let session_key = hmac_sha256::HMAC::mac(shared_point.encode(), b"ecdh-session-key");
                self.state = State::SharedPointDerived { session_key };
                Ok(())
            }
            other => {
                self.state = other;
                Err(CryptoError::ProtocolMismatch)
            }
        }
    }

    /// Produces this side's confirmation tag over a fixed transcript
    /// label, usable once the shared point has been derived.
    pub fn confirmation_tag(&self) -> Result<[u8; 32]> {
        match &self.state {
            State::SharedPointDerived { session_key } | State::Confirmed { session_key } => {
                Ok(hmac_sha256::HMAC::mac(b"confirm", session_key))
            }
            _ => Err(CryptoError::ProtocolMismatch),
        }
    }

    /// Verifies the peer's confirmation tag and, on success, moves
    /// `SharedPointDerived -> Confirmed`.
    pub fn confirm(&mut self, peer_tag: &[u8; 32]) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::SharedPointDerived { session_key } => {
                let expected = hmac_sha256::HMAC::mac(b"confirm", session_key);
                if &expected != peer_tag {
                    self.state = State::SharedPointDerived { session_key };
                    return Err(CryptoError::ProtocolMismatch);
                }
                self.state = State::Confirmed { session_key };
                Ok(())
            }
            other => {
                self.state = other;
                Err(CryptoError::ProtocolMismatch)
            }
        }
    }

    pub fn session_key(&self) -> Option<&[u8; 32]> {
        match &self.state {
            State::Confirmed { session_key } | State::SharedPointDerived { session_key } => Some(session_key),
            _ => None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.state, State::Confirmed { .. })
    }
}

/// Generates a random prime suitable as a curve modulus, delegating to
/// OpenSSL the same way `set5::challenge39::prime` does for RSA key
/// generation.
pub fn generate_prime_modulus(bits: u32) -> Result<BigInt> {
    let mut bn = BigNum::new().map_err(|_| CryptoError::NotPrime("<openssl failure>".to_string()))?;
    bn.generate_prime(bits as i32, false, None, None)
        .map_err(|_| CryptoError::NotPrime("<openssl failure>".to_string()))?;
    BigInt::parse_bytes(bn.to_dec_str().map_err(|_| CryptoError::NotPrime("<openssl failure>".to_string()))?.as_bytes(), 10)
        .ok_or_else(|| CryptoError::NotPrime("<openssl failure>".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_curve() -> Arc<Curve> {
        Curve::new(0.into(), 5.into(), 2.into(), 967.into()).unwrap()
    }

    #[test]
    fn full_handshake_agrees_on_session_key() {
        let curve = small_curve();
        let mut rng = rand::thread_rng();
        let generator = curve.pick_generator(&mut rng).unwrap();

        let mut alice = Session::new(curve.clone(), generator.clone());
        let mut bob = Session::new(curve.clone(), generator.clone());

        let alice_params = alice.generate_params(&mut rng).unwrap();
        let bob_params = bob.generate_params(&mut rng).unwrap();
        alice.await_peer().unwrap();
        bob.await_peer().unwrap();

        let alice_peer_point = Point::decode(&curve, &bob_params.public_point).unwrap();
        let bob_peer_point = Point::decode(&curve, &alice_params.public_point).unwrap();

        alice.derive_shared_key(&alice_peer_point).unwrap();
        bob.derive_shared_key(&bob_peer_point).unwrap();

        assert_eq!(alice.session_key(), bob.session_key());

        let alice_tag = alice.confirmation_tag().unwrap();
        let bob_tag = bob.confirmation_tag().unwrap();
        alice.confirm(&bob_tag).unwrap();
        bob.confirm(&alice_tag).unwrap();

        assert!(alice.is_confirmed());
        assert!(bob.is_confirmed());
    }

    #[test]
    fn confirm_rejects_wrong_tag() {
        let curve = small_curve();
        let mut rng = rand::thread_rng();
        let generator = curve.pick_generator(&mut rng).unwrap();

        let mut alice = Session::new(curve.clone(), generator);
        alice.generate_params(&mut rng).unwrap();
        alice.await_peer().unwrap();

        let peer_point = curve.pick_point(&mut rng);
        alice.derive_shared_key(&peer_point).unwrap();
        let bogus_tag = [0u8; 32];
        assert!(alice.confirm(&bogus_tag).is_err());
    }

    #[test]
    fn step_out_of_order_reports_protocol_mismatch() {
        let curve = small_curve();
        let mut rng = rand::thread_rng();
        let generator = curve.pick_generator(&mut rng).unwrap();
        let mut alice = Session::new(curve, generator);
        assert!(alice.await_peer().is_err());
    }
}
