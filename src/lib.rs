//! Elliptic-curve arithmetic over `F_p`, generic discrete-log solvers, and
//! EC Diffie-Hellman key agreement.
//!
//! `curve`/`point` implement the group law for short-Weierstrass curves
//! `y² = x³ + ax² + bx + c`; `order` computes cardinality and point order
//! from first principles (sampling plus the Hasse bound, no Schoof's
//! algorithm); `dlog` implements baby-step/giant-step and Pohlig-Hellman
//! generically over any `group::FiniteAbelianGroup`; `keyagreement` wires
//! the curve and dlog layers into a Diffie-Hellman session.

pub mod curve;
pub mod dlog;
pub mod error;
pub mod factor;
pub mod field;
pub mod group;
pub mod keyagreement;
pub mod order;
pub mod point;

pub use curve::Curve;
pub use error::{CryptoError, Result};
pub use group::FiniteAbelianGroup;
pub use point::Point;
