use thiserror::Error;

/// The error taxonomy for the whole crate. Every fallible operation in
/// `field`, `point`, `curve`, `dlog`, `order`, `factor` and `keyagreement`
/// returns one of these variants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("({x}, {y}) does not satisfy the curve equation")]
    NotOnCurve { x: String, y: String },

    #[error("operands belong to different groups (different curves, or different moduli)")]
    MixedCurves,

    #[error("curve is singular (discriminant is zero mod p)")]
    SingularCurve,

    #[error("{0} is not prime")]
    NotPrime(String),

    #[error("{0} has no multiplicative inverse mod p")]
    NotInvertible(String),

    #[error("{0} is not a quadratic residue mod p")]
    NotASquare(String),

    #[error("target is not in the subgroup generated by the base element")]
    NoSolution,

    #[error("could not fully factor {0} within the configured effort budget")]
    FactorizationFailed(String),

    #[error("key confirmation tag did not verify")]
    ProtocolMismatch,

    #[error("cardinality search exhausted its sample budget without converging")]
    CardinalityNotDetermined,

    #[error("no sampled point generates the full group (group is not cyclic?)")]
    NoGenerator,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
