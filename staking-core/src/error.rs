//! Errors that can occur while building staking scripts and transactions.

use bitcoin::address::ParseError;
use bitcoin::psbt::Error as PsbtError;
use bitcoin::Amount;
use thiserror::Error;

/// Errors that can occur while building staking scripts and transactions.
#[derive(Debug, Error)]
pub enum Error {
    /// An amount, fee or rate argument was zero or negative.
    #[error("{0} must be greater than zero")]
    NonPositiveValue(&'static str),

    /// The change address does not parse for the requested network.
    #[error("invalid change address: {0}")]
    InvalidChangeAddress(#[source] ParseError),

    /// A destination address does not parse for the requested network.
    #[error("invalid address: {0}")]
    InvalidAddress(#[source] ParseError),

    /// The funding inputs do not cover the staking amount plus fee.
    #[error("insufficient funds: available = {available}, required = {required}")]
    InsufficientFunds {
        /// Total value of the provided funding inputs.
        available: Amount,
        /// Staking amount plus fee.
        required: Amount,
    },

    /// The slashed output value leaves no residual for the change output.
    #[error("insufficient funds to cover the slashing change output")]
    InsufficientFundsForSlashing,

    /// A script expected to be a timelock script has a different shape.
    #[error("script is not a valid timelock script")]
    InvalidTimelockScript,

    /// A multisignature script was requested for an empty key set.
    #[error("no keys provided")]
    NoKeys,

    /// The covenant threshold exceeds the number of covenant keys.
    #[error("threshold {threshold} exceeds the number of keys {keys}")]
    ThresholdTooLarge {
        /// Requested signature threshold.
        threshold: u32,
        /// Number of keys available.
        keys: usize,
    },

    /// The same public key appears more than once in a key set.
    #[error("duplicate keys are not allowed")]
    DuplicateKeys,

    /// A required staking parameter is absent, empty or zero.
    #[error("missing required input: {0}")]
    MissingRequiredInput(&'static str),

    /// The magic bytes would push the data-carrier payload past the maximum script element size.
    #[error("magic bytes too long: {len} bytes, at most {max} are allowed")]
    MagicBytesTooLong {
        /// Length of the provided magic bytes.
        len: usize,
        /// Longest magic tag the payload layout can accommodate.
        max: usize,
    },

    /// The spent transaction has no output at the requested index.
    #[error("transaction has no output at index {0}")]
    MissingOutput(u32),

    /// Ways that a [`Psbt`](bitcoin::Psbt) might fail.
    #[error("PSBT error: {0}")]
    Psbt(#[from] PsbtError),
}
