pub mod output;
pub mod params;
pub mod script;
pub mod slash;
pub mod stake;
pub mod unbond;
pub mod withdraw;
pub mod witness;

mod error;

pub use error::Error;
pub use output::SlashingChangeOutput;
pub use output::StakingOutput;
pub use output::UnbondingOutput;
pub use params::StakingParams;
pub use script::extract_timelock_from_script;
pub use script::StakingScripts;
pub use witness::CovenantSignature;

use bitcoin::key::PublicKey;
use bitcoin::XOnlyPublicKey;

/// A verifiably unspendable public key used as the Taproot internal key for every output built by
/// this crate. Its discrete logarithm is unknown, so all outputs are script-path only.
pub const UNSPENDABLE_KEY: &str =
    "0250929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac0";

/// The x-only form of [`UNSPENDABLE_KEY`].
pub fn unspendable_internal_key() -> XOnlyPublicKey {
    let unspendable_key: PublicKey = UNSPENDABLE_KEY.parse().expect("valid key");
    unspendable_key.inner.x_only_public_key().0
}
