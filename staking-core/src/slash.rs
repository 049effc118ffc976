use crate::Error;
use crate::SlashingChangeOutput;
use bitcoin::absolute::LockTime;
use bitcoin::address::NetworkUnchecked;
use bitcoin::key::Secp256k1;
use bitcoin::key::Verification;
use bitcoin::taproot::ControlBlock;
use bitcoin::taproot::LeafVersion;
use bitcoin::transaction;
use bitcoin::Address;
use bitcoin::Amount;
use bitcoin::Network;
use bitcoin::OutPoint;
use bitcoin::Psbt;
use bitcoin::ScriptBuf;
use bitcoin::Transaction;
use bitcoin::TxIn;
use bitcoin::TxOut;
use std::collections::BTreeMap;

/// Build the transaction that slashes a staked output.
///
/// The spend goes through the slashing leaf of `source_tx`'s staking (or unbonding) output, so it
/// needs signatures from the staker, one finality provider and a covenant quorum. A
/// `slashing_rate` fraction of the staked value goes to `slashing_address`; the residual minus
/// `min_fee` is locked under `change_script` in a fresh single-leaf Taproot output. Both values
/// round down, so the two outputs never exceed the input.
#[allow(clippy::too_many_arguments)]
pub fn create_slashing_transaction<C>(
    secp: &Secp256k1<C>,
    slashing_spend_info: (ScriptBuf, ControlBlock),
    source_tx: &Transaction,
    slashing_address: Address<NetworkUnchecked>,
    slashing_rate: f64,
    change_script: &ScriptBuf,
    min_fee: Amount,
    network: Network,
    output_index: u32,
) -> Result<Psbt, Error>
where
    C: Verification,
{
    if slashing_rate <= 0.0 {
        return Err(Error::NonPositiveValue("slashing rate"));
    }

    if min_fee == Amount::ZERO {
        return Err(Error::NonPositiveValue("minimum slashing fee"));
    }

    let slashing_address = slashing_address
        .require_network(network)
        .map_err(Error::InvalidAddress)?;

    // TODO: The staked value is always read from output 0 even though the input spends
    // `output_index`. Align the two once it is settled whether non-zero indices are ever used.
    let funding = source_tx.output.first().ok_or(Error::MissingOutput(0))?;
    let staked = funding.value.to_sat();

    let slashed = (staked as f64 * slashing_rate).floor() as u64;
    let residual =
        (staked as f64 * (1.0 - slashing_rate)).floor() as i64 - min_fee.to_sat() as i64;

    if residual <= 0 {
        return Err(Error::InsufficientFundsForSlashing);
    }

    let change_output = SlashingChangeOutput::new(secp, change_script.clone(), network);
    let (leaf_script, control_block) = slashing_spend_info;

    let mut psbt = Psbt::from_unsigned_tx(Transaction {
        version: transaction::Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: source_tx.compute_txid(),
                vout: output_index,
            },
            ..Default::default()
        }],
        output: vec![
            TxOut {
                value: Amount::from_sat(slashed),
                script_pubkey: slashing_address.script_pubkey(),
            },
            TxOut {
                value: Amount::from_sat(residual as u64),
                script_pubkey: change_output.script_pubkey(),
            },
        ],
    })?;

    let psbt_input = &mut psbt.inputs[0];
    psbt_input.witness_utxo = Some(funding.clone());
    psbt_input.tap_internal_key = Some(crate::unspendable_internal_key());
    psbt_input.tap_scripts = BTreeMap::from_iter([(
        control_block,
        (leaf_script, LeafVersion::TapScript),
    )]);

    tracing::debug!(
        txid = %psbt.unsigned_tx.compute_txid(),
        slashed,
        residual,
        "Built slashing transaction"
    );

    Ok(psbt)
}
