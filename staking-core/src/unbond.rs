use crate::Error;
use crate::StakingOutput;
use crate::UnbondingOutput;
use bitcoin::absolute::LockTime;
use bitcoin::taproot::LeafVersion;
use bitcoin::transaction;
use bitcoin::Amount;
use bitcoin::OutPoint;
use bitcoin::Psbt;
use bitcoin::Transaction;
use bitcoin::TxIn;
use bitcoin::TxOut;
use std::collections::BTreeMap;

/// Build the transaction that moves the staked coins into the unbonding output.
///
/// The spend goes through the unbonding leaf of the staking output, so it needs signatures from
/// the staker and a covenant quorum. The full remaining value moves to the unbonding output;
/// there is no change.
pub fn create_unbonding_transaction(
    staking_output: &StakingOutput,
    unbonding_output: &UnbondingOutput,
    staking_tx: &Transaction,
    fee: Amount,
    output_index: u32,
) -> Result<Psbt, Error> {
    if fee == Amount::ZERO {
        return Err(Error::NonPositiveValue("unbonding fee"));
    }

    let prevout = staking_tx
        .output
        .get(output_index as usize)
        .ok_or(Error::MissingOutput(output_index))?;

    let value = prevout
        .value
        .checked_sub(fee)
        .ok_or(Error::InsufficientFunds {
            available: prevout.value,
            required: fee,
        })?;

    let (leaf_script, control_block) = staking_output.unbonding_spend_info();

    let mut psbt = Psbt::from_unsigned_tx(Transaction {
        version: transaction::Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: staking_tx.compute_txid(),
                vout: output_index,
            },
            ..Default::default()
        }],
        output: vec![TxOut {
            value,
            script_pubkey: unbonding_output.script_pubkey(),
        }],
    })?;

    let psbt_input = &mut psbt.inputs[0];
    psbt_input.witness_utxo = Some(prevout.clone());
    psbt_input.tap_internal_key = Some(crate::unspendable_internal_key());
    psbt_input.tap_scripts = BTreeMap::from_iter([(
        control_block,
        (leaf_script, LeafVersion::TapScript),
    )]);

    tracing::debug!(
        txid = %psbt.unsigned_tx.compute_txid(),
        %value,
        %fee,
        "Built unbonding transaction"
    );

    Ok(psbt)
}
