use crate::script::extract_timelock_from_script;
use crate::unspendable_internal_key;
use crate::Error;
use crate::StakingOutput;
use crate::UnbondingOutput;
use bitcoin::absolute::LockTime;
use bitcoin::address::NetworkUnchecked;
use bitcoin::taproot::ControlBlock;
use bitcoin::taproot::LeafVersion;
use bitcoin::transaction;
use bitcoin::Address;
use bitcoin::Amount;
use bitcoin::Network;
use bitcoin::OutPoint;
use bitcoin::Psbt;
use bitcoin::ScriptBuf;
use bitcoin::Sequence;
use bitcoin::Transaction;
use bitcoin::TxIn;
use bitcoin::TxOut;
use std::collections::BTreeMap;

/// Build a transaction spending a timelock leaf of `prev_tx` to `withdrawal_address`.
///
/// The relative lock is read back out of the leaf script and becomes the input sequence, which is
/// what makes `OP_CHECKSEQUENCEVERIFY` pass once the lock has matured. The transaction drains the
/// spent output minus `fee` into a single output.
pub fn create_withdrawal_transaction(
    spend_info: (ScriptBuf, ControlBlock),
    prev_tx: &Transaction,
    withdrawal_address: Address<NetworkUnchecked>,
    network: Network,
    fee: Amount,
    output_index: u32,
) -> Result<Psbt, Error> {
    if fee == Amount::ZERO {
        return Err(Error::NonPositiveValue("withdrawal fee"));
    }

    let withdrawal_address = withdrawal_address
        .require_network(network)
        .map_err(Error::InvalidAddress)?;

    let (leaf_script, control_block) = spend_info;
    let timelock = extract_timelock_from_script(&leaf_script)?;

    let prevout = prev_tx
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

    let mut psbt = Psbt::from_unsigned_tx(Transaction {
        // Version two is required for OP_CHECKSEQUENCEVERIFY to be enforced.
        version: transaction::Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: prev_tx.compute_txid(),
                vout: output_index,
            },
            sequence: Sequence::from_consensus(u32::from(timelock)),
            ..Default::default()
        }],
        output: vec![TxOut {
            value,
            script_pubkey: withdrawal_address.script_pubkey(),
        }],
    })?;

    let psbt_input = &mut psbt.inputs[0];
    psbt_input.witness_utxo = Some(prevout.clone());
    psbt_input.tap_internal_key = Some(unspendable_internal_key());
    psbt_input.tap_scripts = BTreeMap::from_iter([(
        control_block,
        (leaf_script, LeafVersion::TapScript),
    )]);

    tracing::debug!(
        txid = %psbt.unsigned_tx.compute_txid(),
        timelock,
        %fee,
        "Built withdrawal transaction"
    );

    Ok(psbt)
}

/// Withdraw from the staking output via its timelock leaf, after the staking period.
pub fn create_timelock_withdrawal_transaction(
    staking_output: &StakingOutput,
    prev_tx: &Transaction,
    withdrawal_address: Address<NetworkUnchecked>,
    network: Network,
    fee: Amount,
    output_index: u32,
) -> Result<Psbt, Error> {
    create_withdrawal_transaction(
        staking_output.timelock_spend_info(),
        prev_tx,
        withdrawal_address,
        network,
        fee,
        output_index,
    )
}

/// Withdraw from the unbonding output via its timelock leaf, after the unbonding period.
pub fn create_early_unbonded_withdrawal_transaction(
    unbonding_output: &UnbondingOutput,
    prev_tx: &Transaction,
    withdrawal_address: Address<NetworkUnchecked>,
    network: Network,
    fee: Amount,
    output_index: u32,
) -> Result<Psbt, Error> {
    create_withdrawal_transaction(
        unbonding_output.timelock_spend_info(),
        prev_tx,
        withdrawal_address,
        network,
        fee,
        output_index,
    )
}
