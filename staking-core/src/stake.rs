use crate::Error;
use crate::StakingOutput;
use bitcoin::absolute::LockTime;
use bitcoin::address::NetworkUnchecked;
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
use bitcoin::XOnlyPublicKey;

/// A confirmed output the caller wants to stake from.
///
/// Inputs are caller-chosen; no coin selection happens here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingUtxo {
    /// The location of this UTXO in the blockchain.
    pub outpoint: OutPoint,
    /// The script of the spent output, recorded as the PSBT witness UTXO.
    pub script_pubkey: ScriptBuf,
    /// The amount of coins locked in the UTXO.
    pub value: Amount,
}

/// Build the transaction that locks `amount` into the staking output.
///
/// Outputs are ordered staking first, then the optional zero-value data-carrier, then change.
/// The change output is omitted when the inputs cover `amount + fee` exactly.
///
/// When `staker_pk` is set, every input is annotated with it as the Taproot internal key so that
/// a Taproot wallet can recognize and sign its own inputs.
#[allow(clippy::too_many_arguments)]
pub fn create_staking_transaction(
    staking_output: &StakingOutput,
    amount: Amount,
    fee: Amount,
    change_address: Address<NetworkUnchecked>,
    funding_utxos: &[FundingUtxo],
    network: Network,
    staker_pk: Option<XOnlyPublicKey>,
    data_embed_script: Option<&ScriptBuf>,
) -> Result<Psbt, Error> {
    if amount == Amount::ZERO {
        return Err(Error::NonPositiveValue("staking amount"));
    }

    if fee == Amount::ZERO {
        return Err(Error::NonPositiveValue("staking fee"));
    }

    let change_address = change_address
        .require_network(network)
        .map_err(Error::InvalidChangeAddress)?;

    let available: Amount = funding_utxos.iter().map(|utxo| utxo.value).sum();
    let required = amount + fee;

    if available < required {
        return Err(Error::InsufficientFunds {
            available,
            required,
        });
    }

    let input = funding_utxos
        .iter()
        .map(|utxo| TxIn {
            previous_output: utxo.outpoint,
            ..Default::default()
        })
        .collect();

    let mut output = vec![TxOut {
        value: amount,
        script_pubkey: staking_output.script_pubkey(),
    }];

    if let Some(script) = data_embed_script {
        output.push(TxOut {
            value: Amount::ZERO,
            script_pubkey: script.clone(),
        });
    }

    let change = available - required;
    if change > Amount::ZERO {
        output.push(TxOut {
            value: change,
            script_pubkey: change_address.script_pubkey(),
        });
    }

    let mut psbt = Psbt::from_unsigned_tx(Transaction {
        version: transaction::Version::TWO,
        lock_time: LockTime::ZERO,
        input,
        output,
    })?;

    for (i, psbt_input) in psbt.inputs.iter_mut().enumerate() {
        psbt_input.witness_utxo = Some(TxOut {
            value: funding_utxos[i].value,
            script_pubkey: funding_utxos[i].script_pubkey.clone(),
        });
        psbt_input.tap_internal_key = staker_pk;
    }

    tracing::debug!(
        txid = %psbt.unsigned_tx.compute_txid(),
        %amount,
        %fee,
        %change,
        "Built staking transaction"
    );

    Ok(psbt)
}
