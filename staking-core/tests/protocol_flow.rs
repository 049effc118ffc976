#![allow(clippy::unwrap_used)]

use bitcoin::address::NetworkUnchecked;
use bitcoin::hashes::Hash;
use bitcoin::key::Keypair;
use bitcoin::key::Secp256k1;
use bitcoin::secp256k1::Message;
use bitcoin::secp256k1::SecretKey;
use bitcoin::Address;
use bitcoin::Amount;
use bitcoin::Network;
use bitcoin::OutPoint;
use bitcoin::Sequence;
use bitcoin::Txid;
use bitcoin::Witness;
use bitcoin::XOnlyPublicKey;
use staking_core::slash::create_slashing_transaction;
use staking_core::stake::create_staking_transaction;
use staking_core::stake::FundingUtxo;
use staking_core::unbond::create_unbonding_transaction;
use staking_core::withdraw::create_early_unbonded_withdrawal_transaction;
use staking_core::withdraw::create_timelock_withdrawal_transaction;
use staking_core::witness::create_covenant_witness;
use staking_core::witness::CovenantSignature;
use staking_core::StakingOutput;
use staking_core::StakingParams;
use staking_core::UnbondingOutput;

const STAKING_TIMELOCK: u16 = 144;
const UNBONDING_TIMELOCK: u16 = 72;

fn keypair(byte: u8) -> Keypair {
    let secp = Secp256k1::new();
    let sk = SecretKey::from_slice(&[byte; 32]).unwrap();

    Keypair::from_secret_key(&secp, &sk)
}

fn pk(byte: u8) -> XOnlyPublicKey {
    keypair(byte).x_only_public_key().0
}

fn address(byte: u8) -> Address<NetworkUnchecked> {
    let secp = Secp256k1::new();

    Address::p2tr(&secp, pk(byte), None, Network::Regtest)
        .as_unchecked()
        .clone()
}

fn params() -> StakingParams {
    StakingParams::new(
        pk(1),
        vec![pk(2)],
        vec![pk(3), pk(4), pk(5)],
        2,
        STAKING_TIMELOCK,
        UNBONDING_TIMELOCK,
        b"bbn4".to_vec(),
    )
    .unwrap()
}

/// Walks the whole lifecycle offline: stake, unbond, withdraw after unbonding, and the slashing
/// alternative, checking that every transaction spends exactly what its predecessor created.
#[test]
fn staking_lifecycle() {
    let secp = Secp256k1::new();

    let params = params();
    let scripts = params.build_scripts().unwrap();
    let staking_output = StakingOutput::new(&secp, &scripts, Network::Regtest);
    let unbonding_output = UnbondingOutput::new(&secp, &scripts, Network::Regtest);

    // Stake 90k out of a 100k UTXO.
    let staking_psbt = create_staking_transaction(
        &staking_output,
        Amount::from_sat(90_000),
        Amount::from_sat(500),
        address(9),
        &[FundingUtxo {
            outpoint: OutPoint {
                txid: Txid::all_zeros(),
                vout: 0,
            },
            script_pubkey: address(1)
                .require_network(Network::Regtest)
                .unwrap()
                .script_pubkey(),
            value: Amount::from_sat(100_000),
        }],
        Network::Regtest,
        Some(params.staker_pk()),
        Some(&scripts.data_embed_script),
    )
    .unwrap();

    let staking_tx = staking_psbt.unsigned_tx.clone();
    assert_eq!(staking_tx.output.len(), 3);
    assert_eq!(staking_tx.output[0].script_pubkey, staking_output.script_pubkey());
    assert_eq!(staking_tx.output[1].value, Amount::ZERO);

    // Unbond the full stake.
    let unbonding_psbt = create_unbonding_transaction(
        &staking_output,
        &unbonding_output,
        &staking_tx,
        Amount::from_sat(1_000),
        0,
    )
    .unwrap();

    let unbonding_tx = unbonding_psbt.unsigned_tx.clone();
    assert_eq!(unbonding_tx.output[0].value, Amount::from_sat(89_000));
    assert_eq!(
        unbonding_tx.input[0].previous_output.txid,
        staking_tx.compute_txid()
    );
    assert_eq!(
        unbonding_tx.output[0].script_pubkey,
        unbonding_output.script_pubkey()
    );

    // After the unbonding period, withdraw to a fresh address.
    let withdrawal_psbt = create_early_unbonded_withdrawal_transaction(
        &unbonding_output,
        &unbonding_tx,
        address(8),
        Network::Regtest,
        Amount::from_sat(1_000),
        0,
    )
    .unwrap();

    let withdrawal_tx = &withdrawal_psbt.unsigned_tx;
    assert_eq!(
        withdrawal_tx.input[0].sequence,
        Sequence::from_consensus(u32::from(UNBONDING_TIMELOCK))
    );
    assert_eq!(withdrawal_tx.output[0].value, Amount::from_sat(88_000));

    // Alternatively, withdraw straight from the staking output after the staking period.
    let timelock_psbt = create_timelock_withdrawal_transaction(
        &staking_output,
        &staking_tx,
        address(8),
        Network::Regtest,
        Amount::from_sat(1_000),
        0,
    )
    .unwrap();

    assert_eq!(
        timelock_psbt.unsigned_tx.input[0].sequence,
        Sequence::from_consensus(u32::from(STAKING_TIMELOCK))
    );

    // Or slash the staking output.
    let slashing_psbt = create_slashing_transaction(
        &secp,
        staking_output.slashing_spend_info(),
        &staking_tx,
        address(7),
        0.1,
        &scripts.unbonding_timelock_script,
        Amount::from_sat(1_000),
        Network::Regtest,
        0,
    )
    .unwrap();

    let slashing_tx = &slashing_psbt.unsigned_tx;
    let slashed: Amount = slashing_tx.output.iter().map(|out| out.value).sum();
    assert!(slashed + Amount::from_sat(1_000) <= staking_tx.output[0].value);
}

/// Covenant members sign independently; the witness composer must slot whatever subset arrives
/// into the right stack positions.
#[test]
fn covenant_witness_completes_an_unbonding_spend() {
    let covenant_keypairs = [keypair(3), keypair(4), keypair(5)];
    let covenant_pks = covenant_keypairs
        .iter()
        .map(|kp| kp.x_only_public_key().0)
        .collect::<Vec<_>>();

    let secp = Secp256k1::new();
    let msg = Message::from_digest([0x42; 32]);

    // Only two of three members responded; that meets the threshold of the test parameters.
    let covenant_sigs = covenant_keypairs[..2]
        .iter()
        .map(|kp| {
            CovenantSignature::new(
                kp.x_only_public_key().0,
                secp.sign_schnorr_no_aux_rand(&msg, kp),
            )
        })
        .collect::<Vec<_>>();

    let staker_sig = secp.sign_schnorr_no_aux_rand(&msg, &keypair(1));
    let original = Witness::from_slice(&[staker_sig.serialize().to_vec()]);

    let witness = create_covenant_witness(original, &covenant_pks, &covenant_sigs);

    assert_eq!(witness.len(), covenant_pks.len() + 1);

    let elements = witness.iter().collect::<Vec<_>>();
    let empty = elements
        .iter()
        .take(covenant_pks.len())
        .filter(|element| element.is_empty())
        .count();
    assert_eq!(empty, 1);
    assert_eq!(elements[covenant_pks.len()], staker_sig.serialize());
}
