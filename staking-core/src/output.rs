use crate::unspendable_internal_key;
use crate::StakingScripts;
use bitcoin::key::Secp256k1;
use bitcoin::key::Verification;
use bitcoin::taproot;
use bitcoin::taproot::LeafVersion;
use bitcoin::taproot::TaprootBuilder;
use bitcoin::taproot::TaprootSpendInfo;
use bitcoin::Address;
use bitcoin::Network;
use bitcoin::ScriptBuf;

/// All the information needed to fund and spend the staking output.
///
/// The output commits to three leaves: the slashing script at depth one, and the unbonding and
/// timelock scripts sharing the deeper subtree. The internal key is unspendable, so every spend
/// goes through one of the leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct StakingOutput {
    spend_info: TaprootSpendInfo,
    address: Address,
    timelock_script: ScriptBuf,
    unbonding_script: ScriptBuf,
    slashing_script: ScriptBuf,
}

impl StakingOutput {
    pub fn new<C>(secp: &Secp256k1<C>, scripts: &StakingScripts, network: Network) -> Self
    where
        C: Verification,
    {
        let spend_info = TaprootBuilder::new()
            .add_leaf(1, scripts.slashing_script.clone())
            .expect("valid slashing leaf")
            .add_leaf(2, scripts.unbonding_script.clone())
            .expect("valid unbonding leaf")
            .add_leaf(2, scripts.timelock_script.clone())
            .expect("valid timelock leaf")
            .finalize(secp, unspendable_internal_key())
            .expect("can be finalized");

        let script_pubkey = ScriptBuf::new_p2tr_tweaked(spend_info.output_key());
        let address = Address::from_script(&script_pubkey, network).expect("valid script");

        Self {
            spend_info,
            address,
            timelock_script: scripts.timelock_script.clone(),
            unbonding_script: scripts.unbonding_script.clone(),
            slashing_script: scripts.slashing_script.clone(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }

    pub fn spend_info(&self) -> &TaprootSpendInfo {
        &self.spend_info
    }

    /// The spend info for the timelock branch: staker withdrawal after the staking period.
    pub fn timelock_spend_info(&self) -> (ScriptBuf, taproot::ControlBlock) {
        let control_block = self
            .spend_info
            .control_block(&(self.timelock_script.clone(), LeafVersion::TapScript))
            .expect("timelock script");

        (self.timelock_script.clone(), control_block)
    }

    /// The spend info for the unbonding branch: transition to the unbonding output.
    pub fn unbonding_spend_info(&self) -> (ScriptBuf, taproot::ControlBlock) {
        let control_block = self
            .spend_info
            .control_block(&(self.unbonding_script.clone(), LeafVersion::TapScript))
            .expect("unbonding script");

        (self.unbonding_script.clone(), control_block)
    }

    /// The spend info for the slashing branch.
    pub fn slashing_spend_info(&self) -> (ScriptBuf, taproot::ControlBlock) {
        let control_block = self
            .spend_info
            .control_block(&(self.slashing_script.clone(), LeafVersion::TapScript))
            .expect("slashing script");

        (self.slashing_script.clone(), control_block)
    }

    pub fn tapscripts(&self) -> Vec<ScriptBuf> {
        vec![
            self.slashing_script.clone(),
            self.unbonding_script.clone(),
            self.timelock_script.clone(),
        ]
    }
}

/// All the information needed to fund and spend the unbonding output.
///
/// Two leaves at depth one: the slashing script and the shorter unbonding timelock script.
#[derive(Debug, Clone, PartialEq)]
pub struct UnbondingOutput {
    spend_info: TaprootSpendInfo,
    address: Address,
    unbonding_timelock_script: ScriptBuf,
    slashing_script: ScriptBuf,
}

impl UnbondingOutput {
    pub fn new<C>(secp: &Secp256k1<C>, scripts: &StakingScripts, network: Network) -> Self
    where
        C: Verification,
    {
        let spend_info = TaprootBuilder::new()
            .add_leaf(1, scripts.slashing_script.clone())
            .expect("valid slashing leaf")
            .add_leaf(1, scripts.unbonding_timelock_script.clone())
            .expect("valid unbonding timelock leaf")
            .finalize(secp, unspendable_internal_key())
            .expect("can be finalized");

        let script_pubkey = ScriptBuf::new_p2tr_tweaked(spend_info.output_key());
        let address = Address::from_script(&script_pubkey, network).expect("valid script");

        Self {
            spend_info,
            address,
            unbonding_timelock_script: scripts.unbonding_timelock_script.clone(),
            slashing_script: scripts.slashing_script.clone(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }

    pub fn spend_info(&self) -> &TaprootSpendInfo {
        &self.spend_info
    }

    /// The spend info for the timelock branch: staker withdrawal after the unbonding period.
    pub fn timelock_spend_info(&self) -> (ScriptBuf, taproot::ControlBlock) {
        let control_block = self
            .spend_info
            .control_block(&(self.unbonding_timelock_script.clone(), LeafVersion::TapScript))
            .expect("unbonding timelock script");

        (self.unbonding_timelock_script.clone(), control_block)
    }

    /// The spend info for the slashing branch.
    pub fn slashing_spend_info(&self) -> (ScriptBuf, taproot::ControlBlock) {
        let control_block = self
            .spend_info
            .control_block(&(self.slashing_script.clone(), LeafVersion::TapScript))
            .expect("slashing script");

        (self.slashing_script.clone(), control_block)
    }
}

/// The change output of a slashing transaction: a single leaf locking the residual value under
/// the unbonding timelock.
#[derive(Debug, Clone, PartialEq)]
pub struct SlashingChangeOutput {
    spend_info: TaprootSpendInfo,
    address: Address,
    unbonding_timelock_script: ScriptBuf,
}

impl SlashingChangeOutput {
    pub fn new<C>(
        secp: &Secp256k1<C>,
        unbonding_timelock_script: ScriptBuf,
        network: Network,
    ) -> Self
    where
        C: Verification,
    {
        let spend_info = TaprootBuilder::new()
            .add_leaf(0, unbonding_timelock_script.clone())
            .expect("valid unbonding timelock leaf")
            .finalize(secp, unspendable_internal_key())
            .expect("can be finalized");

        let script_pubkey = ScriptBuf::new_p2tr_tweaked(spend_info.output_key());
        let address = Address::from_script(&script_pubkey, network).expect("valid script");

        Self {
            spend_info,
            address,
            unbonding_timelock_script,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }

    /// The spend info for the only branch: staker withdrawal after the unbonding period.
    pub fn timelock_spend_info(&self) -> (ScriptBuf, taproot::ControlBlock) {
        let control_block = self
            .spend_info
            .control_block(&(self.unbonding_timelock_script.clone(), LeafVersion::TapScript))
            .expect("unbonding timelock script");

        (self.unbonding_timelock_script.clone(), control_block)
    }
}
