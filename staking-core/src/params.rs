use crate::script;
use crate::Error;
use crate::StakingScripts;
use bitcoin::ScriptBuf;
use bitcoin::XOnlyPublicKey;

/// The validated parameter bundle of one staking instance.
///
/// All scripts of the instance derive deterministically from these fields, so two parties holding
/// the same parameters compute the same Taproot addresses and transactions. The bundle is
/// immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingParams {
    staker_pk: XOnlyPublicKey,
    finality_provider_pks: Vec<XOnlyPublicKey>,
    covenant_pks: Vec<XOnlyPublicKey>,
    covenant_threshold: u32,
    staking_timelock: u16,
    unbonding_timelock: u16,
    magic_bytes: Vec<u8>,
}

impl StakingParams {
    /// Validate and build a parameter bundle.
    ///
    /// The finality provider and covenant key lists must be non-empty, the covenant threshold
    /// must be in `1..=covenant_pks.len()` and both timelocks must be at least one block. The
    /// magic bytes identify the protocol instance inside the OP_RETURN output and must not be
    /// empty.
    pub fn new(
        staker_pk: XOnlyPublicKey,
        finality_provider_pks: Vec<XOnlyPublicKey>,
        covenant_pks: Vec<XOnlyPublicKey>,
        covenant_threshold: u32,
        staking_timelock: u16,
        unbonding_timelock: u16,
        magic_bytes: Vec<u8>,
    ) -> Result<Self, Error> {
        if finality_provider_pks.is_empty() {
            return Err(Error::MissingRequiredInput("finality provider keys"));
        }

        if covenant_pks.is_empty() {
            return Err(Error::MissingRequiredInput("covenant keys"));
        }

        if covenant_threshold == 0 {
            return Err(Error::MissingRequiredInput("covenant threshold"));
        }

        if covenant_threshold as usize > covenant_pks.len() {
            return Err(Error::ThresholdTooLarge {
                threshold: covenant_threshold,
                keys: covenant_pks.len(),
            });
        }

        if staking_timelock == 0 {
            return Err(Error::MissingRequiredInput("staking timelock"));
        }

        if unbonding_timelock == 0 {
            return Err(Error::MissingRequiredInput("unbonding timelock"));
        }

        if magic_bytes.is_empty() {
            return Err(Error::MissingRequiredInput("magic bytes"));
        }

        if magic_bytes.len() > script::MAX_MAGIC_BYTES_LEN {
            return Err(Error::MagicBytesTooLong {
                len: magic_bytes.len(),
                max: script::MAX_MAGIC_BYTES_LEN,
            });
        }

        Ok(Self {
            staker_pk,
            finality_provider_pks,
            covenant_pks,
            covenant_threshold,
            staking_timelock,
            unbonding_timelock,
            magic_bytes,
        })
    }

    pub fn staker_pk(&self) -> XOnlyPublicKey {
        self.staker_pk
    }

    pub fn covenant_pks(&self) -> &[XOnlyPublicKey] {
        &self.covenant_pks
    }

    pub fn staking_timelock(&self) -> u16 {
        self.staking_timelock
    }

    pub fn unbonding_timelock(&self) -> u16 {
        self.unbonding_timelock
    }

    /// The timelock leaf of the staking output: the staker alone, after `staking_timelock`.
    pub fn build_staking_timelock_script(&self) -> ScriptBuf {
        script::timelock_script(self.staker_pk, self.staking_timelock)
    }

    /// The timelock leaf of the unbonding output: the staker alone, after `unbonding_timelock`.
    pub fn build_unbonding_timelock_script(&self) -> ScriptBuf {
        script::timelock_script(self.staker_pk, self.unbonding_timelock)
    }

    /// The unbonding leaf of the staking output: the staker together with a covenant quorum.
    pub fn build_unbonding_script(&self) -> Result<ScriptBuf, Error> {
        let mut bytes = script::single_key_script(self.staker_pk, true).into_bytes();
        bytes.extend(
            script::multi_key_script(&self.covenant_pks, self.covenant_threshold, false)?
                .into_bytes(),
        );

        Ok(ScriptBuf::from_bytes(bytes))
    }

    /// The slashing leaf shared by the staking and unbonding outputs: the staker, one finality
    /// provider and a covenant quorum must all sign.
    pub fn build_slashing_script(&self) -> Result<ScriptBuf, Error> {
        let mut bytes = script::single_key_script(self.staker_pk, true).into_bytes();
        bytes.extend(script::multi_key_script(&self.finality_provider_pks, 1, true)?.into_bytes());
        bytes.extend(
            script::multi_key_script(&self.covenant_pks, self.covenant_threshold, false)?
                .into_bytes(),
        );

        Ok(ScriptBuf::from_bytes(bytes))
    }

    /// The OP_RETURN output script identifying this staking instance on-chain.
    ///
    /// Only the first finality provider key is embedded.
    pub fn build_data_embed_script(&self) -> Result<ScriptBuf, Error> {
        script::data_embed_script(
            &self.magic_bytes,
            self.staker_pk,
            self.finality_provider_pks[0],
            self.staking_timelock,
        )
    }

    /// Compile all five scripts of this staking instance.
    pub fn build_scripts(&self) -> Result<StakingScripts, Error> {
        tracing::trace!(
            staker_pk = %self.staker_pk,
            covenant_keys = self.covenant_pks.len(),
            "Compiling staking scripts"
        );

        Ok(StakingScripts {
            timelock_script: self.build_staking_timelock_script(),
            unbonding_script: self.build_unbonding_script()?,
            slashing_script: self.build_slashing_script()?,
            unbonding_timelock_script: self.build_unbonding_timelock_script(),
            data_embed_script: self.build_data_embed_script()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::key::Keypair;
    use bitcoin::key::Secp256k1;
    use bitcoin::secp256k1::SecretKey;

    fn pk(byte: u8) -> XOnlyPublicKey {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[byte; 32]).expect("valid secret key");

        Keypair::from_secret_key(&secp, &sk).x_only_public_key().0
    }

    fn params() -> StakingParams {
        StakingParams::new(
            pk(1),
            vec![pk(2)],
            vec![pk(3), pk(4)],
            1,
            144,
            72,
            b"bbn4".to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn build_scripts_is_deterministic() {
        let scripts = params().build_scripts().unwrap();
        let again = params().build_scripts().unwrap();

        assert_eq!(scripts, again);
    }

    #[test]
    fn covenant_key_order_does_not_matter() {
        let scripts = params().build_scripts().unwrap();

        let shuffled = StakingParams::new(
            pk(1),
            vec![pk(2)],
            vec![pk(4), pk(3)],
            1,
            144,
            72,
            b"bbn4".to_vec(),
        )
        .unwrap()
        .build_scripts()
        .unwrap();

        assert_eq!(scripts, shuffled);
    }

    #[test]
    fn duplicate_covenant_keys_are_rejected_at_compile_time() {
        let params = StakingParams::new(
            pk(1),
            vec![pk(2)],
            vec![pk(3), pk(3)],
            2,
            144,
            72,
            b"bbn4".to_vec(),
        )
        .unwrap();

        assert!(matches!(params.build_scripts(), Err(Error::DuplicateKeys)));
    }

    #[test]
    fn construction_rejects_missing_inputs() {
        assert!(matches!(
            StakingParams::new(pk(1), vec![], vec![pk(3)], 1, 144, 72, b"bbn4".to_vec()),
            Err(Error::MissingRequiredInput("finality provider keys"))
        ));
        assert!(matches!(
            StakingParams::new(pk(1), vec![pk(2)], vec![], 1, 144, 72, b"bbn4".to_vec()),
            Err(Error::MissingRequiredInput("covenant keys"))
        ));
        assert!(matches!(
            StakingParams::new(pk(1), vec![pk(2)], vec![pk(3)], 0, 144, 72, b"bbn4".to_vec()),
            Err(Error::MissingRequiredInput("covenant threshold"))
        ));
        assert!(matches!(
            StakingParams::new(pk(1), vec![pk(2)], vec![pk(3)], 1, 0, 72, b"bbn4".to_vec()),
            Err(Error::MissingRequiredInput("staking timelock"))
        ));
        assert!(matches!(
            StakingParams::new(pk(1), vec![pk(2)], vec![pk(3)], 1, 144, 0, b"bbn4".to_vec()),
            Err(Error::MissingRequiredInput("unbonding timelock"))
        ));
        assert!(matches!(
            StakingParams::new(pk(1), vec![pk(2)], vec![pk(3)], 1, 144, 72, Vec::new()),
            Err(Error::MissingRequiredInput("magic bytes"))
        ));
    }

    #[test]
    fn construction_rejects_oversized_magic_bytes() {
        let too_long = vec![0xaa; script::MAX_MAGIC_BYTES_LEN + 1];

        assert!(matches!(
            StakingParams::new(pk(1), vec![pk(2)], vec![pk(3)], 1, 144, 72, too_long),
            Err(Error::MagicBytesTooLong { .. })
        ));
    }

    #[test]
    fn construction_rejects_oversized_threshold() {
        assert!(matches!(
            StakingParams::new(pk(1), vec![pk(2)], vec![pk(3)], 2, 144, 72, b"bbn4".to_vec()),
            Err(Error::ThresholdTooLarge { threshold: 2, keys: 1 })
        ));
    }

    #[test]
    fn slashing_script_concatenates_the_three_predicates() {
        let params = params();
        let slashing = params.build_slashing_script().unwrap();

        let mut expected = script::single_key_script(pk(1), true).into_bytes();
        expected.extend(script::multi_key_script(&[pk(2)], 1, true).unwrap().into_bytes());
        expected.extend(
            script::multi_key_script(&[pk(3), pk(4)], 1, false)
                .unwrap()
                .into_bytes(),
        );

        assert_eq!(slashing.as_bytes(), expected.as_slice());
    }
}
