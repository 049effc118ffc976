use crate::Error;
use bitcoin::opcodes::all::*;
use bitcoin::script::Instruction;
use bitcoin::script::PushBytesBuf;
use bitcoin::Script;
use bitcoin::ScriptBuf;
use bitcoin::XOnlyPublicKey;

/// Version byte embedded in the OP_RETURN data-carrier payload.
pub const DATA_EMBED_VERSION: u8 = 0;

/// Longest magic tag that keeps the data-carrier payload within the 520-byte maximum script
/// element size, after the version byte, the two keys and the timelock take their share.
pub const MAX_MAGIC_BYTES_LEN: usize = 520 - (1 + 32 + 32 + 2);

/// The five Tapscripts guarding a staking instance.
///
/// `timelock_script`, `unbonding_script` and `slashing_script` are the leaves of the staking
/// output; `slashing_script` and `unbonding_timelock_script` are the leaves of the unbonding
/// output. `data_embed_script` is the OP_RETURN identification output of the staking transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingScripts {
    pub timelock_script: ScriptBuf,
    pub unbonding_script: ScriptBuf,
    pub slashing_script: ScriptBuf,
    pub unbonding_timelock_script: ScriptBuf,
    pub data_embed_script: ScriptBuf,
}

/// A [`ScriptBuf`] requiring a signature for `pk`.
///
/// With `verify` the script is meant to be followed by further conditions, so it consumes the
/// result with `OP_CHECKSIGVERIFY` instead of leaving it on the stack.
pub fn single_key_script(pk: XOnlyPublicKey, verify: bool) -> ScriptBuf {
    ScriptBuf::builder()
        .push_x_only_key(&pk)
        .push_opcode(if verify { OP_CHECKSIGVERIFY } else { OP_CHECKSIG })
        .into_script()
}

/// A `threshold`-of-`pks` multisignature [`ScriptBuf`] in the `multi_a` shape used by Tapscript:
/// the first key is checked with `OP_CHECKSIG`, every further key with `OP_CHECKSIGADD`, and the
/// accumulated count is compared against `threshold`.
///
/// Keys are sorted ascending by their 32-byte serialization so that the same key set always
/// compiles to the same script. A key set with duplicates is rejected.
pub fn multi_key_script(
    pks: &[XOnlyPublicKey],
    threshold: u32,
    verify: bool,
) -> Result<ScriptBuf, Error> {
    if pks.is_empty() {
        return Err(Error::NoKeys);
    }

    if threshold as usize > pks.len() {
        return Err(Error::ThresholdTooLarge {
            threshold,
            keys: pks.len(),
        });
    }

    if pks.len() == 1 {
        return Ok(single_key_script(pks[0], verify));
    }

    let mut sorted = pks.to_vec();
    sorted.sort_by_key(|pk| pk.serialize());

    if sorted.windows(2).any(|pair| pair[0] == pair[1]) {
        return Err(Error::DuplicateKeys);
    }

    let mut builder = ScriptBuf::builder();
    for (i, pk) in sorted.iter().enumerate() {
        builder = builder.push_x_only_key(pk);
        builder = builder.push_opcode(if i == 0 { OP_CHECKSIG } else { OP_CHECKSIGADD });
    }

    tracing::trace!(
        keys = sorted.len(),
        threshold,
        verify,
        "Assembled multisignature script"
    );

    Ok(builder
        .push_int(i64::from(threshold))
        .push_opcode(if verify { OP_NUMEQUALVERIFY } else { OP_NUMEQUAL })
        .into_script())
}

/// A [`ScriptBuf`] allowing the owner of `pk` to spend after `lock` blocks have passed from the
/// time the corresponding output was included in a block.
pub fn timelock_script(pk: XOnlyPublicKey, lock: u16) -> ScriptBuf {
    ScriptBuf::builder()
        .push_x_only_key(&pk)
        .push_opcode(OP_CHECKSIGVERIFY)
        .push_int(i64::from(lock))
        .push_opcode(OP_CSV)
        .into_script()
}

/// The OP_RETURN script identifying a staking transaction on-chain.
///
/// The payload is pushed as a single element:
/// `magic_bytes || version || staker_pk || finality_provider_pk || staking_timelock (big endian)`.
///
/// Magic tags longer than [`MAX_MAGIC_BYTES_LEN`] would not fit that single element and are
/// rejected.
pub fn data_embed_script(
    magic_bytes: &[u8],
    staker_pk: XOnlyPublicKey,
    finality_provider_pk: XOnlyPublicKey,
    staking_timelock: u16,
) -> Result<ScriptBuf, Error> {
    if magic_bytes.len() > MAX_MAGIC_BYTES_LEN {
        return Err(Error::MagicBytesTooLong {
            len: magic_bytes.len(),
            max: MAX_MAGIC_BYTES_LEN,
        });
    }

    let mut data = PushBytesBuf::new();

    data.extend_from_slice(magic_bytes)
        .expect("bounded magic bytes fit a push");
    data.extend_from_slice(&[DATA_EMBED_VERSION])
        .expect("version byte fits a push");
    data.extend_from_slice(&staker_pk.serialize())
        .expect("staker key fits a push");
    data.extend_from_slice(&finality_provider_pk.serialize())
        .expect("finality provider key fits a push");
    data.extend_from_slice(&staking_timelock.to_be_bytes())
        .expect("timelock fits a push");

    tracing::trace!(
        payload = data.len(),
        "Assembled data-carrier script"
    );

    Ok(ScriptBuf::builder()
        .push_opcode(OP_RETURN)
        .push_slice(data)
        .into_script())
}

/// Read the relative lock back out of a script produced by [`timelock_script`].
///
/// The whole script shape is checked, so this doubles as the validator for withdrawal leaves:
/// anything that is not `<pk> OP_CHECKSIGVERIFY <lock> OP_CSV` with a minimally encoded lock is
/// rejected.
pub fn extract_timelock_from_script(script: &Script) -> Result<u16, Error> {
    let instructions = script
        .instructions()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| Error::InvalidTimelockScript)?;

    let lock = match instructions.as_slice() {
        [Instruction::PushBytes(pk), Instruction::Op(OP_CHECKSIGVERIFY), lock, Instruction::Op(OP_CSV)]
            if pk.len() == 32 =>
        {
            lock
        }
        _ => return Err(Error::InvalidTimelockScript),
    };

    match lock {
        // Locks up to 16 are a single small-number opcode.
        Instruction::Op(op) => {
            let raw = op.to_u8();
            if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&raw) {
                Ok(u16::from(raw - OP_PUSHNUM_1.to_u8()) + 1)
            } else {
                Err(Error::InvalidTimelockScript)
            }
        }
        // Larger locks are a minimal little-endian script number push.
        Instruction::PushBytes(bytes) => decode_minimal_script_num(bytes.as_bytes()),
    }
}

fn decode_minimal_script_num(bytes: &[u8]) -> Result<u16, Error> {
    let (&last, _) = match bytes.split_last() {
        Some(parts) => parts,
        None => return Err(Error::InvalidTimelockScript),
    };

    // A u16 lock needs at most three bytes (two magnitude bytes plus a sign byte). The sign bit
    // must be clear and values below 17 must have been encoded as a small-number opcode.
    if bytes.len() > 3 || last & 0x80 != 0 {
        return Err(Error::InvalidTimelockScript);
    }

    let mut value: u32 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        value |= u32::from(*byte) << (8 * i);
    }

    if !(17..=u32::from(u16::MAX)).contains(&value) {
        return Err(Error::InvalidTimelockScript);
    }

    Ok(value as u16)
}
