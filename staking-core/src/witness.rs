use bitcoin::secp256k1::schnorr;
use bitcoin::Witness;
use bitcoin::XOnlyPublicKey;

/// A covenant member's Schnorr signature over a spend, tagged with the signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CovenantSignature {
    pub pk: XOnlyPublicKey,
    pub sig: schnorr::Signature,
}

impl CovenantSignature {
    pub fn new(pk: XOnlyPublicKey, sig: schnorr::Signature) -> Self {
        Self { pk, sig }
    }
}

/// Interleave covenant signatures into an existing witness stack.
///
/// A `multi_a` script checks keys from the top of the stack down, so signatures must appear in
/// descending key order, with an empty element for every covenant member that did not sign. The
/// composed block goes in front of `original_witness`, which already carries the remaining
/// signatures plus the leaf script and control block.
///
/// If a key signed more than once, the first match wins.
pub fn create_covenant_witness(
    original_witness: Witness,
    covenant_pks: &[XOnlyPublicKey],
    covenant_sigs: &[CovenantSignature],
) -> Witness {
    let mut sorted = covenant_pks.to_vec();
    sorted.sort_by(|a, b| b.serialize().cmp(&a.serialize()));

    let mut stack: Vec<Vec<u8>> = Vec::with_capacity(sorted.len() + original_witness.len());

    for pk in &sorted {
        match covenant_sigs.iter().find(|covenant_sig| covenant_sig.pk == *pk) {
            Some(covenant_sig) => stack.push(covenant_sig.sig.serialize().to_vec()),
            None => stack.push(Vec::new()),
        }
    }

    stack.extend(original_witness.iter().map(|element| element.to_vec()));

    Witness::from_slice(&stack)
}
