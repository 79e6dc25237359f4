//! `PassphraseVerifier`: constant-time fingerprint comparison. Grounded
//! on `subtle::ConstantTimeEq` usage in
//! joshuapetersen-Sarah-John-Genesis's `lib-crypto`/`lib-network` crates.
//!
//! Never logs, persists outside the session's in-memory record, or
//! transmits a fingerprint back to a client.

use subtle::ConstantTimeEq;

use veilshare_protocol::Fingerprint;

/// Returns `true` iff `candidate` equals `stored`, in time independent of
/// where the two first differ.
pub fn fingerprints_match(candidate: &Fingerprint, stored: &Fingerprint) -> bool {
    let a = candidate.as_bytes();
    let b = stored.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(&b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(iv: u8, data: u8) -> Fingerprint {
        Fingerprint { iv: vec![iv; 12], data: vec![data; 16] }
    }

    #[test]
    fn identical_fingerprints_match() {
        assert!(fingerprints_match(&fp(1, 2), &fp(1, 2)));
    }

    #[test]
    fn differing_fingerprints_do_not_match() {
        assert!(!fingerprints_match(&fp(1, 2), &fp(1, 3)));
    }

    #[test]
    fn differing_lengths_do_not_match() {
        let short = Fingerprint { iv: vec![1; 12], data: vec![2; 8] };
        assert!(!fingerprints_match(&short, &fp(1, 2)));
    }
}
