//! Black-box signature key recovery.

use crate::error::AuthorityError;
use helicon_types::{AccountName, Digest, PublicKey, Signature};
use std::collections::BTreeSet;

/// Recovers the public key that produced a signature over a digest.
///
/// Implemented by the surrounding node on top of its ECDSA library; the
/// core never touches curve math.
pub trait KeyRecovery {
    fn recover(&self, signature: &Signature, digest: &Digest) -> PublicKey;
}

/// A dedicated tenant signature attached to a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantSignature {
    pub tenant: AccountName,
    pub signature: Signature,
}

/// Recover the signer key set of a transaction.
///
/// Two signatures recovering to the same key are redundant and rejected
/// with [`AuthorityError::DuplicateSignature`].
pub fn recover_signature_keys(
    digest: &Digest,
    signatures: &[Signature],
    recovery: &dyn KeyRecovery,
) -> Result<BTreeSet<PublicKey>, AuthorityError> {
    let mut keys = BTreeSet::new();
    for signature in signatures {
        if !keys.insert(recovery.recover(signature, digest)) {
            return Err(AuthorityError::DuplicateSignature);
        }
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Recovery fake: the key is the first signature byte repeated.
    struct ByteRecovery;

    impl KeyRecovery for ByteRecovery {
        fn recover(&self, signature: &Signature, _digest: &Digest) -> PublicKey {
            PublicKey::from_bytes([signature.0[0]; 33])
        }
    }

    fn sig(n: u8) -> Signature {
        Signature::from_bytes([n; 65])
    }

    #[test]
    fn test_recover_distinct_keys() {
        let digest = Digest::default();
        let keys = recover_signature_keys(&digest, &[sig(1), sig(2)], &ByteRecovery).unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_duplicate_signature_rejected() {
        let digest = Digest::default();
        let mut other = sig(1);
        other.0[64] = 9; // different bytes, same recovered key
        let result = recover_signature_keys(&digest, &[sig(1), other], &ByteRecovery);
        assert_eq!(result, Err(AuthorityError::DuplicateSignature));
    }
}
