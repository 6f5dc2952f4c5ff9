//! Attached signed messages: `signature || body`.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

use crate::error::{CryptoError, CryptoResult};

/// Length in bytes of an Ed25519 signature, and so of the prefix on every
/// signed message.
pub const SIGNATURE_LENGTH: usize = Signature::BYTE_SIZE;

pub(crate) fn attach(signer: &SigningKey, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(SIGNATURE_LENGTH.saturating_add(body.len()));
    out.extend_from_slice(&signer.sign(body).to_bytes());
    out.extend_from_slice(body);
    out
}

/// Check `signed` against `key` and borrow the body it carries.
///
/// Verification is strict, so small-order keys and malleated signatures
/// are refused.
pub(crate) fn detach<'a>(key: &[u8; 32], signed: &'a [u8]) -> CryptoResult<&'a [u8]> {
    let Some((sig, body)) = signed.split_first_chunk::<SIGNATURE_LENGTH>() else {
        return Err(CryptoError::TruncatedSignedMessage { len: signed.len() });
    };
    let key = VerifyingKey::from_bytes(key).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    key.verify_strict(body, &Signature::from_bytes(sig))
        .map_err(|_| CryptoError::SignatureVerificationFailed)?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;

    #[test]
    fn test_body_follows_signature() {
        let signer = SigningKey::generate(&mut OsRng);
        let signed = attach(&signer, b"alice");

        assert_eq!(signed.len(), SIGNATURE_LENGTH + 5);
        assert_eq!(&signed[SIGNATURE_LENGTH..], b"alice");
        assert_eq!(detach(signer.verifying_key().as_bytes(), &signed).unwrap(), b"alice");
    }

    #[test]
    fn test_signature_bytes_are_checked() {
        let signer = SigningKey::generate(&mut OsRng);
        let mut signed = attach(&signer, b"alice");
        signed[0] ^= 0x80;

        assert!(matches!(
            detach(signer.verifying_key().as_bytes(), &signed),
            Err(CryptoError::SignatureVerificationFailed)
        ));
    }

    #[test]
    fn test_exactly_a_signature_is_an_empty_body() {
        let signer = SigningKey::generate(&mut OsRng);
        let signed = attach(&signer, &[]);
        assert!(detach(signer.verifying_key().as_bytes(), &signed).unwrap().is_empty());
        assert!(matches!(
            detach(signer.verifying_key().as_bytes(), &signed[1..]),
            Err(CryptoError::TruncatedSignedMessage { len: 63 })
        ));
    }
}
