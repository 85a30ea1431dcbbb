use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{CryptoError, lengths};
use crate::types::SharedSecret;

type HmacSha256 = Hmac<Sha256>;

fn keyed(key: &SharedSecret, parts: &[&[u8]]) -> Result<HmacSha256, CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes()).map_err(|_| {
        CryptoError::InvalidKeyLength {
            expected: lengths::SHARED_SECRET,
            actual: key.as_bytes().len(),
        }
    })?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac)
}

/// HMAC-SHA256 over the concatenation of `parts`, keyed by the shared secret
pub fn authenticator(key: &SharedSecret, parts: &[&[u8]]) -> Result<[u8; 32], CryptoError> {
    Ok(keyed(key, parts)?.finalize().into_bytes().into())
}

/// Check a received authenticator in constant time
pub fn verify_authenticator(
    key: &SharedSecret,
    parts: &[&[u8]],
    expected: &[u8],
) -> Result<bool, CryptoError> {
    Ok(keyed(key, parts)?.verify_slice(expected).is_ok())
}
