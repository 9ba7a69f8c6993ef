//! PKCS#7 padding as used by CMS content encryption ([RFC 5652 § 6.3]).
//!
//! [RFC 5652 § 6.3]: https://datatracker.ietf.org/doc/html/rfc5652#section-6.3

use alloc::vec::Vec;
use subtle::{ConstantTimeEq, ConstantTimeGreater};
use zeroize::Zeroizing;

use crate::errors::{Error, Result};

/// Returns `input` followed by `n` copies of `n`, where `n` in `1..=block_size`
/// brings the length to a multiple of `block_size`.
#[inline]
pub(crate) fn pkcs7_pad(input: &[u8], block_size: usize) -> Zeroizing<Vec<u8>> {
    let pad_len = block_size - input.len() % block_size;

    let mut out = Zeroizing::new(Vec::with_capacity(input.len() + pad_len));
    out.extend_from_slice(input);
    out.resize(input.len() + pad_len, pad_len as u8);
    out
}

/// Strips PKCS#7 padding in place.
///
/// The pad bytes are inspected without data dependent branches; the only
/// signal is the single [`Error::Decryption`] outcome.
#[inline]
pub(crate) fn pkcs7_unpad(buf: &mut Vec<u8>, block_size: usize) -> Result<()> {
    let len = buf.len();
    if len == 0 || len % block_size != 0 {
        return Err(Error::Decryption);
    }

    let pad_len = buf[len - 1];
    let mut valid = !pad_len.ct_eq(&0) & !pad_len.ct_gt(&(block_size as u8));

    for (i, byte) in buf[len - block_size..].iter().rev().enumerate() {
        let in_pad = pad_len.ct_gt(&(i as u8));
        valid &= !in_pad | byte.ct_eq(&pad_len);
    }

    if !bool::from(valid) {
        return Err(Error::Decryption);
    }

    buf.truncate(len - pad_len as usize);
    Ok(())
}
