//! Triple-DES key wrap ([RFC 3217 § 3]).
//!
//! [RFC 3217 § 3]: https://datatracker.ietf.org/doc/html/rfc3217#section-3

use alloc::vec::Vec;
use rand_core::CryptoRngCore;
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{
    content_encryption::{ContentEncryptionAlgorithm, ContentEncryptionParams},
    errors::{Error, Result},
};

/// IV of the outer encryption pass.
const OUTER_IV: [u8; 8] = [0x4a, 0xdd, 0xa2, 0x2c, 0x79, 0xe8, 0x21, 0x05];

const BLOCK: usize = 8;

fn icv(key: &[u8]) -> [u8; BLOCK] {
    let mut icv = [0u8; BLOCK];
    icv.copy_from_slice(&Sha1::digest(key)[..BLOCK]);
    icv
}

fn outer() -> Result<ContentEncryptionParams> {
    ContentEncryptionParams::new(ContentEncryptionAlgorithm::DES_EDE3_CBC, Some(&OUTER_IV[..]))
}

pub(super) fn wrap<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    kek: &[u8],
    key: &[u8],
) -> Result<Vec<u8>> {
    if key.is_empty() || key.len() % BLOCK != 0 {
        return Err(Error::InvalidKeyLength);
    }

    let inner = ContentEncryptionParams::generate(ContentEncryptionAlgorithm::DES_EDE3_CBC, rng);
    let iv = inner.iv().unwrap_or_default();

    let mut cek_icv = Zeroizing::new(Vec::with_capacity(key.len() + BLOCK));
    cek_icv.extend_from_slice(key);
    cek_icv.extend_from_slice(&icv(key));
    inner.encrypt_blocks(kek, &mut cek_icv)?;

    let mut buf = Vec::with_capacity(BLOCK + cek_icv.len());
    buf.extend_from_slice(iv);
    buf.extend_from_slice(&cek_icv);
    buf.reverse();

    outer()?.encrypt_blocks(kek, &mut buf)?;
    Ok(buf)
}

pub(super) fn unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    // IV, at least one key block and the ICV
    if wrapped.len() < 3 * BLOCK || wrapped.len() % BLOCK != 0 {
        return Err(Error::InvalidWrappedKey);
    }

    let mut buf = Zeroizing::new(wrapped.to_vec());
    outer()?.decrypt_blocks(kek, &mut buf)?;
    buf.reverse();

    let (iv, cek_icv) = buf.split_at_mut(BLOCK);
    let inner = ContentEncryptionParams::new(ContentEncryptionAlgorithm::DES_EDE3_CBC, Some(&*iv))?;
    inner.decrypt_blocks(kek, cek_icv)?;

    let (key, check) = cek_icv.split_at(cek_icv.len() - BLOCK);
    if !bool::from(icv(key)[..].ct_eq(check)) {
        return Err(Error::InvalidWrappedKey);
    }

    Ok(Zeroizing::new(key.to_vec()))
}
