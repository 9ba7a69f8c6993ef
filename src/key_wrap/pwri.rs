//! `id-alg-PWRI-KEK` ([RFC 3211 § 2.3]).
//!
//! The key is checksum-padded and then encrypted twice with the same
//! content-encryption algorithm. The second pass uses the last ciphertext
//! block of the first pass as its IV, which chains every block of the output
//! into the first block of the checksum-padded buffer.
//!
//! [RFC 3211 § 2.3]: https://datatracker.ietf.org/doc/html/rfc3211#section-2.3

use alloc::vec::Vec;
use rand_core::CryptoRngCore;
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroizing;

use crate::{
    content_encryption::{BlockCipherMode, ContentEncryptionParams},
    errors::{Error, Result},
};

/// Minimum number of cipher blocks in a wrapped key.
pub const PWRI_MIN_BLOCKS: usize = 2;

/// `[len][~k0 ~k1 ~k2][key][random]`, padded to a whole number of blocks and
/// at least [`PWRI_MIN_BLOCKS`] blocks long.
fn checksum_pad<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    key: &[u8],
    block_size: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if key.len() < 3 {
        return Err(Error::KeyTooShort);
    }
    let len = u8::try_from(key.len()).map_err(|_| Error::KeyTooLong)?;

    let unpadded = key.len() + 4;
    let mut padded = unpadded + block_size - unpadded % block_size;
    padded = padded.max(PWRI_MIN_BLOCKS * block_size);

    let mut buf = Zeroizing::new(vec![0u8; padded]);
    buf[0] = len;
    buf[1] = !key[0];
    buf[2] = !key[1];
    buf[3] = !key[2];
    buf[4..unpadded].copy_from_slice(key);
    rng.fill_bytes(&mut buf[unpadded..]);

    Ok(buf)
}

fn checksum_unpad(buf: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if buf.len() < 7 {
        return Err(Error::InvalidWrappedKey);
    }

    let len = buf[0] as usize;
    let check = (buf[1] ^ buf[4]) & (buf[2] ^ buf[5]) & (buf[3] ^ buf[6]);
    let len_ok = Choice::from(u8::from(len >= 3 && len + 4 <= buf.len()));

    if !bool::from(check.ct_eq(&0xff) & len_ok) {
        return Err(Error::InvalidWrappedKey);
    }

    Ok(Zeroizing::new(buf[4..4 + len].to_vec()))
}

/// Parameters of the second pass: the same algorithm keyed off `iv`.
fn chained(params: &ContentEncryptionParams, iv: &[u8]) -> Result<ContentEncryptionParams> {
    match params.algorithm().mode {
        BlockCipherMode::Ecb => Ok(params.clone()),
        _ => params.with_iv(iv),
    }
}

pub(super) fn wrap<R: CryptoRngCore + ?Sized>(
    params: &ContentEncryptionParams,
    rng: &mut R,
    kek: &[u8],
    key: &[u8],
) -> Result<Vec<u8>> {
    if params.algorithm().mode == BlockCipherMode::Ctr {
        return Err(Error::CtrModeWrap);
    }

    let bs = params.algorithm().block_size();
    let mut buf = checksum_pad(rng, key, bs)?;
    let len = buf.len();

    params.encrypt_blocks(kek, &mut buf)?;

    let outer = chained(params, &buf[len - bs..])?;
    outer.encrypt_blocks(kek, &mut buf)?;

    Ok(buf.to_vec())
}

pub(super) fn unwrap(
    params: &ContentEncryptionParams,
    kek: &[u8],
    wrapped: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if params.algorithm().mode == BlockCipherMode::Ctr {
        return Err(Error::CtrModeUnwrap);
    }

    let bs = params.algorithm().block_size();
    let len = wrapped.len();
    if len < PWRI_MIN_BLOCKS * bs || len % bs != 0 {
        return Err(Error::InvalidWrappedKey);
    }

    let mut buf = Zeroizing::new(wrapped.to_vec());
    let (body, last) = buf.split_at_mut(len - bs);

    // The last block decrypts on its own with the block before it as IV,
    // which recovers the IV of the outer layer.
    chained(params, &wrapped[len - 2 * bs..len - bs])?.decrypt_blocks(kek, last)?;
    chained(params, last)?.decrypt_blocks(kek, body)?;

    params.decrypt_blocks(kek, &mut buf)?;
    checksum_unpad(&buf)
}
