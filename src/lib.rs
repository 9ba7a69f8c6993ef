#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![doc(html_logo_url = "https://raw.githubusercontent.com/RustCrypto/meta/master/logo_small.png")]
#![warn(missing_docs)]

//! # Supported algorithms
//!
//! | Concern               | Algorithms                                                  |
//! |-----------------------|-------------------------------------------------------------|
//! | Content encryption    | DES, 3DES, AES-128/192/256, CAST5, Camellia-128 in ECB, CBC, CFB and CTR mode |
//! | Authenticated content | AES-GCM ([RFC 5084]), ChaCha20-Poly1305 ([RFC 8103])        |
//! | Key derivation        | PBKDF2 ([RFC 8018]), scrypt ([RFC 7914])                    |
//! | Key wrap              | AES-KW ([RFC 3394]), AES-KWP ([RFC 5649]), 3DES ([RFC 3217]), PWRI-KEK ([RFC 3211]) |
//! | Digests and MACs      | MD5, SHA-1, SHA-224/256/384/512 and their HMACs             |
//!
//! Content encryption always applies PKCS#7 padding, whatever the mode.
//!
//! # Usage
//!
//! ## Encrypted data
//!
//! ```
//! use cms_crypto::cms::{ContentInfo, EncryptedData};
//! use cms_crypto::content_encryption::{ContentEncryptionAlgorithm, ContentEncryptionParams};
//! use cms_crypto::key_size::HasKeySize;
//! use cms_crypto::der::{Decode, Encode};
//! use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
//!
//! let mut rng = ChaCha8Rng::from_seed([42; 32]);
//! let params = ContentEncryptionParams::generate(ContentEncryptionAlgorithm::AES_128_CBC, &mut rng);
//! let key = params.generate_key(&mut rng);
//!
//! let content = ContentInfo::Data(b"hello world".to_vec());
//! let encrypted = EncryptedData::encrypt(&key, params, None, &content).unwrap();
//!
//! let der = ContentInfo::from(encrypted).to_der().unwrap();
//! let ContentInfo::EncryptedData(decoded) = ContentInfo::from_der(&der).unwrap() else {
//!     panic!("not encrypted data");
//! };
//! assert_eq!(decoded.decrypt(&key).unwrap(), content);
//! ```
//!
//! ## Key wrap
//!
//! ```
//! use cms_crypto::key_wrap::KeyWrapAlgorithm;
//! use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
//!
//! let mut rng = ChaCha8Rng::from_seed([42; 32]);
//! let kek = [0x11; 32];
//!
//! let wrapped = KeyWrapAlgorithm::Aes256WrapPad.wrap(&mut rng, &kek, b"a short key").unwrap();
//! let key = KeyWrapAlgorithm::Aes256WrapPad.unwrap(&kek, &wrapped).unwrap();
//! assert_eq!(&key[..], b"a short key");
//! ```
//!
//! Enveloped, authenticated and auth-enveloped content is shown in the
//! [`cms`] module documentation.
//!
//! # Logging
//!
//! Layers emit [`tracing`] events when they are produced and opened, and
//! every recipient info attempt is traced. No subscriber is installed and no
//! key material is ever recorded.
//!
//! [RFC 3211]: https://datatracker.ietf.org/doc/html/rfc3211
//! [RFC 3217]: https://datatracker.ietf.org/doc/html/rfc3217
//! [RFC 3394]: https://datatracker.ietf.org/doc/html/rfc3394
//! [RFC 5084]: https://datatracker.ietf.org/doc/html/rfc5084
//! [RFC 5649]: https://datatracker.ietf.org/doc/html/rfc5649
//! [RFC 7914]: https://datatracker.ietf.org/doc/html/rfc7914
//! [RFC 8018]: https://datatracker.ietf.org/doc/html/rfc8018
//! [RFC 8103]: https://datatracker.ietf.org/doc/html/rfc8103

#[cfg(doctest)]
pub struct ReadmeDoctests;

#[macro_use]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub use der;
pub use rand_core;

pub mod algorithms;
pub mod auth_encryption;
pub mod cms;
pub mod content_encryption;
pub mod errors;
pub mod kdf;
pub mod key_size;
pub mod key_wrap;

pub use crate::{
    errors::{Error, Result},
    key_size::{HasKeySize, KeySizeSpecifier},
};
