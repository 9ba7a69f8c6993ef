//! Cryptographic Message Syntax ([RFC 5652]) content layering.
//!
//! A [`ContentInfo`] is either plain `Data` or one of the protection layers:
//! [`DigestedData`], [`EncryptedData`], [`EnvelopedData`],
//! [`AuthenticatedData`] and [`AuthEnvelopedData`] ([RFC 5083]). Each layer
//! encapsulates another `ContentInfo`, so layers nest freely.
//!
//! Enveloped, authenticated and auth-enveloped layers carry the content key
//! for any number of recipients. Producing a layer runs every
//! [`RecipientInfoBuilder`] in the order they were added; opening one scans the
//! recipient infos in order and stops at the first one the consumer can
//! recover a key from.
//!
//! # Usage
//!
//! ```
//! use cms_crypto::cms::{
//!     with_recipient_password, ContentInfo, EnvelopedDataBuilder, PasswordRecipientInfoBuilder,
//! };
//! use cms_crypto::content_encryption::{ContentEncryptionAlgorithm, ContentEncryptionParams};
//! use cms_crypto::kdf::{Pbkdf2Params, Pbkdf2Prf};
//! use cms_crypto::key_wrap::KeyWrapAlgorithm;
//! use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
//!
//! let mut rng = ChaCha8Rng::from_seed([42; 32]);
//! let content = ContentInfo::Data(b"hello world".to_vec());
//!
//! let params = ContentEncryptionParams::generate(ContentEncryptionAlgorithm::AES_256_CBC, &mut rng);
//! let wrap = ContentEncryptionParams::generate(ContentEncryptionAlgorithm::AES_128_CBC, &mut rng);
//! let kdf = Pbkdf2Params::new(Pbkdf2Prf::HmacWithSha256, 1000, b"saltsalt").unwrap();
//!
//! let enveloped = EnvelopedDataBuilder::new(params, &content)
//!     .add_recipient_info(PasswordRecipientInfoBuilder::new(
//!         b"password",
//!         Some(kdf.into()),
//!         KeyWrapAlgorithm::PwriKek(wrap),
//!     ))
//!     .build(&mut rng)
//!     .unwrap();
//!
//! let opened = enveloped.open(with_recipient_password(b"password")).unwrap();
//! assert_eq!(opened, content);
//! ```
//!
//! [RFC 5652]: https://datatracker.ietf.org/doc/html/rfc5652
//! [RFC 5083]: https://datatracker.ietf.org/doc/html/rfc5083

mod attributes;
mod auth_enveloped_data;
mod authenticated_data;
mod content_info;
mod digested_data;
mod encrypted_data;
mod enveloped_data;
mod recipient;

pub use self::{
    attributes::{
        content_type_attribute, message_digest_attribute, Attribute, Attributes, OrderedSet,
        CONTENT_TYPE_OID, MESSAGE_DIGEST_OID,
    },
    auth_enveloped_data::{AuthEncryptedContentInfo, AuthEnvelopedData, AuthEnvelopedDataBuilder},
    authenticated_data::{AuthenticatedData, AuthenticatedDataBuilder},
    content_info::{
        ContentInfo, EncapsulatedContentInfo, AUTH_DATA_OID, AUTH_ENVELOPED_DATA_OID, DATA_OID,
        DIGESTED_DATA_OID, ENCRYPTED_DATA_OID, ENVELOPED_DATA_OID,
    },
    digested_data::DigestedData,
    encrypted_data::{EncryptedContentInfo, EncryptedData},
    enveloped_data::{EnvelopedData, EnvelopedDataBuilder},
    recipient::{
        with_recipient_key, with_recipient_password, KekIdentifier, KekRecipientInfo,
        KekRecipientInfoBuilder, OtherKeyAttribute, PasswordRecipientInfo,
        PasswordRecipientInfoBuilder, RecipientInfo, RecipientInfoBuilder, RecipientInfos,
    },
};

use der::Enumerated;

/// `CMSVersion` ([RFC 5652 § 10.2.5]).
///
/// ```text
///  CMSVersion ::= INTEGER  { v0(0), v1(1), v2(2), v3(3), v4(4), v5(5) }
/// ```
///
/// [RFC 5652 § 10.2.5]: https://www.rfc-editor.org/rfc/rfc5652#section-10.2.5
#[derive(Clone, Debug, Copy, PartialEq, Eq, PartialOrd, Ord, Enumerated)]
#[asn1(type = "INTEGER")]
#[repr(u8)]
#[allow(missing_docs)]
pub enum CmsVersion {
    V0 = 0,
    V1 = 1,
    V2 = 2,
    V3 = 3,
    V4 = 4,
    V5 = 5,
}
