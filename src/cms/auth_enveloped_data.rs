//! Authenticated-enveloped content ([RFC 5083]).
//!
//! [RFC 5083]: https://datatracker.ietf.org/doc/html/rfc5083

use alloc::{boxed::Box, vec::Vec};
use der::{
    asn1::{ObjectIdentifier, OctetString},
    Encode, Sequence,
};
use rand_core::CryptoRngCore;
use tracing::debug;
use zeroize::Zeroizing;

use super::{
    attributes::find_attribute,
    content_type_attribute,
    recipient::{build_recipient_infos, recover_key},
    Attribute, Attributes, CmsVersion, ContentInfo, RecipientInfo, RecipientInfoBuilder,
    RecipientInfos, CONTENT_TYPE_OID, DATA_OID,
};
use crate::{
    auth_encryption::AeadParams,
    errors::{Error, Result},
    key_size::HasKeySize,
};

/// `EncryptedContentInfo` whose algorithm is an AEAD.
///
/// ```text
///   EncryptedContentInfo ::= SEQUENCE {
///       contentType ContentType,
///       contentEncryptionAlgorithm ContentEncryptionAlgorithmIdentifier,
///       encryptedContent [0] IMPLICIT EncryptedContent OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct AuthEncryptedContentInfo {
    pub content_type: ObjectIdentifier,
    pub content_enc_alg: AeadParams,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub encrypted_content: Option<OctetString>,
}

/// `AuthEnvelopedData`
///
/// ```text
///   AuthEnvelopedData ::= SEQUENCE {
///       version CMSVersion,
///       originatorInfo [0] IMPLICIT OriginatorInfo OPTIONAL,
///       recipientInfos RecipientInfos,
///       authEncryptedContentInfo EncryptedContentInfo,
///       authAttrs [1] IMPLICIT AuthAttributes OPTIONAL,
///       mac MessageAuthenticationCode,
///       unauthAttrs [2] IMPLICIT UnauthAttributes OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct AuthEnvelopedData {
    pub version: CmsVersion,
    pub recipient_infos: RecipientInfos,
    pub auth_encrypted_content_info: AuthEncryptedContentInfo,
    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub auth_attrs: Option<Attributes>,
    pub mac: OctetString,
    #[asn1(
        context_specific = "2",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub unauth_attrs: Option<Attributes>,
}

/// Additional authenticated data: the DER of the authenticated attributes,
/// encoded with the `SET OF` tag, or nothing.
fn additional_data(auth_attrs: Option<&Attributes>) -> Result<Vec<u8>> {
    match auth_attrs {
        Some(attrs) => Ok(attrs.to_der()?),
        None => Ok(Vec::new()),
    }
}

impl AuthEnvelopedData {
    /// Recovers the content-encryption key with `consumer`, verifies the
    /// tag and decrypts the content.
    ///
    /// No plaintext is released unless the tag verifies.
    pub fn open<F>(&self, consumer: F) -> Result<ContentInfo>
    where
        F: FnMut(&RecipientInfo) -> Result<Zeroizing<Vec<u8>>>,
    {
        let cek = recover_key(&self.recipient_infos, consumer)?;

        let info = &self.auth_encrypted_content_info;
        let ciphertext = info
            .encrypted_content
            .as_ref()
            .map(OctetString::as_bytes)
            .ok_or(Error::Authentication)?;
        let aad = additional_data(self.auth_attrs.as_ref())?;

        let octets = info
            .content_enc_alg
            .decrypt(&cek, &aad, ciphertext, self.mac.as_bytes())?;

        if let Some(attrs) = &self.auth_attrs {
            if let Some(value) = find_attribute(attrs, CONTENT_TYPE_OID) {
                if value.decode_as::<ObjectIdentifier>()? != info.content_type {
                    return Err(Error::Authentication);
                }
            }
        }

        debug!(alg = %info.content_enc_alg.algorithm(), "opened auth-enveloped data");
        ContentInfo::decapsulate(info.content_type, &octets)
    }
}

/// Builds an [`AuthEnvelopedData`].
///
/// When the content is not `Data` a content-type attribute is added to the
/// authenticated attributes unless one is already present.
pub struct AuthEnvelopedDataBuilder<'c> {
    params: AeadParams,
    content: &'c ContentInfo,
    cek: Option<Zeroizing<Vec<u8>>>,
    recipient_info_builders: Vec<Box<dyn RecipientInfoBuilder + 'c>>,
    auth_attrs: Vec<Attribute>,
    unauth_attrs: Vec<Attribute>,
}

impl<'c> AuthEnvelopedDataBuilder<'c> {
    /// Envelope `content`, encrypting it with `params`.
    pub fn new(params: AeadParams, content: &'c ContentInfo) -> Self {
        Self {
            params,
            content,
            cek: None,
            recipient_info_builders: Vec::new(),
            auth_attrs: Vec::new(),
            unauth_attrs: Vec::new(),
        }
    }

    /// Uses `cek` instead of a freshly generated content-encryption key.
    pub fn content_encryption_key(mut self, cek: &[u8]) -> Self {
        self.cek = Some(Zeroizing::new(cek.to_vec()));
        self
    }

    /// Adds a recipient. Recipient infos are emitted in the order added.
    pub fn add_recipient_info(mut self, builder: impl RecipientInfoBuilder + 'c) -> Self {
        self.recipient_info_builders.push(Box::new(builder));
        self
    }

    /// Adds an attribute covered by the authentication tag.
    pub fn add_auth_attribute(mut self, attr: Attribute) -> Self {
        self.auth_attrs.push(attr);
        self
    }

    /// Adds an attribute which is not authenticated.
    pub fn add_unauth_attribute(mut self, attr: Attribute) -> Self {
        self.unauth_attrs.push(attr);
        self
    }

    /// Encrypts the content and runs every recipient info builder.
    pub fn build<R: CryptoRngCore>(mut self, rng: &mut R) -> Result<AuthEnvelopedData> {
        let cek = match self.cek.take() {
            Some(cek) => {
                self.params.validate_key_size(cek.len())?;
                cek
            }
            None => self.params.generate_key(rng),
        };

        let (content_type, octets) = self.content.encapsulate()?;
        if content_type != DATA_OID && find_attribute(&self.auth_attrs, CONTENT_TYPE_OID).is_none()
        {
            self.auth_attrs.push(content_type_attribute(content_type)?);
        }

        let auth_attrs =
            (!self.auth_attrs.is_empty()).then(|| Attributes::from(self.auth_attrs));
        let unauth_attrs =
            (!self.unauth_attrs.is_empty()).then(|| Attributes::from(self.unauth_attrs));

        let aad = additional_data(auth_attrs.as_ref())?;
        let (ciphertext, tag) = self.params.encrypt(&cek, &aad, &octets)?;
        let recipient_infos = build_recipient_infos(&mut self.recipient_info_builders, rng, &cek)?;

        debug!(
            alg = %self.params.algorithm(),
            recipients = recipient_infos.len(),
            "produced auth-enveloped data"
        );

        Ok(AuthEnvelopedData {
            version: CmsVersion::V0,
            recipient_infos,
            auth_encrypted_content_info: AuthEncryptedContentInfo {
                content_type,
                content_enc_alg: self.params,
                encrypted_content: Some(OctetString::new(ciphertext)?),
            },
            auth_attrs,
            mac: OctetString::new(tag)?,
            unauth_attrs,
        })
    }
}
