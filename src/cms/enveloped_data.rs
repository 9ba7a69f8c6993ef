//! Enveloped content ([RFC 5652 § 6]).
//!
//! [RFC 5652 § 6]: https://www.rfc-editor.org/rfc/rfc5652#section-6

use alloc::{boxed::Box, vec::Vec};
use der::Sequence;
use rand_core::CryptoRngCore;
use tracing::debug;
use zeroize::Zeroizing;

use super::{
    recipient::{build_recipient_infos, recover_key},
    Attribute, Attributes, CmsVersion, ContentInfo, EncryptedContentInfo, RecipientInfo,
    RecipientInfoBuilder, RecipientInfos,
};
use crate::{content_encryption::ContentEncryptionParams, errors::Result, key_size::HasKeySize};

/// `EnvelopedData`
///
/// ```text
///   EnvelopedData ::= SEQUENCE {
///       version CMSVersion,
///       originatorInfo [0] IMPLICIT OriginatorInfo OPTIONAL,
///       recipientInfos RecipientInfos,
///       encryptedContentInfo EncryptedContentInfo,
///       unprotectedAttrs [1] IMPLICIT UnprotectedAttributes OPTIONAL }
/// ```
///
/// `originatorInfo` only carries certificates and CRLs and is not supported.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct EnvelopedData {
    pub version: CmsVersion,
    pub recipient_infos: RecipientInfos,
    pub encrypted_content_info: EncryptedContentInfo,
    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub unprotected_attrs: Option<Attributes>,
}

impl EnvelopedData {
    /// Recovers the content-encryption key with `consumer` and decrypts the
    /// content.
    ///
    /// Recipient infos are offered to `consumer` in order; the first key it
    /// returns is used.
    pub fn open<F>(&self, consumer: F) -> Result<ContentInfo>
    where
        F: FnMut(&RecipientInfo) -> Result<Zeroizing<Vec<u8>>>,
    {
        let cek = recover_key(&self.recipient_infos, consumer)?;
        let content = self.encrypted_content_info.open(&cek)?;

        debug!(
            alg = %self.encrypted_content_info.content_enc_alg.algorithm(),
            "opened enveloped data"
        );
        Ok(content)
    }
}

/// RFC 5652 § 6.1 version selection.
fn enveloped_data_version(recipient_infos: &[RecipientInfo], has_attrs: bool) -> CmsVersion {
    let has_pwri = recipient_infos
        .iter()
        .any(|info| matches!(info, RecipientInfo::Pwri(_)));
    let has_kekri = recipient_infos
        .iter()
        .any(|info| matches!(info, RecipientInfo::Kekri(_)));

    if has_pwri {
        CmsVersion::V3
    } else if has_attrs || has_kekri {
        CmsVersion::V2
    } else {
        CmsVersion::V0
    }
}

/// Builds an [`EnvelopedData`].
pub struct EnvelopedDataBuilder<'c> {
    params: ContentEncryptionParams,
    content: &'c ContentInfo,
    cek: Option<Zeroizing<Vec<u8>>>,
    recipient_info_builders: Vec<Box<dyn RecipientInfoBuilder + 'c>>,
    unprotected_attrs: Vec<Attribute>,
}

impl<'c> EnvelopedDataBuilder<'c> {
    /// Envelope `content`, encrypting it with `params`.
    pub fn new(params: ContentEncryptionParams, content: &'c ContentInfo) -> Self {
        Self {
            params,
            content,
            cek: None,
            recipient_info_builders: Vec::new(),
            unprotected_attrs: Vec::new(),
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

    /// Adds an unprotected attribute.
    pub fn add_unprotected_attribute(mut self, attr: Attribute) -> Self {
        self.unprotected_attrs.push(attr);
        self
    }

    /// Encrypts the content and runs every recipient info builder.
    pub fn build<R: CryptoRngCore>(mut self, rng: &mut R) -> Result<EnvelopedData> {
        let cek = match self.cek.take() {
            Some(cek) => {
                self.params.validate_key_size(cek.len())?;
                cek
            }
            None => self.params.generate_key(rng),
        };

        let alg = self.params.algorithm();
        let encrypted_content_info = EncryptedContentInfo::seal(self.params, &cek, self.content)?;
        let recipient_infos = build_recipient_infos(&mut self.recipient_info_builders, rng, &cek)?;

        let unprotected_attrs =
            (!self.unprotected_attrs.is_empty()).then(|| Attributes::from(self.unprotected_attrs));
        let version = enveloped_data_version(&recipient_infos, unprotected_attrs.is_some());

        debug!(
            %alg,
            recipients = recipient_infos.len(),
            version = ?version,
            "produced enveloped data"
        );

        Ok(EnvelopedData {
            version,
            recipient_infos,
            encrypted_content_info,
            unprotected_attrs,
        })
    }
}
