//! Encrypted content ([RFC 5652 § 8]).
//!
//! [RFC 5652 § 8]: https://www.rfc-editor.org/rfc/rfc5652#section-8

use der::{
    asn1::{ObjectIdentifier, OctetString},
    Sequence,
};
use tracing::debug;

use super::{Attributes, CmsVersion, ContentInfo};
use crate::{
    content_encryption::ContentEncryptionParams,
    errors::{Error, Result},
};

/// `EncryptedContentInfo` ([RFC 5652 § 6.1])
///
/// ```text
///   EncryptedContentInfo ::= SEQUENCE {
///       contentType ContentType,
///       contentEncryptionAlgorithm ContentEncryptionAlgorithmIdentifier,
///       encryptedContent [0] IMPLICIT EncryptedContent OPTIONAL }
/// ```
///
/// [RFC 5652 § 6.1]: https://www.rfc-editor.org/rfc/rfc5652#section-6.1
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct EncryptedContentInfo {
    pub content_type: ObjectIdentifier,
    pub content_enc_alg: ContentEncryptionParams,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub encrypted_content: Option<OctetString>,
}

impl EncryptedContentInfo {
    /// Encapsulates and encrypts `content` under `key`.
    pub(crate) fn seal(
        params: ContentEncryptionParams,
        key: &[u8],
        content: &ContentInfo,
    ) -> Result<Self> {
        let (content_type, octets) = content.encapsulate()?;
        let ciphertext = params.encrypt(key, &octets)?;

        Ok(Self {
            content_type,
            content_enc_alg: params,
            encrypted_content: Some(OctetString::new(ciphertext)?),
        })
    }

    /// Decrypts and decapsulates the content.
    pub(crate) fn open(&self, key: &[u8]) -> Result<ContentInfo> {
        let ciphertext = self
            .encrypted_content
            .as_ref()
            .map(OctetString::as_bytes)
            .ok_or(Error::Decryption)?;

        let octets = self.content_enc_alg.decrypt(key, ciphertext)?;
        ContentInfo::decapsulate(self.content_type, &octets)
    }
}

/// `EncryptedData`
///
/// ```text
///   EncryptedData ::= SEQUENCE {
///       version CMSVersion,
///       encryptedContentInfo EncryptedContentInfo,
///       unprotectedAttrs [1] IMPLICIT UnprotectedAttributes OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct EncryptedData {
    pub version: CmsVersion,
    pub enc_content_info: EncryptedContentInfo,
    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub unprotected_attrs: Option<Attributes>,
}

impl EncryptedData {
    /// Encrypts `content` under a key shared with the recipient out of band.
    pub fn encrypt(
        key: &[u8],
        params: ContentEncryptionParams,
        unprotected_attrs: Option<Attributes>,
        content: &ContentInfo,
    ) -> Result<Self> {
        let alg = params.algorithm();
        let enc_content_info = EncryptedContentInfo::seal(params, key, content)?;

        let version = if unprotected_attrs.is_some() {
            CmsVersion::V2
        } else {
            CmsVersion::V0
        };

        debug!(%alg, version = ?version, "produced encrypted data");

        Ok(Self {
            version,
            enc_content_info,
            unprotected_attrs,
        })
    }

    /// Decrypts the content.
    pub fn decrypt(&self, key: &[u8]) -> Result<ContentInfo> {
        let content = self.enc_content_info.open(key)?;
        debug!(alg = %self.enc_content_info.content_enc_alg.algorithm(), "opened encrypted data");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{content_type_attribute, DATA_OID};
    use crate::content_encryption::ContentEncryptionAlgorithm;
    use crate::key_size::HasKeySize;
    use der::{Decode, Encode};
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn test_round_trip() {
        let mut rng = ChaCha8Rng::from_seed([11; 32]);
        let params =
            ContentEncryptionParams::generate(ContentEncryptionAlgorithm::AES_192_CBC, &mut rng);
        let key = params.generate_key(&mut rng);
        let content = ContentInfo::Data(b"encrypted data".to_vec());

        let encrypted = EncryptedData::encrypt(&key, params, None, &content).unwrap();
        assert_eq!(encrypted.version, CmsVersion::V0);
        assert_eq!(encrypted.decrypt(&key).unwrap(), content);
    }

    #[test]
    fn test_wrong_key() {
        let mut rng = ChaCha8Rng::from_seed([12; 32]);
        let params =
            ContentEncryptionParams::generate(ContentEncryptionAlgorithm::AES_128_CBC, &mut rng);
        let content = ContentInfo::Data(b"encrypted data".to_vec());

        let encrypted = EncryptedData::encrypt(&[1; 16], params, None, &content).unwrap();
        assert_ne!(encrypted.decrypt(&[2; 16]).ok(), Some(content));
        assert_eq!(encrypted.decrypt(&[1; 8]), Err(Error::InvalidKey));
    }

    #[test]
    fn test_unprotected_attrs_version() {
        let mut rng = ChaCha8Rng::from_seed([13; 32]);
        let params =
            ContentEncryptionParams::generate(ContentEncryptionAlgorithm::DES_EDE3_CBC, &mut rng);
        let key = params.generate_key(&mut rng);
        let attrs: Attributes = vec![content_type_attribute(DATA_OID).unwrap()].into();
        let content = ContentInfo::Data(vec![0; 40]);

        let encrypted = EncryptedData::encrypt(&key, params, Some(attrs), &content).unwrap();
        assert_eq!(encrypted.version, CmsVersion::V2);

        let der = encrypted.to_der().unwrap();
        let decoded = EncryptedData::from_der(&der).unwrap();
        assert_eq!(decoded, encrypted);
        assert_eq!(decoded.decrypt(&key).unwrap(), content);
    }
}
