//! Authenticated content ([RFC 5652 § 9]).
//!
//! [RFC 5652 § 9]: https://www.rfc-editor.org/rfc/rfc5652#section-9

use alloc::{boxed::Box, vec::Vec};
use der::{
    asn1::{ObjectIdentifier, OctetString, OctetStringRef},
    Encode, Sequence,
};
use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

use super::{
    attributes::find_attribute,
    content_type_attribute, message_digest_attribute,
    recipient::{build_recipient_infos, recover_key},
    Attribute, Attributes, CmsVersion, ContentInfo, EncapsulatedContentInfo, RecipientInfo,
    RecipientInfoBuilder, RecipientInfos, CONTENT_TYPE_OID, MESSAGE_DIGEST_OID,
};
use crate::{
    algorithms::{DigestAlgorithm, MacAlgorithm},
    errors::{Error, Result},
    key_size::HasKeySize,
};

/// `AuthenticatedData`
///
/// ```text
///   AuthenticatedData ::= SEQUENCE {
///       version CMSVersion,
///       originatorInfo [0] IMPLICIT OriginatorInfo OPTIONAL,
///       recipientInfos RecipientInfos,
///       macAlgorithm MessageAuthenticationCodeAlgorithm,
///       digestAlgorithm [1] DigestAlgorithmIdentifier OPTIONAL,
///       encapContentInfo EncapsulatedContentInfo,
///       authAttrs [2] IMPLICIT AuthAttributes OPTIONAL,
///       mac MessageAuthenticationCode,
///       unauthAttrs [3] IMPLICIT UnauthAttributes OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct AuthenticatedData {
    pub version: CmsVersion,
    pub recipient_infos: RecipientInfos,
    pub mac_alg: MacAlgorithm,
    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub digest_alg: Option<DigestAlgorithm>,
    pub encap_content_info: EncapsulatedContentInfo,
    #[asn1(
        context_specific = "2",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub auth_attrs: Option<Attributes>,
    pub mac: OctetString,
    #[asn1(
        context_specific = "3",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub unauth_attrs: Option<Attributes>,
}

/// Octets the MAC is computed over: the DER of the authenticated attributes
/// when present, the encapsulated content otherwise.
fn mac_input(auth_attrs: Option<&Attributes>, econtent: &[u8]) -> Result<Vec<u8>> {
    match auth_attrs {
        Some(attrs) => Ok(attrs.to_der()?),
        None => Ok(econtent.to_vec()),
    }
}

impl AuthenticatedData {
    /// Recovers the MAC key with `consumer`, checks the MAC and the
    /// authenticated attributes, and returns the content.
    pub fn verify<F>(&self, consumer: F) -> Result<ContentInfo>
    where
        F: FnMut(&RecipientInfo) -> Result<Zeroizing<Vec<u8>>>,
    {
        let key = recover_key(&self.recipient_infos, consumer)?;
        let econtent = self.encap_content_info.content_bytes();

        let input = mac_input(self.auth_attrs.as_ref(), econtent)?;
        self.mac_alg
            .verify(&key, &input, self.mac.as_bytes())
            .map_err(|_| Error::Authentication)?;

        if let Some(attrs) = &self.auth_attrs {
            self.check_auth_attrs(attrs, econtent)?;
        }

        debug!(alg = %self.mac_alg, "verified authenticated data");
        self.encap_content_info.content()
    }

    fn check_auth_attrs(&self, attrs: &[Attribute], econtent: &[u8]) -> Result<()> {
        let digest_alg = self.digest_alg.ok_or(Error::Authentication)?;

        let content_type = find_attribute(attrs, CONTENT_TYPE_OID)
            .ok_or(Error::Authentication)?
            .decode_as::<ObjectIdentifier>()?;
        if content_type != self.encap_content_info.econtent_type {
            return Err(Error::Authentication);
        }

        let message_digest = find_attribute(attrs, MESSAGE_DIGEST_OID)
            .ok_or(Error::Authentication)?
            .decode_as::<OctetStringRef<'_>>()?;
        let expected = digest_alg.digest(econtent);
        if !bool::from(expected.ct_eq(message_digest.as_bytes())) {
            debug!(alg = %digest_alg, "message digest mismatch");
            return Err(Error::Authentication);
        }

        Ok(())
    }
}

/// Builds an [`AuthenticatedData`].
///
/// With a digest algorithm, content-type and message-digest attributes are
/// added ahead of any caller supplied authenticated attributes and the MAC
/// covers the attributes. Without one the MAC covers the content itself and
/// authenticated attributes are rejected.
pub struct AuthenticatedDataBuilder<'c> {
    mac_alg: MacAlgorithm,
    digest_alg: Option<DigestAlgorithm>,
    content: &'c ContentInfo,
    mac_key: Option<Zeroizing<Vec<u8>>>,
    recipient_info_builders: Vec<Box<dyn RecipientInfoBuilder + 'c>>,
    auth_attrs: Vec<Attribute>,
    unauth_attrs: Vec<Attribute>,
}

impl<'c> AuthenticatedDataBuilder<'c> {
    /// Authenticate `content` with `mac_alg`.
    pub fn new(
        mac_alg: MacAlgorithm,
        digest_alg: Option<DigestAlgorithm>,
        content: &'c ContentInfo,
    ) -> Self {
        Self {
            mac_alg,
            digest_alg,
            content,
            mac_key: None,
            recipient_info_builders: Vec::new(),
            auth_attrs: Vec::new(),
            unauth_attrs: Vec::new(),
        }
    }

    /// Uses `key` instead of a freshly generated MAC key.
    pub fn mac_key(mut self, key: &[u8]) -> Self {
        self.mac_key = Some(Zeroizing::new(key.to_vec()));
        self
    }

    /// Adds a recipient. Recipient infos are emitted in the order added.
    pub fn add_recipient_info(mut self, builder: impl RecipientInfoBuilder + 'c) -> Self {
        self.recipient_info_builders.push(Box::new(builder));
        self
    }

    /// Adds an authenticated attribute.
    pub fn add_auth_attribute(mut self, attr: Attribute) -> Self {
        self.auth_attrs.push(attr);
        self
    }

    /// Adds an unauthenticated attribute.
    pub fn add_unauth_attribute(mut self, attr: Attribute) -> Self {
        self.unauth_attrs.push(attr);
        self
    }

    /// Computes the MAC and runs every recipient info builder.
    pub fn build<R: CryptoRngCore>(mut self, rng: &mut R) -> Result<AuthenticatedData> {
        let key = match self.mac_key.take() {
            Some(key) => {
                self.mac_alg.validate_key_size(key.len())?;
                key
            }
            None => self.mac_alg.generate_key(rng),
        };

        let encap_content_info = EncapsulatedContentInfo::new(self.content)?;
        let econtent = encap_content_info.content_bytes();

        let auth_attrs = match self.digest_alg {
            Some(digest_alg) => {
                let mut attrs = Attributes::new();
                attrs.push(content_type_attribute(encap_content_info.econtent_type)?);
                attrs.push(message_digest_attribute(&digest_alg.digest(econtent))?);
                for attr in self.auth_attrs {
                    attrs.push(attr);
                }
                Some(attrs)
            }
            None if self.auth_attrs.is_empty() => None,
            None => {
                return Err(Error::InvalidParameters(
                    "authenticated attributes require a digest algorithm",
                ))
            }
        };
        let unauth_attrs =
            (!self.unauth_attrs.is_empty()).then(|| Attributes::from(self.unauth_attrs));

        let mac = self
            .mac_alg
            .compute(&key, &mac_input(auth_attrs.as_ref(), econtent)?)?;
        let recipient_infos = build_recipient_infos(&mut self.recipient_info_builders, rng, &key)?;

        debug!(
            alg = %self.mac_alg,
            recipients = recipient_infos.len(),
            "produced authenticated data"
        );

        Ok(AuthenticatedData {
            version: CmsVersion::V0,
            recipient_infos,
            mac_alg: self.mac_alg,
            digest_alg: self.digest_alg,
            encap_content_info,
            auth_attrs,
            mac: OctetString::new(mac)?,
            unauth_attrs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{with_recipient_password, PasswordRecipientInfoBuilder, DATA_OID};
    use crate::kdf::{Pbkdf2Params, Pbkdf2Prf};
    use crate::key_wrap::KeyWrapAlgorithm;
    use der::Decode;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    fn recipient() -> PasswordRecipientInfoBuilder {
        let kdf = Pbkdf2Params::new(Pbkdf2Prf::HmacWithSha1, 20, b"12345678").unwrap();
        PasswordRecipientInfoBuilder::new(b"password", Some(kdf.into()), KeyWrapAlgorithm::Aes256WrapPad)
    }

    #[test]
    fn test_without_digest() {
        let mut rng = ChaCha8Rng::from_seed([41; 32]);
        let content = ContentInfo::Data(b"authenticated".to_vec());

        let authenticated =
            AuthenticatedDataBuilder::new(MacAlgorithm::hmac(DigestAlgorithm::Sha256), None, &content)
                .add_recipient_info(recipient())
                .build(&mut rng)
                .unwrap();

        assert!(authenticated.auth_attrs.is_none());
        assert_eq!(authenticated.mac.as_bytes().len(), 32);
        assert_eq!(
            authenticated.verify(with_recipient_password(b"password")).unwrap(),
            content
        );
    }

    #[test]
    fn test_with_digest() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let content = ContentInfo::Data(b"authenticated".to_vec());

        let authenticated = AuthenticatedDataBuilder::new(
            MacAlgorithm::hmac(DigestAlgorithm::Sha384),
            Some(DigestAlgorithm::Sha256),
            &content,
        )
        .add_recipient_info(recipient())
        .build(&mut rng)
        .unwrap();

        let attrs = authenticated.auth_attrs.as_ref().unwrap();
        assert_eq!(attrs[0].oid, CONTENT_TYPE_OID);
        assert_eq!(attrs[1].oid, MESSAGE_DIGEST_OID);

        let der = authenticated.to_der().unwrap();
        let decoded = AuthenticatedData::from_der(&der).unwrap();
        assert_eq!(decoded, authenticated);
        assert_eq!(decoded.verify(with_recipient_password(b"password")).unwrap(), content);
    }

    #[test]
    fn test_tampered_content() {
        let mut rng = ChaCha8Rng::from_seed([43; 32]);
        let content = ContentInfo::Data(b"authenticated".to_vec());

        for digest_alg in [None, Some(DigestAlgorithm::Sha1)] {
            let mut authenticated = AuthenticatedDataBuilder::new(
                MacAlgorithm::hmac(DigestAlgorithm::Sha1),
                digest_alg,
                &content,
            )
            .add_recipient_info(recipient())
            .build(&mut rng)
            .unwrap();

            authenticated.encap_content_info.econtent =
                Some(OctetString::new(&b"Authenticated"[..]).unwrap());
            assert_eq!(
                authenticated.verify(with_recipient_password(b"password")),
                Err(Error::Authentication)
            );
        }
    }

    #[test]
    fn test_explicit_mac_key() {
        let mut rng = ChaCha8Rng::from_seed([44; 32]);
        let content = ContentInfo::Data(vec![1, 2, 3]);
        let mac_alg = MacAlgorithm::hmac(DigestAlgorithm::Sha256);

        let authenticated = AuthenticatedDataBuilder::new(mac_alg, None, &content)
            .mac_key(&[9; 32])
            .add_recipient_info(recipient())
            .build(&mut rng)
            .unwrap();
        assert_eq!(
            authenticated.mac.as_bytes(),
            mac_alg.compute(&[9; 32], &[1, 2, 3]).unwrap()
        );

        let result = AuthenticatedDataBuilder::new(mac_alg, None, &content)
            .mac_key(&[9; 31])
            .build(&mut rng);
        assert_eq!(result, Err(Error::InvalidKeyLength));
    }

    #[test]
    fn test_auth_attrs_need_digest() {
        let mut rng = ChaCha8Rng::from_seed([45; 32]);
        let content = ContentInfo::Data(vec![1, 2, 3]);

        let result =
            AuthenticatedDataBuilder::new(MacAlgorithm::hmac(DigestAlgorithm::Md5), None, &content)
                .add_auth_attribute(content_type_attribute(DATA_OID).unwrap())
                .build(&mut rng);
        assert!(matches!(result, Err(Error::InvalidParameters(_))));
    }
}
