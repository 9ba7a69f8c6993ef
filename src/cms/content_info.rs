//! `ContentInfo` and content encapsulation.

use alloc::vec::Vec;
use der::{
    asn1::{Any, ObjectIdentifier, OctetString},
    Decode, DecodeValue, Encode, EncodeValue, Header, Length, Reader, Sequence, Writer,
};

use super::{AuthEnvelopedData, AuthenticatedData, DigestedData, EncryptedData, EnvelopedData};
use crate::errors::{Error, Result};

/// `id-data`
pub const DATA_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");

/// `id-envelopedData`
pub const ENVELOPED_DATA_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.3");

/// `id-digestedData`
pub const DIGESTED_DATA_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.5");

/// `id-encryptedData`
pub const ENCRYPTED_DATA_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.6");

/// `id-ct-authData`
pub const AUTH_DATA_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.1.2");

/// `id-ct-authEnvelopedData`
pub const AUTH_ENVELOPED_DATA_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.1.23");

/// `ContentInfo` ([RFC 5652 § 3]) over the content types this crate
/// understands.
///
/// ```text
///   ContentInfo ::= SEQUENCE {
///       contentType        CONTENT-TYPE.
///                       &id({ContentSet}),
///       content            [0] EXPLICIT CONTENT-TYPE.
///                       &Type({ContentSet}{@contentType})}
/// ```
///
/// [RFC 5652 § 3]: https://www.rfc-editor.org/rfc/rfc5652#section-3
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContentInfo {
    /// Arbitrary octets.
    Data(Vec<u8>),
    /// Digested content.
    DigestedData(DigestedData),
    /// Content encrypted under a key shared out of band.
    EncryptedData(EncryptedData),
    /// Content encrypted for a set of recipients.
    EnvelopedData(EnvelopedData),
    /// Content authenticated with a MAC for a set of recipients.
    AuthenticatedData(AuthenticatedData),
    /// Content encrypted with an AEAD for a set of recipients.
    AuthEnvelopedData(AuthEnvelopedData),
}

#[derive(Sequence)]
struct RawContentInfo {
    content_type: ObjectIdentifier,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT")]
    content: Any,
}

impl ContentInfo {
    /// Content type identifier.
    pub fn content_type(&self) -> ObjectIdentifier {
        match self {
            ContentInfo::Data(_) => DATA_OID,
            ContentInfo::DigestedData(_) => DIGESTED_DATA_OID,
            ContentInfo::EncryptedData(_) => ENCRYPTED_DATA_OID,
            ContentInfo::EnvelopedData(_) => ENVELOPED_DATA_OID,
            ContentInfo::AuthenticatedData(_) => AUTH_DATA_OID,
            ContentInfo::AuthEnvelopedData(_) => AUTH_ENVELOPED_DATA_OID,
        }
    }

    /// Content type and `eContent` octets for embedding this content in
    /// another layer.
    ///
    /// `Data` contributes its octets directly; every other type contributes
    /// its DER encoding.
    pub fn encapsulate(&self) -> Result<(ObjectIdentifier, Vec<u8>)> {
        let content = match self {
            ContentInfo::Data(data) => data.clone(),
            ContentInfo::DigestedData(inner) => inner.to_der()?,
            ContentInfo::EncryptedData(inner) => inner.to_der()?,
            ContentInfo::EnvelopedData(inner) => inner.to_der()?,
            ContentInfo::AuthenticatedData(inner) => inner.to_der()?,
            ContentInfo::AuthEnvelopedData(inner) => inner.to_der()?,
        };

        Ok((self.content_type(), content))
    }

    /// Inverse of [`ContentInfo::encapsulate`].
    pub fn decapsulate(content_type: ObjectIdentifier, content: &[u8]) -> Result<Self> {
        Ok(match content_type {
            DATA_OID => ContentInfo::Data(content.to_vec()),
            DIGESTED_DATA_OID => ContentInfo::DigestedData(DigestedData::from_der(content)?),
            ENCRYPTED_DATA_OID => ContentInfo::EncryptedData(EncryptedData::from_der(content)?),
            ENVELOPED_DATA_OID => ContentInfo::EnvelopedData(EnvelopedData::from_der(content)?),
            AUTH_DATA_OID => ContentInfo::AuthenticatedData(AuthenticatedData::from_der(content)?),
            AUTH_ENVELOPED_DATA_OID => {
                ContentInfo::AuthEnvelopedData(AuthEnvelopedData::from_der(content)?)
            }
            oid => return Err(Error::UnexpectedContentType { oid }),
        })
    }

    fn to_raw(&self) -> der::Result<RawContentInfo> {
        let content = match self {
            ContentInfo::Data(data) => Any::encode_from(&OctetString::new(data.as_slice())?)?,
            ContentInfo::DigestedData(inner) => Any::encode_from(inner)?,
            ContentInfo::EncryptedData(inner) => Any::encode_from(inner)?,
            ContentInfo::EnvelopedData(inner) => Any::encode_from(inner)?,
            ContentInfo::AuthenticatedData(inner) => Any::encode_from(inner)?,
            ContentInfo::AuthEnvelopedData(inner) => Any::encode_from(inner)?,
        };

        Ok(RawContentInfo {
            content_type: self.content_type(),
            content,
        })
    }

    fn from_raw(raw: RawContentInfo) -> Result<Self> {
        match raw.content_type {
            DATA_OID => Ok(ContentInfo::Data(
                raw.content.decode_as::<OctetString>()?.into_bytes(),
            )),
            oid => Self::decapsulate(oid, &raw.content.to_der()?),
        }
    }

    /// Decodes a DER `ContentInfo`.
    ///
    /// Unlike [`Decode::from_der`], failures stay in this crate's [`Error`]
    /// domain: a content type other than the six supported ones is reported
    /// as [`Error::UnexpectedContentType`].
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        Self::from_raw(RawContentInfo::from_der(bytes)?)
    }
}

impl<'a> DecodeValue<'a> for ContentInfo {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        Ok(Self::from_raw(RawContentInfo::decode_value(reader, header)?)?)
    }
}

impl EncodeValue for ContentInfo {
    fn value_len(&self) -> der::Result<Length> {
        self.to_raw()?.value_len()
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.to_raw()?.encode_value(writer)
    }
}

impl<'a> Sequence<'a> for ContentInfo {}

impl From<DigestedData> for ContentInfo {
    fn from(inner: DigestedData) -> Self {
        ContentInfo::DigestedData(inner)
    }
}

impl From<EncryptedData> for ContentInfo {
    fn from(inner: EncryptedData) -> Self {
        ContentInfo::EncryptedData(inner)
    }
}

impl From<EnvelopedData> for ContentInfo {
    fn from(inner: EnvelopedData) -> Self {
        ContentInfo::EnvelopedData(inner)
    }
}

impl From<AuthenticatedData> for ContentInfo {
    fn from(inner: AuthenticatedData) -> Self {
        ContentInfo::AuthenticatedData(inner)
    }
}

impl From<AuthEnvelopedData> for ContentInfo {
    fn from(inner: AuthEnvelopedData) -> Self {
        ContentInfo::AuthEnvelopedData(inner)
    }
}

/// `EncapsulatedContentInfo` ([RFC 5652 § 5.2])
///
/// ```text
///   EncapsulatedContentInfo ::= SEQUENCE {
///       eContentType ContentType,
///       eContent [0] EXPLICIT OCTET STRING OPTIONAL }
/// ```
///
/// [RFC 5652 § 5.2]: https://www.rfc-editor.org/rfc/rfc5652#section-5.2
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct EncapsulatedContentInfo {
    /// Type of the encapsulated content
    pub econtent_type: ObjectIdentifier,
    /// Encapsulated content octets
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub econtent: Option<OctetString>,
}

impl EncapsulatedContentInfo {
    pub(crate) fn new(content: &ContentInfo) -> Result<Self> {
        let (econtent_type, econtent) = content.encapsulate()?;
        Ok(Self {
            econtent_type,
            econtent: Some(OctetString::new(econtent)?),
        })
    }

    /// Encapsulated octets, empty when `eContent` is absent.
    pub fn content_bytes(&self) -> &[u8] {
        self.econtent
            .as_ref()
            .map(OctetString::as_bytes)
            .unwrap_or_default()
    }

    /// Decodes the encapsulated content.
    pub fn content(&self) -> Result<ContentInfo> {
        ContentInfo::decapsulate(self.econtent_type, self.content_bytes())
    }
}
