//! Attributes and the order-preserving `SET OF` they are carried in.

use alloc::vec::Vec;
use core::ops::Deref;
use der::{
    asn1::{Any, ObjectIdentifier, OctetStringRef},
    Decode, DecodeValue, Encode, EncodeValue, FixedTag, Header, Length, Reader, Sequence, Tag,
    Writer,
};

use crate::errors::Result;

/// `id-contentType` ([RFC 5652 § 11.1])
///
/// [RFC 5652 § 11.1]: https://www.rfc-editor.org/rfc/rfc5652#section-11.1
pub const CONTENT_TYPE_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");

/// `id-messageDigest` ([RFC 5652 § 11.2])
///
/// [RFC 5652 § 11.2]: https://www.rfc-editor.org/rfc/rfc5652#section-11.2
pub const MESSAGE_DIGEST_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");

/// `SET OF` which keeps its elements in the order they were added.
///
/// DER requires `SET OF` elements to be sorted by their encoding; recipient
/// infos and attributes are instead emitted in caller order, and decoding
/// keeps the order found on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderedSet<T>(Vec<T>);

impl<T> OrderedSet<T> {
    /// Empty set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends `elem`.
    pub fn push(&mut self, elem: T) {
        self.0.push(elem);
    }

    /// Consumes the set, returning its elements.
    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

impl<T> Default for OrderedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for OrderedSet<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> From<Vec<T>> for OrderedSet<T> {
    fn from(elems: Vec<T>) -> Self {
        Self(elems)
    }
}

impl<T> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a, T: Decode<'a>> DecodeValue<'a> for OrderedSet<T> {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let mut elems = Vec::new();
            while !reader.is_finished() {
                elems.push(T::decode(reader)?);
            }
            Ok(Self(elems))
        })
    }
}

impl<T: Encode> EncodeValue for OrderedSet<T> {
    fn value_len(&self) -> der::Result<Length> {
        self.0
            .iter()
            .try_fold(Length::ZERO, |len, elem| len + elem.encoded_len()?)
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        for elem in &self.0 {
            elem.encode(writer)?;
        }
        Ok(())
    }
}

impl<T> FixedTag for OrderedSet<T> {
    const TAG: Tag = Tag::Set;
}

/// `Attribute` ([RFC 5652 § 5.3])
///
/// ```text
///   Attribute ::= SEQUENCE {
///       attrType OBJECT IDENTIFIER,
///       attrValues SET OF AttributeValue }
/// ```
///
/// [RFC 5652 § 5.3]: https://www.rfc-editor.org/rfc/rfc5652#section-5.3
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Attribute {
    /// Attribute type
    pub oid: ObjectIdentifier,
    /// Attribute values
    pub values: OrderedSet<Any>,
}

impl Attribute {
    /// Single-valued attribute.
    pub fn new(oid: ObjectIdentifier, value: Any) -> Self {
        Self {
            oid,
            values: OrderedSet(vec![value]),
        }
    }

    /// The first value, if any.
    pub fn value(&self) -> Option<&Any> {
        self.values.first()
    }
}

/// `SET OF Attribute`
pub type Attributes = OrderedSet<Attribute>;

/// Content-type attribute ([RFC 5652 § 11.1]).
///
/// [RFC 5652 § 11.1]: https://www.rfc-editor.org/rfc/rfc5652#section-11.1
pub fn content_type_attribute(content_type: ObjectIdentifier) -> Result<Attribute> {
    let value = Any::new(Tag::ObjectIdentifier, content_type.as_bytes())?;
    Ok(Attribute::new(CONTENT_TYPE_OID, value))
}

/// Message-digest attribute ([RFC 5652 § 11.2]).
///
/// [RFC 5652 § 11.2]: https://www.rfc-editor.org/rfc/rfc5652#section-11.2
pub fn message_digest_attribute(message_digest: &[u8]) -> Result<Attribute> {
    let digest = OctetStringRef::new(message_digest)?;
    let value = Any::new(Tag::OctetString, digest.as_bytes())?;
    Ok(Attribute::new(MESSAGE_DIGEST_OID, value))
}

/// Finds the single value of the attribute of type `oid`.
pub(crate) fn find_attribute<'a>(attrs: &'a [Attribute], oid: ObjectIdentifier) -> Option<&'a Any> {
    let mut found = attrs.iter().filter(|attr| attr.oid == oid);
    match (found.next(), found.next()) {
        (Some(attr), None) if attr.values.len() == 1 => attr.value(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_caller_order_preserved() {
        let set: OrderedSet<u8> = vec![3u8, 1, 2].into();
        let der = set.to_der().unwrap();
        assert_eq!(der, hex!("3109020103020101020102"));
        assert_eq!(OrderedSet::<u8>::from_der(&der).unwrap(), set);
    }

    #[test]
    fn test_content_type_attribute() {
        let oid = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
        let attr = content_type_attribute(oid).unwrap();
        assert_eq!(
            attr.to_der().unwrap(),
            hex!("301806092a864886f70d010903310b06092a864886f70d010701")
        );
        assert_eq!(attr.value().unwrap().decode_as::<ObjectIdentifier>().unwrap(), oid);
    }

    #[test]
    fn test_find_attribute() {
        let digest = message_digest_attribute(&[1, 2, 3]).unwrap();
        let attrs = vec![digest.clone()];
        assert!(find_attribute(&attrs, MESSAGE_DIGEST_OID).is_some());
        assert!(find_attribute(&attrs, CONTENT_TYPE_OID).is_none());

        let duplicated = vec![digest.clone(), digest];
        assert!(find_attribute(&duplicated, MESSAGE_DIGEST_OID).is_none());
    }
}
