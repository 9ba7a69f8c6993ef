//! Algorithm registry: digests, MACs, block ciphers and the
//! `AlgorithmIdentifier` plumbing they share with the higher level engines.

pub(crate) mod cipher;
mod digest;
mod mac;
pub(crate) mod pad;

pub use self::{cipher::CipherKind, digest::DigestAlgorithm, mac::MacAlgorithm};

use der::{
    asn1::{Any, AnyRef, Null, OctetStringRef},
    Decode, Encode, Tag, Tagged,
};
use spki::{AlgorithmIdentifierOwned, AlgorithmIdentifierRef};

use crate::errors::{Error, Result};

/// Conversion between an algorithm value and its X.509 `AlgorithmIdentifier`.
///
/// ```text
/// AlgorithmIdentifier ::= SEQUENCE {
///     algorithm   OBJECT IDENTIFIER,
///     parameters  ANY DEFINED BY algorithm OPTIONAL }
/// ```
pub trait AlgorithmParameters: Sized {
    /// Builds the `AlgorithmIdentifier` describing `self`.
    fn to_algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned>;

    /// Parses an `AlgorithmIdentifier`, failing with
    /// [`Error::UnsupportedAlgorithm`] when the OID is not part of the family.
    fn from_algorithm_identifier(alg: &AlgorithmIdentifierRef<'_>) -> Result<Self>;
}

/// Implements the `der` traits for a type through its [`AlgorithmParameters`]
/// impl, so it can appear directly as a field of a `Sequence`.
macro_rules! impl_algorithm_identifier {
    ($ty:ty) => {
        impl<'a> ::der::DecodeValue<'a> for $ty {
            fn decode_value<R: ::der::Reader<'a>>(
                reader: &mut R,
                header: ::der::Header,
            ) -> ::der::Result<Self> {
                let alg = <::spki::AlgorithmIdentifierRef<'a> as ::der::DecodeValue<'a>>::decode_value(
                    reader, header,
                )?;
                Ok(<$ty as $crate::algorithms::AlgorithmParameters>::from_algorithm_identifier(&alg)?)
            }
        }

        impl ::der::EncodeValue for $ty {
            fn value_len(&self) -> ::der::Result<::der::Length> {
                use $crate::algorithms::AlgorithmParameters;
                ::der::EncodeValue::value_len(&self.to_algorithm_identifier()?)
            }

            fn encode_value(&self, writer: &mut impl ::der::Writer) -> ::der::Result<()> {
                use $crate::algorithms::AlgorithmParameters;
                ::der::EncodeValue::encode_value(&self.to_algorithm_identifier()?, writer)
            }
        }

        impl<'a> ::der::Sequence<'a> for $ty {}
    };
}

pub(crate) use impl_algorithm_identifier;

/// `NULL` parameters.
pub(crate) fn null_parameters() -> Any {
    Any::from(AnyRef::from(Null))
}

/// Wraps `bytes` as `OCTET STRING` parameters.
pub(crate) fn octet_string_parameters(bytes: &[u8]) -> Result<Any> {
    Ok(Any::new(Tag::OctetString, bytes)?)
}

/// Re-encodes any DER value as an owned `ANY`.
pub(crate) fn any_from<T: Encode>(value: &T) -> Result<Any> {
    Ok(Any::from_der(&value.to_der()?)?)
}

/// Accepts both `NULL` and absent parameters.
pub(crate) fn expect_null_or_absent(alg: &AlgorithmIdentifierRef<'_>) -> Result<()> {
    match alg.parameters {
        None => Ok(()),
        Some(params) if params.is_null() => Ok(()),
        Some(params) => Err(params.tag().value_error().into()),
    }
}

/// Requires the parameters to be present.
pub(crate) fn parameters<'a>(alg: &AlgorithmIdentifierRef<'a>) -> Result<AnyRef<'a>> {
    alg.parameters
        .ok_or_else(|| Error::Asn1(Tag::Sequence.value_error()))
}

/// Reads `OCTET STRING` parameters.
pub(crate) fn octet_string_from<'a>(alg: &AlgorithmIdentifierRef<'a>) -> Result<&'a [u8]> {
    let params = parameters(alg)?;
    Ok(OctetStringRef::try_from(params)?.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::asn1::ObjectIdentifier;

    #[test]
    fn test_null_or_absent() {
        let oid = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
        let null = AnyRef::from(Null);

        let absent = AlgorithmIdentifierRef { oid, parameters: None };
        assert!(expect_null_or_absent(&absent).is_ok());

        let nulled = AlgorithmIdentifierRef { oid, parameters: Some(null) };
        assert!(expect_null_or_absent(&nulled).is_ok());

        let bogus = AnyRef::new(Tag::OctetString, &[1, 2, 3]).unwrap();
        let bogus = AlgorithmIdentifierRef { oid, parameters: Some(bogus) };
        assert!(expect_null_or_absent(&bogus).is_err());
    }

    #[test]
    fn test_octet_string_parameters() {
        let oid = ObjectIdentifier::new_unwrap("1.3.14.3.2.7");
        let params = octet_string_parameters(&[7u8; 8]).unwrap();
        let alg = AlgorithmIdentifierRef {
            oid,
            parameters: Some(AnyRef::from(&params)),
        };
        assert_eq!(octet_string_from(&alg).unwrap(), &[7u8; 8]);
    }
}
