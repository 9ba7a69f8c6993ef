//! Error types

use core::fmt;
use der::asn1::ObjectIdentifier;

/// Alias for [`core::result::Result`] with the `cms-crypto` crate's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Algorithm identifier names an algorithm this crate does not implement.
    UnsupportedAlgorithm {
        /// OID of the unsupported algorithm
        oid: ObjectIdentifier,
    },

    /// Cipher and mode combination has no registered OID.
    UnsupportedContentEncryption,

    /// Key material was rejected by the underlying primitive.
    InvalidKey,

    /// Key length does not satisfy the algorithm's key-size policy.
    InvalidKeyLength,

    /// Algorithm parameters are malformed or out of range.
    InvalidParameters(&'static str),

    /// Decryption failed.
    Decryption,

    /// Key to be wrapped is too short.
    KeyTooShort,

    /// Key to be wrapped is too long.
    KeyTooLong,

    /// Wrapped key failed validation.
    InvalidWrappedKey,

    /// Password-based key wrap cannot use a CTR mode cipher.
    CtrModeWrap,

    /// Password-based key unwrap cannot use a CTR mode cipher.
    CtrModeUnwrap,

    /// Recipient info list is empty.
    NoRecipientInfoFound,

    /// None of the recipient infos yielded the content-encryption key.
    NoRecipientInfoMatched,

    /// Authentication tag or MAC did not verify.
    Authentication,

    /// Content type does not match the structure being decoded.
    UnexpectedContentType {
        /// OID found in the content info
        oid: ObjectIdentifier,
    },

    /// ASN.1 DER encoding or decoding error.
    Asn1(der::Error),
}

impl Error {
    /// Returns `true` when no recipient could recover the content-encryption key.
    pub fn is_recipient_error(&self) -> bool {
        matches!(self, Error::NoRecipientInfoFound | Error::NoRecipientInfoMatched)
    }
}

impl core::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedAlgorithm { oid } => write!(f, "unsupported algorithm: {}", oid),
            Error::UnsupportedContentEncryption => {
                f.write_str("unsupported content encryption algorithm")
            }
            Error::InvalidKey => f.write_str("unable to use key"),
            Error::InvalidKeyLength => f.write_str("invalid key length"),
            Error::InvalidParameters(reason) => write!(f, "invalid parameters: {}", reason),
            Error::Decryption => f.write_str("decryption failed, incorrect key or password"),
            Error::KeyTooShort => f.write_str("key too short to wrap"),
            Error::KeyTooLong => f.write_str("key too long to wrap"),
            Error::InvalidWrappedKey => f.write_str("invalid wrapped key"),
            Error::CtrModeWrap => f.write_str("unable to wrap key in CTR mode"),
            Error::CtrModeUnwrap => f.write_str("unable to unwrap key in CTR mode"),
            Error::NoRecipientInfoFound => f.write_str("no recipient info found"),
            Error::NoRecipientInfoMatched => f.write_str("no recipient info matched"),
            Error::Authentication => f.write_str("authentication failed"),
            Error::UnexpectedContentType { oid } => write!(f, "unexpected content type: {}", oid),
            Error::Asn1(err) => write!(f, "ASN.1 error: {}", err),
        }
    }
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        match err.kind() {
            der::ErrorKind::OidUnknown { oid } => Error::UnsupportedAlgorithm { oid },
            _ => Error::Asn1(err),
        }
    }
}

impl From<Error> for der::Error {
    fn from(err: Error) -> der::Error {
        match err {
            Error::Asn1(err) => err,
            Error::UnsupportedAlgorithm { oid } => der::ErrorKind::OidUnknown { oid }.into(),
            _ => der::Tag::Sequence.value_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::Decryption.to_string(),
            "decryption failed, incorrect key or password"
        );
        assert_eq!(Error::InvalidKey.to_string(), "unable to use key");
        assert_eq!(Error::CtrModeWrap.to_string(), "unable to wrap key in CTR mode");
        assert_eq!(Error::NoRecipientInfoFound.to_string(), "no recipient info found");
    }

    #[test]
    fn test_recipient_error_class() {
        assert!(Error::NoRecipientInfoFound.is_recipient_error());
        assert!(Error::NoRecipientInfoMatched.is_recipient_error());
        assert!(!Error::InvalidWrappedKey.is_recipient_error());
    }

    #[test]
    fn test_der_round_trip_of_unknown_oid() {
        let oid = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
        let err = Error::UnsupportedAlgorithm { oid };
        let der_err: der::Error = err.into();
        assert_eq!(Error::from(der_err), err);
    }
}
