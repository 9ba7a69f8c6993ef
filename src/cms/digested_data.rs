//! Digested content ([RFC 5652 § 7]).
//!
//! [RFC 5652 § 7]: https://www.rfc-editor.org/rfc/rfc5652#section-7

use der::{asn1::OctetString, Sequence};
use subtle::ConstantTimeEq;
use tracing::debug;

use super::{CmsVersion, ContentInfo, EncapsulatedContentInfo, DATA_OID};
use crate::{algorithms::DigestAlgorithm, errors::Result};

/// `DigestedData`
///
/// ```text
///   DigestedData ::= SEQUENCE {
///       version CMSVersion,
///       digestAlgorithm DigestAlgorithmIdentifier,
///       encapContentInfo EncapsulatedContentInfo,
///       digest Digest }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct DigestedData {
    pub version: CmsVersion,
    pub digest_alg: DigestAlgorithm,
    pub encap_content_info: EncapsulatedContentInfo,
    pub digest: OctetString,
}

impl DigestedData {
    /// Digests `content` with `digest_alg`.
    pub fn new(digest_alg: DigestAlgorithm, content: &ContentInfo) -> Result<Self> {
        let encap_content_info = EncapsulatedContentInfo::new(content)?;
        let digest = digest_alg.digest(encap_content_info.content_bytes());

        let version = if encap_content_info.econtent_type == DATA_OID {
            CmsVersion::V0
        } else {
            CmsVersion::V2
        };

        debug!(alg = %digest_alg, version = ?version, "produced digested data");

        Ok(Self {
            version,
            digest_alg,
            encap_content_info,
            digest: OctetString::new(digest)?,
        })
    }

    /// Recomputes the digest and returns the content when it matches.
    ///
    /// A mismatch and an undecodable content both give `None`.
    pub fn verify(&self) -> Option<ContentInfo> {
        let expected = self
            .digest_alg
            .digest(self.encap_content_info.content_bytes());

        if !bool::from(expected.ct_eq(self.digest.as_bytes())) {
            debug!(alg = %self.digest_alg, "digest mismatch");
            return None;
        }

        self.encap_content_info.content().ok()
    }
}
