//! Block ciphers available to the content-encryption and key-wrap engines.

use core::fmt;

use crate::key_size::{HasKeySize, KeySizeSpecifier};

/// Block cipher primitive.
///
/// Block and key sizes come from a static table keyed by the variant.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CipherKind {
    /// DES
    Des,
    /// Two-key Triple DES (EDE)
    DesEde2,
    /// Three-key Triple DES (EDE)
    DesEde3,
    /// AES-128
    Aes128,
    /// AES-192
    Aes192,
    /// AES-256
    Aes256,
    /// CAST5 (CAST-128)
    Cast5,
    /// Camellia-128
    Camellia128,
}

impl CipherKind {
    /// Every supported cipher.
    pub const ALL: &'static [CipherKind] = &[
        CipherKind::Des,
        CipherKind::DesEde2,
        CipherKind::DesEde3,
        CipherKind::Aes128,
        CipherKind::Aes192,
        CipherKind::Aes256,
        CipherKind::Cast5,
        CipherKind::Camellia128,
    ];

    /// Block size in bytes.
    pub fn block_size(self) -> usize {
        match self {
            CipherKind::Des | CipherKind::DesEde2 | CipherKind::DesEde3 | CipherKind::Cast5 => 8,
            CipherKind::Aes128 | CipherKind::Aes192 | CipherKind::Aes256 => 16,
            CipherKind::Camellia128 => 16,
        }
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self {
            CipherKind::Des => "DES",
            CipherKind::DesEde2 => "DES-EDE2",
            CipherKind::DesEde3 => "DES-EDE3",
            CipherKind::Aes128 => "AES-128",
            CipherKind::Aes192 => "AES-192",
            CipherKind::Aes256 => "AES-256",
            CipherKind::Cast5 => "CAST5",
            CipherKind::Camellia128 => "Camellia-128",
        }
    }
}

impl HasKeySize for CipherKind {
    fn key_size_specifier(&self) -> KeySizeSpecifier {
        match self {
            CipherKind::Des => KeySizeSpecifier::Fixed(8),
            CipherKind::DesEde2 => KeySizeSpecifier::Fixed(16),
            CipherKind::DesEde3 => KeySizeSpecifier::Fixed(24),
            CipherKind::Aes128 => KeySizeSpecifier::Fixed(16),
            CipherKind::Aes192 => KeySizeSpecifier::Fixed(24),
            CipherKind::Aes256 => KeySizeSpecifier::Fixed(32),
            CipherKind::Cast5 => KeySizeSpecifier::Range(5, 16),
            CipherKind::Camellia128 => KeySizeSpecifier::Fixed(16),
        }
    }
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs `$body` with `$c` bound to the concrete cipher type of `$kind` and
/// `$ctr` bound to the CTR counter flavor matching its block size.
macro_rules! with_cipher {
    ($kind:expr, $c:ident, $ctr:ident => $body:expr) => {
        match $kind {
            $crate::algorithms::CipherKind::Des => {
                type $c = ::des::Des;
                type $ctr = ::ctr::flavors::Ctr64BE;
                $body
            }
            $crate::algorithms::CipherKind::DesEde2 => {
                type $c = ::des::TdesEde2;
                type $ctr = ::ctr::flavors::Ctr64BE;
                $body
            }
            $crate::algorithms::CipherKind::DesEde3 => {
                type $c = ::des::TdesEde3;
                type $ctr = ::ctr::flavors::Ctr64BE;
                $body
            }
            $crate::algorithms::CipherKind::Aes128 => {
                type $c = ::aes::Aes128;
                type $ctr = ::ctr::flavors::Ctr128BE;
                $body
            }
            $crate::algorithms::CipherKind::Aes192 => {
                type $c = ::aes::Aes192;
                type $ctr = ::ctr::flavors::Ctr128BE;
                $body
            }
            $crate::algorithms::CipherKind::Aes256 => {
                type $c = ::aes::Aes256;
                type $ctr = ::ctr::flavors::Ctr128BE;
                $body
            }
            $crate::algorithms::CipherKind::Cast5 => {
                type $c = ::cast5::Cast5;
                type $ctr = ::ctr::flavors::Ctr64BE;
                $body
            }
            $crate::algorithms::CipherKind::Camellia128 => {
                type $c = ::camellia::Camellia128;
                type $ctr = ::ctr::flavors::Ctr128BE;
                $body
            }
        }
    };
}

pub(crate) use with_cipher;
