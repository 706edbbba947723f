//! Commit identifiers for the two hash namespaces.
//!
//! Both are raw 20-byte SHA-1 style hashes. They share a shape but never
//! compare with each other; only the mapping relates them.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Length of a binary id
pub const ID_LEN: usize = 20;
/// Length of a hex-encoded id
pub const HEX_LEN: usize = 40;

/// True if `s` is exactly 40 hex digits
pub fn is_full_hex(s: &str) -> bool {
    s.len() == HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(pub [u8; ID_LEN]);

        impl $name {
            pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
                bytes.try_into().ok().map(Self)
            }

            pub fn from_hex(s: &str) -> Result<Self, Error> {
                if !is_full_hex(s) {
                    return Err(Error::InvalidId(s.to_string()));
                }
                let mut out = [0u8; ID_LEN];
                hex::decode_to_slice(s, &mut out).map_err(|_| Error::InvalidId(s.to_string()))?;
                Ok(Self(out))
            }

            pub fn as_bytes(&self) -> &[u8; ID_LEN] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Error> {
                Self::from_hex(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_hex()[..12])
            }
        }
    };
}

define_id!(
    /// Commit id in the local (primary) namespace
    CommitId
);

define_id!(
    /// Commit id in the mirrored foreign namespace
    ForeignCommitId
);
