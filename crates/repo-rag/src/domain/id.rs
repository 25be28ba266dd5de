use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $prefix:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Derives a stable id from the given parts; identical parts give identical ids.
            pub fn derive(parts: &[&[u8]]) -> Self {
                let mut hasher = blake3::Hasher::new();
                for part in parts {
                    hasher.update(&(part.len() as u64).to_le_bytes());
                    hasher.update(part);
                }
                let hash = hasher.finalize();
                let hex = hex::encode(&hash.as_bytes()[..6]);
                Self(format!("{}-{}", $prefix, hex))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(DocId, "doc");
define_id!(ChunkId, "chk");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_ids_are_stable() {
        let a = ChunkId::derive(&[b"src/lib.rs", b"0", b"fn main() {}"]);
        let b = ChunkId::derive(&[b"src/lib.rs", b"0", b"fn main() {}"]);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("chk-"));
    }

    #[test]
    fn part_boundaries_matter() {
        let a = DocId::derive(&[b"ab", b"c"]);
        let b = DocId::derive(&[b"a", b"bc"]);
        assert_ne!(a, b);
    }
}
