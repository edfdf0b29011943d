//! Stable anonymization digest shared by behavior ingest (§4.2) and
//! intent-node id derivation (§3 IntentNode).

use sha2::{Digest, Sha256};

/// Truncates a SHA-256 digest of `input` to 16 hex characters (64 bits).
///
/// Stable across process restarts for the same input, which is the only
/// property §4.2 and §3 require ("a given (type, hash) tuple has stable
/// semantics across restarts"). Collision probability at the node/evidence
/// cardinalities this system is bounded to (`max_nodes`, a 30-day evidence
/// window) is negligible.
pub fn stable_digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let full = hasher.finalize();
    hex::encode(&full[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_digest() {
        assert_eq!(stable_digest("/home/alice/doc.pdf"), stable_digest("/home/alice/doc.pdf"));
    }

    #[test]
    fn different_input_different_digest() {
        assert_ne!(stable_digest("a"), stable_digest("b"));
    }

    #[test]
    fn digest_is_sixteen_hex_chars() {
        assert_eq!(stable_digest("anything").len(), 16);
    }
}
