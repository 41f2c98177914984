use sha2::{Digest, Sha256};

/// Length of a record id in hex characters (12 bytes).
pub const RECORD_ID_LEN: usize = 24;

pub fn compute_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Derives a record id from a seed that is unique per insert.
pub fn record_id(seed: &str) -> String {
    let mut id = compute_hash(seed);
    id.truncate(RECORD_ID_LEN);
    id
}

pub fn is_record_id(candidate: &str) -> bool {
    candidate.len() == RECORD_ID_LEN
        && candidate
            .bytes()
            .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte))
}
