//! Deterministic percentage bucketing.
//!
//! The bucket of a `(subject, flag, seed)` triple is derived from a 32-bit
//! multiply-by-31 rolling hash over the UTF-16 code units of
//! `"{subject}:{flag}:{seed}"`. The hash is not cryptographic. It must stay
//! bit-for-bit stable: changing it moves subjects between buckets and
//! silently changes live rollout populations.

/// Seed used when a rollout does not name one.
pub const DEFAULT_SEED: &str = "default";

/// Number of buckets.
pub const BUCKETS: u32 = 100;

/// 32-bit rolling hash with wrapping arithmetic: `h = h * 31 + unit`.
pub fn hash_key(key: &str) -> i32 {
    key.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

/// Stable bucket in `[0, 100)` for a subject, flag and seed.
pub fn bucket_of(subject_id: &str, flag: &str, seed: &str) -> u32 {
    let key = format!("{}:{}:{}", subject_id, flag, seed);
    // unsigned_abs keeps i32::MIN at 2^31 instead of overflowing
    hash_key(&key).unsigned_abs() % BUCKETS
}

/// Whether the subject falls inside a `percentage` rollout.
///
/// `percentage <= 0` is never in, `percentage >= 100` is always in.
pub fn is_in_rollout(subject_id: &str, percentage: f64, flag: &str, seed: &str) -> bool {
    if percentage <= 0.0 {
        return false;
    }
    if percentage >= 100.0 {
        return true;
    }
    f64::from(bucket_of(subject_id, flag, seed)) < percentage
}
