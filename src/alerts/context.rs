//! Keptn context derivation for fired alerts
//!
//! Every remediation sequence needs a context id. The id is derived from
//! the Splunk search id so the same firing always maps to the same context,
//! without touching any process-wide random generator.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::{Builder, Uuid};

const ENTROPY_LEN: usize = 16;

/// Derive a context id from a seed.
///
/// - an empty seed gives an empty context;
/// - a seed that already is a UUID is reused as is;
/// - any other seed deterministically yields a version 4 UUID.
pub fn derive_context(seed: &str) -> String {
    if seed.is_empty() {
        return String::new();
    }
    if Uuid::parse_str(seed).is_ok() {
        return seed.to_string();
    }

    Builder::from_random_bytes(seeded_entropy(seed))
        .into_uuid()
        .to_string()
}

/// Seed for a fired instance: its search id followed by the dispatch time
pub fn context_seed(sid: &str, now: DateTime<Utc>) -> String {
    format!("{}{}", sid, now.format("%a %b %e %H:%M:%S UTC %Y"))
}

/// Short seeds are space padded, longer ones are hashed
fn seeded_entropy(seed: &str) -> [u8; ENTROPY_LEN] {
    let mut entropy = [0u8; ENTROPY_LEN];

    if seed.len() < ENTROPY_LEN {
        let padded = format!("{:<width$}", seed, width = ENTROPY_LEN);
        entropy.copy_from_slice(&padded.as_bytes()[..ENTROPY_LEN]);
    } else {
        let digest = Sha256::digest(seed.as_bytes());
        entropy.copy_from_slice(&digest[..ENTROPY_LEN]);
    }

    entropy
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_seed() {
        assert_eq!(derive_context(""), "");
    }

    #[test]
    fn test_uuid_seed_is_reused() {
        let id = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
        assert_eq!(derive_context(id), id);
    }

    #[test]
    fn test_short_seed_is_padded() {
        // "abc" + 13 spaces, with version and variant bits applied
        assert_eq!(derive_context("abc"), "61626320-2020-4020-a020-202020202020");
    }

    #[test]
    fn test_deterministic() {
        let seed = "scheduler__admin__search__RMD5abc_at_1689080402_42Mon Jul 10 13:00:02 UTC 2023";
        assert_eq!(derive_context(seed), derive_context(seed));
        assert_eq!(derive_context("short"), derive_context("short"));
    }

    #[test]
    fn test_distinct_seeds() {
        assert_ne!(
            derive_context("scheduler__admin__search_1"),
            derive_context("scheduler__admin__search_2")
        );
        assert_ne!(derive_context("a"), derive_context("b"));
    }

    #[test]
    fn test_derived_context_is_v4() {
        let id = derive_context("a seed that is long enough to be hashed");
        let parsed = Uuid::parse_str(&id).expect("must be a valid UUID");
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_context_seed_format() {
        let now = Utc.with_ymd_and_hms(2023, 7, 1, 9, 5, 3).unwrap();
        assert_eq!(context_seed("sid", now), "sidSat Jul  1 09:05:03 UTC 2023");
    }
}
