//! Row identifier generation.
//!
//! An id is `{tag}-{utc timestamp with microseconds}-{8 random hex chars}`. Nothing checks
//! the id against existing table contents; collisions are unlikely, not impossible.

use chrono::{DateTime, Utc};

/// Generate an id for the given sequence tag from the current time and fresh randomness.
pub fn generate_id(sequence_tag: &str) -> String {
    let entropy = uuid::Uuid::new_v4().simple().to_string();
    generate_id_at(sequence_tag, Utc::now(), &entropy)
}

/// Deterministic form of [`generate_id`]. Only the first 8 characters of `entropy` are used.
pub fn generate_id_at(sequence_tag: &str, now: DateTime<Utc>, entropy: &str) -> String {
    let rand: String = entropy.chars().take(8).collect();
    let tag = sequence_tag.trim();
    let stamp = now.format("%Y%m%d%H%M%S%6f");
    if tag.is_empty() {
        format!("{}-{}", stamp, rand)
    } else {
        format!("{}-{}-{}", tag, stamp, rand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn embeds_tag_time_and_entropy() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let id = generate_id_at("cli", now, "deadbeefcafebabe");
        assert_eq!(id, "cli-20240309140507000000-deadbeef");
    }

    #[test]
    fn blank_tag_is_omitted() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(generate_id_at("  ", now, "0123456789"), "20240101000000000000-01234567");
    }

    #[test]
    fn batch_of_ids_is_distinct() {
        let ids: HashSet<String> = (1..=1000).map(|i| generate_id(&i.to_string())).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| !id.is_empty()));
    }

    #[test]
    fn position_tags_are_embedded_with_fixed_clock() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let ids: Vec<String> = (1..=50).map(|i| generate_id_at(&i.to_string(), now, "aaaaaaaa")).collect();
        for (i, id) in ids.iter().enumerate() {
            assert!(id.starts_with(&format!("{}-", i + 1)), "{id}");
        }
        let distinct: HashSet<&String> = ids.iter().collect();
        assert_eq!(distinct.len(), ids.len());
    }
}
