//! Deduplication of neighbor identities reported by many peers.

use log::{debug, info};
use peer_census_query::{IdentityKey, NeighborRecord};
use std::collections::{HashMap, HashSet};

/// Merge newly reported identities into the known set.
///
/// A key seen for the first time is inserted, a known key keeps its first
/// record.
///
/// # Returns
///
/// The number of identities inserted.
pub fn merge(
    existing: &mut HashMap<IdentityKey, NeighborRecord>,
    incoming: HashMap<IdentityKey, NeighborRecord>,
) -> usize {
    let mut inserted = 0;
    for (key, record) in incoming {
        if existing.contains_key(&key) {
            continue;
        }
        info!("New identity {key}: {record}");
        existing.insert(key, record);
        inserted += 1;
    }
    inserted
}

/// Drop partially identified records once a better record is known.
///
/// A partial record is dropped when an identified record shares its IP.
/// Records with the unspecified IP never share one, so they are kept.
pub fn reconcile(identities: &mut HashMap<IdentityKey, NeighborRecord>) {
    let identified_ips: HashSet<String> = identities
        .values()
        .filter(|r| r.is_identified())
        .map(|r| r.ip.clone())
        .collect();

    identities.retain(|key, record| {
        if record.is_identified() || !identified_ips.contains(&record.ip) {
            return true;
        }
        debug!("Dropping partial identity {key}");
        false
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(records: &[NeighborRecord]) -> HashMap<IdentityKey, NeighborRecord> {
        records
            .iter()
            .map(|r| (r.identity_key(), r.clone()))
            .collect()
    }

    #[test]
    fn test_merge_first_seen_wins() {
        let mut first = NeighborRecord::new("1.1.1.1", "aa");
        first.peer_version = "v1".to_string();
        let mut second = first.clone();
        second.peer_version = "v2".to_string();

        let mut identities = HashMap::new();
        assert_eq!(merge(&mut identities, map(&[first.clone()])), 1);
        assert_eq!(merge(&mut identities, map(&[second])), 0);
        assert_eq!(merge(&mut identities, map(&[first.clone()])), 0);

        assert_eq!(identities.len(), 1);
        assert_eq!(identities[&first.identity_key()].peer_version, "v1");
    }

    #[test]
    fn test_reconcile_zero_hash_replaced_by_identified() {
        let mut identities = map(&[
            NeighborRecord::new("9.9.9.9", "0"),
            NeighborRecord::new("9.9.9.9", "abc123"),
        ]);

        reconcile(&mut identities);

        assert_eq!(identities.len(), 1);
        assert!(identities.contains_key(&IdentityKey::new("9.9.9.9", "abc123")));
    }

    #[test]
    fn test_reconcile_keeps_partial_without_better_record() {
        let mut identities = map(&[
            NeighborRecord::new("8.8.8.8", "0"),
            NeighborRecord::new("0.0.0.0", "ffee"),
            NeighborRecord::new("7.7.7.7", "aa"),
        ]);

        reconcile(&mut identities);

        assert_eq!(identities.len(), 3);
    }

    #[test]
    fn test_reconcile_unspecified_ip_kept_when_hash_matches() {
        let mut identities = map(&[
            NeighborRecord::new("0.0.0.0", "abc123"),
            NeighborRecord::new("0.0.0.0", "0"),
            NeighborRecord::new("9.9.9.9", "abc123"),
        ]);

        reconcile(&mut identities);

        assert_eq!(identities.len(), 3);
        assert!(identities.contains_key(&IdentityKey::new("0.0.0.0", "abc123")));
        assert!(identities.contains_key(&IdentityKey::new("9.9.9.9", "abc123")));
    }

    #[test]
    fn test_reconcile_keeps_distinct_identified_records() {
        let mut identities = map(&[
            NeighborRecord::new("9.9.9.9", "0"),
            NeighborRecord::new("9.9.9.9", "aa"),
            NeighborRecord::new("9.9.9.9", "bb"),
        ]);

        reconcile(&mut identities);

        assert_eq!(identities.len(), 2);
        assert!(!identities.contains_key(&IdentityKey::new("9.9.9.9", "0")));
    }
}
