//! Neighbor identity records as reported by a peer's neighbor listing.

use serde::{Deserialize, Deserializer};
use std::fmt;

/// IP reported for a neighbor whose address the reporting peer does not know.
pub const UNSPECIFIED_ADDRESS: &str = "0.0.0.0";

/// Reported identity of one neighbor.
///
/// Records may be partially populated: a peer that has not finished talking
/// to a neighbor reports a zero public key hash or the [`UNSPECIFIED_ADDRESS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(default)]
pub struct NeighborRecord {
    /// Identifier of the logical network the neighbor claims to belong to.
    #[serde(deserialize_with = "string_or_number")]
    pub network_id: String,
    /// Protocol or version tag advertised by the neighbor.
    #[serde(deserialize_with = "string_or_number")]
    pub peer_version: String,
    /// IP of the neighbor, as seen by the reporting peer.
    #[serde(deserialize_with = "null_as_default")]
    pub ip: String,
    /// Port of the neighbor, as seen by the reporting peer.
    #[serde(deserialize_with = "null_as_default")]
    pub port: u16,
    /// Hash of the neighbor's public key, hex encoded.
    #[serde(deserialize_with = "null_as_default")]
    pub public_key_hash: String,
    /// Whether the reporting peer authenticated the neighbor.
    #[serde(deserialize_with = "null_as_default")]
    pub authenticated: bool,
}

impl NeighborRecord {
    /// Create a record carrying only an IP and public key hash.
    pub fn new<I: Into<String>, H: Into<String>>(ip: I, public_key_hash: H) -> Self {
        NeighborRecord {
            ip: ip.into(),
            public_key_hash: public_key_hash.into(),
            ..Default::default()
        }
    }

    /// The key this record is deduplicated under.
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(&self.ip, &self.public_key_hash)
    }

    /// Whether the public key hash parses to zero.
    ///
    /// An empty hash counts as zero, so does a hash of only `0` digits with
    /// or without a `0x` prefix. Strings that are not hex are treated as
    /// real hashes.
    pub fn has_zero_hash(&self) -> bool {
        let hash = self.public_key_hash.trim();
        let digits = hash
            .strip_prefix("0x")
            .or_else(|| hash.strip_prefix("0X"))
            .unwrap_or(hash);
        digits.chars().all(|c| c == '0')
    }

    /// Whether the reporting peer did not know this neighbor's IP.
    pub fn has_unspecified_ip(&self) -> bool {
        self.ip.trim() == UNSPECIFIED_ADDRESS
    }

    /// A record is identified once both its IP and public key hash are known.
    pub fn is_identified(&self) -> bool {
        !self.has_zero_hash() && !self.has_unspecified_ip()
    }
}

impl fmt::Display for NeighborRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} (key: {}, network: {}, version: {}, authenticated: {})",
            self.ip,
            self.port,
            self.public_key_hash,
            self.network_id,
            self.peer_version,
            self.authenticated
        )
    }
}

/// Deduplication key of a [`NeighborRecord`], formatted `ip@public_key_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(ip: &str, public_key_hash: &str) -> Self {
        IdentityKey(format!("{ip}@{public_key_hash}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a `/v2/neighbors` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NeighborsResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub sample: Vec<NeighborRecord>,
    #[serde(deserialize_with = "null_as_default")]
    pub inbound: Vec<NeighborRecord>,
    #[serde(deserialize_with = "null_as_default")]
    pub outbound: Vec<NeighborRecord>,
}

impl NeighborsResponse {
    /// All reported records, sample list first.
    pub fn records(&self) -> impl Iterator<Item = &NeighborRecord> {
        self.sample
            .iter()
            .chain(self.inbound.iter())
            .chain(self.outbound.iter())
    }
}

/// Partially known neighbors are reported with `null` fields.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Nodes disagree on whether identifiers and versions are numbers or strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
        Null,
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
        Raw::Null => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_hash_forms() {
        assert!(NeighborRecord::new("1.1.1.1", "0").has_zero_hash());
        assert!(NeighborRecord::new("1.1.1.1", "0x0000").has_zero_hash());
        assert!(NeighborRecord::new("1.1.1.1", "").has_zero_hash());
        assert!(!NeighborRecord::new("1.1.1.1", "abc123").has_zero_hash());
        assert!(!NeighborRecord::new("1.1.1.1", "0x01").has_zero_hash());
    }

    #[test]
    fn test_identified() {
        assert!(NeighborRecord::new("9.9.9.9", "abc123").is_identified());
        assert!(!NeighborRecord::new("9.9.9.9", "0").is_identified());
        assert!(!NeighborRecord::new("0.0.0.0", "abc123").is_identified());
        assert_eq!(
            NeighborRecord::new("9.9.9.9", "abc123").identity_key().as_str(),
            "9.9.9.9@abc123"
        );
    }

    #[test]
    fn test_decode_partial_response() {
        let body = r#"{
            "sample": [
                {"network_id": 1, "peer_version": "v2", "ip": "1.2.3.4", "port": 8080,
                 "public_key_hash": "abc123", "authenticated": true}
            ],
            "outbound": [{"ip": "5.6.7.8", "network_id": "testnet"}]
        }"#;
        let response: NeighborsResponse = serde_json::from_str(body).unwrap();

        assert!(response.inbound.is_empty());
        let records: Vec<_> = response.records().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].network_id, "1");
        assert_eq!(records[0].port, 8080);
        assert!(records[0].authenticated);
        assert_eq!(records[1].network_id, "testnet");
        assert_eq!(records[1].public_key_hash, "");
        assert!(!records[1].is_identified());
    }

    #[test]
    fn test_decode_numeric_version_and_null_fields() {
        let body = r#"{
            "sample": [
                {"network_id": 1, "peer_version": 402653189, "ip": "1.2.3.4", "port": 8080,
                 "public_key_hash": "abc123", "authenticated": true},
                {"network_id": null, "peer_version": null, "ip": "5.6.7.8", "port": null,
                 "public_key_hash": null, "authenticated": null}
            ],
            "inbound": [{"ip": null, "peer_version": "v3"}],
            "outbound": null
        }"#;
        let response: NeighborsResponse = serde_json::from_str(body).unwrap();

        let records: Vec<_> = response.records().collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].peer_version, "402653189");
        assert!(records[0].is_identified());
        assert_eq!(records[1].ip, "5.6.7.8");
        assert_eq!(records[1].port, 0);
        assert_eq!(records[1].peer_version, "");
        assert!(!records[1].authenticated);
        assert!(records[1].has_zero_hash());
        assert_eq!(records[2].ip, "");
        assert_eq!(records[2].peer_version, "v3");
    }
}
