//! Summaries of a finished crawl.
//!
//! Addresses are classified by network scope and attributed to a country
//! through a pluggable [`CountryLookup`], then rendered as sorted text.

use crate::crawler::CrawlResult;
use peer_census_query::{IdentityKey, NeighborRecord};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Country label for addresses no lookup could attribute.
pub const UNKNOWN_COUNTRY: &str = "unknown";
/// Country label for addresses in private or loopback ranges.
pub const PRIVATE_COUNTRY: &str = "private";

/// Scope of a discovered address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressScope {
    /// Routable on the public internet.
    Public,
    /// Private ranges: 10/8, 172.16/12, 192.168/16 and fc00::/7.
    Private,
    /// Link-local ranges: 169.254/16 and fe80::/10.
    LinkLocal,
    /// 127/8 and ::1.
    Loopback,
    /// Unspecified or broadcast, never a real peer.
    Unroutable,
    /// Not an IP literal, e.g. a hostname.
    Unresolved,
}

impl AddressScope {
    /// Classify a peer address string.
    pub fn of(address: &str) -> Self {
        match parse_ip(address) {
            Some(IpAddr::V4(ip)) => classify_ipv4(ip),
            Some(IpAddr::V6(ip)) => classify_ipv6(ip),
            None => AddressScope::Unresolved,
        }
    }

    /// Whether the address sits in a range not reachable from the internet.
    pub fn is_private(self) -> bool {
        matches!(
            self,
            AddressScope::Private | AddressScope::LinkLocal | AddressScope::Loopback
        )
    }
}

fn classify_ipv4(ip: Ipv4Addr) -> AddressScope {
    if ip.is_unspecified() || ip.is_broadcast() {
        AddressScope::Unroutable
    } else if ip.is_loopback() {
        AddressScope::Loopback
    } else if ip.is_private() {
        AddressScope::Private
    } else if ip.is_link_local() {
        AddressScope::LinkLocal
    } else {
        AddressScope::Public
    }
}

fn classify_ipv6(ip: Ipv6Addr) -> AddressScope {
    let first = ip.segments()[0];
    if let Some(mapped) = ip.to_ipv4_mapped() {
        classify_ipv4(mapped)
    } else if ip.is_unspecified() {
        AddressScope::Unroutable
    } else if ip.is_loopback() {
        AddressScope::Loopback
    } else if first & 0xfe00 == 0xfc00 {
        AddressScope::Private
    } else if first & 0xffc0 == 0xfe80 {
        AddressScope::LinkLocal
    } else {
        AddressScope::Public
    }
}

/// Extract the IP of an address in any of the forms peers report.
fn parse_ip(address: &str) -> Option<IpAddr> {
    let address = address.trim();
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Some(ip);
    }
    if let Ok(socket) = address.parse::<SocketAddr>() {
        return Some(socket.ip());
    }
    address
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|inner| inner.parse::<IpAddr>().ok())
}

/// Attribution of IP addresses to countries.
pub trait CountryLookup {
    /// Country code for a public IP, if known.
    fn country(&self, ip: IpAddr) -> Option<String>;
}

/// Lookup that attributes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCountryLookup;

impl CountryLookup for NoCountryLookup {
    fn country(&self, _ip: IpAddr) -> Option<String> {
        None
    }
}

/// Lookup backed by a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticCountryLookup {
    table: HashMap<IpAddr, String>,
}

impl StaticCountryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<C: Into<String>>(&mut self, ip: IpAddr, country: C) {
        self.table.insert(ip, country.into());
    }
}

impl FromIterator<(IpAddr, String)> for StaticCountryLookup {
    fn from_iter<T: IntoIterator<Item = (IpAddr, String)>>(iter: T) -> Self {
        StaticCountryLookup {
            table: iter.into_iter().collect(),
        }
    }
}

impl CountryLookup for StaticCountryLookup {
    fn country(&self, ip: IpAddr) -> Option<String> {
        self.table.get(&ip).cloned()
    }
}

/// Human readable summary of a [`CrawlResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Found addresses, sorted.
    pub found: Vec<String>,
    /// Responsive addresses, sorted.
    pub responsive: Vec<String>,
    /// Found addresses that never answered, sorted.
    pub unresponsive: Vec<String>,
    /// Found addresses in private, link-local or loopback ranges, sorted.
    pub private: Vec<String>,
    /// Identities ordered by key.
    pub identities: Vec<(IdentityKey, NeighborRecord)>,
    /// Found addresses per country, most common first.
    pub countries: Vec<(String, usize)>,
}

impl Report {
    /// Classify and attribute every found address of a crawl.
    pub fn new<L: CountryLookup + ?Sized>(result: &CrawlResult, lookup: &L) -> Self {
        let mut found: Vec<String> = result.found.iter().cloned().collect();
        found.sort();
        let mut responsive: Vec<String> = result.responsive.iter().cloned().collect();
        responsive.sort();
        let mut unresponsive: Vec<String> =
            result.unresponsive().into_iter().cloned().collect();
        unresponsive.sort();

        let private = found
            .iter()
            .filter(|a| AddressScope::of(a).is_private())
            .cloned()
            .collect();

        let mut per_country: BTreeMap<String, usize> = BTreeMap::new();
        for address in &found {
            *per_country.entry(attribute(address, lookup)).or_default() += 1;
        }
        let mut countries: Vec<(String, usize)> = per_country.into_iter().collect();
        // BTreeMap order breaks ties by name, the stable sort keeps it.
        countries.sort_by(|a, b| b.1.cmp(&a.1));

        let mut identities: Vec<(IdentityKey, NeighborRecord)> = result
            .identities
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        identities.sort_by(|a, b| a.0.cmp(&b.0));

        Report {
            found,
            responsive,
            unresponsive,
            private,
            identities,
            countries,
        }
    }
}

fn attribute<L: CountryLookup + ?Sized>(address: &str, lookup: &L) -> String {
    let Some(ip) = parse_ip(address) else {
        return UNKNOWN_COUNTRY.to_string();
    };
    if AddressScope::of(address).is_private() {
        return PRIVATE_COUNTRY.to_string();
    }
    lookup
        .country(ip)
        .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Found peers ({}):", self.found.len())?;
        for address in &self.found {
            writeln!(f, "  {address}")?;
        }
        writeln!(f, "Responsive peers ({}):", self.responsive.len())?;
        for address in &self.responsive {
            writeln!(f, "  {address}")?;
        }
        writeln!(f, "Identities ({}):", self.identities.len())?;
        for (key, record) in &self.identities {
            writeln!(
                f,
                "  {key} network={} version={} port={} authenticated={}",
                record.network_id, record.peer_version, record.port, record.authenticated
            )?;
        }
        writeln!(f, "Private peers ({}):", self.private.len())?;
        for address in &self.private {
            writeln!(f, "  {address}")?;
        }
        writeln!(
            f,
            "{} found, {} responsive, {} unresponsive, {} private",
            self.found.len(),
            self.responsive.len(),
            self.unresponsive.len(),
            self.private.len()
        )?;
        writeln!(f, "Peers per country:")?;
        for (country, count) in &self.countries {
            writeln!(f, "  {country}: {count}")?;
        }
        Ok(())
    }
}
