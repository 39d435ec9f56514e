use crate::shared::dns::{Name, Record, RecordType};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// The well known port of the domain name system.
pub const DNS_PORT: u16 = 53;

// The IPv4 addresses of the A-M root nameservers of the domain name
// system, used to bootstrap every recursion.
const ROOT_SERVERS: [(&str, [u8; 4]); 13] = [
    ("a.root-servers.net.", [198, 41, 0, 4]),
    ("b.root-servers.net.", [199, 9, 14, 201]),
    ("c.root-servers.net.", [192, 33, 4, 12]),
    ("d.root-servers.net.", [199, 7, 91, 13]),
    ("e.root-servers.net.", [192, 203, 230, 10]),
    ("f.root-servers.net.", [192, 5, 5, 241]),
    ("g.root-servers.net.", [192, 112, 36, 4]),
    ("h.root-servers.net.", [198, 97, 190, 53]),
    ("i.root-servers.net.", [192, 36, 148, 17]),
    ("j.root-servers.net.", [192, 58, 128, 30]),
    ("k.root-servers.net.", [193, 0, 14, 129]),
    ("l.root-servers.net.", [199, 7, 83, 42]),
    ("m.root-servers.net.", [202, 12, 27, 33]),
];

/// The compiled-in addresses of the root nameservers.
pub fn root_hints() -> Vec<SocketAddr> {
    ROOT_SERVERS
        .iter()
        .map(|(_, octets)| SocketAddr::new(IpAddr::V4(Ipv4Addr::from(*octets)), DNS_PORT))
        .collect()
}

/// Extract and return all records of the given type and node from the
/// passed vector, preserving their wire order. The extracted records are
/// removed from the vector.
pub fn extract_records(records: &mut Vec<Record>, kind: RecordType, node: &Name) -> Vec<Record> {
    let mut extracted = Vec::new();
    let mut remaining = Vec::with_capacity(records.len());
    for record in records.drain(..) {
        if record.record_type() == kind && record.node() == node {
            extracted.push(record);
        } else {
            remaining.push(record);
        }
    }
    *records = remaining;
    extracted
}

/// Extract and return the first record of the given type and node from
/// the passed vector. The record is removed from the vector, not cloned.
pub fn extract_record(records: &mut Vec<Record>, kind: RecordType, node: &Name) -> Option<Record> {
    let index = records
        .iter()
        .position(|rec| rec.record_type() == kind && rec.node() == node)?;
    Some(records.remove(index))
}

/// Render the records as the textual answer handed to clients,
/// preserving order. Duplicates are kept.
pub fn render_answer(records: &[Record]) -> Vec<String> {
    records.iter().map(|rec| rec.rdata_text()).collect()
}

/// The lowest time-to-live among the records, used as the
/// lifetime of the whole answer.
pub fn min_ttl(records: &[Record]) -> u32 {
    records.iter().map(|rec| rec.ttl()).min().unwrap_or(0)
}
