use crate::shared::buffer::*;
use crate::shared::dns::class::*;
use crate::shared::dns::errors::*;
use crate::shared::dns::name::*;
use crate::shared::dns::types::*;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Records present in the answer, authority and additional sections of dns
/// messages. A record refers to a specific node of the name system and
/// describes one resource of that node. All records belong to the internet
/// class, so the class is validated on decode but not carried around. The
/// OPT variant is the EDNS0 pseudo-record: it has no class and no ttl, the
/// corresponding wire fields hold the advertised udp payload size and the
/// extended flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    A {
        node: Name,
        ttl: u32,
        address: Ipv4Addr,
    },
    AAAA {
        node: Name,
        ttl: u32,
        address: Ipv6Addr,
    },
    NS {
        node: Name,
        ttl: u32,
        target: Name,
    },
    CNAME {
        node: Name,
        ttl: u32,
        target: Name,
    },
    MX {
        node: Name,
        ttl: u32,
        preference: u16,
        exchange: Name,
    },
    SOA {
        node: Name,
        ttl: u32,
        mname: Name,
        rname: Name,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    OPT {
        node: Name,
        payload_size: u16,
        ext_flags: u32,
    },
}

impl Record {
    /// Decode a dns message [`Record`] from the bytes read from the passed
    /// buffer. Records of unknown types still have their bytes consumed, so
    /// callers can skip them and keep decoding the enclosing message.
    pub fn decode_from_buf(buffer: &mut WireBuf) -> Result<Record, ParsingErr> {
        let node = Name::from_wire(buffer)?;
        let type_num = check_end(buffer.read_u16())?;

        let rec_type = match RecordType::from_num(type_num) {
            Ok(v) => v,
            Err(n) => {
                check_end(buffer.read_u16())?;
                check_end(buffer.read_u32())?;
                let data_len = check_end(buffer.read_u16())?;
                check_end(buffer.skip_bytes(data_len as usize))?;
                return Err(ParsingErr::UnknownType(n));
            }
        };

        // The OPT pseudo-record reuses the class field for the advertised
        // payload size and the ttl field for extended rcode and flags. Its
        // options, if any, are not interpreted.
        if rec_type == RecordType::OPT {
            let payload_size = check_end(buffer.read_u16())?;
            let ext_flags = check_end(buffer.read_u32())?;
            let data_len = check_end(buffer.read_u16())?;
            check_end(buffer.skip_bytes(data_len as usize))?;
            return Ok(Record::OPT { node, payload_size, ext_flags });
        }

        match Class::from_num(check_end(buffer.read_u16())?) {
            Err(n) => return Err(ParsingErr::UnknownClass(n)),
            Ok(c) if !c.is_supported() => return Err(ParsingErr::UnsupportedClass(c)),
            Ok(_) => {}
        }
        let ttl = check_end(buffer.read_u32())?;
        let data_len = check_end(buffer.read_u16())?;
        let data_start = buffer.read_pos();

        let record = match rec_type {
            RecordType::A => {
                let octets: [u8; 4] = check_end(buffer.read_bytes())?;
                Record::A { node, ttl, address: Ipv4Addr::from(octets) }
            }
            RecordType::AAAA => {
                let octets: [u8; 16] = check_end(buffer.read_bytes())?;
                Record::AAAA { node, ttl, address: Ipv6Addr::from(octets) }
            }
            RecordType::NS => {
                let target = Name::from_wire(buffer)?;
                Record::NS { node, ttl, target }
            }
            RecordType::CNAME => {
                let target = Name::from_wire(buffer)?;
                Record::CNAME { node, ttl, target }
            }
            RecordType::MX => {
                let preference = check_end(buffer.read_u16())?;
                let exchange = Name::from_wire(buffer)?;
                Record::MX { node, ttl, preference, exchange }
            }
            RecordType::SOA => {
                let mname = Name::from_wire(buffer)?;
                let rname = Name::from_wire(buffer)?;
                let serial = check_end(buffer.read_u32())?;
                let refresh = check_end(buffer.read_u32())?;
                let retry = check_end(buffer.read_u32())?;
                let expire = check_end(buffer.read_u32())?;
                let minimum = check_end(buffer.read_u32())?;
                Record::SOA {
                    node, ttl, mname, rname, serial, refresh, retry, expire, minimum,
                }
            }
            RecordType::OPT => unreachable!(),
        };

        if buffer.read_pos() - data_start != data_len as usize {
            return Err(ParsingErr::DataLenMismatch);
        }
        Ok(record)
    }

    /// Decode a dns message [`Record`] from the passed bytes slice. Wrapper
    /// around [Record::decode_from_buf] which needs a buffer.
    pub fn decode_from_bytes(bytes: &[u8]) -> Result<Record, ParsingErr> {
        let mut buffer = WireBuf::from_raw_bytes(bytes);
        Record::decode_from_buf(&mut buffer)
    }

    /// Encode a dns message [`Record`] to raw bytes, writing them into the
    /// provided buffer. The data length field is patched in place once the
    /// record data has been written.
    pub fn encode_to_buf(&self, buffer: &mut WireBuf) {
        if let Record::OPT { node, payload_size, ext_flags } = self {
            buffer.write_bytes(&node.to_wire());
            buffer.write_u16(RecordType::OPT.to_num());
            buffer.write_u16(*payload_size);
            buffer.write_u32(*ext_flags);
            buffer.write_u16(0);
            return;
        }

        buffer.write_bytes(&self.node().to_wire());
        buffer.write_u16(self.record_type().to_num());
        buffer.write_u16(Class::IN.to_num());
        buffer.write_u32(self.ttl());
        let len_pos = buffer.len();
        buffer.write_u16(0);

        match self {
            Record::A { address, .. } => buffer.write_bytes(&address.octets()),
            Record::AAAA { address, .. } => buffer.write_bytes(&address.octets()),
            Record::NS { target, .. } => buffer.write_bytes(&target.to_wire()),
            Record::CNAME { target, .. } => buffer.write_bytes(&target.to_wire()),
            Record::MX { preference, exchange, .. } => {
                buffer.write_u16(*preference);
                buffer.write_bytes(&exchange.to_wire());
            }
            Record::SOA {
                mname, rname, serial, refresh, retry, expire, minimum, ..
            } => {
                buffer.write_bytes(&mname.to_wire());
                buffer.write_bytes(&rname.to_wire());
                buffer.write_u32(*serial);
                buffer.write_u32(*refresh);
                buffer.write_u32(*retry);
                buffer.write_u32(*expire);
                buffer.write_u32(*minimum);
            }
            Record::OPT { .. } => unreachable!(),
        }

        let data_len = buffer.len() - len_pos - 2;
        buffer.patch_u16(len_pos, data_len as u16);
    }
}

impl Record {
    /// Returns the node the [`Record`] refers to.
    pub fn node(&self) -> &Name {
        match self {
            Record::A { node, .. } => node,
            Record::AAAA { node, .. } => node,
            Record::NS { node, .. } => node,
            Record::CNAME { node, .. } => node,
            Record::MX { node, .. } => node,
            Record::SOA { node, .. } => node,
            Record::OPT { node, .. } => node,
        }
    }

    /// Returns the time-to-live of the [`Record`], zero for pseudo-records.
    pub fn ttl(&self) -> u32 {
        match self {
            Record::A { ttl, .. } => *ttl,
            Record::AAAA { ttl, .. } => *ttl,
            Record::NS { ttl, .. } => *ttl,
            Record::CNAME { ttl, .. } => *ttl,
            Record::MX { ttl, .. } => *ttl,
            Record::SOA { ttl, .. } => *ttl,
            Record::OPT { .. } => 0,
        }
    }

    /// Returns the [RecordType] variant corresponding with the [`Record`].
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::A { .. } => RecordType::A,
            Record::AAAA { .. } => RecordType::AAAA,
            Record::NS { .. } => RecordType::NS,
            Record::CNAME { .. } => RecordType::CNAME,
            Record::MX { .. } => RecordType::MX,
            Record::SOA { .. } => RecordType::SOA,
            Record::OPT { .. } => RecordType::OPT,
        }
    }

    /// Returns a reference to the NS record target.
    /// Panics if the [`Record`] is not of type NS.
    pub fn ns_target(&self) -> &Name {
        match self {
            Record::NS { target, .. } => target,
            _ => panic!("ns_target"),
        }
    }

    /// Returns a reference to the CNAME record target.
    /// Panics if the [`Record`] is not of type CNAME.
    pub fn cname_target(&self) -> &Name {
        match self {
            Record::CNAME { target, .. } => target,
            _ => panic!("cname_target"),
        }
    }

    /// Render the record data in its textual presentation form: addresses
    /// in dotted/colon notation, MX as "PRIO TARGET", names as-is.
    pub fn rdata_text(&self) -> String {
        match self {
            Record::A { address, .. } => address.to_string(),
            Record::AAAA { address, .. } => address.to_string(),
            Record::NS { target, .. } => target.to_string(),
            Record::CNAME { target, .. } => target.to_string(),
            Record::MX { preference, exchange, .. } => format!("{} {}", preference, exchange),
            Record::SOA {
                mname, rname, serial, refresh, retry, expire, minimum, ..
            } => {
                format!(
                    "{} {} {} {} {} {} {}",
                    mname, rname, serial, refresh, retry, expire, minimum
                )
            }
            Record::OPT { .. } => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::from_string(s).unwrap()
    }

    #[test]
    fn test_a_record_roundtrip() {
        let record = Record::A {
            node: name("example.com."),
            ttl: 300,
            address: Ipv4Addr::new(93, 184, 216, 34),
        };
        let mut buffer = WireBuf::new();
        record.encode_to_buf(&mut buffer);
        let decoded = Record::decode_from_bytes(&buffer.into_vec()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.rdata_text(), "93.184.216.34");
    }

    #[test]
    fn test_aaaa_record_roundtrip() {
        let record = Record::AAAA {
            node: name("example.com."),
            ttl: 60,
            address: "2606:2800:220:1::1".parse().unwrap(),
        };
        let mut buffer = WireBuf::new();
        record.encode_to_buf(&mut buffer);
        let decoded = Record::decode_from_bytes(&buffer.into_vec()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.rdata_text(), "2606:2800:220:1::1");
    }

    #[test]
    fn test_mx_record_roundtrip() {
        let record = Record::MX {
            node: name("example.com."),
            ttl: 3600,
            preference: 10,
            exchange: name("mail.example.com."),
        };
        let mut buffer = WireBuf::new();
        record.encode_to_buf(&mut buffer);
        let decoded = Record::decode_from_bytes(&buffer.into_vec()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.rdata_text(), "10 mail.example.com.");
    }

    #[test]
    fn test_ns_and_soa_roundtrip() {
        let ns = Record::NS {
            node: name("com."),
            ttl: 172800,
            target: name("a.gtld-servers.net."),
        };
        let soa = Record::SOA {
            node: name("example.com."),
            ttl: 900,
            mname: name("ns1.example.com."),
            rname: name("hostmaster.example.com."),
            serial: 2024010101,
            refresh: 7200,
            retry: 900,
            expire: 1209600,
            minimum: 86400,
        };
        for record in [ns, soa] {
            let mut buffer = WireBuf::new();
            record.encode_to_buf(&mut buffer);
            assert_eq!(Record::decode_from_bytes(&buffer.into_vec()).unwrap(), record);
        }
    }

    #[test]
    fn test_opt_record_roundtrip() {
        let record = Record::OPT {
            node: name("."),
            payload_size: 4096,
            ext_flags: 0,
        };
        let mut buffer = WireBuf::new();
        record.encode_to_buf(&mut buffer);
        let decoded = Record::decode_from_bytes(&buffer.into_vec()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_unknown_type_skipped() {
        // A TXT record (type 16) must be consumed entirely and reported
        // as unknown, leaving the cursor on the next record.
        let mut buffer = WireBuf::new();
        buffer.write_bytes(&name("example.com.").to_wire());
        buffer.write_u16(16);
        buffer.write_u16(Class::IN.to_num());
        buffer.write_u32(60);
        buffer.write_u16(3);
        buffer.write_bytes(&[2, b'h', b'i']);
        buffer.write_u8(0xee);
        let len = buffer.len();

        let mut buffer = WireBuf::from_raw_bytes(&buffer.into_vec());
        let res = Record::decode_from_buf(&mut buffer);
        assert!(matches!(res, Err(ParsingErr::UnknownType(16))));
        assert_eq!(buffer.read_pos(), len - 1);
        assert_eq!(buffer.read_u8(), Some(0xee));
    }

    #[test]
    fn test_data_len_mismatch() {
        let mut buffer = WireBuf::new();
        buffer.write_bytes(&name("example.com.").to_wire());
        buffer.write_u16(RecordType::A.to_num());
        buffer.write_u16(Class::IN.to_num());
        buffer.write_u32(60);
        buffer.write_u16(3); // A rdata must be 4 bytes
        buffer.write_bytes(&[1, 2, 3]);

        let res = Record::decode_from_bytes(&buffer.into_vec());
        assert!(matches!(res, Err(ParsingErr::DataLenMismatch) | Err(ParsingErr::BytesEnd)));
    }
}
