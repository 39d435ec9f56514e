use crate::shared::buffer::*;
use std::fmt::{self, Display, Formatter};
use std::str;

/// A wrapper for domain names. The [`Name`] struct holds valid absolute
/// domain names in canonical form: lowercase, with a trailing dot. Every
/// construction path guarantees the invariant, so cache keys and name
/// comparisons can operate directly on the inner string. [`Name`]
/// implements `AsRef<str>` to easily obtain it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(String);

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Name {
    const POINTER_MASK: u16 = 0b00111111_11111111;
    const LABEL_MASK: u8 = 0b11000000;
    const MAX_REDIR: u16 = 15;

    /// Creates a [`Name`] from the passed string, which must be a valid
    /// absolute domain name. Uppercase characters are folded.
    pub fn from_string(s: &str) -> Result<Self, NameErr> {
        let lowered = s.to_ascii_lowercase();
        validate_name(&lowered)?;
        Ok(Self(lowered))
    }

    /// Creates a [`Name`] from a host string as provided by clients:
    /// the trailing dot is appended if missing, case is folded.
    pub fn canonicalize(s: &str) -> Result<Self, NameErr> {
        if s.is_empty() {
            return Err(NameErr::MalformedName("empty name"));
        }
        if s.ends_with('.') {
            Self::from_string(s)
        } else {
            let mut owned = String::with_capacity(s.len() + 1);
            owned.push_str(s);
            owned.push('.');
            Self::from_string(&owned)
        }
    }

    /// Creates a [`Name`] parsing its binary representation: a series of
    /// length-prefixed labels, possibly ending in a compression pointer.
    /// The number of pointer jumps is bounded for security reasons.
    pub fn from_wire(buffer: &mut WireBuf) -> Result<Self, NameErr> {
        let mut name_bytes: Vec<u8> = Vec::with_capacity(64);
        let mut pos_after_jump: usize = 0;
        let mut n_jumps: u16 = 0;

        loop {
            let len_byte = check_end(buffer.read_u8())?;
            match len_byte & Self::LABEL_MASK {
                // Pointer type. Jump the read position to the referenced
                // part of the message. After jumps, the position is re-set.
                0b11000000 => {
                    if n_jumps >= Self::MAX_REDIR {
                        return Err(NameErr::MaxRedir);
                    }
                    if n_jumps == 0 {
                        pos_after_jump = buffer.read_pos() + 1;
                    }
                    let second_byte = check_end(buffer.read_u8())? as u16;
                    let jump_pos = (((len_byte as u16) << 8) | second_byte) & Self::POINTER_MASK;
                    if jump_pos as usize >= buffer.len() {
                        return Err(NameErr::PointerOutOfBounds);
                    }
                    buffer.set_read_pos(jump_pos as usize);
                    n_jumps += 1;
                }
                // Normal label type. Could be found either after
                // a pointer redirection or the very first time.
                0b00000000 => {
                    if len_byte == 0 {
                        name_bytes.push(b'.');
                        break;
                    }
                    if !name_bytes.is_empty() {
                        name_bytes.push(b'.');
                    }
                    let label_bytes = check_end(buffer.read_bytes_vec(len_byte as usize))?;
                    name_bytes.extend(label_bytes);
                    if name_bytes.len() > 255 {
                        return Err(NameErr::LongName);
                    }
                }
                // Starting bits 10 and 01 are reserved for
                // later use. We treat them as an error.
                _ => return Err(NameErr::MalformedLabel("wrong starting bits")),
            }
        }

        // Re-set the position if we followed a pointer.
        if pos_after_jump > 0 {
            buffer.set_read_pos(pos_after_jump);
        }

        match str::from_utf8(&name_bytes) {
            Err(_) => Err(NameErr::MalformedName("not UTF-8")),
            Ok(name) => Self::from_string(name),
        }
    }

    /// Encode the [`Name`] in its binary representation: a series of
    /// length-prefixed labels terminated by the zero-length root label.
    /// Compression pointers are never emitted.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut vec = Vec::with_capacity(self.0.len() + 1);
        if self.0 != "." {
            for label in self.0.trim_end_matches('.').split('.') {
                vec.push(label.len() as u8);
                vec.extend(label.as_bytes());
            }
        }
        vec.push(0);
        vec
    }
}

impl Name {
    /// Reports if the [`Name`] lies inside the passed zone (or is the
    /// zone top node itself). The comparison is label-aware: "pizza.com."
    /// is not inside "za.com.".
    pub fn is_in_zone(&self, zone: &Self) -> bool {
        if zone.0 == "." {
            return true;
        }
        let mut name_labels = self.0.rsplit('.');
        let zone_labels = zone.0.rsplit('.');
        for zl in zone_labels {
            let nl = match name_labels.next() {
                None => return false,
                Some(v) => v,
            };
            if nl != zl {
                return false;
            }
        }
        true
    }

    /// Returns the name itself followed by all its ancestor zones, most
    /// specific first, ending with the root. E.g. "a.b.c." produces
    /// ["a.b.c.", "b.c.", "c.", "."].
    pub fn ancestors(&self) -> Vec<Name> {
        let mut zones = vec![self.clone()];
        let mut rest = self.0.as_str();
        while let Some((_, suffix)) = rest.split_once('.') {
            if suffix.is_empty() {
                break;
            }
            zones.push(Name(suffix.to_string()));
            rest = suffix;
        }
        if self.0 != "." {
            zones.push(Name(".".to_string()));
        }
        zones
    }
}

// Validate the string to check if it's a valid (absolute) domain
// name. Both the whole name and single labels are validated.
fn validate_name(name: &str) -> Result<(), NameErr> {
    if name == "." {
        return Ok(());
    }
    if name.len() > 255 {
        return Err(NameErr::LongName);
    }
    if !name.ends_with('.') {
        return Err(NameErr::RelativeName);
    }
    if name.starts_with('.') {
        return Err(NameErr::MalformedName("starts with dot"));
    }
    if name.contains("..") {
        return Err(NameErr::MalformedName("double dot in name"));
    }
    for label in name[..name.len() - 1].split('.') {
        validate_label(label)?;
    }
    Ok(())
}

// Validate a single label, checking both its length and characters.
fn validate_label(label: &str) -> Result<(), NameErr> {
    if label.is_empty() {
        return Err(NameErr::MalformedLabel("empty label"));
    }
    if label.len() > 63 {
        return Err(NameErr::LongLabel);
    }
    let first = label.chars().next().unwrap();
    let last = label.chars().last().unwrap();
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(NameErr::MalformedLabel("must start and end with alphanumeric"));
    }
    let inner_ok = label.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if !inner_ok {
        return Err(NameErr::MalformedLabel("must contain alphanumeric, '-' or '_'"));
    }
    Ok(())
}

fn check_end<T>(opt: Option<T>) -> Result<T, NameErr> {
    match opt {
        None => Err(NameErr::BytesEnd),
        Some(v) => Ok(v),
    }
}

/// Errors returned by the [`Name`] creation and validation processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameErr {
    BytesEnd,
    MaxRedir,
    PointerOutOfBounds,
    RelativeName,
    LongName,
    MalformedName(&'static str),
    LongLabel,
    MalformedLabel(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize() {
        let name = Name::canonicalize("Example.COM").unwrap();
        assert_eq!(name.as_ref(), "example.com.");
        let name = Name::canonicalize("example.com.").unwrap();
        assert_eq!(name.as_ref(), "example.com.");
        assert!(Name::canonicalize("").is_err());
        assert!(Name::canonicalize("bad..name").is_err());
    }

    #[test]
    fn test_from_string_validation() {
        assert!(Name::from_string(".").is_ok());
        assert!(Name::from_string("example.com.").is_ok());
        assert!(Name::from_string("example.com").is_err());
        assert!(Name::from_string(".example.com.").is_err());
        assert!(Name::from_string("-bad.com.").is_err());
        let long_label = format!("{}.com.", "a".repeat(64));
        assert!(Name::from_string(&long_label).is_err());
    }

    #[test]
    fn test_wire_roundtrip() {
        let name = Name::from_string("www.example.com.").unwrap();
        let bytes = name.to_wire();
        assert_eq!(
            bytes,
            [
                3, b'w', b'w', b'w', 7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0
            ]
        );
        let mut buf = WireBuf::from_raw_bytes(&bytes);
        assert_eq!(Name::from_wire(&mut buf).unwrap(), name);
    }

    #[test]
    fn test_wire_root() {
        let root = Name::from_string(".").unwrap();
        assert_eq!(root.to_wire(), [0]);
        let mut buf = WireBuf::from_raw_bytes(&[0]);
        assert_eq!(Name::from_wire(&mut buf).unwrap(), root);
    }

    #[test]
    fn test_wire_lowercases() {
        let mut buf = WireBuf::from_raw_bytes(&[3, b'C', b'o', b'M', 0]);
        let name = Name::from_wire(&mut buf).unwrap();
        assert_eq!(name.as_ref(), "com.");
    }

    #[test]
    fn test_wire_pointer() {
        // "example.com." at offset 0, then a name "ns.<ptr->0>" at offset 13.
        let mut bytes = vec![];
        bytes.extend(Name::from_string("example.com.").unwrap().to_wire());
        let ns_offset = bytes.len();
        bytes.extend([2, b'n', b's']);
        bytes.extend([0b1100_0000, 0]);
        bytes.push(0xaa);

        let mut buf = WireBuf::from_raw_bytes(&bytes);
        buf.set_read_pos(ns_offset);
        let name = Name::from_wire(&mut buf).unwrap();
        assert_eq!(name.as_ref(), "ns.example.com.");
        // The cursor must land right after the pointer.
        assert_eq!(buf.read_u8(), Some(0xaa));
    }

    #[test]
    fn test_wire_pointer_loop_bounded() {
        // A pointer referencing itself must not loop forever.
        let mut buf = WireBuf::from_raw_bytes(&[0b1100_0000, 0, 0]);
        assert_eq!(Name::from_wire(&mut buf), Err(NameErr::MaxRedir));
    }

    #[test]
    fn test_ancestors() {
        let name = Name::from_string("a.b.c.").unwrap();
        let zones: Vec<String> = name.ancestors().iter().map(|z| z.as_ref().to_string()).collect();
        assert_eq!(zones, ["a.b.c.", "b.c.", "c.", "."]);

        let root = Name::from_string(".").unwrap();
        assert_eq!(root.ancestors(), [root.clone()]);
    }

    #[test]
    fn test_is_in_zone() {
        let name = Name::from_string("www.example.com.").unwrap();
        assert!(name.is_in_zone(&Name::from_string("example.com.").unwrap()));
        assert!(name.is_in_zone(&Name::from_string("com.").unwrap()));
        assert!(name.is_in_zone(&Name::from_string(".").unwrap()));
        assert!(name.is_in_zone(&name));
        assert!(!name.is_in_zone(&Name::from_string("ple.com.").unwrap()));
        assert!(!name.is_in_zone(&Name::from_string("org.").unwrap()));
    }
}
