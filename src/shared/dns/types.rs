/// The record types understood by the resolver. Questions are restricted
/// to the types clients may ask for; SOA is decoded because authority
/// sections carry it on negative answers, OPT because EDNS0 uses it as a
/// pseudo-record in the additional section. Every other type on the wire
/// is skipped during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    NS,
    CNAME,
    SOA,
    MX,
    AAAA,
    OPT,
}

impl RecordType {
    /// Try to generate a [`RecordType`] from its raw number representation.
    pub fn from_num(n: u16) -> Result<RecordType, u16> {
        match n {
            1 => Ok(RecordType::A),
            2 => Ok(RecordType::NS),
            5 => Ok(RecordType::CNAME),
            6 => Ok(RecordType::SOA),
            15 => Ok(RecordType::MX),
            28 => Ok(RecordType::AAAA),
            41 => Ok(RecordType::OPT),
            n => Err(n),
        }
    }

    /// Convert a [`RecordType`] to its raw number representation.
    pub fn to_num(&self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::SOA => 6,
            RecordType::MX => 15,
            RecordType::AAAA => 28,
            RecordType::OPT => 41,
        }
    }

    /// Try to generate a [`RecordType`] from its raw string representation.
    pub fn from_str(s: &str) -> Result<RecordType, &str> {
        match s {
            "A" => Ok(RecordType::A),
            "NS" => Ok(RecordType::NS),
            "CNAME" => Ok(RecordType::CNAME),
            "SOA" => Ok(RecordType::SOA),
            "MX" => Ok(RecordType::MX),
            "AAAA" => Ok(RecordType::AAAA),
            "OPT" => Ok(RecordType::OPT),
            s => Err(s),
        }
    }

    /// Convert a [`RecordType`] to its raw string representation.
    pub fn to_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::NS => "NS",
            RecordType::CNAME => "CNAME",
            RecordType::SOA => "SOA",
            RecordType::MX => "MX",
            RecordType::AAAA => "AAAA",
            RecordType::OPT => "OPT",
        }
    }

    /// Determine if a [`RecordType`] may appear in a question. Clients can
    /// query A, AAAA, CNAME, MX and NS records; everything else is rejected
    /// at the entry point.
    pub fn is_supported_for_question(&self) -> bool {
        match self {
            RecordType::A => true,
            RecordType::AAAA => true,
            RecordType::CNAME => true,
            RecordType::MX => true,
            RecordType::NS => true,
            RecordType::SOA => false,
            RecordType::OPT => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_conversions() {
        for t in [
            RecordType::A,
            RecordType::NS,
            RecordType::CNAME,
            RecordType::SOA,
            RecordType::MX,
            RecordType::AAAA,
            RecordType::OPT,
        ] {
            assert_eq!(RecordType::from_num(t.to_num()), Ok(t));
        }
        assert_eq!(RecordType::from_num(16), Err(16));
        assert_eq!(RecordType::from_num(252), Err(252));
    }

    #[test]
    fn test_question_support() {
        assert!(RecordType::A.is_supported_for_question());
        assert!(RecordType::MX.is_supported_for_question());
        assert!(!RecordType::SOA.is_supported_for_question());
        assert!(!RecordType::OPT.is_supported_for_question());
    }
}
