use crate::shared::buffer::*;
use crate::shared::dns::class::*;
use crate::shared::dns::errors::*;
use crate::shared::dns::name::*;
use crate::shared::dns::types::*;

/// Questions present in the question section of DNS messages. They refer to
/// a specific node of the name system, asking for a certain type of records.
/// The class support is limited to the internet class.
#[derive(Debug, Clone)]
pub struct Question {
    pub node: Name,
    pub record_type: RecordType,
    pub class: Class,
}

impl Question {
    /// Decode a dns message [`Question`] from the bytes read from the passed
    /// buffer. Unsupported types and classes are detected and reported as
    /// errors, with the question bytes consumed in any case.
    pub fn decode_from_buf(buffer: &mut WireBuf) -> Result<Question, ParsingErr> {
        let node = Name::from_wire(buffer)?;
        let type_num = check_end(buffer.read_u16())?;
        let class_num = check_end(buffer.read_u16())?;

        let record_type = match RecordType::from_num(type_num) {
            Err(n) => return Err(ParsingErr::UnknownType(n)),
            Ok(t) if !t.is_supported_for_question() => return Err(ParsingErr::UnsupportedType(t)),
            Ok(t) => t,
        };
        let class = match Class::from_num(class_num) {
            Err(n) => return Err(ParsingErr::UnknownClass(n)),
            Ok(c) if !c.is_supported() => return Err(ParsingErr::UnsupportedClass(c)),
            Ok(c) => c,
        };

        Ok(Question { node, record_type, class })
    }

    /// Encode a dns message [`Question`] to raw bytes, writing them into the
    /// provided buffer. This function panics if unsupported classes or types
    /// are provided (to maintain invariants about supported features).
    pub fn encode_to_buf(&self, buffer: &mut WireBuf) {
        assert!(self.record_type.is_supported_for_question());
        assert!(self.class.is_supported());
        buffer.write_bytes(&self.node.to_wire());
        buffer.write_u16(self.record_type.to_num());
        buffer.write_u16(self.class.to_num());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_roundtrip() {
        let question = Question {
            node: Name::from_string("example.com.").unwrap(),
            record_type: RecordType::MX,
            class: Class::IN,
        };
        let mut buffer = WireBuf::new();
        question.encode_to_buf(&mut buffer);

        let mut buffer = WireBuf::from_raw_bytes(&buffer.into_vec());
        let decoded = Question::decode_from_buf(&mut buffer).unwrap();
        assert_eq!(decoded.node.as_ref(), "example.com.");
        assert_eq!(decoded.record_type, RecordType::MX);
        assert_eq!(decoded.class, Class::IN);
    }

    #[test]
    fn test_question_unsupported_type() {
        let mut buffer = WireBuf::new();
        buffer.write_bytes(&Name::from_string("example.com.").unwrap().to_wire());
        buffer.write_u16(RecordType::SOA.to_num());
        buffer.write_u16(Class::IN.to_num());

        let mut buffer = WireBuf::from_raw_bytes(&buffer.into_vec());
        let res = Question::decode_from_buf(&mut buffer);
        assert!(matches!(res, Err(ParsingErr::UnsupportedType(RecordType::SOA))));
    }

    #[test]
    fn test_question_unknown_type_consumes_bytes() {
        let mut buffer = WireBuf::new();
        buffer.write_bytes(&Name::from_string("example.com.").unwrap().to_wire());
        buffer.write_u16(16); // TXT, not part of the supported set
        buffer.write_u16(Class::IN.to_num());
        let len = buffer.len();

        let mut buffer = WireBuf::from_raw_bytes(&buffer.into_vec());
        let res = Question::decode_from_buf(&mut buffer);
        assert!(matches!(res, Err(ParsingErr::UnknownType(16))));
        assert_eq!(buffer.read_pos(), len);
    }
}
