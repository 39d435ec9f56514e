use crate::shared::buffer::*;
use crate::shared::dns::errors::*;
use crate::shared::dns::header::*;
use crate::shared::dns::questions::*;
use crate::shared::dns::records::*;

/// Maximum udp payload handled by the system, advertised to upstream
/// nameservers via the EDNS0 OPT pseudo-record.
pub const MAX_UDP_PAYLOAD: usize = 4096;

/// Represents a complete dns message. The [`Header`] counts must be
/// concordant with the [`Question`]s and [`Record`]s carried in the
/// other message sections.
#[derive(Debug)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    pub additionals: Vec<Record>,
}

impl Message {
    /// Decode a dns [`Message`] from the provided bytes. Records of
    /// unknown types are skipped without failing the whole message, since
    /// upstream sections routinely carry types this resolver does not
    /// interpret. Questions are held to a stricter rule: a request stands
    /// on its single question, so a question of unknown type fails the
    /// decode and the error carries the offending type. Any other
    /// malformation is an error as well.
    pub fn decode_from_bytes(bytes: &[u8]) -> Result<Message, MessageErr> {
        let mut buffer = WireBuf::from_raw_bytes(bytes);

        let header = match Header::decode_from_buf(&mut buffer) {
            Err(err) => return Err(MessageErr::HeaderErr(err)),
            Ok(header) => header,
        };
        if let Err(err) = header.is_supported() {
            return Err(MessageErr::HeaderErr(err));
        }

        let mut questions = Vec::with_capacity(header.questions_count as usize);
        let mut answers = Vec::with_capacity(header.answers_count as usize);
        let mut authorities = Vec::with_capacity(header.authorities_count as usize);
        let mut additionals = Vec::with_capacity(header.additionals_count as usize);

        for i in 0..header.questions_count as usize {
            match Question::decode_from_buf(&mut buffer) {
                Err(err) => return Err(MessageErr::QuestionErr(i, err)),
                Ok(v) => questions.push(v),
            };
        }
        for i in 0..header.answers_count as usize {
            match Record::decode_from_buf(&mut buffer) {
                Err(ParsingErr::UnknownType(_)) => continue,
                Err(err) => return Err(MessageErr::AnswerErr(i, err)),
                Ok(v) => answers.push(v),
            };
        }
        for i in 0..header.authorities_count as usize {
            match Record::decode_from_buf(&mut buffer) {
                Err(ParsingErr::UnknownType(_)) => continue,
                Err(err) => return Err(MessageErr::AuthorityErr(i, err)),
                Ok(v) => authorities.push(v),
            };
        }
        for i in 0..header.additionals_count as usize {
            match Record::decode_from_buf(&mut buffer) {
                Err(ParsingErr::UnknownType(_)) => continue,
                Err(err) => return Err(MessageErr::AdditionalErr(i, err)),
                Ok(v) => additionals.push(v),
            };
        }

        Ok(Message {
            header,
            questions,
            answers,
            authorities,
            additionals,
        })
    }

    /// Encode a dns [`Message`] to raw bytes. The function panics if the
    /// header counts disagree with the section lengths or if unsupported
    /// features are carried: messages built internally must be valid.
    pub fn encode_to_bytes(&self) -> Vec<u8> {
        assert_eq!(self.header.questions_count as usize, self.questions.len());
        assert_eq!(self.header.answers_count as usize, self.answers.len());
        assert_eq!(self.header.authorities_count as usize, self.authorities.len());
        assert_eq!(self.header.additionals_count as usize, self.additionals.len());

        let mut buffer = WireBuf::new();
        self.header.encode_to_buf(&mut buffer);
        for question in &self.questions {
            question.encode_to_buf(&mut buffer);
        }
        for record in self.answers.iter().chain(&self.authorities).chain(&self.additionals) {
            record.encode_to_buf(&mut buffer);
        }
        buffer.into_vec()
    }
}

impl Message {
    pub fn id(&self) -> u16 {
        self.header.id
    }
}
