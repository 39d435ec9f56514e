use crate::shared::buffer::*;
use crate::shared::dns::errors::*;
use rand::Rng;

/// Header of dns messages. This type can be generated manually or
/// obtained decoding it from raw bytes. The `Default` trait is
/// implemented to generate an empty query header with a random id.
#[derive(Debug, Clone)]
pub struct Header {
    pub id: u16,
    pub query_resp: bool,
    pub op_code: OpCode,
    pub auth_answer: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub z: u8,
    pub resp_code: RespCode,
    pub questions_count: u16,
    pub answers_count: u16,
    pub authorities_count: u16,
    pub additionals_count: u16,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            id: rand::thread_rng().gen::<u16>(),
            query_resp: false,
            op_code: OpCode::Query,
            auth_answer: false,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            z: 0,
            resp_code: RespCode::NoError,
            questions_count: 0,
            answers_count: 0,
            authorities_count: 0,
            additionals_count: 0,
        }
    }
}

impl Header {
    /// Decode a dns message [`Header`] from the bytes read from the provided
    /// buffer. Unknown op/resp codes are detected and an appropriate error
    /// is returned.
    pub fn decode_from_buf(buffer: &mut WireBuf) -> Result<Header, ParsingErr> {
        let id = check_end(buffer.read_u16())?;
        let flags_hi = check_end(buffer.read_u8())?;
        let flags_lo = check_end(buffer.read_u8())?;

        let query_resp = flags_hi & 0b1000_0000 != 0;
        let op_code = match OpCode::from_num((flags_hi >> 3) & 0b1111) {
            Err(n) => return Err(ParsingErr::UnknownOpCode(n)),
            Ok(v) => v,
        };
        let auth_answer = flags_hi & 0b0000_0100 != 0;
        let truncated = flags_hi & 0b0000_0010 != 0;
        let recursion_desired = flags_hi & 0b0000_0001 != 0;
        let recursion_available = flags_lo & 0b1000_0000 != 0;
        let z = (flags_lo >> 4) & 0b111;
        let resp_code = match RespCode::from_num(flags_lo & 0b1111) {
            Err(n) => return Err(ParsingErr::UnknownRespCode(n)),
            Ok(v) => v,
        };

        Ok(Header {
            id,
            query_resp,
            op_code,
            auth_answer,
            truncated,
            recursion_desired,
            recursion_available,
            z,
            resp_code,
            questions_count: check_end(buffer.read_u16())?,
            answers_count: check_end(buffer.read_u16())?,
            authorities_count: check_end(buffer.read_u16())?,
            additionals_count: check_end(buffer.read_u16())?,
        })
    }

    /// Decode a dns message [`Header`] from the passed bytes slice. It is a
    /// wrapper around [Header::decode_from_buf] which needs a buffer.
    pub fn decode_from_bytes(bytes: &[u8]) -> Result<Header, ParsingErr> {
        let mut buffer = WireBuf::from_raw_bytes(bytes);
        Header::decode_from_buf(&mut buffer)
    }

    /// Encode a dns [`Header`] to raw bytes, writing them into the provided
    /// buffer. The function panics on unsupported op codes: internally
    /// built messages must carry only supported features.
    pub fn encode_to_buf(&self, buffer: &mut WireBuf) {
        assert!(self.op_code.is_supported());
        buffer.write_u16(self.id);

        let mut flags_hi = 0u8;
        flags_hi |= (self.query_resp as u8) << 7;
        flags_hi |= self.op_code.to_num() << 3;
        flags_hi |= (self.auth_answer as u8) << 2;
        flags_hi |= (self.truncated as u8) << 1;
        flags_hi |= self.recursion_desired as u8;
        let mut flags_lo = 0u8;
        flags_lo |= (self.recursion_available as u8) << 7;
        flags_lo |= (self.z & 0b111) << 4;
        flags_lo |= self.resp_code.to_num();
        buffer.write_u8(flags_hi);
        buffer.write_u8(flags_lo);

        buffer.write_u16(self.questions_count);
        buffer.write_u16(self.answers_count);
        buffer.write_u16(self.authorities_count);
        buffer.write_u16(self.additionals_count);
    }
}

impl Header {
    /// Determine if a [`Header`] contains values supported by the implementation.
    pub fn is_supported(&self) -> Result<(), ParsingErr> {
        if !self.op_code.is_supported() {
            return Err(ParsingErr::UnsupportedOpCode(self.op_code));
        }
        Ok(())
    }

    /// Tells if a [`Header`] represents a request.
    pub fn is_request(&self) -> bool {
        !self.query_resp
    }
}

/// The response code is a code present in the [`Header`], used to
/// inform the client about the outcome of the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespCode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
}

impl RespCode {
    pub fn from_num(n: u8) -> Result<Self, u8> {
        match n {
            0 => Ok(RespCode::NoError),
            1 => Ok(RespCode::FormErr),
            2 => Ok(RespCode::ServFail),
            3 => Ok(RespCode::NxDomain),
            4 => Ok(RespCode::NotImp),
            5 => Ok(RespCode::Refused),
            _ => Err(n),
        }
    }

    pub fn to_num(&self) -> u8 {
        match self {
            RespCode::NoError => 0,
            RespCode::FormErr => 1,
            RespCode::ServFail => 2,
            RespCode::NxDomain => 3,
            RespCode::NotImp => 4,
            RespCode::Refused => 5,
        }
    }
}

/// The operation code is present in the header and specifies the type
/// of operation the DNS server should perform on behalf of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Query,
    IQuery,
    Status,
}

impl OpCode {
    /// Try to generate an [`OpCode`] from its raw number representation.
    pub fn from_num(n: u8) -> Result<Self, u8> {
        match n {
            0 => Ok(OpCode::Query),
            1 => Ok(OpCode::IQuery),
            2 => Ok(OpCode::Status),
            n => Err(n),
        }
    }

    /// Convert an [`OpCode`] to its raw number representation.
    pub fn to_num(&self) -> u8 {
        match self {
            OpCode::Query => 0,
            OpCode::IQuery => 1,
            OpCode::Status => 2,
        }
    }

    /// Only standard queries are supported.
    pub fn is_supported(&self) -> bool {
        matches!(self, OpCode::Query)
    }
}
