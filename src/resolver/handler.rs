use crate::resolver::*;
use crate::shared::dns;
use crate::shared::net::*;
use std::net::{Ipv4Addr, Ipv6Addr};

// Records re-encoded from a rendered answer carry a fixed short ttl:
// the rendered form does not retain the upstream lifetime.
const ANSWER_TTL: u32 = 60;

/// The resolver handler able to serve dns requests via its [`DnsHandler`]
/// implementation.
pub struct ResolverHandler(pub Resolver);

impl DnsHandler for ResolverHandler {
    fn handle_request<R: DnsRead, W: DnsWrite>(&self, req: R, resp: W) {
        handle_request(req, resp, &self.0);
    }
}

fn handle_request<R: DnsRead, W: DnsWrite>(req: R, resp: W, resolver: &Resolver) {
    let dns_request = match req.read() {
        DnsReadResult::FullMessage(req) => req,
        DnsReadResult::HeaderOnly(header, err) => {
            handle_decode_err(resp, header, err);
            return;
        }
        DnsReadResult::ParseErr(msg_err, hdr_err) => {
            log::warn!("Decoding request: {:?}, decoding header: {:?}", msg_err, hdr_err);
            return;
        }
    };

    if let Err(err) = validate_dns_request(&dns_request) {
        log::warn!("[{}] Request malformed: {}.", dns_request.id(), err);
        handle_err(resp, &dns_request, dns::RespCode::FormErr);
        return;
    }

    let dns::Question { node, record_type, .. } = &dns_request.questions[0];
    log::info!("[{}] Start handling request: {}, type {:?}.", dns_request.id(), node, record_type);
    handle_query(dns_request, resp, resolver);
}

/// Resolve the dns query fetching the records of the requested name and
/// type, either from the cache or recursing through external nameservers.
/// An empty answer is surfaced to the client as NXDOMAIN.
fn handle_query<W: DnsWrite>(req: dns::Message, resp: W, resolver: &Resolver) {
    let dns::Question { node, record_type, .. } = &req.questions[0];
    let answer = resolver.resolve(node.as_ref(), record_type.to_str());
    if answer.is_empty() {
        handle_err(resp, &req, dns::RespCode::NxDomain);
        return;
    }

    let answers = answer_records(node, *record_type, &answer);
    let mut resp_header = resp_header_from_req_header(&req.header, dns::RespCode::NoError);
    resp_header.answers_count = answers.len() as u16;
    resp_header.authorities_count = 0;
    resp_header.additionals_count = 0;
    let dns_response = dns::Message {
        header: resp_header,
        questions: req.questions,
        answers,
        authorities: vec![],
        additionals: vec![],
    };

    reply(resp, dns_response);
}

/// Re-encode a rendered answer as dns records of the question type. A
/// chase that ended on an alias yields a name where an address was asked
/// for: such entries are relayed as CNAME records.
fn answer_records(node: &dns::Name, qtype: dns::RecordType, answer: &[String]) -> Vec<dns::Record> {
    answer
        .iter()
        .filter_map(|text| record_from_text(node, qtype, text))
        .collect()
}

fn record_from_text(node: &dns::Name, qtype: dns::RecordType, text: &str) -> Option<dns::Record> {
    let node = node.clone();
    let record = match qtype {
        dns::RecordType::A => match text.parse::<Ipv4Addr>() {
            Ok(address) => dns::Record::A { node, ttl: ANSWER_TTL, address },
            Err(_) => dns::Record::CNAME {
                node,
                ttl: ANSWER_TTL,
                target: dns::Name::from_string(text).ok()?,
            },
        },
        dns::RecordType::AAAA => match text.parse::<Ipv6Addr>() {
            Ok(address) => dns::Record::AAAA { node, ttl: ANSWER_TTL, address },
            Err(_) => dns::Record::CNAME {
                node,
                ttl: ANSWER_TTL,
                target: dns::Name::from_string(text).ok()?,
            },
        },
        dns::RecordType::NS => dns::Record::NS {
            node,
            ttl: ANSWER_TTL,
            target: dns::Name::from_string(text).ok()?,
        },
        dns::RecordType::CNAME => dns::Record::CNAME {
            node,
            ttl: ANSWER_TTL,
            target: dns::Name::from_string(text).ok()?,
        },
        dns::RecordType::MX => {
            let (preference, exchange) = text.split_once(' ')?;
            dns::Record::MX {
                node,
                ttl: ANSWER_TTL,
                preference: preference.parse().ok()?,
                exchange: dns::Name::from_string(exchange).ok()?,
            }
        }
        dns::RecordType::SOA | dns::RecordType::OPT => return None,
    };
    Some(record)
}

/// Handle decoding errors, either malformed messages or unsupported
/// features. If we cannot decode the header we cannot compose a valid
/// response header, so those requests are simply dropped upstream.
fn handle_decode_err<W: DnsWrite>(resp: W, req_header: dns::Header, msg_err: dns::MessageErr) {
    let resp_code = match msg_err.inner_err() {
        dns::ParsingErr::UnsupportedOpCode(_) => dns::RespCode::NotImp,
        dns::ParsingErr::UnsupportedClass(_) => dns::RespCode::NotImp,
        dns::ParsingErr::UnsupportedType(_) => dns::RespCode::NotImp,
        // Only questions fail the decode with an unknown type (records
        // of unknown types are skipped), so this is a question we
        // cannot serve, not a malformed message.
        dns::ParsingErr::UnknownType(_) => dns::RespCode::NotImp,
        _ => dns::RespCode::FormErr,
    };
    let mut resp_header = resp_header_from_req_header(&req_header, resp_code);
    resp_header.questions_count = 0;
    let dns_response = dns::Message {
        header: resp_header,
        questions: vec![],
        answers: vec![],
        authorities: vec![],
        additionals: vec![],
    };

    reply(resp, dns_response);
}

/// Generic error handler used to reply to a client with a specific error
/// code. Questions are included in the response.
fn handle_err<W: DnsWrite>(resp: W, dns_req: &dns::Message, resp_code: dns::RespCode) {
    let mut resp_header = resp_header_from_req_header(&dns_req.header, resp_code);
    resp_header.answers_count = 0;
    resp_header.authorities_count = 0;
    resp_header.additionals_count = 0;
    let dns_response = dns::Message {
        header: resp_header,
        questions: dns_req.questions.clone(),
        answers: vec![],
        authorities: vec![],
        additionals: vec![],
    };

    reply(resp, dns_response);
}

/// Reply to the client and log the outcome.
fn reply<W: DnsWrite>(resp: W, dns_response: dns::Message) {
    let response_id = dns_response.id();
    let response_code = dns_response.header.resp_code;
    match resp.reply(dns_response) {
        Ok(_) => log::info!("[{}] Request served [{:?}].", response_id, response_code),
        Err(err) => log::error!("[{}] Error replying: {}", response_id, err),
    };
}

/// Creates a proper header from the request header, suitable to be used in
/// the corresponding response. The passed code is used in the resp header.
fn resp_header_from_req_header(req_header: &dns::Header, resp_code: dns::RespCode) -> dns::Header {
    dns::Header {
        query_resp: true,
        auth_answer: false,
        recursion_available: true,
        z: 0,
        resp_code,
        questions_count: req_header.questions_count,
        answers_count: 0,
        authorities_count: 0,
        additionals_count: 0,
        ..req_header.clone()
    }
}

/// Validate a client dns request against some minimal requirements.
fn validate_dns_request(dns_req: &dns::Message) -> Result<(), String> {
    if !dns_req.header.is_request() {
        return Err("resp flag set in query".to_string());
    }
    if dns_req.questions.len() != 1 {
        return Err(format!("invalid # of questions: {:?}", dns_req.questions.len()));
    }
    if !dns_req.answers.is_empty() {
        return Err(format!("invalid # of answers: {:?}", dns_req.answers.len()));
    }
    if !dns_req.authorities.is_empty() {
        return Err(format!("invalid # of authorities: {:?}", dns_req.authorities.len()));
    }
    Ok(())
}
