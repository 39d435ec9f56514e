use crate::resolver::back_end::errors::*;
use crate::shared::dns;
use std::net::{SocketAddr, UdpSocket};
use std::{io, time};

/// The outcome of a completed exchange: the decoded upstream
/// response and the measured round trip time.
#[derive(Debug)]
pub struct Exchange {
    pub response: dns::Message,
    pub rtt: time::Duration,
}

/// Performs a single DNS exchange over UDP with one nameserver: one
/// datagram out, one datagram in, within the given timeout. The query is
/// iterative (recursion not desired) and advertises the receive buffer
/// size via an EDNS0 OPT pseudo-record. The round trip time is measured
/// from just before the send to the receive. The socket lives for the
/// duration of the call. Truncated responses are returned as-is.
pub fn exchange(
    server: SocketAddr,
    qname: &dns::Name,
    qtype: dns::RecordType,
    timeout: time::Duration,
) -> Result<Exchange, LookupErr> {
    let request = build_query(qname, qtype);
    let request_bytes = request.encode_to_bytes();

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_write_timeout(Some(timeout))?;
    socket.set_read_timeout(Some(timeout))?;

    let started = time::Instant::now();
    socket.send_to(&request_bytes, server)?;
    let mut buffer = [0; dns::MAX_UDP_PAYLOAD];
    let (n_recv, _) = socket.recv_from(&mut buffer).map_err(classify_recv_err)?;
    let rtt = started.elapsed();

    let response = match dns::Message::decode_from_bytes(&buffer[..n_recv]) {
        Ok(v) => v,
        Err(err) => {
            let err_msg = format!("decoding error: {:?}", err);
            return Err(LookupErr::MalformedResp(err_msg));
        }
    };
    if response.id() != request.id() {
        return Err(LookupErr::MalformedResp(format!(
            "expected header id: {}, got: {}",
            request.id(),
            response.id()
        )));
    }
    if !response.header.query_resp {
        return Err(LookupErr::MalformedResp("response flag not set".to_string()));
    }

    Ok(Exchange { response, rtt })
}

fn classify_recv_err(err: io::Error) -> LookupErr {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => LookupErr::Timeout,
        _ => LookupErr::Io(err),
    }
}

fn build_query(qname: &dns::Name, qtype: dns::RecordType) -> dns::Message {
    let mut header = dns::Header::default();
    header.questions_count = 1;
    header.additionals_count = 1;
    let question = dns::Question {
        node: qname.clone(),
        record_type: qtype,
        class: dns::Class::IN,
    };
    let edns = dns::Record::OPT {
        node: dns::Name::from_string(".").unwrap(),
        payload_size: dns::MAX_UDP_PAYLOAD as u16,
        ext_flags: 0,
    };
    dns::Message {
        header,
        questions: vec![question],
        answers: vec![],
        authorities: vec![],
        additionals: vec![edns],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::dns::{Header, Message, Name, Record, RecordType};
    use std::net::Ipv4Addr;
    use std::thread;

    // A single-shot mock nameserver on a loopback ephemeral port: it
    // answers the first query with the response built by the closure.
    fn spawn_mock_ns<F>(build_response: F) -> SocketAddr
    where
        F: FnOnce(Message) -> Message + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();
        thread::spawn(move || {
            let mut buffer = [0; dns::MAX_UDP_PAYLOAD];
            let (n_read, src) = socket.recv_from(&mut buffer).unwrap();
            let request = Message::decode_from_bytes(&buffer[..n_read]).unwrap();
            let response = build_response(request);
            socket.send_to(&response.encode_to_bytes(), src).unwrap();
        });
        addr
    }

    #[test]
    fn test_exchange_roundtrip() {
        let qname = Name::from_string("example.com.").unwrap();
        let server = spawn_mock_ns(|request| {
            // The query must be iterative and advertise EDNS0.
            assert!(!request.header.recursion_desired);
            assert!(matches!(
                request.additionals.first(),
                Some(Record::OPT { payload_size: 4096, .. })
            ));
            let mut header = Header {
                query_resp: true,
                answers_count: 1,
                additionals_count: 0,
                ..request.header.clone()
            };
            header.questions_count = request.questions.len() as u16;
            Message {
                header,
                questions: request.questions,
                answers: vec![Record::A {
                    node: Name::from_string("example.com.").unwrap(),
                    ttl: 300,
                    address: Ipv4Addr::new(93, 184, 216, 34),
                }],
                authorities: vec![],
                additionals: vec![],
            }
        });

        let result = exchange(server, &qname, RecordType::A, time::Duration::from_secs(2)).unwrap();
        assert_eq!(result.response.answers.len(), 1);
        assert_eq!(result.response.answers[0].rdata_text(), "93.184.216.34");
        assert!(result.rtt <= time::Duration::from_secs(2));
    }

    #[test]
    fn test_exchange_timeout() {
        // A socket nobody answers on.
        let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
        let server = silent.local_addr().unwrap();

        let qname = Name::from_string("example.com.").unwrap();
        let result = exchange(server, &qname, RecordType::A, time::Duration::from_millis(100));
        assert!(matches!(result, Err(LookupErr::Timeout)));
    }

    #[test]
    fn test_exchange_rejects_mismatched_id() {
        let server = spawn_mock_ns(|request| {
            let mut header = request.header.clone();
            header.query_resp = true;
            header.id = header.id.wrapping_add(1);
            header.questions_count = request.questions.len() as u16;
            header.additionals_count = 0;
            Message {
                header,
                questions: request.questions,
                answers: vec![],
                authorities: vec![],
                additionals: vec![],
            }
        });

        let qname = Name::from_string("example.com.").unwrap();
        let result = exchange(server, &qname, RecordType::A, time::Duration::from_secs(2));
        assert!(matches!(result, Err(LookupErr::MalformedResp(_))));
    }
}
