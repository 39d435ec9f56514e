use crate::resolver::back_end::cache::*;
use crate::resolver::back_end::errors::*;
use crate::resolver::back_end::tracker::*;
use crate::resolver::back_end::transport;
use crate::resolver::back_end::utils::*;
use crate::shared::dns;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::{mem, thread, time};

/// The resolver parameters passed to the [`Resolver`] constructor.
/// A good default configuration is provided via the [`Default`] trait.
#[derive(Debug, Clone)]
pub struct ResolverParams {
    pub max_depth: usize,
    pub max_retries: usize,
    pub exchange_timeout: time::Duration,
    pub budget: time::Duration,
    pub negative_ttl: u32,
    pub roots: Vec<SocketAddr>,
    pub upstream_port: u16,
}

impl Default for ResolverParams {
    fn default() -> Self {
        Self {
            max_depth: 16,
            max_retries: 2,
            exchange_timeout: time::Duration::from_secs(3),
            budget: time::Duration::from_secs(10),
            negative_ttl: 60,
            roots: root_hints(),
            upstream_port: DNS_PORT,
        }
    }
}

/// The Resolver drives iterative dns resolutions: starting from the root
/// (or the deepest cached delegation) it descends the delegation hierarchy
/// until an authoritative answer is found, consulting and feeding the
/// shared [`ResolverCache`] and picking nameservers through the shared
/// [`ServerTracker`]. Each resolution is carried out by a short-lived
/// [`Lookup`] object generated with [Resolver::new_lookup].
pub struct Resolver {
    cache: Arc<ResolverCache>,
    tracker: Arc<ServerTracker>,
    conf: ResolverParams,
}

impl Resolver {
    /// Build and return a new [`Resolver`] with the provided config values.
    pub fn new(cache: &Arc<ResolverCache>, tracker: &Arc<ServerTracker>, conf: ResolverParams) -> Self {
        Self {
            cache: Arc::clone(cache),
            tracker: Arc::clone(tracker),
            conf,
        }
    }

    /// Resolve the records of the given type for the given domain. This is
    /// the public boundary of the resolver: it never fails, an empty list
    /// stands for a non-existing domain, an unsupported record type or an
    /// unreachable hierarchy, with the underlying cause logged.
    pub fn resolve(&self, domain: &str, record_type: &str) -> Vec<String> {
        match self.try_resolve(domain, record_type) {
            Ok(answer) => answer,
            Err((ctx, err)) => {
                log::warn!("Lookup of '{}' ({}) failed: {:?} [{}]", domain, record_type, err, ctx);
                vec![]
            }
        }
    }

    /// Resolve the records of the given type for the given domain,
    /// reporting failures to the caller instead of recovering them.
    pub fn try_resolve(&self, domain: &str, record_type: &str) -> Result<Vec<String>, LookupErrCtx> {
        let qname = match dns::Name::canonicalize(domain) {
            Ok(v) => v,
            Err(err) => {
                let err_msg = format!("invalid domain: {:?}", err);
                return Err((domain.to_string(), LookupErr::InvalidArgument(err_msg)));
            }
        };
        let qtype = match dns::RecordType::from_str(record_type) {
            Ok(t) if t.is_supported_for_question() => t,
            _ => {
                let err_msg = format!("unsupported record type: {}", record_type);
                return Err((domain.to_string(), LookupErr::InvalidArgument(err_msg)));
            }
        };
        self.new_lookup(qname, qtype).perform()
    }

    // Generates the consumable [Lookup] object performing one resolution.
    fn new_lookup(&self, qname: dns::Name, qtype: dns::RecordType) -> Lookup {
        Lookup {
            qname,
            qtype,
            seen_cnames: vec![],
            depth: 0,
            deadline: time::Instant::now() + self.conf.budget,
            cache: &self.cache,
            tracker: &self.tracker,
            conf: &self.conf,
        }
    }
}

/// A [Lookup] carries out a single dns resolution. It owns the transient
/// state of the iteration (the current query name, the cname targets
/// already followed, the depth consumed) and borrows the process-wide
/// cache and tracker from the parent [Resolver].
struct Lookup<'a> {
    qname: dns::Name,
    qtype: dns::RecordType,
    seen_cnames: Vec<dns::Name>,
    depth: usize,
    deadline: time::Instant,
    cache: &'a ResolverCache,
    tracker: &'a ServerTracker,
    conf: &'a ResolverParams,
}

// What one full descent of the delegation hierarchy produced.
enum NsOutcome {
    Answer(Vec<dns::Record>),
    Alias(dns::Name),
    NoDomain,
    NoData,
}

impl<'a> Lookup<'a> {
    /// Performs the lookup. The loop restarts once per followed cname:
    /// each pass first consults the cache (positive, then negative), then
    /// descends the delegation hierarchy towards the authoritative
    /// nameservers of the current query name.
    fn perform(mut self) -> Result<Vec<String>, LookupErrCtx> {
        loop {
            if let Some(answer) = self.cache.get(&self.qname, self.qtype) {
                return Ok(answer);
            }
            if self.cache.is_negative(&self.qname, self.qtype) {
                return Ok(self.last_cname_text().unwrap_or_default());
            }

            let outcome = match self.iterate_authorities() {
                Ok(v) => v,
                Err(err) => {
                    // A failed chase still surfaces the alias found so far.
                    return match self.last_cname_text() {
                        Some(partial) => {
                            log::debug!("Partial result for '{}': {:?}", self.qname, err);
                            Ok(partial)
                        }
                        None => Err(err),
                    };
                }
            };

            match outcome {
                NsOutcome::Answer(records) => {
                    let answer = render_answer(&records);
                    self.cache.put(&self.qname, self.qtype, answer.clone(), min_ttl(&records));
                    return Ok(answer);
                }
                NsOutcome::NoDomain => {
                    self.cache.put_negative(&self.qname, self.qtype, self.conf.negative_ttl);
                    return Ok(self.last_cname_text().unwrap_or_default());
                }
                NsOutcome::NoData => {
                    return Ok(self.last_cname_text().unwrap_or_default());
                }
                NsOutcome::Alias(target) => {
                    // Aliases are chased only for address queries; other
                    // types surface the target verbatim. A target already
                    // followed within this resolution is a loop: stop and
                    // surface it as text.
                    if self.qtype != dns::RecordType::A {
                        return Ok(vec![target.to_string()]);
                    }
                    if self.seen_cnames.contains(&target) {
                        log::debug!("Cname loop detected on '{}', stopping the chase.", target);
                        return Ok(vec![target.to_string()]);
                    }
                    self.seen_cnames.push(target.clone());
                    self.qname = target;
                }
            }
        }
    }

    /// Descends the delegation hierarchy for the current query name: the
    /// working nameserver set starts at the deepest cached delegation (or
    /// the root hints) and is replaced by the glue of every delegation
    /// received, one level deeper each time, until an authoritative
    /// response settles the query. Depth and wall-clock budget bound the
    /// walk.
    fn iterate_authorities(&mut self) -> Result<NsOutcome, LookupErrCtx> {
        let (mut zone, mut nameservers) = self.initial_nameservers();
        loop {
            if nameservers.is_empty() {
                let err_msg = format!("no usable nameservers for '{}'", self.qname);
                return Err((err_msg, LookupErr::AllServersFailed));
            }
            self.check_budget()?;
            if self.depth >= self.conf.max_depth {
                let err_msg = format!("resolving '{}' in zone '{}'", self.qname, zone);
                return Err((err_msg, LookupErr::DepthExceeded));
            }
            self.depth += 1;

            let mut response = self.query_level(&nameservers)?;
            if response.header.resp_code == dns::RespCode::NxDomain {
                return Ok(NsOutcome::NoDomain);
            }

            let answers = extract_records(&mut response.answers, self.qtype, &self.qname);
            if !answers.is_empty() {
                return Ok(NsOutcome::Answer(answers));
            }
            if self.qtype != dns::RecordType::CNAME {
                let cname = extract_record(&mut response.answers, dns::RecordType::CNAME, &self.qname);
                if let Some(cname_rec) = cname {
                    return Ok(NsOutcome::Alias(cname_rec.cname_target().clone()));
                }
            }

            match self.mine_delegation(&mut response, &zone)? {
                None => return Ok(NsOutcome::NoData),
                Some((next_zone, servers, ttl)) => {
                    if servers.is_empty() {
                        let err_msg = format!("delegation of '{}' carries no usable nameserver", next_zone);
                        return Err((err_msg, LookupErr::AllServersFailed));
                    }
                    self.cache.put_delegation(&next_zone, servers.clone(), ttl);
                    nameservers = self.to_socket_addrs(&servers);
                    zone = next_zone;
                }
            }
        }
    }

    /// Queries the nameservers of one delegation level until a usable
    /// response is obtained. Up to `max_retries` rounds are attempted with
    /// a growing pause in between; every round re-selects the best
    /// candidates from the tracker. The first parseable NOERROR/NXDOMAIN
    /// response wins; error response codes keep the response aside and move
    /// to the next server, transport failures penalize the server and do
    /// the same.
    fn query_level(&mut self, candidates: &[SocketAddr]) -> Result<dns::Message, LookupErrCtx> {
        let mut last_err: Option<LookupErrCtx> = None;
        for round in 0..self.conf.max_retries {
            if round > 0 {
                thread::sleep(time::Duration::from_millis(100 * round as u64));
                self.check_budget()?;
            }
            let selected = self.tracker.select(candidates);
            if selected.is_empty() {
                break;
            }
            for server in selected {
                self.tracker.start_query(server);
                let exchanged =
                    transport::exchange(server, &self.qname, self.qtype, self.conf.exchange_timeout);
                self.tracker.end_query(server);

                match exchanged {
                    Ok(exchange) => {
                        let rtt_ms = exchange.rtt.as_secs_f64() * 1000.0;
                        self.tracker.record_success(server, rtt_ms);
                        match exchange.response.header.resp_code {
                            dns::RespCode::NoError | dns::RespCode::NxDomain => {
                                return Ok(exchange.response);
                            }
                            code => {
                                // The server is reachable but unable to serve
                                // the query: remember the code, try the next.
                                log::debug!("Server {} answered '{}' with {:?}.", server, self.qname, code);
                                last_err.get_or_insert((server.to_string(), LookupErr::ServerErr(code)));
                            }
                        }
                    }
                    Err(err) => {
                        self.tracker.record_failure(server);
                        log::debug!("Exchange with {} for '{}' failed: {:?}", server, self.qname, err);
                        last_err = Some((server.to_string(), err));
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| (self.qname.to_string(), LookupErr::AllServersFailed)))
    }

    /// Digs the next-level nameservers out of a delegation response: NS
    /// records in the authority section name the subzone nameservers, the
    /// additional section carries the glue addresses for (some of) them.
    /// Targets without glue are resolved with a nested lookup; ones inside
    /// the delegated zone itself without glue are unusable and dropped.
    /// Returns None when the response carries no acceptable delegation.
    fn mine_delegation(
        &mut self,
        response: &mut dns::Message,
        zone: &dns::Name,
    ) -> Result<Option<(dns::Name, Vec<IpAddr>, u32)>, LookupErrCtx> {
        let authorities = mem::take(&mut response.authorities);
        let ns_records: Vec<dns::Record> = authorities
            .into_iter()
            .filter(|rec| rec.record_type() == dns::RecordType::NS)
            // The subzone must contain the searched node and be strictly
            // deeper than the zone that referred us to it.
            .filter(|rec| self.qname.is_in_zone(rec.node()))
            .filter(|rec| rec.node().as_ref().len() > zone.as_ref().len())
            .collect();

        let next_zone = match ns_records.first() {
            None => return Ok(None),
            Some(rec) => rec.node().clone(),
        };
        let ttl = min_ttl(&ns_records);

        let mut servers: Vec<IpAddr> = Vec::new();
        for ns_record in &ns_records {
            let target = ns_record.ns_target();
            let glue = extract_records(&mut response.additionals, dns::RecordType::A, target);
            if !glue.is_empty() {
                for rec in glue {
                    if let dns::Record::A { address, .. } = rec {
                        servers.push(IpAddr::V4(address));
                    }
                }
                continue;
            }
            // A glueless nameserver inside the zone being delegated would
            // need the delegation itself to be resolved: drop it.
            if target.is_in_zone(&next_zone) {
                log::debug!("Dropping glueless in-zone nameserver '{}'.", target);
                continue;
            }
            match self.resolve_ns_target(target) {
                Ok(addrs) => servers.extend(addrs),
                Err(err) => log::debug!("Dropping nameserver '{}': {:?}", target, err),
            }
        }
        Ok(Some((next_zone, servers, ttl)))
    }

    /// Resolves the addresses of a glueless nameserver with a nested
    /// lookup. The nested lookup inherits the depth consumed so far and
    /// the wall-clock deadline, so delegation chains cannot regress
    /// indefinitely through nameserver names.
    fn resolve_ns_target(&mut self, target: &dns::Name) -> Result<Vec<IpAddr>, LookupErrCtx> {
        let sub_lookup = Lookup {
            qname: target.clone(),
            qtype: dns::RecordType::A,
            seen_cnames: vec![],
            depth: self.depth,
            deadline: self.deadline,
            cache: self.cache,
            tracker: self.tracker,
            conf: self.conf,
        };
        let answer = sub_lookup
            .perform()
            .map_err(|err| (target.to_string(), LookupErr::SubLookupErr(Box::new(err))))?;
        Ok(answer.iter().filter_map(|text| text.parse().ok()).collect())
    }

    // The starting point of the descent: the deepest non-expired cached
    // delegation among the ancestors of the query name, or the root hints.
    fn initial_nameservers(&self) -> (dns::Name, Vec<SocketAddr>) {
        for zone in self.qname.ancestors() {
            if let Some(servers) = self.cache.get_delegation(&zone) {
                if !servers.is_empty() {
                    return (zone, self.to_socket_addrs(&servers));
                }
            }
        }
        (root_name(), self.conf.roots.clone())
    }

    fn to_socket_addrs(&self, servers: &[IpAddr]) -> Vec<SocketAddr> {
        servers
            .iter()
            .map(|ip| SocketAddr::new(*ip, self.conf.upstream_port))
            .collect()
    }

    fn last_cname_text(&self) -> Option<Vec<String>> {
        self.seen_cnames.last().map(|target| vec![target.to_string()])
    }

    fn check_budget(&self) -> Result<(), LookupErrCtx> {
        if time::Instant::now() >= self.deadline {
            let err_msg = format!("resolving '{}'", self.qname);
            return Err((err_msg, LookupErr::BudgetExceeded));
        }
        Ok(())
    }
}

fn root_name() -> dns::Name {
    dns::Name::from_string(".").unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::dns::{Header, Message, Name, Question, Record, RecordType, RespCode};
    use std::net::{Ipv4Addr, UdpSocket};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn name(s: &str) -> Name {
        Name::from_string(s).unwrap()
    }

    fn a_rec(node: &str, ttl: u32, address: [u8; 4]) -> Record {
        Record::A {
            node: name(node),
            ttl,
            address: Ipv4Addr::from(address),
        }
    }

    fn ns_rec(zone: &str, target: &str) -> Record {
        Record::NS {
            node: name(zone),
            ttl: 300,
            target: name(target),
        }
    }

    fn cname_rec(node: &str, target: &str) -> Record {
        Record::CNAME {
            node: name(node),
            ttl: 300,
            target: name(target),
        }
    }

    fn mx_rec(node: &str, preference: u16, exchange: &str) -> Record {
        Record::MX {
            node: name(node),
            ttl: 300,
            preference,
            exchange: name(exchange),
        }
    }

    fn response(
        request: &Message,
        resp_code: RespCode,
        answers: Vec<Record>,
        authorities: Vec<Record>,
        additionals: Vec<Record>,
    ) -> Message {
        let header = Header {
            id: request.id(),
            query_resp: true,
            auth_answer: true,
            resp_code,
            questions_count: request.questions.len() as u16,
            answers_count: answers.len() as u16,
            authorities_count: authorities.len() as u16,
            additionals_count: additionals.len() as u16,
            ..Header::default()
        };
        Message {
            header,
            questions: request.questions.clone(),
            answers,
            authorities,
            additionals,
        }
    }

    struct MockNs {
        addr: SocketAddr,
        queries: Arc<AtomicUsize>,
    }

    // Serves programmed responses on the passed socket from a detached
    // thread, counting the queries received. The thread exits once no
    // query arrives for a while.
    fn spawn_ns<F>(socket: UdpSocket, handler: F) -> MockNs
    where
        F: Fn(&Message, &Question) -> Message + Send + 'static,
    {
        socket
            .set_read_timeout(Some(time::Duration::from_secs(10)))
            .unwrap();
        let addr = socket.local_addr().unwrap();
        let queries = Arc::new(AtomicUsize::new(0));
        let queries_counter = Arc::clone(&queries);
        thread::spawn(move || loop {
            let mut buffer = [0; dns::MAX_UDP_PAYLOAD];
            let (n_read, src) = match socket.recv_from(&mut buffer) {
                Ok(v) => v,
                Err(_) => return,
            };
            let request = Message::decode_from_bytes(&buffer[..n_read]).unwrap();
            queries_counter.fetch_add(1, Ordering::SeqCst);
            let question = request.questions[0].clone();
            let response = handler(&request, &question);
            socket.send_to(&response.encode_to_bytes(), src).unwrap();
        });
        MockNs { addr, queries }
    }

    fn test_resolver(roots: Vec<SocketAddr>, upstream_port: u16) -> (Resolver, Arc<ResolverCache>) {
        let cache = Arc::new(ResolverCache::default());
        let tracker = Arc::new(ServerTracker::default());
        let conf = ResolverParams {
            exchange_timeout: time::Duration::from_millis(500),
            budget: time::Duration::from_secs(5),
            roots,
            upstream_port,
            ..ResolverParams::default()
        };
        (Resolver::new(&cache, &tracker, conf), cache)
    }

    #[test]
    fn test_full_recursive_resolution() {
        // Authoritative server of example.com., reached through two
        // delegations: . -> com. -> example.com., glue everywhere.
        let com_socket = UdpSocket::bind("127.0.0.2:0").unwrap();
        let upstream_port = com_socket.local_addr().unwrap().port();
        let example_socket = UdpSocket::bind(("127.0.0.3", upstream_port)).unwrap();

        let _example = spawn_ns(example_socket, |req, q| {
            assert_eq!(q.node.as_ref(), "example.com.");
            response(req, RespCode::NoError, vec![a_rec("example.com.", 300, [93, 184, 216, 34])], vec![], vec![])
        });
        let _com = spawn_ns(com_socket, |req, _| {
            response(
                req,
                RespCode::NoError,
                vec![],
                vec![ns_rec("example.com.", "ns.example-hosting.test.")],
                vec![a_rec("ns.example-hosting.test.", 300, [127, 0, 0, 3])],
            )
        });
        let root = spawn_ns(UdpSocket::bind("127.0.0.1:0").unwrap(), move |req, _| {
            response(
                req,
                RespCode::NoError,
                vec![],
                vec![ns_rec("com.", "a.gtld.test.")],
                vec![a_rec("a.gtld.test.", 300, [127, 0, 0, 2])],
            )
        });

        let (resolver, cache) = test_resolver(vec![root.addr], upstream_port);
        let answer = resolver.resolve("example.com", "A");
        assert_eq!(answer, ["93.184.216.34"]);

        // The answer and the delegations walked are now cached.
        assert_eq!(cache.get(&name("example.com."), RecordType::A), Some(answer));
        assert!(cache.get_delegation(&name("com.")).is_some());
        assert!(cache.get_delegation(&name("example.com.")).is_some());
    }

    #[test]
    fn test_cached_answer_skips_network() {
        let root = spawn_ns(UdpSocket::bind("127.0.0.1:0").unwrap(), |req, _| {
            response(req, RespCode::NoError, vec![a_rec("example.org.", 300, [10, 0, 0, 1])], vec![], vec![])
        });

        let (resolver, _) = test_resolver(vec![root.addr], root.addr.port());
        let first = resolver.resolve("example.org", "A");
        assert_eq!(first, ["10.0.0.1"]);
        assert_eq!(root.queries.load(Ordering::SeqCst), 1);

        // The second resolution is answered from the cache: identical
        // list, no further exchange.
        let second = resolver.resolve("example.org", "A");
        assert_eq!(second, first);
        assert_eq!(root.queries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cached_delegation_skips_root() {
        let auth_socket = UdpSocket::bind("127.0.0.4:0").unwrap();
        let upstream_port = auth_socket.local_addr().unwrap().port();
        let auth = spawn_ns(auth_socket, |req, _| {
            response(req, RespCode::NoError, vec![a_rec("deep.example.net.", 60, [10, 9, 9, 9])], vec![], vec![])
        });
        let root = spawn_ns(UdpSocket::bind("127.0.0.1:0").unwrap(), |req, _| {
            response(req, RespCode::ServFail, vec![], vec![], vec![])
        });

        let (resolver, cache) = test_resolver(vec![root.addr], upstream_port);
        cache.put_delegation(&name("example.net."), vec!["127.0.0.4".parse().unwrap()], 300);

        let answer = resolver.resolve("deep.example.net", "A");
        assert_eq!(answer, ["10.9.9.9"]);
        assert_eq!(root.queries.load(Ordering::SeqCst), 0);
        assert_eq!(auth.queries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cname_chase() {
        let root = spawn_ns(UdpSocket::bind("127.0.0.1:0").unwrap(), |req, q| {
            match q.node.as_ref() {
                "www.example.com." => {
                    response(req, RespCode::NoError, vec![cname_rec("www.example.com.", "example.com.")], vec![], vec![])
                }
                "example.com." => {
                    response(req, RespCode::NoError, vec![a_rec("example.com.", 300, [93, 184, 216, 34])], vec![], vec![])
                }
                other => panic!("unexpected query: {}", other),
            }
        });

        let (resolver, _) = test_resolver(vec![root.addr], root.addr.port());
        let answer = resolver.resolve("www.example.com", "A");
        assert_eq!(answer, ["93.184.216.34"]);
    }

    #[test]
    fn test_cname_loop_surfaces_target() {
        let root = spawn_ns(UdpSocket::bind("127.0.0.1:0").unwrap(), |req, q| {
            match q.node.as_ref() {
                "www.loopy.test." => {
                    response(req, RespCode::NoError, vec![cname_rec("www.loopy.test.", "alias.loopy.test.")], vec![], vec![])
                }
                "alias.loopy.test." => {
                    response(req, RespCode::NoError, vec![cname_rec("alias.loopy.test.", "www.loopy.test.")], vec![], vec![])
                }
                other => panic!("unexpected query: {}", other),
            }
        });

        let (resolver, _) = test_resolver(vec![root.addr], root.addr.port());
        let answer = resolver.resolve("www.loopy.test", "A");
        assert_eq!(answer, ["alias.loopy.test."]);
    }

    #[test]
    fn test_cname_not_chased_for_mx() {
        let root = spawn_ns(UdpSocket::bind("127.0.0.1:0").unwrap(), |req, q| {
            assert_eq!(q.record_type, RecordType::MX);
            response(req, RespCode::NoError, vec![cname_rec("mail.example.com.", "example.com.")], vec![], vec![])
        });

        let (resolver, _) = test_resolver(vec![root.addr], root.addr.port());
        let answer = resolver.resolve("mail.example.com", "MX");
        assert_eq!(answer, ["example.com."]);
    }

    #[test]
    fn test_mx_answers_are_rendered_with_preference() {
        let root = spawn_ns(UdpSocket::bind("127.0.0.1:0").unwrap(), |req, _| {
            response(
                req,
                RespCode::NoError,
                vec![mx_rec("example.com.", 10, "mail1.example.com."), mx_rec("example.com.", 20, "mail2.example.com.")],
                vec![],
                vec![],
            )
        });

        let (resolver, _) = test_resolver(vec![root.addr], root.addr.port());
        let answer = resolver.resolve("example.com", "MX");
        assert_eq!(answer, ["10 mail1.example.com.", "20 mail2.example.com."]);
    }

    #[test]
    fn test_nxdomain_is_cached_negatively() {
        let root = spawn_ns(UdpSocket::bind("127.0.0.1:0").unwrap(), |req, _| {
            response(req, RespCode::NxDomain, vec![], vec![], vec![])
        });

        let (resolver, cache) = test_resolver(vec![root.addr], root.addr.port());
        assert!(resolver.resolve("missing.example.com", "A").is_empty());
        assert!(cache.is_negative(&name("missing.example.com."), RecordType::A));

        // The negative entry short-circuits the next resolution.
        assert!(resolver.resolve("missing.example.com", "A").is_empty());
        assert_eq!(root.queries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_all_servers_failing_yields_empty() {
        let root = spawn_ns(UdpSocket::bind("127.0.0.1:0").unwrap(), |req, _| {
            response(req, RespCode::ServFail, vec![], vec![], vec![])
        });

        let (resolver, _) = test_resolver(vec![root.addr], root.addr.port());
        assert!(resolver.resolve("unlucky.example.com", "A").is_empty());
        // Every retry round reached the server.
        assert!(root.queries.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_unsupported_type_yields_empty() {
        let (resolver, _) = test_resolver(vec!["127.0.0.1:1".parse().unwrap()], 1);
        assert!(resolver.resolve("example.com", "TXT").is_empty());
        assert!(resolver.resolve("example.com", "PTR").is_empty());
        assert!(resolver.resolve("not..a..domain", "A").is_empty());
    }

    #[test]
    fn test_glueless_delegation_resolves_nameserver_name() {
        // The delegation of example.io. names a nameserver outside the
        // zone with no glue: its address is found with a nested lookup.
        let auth_socket = UdpSocket::bind("127.0.0.5:0").unwrap();
        let upstream_port = auth_socket.local_addr().unwrap().port();
        let _auth = spawn_ns(auth_socket, |req, q| {
            assert_eq!(q.node.as_ref(), "example.io.");
            response(req, RespCode::NoError, vec![a_rec("example.io.", 60, [10, 5, 5, 5])], vec![], vec![])
        });

        let root = spawn_ns(UdpSocket::bind("127.0.0.1:0").unwrap(), |req, q| {
            match q.node.as_ref() {
                // The nameserver name itself resolves directly.
                "ns.elsewhere.test." => {
                    response(req, RespCode::NoError, vec![a_rec("ns.elsewhere.test.", 60, [127, 0, 0, 5])], vec![], vec![])
                }
                "example.io." => response(
                    req,
                    RespCode::NoError,
                    vec![],
                    vec![ns_rec("example.io.", "ns.elsewhere.test.")],
                    vec![],
                ),
                other => panic!("unexpected query: {}", other),
            }
        });

        let (resolver, _) = test_resolver(vec![root.addr], upstream_port);
        let answer = resolver.resolve("example.io", "A");
        assert_eq!(answer, ["10.5.5.5"]);
    }
}
