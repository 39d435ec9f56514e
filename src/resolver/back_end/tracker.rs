use dashmap::DashMap;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time;

// Constants of the smoothed-RTT model. ALPHA weights the new sample
// heavily, a much higher learning rate than the classical Jacobson-Karels
// smoothing (which puts 0.125 on the sample); the behavior is kept as-is.
const RTT_INITIAL_MS: f64 = 2000.0;
const RTT_MAX_MS: f64 = 4000.0;
const ALPHA: f64 = 0.875;
const BETA: f64 = 0.25;
const FAILURE_PENALTY: f64 = 2.0;
const MAX_FAILURES: u32 = 3;
const BUCKET_COUNT: usize = 64;
const SELECT_MAX: usize = 2;
const UNTESTED_CHANCE: f64 = 0.1;
const IDLE_THRESHOLD_MS: f64 = 60_000.0;
const ACTIVE_LOAD: f64 = 0.1;
const IDLE_LOAD: f64 = 0.1;

const STATUS_UNTESTED: u8 = 0;
const STATUS_AVAILABLE: u8 = 1;
const STATUS_NEGATIVE: u8 = 2;

/// The tracker configuration parameters used to instantiate a new
/// [`ServerTracker`]. A Default trait implementation is provided.
#[derive(Debug, Clone)]
pub struct TrackerConf {
    pub retry_interval: time::Duration,
}

impl Default for TrackerConf {
    fn default() -> Self {
        TrackerConf {
            retry_interval: time::Duration::from_secs(30),
        }
    }
}

/// The availability of a nameserver as judged by the tracker. Negative
/// servers carry the deadline after which they are probed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Untested,
    Available,
    Negative { until_ms: u64 },
}

/// Performance statistics of a single nameserver. All fields are atomics:
/// entries are mutated through shared references, so updating a server
/// never locks the table shard it lives in. Counters use read-modify-write
/// atomics, estimator fields are plain values published with release
/// ordering and read with acquire ordering. Two concurrent updates of the
/// same server may interleave, leaving the result of either order: the
/// estimators tolerate that.
pub struct ServerStats {
    srtt_ms: AtomicU64,
    rttvar_ms: AtomicU64,
    failures: AtomicU32,
    active_queries: AtomicU32,
    status: AtomicU8,
    last_query_ms: AtomicU64,
    negative_until_ms: AtomicU64,
}

impl Default for ServerStats {
    fn default() -> Self {
        ServerStats {
            srtt_ms: AtomicU64::new(RTT_INITIAL_MS.to_bits()),
            rttvar_ms: AtomicU64::new(0f64.to_bits()),
            failures: AtomicU32::new(0),
            active_queries: AtomicU32::new(0),
            status: AtomicU8::new(STATUS_UNTESTED),
            last_query_ms: AtomicU64::new(clock_ms()),
            negative_until_ms: AtomicU64::new(0),
        }
    }
}

impl ServerStats {
    fn srtt(&self) -> f64 {
        f64::from_bits(self.srtt_ms.load(Ordering::Acquire))
    }

    fn set_srtt(&self, value: f64) {
        self.srtt_ms.store(value.to_bits(), Ordering::Release);
    }

    fn rttvar(&self) -> f64 {
        f64::from_bits(self.rttvar_ms.load(Ordering::Acquire))
    }

    fn set_rttvar(&self, value: f64) {
        self.rttvar_ms.store(value.to_bits(), Ordering::Release);
    }
}

/// Tracks per-nameserver performance and availability, and implements the
/// bucketed selection policy deciding which nameservers to contact next.
/// The tracker is a process-wide singleton shared by all in-flight
/// resolutions; stats entries are created lazily on first observation.
pub struct ServerTracker {
    servers: DashMap<SocketAddr, Arc<ServerStats>>,
    conf: TrackerConf,
}

impl Default for ServerTracker {
    fn default() -> Self {
        Self::new(TrackerConf::default())
    }
}

impl ServerTracker {
    /// Creates a new empty [ServerTracker] with the provided [`TrackerConf`].
    pub fn new(conf: TrackerConf) -> Self {
        ServerTracker {
            servers: DashMap::new(),
            conf,
        }
    }

    /// Feed a successful exchange with its measured round trip time into
    /// the estimators of the server. Also clears the failure streak.
    pub fn record_success(&self, server: SocketAddr, rtt_ms: f64) {
        let stats = self.stats(server);
        if stats.status.load(Ordering::Acquire) == STATUS_UNTESTED {
            stats.set_srtt(rtt_ms);
            stats.set_rttvar(rtt_ms / 2.0);
        } else {
            let srtt = stats.srtt();
            let diff = srtt - rtt_ms;
            stats.set_rttvar((1.0 - BETA) * stats.rttvar() + BETA * diff.abs());
            stats.set_srtt((1.0 - ALPHA) * srtt + ALPHA * rtt_ms);
        }
        stats.status.store(STATUS_AVAILABLE, Ordering::Release);
        stats.failures.store(0, Ordering::Release);
        stats.last_query_ms.store(clock_ms(), Ordering::Release);
    }

    /// Account a failed exchange: the failure streak grows, the estimated
    /// rtt is penalized, and after enough consecutive failures the server
    /// is put aside until the retry interval elapses.
    pub fn record_failure(&self, server: SocketAddr) {
        let stats = self.stats(server);
        let failures = stats.failures.fetch_add(1, Ordering::AcqRel) + 1;
        stats.set_srtt(stats.srtt() * FAILURE_PENALTY);
        if failures >= MAX_FAILURES {
            let until = clock_ms() + self.conf.retry_interval.as_millis() as u64;
            stats.negative_until_ms.store(until, Ordering::Release);
            stats.status.store(STATUS_NEGATIVE, Ordering::Release);
        }
    }

    /// Account one more in-flight query towards the server. Must be
    /// balanced by [ServerTracker::end_query] on every exit path.
    pub fn start_query(&self, server: SocketAddr) {
        let stats = self.stats(server);
        stats.active_queries.fetch_add(1, Ordering::AcqRel);
    }

    /// Account the completion of an in-flight query towards the server.
    pub fn end_query(&self, server: SocketAddr) {
        let stats = self.stats(server);
        let _ = stats
            .active_queries
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_sub(1));
    }

    /// Returns the current [ServerStatus] of the server. Servers never
    /// observed before are untested.
    pub fn status(&self, server: SocketAddr) -> ServerStatus {
        let stats = match self.servers.get(&server) {
            None => return ServerStatus::Untested,
            Some(entry) => Arc::clone(entry.value()),
        };
        match stats.status.load(Ordering::Acquire) {
            STATUS_UNTESTED => ServerStatus::Untested,
            STATUS_NEGATIVE => ServerStatus::Negative {
                until_ms: stats.negative_until_ms.load(Ordering::Acquire),
            },
            _ => ServerStatus::Available,
        }
    }

    /// Selects up to two servers to contact among the candidates. Tested
    /// available servers are spread over buckets by effective rtt and
    /// drawn from the fastest non-empty buckets; an untested server is
    /// occasionally probed, always when nothing better exists. Negative
    /// servers are skipped until their retry deadline, after which they
    /// transition back to available. As a last resort, when every
    /// candidate is negative, one of them is picked at random.
    pub fn select(&self, candidates: &[SocketAddr]) -> Vec<SocketAddr> {
        let mut rng = rand::thread_rng();
        let mut untested = Vec::new();
        let mut tested = Vec::new();
        for &server in candidates {
            let stats = match self.servers.get(&server) {
                None => {
                    untested.push(server);
                    continue;
                }
                Some(entry) => Arc::clone(entry.value()),
            };
            if stats.status.load(Ordering::Acquire) == STATUS_UNTESTED {
                untested.push(server);
            } else if self.is_available(&stats) {
                tested.push((server, self.effective_rtt(&stats)));
            }
        }

        let mut selected = Vec::with_capacity(SELECT_MAX);
        if !tested.is_empty() {
            let mut buckets: Vec<Vec<SocketAddr>> = vec![Vec::new(); BUCKET_COUNT];
            for (server, eff) in tested {
                buckets[bucket_index(eff)].push(server);
            }
            'walk: for bucket in &mut buckets {
                while !bucket.is_empty() {
                    let picked = bucket.swap_remove(rng.gen_range(0..bucket.len()));
                    selected.push(picked);
                    if selected.len() == SELECT_MAX {
                        break 'walk;
                    }
                }
            }
        }

        if selected.len() < SELECT_MAX && !untested.is_empty() {
            let probe_untested = selected.is_empty() || rng.gen_bool(UNTESTED_CHANCE);
            if probe_untested {
                selected.push(untested[rng.gen_range(0..untested.len())]);
            }
        }
        if selected.is_empty() && !candidates.is_empty() {
            selected.push(candidates[rng.gen_range(0..candidates.len())]);
        }
        selected
    }

    // Returns the stats entry of the server, lazily creating it on the
    // first observation.
    fn stats(&self, server: SocketAddr) -> Arc<ServerStats> {
        let entry = self.servers.entry(server).or_default();
        Arc::clone(entry.value())
    }

    // Reports if the server can be contacted. A negative server past its
    // retry deadline transitions back to available with a clean slate.
    fn is_available(&self, stats: &ServerStats) -> bool {
        if stats.status.load(Ordering::Acquire) != STATUS_NEGATIVE {
            return true;
        }
        let until = stats.negative_until_ms.load(Ordering::Acquire);
        if clock_ms() < until {
            return false;
        }
        stats.failures.store(0, Ordering::Release);
        stats.status.store(STATUS_AVAILABLE, Ordering::Release);
        true
    }

    // The score used to rank tested servers. The base estimate is biased
    // away from servers already carrying in-flight queries and towards
    // servers not contacted recently (so their estimate gets re-probed).
    fn effective_rtt(&self, stats: &ServerStats) -> f64 {
        let base = stats.srtt() + 4.0 * stats.rttvar();
        let active = stats.active_queries.load(Ordering::Acquire) as f64;
        let idle_ms = clock_ms().saturating_sub(stats.last_query_ms.load(Ordering::Acquire)) as f64;
        let idle_over = (idle_ms - IDLE_THRESHOLD_MS).max(0.0);
        base * (1.0 + ACTIVE_LOAD * active) * (1.0 + idle_over / IDLE_THRESHOLD_MS * IDLE_LOAD)
    }
}

// The bucket an effective rtt falls into. Buckets evenly span
// [0, RTT_MAX_MS); scores beyond the range saturate into the last one.
fn bucket_index(eff: f64) -> usize {
    ((eff * BUCKET_COUNT as f64 / RTT_MAX_MS) as usize).min(BUCKET_COUNT - 1)
}

// Milliseconds elapsed since the process-wide monotonic epoch.
fn clock_ms() -> u64 {
    static EPOCH: OnceLock<time::Instant> = OnceLock::new();
    EPOCH.get_or_init(time::Instant::now).elapsed().as_millis() as u64
}
