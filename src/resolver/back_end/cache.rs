use crate::shared::dns;
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{cmp, thread, time};

/// The cache configuration parameters used to instantiate a new
/// [`ResolverCache`]. A Default trait implementation is provided.
#[derive(Debug, Clone)]
pub struct CacheConf {
    pub ttl_cap: time::Duration,
    pub reclaim_period: time::Duration,
}

impl Default for CacheConf {
    fn default() -> Self {
        CacheConf {
            ttl_cap: time::Duration::from_secs(300),
            reclaim_period: time::Duration::from_secs(300),
        }
    }
}

/// The multi-level cache shared by all in-flight resolutions. Three
/// concurrently accessible maps hold rendered positive answers, negative
/// outcomes and delegation sets, all keyed by canonical name strings and
/// expired by a per-entry deadline. Expired entries are logically absent
/// from every read and physically removed either on access or by the
/// background reclaim routine.
pub struct ResolverCache {
    records: DashMap<String, TimedEntry<Vec<String>>>,
    negatives: DashMap<String, time::Instant>,
    delegations: DashMap<String, TimedEntry<Vec<IpAddr>>>,
    conf: CacheConf,
}

#[derive(Debug, Clone)]
struct TimedEntry<T> {
    value: T,
    deadline: time::Instant,
}

impl Default for ResolverCache {
    fn default() -> Self {
        Self::new(CacheConf::default())
    }
}

impl ResolverCache {
    /// Creates a new empty [ResolverCache] with the provided [`CacheConf`].
    pub fn new(conf: CacheConf) -> Self {
        ResolverCache {
            records: DashMap::new(),
            negatives: DashMap::new(),
            delegations: DashMap::new(),
            conf,
        }
    }

    /// Returns the cached answer for the node and type, if a non-expired
    /// positive entry exists. An expired entry found on the way is removed.
    pub fn get(&self, node: &dns::Name, kind: dns::RecordType) -> Option<Vec<String>> {
        let key = record_key(node, kind);
        {
            let entry = self.records.get(&key)?;
            if !is_expired(entry.deadline) {
                return Some(entry.value.clone());
            }
        }
        // The entry expired: remove it, re-checking the deadline under the
        // entry guard so a concurrent fresh re-insert is left untouched.
        self.records.remove_if(&key, |_, entry| is_expired(entry.deadline));
        None
    }

    /// Reports whether a non-expired negative entry exists for the
    /// node and type.
    pub fn is_negative(&self, node: &dns::Name, kind: dns::RecordType) -> bool {
        let key = record_key(node, kind);
        let expired = match self.negatives.get(&key) {
            None => return false,
            Some(entry) => is_expired(*entry),
        };
        if expired {
            self.negatives.remove_if(&key, |_, deadline| is_expired(*deadline));
        }
        !expired
    }

    /// Returns the cached nameserver addresses of the zone, if a
    /// non-expired delegation entry exists.
    pub fn get_delegation(&self, zone: &dns::Name) -> Option<Vec<IpAddr>> {
        let key = zone.as_ref().to_string();
        {
            let entry = self.delegations.get(&key)?;
            if !is_expired(entry.deadline) {
                return Some(entry.value.clone());
            }
        }
        self.delegations.remove_if(&key, |_, entry| is_expired(entry.deadline));
        None
    }

    /// Writes a positive entry for the node and type. The TTL is clamped
    /// to the configured cap; a zero TTL stores a transient entry that
    /// expires on the next read. Any negative entry for the same key is
    /// superseded.
    pub fn put(&self, node: &dns::Name, kind: dns::RecordType, answer: Vec<String>, ttl_secs: u32) {
        let key = record_key(node, kind);
        let deadline = time::Instant::now() + self.clamp_ttl(ttl_secs);
        self.negatives.remove(&key);
        self.records.insert(key, TimedEntry { value: answer, deadline });
    }

    /// Writes a negative entry for the node and type, superseding any
    /// positive entry for the same key.
    pub fn put_negative(&self, node: &dns::Name, kind: dns::RecordType, ttl_secs: u32) {
        let key = record_key(node, kind);
        let deadline = time::Instant::now() + self.clamp_ttl(ttl_secs);
        self.records.remove(&key);
        self.negatives.insert(key, deadline);
    }

    /// Writes the delegation entry for a zone.
    pub fn put_delegation(&self, zone: &dns::Name, servers: Vec<IpAddr>, ttl_secs: u32) {
        let deadline = time::Instant::now() + self.clamp_ttl(ttl_secs);
        let entry = TimedEntry { value: servers, deadline };
        self.delegations.insert(zone.as_ref().to_string(), entry);
    }

    /// Removes the expired entries of every map. Removal re-checks the
    /// deadline under the per-entry guard, so entries concurrently
    /// re-inserted with a fresh deadline are never lost.
    pub fn reclaim(&self) {
        let now = time::Instant::now();
        self.records.retain(|_, entry| entry.deadline > now);
        self.negatives.retain(|_, deadline| *deadline > now);
        self.delegations.retain(|_, entry| entry.deadline > now);
    }

    fn clamp_ttl(&self, ttl_secs: u32) -> time::Duration {
        cmp::min(time::Duration::from_secs(ttl_secs as u64), self.conf.ttl_cap)
    }
}

impl ResolverCache {
    /// Spawns the background thread reclaiming expired entries at regular
    /// periods of time (dictated by the confs). The thread observes the
    /// `stop` flag and terminates promptly when it is raised.
    pub fn start_reclaim_routine(self: &Arc<Self>, stop: Arc<AtomicBool>) -> thread::JoinHandle<()> {
        let period = self.conf.reclaim_period;
        let cache = Arc::clone(self);
        thread::spawn(move || loop {
            if sleep_observing_stop(period, &stop) {
                return;
            }
            cache.reclaim();
            log::info!("Cache reclaimed.");
        })
    }
}

// Sleeps for the whole period in small slices, returning true as
// soon as the stop flag is observed raised.
fn sleep_observing_stop(period: time::Duration, stop: &AtomicBool) -> bool {
    let deadline = time::Instant::now() + period;
    loop {
        if stop.load(Ordering::SeqCst) {
            return true;
        }
        let now = time::Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(cmp::min(deadline - now, time::Duration::from_millis(500)));
    }
}

fn record_key(node: &dns::Name, kind: dns::RecordType) -> String {
    format!("{}:{}", node.as_ref(), kind.to_str())
}

fn is_expired(deadline: time::Instant) -> bool {
    deadline <= time::Instant::now()
}

#[allow(dead_code)]
fn compile_time_checks() {
    fn check_send<T: Send>(_: T) {}
    fn check_sync<T: Sync>(_: T) {}
    check_send(ResolverCache::default());
    check_sync(ResolverCache::default());
}
