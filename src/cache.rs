use std::collections::HashMap;

use log::debug;

use crate::cloudflare_api::DnsRecord;

/// Answer of [`RecordCache::get_or_fetch`].
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    Cached(&'a [DnsRecord]),
    /// A fetch is running; render a loading state until it lands.
    Loading,
}

/// Identifies one fetch so that results of superseded fetches can be dropped.
pub type FetchTicket = u64;

/// Last known good record list per zone id.
///
/// Only touched from the presentation thread, so it needs no locking.
#[derive(Debug, Default)]
pub struct RecordCache {
    records: HashMap<String, Vec<DnsRecord>>,
    pending: HashMap<String, FetchTicket>,
    next_ticket: FetchTicket,
}

impl RecordCache {
    pub fn new() -> Self {
        RecordCache::default()
    }

    pub fn get(&self, zone_id: &str) -> Option<&[DnsRecord]> {
        self.records.get(zone_id).map(Vec::as_slice)
    }

    pub fn contains(&self, zone_id: &str) -> bool {
        self.records.contains_key(zone_id)
    }

    pub fn is_pending(&self, zone_id: &str) -> bool {
        self.pending.contains_key(zone_id)
    }

    /// Returns the cached records, or starts `fetch` once and reports `Loading`.
    ///
    /// While a fetch for the zone is outstanding, further calls do not fetch again.
    pub fn get_or_fetch<F>(&mut self, zone_id: &str, fetch: F) -> Lookup<'_>
    where
        F: FnOnce(FetchTicket),
    {
        if !self.records.contains_key(zone_id) && !self.pending.contains_key(zone_id) {
            self.next_ticket += 1;
            let ticket = self.next_ticket;
            self.pending.insert(zone_id.to_string(), ticket);
            debug!("Cache miss for zone {}, fetch #{}.", zone_id, ticket);
            fetch(ticket);
        }

        match self.records.get(zone_id) {
            Some(records) => Lookup::Cached(records),
            None => Lookup::Loading,
        }
    }

    /// Records the outcome of a fetch. A failure leaves the zone uncached.
    ///
    /// Returns `false` if the fetch was superseded by an invalidation, in which case
    /// its result is dropped.
    pub fn complete_fetch<E>(
        &mut self,
        zone_id: &str,
        ticket: FetchTicket,
        result: &Result<Vec<DnsRecord>, E>,
    ) -> bool {
        if self.pending.get(zone_id) != Some(&ticket) {
            debug!("Dropping stale fetch #{} of zone {}.", ticket, zone_id);
            return false;
        }

        self.pending.remove(zone_id);
        if let Ok(records) = result {
            self.records.insert(zone_id.to_string(), records.clone());
        }
        true
    }

    /// Forgets the zone, including any fetch still in flight.
    pub fn invalidate(&mut self, zone_id: &str) {
        self.pending.remove(zone_id);
        if self.records.remove(zone_id).is_some() {
            debug!("Invalidated cached records of zone {}.", zone_id);
        }
    }

    /// Drops everything, used when the account changes.
    pub fn clear(&mut self) {
        self.records.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudflare_api::RecordType;

    fn record(id: &str) -> DnsRecord {
        DnsRecord {
            id: id.to_string(),
            dns_type: RecordType::A,
            name: "example.com".to_string(),
            content: "192.0.2.1".to_string(),
            proxied: false,
            ttl: 1,
        }
    }

    #[test]
    fn miss_fetches_exactly_once() {
        let mut cache = RecordCache::new();
        let mut tickets = Vec::new();

        assert_eq!(cache.get_or_fetch("z1", |t| tickets.push(t)), Lookup::Loading);
        assert_eq!(cache.get_or_fetch("z1", |t| tickets.push(t)), Lookup::Loading);
        assert_eq!(tickets.len(), 1);

        assert!(cache.complete_fetch::<String>("z1", tickets[0], &Ok(vec![record("r1")])));
        match cache.get_or_fetch("z1", |t| tickets.push(t)) {
            Lookup::Cached(records) => assert_eq!(records, &[record("r1")]),
            Lookup::Loading => panic!("expected cached records"),
        }
        assert_eq!(tickets.len(), 1);
    }

    #[test]
    fn failed_fetch_leaves_zone_uncached() {
        let mut cache = RecordCache::new();
        let mut ticket = 0;
        cache.get_or_fetch("z1", |t| ticket = t);
        assert!(cache.complete_fetch("z1", ticket, &Err("timeout")));

        assert!(!cache.contains("z1"));
        assert!(!cache.is_pending("z1"));

        let mut fetched = false;
        cache.get_or_fetch("z1", |_| fetched = true);
        assert!(fetched);
    }

    #[test]
    fn empty_list_is_a_valid_snapshot() {
        let mut cache = RecordCache::new();
        let mut ticket = 0;
        cache.get_or_fetch("z1", |t| ticket = t);
        cache.complete_fetch::<String>("z1", ticket, &Ok(Vec::new()));
        assert_eq!(cache.get("z1"), Some(&[][..]));
    }

    #[test]
    fn fetch_superseded_by_invalidation_is_dropped() {
        let mut cache = RecordCache::new();
        let mut tickets = Vec::new();
        cache.get_or_fetch("z1", |t| tickets.push(t));
        cache.invalidate("z1");
        cache.get_or_fetch("z1", |t| tickets.push(t));
        assert_eq!(tickets.len(), 2);

        assert!(!cache.complete_fetch::<String>("z1", tickets[0], &Ok(vec![record("old")])));
        assert!(!cache.contains("z1"));
        assert!(cache.complete_fetch::<String>("z1", tickets[1], &Ok(vec![record("new")])));
        assert_eq!(cache.get("z1"), Some(&[record("new")][..]));
    }

    #[test]
    fn invalidate_and_clear() {
        let mut cache = RecordCache::new();
        for zone in ["z1", "z2"] {
            let mut ticket = 0;
            cache.get_or_fetch(zone, |t| ticket = t);
            cache.complete_fetch::<String>(zone, ticket, &Ok(vec![record(zone)]));
        }

        cache.invalidate("z1");
        assert!(!cache.contains("z1"));
        assert!(cache.contains("z2"));

        cache.clear();
        assert!(!cache.contains("z2"));
    }
}
