use crate::dns::message::Response;
use crate::dns::transport::{DnsTransport, UdpDnsTransport};
use crate::error::ResolutionError;
use crate::rng::SharedRng;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::RecordType;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Fixed priority, weight and port fields that precede the target name.
const SRV_HEADER_SIZE: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvRecord {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

impl SrvRecord {
    pub fn new(priority: u16, weight: u16, port: u16, target: impl Into<String>) -> Self {
        Self {
            priority,
            weight,
            port,
            target: target.into(),
        }
    }
}

impl fmt::Display for SrvRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.priority, self.weight, self.port, self.target
        )
    }
}

/// SRV records kept in ascending priority order. Records with equal priority
/// stay in the order they were inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SrvRecords(Vec<SrvRecord>);

impl SrvRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: SrvRecord) {
        let at = self.0.partition_point(|r| r.priority <= record.priority);
        self.0.insert(at, record);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SrvRecord> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&SrvRecord> {
        self.0.first()
    }

    /// Chooses a target per RFC 2782: only the lowest priority is eligible,
    /// and among those each record wins in proportion to its weight.
    ///
    /// When every eligible weight is zero the first eligible record is
    /// returned without consulting `rng`.
    pub fn pick(&self, rng: &SharedRng) -> Result<&SrvRecord, ResolutionError> {
        let first = self.first().ok_or(ResolutionError::NoRecords)?;
        let eligible = || self.0.iter().take_while(|r| r.priority == first.priority);

        let total_weight: u32 = eligible().map(|r| u32::from(r.weight)).sum();
        if total_weight == 0 {
            return Ok(first);
        }

        let draw = rng.gen_range(0..=total_weight);
        let mut running = 0u32;
        for record in eligible() {
            running += u32::from(record.weight);
            if running >= draw {
                return Ok(record);
            }
        }

        Ok(first)
    }
}

impl FromIterator<SrvRecord> for SrvRecords {
    fn from_iter<T: IntoIterator<Item = SrvRecord>>(iter: T) -> Self {
        let mut records = Self::new();
        for record in iter {
            records.insert(record);
        }
        records
    }
}

impl<'a> IntoIterator for &'a SrvRecords {
    type Item = &'a SrvRecord;
    type IntoIter = std::slice::Iter<'a, SrvRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Looks up `_service._proto.domain` SRV records and picks one of them.
#[derive(Debug, Clone)]
pub struct SrvResolver {
    transport: Arc<dyn DnsTransport>,
    rng: SharedRng,
}

impl SrvResolver {
    pub fn new(transport: Arc<dyn DnsTransport>, rng: SharedRng) -> Self {
        Self { transport, rng }
    }

    pub fn resolve(
        &self,
        service: &str,
        proto: &str,
        domain: &str,
    ) -> Result<SrvRecords, ResolutionError> {
        let name = format!("_{service}._{proto}.{domain}");
        let response = self.transport.query(&name, RecordType::SRV)?;
        parse_srv_response(&name, &response)
    }

    pub fn pick<'a>(&self, records: &'a SrvRecords) -> Result<&'a SrvRecord, ResolutionError> {
        records.pick(&self.rng)
    }

    /// Resolves and picks in one step.
    pub fn lookup(
        &self,
        service: &str,
        proto: &str,
        domain: &str,
    ) -> Result<SrvRecord, ResolutionError> {
        let records = self.resolve(service, proto, domain)?;
        let record = self.pick(&records)?.clone();
        debug!(domain, %record, candidates = records.len(), "picked SRV record");
        Ok(record)
    }
}

impl Default for SrvResolver {
    fn default() -> Self {
        Self::new(UdpDnsTransport::arc(), SharedRng::global())
    }
}

fn parse_srv_response(name: &str, response: &[u8]) -> Result<SrvRecords, ResolutionError> {
    let message = Response::parse(response).map_err(|reason| ResolutionError::MalformedMessage {
        name: name.to_string(),
        reason,
    })?;

    if !message.is_response() {
        return Err(ResolutionError::MalformedMessage {
            name: name.to_string(),
            reason: "reply is not a response",
        });
    }
    let rcode = message.header.response_code();
    if rcode != ResponseCode::NoError {
        return Err(ResolutionError::ResponseCode {
            name: name.to_string(),
            rcode: u16::from(rcode),
        });
    }

    let mut records = SrvRecords::new();
    for answer in &message.answers {
        if answer.record_type != RecordType::SRV {
            continue;
        }

        let rdata = message.rdata(answer);
        if rdata.len() < SRV_HEADER_SIZE {
            trace!(name, len = rdata.len(), "skipping short SRV record");
            continue;
        }

        let Some(target) = message.name_at(answer.rdata.start + SRV_HEADER_SIZE) else {
            trace!(name, "skipping SRV record with malformed target");
            continue;
        };

        records.insert(SrvRecord {
            priority: u16::from_be_bytes([rdata[0], rdata[1]]),
            weight: u16::from_be_bytes([rdata[2], rdata[3]]),
            port: u16::from_be_bytes([rdata[4], rdata[5]]),
            target,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::message::tests::{response, srv_rdata};
    use std::collections::HashMap;
    use std::io;

    const TRIALS: usize = 10_000;

    #[derive(Debug)]
    struct CannedTransport(Result<Vec<u8>, ()>);

    impl DnsTransport for CannedTransport {
        fn query(&self, name: &str, _: RecordType) -> Result<Vec<u8>, ResolutionError> {
            self.0.clone().map_err(|_| ResolutionError::QueryFailed {
                name: name.to_string(),
                source: io::Error::new(io::ErrorKind::Other, "SERVFAIL"),
            })
        }
    }

    fn resolver(response: Result<Vec<u8>, ()>) -> SrvResolver {
        SrvResolver::new(Arc::new(CannedTransport(response)), SharedRng::seeded(42))
    }

    fn records(entries: &[(u16, u16, u16, &str)]) -> SrvRecords {
        entries
            .iter()
            .map(|&(priority, weight, port, target)| SrvRecord::new(priority, weight, port, target))
            .collect()
    }

    fn tally(records: &SrvRecords, trials: usize) -> HashMap<String, usize> {
        let rng = SharedRng::seeded(42);
        let mut counts = HashMap::new();
        for _ in 0..trials {
            let picked = records.pick(&rng).unwrap();
            *counts.entry(picked.target.clone()).or_default() += 1;
        }
        counts
    }

    #[test]
    fn resolve_parses_and_orders_records() {
        let msg = response(
            0,
            &[
                (33, srv_rdata(20, 5, 25566, "b.example.com")),
                (1, vec![192, 0, 2, 1]),
                (33, srv_rdata(10, 3, 25565, "a.example.com")),
                (33, vec![0, 1, 0, 1]),
                (33, srv_rdata(20, 7, 25567, "c.example.com")),
            ],
        );

        let records = resolver(Ok(msg)).resolve("minecraft", "tcp", "example.com").unwrap();
        let targets: Vec<_> = records.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, ["a.example.com", "b.example.com", "c.example.com"]);
        assert_eq!(records.first(), Some(&SrvRecord::new(10, 3, 25565, "a.example.com")));
    }

    #[test]
    fn resolve_with_no_answers_is_empty() {
        let records = resolver(Ok(response(0, &[]))).resolve("minecraft", "tcp", "example.com").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn failed_query_is_an_error() {
        let error = resolver(Err(())).resolve("minecraft", "tcp", "example.com").unwrap_err();
        assert!(matches!(error, ResolutionError::QueryFailed { ref name, .. } if name == "_minecraft._tcp.example.com"));
    }

    #[test]
    fn error_rcode_is_an_error() {
        let error = resolver(Ok(response(3, &[]))).resolve("minecraft", "tcp", "example.com").unwrap_err();
        assert!(matches!(error, ResolutionError::ResponseCode { rcode: 3, .. }));
    }

    #[test]
    fn garbage_response_is_an_error() {
        let error = resolver(Ok(vec![1, 2, 3])).resolve("minecraft", "tcp", "example.com").unwrap_err();
        assert!(matches!(error, ResolutionError::MalformedMessage { .. }));
    }

    #[test]
    fn pick_on_empty_fails() {
        let error = SrvRecords::new().pick(&SharedRng::seeded(42)).unwrap_err();
        assert!(matches!(error, ResolutionError::NoRecords));
    }

    #[test]
    fn single_record_is_selected() {
        let records = records(&[(10, 5, 80, "server1.example.com")]);
        let picked = records.pick(&SharedRng::seeded(42)).unwrap();
        assert_eq!(picked, &SrvRecord::new(10, 5, 80, "server1.example.com"));
    }

    #[test]
    fn lowest_priority_always_wins() {
        let records = records(&[
            (20, 5, 80, "server1.example.com"),
            (10, 3, 443, "server2.example.com"),
            (15, 7, 8080, "server3.example.com"),
        ]);
        let counts = tally(&records, TRIALS);
        assert_eq!(counts.get("server2.example.com"), Some(&TRIALS));
    }

    #[test]
    fn mixed_priorities_only_select_lowest_group() {
        let records = records(&[
            (5, 50, 80, "priority5.example.com"),
            (5, 50, 443, "priority5-2.example.com"),
            (10, 100, 8080, "priority10.example.com"),
            (15, 200, 9090, "priority15.example.com"),
        ]);
        let counts = tally(&records, TRIALS);
        assert!(!counts.contains_key("priority10.example.com"));
        assert!(!counts.contains_key("priority15.example.com"));
        assert_eq!(counts.values().sum::<usize>(), TRIALS);
    }

    #[test]
    fn heavy_weight_dominates() {
        let records = records(&[
            (10, 100, 80, "server1.example.com"),
            (10, 1, 443, "server2.example.com"),
            (10, 1, 8080, "server3.example.com"),
        ]);
        let counts = tally(&records, TRIALS);
        assert!(counts["server1.example.com"] as f64 > TRIALS as f64 * 0.9);
        assert!((counts.get("server2.example.com").copied().unwrap_or(0) as f64) < TRIALS as f64 * 0.1);
        assert!((counts.get("server3.example.com").copied().unwrap_or(0) as f64) < TRIALS as f64 * 0.1);
    }

    #[test]
    fn equal_weights_spread_evenly() {
        let records = records(&[
            (10, 10, 80, "server1.example.com"),
            (10, 10, 443, "server2.example.com"),
            (10, 10, 8080, "server3.example.com"),
        ]);
        let trials = 3 * TRIALS;
        let counts = tally(&records, trials);
        for (target, count) in counts {
            let share = count as f64 / trials as f64;
            assert!(share > 0.8 / 3.0 && share < 1.2 / 3.0, "{target} got {share}");
        }
    }

    #[test]
    fn zero_weights_are_deterministic() {
        let records = records(&[
            (10, 0, 80, "server1.example.com"),
            (10, 0, 443, "server2.example.com"),
            (10, 0, 8080, "server3.example.com"),
        ]);
        let counts = tally(&records, 1000);
        assert_eq!(counts.get("server1.example.com"), Some(&1000));
    }

    #[test]
    fn max_weights_do_not_overflow() {
        let records = records(&[
            (1, u16::MAX, 80, "server1.example.com"),
            (1, u16::MAX, 443, "server2.example.com"),
            (1, 1, 443, "server3.example.com"),
        ]);
        let counts = tally(&records, TRIALS);
        assert!(counts.get("server3.example.com").copied().unwrap_or(0) < TRIALS / 100);
        assert!(counts["server1.example.com"] > TRIALS / 3);
        assert!(counts["server2.example.com"] > TRIALS / 3);
    }

    #[test]
    fn lookup_returns_owned_choice() {
        let msg = response(0, &[(33, srv_rdata(0, 0, 25570, "mc.example.com"))]);
        let record = resolver(Ok(msg)).lookup("minecraft", "tcp", "example.com").unwrap();
        assert_eq!(record, SrvRecord::new(0, 0, 25570, "mc.example.com"));
    }
}
