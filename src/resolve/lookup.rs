//! DNS lookup capability consumed by the resolution workers.

use crate::types::RecordType;
use async_trait::async_trait;
use hickory_resolver::config::{
    NameServerConfig, Protocol, ResolverConfig, ResolverOpts,
};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::TokioAsyncResolver;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// Per-lookup failure classification. These are recorded as data on the
/// candidate record, never propagated as scan failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("lookup timed out")]
    Timeout,
    #[error("NXDOMAIN")]
    NxDomain,
    #[error("SERVFAIL")]
    ServFail,
    #[error("lookup failed: {0}")]
    Other(String),
}

pub type LookupResult = std::result::Result<Vec<String>, LookupError>;

/// Abstract DNS lookup contract. The production implementation talks to
/// a real resolver; tests substitute scripted fakes.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn lookup(
        &self,
        name: &str,
        record_type: RecordType,
        nameserver: IpAddr,
        timeout: Duration,
    ) -> LookupResult;
}

/// `hickory-resolver` backed lookup, one resolver instance per
/// nameserver address, single attempt per query.
pub struct HickoryLookup {
    resolvers: Mutex<HashMap<IpAddr, TokioAsyncResolver>>,
}

impl HickoryLookup {
    pub fn new() -> Self {
        Self {
            resolvers: Mutex::new(HashMap::new()),
        }
    }

    fn resolver_for(&self, nameserver: IpAddr, timeout: Duration) -> TokioAsyncResolver {
        let mut resolvers = self.resolvers.lock().expect("resolver cache poisoned");
        resolvers
            .entry(nameserver)
            .or_insert_with(|| {
                let mut config = ResolverConfig::new();
                config.add_name_server(NameServerConfig::new(
                    SocketAddr::new(nameserver, 53),
                    Protocol::Udp,
                ));

                let mut opts = ResolverOpts::default();
                opts.timeout = timeout;
                opts.attempts = 1;
                // Sentinel classification depends on seeing the raw
                // response code, not a cached one.
                opts.cache_size = 0;

                TokioAsyncResolver::tokio(config, opts)
            })
            .clone()
    }
}

impl Default for HickoryLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsLookup for HickoryLookup {
    async fn lookup(
        &self,
        name: &str,
        record_type: RecordType,
        nameserver: IpAddr,
        timeout: Duration,
    ) -> LookupResult {
        let resolver = self.resolver_for(nameserver, timeout);
        let rtype = to_hickory(record_type);

        match resolver.lookup(name, rtype).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|rdata| rdata.to_string().trim_end_matches('.').to_string())
                .collect()),
            Err(e) => classify(e.kind()),
        }
    }
}

fn to_hickory(record_type: RecordType) -> hickory_resolver::proto::rr::RecordType {
    use hickory_resolver::proto::rr::RecordType as H;
    match record_type {
        RecordType::A => H::A,
        RecordType::Aaaa => H::AAAA,
        RecordType::Ns => H::NS,
        RecordType::Mx => H::MX,
    }
}

fn classify(kind: &ResolveErrorKind) -> LookupResult {
    match kind {
        ResolveErrorKind::Timeout => Err(LookupError::Timeout),
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match response_code {
            ResponseCode::NXDomain => Err(LookupError::NxDomain),
            ResponseCode::ServFail => Err(LookupError::ServFail),
            // NOERROR with an empty answer section: the name exists but
            // carries no records of this type.
            _ => Ok(Vec::new()),
        },
        other => Err(LookupError::Other(other.to_string())),
    }
}
