//! Concurrent foreign-key resolution across secondary collections.
//!
//! `resolve` never fails: a lookup that errors, times out or finds nothing
//! degrades to the domain's fallback text for that id only.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::domain::{FetchRule, ForeignKeyDomain};
use super::source::EntitySource;
use crate::mcp::models::listing_exhausted;

pub const PAGE_SIZE: usize = 50;
pub const MAX_PAGES: usize = 20;
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// A primary record that references secondary entities by id.
pub trait ForeignKeys {
    fn foreign_key(&self, domain: ForeignKeyDomain) -> Option<i64>;
}

#[derive(Debug)]
enum LookupOutcome {
    Found(String),
    NotFound,
    Failed(String),
}

/// Id to display name for one domain, built per `resolve` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionMap(HashMap<i64, String>);

impl ResolutionMap {
    #[must_use]
    pub fn get(&self, id: i64) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }
}

/// Per-domain resolution results of one `resolve` call.
#[derive(Debug, Clone, Default)]
pub struct Resolutions(HashMap<ForeignKeyDomain, ResolutionMap>);

impl Resolutions {
    #[must_use]
    pub fn domain(&self, domain: ForeignKeyDomain) -> Option<&ResolutionMap> {
        self.0.get(&domain)
    }

    /// Display text for a foreign key value of `domain`.
    #[must_use]
    pub fn display(&self, domain: ForeignKeyDomain, id: Option<i64>) -> String {
        match id.filter(|id| *id != 0) {
            None => domain.unassigned().to_string(),
            Some(id) => self
                .domain(domain)
                .and_then(|map| map.get(id))
                .map_or_else(|| domain.fallback(id), str::to_string),
        }
    }

    /// Pairs every record with its resolved names, in input order.
    pub fn enrich<R>(&self, records: &[R], domains: &[ForeignKeyDomain]) -> Vec<Enriched<R>>
    where
        R: ForeignKeys + Clone,
    {
        records
            .iter()
            .map(|record| Enriched {
                names: domains
                    .iter()
                    .map(|&domain| (domain, self.display(domain, record.foreign_key(domain))))
                    .collect(),
                record: record.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Enriched<R> {
    #[serde(flatten)]
    pub record: R,
    pub names: BTreeMap<ForeignKeyDomain, String>,
}

/// Distinct, non-zero ids of `domain` referenced by `records`.
pub fn extract_ids<R: ForeignKeys>(records: &[R], domain: ForeignKeyDomain) -> BTreeSet<i64> {
    records
        .iter()
        .filter_map(|record| record.foreign_key(domain))
        .filter(|id| *id != 0)
        .collect()
}

/// Resolves every requested domain concurrently.
pub async fn resolve<R, S>(source: &S, records: &[R], domains: &[ForeignKeyDomain]) -> Resolutions
where
    R: ForeignKeys,
    S: EntitySource + ?Sized,
{
    let domains: BTreeSet<ForeignKeyDomain> = domains.iter().copied().collect();
    let lookups = domains.into_iter().map(|domain| {
        let ids = extract_ids(records, domain);
        async move { (domain, resolve_domain(source, domain, ids).await) }
    });

    Resolutions(join_all(lookups).await.into_iter().collect())
}

async fn resolve_domain<S>(source: &S, domain: ForeignKeyDomain, ids: BTreeSet<i64>) -> ResolutionMap
where
    S: EntitySource + ?Sized,
{
    if ids.is_empty() {
        return ResolutionMap::default();
    }

    let outcomes = match domain.fetch_rule() {
        FetchRule::Bulk { .. } => lookup_bulk(source, domain, &ids).await,
        FetchRule::PerId { .. } => lookup_each(source, domain, &ids).await,
    };

    finalize(domain, ids, outcomes)
}

async fn lookup_bulk<S>(
    source: &S,
    domain: ForeignKeyDomain,
    ids: &BTreeSet<i64>,
) -> HashMap<i64, LookupOutcome>
where
    S: EntitySource + ?Sized,
{
    let mut outcomes = HashMap::with_capacity(ids.len());
    let mut offset = 0;

    for _ in 0..MAX_PAGES {
        let page = match timeout(LOOKUP_TIMEOUT, source.fetch_page(domain, offset, PAGE_SIZE)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                mark_unresolved(&mut outcomes, ids, &e.to_string());
                break;
            }
            Err(_) => {
                mark_unresolved(&mut outcomes, ids, "timed out");
                break;
            }
        };

        let fetched = page.items.len();
        for entity in &page.items {
            let Some(id) = ForeignKeyDomain::entity_id(entity).filter(|id| ids.contains(id)) else {
                continue;
            };
            let outcome = domain
                .display_name(entity)
                .map_or(LookupOutcome::NotFound, LookupOutcome::Found);
            outcomes.insert(id, outcome);
        }

        offset += fetched;
        if listing_exhausted(fetched, PAGE_SIZE, offset, page.total) || outcomes.len() == ids.len() {
            break;
        }
    }

    outcomes
}

fn mark_unresolved(outcomes: &mut HashMap<i64, LookupOutcome>, ids: &BTreeSet<i64>, cause: &str) {
    for id in ids {
        outcomes
            .entry(*id)
            .or_insert_with(|| LookupOutcome::Failed(cause.to_string()));
    }
}

async fn lookup_each<S>(
    source: &S,
    domain: ForeignKeyDomain,
    ids: &BTreeSet<i64>,
) -> HashMap<i64, LookupOutcome>
where
    S: EntitySource + ?Sized,
{
    let lookups = ids.iter().map(|&id| async move {
        let outcome = match timeout(LOOKUP_TIMEOUT, source.fetch_one(domain, id)).await {
            Ok(Ok(Some(entity))) => domain
                .display_name(&entity)
                .map_or(LookupOutcome::NotFound, LookupOutcome::Found),
            Ok(Ok(None)) => LookupOutcome::NotFound,
            Ok(Err(e)) => LookupOutcome::Failed(e.to_string()),
            Err(_) => LookupOutcome::Failed("timed out".to_string()),
        };
        (id, outcome)
    });

    join_all(lookups).await.into_iter().collect()
}

fn finalize(
    domain: ForeignKeyDomain,
    ids: BTreeSet<i64>,
    mut outcomes: HashMap<i64, LookupOutcome>,
) -> ResolutionMap {
    let names = ids
        .into_iter()
        .map(|id| {
            let name = match outcomes.remove(&id) {
                Some(LookupOutcome::Found(name)) => name,
                Some(LookupOutcome::Failed(cause)) => {
                    warn!(domain = domain.label(), id, %cause, "lookup failed, using fallback");
                    domain.fallback(id)
                }
                Some(LookupOutcome::NotFound) | None => {
                    debug!(domain = domain.label(), id, "no entity found, using fallback");
                    domain.fallback(id)
                }
            };
            (id, name)
        })
        .collect();

    ResolutionMap(names)
}
