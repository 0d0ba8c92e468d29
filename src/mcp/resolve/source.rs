//! Where the resolver gets secondary entities from.

use async_trait::async_trait;
use serde_json::Value;

use super::domain::{FetchRule, ForeignKeyDomain};
use crate::mcp::{
    error::PlandayError,
    http::{ApiRequest, PlandayClient},
    models::{Paged, Single},
};

/// One page of a bulk listing.
#[derive(Debug, Clone, Default)]
pub struct EntityPage {
    pub items: Vec<Value>,
    pub total: Option<usize>,
}

#[async_trait]
pub trait EntitySource: Send + Sync {
    /// A page of a bulk-fetched domain.
    async fn fetch_page(
        &self,
        domain: ForeignKeyDomain,
        offset: usize,
        limit: usize,
    ) -> Result<EntityPage, PlandayError>;

    /// A single entity of a per-id domain; `Ok(None)` when it does not exist.
    async fn fetch_one(
        &self,
        domain: ForeignKeyDomain,
        id: i64,
    ) -> Result<Option<Value>, PlandayError>;
}

#[async_trait]
impl EntitySource for PlandayClient {
    async fn fetch_page(
        &self,
        domain: ForeignKeyDomain,
        offset: usize,
        limit: usize,
    ) -> Result<EntityPage, PlandayError> {
        let FetchRule::Bulk { path } = domain.fetch_rule() else {
            return Err(PlandayError::InvalidParams(format!(
                "{} cannot be listed in bulk",
                domain.label()
            )));
        };

        let request = ApiRequest::get(path)
            .query("limit", limit)
            .query("offset", offset);
        let page: Paged<Value> = serde_json::from_value(self.call(&request).await?)?;

        Ok(EntityPage {
            total: page.paging.and_then(|paging| paging.total),
            items: page.data,
        })
    }

    async fn fetch_one(
        &self,
        domain: ForeignKeyDomain,
        id: i64,
    ) -> Result<Option<Value>, PlandayError> {
        let FetchRule::PerId { prefix } = domain.fetch_rule() else {
            return Err(PlandayError::InvalidParams(format!(
                "{} cannot be fetched by id",
                domain.label()
            )));
        };

        match self.call(&ApiRequest::get(format!("{prefix}/{id}"))).await {
            Ok(json) => Ok(serde_json::from_value::<Single<Value>>(json)?.data),
            Err(PlandayError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
