//! Limit/offset pagination shared by the listing services.

use configs::ListingConfig;
use serde::Serialize;

use crate::errors::ServiceError;

/// A validated window over an ordered result set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u64,
    pub offset: u64,
}

impl PageRequest {
    /// Apply defaults and bounds from config. `limit` must be in
    /// `1..=max_limit`; `offset` must not be negative.
    pub fn from_input(limit: Option<i64>, offset: Option<i64>, cfg: &ListingConfig) -> Result<Self, ServiceError> {
        let limit = match limit {
            None => cfg.default_limit,
            Some(l) if l >= 1 && (l as u64) <= cfg.max_limit => l as u64,
            Some(l) => {
                return Err(ServiceError::Validation(format!(
                    "limit must be between 1 and {} (got {l})",
                    cfg.max_limit
                )))
            }
        };
        let offset = match offset {
            None => 0,
            Some(o) if o >= 0 => o as u64,
            Some(o) => return Err(ServiceError::Validation(format!("offset must be >= 0 (got {o})"))),
        };
        Ok(Self { limit, offset })
    }
}

/// `ceil(total / limit)`, zero for an empty result.
pub fn page_count(total: u64, limit: u64) -> u64 {
    if limit == 0 { return 0; }
    total.div_ceil(limit)
}

/// One window of rows plus the size of the whole match set.
#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, req: PageRequest) -> Self {
        Self { items, total, pages: page_count(total, req.limit) }
    }
}
