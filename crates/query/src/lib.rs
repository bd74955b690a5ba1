//! Endpoint construction for the risk-analysis backend.
//!
//! Converts typed request objects into an `Endpoint`: the path as raw
//! segments plus the query parameters that are actually set. Encoding is
//! left to the HTTP layer, which owns the base URL:
//! - path keys (lot id, category code, BIN) stay single segments
//! - absent optional parameters never reach the query string
//!
//! Requests the backend would reject outright are caught here with a
//! `QueryError` before any network call.

use std::fmt;

use goszakup_model::{
    AnalyzeTextRequest, CategoryPricingQuery, CompareRequest, DirectoryQuery, ExportFilters,
    FeedbackRequest, GetLotsRequest, NetworkGraphQuery, TimelineQuery,
};
use thiserror::Error;

/// Largest page the lots listing accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Bounds on the number of lots in one comparison.
pub const MIN_COMPARE_LOTS: usize = 2;
pub const MAX_COMPARE_LOTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Text cannot be empty")]
    EmptyText,
    #[error("Empty {0}")]
    EmptyKey(&'static str),
    #[error("Page size must be between 1 and {max}, got {0}", max = MAX_PAGE_SIZE)]
    InvalidPageSize(u32),
    #[error("Compare needs {min} to {max} lots, got {0}", min = MIN_COMPARE_LOTS, max = MAX_COMPARE_LOTS)]
    CompareCount(usize),
    #[error("Lot {0} listed twice")]
    DuplicateLot(String),
}

/// Types that contribute query-string parameters.
pub trait QueryParams {
    /// Parameters in emission order. Unset fields are omitted.
    fn query_pairs(&self) -> Vec<(&'static str, String)>;
}

/// A backend path plus its query parameters, not yet encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    segments: Vec<String>,
    query: Vec<(&'static str, String)>,
}

impl Endpoint {
    /// Start from a static path such as `/api/lots`.
    pub fn new(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            query: Vec::new(),
        }
    }

    /// Append one path segment. The segment is encoded as a unit, so a key
    /// containing `/` or `?` cannot escape it.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn with_query<Q: QueryParams + ?Sized>(mut self, params: &Q) -> Self {
        self.query.extend(params.query_pairs());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn query(&self) -> &[(&'static str, String)] {
        &self.query
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        for (i, (key, value)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}

fn push<T: ToString>(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<T>) {
    if let Some(value) = value {
        pairs.push((key, value.to_string()));
    }
}

/// Empty strings count as unset, matching how the listing pages build filters.
fn push_text(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        pairs.push((key, value.to_string()));
    }
}

impl QueryParams for GetLotsRequest {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "page", self.page);
        push(&mut pairs, "size", self.size);
        push(&mut pairs, "risk_level", self.risk_level.map(|l| l.as_str()));
        push_text(&mut pairs, "search", self.search.as_deref());
        push(&mut pairs, "sort_by", self.sort_by.map(|s| s.as_str()));
        push(&mut pairs, "sort_desc", self.sort_desc);
        pairs
    }
}

impl QueryParams for CategoryPricingQuery {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_text(&mut pairs, "sort_by", self.sort_by.as_deref());
        // A zero minimum filters nothing and is left out.
        push(&mut pairs, "min_count", self.min_count.filter(|&n| n > 0));
        pairs
    }
}

impl QueryParams for DirectoryQuery {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        push_text(&mut pairs, "sort_by", self.sort_by.as_deref());
        push(&mut pairs, "sort_desc", self.sort_desc);
        push_text(&mut pairs, "search", self.search.as_deref());
        pairs
    }
}

impl QueryParams for NetworkGraphQuery {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "min_connections", self.min_connections);
        push(&mut pairs, "max_nodes", self.max_nodes);
        pairs
    }
}

impl QueryParams for TimelineQuery {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "period", self.period.map(|p| p.as_str()));
        push(&mut pairs, "limit", self.limit);
        pairs
    }
}

impl QueryParams for ExportFilters {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "risk_level", self.risk_level.map(|l| l.as_str()));
        push(&mut pairs, "exclude_synthetic", self.exclude_synthetic);
        push_text(&mut pairs, "category_code", self.category_code.as_deref());
        push(&mut pairs, "min_budget", self.min_budget);
        push(&mut pairs, "max_budget", self.max_budget);
        pairs
    }
}

fn require_key(kind: &'static str, key: &str) -> Result<(), QueryError> {
    if key.trim().is_empty() {
        Err(QueryError::EmptyKey(kind))
    } else {
        Ok(())
    }
}

pub fn health() -> Endpoint {
    Endpoint::new("/api/health")
}

pub fn dashboard_stats() -> Endpoint {
    Endpoint::new("/api/stats/dashboard")
}

pub fn lots(request: &GetLotsRequest) -> Result<Endpoint, QueryError> {
    if let Some(size) = request.size {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(QueryError::InvalidPageSize(size));
        }
    }
    Ok(Endpoint::new("/api/lots").with_query(request))
}

pub fn lot_analysis(lot_id: &str) -> Result<Endpoint, QueryError> {
    require_key("lot id", lot_id)?;
    Ok(Endpoint::new("/api/lots").segment(lot_id).segment("analysis"))
}

pub fn analyze(request: &AnalyzeTextRequest) -> Result<Endpoint, QueryError> {
    if request.text.trim().is_empty() {
        return Err(QueryError::EmptyText);
    }
    Ok(Endpoint::new("/api/analyze"))
}

pub fn feedback(request: &FeedbackRequest) -> Result<Endpoint, QueryError> {
    require_key("lot id", &request.lot_id)?;
    Ok(Endpoint::new("/api/feedback"))
}

pub fn category_pricing(query: &CategoryPricingQuery) -> Endpoint {
    Endpoint::new("/api/stats/category-pricing").with_query(query)
}

pub fn category_pricing_detail(category_code: &str) -> Result<Endpoint, QueryError> {
    require_key("category code", category_code)?;
    Ok(Endpoint::new("/api/categories")
        .segment(category_code)
        .segment("pricing"))
}

pub fn categories(query: &DirectoryQuery) -> Result<Endpoint, QueryError> {
    if query.size == 0 || query.size > MAX_PAGE_SIZE {
        return Err(QueryError::InvalidPageSize(query.size));
    }
    Ok(Endpoint::new("/api/categories-list").with_query(query))
}

pub fn category(category_code: &str) -> Result<Endpoint, QueryError> {
    require_key("category code", category_code)?;
    Ok(Endpoint::new("/api/categories").segment(category_code))
}

pub fn customers(query: &DirectoryQuery) -> Result<Endpoint, QueryError> {
    if query.size == 0 || query.size > MAX_PAGE_SIZE {
        return Err(QueryError::InvalidPageSize(query.size));
    }
    Ok(Endpoint::new("/api/customers").with_query(query))
}

pub fn customer(bin: &str) -> Result<Endpoint, QueryError> {
    require_key("customer BIN", bin)?;
    Ok(Endpoint::new("/api/customers").segment(bin))
}

pub fn network_graph(query: &NetworkGraphQuery) -> Endpoint {
    Endpoint::new("/api/network/graph").with_query(query)
}

pub fn network_node(bin: &str) -> Result<Endpoint, QueryError> {
    require_key("BIN", bin)?;
    Ok(Endpoint::new("/api/network").segment(bin))
}

pub fn timeline(query: &TimelineQuery) -> Endpoint {
    Endpoint::new("/api/stats/timeline").with_query(query)
}

pub fn compare(request: &CompareRequest) -> Result<Endpoint, QueryError> {
    let count = request.lot_ids.len();
    if !(MIN_COMPARE_LOTS..=MAX_COMPARE_LOTS).contains(&count) {
        return Err(QueryError::CompareCount(count));
    }
    for (i, id) in request.lot_ids.iter().enumerate() {
        require_key("lot id", id)?;
        if request.lot_ids[..i].contains(id) {
            return Err(QueryError::DuplicateLot(id.clone()));
        }
    }
    Ok(Endpoint::new("/api/compare"))
}

pub fn export_csv(filters: &ExportFilters) -> Endpoint {
    Endpoint::new("/api/export/csv").with_query(filters)
}

pub fn export_lot_pdf(lot_id: &str) -> Result<Endpoint, QueryError> {
    require_key("lot id", lot_id)?;
    Ok(Endpoint::new("/api/lots")
        .segment(lot_id)
        .segment("export")
        .segment("pdf"))
}
