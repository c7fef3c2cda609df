//! Translation of listing query parameters into a product filter.
//!
//! Resolution is lenient: a malformed value disables its own predicate and is
//! reported as an outcome, it never fails the request.

use crate::models::product::Product;
use serde::Serialize;
use utoipa::ToSchema;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Inclusive price bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    /// Parses `<min>-<max>`. Both bounds must be non-negative and ordered.
    pub fn parse(raw: &str) -> Option<Self> {
        let (min, max) = raw.trim().split_once('-')?;
        let min = parse_bound(min)?;
        let max = parse_bound(max)?;
        (min <= max).then_some(PriceRange { min, max })
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

fn parse_bound(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Conjunction of optional predicates over stored products.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    /// Lowercased needle matched against name and description.
    pub search: Option<String>,
    pub price: Option<PriceRange>,
    pub active: Option<bool>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(needle) = &self.search {
            let in_name = product.name.to_lowercase().contains(needle);
            let in_description = product.description.to_lowercase().contains(needle);
            if !in_name && !in_description {
                return false;
            }
        }
        if let Some(range) = &self.price {
            if !range.contains(product.price) {
                return false;
            }
        }
        if let Some(active) = self.active {
            if product.active != active {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub offset: usize,
}

impl Pagination {
    fn new(page: usize, limit: usize) -> Self {
        Pagination {
            page,
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }
}

/// What happened to a single query parameter during resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamOutcome {
    Applied(String),
    IgnoredMalformed { key: String, value: String },
    Unrecognized(String),
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedQuery {
    pub filter: ProductFilter,
    pub pagination: Option<Pagination>,
    pub outcomes: Vec<ParamOutcome>,
}

impl ResolvedQuery {
    pub fn ignored(&self) -> impl Iterator<Item = &ParamOutcome> {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o, ParamOutcome::Applied(_)))
    }
}

/// Resolves raw query pairs. Repeated keys resolve to their last value.
pub fn resolve(pairs: &[(String, String)]) -> ResolvedQuery {
    let mut resolved = ResolvedQuery::default();
    let mut page: Option<usize> = None;
    let mut limit: Option<usize> = None;

    for (key, value) in pairs {
        let applied = match key.as_str() {
            "search" => {
                let needle = value.trim();
                if needle.is_empty() {
                    resolved.filter.search = None;
                    false
                } else {
                    resolved.filter.search = Some(needle.to_lowercase());
                    true
                }
            }
            "price" => {
                resolved.filter.price = PriceRange::parse(value);
                resolved.filter.price.is_some()
            }
            "active" => {
                resolved.filter.active = parse_flag(value);
                resolved.filter.active.is_some()
            }
            "page" => {
                page = parse_positive(value);
                page.is_some()
            }
            "limit" => {
                limit = parse_positive(value).map(|l| l.min(MAX_PAGE_SIZE));
                limit.is_some()
            }
            _ => {
                resolved.outcomes.push(ParamOutcome::Unrecognized(key.clone()));
                continue;
            }
        };

        resolved.outcomes.push(if applied {
            ParamOutcome::Applied(key.clone())
        } else {
            ParamOutcome::IgnoredMalformed {
                key: key.clone(),
                value: value.clone(),
            }
        });
    }

    if page.is_some() || limit.is_some() {
        resolved.pagination = Some(Pagination::new(
            page.unwrap_or(1),
            limit.unwrap_or(DEFAULT_PAGE_SIZE),
        ));
    }

    resolved
}

fn parse_flag(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_positive(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|n| *n > 0)
}
