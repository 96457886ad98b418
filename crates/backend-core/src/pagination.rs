//! Pagination utilities shared by every listing operation.
//!
//! A listing regenerates its full result set on each call and hands it to [`paginate`]
//! together with the caller's page size and continuation token. Items are ordered by a
//! unique attribute; the token remembers that attribute of the first item of the next page,
//! so a resumed listing continues from the first item at or after it even if the store
//! changed in between.
//!
//! Tokens are hex-encoded JSON and carry a checksum of the filter parameters that produced
//! them. A token presented with different filters is refused.

use crate::error::{ErrorKind, ProviderError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Page size limits for one listing operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLimits {
    /// Page size when the caller does not ask for one.
    pub default: usize,
    /// Upper bound on a requested page size.
    pub max: usize,
}

impl PageLimits {
    pub const fn new(default: usize, max: usize) -> Self {
        Self { default, max }
    }

    /// Clamp a requested page size into `1..=max`.
    pub fn normalize(self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default).clamp(1, self.max.max(1))
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::new(100, 1000)
    }
}

/// The caller's half of a paginated call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub max_results: Option<usize>,
    pub next_token: Option<String>,
}

impl PageRequest {
    pub fn new(max_results: Option<usize>, next_token: Option<String>) -> Self {
        Self {
            max_results,
            next_token,
        }
    }

    /// First page of at most `max_results` items.
    pub fn first(max_results: usize) -> Self {
        Self::new(Some(max_results), None)
    }

    /// The request for the page after `page`, or `None` when the listing is exhausted.
    pub fn next<T>(&self, page: &Page<T>) -> Option<Self> {
        page.next_token
            .as_ref()
            .map(|token| Self::new(self.max_results, Some(token.clone())))
    }
}

/// One slice of a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_token: self.next_token,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Input inconsistent with page token: {0}")]
    InconsistentParameters(String),
}

impl ProviderError for PaginationError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::ValidationError
    }

    fn code(&self) -> &'static str {
        match self {
            PaginationError::InvalidToken => "InvalidToken",
            PaginationError::InconsistentParameters(_) => "InvalidParameterException",
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageToken {
    parameter_checksum: String,
    unique_attribute: String,
}

/// Stable checksum of the filter parameters of a listing call.
pub fn parameter_checksum<P: Serialize + ?Sized>(params: &P) -> String {
    let encoded = serde_json::to_vec(params).unwrap_or_default();
    let digest = Sha256::digest(&encoded);
    hex::encode(&digest[..8])
}

fn encode_token(checksum: &str, unique_attribute: String) -> String {
    let token = PageToken {
        parameter_checksum: checksum.to_string(),
        unique_attribute,
    };
    hex::encode(serde_json::to_vec(&token).unwrap_or_default())
}

fn decode_token(token: &str) -> Result<PageToken, PaginationError> {
    let raw = hex::decode(token).map_err(|_| PaginationError::InvalidToken)?;
    serde_json::from_slice(&raw).map_err(|_| PaginationError::InvalidToken)
}

/// Slice `items` into the page selected by `request`.
///
/// `unique_key` must yield a distinct value per item; items are stably sorted on it.
/// `params` are the filter parameters of the call, used to bind tokens to them.
pub fn paginate<T, P, F>(
    mut items: Vec<T>,
    request: &PageRequest,
    limits: PageLimits,
    params: &P,
    unique_key: F,
) -> Result<Page<T>, PaginationError>
where
    P: Serialize + ?Sized,
    F: Fn(&T) -> String,
{
    let checksum = parameter_checksum(params);
    items.sort_by_cached_key(|item| unique_key(item));

    let start = match request.next_token.as_deref() {
        None => 0,
        Some(token) => {
            let token = decode_token(token)?;
            if token.parameter_checksum != checksum {
                return Err(PaginationError::InconsistentParameters(
                    "filter parameters changed".to_string(),
                ));
            }
            items.partition_point(|item| unique_key(item) < token.unique_attribute)
        }
    };

    let page_size = limits.normalize(request.max_results);
    let mut rest = items.split_off(start.min(items.len()));
    let remainder = if rest.len() > page_size {
        rest.split_off(page_size)
    } else {
        Vec::new()
    };
    let next_token = remainder
        .first()
        .map(|next| encode_token(&checksum, unique_key(next)));

    Ok(Page {
        items: rest,
        next_token,
    })
}

/// Runs [`paginate`] repeatedly and concatenates every page.
pub fn collect_all<T, P, F>(
    items: Vec<T>,
    page_size: usize,
    params: &P,
    unique_key: F,
) -> Result<Vec<T>, PaginationError>
where
    T: Clone,
    P: Serialize + ?Sized,
    F: Fn(&T) -> String,
{
    let limits = PageLimits::new(page_size, page_size);
    let mut request = PageRequest::first(page_size);
    let mut out = Vec::new();
    loop {
        let page = paginate(items.clone(), &request, limits, params, &unique_key)?;
        let next = request.next(&page);
        out.extend(page.items);
        match next {
            Some(next) => request = next,
            None => return Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("item-{i:03}")).collect()
    }

    #[test]
    fn single_page_has_no_token() {
        let page = paginate(names(3), &PageRequest::default(), PageLimits::default(), &(), |s| {
            s.clone()
        })
        .unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn token_resumes_after_slice() {
        let limits = PageLimits::new(2, 10);
        let first = paginate(names(5), &PageRequest::default(), limits, &"f", |s| s.clone()).unwrap();
        assert_eq!(first.items, vec!["item-000", "item-001"]);
        let request = PageRequest::default().next(&first).unwrap();
        let second = paginate(names(5), &request, limits, &"f", |s| s.clone()).unwrap();
        assert_eq!(second.items, vec!["item-002", "item-003"]);
    }

    #[test]
    fn resumes_at_next_key_when_item_removed() {
        let limits = PageLimits::new(2, 10);
        let first = paginate(names(5), &PageRequest::default(), limits, &(), |s| s.clone()).unwrap();
        let mut shrunk = names(5);
        shrunk.retain(|s| s != "item-002");
        let request = PageRequest::default().next(&first).unwrap();
        let second = paginate(shrunk, &request, limits, &(), |s| s.clone()).unwrap();
        assert_eq!(second.items, vec!["item-003", "item-004"]);
        assert!(second.next_token.is_none());
    }

    #[test]
    fn exhausted_token_gives_empty_page() {
        let limits = PageLimits::new(2, 10);
        let first = paginate(names(3), &PageRequest::default(), limits, &(), |s| s.clone()).unwrap();
        let request = PageRequest::default().next(&first).unwrap();
        let page = paginate(names(1), &request, limits, &(), |s| s.clone()).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_token.is_none());
    }

    #[test]
    fn token_bound_to_parameters() {
        let limits = PageLimits::new(1, 10);
        let first = paginate(names(3), &PageRequest::default(), limits, &["a"], |s| s.clone()).unwrap();
        let request = PageRequest::default().next(&first).unwrap();
        let err = paginate(names(3), &request, limits, &["b"], |s| s.clone()).unwrap_err();
        assert!(matches!(err, PaginationError::InconsistentParameters(_)));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let request = PageRequest::new(None, Some("not-hex!".into()));
        let err = paginate(names(3), &request, PageLimits::default(), &(), |s| s.clone()).unwrap_err();
        assert_eq!(err, PaginationError::InvalidToken);
    }

    #[test]
    fn normalize_clamps() {
        let limits = PageLimits::new(20, 100);
        assert_eq!(limits.normalize(None), 20);
        assert_eq!(limits.normalize(Some(0)), 1);
        assert_eq!(limits.normalize(Some(1000)), 100);
    }
}
