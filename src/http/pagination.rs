//! Page-number pagination for list endpoints.
//!
//! Lists answer with `{count, next, previous, results}`. `next` and
//! `previous` are absolute links that keep the caller's other query
//! parameters; the link to the first page carries no `page` parameter.

use axum::http::{header, HeaderMap, Uri};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::http::response::ApiError;

const PAGE_PARAM: &str = "page";

/// Paginated list envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// `?page=` as sent by the client. Kept as text so bad values map to 404.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Resolved slice of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u32,
    pub last: u32,
    pub size: u32,
}

impl PageWindow {
    /// Validate the requested page against the collection size.
    pub fn resolve(query: &PageQuery, count: i64, size: u32) -> Result<Self, ApiError> {
        let size_i64 = i64::from(size.max(1));
        let last = u32::try_from(((count.max(0) + size_i64 - 1) / size_i64).max(1))
            .unwrap_or(u32::MAX);

        let number = match query.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some("last") => last,
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| ApiError::NotFound("Invalid page."))?,
        };
        if number == 0 || number > last {
            return Err(ApiError::NotFound("Invalid page."));
        }

        Ok(Self {
            number,
            last,
            size: size.max(1),
        })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn has_next(&self) -> bool {
        self.number < self.last
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

/// Builds absolute page links for the current request.
#[derive(Debug, Clone)]
pub struct PageLinks {
    current: Option<Url>,
}

impl PageLinks {
    /// `public_base_url` wins over the Host header when configured.
    pub fn from_request(uri: &Uri, headers: &HeaderMap, public_base_url: Option<&str>) -> Self {
        let origin = match public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => {
                let host = headers
                    .get(header::HOST)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("localhost");
                format!("http://{}", host)
            }
        };
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        let current = Url::parse(&format!("{}{}", origin, path_and_query)).ok();
        if current.is_none() {
            tracing::warn!(origin = %origin, "Cannot build page links for request");
        }
        Self { current }
    }

    /// Link to page `number`; page 1 drops the parameter.
    pub fn page(&self, number: u32) -> Option<String> {
        let mut url = self.current.clone()?;
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != PAGE_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        url.set_query(None);
        if !kept.is_empty() || number > 1 {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &kept {
                pairs.append_pair(key, value);
            }
            if number > 1 {
                pairs.append_pair(PAGE_PARAM, &number.to_string());
            }
        }
        Some(url.to_string())
    }

    /// Wrap a fetched slice into the list envelope.
    pub fn envelope<T>(&self, window: PageWindow, count: i64, results: Vec<T>) -> Page<T> {
        Page {
            count,
            next: window
                .has_next()
                .then(|| self.page(window.number + 1))
                .flatten(),
            previous: window
                .has_previous()
                .then(|| self.page(window.number - 1))
                .flatten(),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn query(page: &str) -> PageQuery {
        PageQuery {
            page: Some(page.to_string()),
        }
    }

    fn links(uri: &str) -> PageLinks {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.test:8000"));
        PageLinks::from_request(&uri.parse().unwrap(), &headers, None)
    }

    #[test]
    fn test_resolve_pages() {
        let first = PageWindow::resolve(&PageQuery::default(), 25, 10).unwrap();
        assert_eq!((first.number, first.last, first.offset()), (1, 3, 0));
        assert!(first.has_next());
        assert!(!first.has_previous());

        let last = PageWindow::resolve(&query("last"), 25, 10).unwrap();
        assert_eq!((last.number, last.offset()), (3, 20));
        assert!(!last.has_next());
    }

    #[test]
    fn test_empty_collection_has_one_page() {
        let window = PageWindow::resolve(&PageQuery::default(), 0, 10).unwrap();
        assert_eq!(window.last, 1);
        assert!(!window.has_next());
    }

    #[test]
    fn test_invalid_pages_are_not_found() {
        for bad in ["0", "4", "abc", "-1"] {
            let err = PageWindow::resolve(&query(bad), 25, 10).unwrap_err();
            assert!(matches!(err, ApiError::NotFound("Invalid page.")), "page {}", bad);
        }
    }

    #[test]
    fn test_links_keep_other_params() {
        let links = links("/classic-models/api/v1/classicmodels/products/?page=2&q=x");
        assert_eq!(
            links.page(3).as_deref(),
            Some("http://api.test:8000/classic-models/api/v1/classicmodels/products/?q=x&page=3")
        );
        assert_eq!(
            links.page(1).as_deref(),
            Some("http://api.test:8000/classic-models/api/v1/classicmodels/products/?q=x")
        );
    }

    #[test]
    fn test_envelope_links() {
        let links = links("/items/");
        let window = PageWindow::resolve(&query("2"), 30, 10).unwrap();
        let page = links.envelope(window, 30, vec![1, 2, 3]);

        assert_eq!(page.count, 30);
        assert_eq!(page.next.as_deref(), Some("http://api.test:8000/items/?page=3"));
        assert_eq!(page.previous.as_deref(), Some("http://api.test:8000/items/"));
    }

    #[test]
    fn test_public_base_url_overrides_host() {
        let links = PageLinks::from_request(
            &"/items/?page=1".parse().unwrap(),
            &HeaderMap::new(),
            Some("https://example.com/"),
        );
        assert_eq!(links.page(2).as_deref(), Some("https://example.com/items/?page=2"));
    }
}
