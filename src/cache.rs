use std::time::Duration;

use actix_web::http::header::{self, ContentType};
use actix_web::{HttpRequest, HttpResponse};
use moka::sync::Cache;
use sha256::digest;

use crate::app::AppError;

#[derive(Clone)]
pub struct CachedPage {
    pub body: String,
    pub etag: String,
}

impl CachedPage {
    pub fn new(body: String) -> CachedPage {
        let etag = format!("\"{}\"", digest(body.as_str()));
        CachedPage { body, etag }
    }
}

/// Whole-response memoization keyed by route, with a fixed time-to-live.
/// The cache itself is an off-the-shelf timeout cache; no eviction policy
/// of our own.
#[derive(Clone)]
pub struct PageCache {
    pages: Cache<String, CachedPage>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> PageCache {
        PageCache {
            pages: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// Returns the memoized page for `route`, rendering it on a miss.
    pub fn fetch<F>(&self, route: &str, render: F) -> Result<CachedPage, AppError>
    where
        F: FnOnce() -> Result<String, AppError>,
    {
        if let Some(page) = self.pages.get(route) {
            return Ok(page);
        }
        let page = CachedPage::new(render()?);
        self.pages.insert(route.to_string(), page.clone());
        Ok(page)
    }

    pub fn clear(&self) {
        self.pages.invalidate_all();
    }
}

/// Answers a conditional request: 304 when the client already holds the
/// current representation, 200 with an `ETag` otherwise.
pub fn respond(req: &HttpRequest, page: CachedPage) -> HttpResponse {
    let revalidated = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |value| value == page.etag);

    if revalidated {
        return HttpResponse::NotModified()
            .insert_header((header::ETAG, page.etag))
            .finish();
    }

    HttpResponse::Ok()
        .content_type(ContentType::html())
        .insert_header((header::ETAG, page.etag))
        .body(page.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fetch_memoizes_rendered_pages() {
        let cache = PageCache::new(Duration::from_secs(60));
        let mut renders = 0;

        let first = cache
            .fetch("/about", || {
                renders += 1;
                Ok("hello".to_string())
            })
            .unwrap();
        let second = cache
            .fetch("/about", || {
                renders += 1;
                Ok("changed".to_string())
            })
            .unwrap();

        assert_eq!(renders, 1);
        assert_eq!(first.body, second.body);
        assert_eq!(first.etag, second.etag);
    }

    #[test]
    fn clear_drops_cached_pages() {
        let cache = PageCache::new(Duration::from_secs(60));
        let mut renders = 0;
        let mut render = || {
            renders += 1;
            Ok(format!("render {}", renders))
        };

        cache.fetch("/", &mut render).unwrap();
        cache.clear();
        let page = cache.fetch("/", &mut render).unwrap();

        assert_eq!(renders, 2);
        assert_eq!(page.body, "render 2");
    }

    #[test]
    fn etag_is_a_quoted_body_hash() {
        let page = CachedPage::new("hello".to_string());
        assert_eq!(page.etag, format!("\"{}\"", digest("hello")));
        assert_eq!(CachedPage::new("hello".to_string()).etag, page.etag);
    }
}
