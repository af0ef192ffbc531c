//! Paginated relation listings

use crate::api::{FetchError, PAGE_LIMIT};
use crate::crawler::CrawlContext;
use std::future::Future;

/// A page shorter than this ends the listing
///
/// The API occasionally returns a few entries less than requested in the
/// middle of a listing, so only a clearly short page counts as the last one.
pub const SHORT_PAGE: usize = 190;

/// Fetches pages from offset 0 in steps of [`PAGE_LIMIT`] and concatenates them
///
/// Stops after the first page holding fewer than [`SHORT_PAGE`] entries. A
/// failing page ends the listing with what was collected so far; transient
/// failures also wait out the shared backoff first.
///
/// # Arguments
///
/// * `ctx` - Crawl context providing the backoff and shutdown token
/// * `resource` - Label for log lines, e.g. `comments of track 7`
/// * `fetch_page` - Fetches the page at the given offset
pub async fn collect_pages<T, F, Fut>(
    ctx: &CrawlContext,
    resource: &str,
    mut fetch_page: F,
) -> Vec<T>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<Vec<T>, FetchError>>,
{
    let mut entries = Vec::new();
    let mut offset = 0;

    loop {
        match fetch_page(offset).await {
            Ok(page) => {
                let len = page.len();
                entries.extend(page);
                if len < SHORT_PAGE {
                    break;
                }
                offset += PAGE_LIMIT;
            }
            Err(e) => {
                tracing::debug!("Stopping {} at offset {}: {}", resource, offset, e);
                if e.is_transient() {
                    ctx.back_off().await;
                }
                break;
            }
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::testing::test_context;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    async fn run(pages: Vec<Result<usize, ()>>) -> (Vec<u64>, Vec<u64>) {
        let ctx = test_context();
        let offsets = Mutex::new(Vec::new());
        let calls = AtomicUsize::new(0);

        let entries = collect_pages(&ctx, "test listing", |offset| {
            offsets.lock().unwrap().push(offset);
            let page = pages[calls.fetch_add(1, Ordering::SeqCst)];
            async move {
                match page {
                    Ok(len) => Ok((0..len as u64).map(|i| offset + i).collect()),
                    Err(()) => Err(FetchError::Transient {
                        resource: "test".to_string(),
                        message: "HTTP 503".to_string(),
                    }),
                }
            }
        })
        .await;

        (entries, offsets.into_inner().unwrap())
    }

    #[tokio::test]
    async fn test_short_page_ends_listing() {
        let (entries, offsets) = run(vec![Ok(200), Ok(200), Ok(150)]).await;
        assert_eq!(entries.len(), 550);
        assert_eq!(offsets, vec![0, 200, 400]);
    }

    #[tokio::test]
    async fn test_slightly_short_page_continues() {
        let (entries, offsets) = run(vec![Ok(200), Ok(195), Ok(0)]).await;
        assert_eq!(entries.len(), 395);
        assert_eq!(offsets, vec![0, 200, 400]);
    }

    #[tokio::test]
    async fn test_single_short_page() {
        let (entries, offsets) = run(vec![Ok(12)]).await;
        assert_eq!(entries.len(), 12);
        assert_eq!(offsets, vec![0]);
    }

    #[tokio::test]
    async fn test_transient_error_keeps_collected_entries() {
        let (entries, offsets) = run(vec![Ok(200), Err(())]).await;
        assert_eq!(entries.len(), 200);
        assert_eq!(offsets, vec![0, 200]);
    }
}
