//! Offset pagination over skip/limit listings.
//!
//! [`Paginator`] turns a paged listing into a lazy, forward-only sequence of
//! items. The fetch function is called with `(skip, limit)` and returns one
//! [`Collection`]; the next offset is derived from what the server actually
//! returned (`page.skip + page.items.len()`), so a server that serves smaller
//! pages than requested is still walked completely. An empty page is the only
//! end-of-listing signal. `total` is ignored.
//!
//! ```ignore
//! let mut assets = Paginator::new(|skip, limit| client.get_assets("space", "master", skip, limit))
//!     .with_page_size(100);
//! while let Some(asset) = assets.next().await? {
//!     // ...
//! }
//! ```

use anyhow::Result;
use std::collections::VecDeque;
use std::future::Future;

use asset_repair_types::Collection;

/// A lazy sequence over a skip/limit listing.
///
/// A fetch error is returned to the caller and ends the sequence.
pub struct Paginator<T, F, Fut>
where
    F: FnMut(usize, Option<usize>) -> Fut,
    Fut: Future<Output = Result<Collection<T>>>,
{
    fetch_fn: F,
    skip: usize,
    page_size: Option<usize>,
    buffered: VecDeque<T>,
    pages_fetched: usize,
    exhausted: bool,
}

impl<T, F, Fut> Paginator<T, F, Fut>
where
    F: FnMut(usize, Option<usize>) -> Fut,
    Fut: Future<Output = Result<Collection<T>>>,
{
    /// Start at offset 0 with the server's default page size.
    pub fn new(fetch_fn: F) -> Self {
        Self {
            fetch_fn,
            skip: 0,
            page_size: None,
            buffered: VecDeque::new(),
            pages_fetched: 0,
            exhausted: false,
        }
    }

    /// Request pages of `size` items. `None` leaves it to the server.
    pub fn with_page_size(mut self, size: impl Into<Option<usize>>) -> Self {
        self.page_size = size.into();
        self
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page, bypassing the item buffer.
    async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = match (self.fetch_fn)(self.skip, self.page_size).await {
            Ok(page) => page,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };
        self.pages_fetched += 1;

        if page.items.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        self.skip = page.skip + page.items.len();
        Ok(Some(page.items))
    }

    /// Next item, fetching another page when the current one is used up.
    pub async fn next(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Ok(Some(item));
            }
            match self.next_page().await? {
                Some(items) => self.buffered.extend(items),
                None => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use futures::future::{ready, Ready};
    use std::cell::Cell;

    async fn drain<T, F, Fut>(mut pages: Paginator<T, F, Fut>) -> Vec<T>
    where
        F: FnMut(usize, Option<usize>) -> Fut,
        Fut: Future<Output = Result<Collection<T>>>,
    {
        let mut all = Vec::new();
        while let Some(item) = pages.next().await.unwrap() {
            all.push(item);
        }
        all
    }

    /// Serves `data` with pages capped at `cap`, whatever limit is asked for.
    fn capped_source(
        data: &[u32],
        cap: usize,
    ) -> impl FnMut(usize, Option<usize>) -> Ready<Result<Collection<u32>>> + '_ {
        move |skip, limit| {
            let limit = limit.unwrap_or(cap).min(cap);
            let start = skip.min(data.len());
            let end = (start + limit).min(data.len());
            ready(Ok(
                Collection::new(skip, limit, data[start..end].to_vec()).with_total(data.len())
            ))
        }
    }

    #[tokio::test]
    async fn test_yields_every_item_in_order() {
        let data: Vec<u32> = (0..201).collect();
        let mut pages = Paginator::new(capped_source(&data, 50));

        let mut seen = Vec::new();
        while let Some(v) = pages.next().await.unwrap() {
            seen.push(v);
        }

        assert_eq!(seen, data);
        // 4 full pages, 1 partial, 1 empty terminator
        assert_eq!(pages.pages_fetched(), 6);
    }

    #[tokio::test]
    async fn test_advances_by_returned_items_not_requested_limit() {
        let data: Vec<u32> = (0..30).collect();
        let requested = Cell::new(Vec::new());
        let mut source = capped_source(&data, 7);
        let pages = Paginator::new(|skip, limit| {
            let mut log = requested.take();
            log.push(skip);
            requested.set(log);
            source(skip, limit)
        })
        .with_page_size(10);

        let all = drain(pages).await;
        assert_eq!(all, data);
        assert_eq!(requested.take(), vec![0, 7, 14, 21, 28, 30]);
    }

    #[tokio::test]
    async fn test_total_does_not_end_listing() {
        // total claims 0 but items keep coming
        let data: Vec<u32> = (0..5).collect();
        let pages = Paginator::new(|skip: usize, _limit| {
            let items: Vec<u32> = data.iter().copied().skip(skip).take(2).collect();
            ready(Ok(Collection::new(skip, 2, items).with_total(0)))
        });
        assert_eq!(drain(pages).await, data);
    }

    #[tokio::test]
    async fn test_fetch_error_ends_sequence() {
        let calls = Cell::new(0usize);
        let mut pages = Paginator::new(|skip, _limit| {
            calls.set(calls.get() + 1);
            if skip == 0 {
                ready(Ok(Collection::new(0, 2, vec![1u32, 2])))
            } else {
                ready(Err(anyhow!("listing unavailable")))
            }
        });

        assert_eq!(pages.next().await.unwrap(), Some(1));
        assert_eq!(pages.next().await.unwrap(), Some(2));
        let err = pages.next().await.unwrap_err();
        assert!(err.to_string().contains("listing unavailable"));
        assert_eq!(pages.next().await.unwrap(), None);
        assert_eq!(calls.get(), 2);
    }
}
