//! Paging types: server feed pages, single-item responses, and page requests.

use serde::{Deserialize, Serialize};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// One page of a server-side query feed.
///
/// A feed is read page by page by passing the previous page's `continuation` back
/// to the service. An absent or empty continuation marks the end of the feed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FeedPage<T> {
    /// The items in this page, in service order.
    pub items: Vec<T>,
    /// Opaque cursor for the next page.
    pub continuation: Option<String>,
}

impl<T> FeedPage<T> {
    pub fn new(items: Vec<T>, continuation: Option<String>) -> Self {
        Self { items, continuation }
    }

    /// The final page of a feed.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, continuation: None }
    }

    /// Whether another page can be requested after this one.
    pub fn has_more_results(&self) -> bool {
        self.continuation
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }

    /// Converts every item, failing on the first error.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<FeedPage<U>, E> {
        Ok(FeedPage {
            items: self.items
                .into_iter()
                .map(f)
                .collect::<Result<Vec<_>, _>>()?,
            continuation: self.continuation,
        })
    }
}

impl<T> Default for FeedPage<T> {
    fn default() -> Self {
        Self { items: Vec::new(), continuation: None }
    }
}

/// A single item returned from a point operation, with its concurrency tag.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ItemResponse<T> {
    pub resource: T,
    /// Version tag usable in [`RequestOptions::if_match`](crate::options::RequestOptions::if_match).
    pub etag: Option<String>,
}

impl<T> ItemResponse<T> {
    pub fn new(resource: T, etag: Option<String>) -> Self {
        Self { resource, etag }
    }

    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<ItemResponse<U>, E> {
        Ok(ItemResponse { resource: f(self.resource)?, etag: self.etag })
    }
}

/// A validated request for one page of a listing.
///
/// Pages are 1-indexed.
///
/// ```ignore
/// let request = PageRequest::new(3, 20)?;
/// assert_eq!(request.offset(), 40);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    /// Creates a page request.
    ///
    /// Accepts signed input so that callers can forward untrusted values unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Validation`] if `page` or `page_size` is not positive.
    pub fn new(page: i64, page_size: i64) -> DocumentStoreResult<Self> {
        if page <= 0 {
            return Err(DocumentStoreError::Validation(format!(
                "page must be at least 1, got {page}"
            )));
        }
        if page_size <= 0 {
            return Err(DocumentStoreError::Validation(format!(
                "page size must be at least 1, got {page_size}"
            )));
        }

        Ok(Self { page: page as usize, page_size: page_size as usize })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of items that precede this page.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Whether this page starts past the end of a data set of `total` items.
    ///
    /// A page starting exactly at `total` is still in range, so page 1 of an empty
    /// data set is valid.
    pub fn starts_beyond(&self, total: u64) -> bool {
        total < self.offset() as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, page_size: 10 }
    }
}
