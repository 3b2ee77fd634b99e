//! Change feed consumption
//!
//! Change ids are strictly increasing within one traversal of the feed. A
//! repeated or decreasing id is a server contract violation: it aborts the
//! traversal with [`DriveError::OutOfOrderChange`] and is never retried.

use crate::entry::{ChangeFeedPage, ChangeRecord};
use crate::error::{DriveError, ErrorKind, Result};
use crate::store::RemoteStore;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Check that `records` continue strictly after `previous`.
///
/// Returns the id of the last record, or `previous` for an empty slice.
pub(crate) fn ensure_increasing(previous: Option<i64>, records: &[ChangeRecord]) -> Result<Option<i64>> {
    let mut last = previous;
    for record in records {
        if let Some(prev) = last {
            if record.change_id <= prev {
                error!(
                    change_id = record.change_id,
                    previous = prev,
                    "Change feed out of order"
                );
                return Err(DriveError::OutOfOrderChange {
                    change_id: record.change_id,
                    previous: prev,
                });
            }
        }
        last = Some(record.change_id);
    }
    Ok(last)
}

/// Page-at-a-time cursor over the change feed.
///
/// Ordering is enforced across page boundaries as well as within a page, so
/// [`watermark`](Self::watermark) is always safe to persist after a page has
/// been processed.
pub struct ChangeLogReader<S: RemoteStore + ?Sized> {
    store: Arc<S>,
    start_change_id: Option<i64>,
    page_token: Option<String>,
    last_seen: Option<i64>,
    exhausted: bool,
}

impl<S: RemoteStore + ?Sized> ChangeLogReader<S> {
    /// Read from `start_change_id`, or from the beginning of the feed.
    pub fn new(store: Arc<S>, start_change_id: Option<i64>) -> Self {
        Self {
            store,
            start_change_id,
            page_token: None,
            last_seen: None,
            exhausted: false,
        }
    }

    /// The next page, or `None` once the feed has no more pages.
    #[instrument(skip(self), fields(page_token = ?self.page_token))]
    pub async fn next_page(&mut self) -> Result<Option<ChangeFeedPage>> {
        if self.exhausted {
            return Ok(None);
        }

        let start = match self.page_token {
            Some(_) => None,
            None => self.start_change_id,
        };

        let page = match self
            .store
            .list_changes(start, self.page_token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                if e.kind() == ErrorKind::ConsistencyViolation {
                    self.exhausted = true;
                }
                return Err(e);
            }
        };

        match ensure_increasing(self.last_seen, &page.records) {
            Ok(last) => self.last_seen = last,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        }

        self.page_token = page.next_page_token.clone();
        self.exhausted = self.page_token.is_none();

        debug!(
            records = page.records.len(),
            largest_change_id = page.largest_change_id,
            has_more = page.has_more(),
            "Change page consumed"
        );

        Ok(Some(page))
    }

    /// Highest change id handed out so far.
    pub fn watermark(&self) -> Option<i64> {
        self.last_seen
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Drain the remaining pages into one ordered list.
    pub async fn collect_all(&mut self) -> Result<Vec<ChangeRecord>> {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await? {
            records.extend(page.records);
        }
        Ok(records)
    }
}
