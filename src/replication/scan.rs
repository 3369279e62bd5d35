use futures_util::Stream;
use futures_util::stream::try_unfold;

use crate::error::{Error, Result};
use crate::store::{Cursor, KeyValueStore, Page, Projection};

enum ScanState {
    Start,
    Resume(Cursor),
    Done,
}

/// Lazily scan `table` one page at a time
///
/// Each request asks for at most `page_size` items and resumes from the
/// previous page's cursor; the first request carries none. The stream ends
/// after the first page that comes back without a cursor, and stops at the
/// first store error. A page is only requested once the previous one has
/// been consumed.
pub fn pages<'a, S>(
    store: &'a S,
    table: &'a str,
    projection: &'a Projection,
    page_size: u32,
) -> impl Stream<Item = Result<Page>> + Send + 'a
where
    S: KeyValueStore + ?Sized,
{
    try_unfold(ScanState::Start, move |state| async move {
        let cursor = match state {
            ScanState::Start => None,
            ScanState::Resume(cursor) => Some(cursor),
            ScanState::Done => return Ok::<_, Error>(None),
        };

        let page = store.scan(table, projection, page_size, cursor).await?;

        let next = match &page.cursor {
            Some(cursor) => ScanState::Resume(cursor.clone()),
            None => ScanState::Done,
        };

        Ok(Some((page, next)))
    })
}
