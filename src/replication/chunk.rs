/// Maximum number of requests a single batched write accepts
pub const BATCH_WRITE_SIZE: usize = 25;

/// Split `items` into consecutive chunks of at most `size` items
///
/// Order is preserved and the last chunk may be shorter. An empty input
/// yields no chunks at all.
pub fn chunk<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut items = items.into_iter().peekable();

    while items.peek().is_some() {
        chunks.push(items.by_ref().take(size).collect());
    }

    chunks
}
