/// Maximum number of type queries a single `listMetadata` call accepts.
pub const LIST_QUERY_LIMIT: usize = 3;

/// Split `items` into consecutive groups of `size`, keeping order.
///
/// Only the last group may be shorter. A zero `size` yields no groups.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    if size == 0 {
        return Vec::new();
    }
    items.chunks(size).map(|group| group.to_vec()).collect()
}
