//! Name filtering shared by every resource client

/// Decide whether a resource named `name` belongs on the watchlist.
///
/// `name_filter` is a substring the name must contain; `skip_filter` is a
/// substring that excludes the name. An empty `name_filter` matches every
/// name and an empty `skip_filter` excludes nothing. The skip filter always
/// wins over the name filter.
pub fn should_watch(name: &str, name_filter: &str, skip_filter: &str) -> bool {
    if !skip_filter.is_empty() && name.contains(skip_filter) {
        return false;
    }
    name_filter.is_empty() || name.contains(name_filter)
}
