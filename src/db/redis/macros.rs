/// Read-through lookup against a [`Cache`](crate::db::Cache).
///
/// `cached!(cache, key, ttl, future)` returns the stored value for `key` when
/// there is one. On a miss it awaits `future`, queues the result for a
/// background write with `ttl` seconds to live and returns it. Errors from the
/// lookup or the future propagate through `?`, so the enclosing function must
/// return an `AppResult`.
///
/// ```rust,ignore
/// let ids: AppResult<Vec<i64>> = cached!(self.cache, key, self.ttl, async {
///     self.provider.find_by_ingredients(&set).await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.get_from_cache(&$key).await? {
            Some(hit) => {
                tracing::debug!(key = %$key, "Cache hit");
                Ok(hit)
            }
            None => {
                tracing::debug!(key = %$key, "Cache miss");
                let fresh = $block.await?;
                $cache.set_in_background(&$key, &fresh, $ttl);
                Ok(fresh)
            }
        }
    }};
}
