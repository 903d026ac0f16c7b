use bt_core::{Cache, ViewStat};
use chrono::{DateTime, Utc};

/// Count a view of `beat_id`. The caller persists the cache; ripeness is not
/// recomputed until the next rebuild.
pub fn record_view(cache: &mut Cache, beat_id: &str, now: DateTime<Utc>) -> ViewStat {
    let stat = cache.view_stats.entry(beat_id.to_string()).or_default();
    stat.view_count = stat.view_count.saturating_add(1);
    stat.last_viewed_at = Some(now);
    stat.clone()
}
