use anyhow::Context;
use chrono::Utc;
use tmboard_core::BoardTable;
use tmboard_db::SnapshotStore;

/// Renders the cached snapshot of `table` with its age as pretty JSON.
pub(crate) async fn run_show<S: SnapshotStore>(
    store: &S,
    table: BoardTable,
) -> anyhow::Result<String> {
    let snapshot = store
        .get(table)
        .await?
        .with_context(|| format!("no {table} snapshot cached under {}", table.cache_key()))?;

    let now = Utc::now();
    let rendered = serde_json::json!({
        "name": table.cache_key(),
        "ts": snapshot.ts,
        "taken_at": snapshot.taken_at(),
        "min_refresh_period": snapshot.min_refresh_period,
        "age_secs": snapshot.age_secs(now),
        "stale": snapshot.is_stale(now),
        "rows": snapshot.len(),
        "entries": snapshot.entries,
    });
    Ok(serde_json::to_string_pretty(&rendered)?)
}
