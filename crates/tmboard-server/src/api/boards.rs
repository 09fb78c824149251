use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::Serialize;
use tmboard_core::{BoardTable, Snapshot};
use tmboard_db::SnapshotStore;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SnapshotData {
    entries: serde_json::Value,
    ts: f64,
    min_refresh_period: u64,
    age_secs: f64,
    /// Older than two refresh periods; the refresh loop is probably failing.
    stale: bool,
}

impl SnapshotData {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        let now = Utc::now();
        Self {
            age_secs: snapshot.age_secs(now),
            stale: snapshot.is_stale(now),
            entries: snapshot.entries,
            ts: snapshot.ts,
            min_refresh_period: snapshot.min_refresh_period,
        }
    }
}

pub(super) async fn get_results<S: SnapshotStore>(
    State(state): State<AppState<S>>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SnapshotData>>, ApiError> {
    snapshot_response(&state.store, BoardTable::Results, req_id).await
}

pub(super) async fn get_maps<S: SnapshotStore>(
    State(state): State<AppState<S>>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SnapshotData>>, ApiError> {
    snapshot_response(&state.store, BoardTable::Maps, req_id).await
}

async fn snapshot_response<S: SnapshotStore>(
    store: &S,
    table: BoardTable,
    req_id: RequestId,
) -> Result<Json<ApiResponse<SnapshotData>>, ApiError> {
    let snapshot = store
        .get(table)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("no {table} snapshot has been cached yet"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: SnapshotData::from_snapshot(snapshot),
        meta: ResponseMeta::new(req_id.0),
    }))
}
