use serde_json::json;

use crate::hierarchy::{Hierarchy, SyncError};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::StoreError;

pub fn require_tracker<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut Hierarchy, serde_json::Value> {
    state
        .tracker
        .as_mut()
        .ok_or_else(|| err(&req.id, "no_store", "open a store first", None))
}

pub fn str_param<'a>(req: &'a Request, key: &str) -> Result<&'a str, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Positional index param. Negative values map to a position no level can
/// hold, so they fail the bounds check like any other stale index.
pub fn index_param(req: &Request, key: &str) -> Result<usize, serde_json::Value> {
    let Some(v) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    if let Some(n) = v.as_u64() {
        return Ok(usize::try_from(n).unwrap_or(usize::MAX));
    }
    if v.as_i64().is_some() {
        return Ok(usize::MAX);
    }
    Err(err(
        &req.id,
        "bad_params",
        format!("{} must be an integer", key),
        None,
    ))
}

pub fn revision_ok(req: &Request, tracker: &Hierarchy) -> serde_json::Value {
    ok(&req.id, json!({ "revision": tracker.revision() }))
}

pub fn sync_err(req: &Request, e: &SyncError) -> serde_json::Value {
    match e {
        SyncError::IndexOutOfRange { level, index, len } => {
            // usize::MAX stands in for negative input; report it as -1.
            let index: i64 = i64::try_from(*index).unwrap_or(-1);
            err(
                &req.id,
                "not_found",
                e.to_string(),
                Some(json!({
                    "level": level.as_str(),
                    "index": index,
                    "len": len,
                })),
            )
        }
        SyncError::Store(se) => store_err(req, se),
        SyncError::Resync(_) => err(
            &req.id,
            "resync_failed",
            e.to_string(),
            Some(json!({ "committed": true })),
        ),
    }
}

pub fn store_err(req: &Request, e: &StoreError) -> serde_json::Value {
    match e {
        StoreError::EmptyName { entity } => err(
            &req.id,
            "empty_name",
            e.to_string(),
            Some(json!({ "entity": entity })),
        ),
        StoreError::Constraint(_) => err(&req.id, "constraint_violation", e.to_string(), None),
        StoreError::NotFound { entity, id } => err(
            &req.id,
            "not_found",
            e.to_string(),
            Some(json!({ "entity": entity, "id": id })),
        ),
        StoreError::Sqlite(_) => err(&req.id, "db_failed", e.to_string(), None),
    }
}

/// Runs a tracker edit and renders the usual `{revision}` / error response.
pub fn run_edit(
    state: &mut AppState,
    req: &Request,
    edit: impl FnOnce(&mut Hierarchy) -> Result<(), SyncError>,
) -> serde_json::Value {
    let tracker = match require_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    match edit(&mut *tracker) {
        Ok(()) => revision_ok(req, tracker),
        Err(e) => sync_err(req, &e),
    }
}
