use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_tracker, revision_ok, sync_err};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_tree_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tracker = match require_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    if tracker.is_stale() {
        if let Err(e) = tracker.reload() {
            tracing::warn!("stale tree could not be reloaded: {e}");
        }
    }
    ok(
        &req.id,
        json!({
            "revision": tracker.revision(),
            "stale": tracker.is_stale(),
            "courses": tracker.courses(),
        }),
    )
}

fn handle_tree_reload(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tracker = match require_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    match tracker.reload() {
        Ok(()) => revision_ok(req, tracker),
        Err(e) => sync_err(req, &e),
    }
}

fn handle_tree_locate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tracker = match require_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let id_of = |key: &str| req.params.get(key).and_then(|v| v.as_i64());

    let found = if let Some(id) = id_of("assignmentId") {
        tracker
            .locate_assignment(id)
            .map(|(ci, si, ti)| json!({ "courseIndex": ci, "subjectIndex": si, "taskIndex": ti }))
    } else if let Some(id) = id_of("subjectId") {
        tracker
            .locate_subject(id)
            .map(|(ci, si)| json!({ "courseIndex": ci, "subjectIndex": si }))
    } else if let Some(id) = id_of("courseId") {
        tracker
            .locate_course(id)
            .map(|ci| json!({ "courseIndex": ci }))
    } else {
        return err(
            &req.id,
            "bad_params",
            "expected courseId, subjectId or assignmentId",
            None,
        );
    };

    match found {
        Some(position) => ok(&req.id, position),
        None => err(&req.id, "not_found", "id not in current tree", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tree.get" => Some(handle_tree_get(state, req)),
        "tree.reload" => Some(handle_tree_reload(state, req)),
        "tree.locate" => Some(handle_tree_locate(state, req)),
        _ => None,
    }
}
