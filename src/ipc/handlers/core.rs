use crate::config;
use crate::hierarchy::Hierarchy;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::Store;
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "dbPath": state.db_path.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_store_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let requested = req.params.get("path").and_then(|v| v.as_str());
    let path = config::resolve_db_path(requested);

    // A failed open must leave no store selected.
    state.tracker = None;
    state.db_path = None;

    let store = match Store::open(&path) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(path = %path.display(), "store open failed: {e:#}");
            return err(&req.id, "db_open_failed", format!("{e:#}"), None);
        }
    };

    let mut tracker = Hierarchy::new(store);
    tracker.subscribe(|| tracing::trace!("courses changed"));
    if let Err(e) = tracker.reload() {
        tracing::error!(path = %path.display(), "initial load failed: {e}");
        return err(
            &req.id,
            "db_open_failed",
            format!("initial load failed: {e}"),
            None,
        );
    }

    tracing::info!(
        path = %path.display(),
        courses = tracker.courses().len(),
        "store opened"
    );
    let revision = tracker.revision();
    state.tracker = Some(tracker);
    state.db_path = Some(path.clone());
    ok(
        &req.id,
        json!({ "dbPath": path.to_string_lossy(), "revision": revision }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "store.open" => Some(handle_store_open(state, req)),
        _ => None,
    }
}
