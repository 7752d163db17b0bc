use crate::ipc::helpers::{index_param, run_edit, str_param};
use crate::ipc::types::{AppState, Request};

fn handle_subjects_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ci = match index_param(req, "courseIndex") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let name = match str_param(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    run_edit(state, req, |t| t.add_subject(ci, name))
}

fn handle_subjects_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ci = match index_param(req, "courseIndex") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let si = match index_param(req, "subjectIndex") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    run_edit(state, req, |t| t.remove_subject(ci, si))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.add" => Some(handle_subjects_add(state, req)),
        "subjects.remove" => Some(handle_subjects_remove(state, req)),
        _ => None,
    }
}
