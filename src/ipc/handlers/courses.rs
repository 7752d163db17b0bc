use crate::ipc::helpers::{index_param, run_edit, str_param};
use crate::ipc::types::{AppState, Request};

fn handle_courses_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match str_param(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    run_edit(state, req, |t| t.add_course(name))
}

fn handle_courses_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ci = match index_param(req, "courseIndex") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    run_edit(state, req, |t| t.remove_course(ci))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.add" => Some(handle_courses_add(state, req)),
        "courses.remove" => Some(handle_courses_remove(state, req)),
        _ => None,
    }
}
