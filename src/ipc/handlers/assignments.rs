use crate::hierarchy::AssignmentField;
use crate::ipc::error::err;
use crate::ipc::helpers::{index_param, run_edit, str_param};
use crate::ipc::types::{AppState, Request};

struct TaskPath {
    course: usize,
    subject: usize,
    task: usize,
}

fn task_path(req: &Request) -> Result<TaskPath, serde_json::Value> {
    Ok(TaskPath {
        course: index_param(req, "courseIndex")?,
        subject: index_param(req, "subjectIndex")?,
        task: index_param(req, "taskIndex")?,
    })
}

fn parse_field(req: &Request) -> Result<AssignmentField, serde_json::Value> {
    let field = str_param(req, "field")?;
    let value = req.params.get("value");
    let text = || -> Result<String, serde_json::Value> {
        match value {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            // Grades arrive as numbers from some clients; store their text form.
            Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
            Some(serde_json::Value::Null) => Ok(String::new()),
            _ => Err(err(&req.id, "bad_params", "value must be a string", None)),
        }
    };
    match field {
        "grade" => Ok(AssignmentField::Grade(text()?)),
        "maxGrade" => Ok(AssignmentField::MaxGrade(text()?)),
        "date" => Ok(AssignmentField::Date(text()?)),
        "completed" => match value.and_then(|v| v.as_bool()) {
            Some(b) => Ok(AssignmentField::Completed(b)),
            None => Err(err(
                &req.id,
                "bad_params",
                "completed value must be a boolean",
                None,
            )),
        },
        other => Err(err(
            &req.id,
            "bad_params",
            format!("unknown field: {}", other),
            None,
        )),
    }
}

fn handle_assignments_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ci = match index_param(req, "courseIndex") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let si = match index_param(req, "subjectIndex") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let name = match str_param(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    run_edit(state, req, |t| t.add_assignment(ci, si, name))
}

fn handle_assignments_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = match task_path(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    run_edit(state, req, |t| t.remove_assignment(p.course, p.subject, p.task))
}

fn handle_assignments_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = match task_path(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let field = match parse_field(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    run_edit(state, req, |t| {
        t.update_assignment_field(p.course, p.subject, p.task, field)
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.add" => Some(handle_assignments_add(state, req)),
        "assignments.remove" => Some(handle_assignments_remove(state, req)),
        "assignments.update" => Some(handle_assignments_update(state, req)),
        _ => None,
    }
}
