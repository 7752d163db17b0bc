use std::path::PathBuf;

use serde::Deserialize;

use crate::hierarchy::Hierarchy;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub db_path: Option<PathBuf>,
    pub tracker: Option<Hierarchy>,
}
