use std::path::PathBuf;
use std::rc::Rc;

use rusqlite::Connection;
use serde::Deserialize;

use crate::store::Organizer;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Rc<Connection>>,
    pub organizer: Organizer,
}

impl AppState {
    /// No workspace yet: records live in memory until one is selected.
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            organizer: Organizer::in_memory(),
        }
    }
}
