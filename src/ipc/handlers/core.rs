use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::{Organizer, SqliteStore};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::rc::Rc;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

/// Opens (or creates) the workspace database and reloads every collection from it.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    // Release the previous connection before opening a new one on the same file.
    state.organizer = Organizer::in_memory();
    state.db = None;

    let conn = Rc::new(db::open_db(path)?);
    state.organizer = Organizer::open(Box::new(SqliteStore::new(Rc::clone(&conn))));
    state.db = Some(conn);
    state.workspace = Some(path.to_path_buf());
    tracing::info!(workspace = %path.to_string_lossy(), "workspace opened");
    Ok(())
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, &path) {
        Ok(()) => ok(
            &req.id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "counts": {
                    "subjects": state.organizer.subjects().len(),
                    "classes": state.organizer.classes().len(),
                    "assignments": state.organizer.assignments().len(),
                    "exams": state.organizer.exams().len(),
                    "grades": state.organizer.grades().len()
                }
            }),
        ),
        Err(e) => {
            state.workspace = None;
            err(&req.id, "db_open_failed", format!("{e:?}"), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
