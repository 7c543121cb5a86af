
use serde_json::json;
use std::io::{BufRead, Write};
use test_support::{request, request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("studyd-router-smoke");
    let bundle_out = workspace.join("smoke-backup.zip");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());
    assert!(health.get("workspacePath").map(|v| v.is_null()).unwrap_or(false));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let list_methods = [
        ("subjects.list", json!({})),
        ("classes.list", json!({})),
        ("assignments.list", json!({})),
        ("exams.list", json!({ "upcomingOnly": true })),
        ("grades.list", json!({})),
        ("grades.summary", json!({})),
        ("attendance.subjects", json!({})),
        ("attendance.calendar", json!({ "today": "2024-01-15" })),
        ("profile.get", json!({})),
        ("setup.get", json!({})),
        ("dashboard.open", json!({ "now": "2024-01-15T08:00" })),
    ];
    for (i, (method, params)) in list_methods.iter().enumerate() {
        let id = format!("list-{}", i);
        let resp = request(&mut stdin, &mut reader, &id, method, params.clone());
        assert_eq!(
            resp.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            resp
        );
    }

    let export = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "backup.exportWorkspaceBundle",
        json!({ "outPath": bundle_out.to_string_lossy() }),
    );
    assert_eq!(
        export.get("bundleFormat").and_then(|v| v.as_str()),
        Some("studyd-workspace-v1")
    );

    let code = request_err(&mut stdin, &mut reader, "4", "classes.frobnicate", json!({}));
    assert_eq!(code, "not_implemented");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn requests_without_a_workspace_run_in_memory() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "subjects.create",
        json!({ "input": { "name": "Mathematics" } }),
    );
    assert!(created.get("subjectId").and_then(|v| v.as_str()).is_some());
    let list = request_ok(&mut stdin, &mut reader, "2", "subjects.list", json!({}));
    assert_eq!(list["subjects"].as_array().map(|a| a.len()), Some(1));

    assert_eq!(
        request_err(&mut stdin, &mut reader, "3", "setup.get", json!({})),
        "no_workspace"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "4",
            "backup.exportWorkspaceBundle",
            json!({ "outPath": "/tmp/never-written.zip" })
        ),
        "no_workspace"
    );
}

#[test]
fn malformed_lines_get_bad_json_and_the_loop_continues() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response");
    assert_eq!(value["ok"], json!(false));
    assert_eq!(value["error"]["code"], json!("bad_json"));
    assert!(value.get("id").is_none());

    let _ = request_ok(&mut stdin, &mut reader, "after", "health", json!({}));
}

#[test]
fn validation_failures_map_to_bad_params() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let cases = [
        ("subjects.create", json!({ "input": { "name": "  " } })),
        ("subjects.create", json!({ "input": { "name": "Art", "color": "blue" } })),
        (
            "classes.create",
            json!({ "input": { "subjectId": "s", "date": "2024-01-01", "startTime": "10:00", "endTime": "09:00" } }),
        ),
        (
            "classes.create",
            json!({ "input": { "subjectId": "s", "date": "01/01/2024", "startTime": "09:00", "endTime": "10:00" } }),
        ),
        ("classes.delete", json!({ "classId": "x", "scope": "sometimes" })),
        ("classes.setStatus", json!({ "classId": "x", "status": "late" })),
        ("assignments.create", json!({ "input": { "subjectId": "s", "dueDate": "2024-01-01" } })),
        (
            "exams.create",
            json!({ "input": { "subjectId": "s", "date": "2024-03-06T10:00", "type": "Oral" } }),
        ),
        ("profile.update", json!({ "patch": { "currentSemester": 9 } })),
        ("profile.update", json!({ "patch": { "nickname": "A" } })),
    ];
    for (i, (method, params)) in cases.iter().enumerate() {
        let id = format!("bad-{}", i);
        let code = request_err(&mut stdin, &mut reader, &id, method, params.clone());
        assert_eq!(code, "bad_params", "{} with {}", method, params);
    }
}

#[test]
fn dates_outside_the_supported_years_are_rejected_and_the_loop_survives() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let cases = [
        (
            "attendance.calendar",
            json!({ "windowStart": "+262142-12-30", "numDays": 7 }),
        ),
        ("attendance.calendar", json!({ "today": "-0001-01-01" })),
        (
            "classes.create",
            json!({ "input": {
                "subjectId": "s", "date": "+262142-12-25", "startTime": "09:00",
                "endTime": "10:00", "repeatUntil": "+262142-12-31"
            } }),
        ),
        ("dashboard.open", json!({ "now": "+262142-12-30T10:00:00" })),
        ("exams.list", json!({ "now": "1899-12-31T23:59" })),
    ];
    for (i, (method, params)) in cases.iter().enumerate() {
        let id = format!("range-{}", i);
        let code = request_err(&mut stdin, &mut reader, &id, method, params.clone());
        assert_eq!(code, "bad_params", "{} with {}", method, params);
    }

    let calendar = request_ok(
        &mut stdin,
        &mut reader,
        "edge",
        "attendance.calendar",
        json!({ "windowStart": "9999-12-30", "numDays": 3, "today": "2024-01-01" }),
    );
    assert_eq!(calendar["cells"].as_array().map(|c| c.len()), Some(3));
    let _ = request_ok(&mut stdin, &mut reader, "after", "health", json!({}));
}
