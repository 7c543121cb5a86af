
use serde_json::{json, Value};
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{request_ok, spawn_sidecar, str_field, temp_dir};

fn class_on(classes: &Value, subject_id: &str, date: &str) -> String {
    classes["classes"]
        .as_array()
        .expect("classes")
        .iter()
        .find(|c| str_field(c, "subjectId") == subject_id && str_field(c, "date") == date)
        .map(|c| str_field(c, "id").to_string())
        .unwrap_or_else(|| panic!("no class for {} on {}", subject_id, date))
}

fn row_for<'a>(rows: &'a [Value], subject_id: &str) -> &'a Value {
    rows.iter()
        .find(|r| str_field(r, "subjectId") == subject_id)
        .expect("subject row")
}

/// Mathematics weekly on the Mondays of January 2024 (Jan 8 missed, Jan 15 a holiday) plus
/// one attended Physics class on Jan 8.
fn seed(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) -> (String, String) {
    let math = request_ok(
        stdin,
        reader,
        "s1",
        "subjects.create",
        json!({ "input": { "name": "Mathematics", "color": "#2563eb" } }),
    );
    let math = str_field(&math, "subjectId").to_string();
    let physics = request_ok(
        stdin,
        reader,
        "s2",
        "subjects.create",
        json!({ "input": { "name": "Physics" } }),
    );
    let physics = str_field(&physics, "subjectId").to_string();

    let _ = request_ok(
        stdin,
        reader,
        "c1",
        "classes.create",
        json!({ "input": {
            "subjectId": math, "date": "2024-01-01", "startTime": "09:00",
            "endTime": "10:00", "repeatUntil": "2024-01-22"
        } }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "c2",
        "classes.create",
        json!({ "input": {
            "subjectId": physics, "date": "2024-01-08", "startTime": "11:00", "endTime": "12:00"
        } }),
    );

    let classes = request_ok(stdin, reader, "l1", "classes.list", json!({}));
    let _ = request_ok(
        stdin,
        reader,
        "st1",
        "classes.setStatus",
        json!({ "classId": class_on(&classes, &math, "2024-01-08"), "status": "missed" }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "st2",
        "classes.setStatus",
        json!({ "classId": class_on(&classes, &math, "2024-01-15"), "status": "holiday" }),
    );
    (math, physics)
}

#[test]
fn calendar_cells_carry_daily_levels_and_future_sentinel() {
    let workspace = temp_dir("studyd-attendance-calendar");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    seed(&mut stdin, &mut reader);

    let calendar = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.calendar",
        json!({ "windowStart": "2024-01-01", "numDays": 21, "today": "2024-01-15" }),
    );
    let cells = calendar["cells"].as_array().expect("cells");
    assert_eq!(cells.len(), 21);
    assert_eq!(cells[0]["date"], json!("2024-01-01"));
    assert_eq!(cells[0]["level"], json!(5));
    assert_eq!(cells[1]["level"], json!(0));

    // Jan 8: one of two classes attended.
    assert_eq!(cells[7]["present"], json!(1));
    assert_eq!(cells[7]["total"], json!(2));
    assert_eq!(cells[7]["level"], json!(3));

    // Jan 15 is a holiday and does not count.
    assert_eq!(cells[14]["total"], json!(0));
    assert_eq!(cells[14]["level"], json!(0));

    for cell in &cells[15..] {
        assert_eq!(cell["level"], json!(-1), "{}", cell);
    }

    let default_window = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.calendar",
        json!({ "today": "2024-01-22" }),
    );
    assert_eq!(default_window["numDays"], json!(35));
    assert_eq!(default_window["windowStart"], json!("2023-12-19"));
    let cells = default_window["cells"].as_array().expect("cells");
    let last = cells.last().expect("last cell");
    assert_eq!(last["date"], json!("2024-01-22"));
    assert_eq!(last["level"], json!(5));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn subject_rows_flag_attendance_below_target() {
    let workspace = temp_dir("studyd-attendance-subjects");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let (math, physics) = seed(&mut stdin, &mut reader);

    let summary = request_ok(&mut stdin, &mut reader, "2", "attendance.subjects", json!({}));
    assert_eq!(summary["targetPercent"].as_f64(), Some(75.0));
    let rows = summary["subjects"].as_array().expect("subjects");

    // Mathematics: Jan 1 and Jan 22 attended, Jan 8 missed, Jan 15 excluded.
    let m = row_for(rows, &math);
    assert_eq!(m["attended"], json!(2));
    assert_eq!(m["total"], json!(3));
    assert_eq!(m["belowTarget"], json!(true));
    assert_eq!(m["classesNeeded"], json!(1));

    let p = row_for(rows, &physics);
    assert_eq!(p["percent"].as_f64(), Some(100.0));
    assert_eq!(p["belowTarget"], json!(false));
    assert_eq!(p["classesNeeded"], json!(0));

    assert_eq!(summary["overall"]["attended"], json!(3));
    assert_eq!(summary["overall"]["total"], json!(4));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "setup.update",
        json!({ "section": "attendance", "patch": { "targetPercent": 60 } }),
    );
    let relaxed = request_ok(&mut stdin, &mut reader, "4", "attendance.subjects", json!({}));
    assert_eq!(relaxed["targetPercent"].as_f64(), Some(60.0));
    let m = row_for(relaxed["subjects"].as_array().expect("subjects"), &math);
    assert_eq!(m["belowTarget"], json!(false));

    let _ = std::fs::remove_dir_all(workspace);
}
