
use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, str_field, temp_dir};

#[test]
fn records_survive_a_sidecar_restart() {
    let workspace = temp_dir("studyd-persistence");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let math = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.create",
        json!({ "input": { "name": "Mathematics", "teacher": "Ms. Iyer", "color": "#2563EB" } }),
    );
    let math = str_field(&math, "subjectId").to_string();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "classes.create",
        json!({ "input": {
            "subjectId": math, "date": "2024-01-01", "startTime": "09:00",
            "endTime": "10:00", "room": "LH-1", "repeatUntil": "2024-01-15"
        } }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.create",
        json!({ "input": { "title": "Problem set 1", "subjectId": math, "dueDate": "2024-01-10" } }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "exams.create",
        json!({ "input": { "subjectId": math, "date": "2024-03-04T14:30", "venue": "Hall A", "type": "midterm" } }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "grades.create",
        json!({ "input": { "semester": 1, "subjectName": "Calculus", "credits": 4, "midSemMarks": 21.5 } }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "profile.update",
        json!({ "patch": { "fullName": "Asha Verma", "currentSemester": 2, "enrollmentYear": 2023 } }),
    );

    let before_classes = request_ok(&mut stdin, &mut reader, "8", "classes.list", json!({}));

    drop(stdin);
    let _ = child.wait();

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["counts"]["subjects"], json!(1));
    assert_eq!(selected["counts"]["classes"], json!(3));
    assert_eq!(selected["counts"]["assignments"], json!(1));
    assert_eq!(selected["counts"]["exams"], json!(1));
    assert_eq!(selected["counts"]["grades"], json!(1));

    let subjects = request_ok(&mut stdin, &mut reader, "2", "subjects.list", json!({}));
    assert_eq!(subjects["subjects"][0]["color"], json!("#2563eb"));
    assert_eq!(subjects["subjects"][0]["teacher"], json!("Ms. Iyer"));
    assert_eq!(subjects["subjects"][0]["classCount"], json!(3));

    let after_classes = request_ok(&mut stdin, &mut reader, "3", "classes.list", json!({}));
    assert_eq!(after_classes, before_classes);
    let after_exams = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "exams.list",
        json!({ "now": "2024-01-01T00:00" }),
    );
    assert_eq!(after_exams["exams"][0]["type"], json!("Mid-term"));
    assert_eq!(after_exams["exams"][0]["date"], json!("2024-03-04T14:30:00"));

    let grades = request_ok(&mut stdin, &mut reader, "5", "grades.list", json!({}));
    assert_eq!(grades["grades"][0]["midSemMarks"].as_f64(), Some(21.5));
    assert_eq!(grades["grades"][0]["details"]["status"], json!("In Progress"));

    let profile = request_ok(&mut stdin, &mut reader, "6", "profile.get", json!({}));
    assert_eq!(profile["profile"]["fullName"], json!("Asha Verma"));
    assert_eq!(profile["profile"]["currentSemester"], json!(2));
    assert_eq!(profile["profile"]["enrollmentYear"], json!(2023));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn corrupt_collection_loads_as_empty_instead_of_failing() {
    let workspace = temp_dir("studyd-corrupt");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.create",
        json!({ "input": { "name": "Mathematics" } }),
    );
    drop(stdin);
    let _ = child.wait();

    {
        let conn = rusqlite::Connection::open(workspace.join("studyd.sqlite3")).expect("open db");
        conn.execute(
            "UPDATE collections SET payload_json = '{\"not\":\"a list\"}' WHERE kind = 'subjects'",
            [],
        )
        .expect("corrupt subjects");
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["counts"]["subjects"], json!(0));
    let listed = request_ok(&mut stdin, &mut reader, "2", "subjects.list", json!({}));
    assert_eq!(listed["subjects"], json!([]));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn backup_bundle_restores_into_a_fresh_workspace() {
    let workspace = temp_dir("studyd-backup-src");
    let restored = temp_dir("studyd-backup-dst");
    let bundle = workspace.join("export").join("workspace.zip");

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.create",
        json!({ "input": { "name": "Chemistry" } }),
    );
    let export = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "backup.exportWorkspaceBundle",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(export["entryCount"], json!(2));
    assert_eq!(str_field(&export, "dbSha256").len(), 64);

    let import = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "backup.importWorkspaceBundle",
        json!({ "inPath": bundle.to_string_lossy(), "workspacePath": restored.to_string_lossy() }),
    );
    assert_eq!(import["bundleFormatDetected"], json!("studyd-workspace-v1"));
    assert_eq!(import["checksumVerified"], json!(true));

    let health = request_ok(&mut stdin, &mut reader, "5", "health", json!({}));
    assert_eq!(
        health["workspacePath"].as_str(),
        Some(restored.to_string_lossy().as_ref())
    );
    let subjects = request_ok(&mut stdin, &mut reader, "6", "subjects.list", json!({}));
    assert_eq!(subjects["subjects"][0]["name"], json!("Chemistry"));

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(restored);
}

#[test]
fn rejected_import_keeps_the_current_workspace_open() {
    let workspace = temp_dir("studyd-import-rejected");
    let bad_bundle = workspace.join("not-a-bundle.zip");
    std::fs::write(&bad_bundle, b"this is not a zip archive").expect("write bad bundle");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.create",
        json!({ "input": { "name": "Mathematics" } }),
    );
    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "backup.importWorkspaceBundle",
        json!({ "inPath": bad_bundle.to_string_lossy() }),
    );
    assert_eq!(code, "backup_import_failed");

    let health = request_ok(&mut stdin, &mut reader, "4", "health", json!({}));
    assert_eq!(
        health["workspacePath"].as_str(),
        Some(workspace.to_string_lossy().as_ref())
    );
    let listed = request_ok(&mut stdin, &mut reader, "5", "subjects.list", json!({}));
    assert_eq!(listed["subjects"][0]["name"], json!("Mathematics"));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "subjects.create",
        json!({ "input": { "name": "Physics" } }),
    );
    drop(stdin);
    let _ = child.wait();

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["counts"]["subjects"], json!(2));

    let _ = std::fs::remove_dir_all(workspace);
}
