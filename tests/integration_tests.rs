//! Integration tests for the stagesync CLI.
//!
//! Each test runs the binary against a fresh temporary project and checks
//! both its output and the registry file it leaves behind.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

/// Helper to create a stagesync Command isolated from the caller's env
fn stagesync() -> Command {
    let mut cmd = cargo_bin_cmd!("stagesync");
    cmd.env_remove("STAGESYNC_SYNC_INTERVAL_SECS")
        .env_remove("STAGESYNC_SESSIONS_FILE")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a temporary project directory
fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

/// Helper to run a subcommand in `dir` and require success
fn run_ok(dir: &TempDir, args: &[&str]) -> String {
    let output = stagesync()
        .current_dir(dir.path())
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(output).unwrap()
}

/// Helper to initialize a project and start a session
fn init_with_session(dir: &TempDir) {
    run_ok(dir, &["init"]);
    run_ok(dir, &["new"]);
}

/// Helper to read the registry file
fn registry(dir: &TempDir) -> Value {
    let content = fs::read_to_string(dir.path().join(".stagesync/sessions.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn active_id(dir: &TempDir) -> String {
    registry(dir)["active"].as_str().unwrap().to_string()
}

fn active_session(dir: &TempDir) -> Value {
    let registry = registry(dir);
    let id = registry["active"].as_str().unwrap().to_string();
    registry["sessions"][id.as_str()].clone()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        stagesync().arg("--help").assert().success();
    }

    #[test]
    fn test_version() {
        stagesync().arg("--version").assert().success();
    }

    #[test]
    fn test_init_creates_structure() {
        let dir = create_temp_project();

        stagesync()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized stagesync"));

        assert!(dir.path().join(".stagesync").is_dir());
        assert!(dir.path().join(".stagesync/stagesync.toml").is_file());
    }

    #[test]
    fn test_init_idempotent() {
        let dir = create_temp_project();
        run_ok(&dir, &["init"]);

        stagesync()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already initialized"));
    }

    #[test]
    fn test_project_dir_flag() {
        let dir = create_temp_project();

        stagesync()
            .arg("--project-dir")
            .arg(dir.path())
            .arg("init")
            .assert()
            .success();

        assert!(dir.path().join(".stagesync/stagesync.toml").exists());
    }

    #[test]
    fn test_commands_require_init() {
        let dir = create_temp_project();

        stagesync()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("not initialized"));
    }
}

// =============================================================================
// Session Registry Tests
// =============================================================================

mod sessions {
    use super::*;

    #[test]
    fn test_new_session_is_active() {
        let dir = create_temp_project();
        run_ok(&dir, &["init"]);

        let stdout = run_ok(&dir, &["new", "--content-type", "video"]);
        assert!(stdout.contains("Started session"));

        let session = active_session(&dir);
        assert_eq!(session["current_stage"], "start");
        assert_eq!(session["metadata"]["content_type"], "short_video");

        let status = run_ok(&dir, &["status"]);
        assert!(status.contains(&active_id(&dir)));
        assert!(status.contains("short_video"));
    }

    #[test]
    fn test_new_rejects_unknown_content_type() {
        let dir = create_temp_project();
        run_ok(&dir, &["init"]);

        stagesync()
            .current_dir(dir.path())
            .args(["new", "--content-type", "podcast"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid content type"));
    }

    #[test]
    fn test_status_without_session() {
        let dir = create_temp_project();
        run_ok(&dir, &["init"]);

        let stdout = run_ok(&dir, &["status"]);
        assert!(stdout.contains("No active session"));
    }

    #[test]
    fn test_abandon_then_resume() {
        let dir = create_temp_project();
        init_with_session(&dir);
        let id = active_id(&dir);

        let stdout = run_ok(&dir, &["abandon"]);
        assert!(stdout.contains(&format!("Abandoned session {}", id)));
        assert!(registry(&dir)["active"].is_null());
        assert!(run_ok(&dir, &["status"]).contains("No active session"));
        assert!(run_ok(&dir, &["list"]).contains(&id));

        run_ok(&dir, &["resume", &id]);
        assert_eq!(active_id(&dir), id);
    }

    #[test]
    fn test_resume_unknown_session_fails() {
        let dir = create_temp_project();
        init_with_session(&dir);

        stagesync()
            .current_dir(dir.path())
            .args(["resume", "00000000-0000-4000-8000-000000000000"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn test_list_marks_active_session() {
        let dir = create_temp_project();
        init_with_session(&dir);
        let first = active_id(&dir);
        run_ok(&dir, &["new"]);
        let second = active_id(&dir);

        let stdout = run_ok(&dir, &["list"]);
        assert!(stdout.contains(&first));
        assert!(stdout.contains(&format!("* {}", second)));
    }

    #[test]
    fn test_sessions_file_override() {
        let dir = create_temp_project();
        run_ok(&dir, &["init"]);
        run_ok(&dir, &["--sessions-file", "other.json", "new"]);

        assert!(dir.path().join(".stagesync/other.json").exists());
        assert!(!dir.path().join(".stagesync/sessions.json").exists());
    }
}

// =============================================================================
// Pipeline Tests
// =============================================================================

mod pipeline {
    use super::*;

    #[test]
    fn test_set_campaign_name_derives_title() {
        let dir = create_temp_project();
        init_with_session(&dir);

        let stdout = run_ok(&dir, &["set", "start.campaign_name", "Summer Tour"]);
        assert!(stdout.contains("Updated metadata"));
        assert!(stdout.contains("Wrote start data"));

        let session = active_session(&dir);
        assert_eq!(session["metadata"]["title"], "Summer Tour");
        assert_eq!(session["stage_data"]["start"]["campaign_name"], "Summer Tour");
    }

    #[test]
    fn test_set_source_text_truncates_title() {
        let dir = create_temp_project();
        init_with_session(&dir);

        run_ok(
            &dir,
            &["set", "start.source_text", "a trending dance challenge for summer"],
        );

        let session = active_session(&dir);
        assert_eq!(session["metadata"]["title"], "a trending dance cha...");
    }

    #[test]
    fn test_set_writes_only_meaningful_stages() {
        let dir = create_temp_project();
        init_with_session(&dir);

        run_ok(&dir, &["set", "publish.platforms", r#"["tiktok"]"#]);

        let session = active_session(&dir);
        let stage_data = session["stage_data"].as_object().unwrap();
        assert_eq!(stage_data.len(), 1);
        assert_eq!(session["stage_data"]["publish"]["platforms"][0], "tiktok");
    }

    #[test]
    fn test_set_preserves_earlier_fields() {
        let dir = create_temp_project();
        init_with_session(&dir);

        run_ok(&dir, &["set", "start.campaign_name", "Summer Tour"]);
        run_ok(&dir, &["set", "start.source_text", "neon"]);

        let session = active_session(&dir);
        assert_eq!(session["stage_data"]["start"]["campaign_name"], "Summer Tour");
        assert_eq!(session["stage_data"]["start"]["source_text"], "neon");
    }

    #[test]
    fn test_set_rejects_unknown_field() {
        let dir = create_temp_project();
        init_with_session(&dir);

        stagesync()
            .current_dir(dir.path())
            .args(["set", "create.title", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown field"));
    }

    #[test]
    fn test_set_without_session_fails() {
        let dir = create_temp_project();
        run_ok(&dir, &["init"]);

        stagesync()
            .current_dir(dir.path())
            .args(["set", "start.source_text", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No active session"));
    }

    #[test]
    fn test_advance_records_completed_stage() {
        let dir = create_temp_project();
        init_with_session(&dir);

        let stdout = run_ok(&dir, &["advance", "analyze"]);
        assert!(stdout.contains("from start to analyze"));

        let session = active_session(&dir);
        assert_eq!(session["current_stage"], "analyze");
        let completed = session["completed_stages"].as_array().unwrap();
        assert!(completed.iter().any(|stage| stage == "start"));
    }

    #[test]
    fn test_advance_never_moves_backwards() {
        let dir = create_temp_project();
        init_with_session(&dir);
        run_ok(&dir, &["advance", "create"]);

        let stdout = run_ok(&dir, &["advance", "start"]);
        assert!(stdout.contains("not moving back"));
        assert_eq!(active_session(&dir)["current_stage"], "create");
    }

    #[test]
    fn test_advance_keeps_stage_data() {
        let dir = create_temp_project();
        init_with_session(&dir);
        run_ok(&dir, &["set", "start.campaign_name", "Summer Tour"]);

        run_ok(&dir, &["advance", "analyze"]);

        let session = active_session(&dir);
        assert_eq!(session["stage_data"]["start"]["campaign_name"], "Summer Tour");
        assert_eq!(session["metadata"]["title"], "Summer Tour");
    }

    #[test]
    fn test_complete_closes_session() {
        let dir = create_temp_project();
        init_with_session(&dir);
        let id = active_id(&dir);
        run_ok(&dir, &["advance", "publish"]);

        let stdout = run_ok(&dir, &["complete"]);
        assert!(stdout.contains(&format!("Completed session {}", id)));

        let registry = registry(&dir);
        assert!(registry["active"].is_null());
        let completed = registry["sessions"][id.as_str()]["completed_stages"]
            .as_array()
            .unwrap()
            .clone();
        assert!(completed.iter().any(|stage| stage == "publish"));
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_temp_project();
        run_ok(&dir, &["init"]);

        let stdout = run_ok(&dir, &["config", "show"]);
        assert!(stdout.contains("interval_secs = 30"));
        assert!(stdout.contains("title_max_chars = 20"));
    }

    #[test]
    fn test_config_validate_clean() {
        let dir = create_temp_project();
        run_ok(&dir, &["init"]);

        let stdout = run_ok(&dir, &["config", "validate"]);
        assert!(stdout.contains("Configuration is valid."));
    }

    #[test]
    fn test_config_validate_reports_zero_interval() {
        let dir = create_temp_project();
        run_ok(&dir, &["init"]);
        fs::write(
            dir.path().join(".stagesync/stagesync.toml"),
            "[sync]\ninterval_secs = 0\n",
        )
        .unwrap();

        let stdout = run_ok(&dir, &["config", "validate"]);
        assert!(stdout.contains("interval_secs is 0"));
    }

    #[test]
    fn test_env_override_shows_in_effective_values() {
        let dir = create_temp_project();
        run_ok(&dir, &["init"]);

        stagesync()
            .current_dir(dir.path())
            .env("STAGESYNC_SYNC_INTERVAL_SECS", "12")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("interval_secs = 12"));
    }

    #[test]
    fn test_invalid_env_override_is_warned() {
        let dir = create_temp_project();
        run_ok(&dir, &["init"]);

        stagesync()
            .current_dir(dir.path())
            .env("STAGESYNC_SYNC_INTERVAL_SECS", "soon")
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Ignoring STAGESYNC_SYNC_INTERVAL_SECS"));
    }
}
