//! End-to-end tests that drive the minish binary through `-c`.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

/// A shell command running one line inside `dir`.
fn sh(dir: &TempDir, line: &str) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("minish");
    cmd.current_dir(dir.path()).arg("-c").arg(line);
    cmd
}

#[test]
fn test_echo_honors_quotes() {
    let dir = TempDir::new().unwrap();
    sh(&dir, r#"echo 'a b' "c\"d"  e\ f"#)
        .assert()
        .success()
        .stdout("a b c\"d e f\n");
}

#[test]
fn test_redirect_truncates_then_appends() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("f");
    fs::write(&file, "stale\n").unwrap();

    sh(&dir, "echo a b c > f").assert().success().stdout("");
    assert_eq!(fs::read_to_string(&file).unwrap(), "a b c\n");

    sh(&dir, "echo a b c >> f").assert().success();
    assert_eq!(fs::read_to_string(&file).unwrap(), "a b c\na b c\n");

    sh(&dir, "echo again 1> f").assert().success();
    assert_eq!(fs::read_to_string(&file).unwrap(), "again\n");
}

#[test]
fn test_three_stage_pipeline() {
    let dir = TempDir::new().unwrap();
    sh(&dir, r"printf 'b\na\nc\n' | sort | head -n 2")
        .assert()
        .success()
        .stdout("a\nb\n");
}

#[test]
fn test_long_pipeline_reaches_end_of_input() {
    let dir = TempDir::new().unwrap();
    sh(&dir, r"printf 'x\ny\n' | cat | cat | cat | wc -l")
        .assert()
        .success()
        .stdout(predicate::eq("2").trim());
}

#[test]
fn test_builtins_inside_pipelines() {
    let dir = TempDir::new().unwrap();
    sh(&dir, "echo hello | tr a-z A-Z")
        .assert()
        .success()
        .stdout("HELLO\n");
    sh(&dir, "type cd | cat")
        .assert()
        .success()
        .stdout("cd is a shell builtin\n");
}

#[test]
fn test_writer_stops_when_reader_exits() {
    let dir = TempDir::new().unwrap();
    sh(&dir, "yes | head -n 1")
        .assert()
        .success()
        .stdout("y\n")
        .stderr("");
    sh(&dir, "sh -c 'while :; do echo y; done' | head -n 1")
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .success()
        .stdout("y\n")
        .stderr("");
}

#[test]
fn test_pipeline_status_is_last_stage() {
    let dir = TempDir::new().unwrap();
    sh(&dir, "false | true").assert().success();
    sh(&dir, "true | sh -c 'exit 5'").assert().code(5);
}

#[test]
fn test_redirect_beats_pipe() {
    let dir = TempDir::new().unwrap();
    sh(&dir, "echo hidden > f | cat")
        .assert()
        .success()
        .stdout("");
    assert_eq!(fs::read_to_string(dir.path().join("f")).unwrap(), "hidden\n");
}

#[test]
fn test_stderr_redirection_of_external() {
    let dir = TempDir::new().unwrap();
    sh(&dir, "sh -c 'echo oops >&2; echo fine' 2> err")
        .assert()
        .success()
        .stdout("fine\n")
        .stderr("");
    assert_eq!(fs::read_to_string(dir.path().join("err")).unwrap(), "oops\n");

    sh(&dir, "sh -c 'echo more >&2' 2>> err").assert().success();
    assert_eq!(
        fs::read_to_string(dir.path().join("err")).unwrap(),
        "oops\nmore\n"
    );
}

#[test]
fn test_builtin_error_redirected() {
    let dir = TempDir::new().unwrap();
    sh(&dir, "cd /nonexistent_dir_xyz 2> err")
        .assert()
        .code(1)
        .stderr("");
    assert_eq!(
        fs::read_to_string(dir.path().join("err")).unwrap(),
        "cd: /nonexistent_dir_xyz: No such file or directory\n"
    );
}

#[test]
fn test_builtin_redirects_restored_for_next_line() {
    let dir = TempDir::new().unwrap();
    let mut cmd = cargo_bin_cmd!("minish");
    cmd.current_dir(dir.path())
        .env_remove("HISTFILE")
        .write_stdin("echo hidden > out\necho hi > ok 2> nodir/x\necho visible\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("visible\n"))
        .stdout(predicate::str::contains("hidden").not())
        .stderr(predicate::str::contains("nodir/x"));
    assert_eq!(fs::read_to_string(dir.path().join("out")).unwrap(), "hidden\n");
    assert_eq!(fs::read_to_string(dir.path().join("ok")).unwrap(), "");
}

#[test]
fn test_unexecutable_program_exits_126() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("broken");
    fs::write(&script, "#!/nonexistent/interp\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    sh(&dir, "./broken")
        .assert()
        .code(126)
        .stderr(predicate::str::contains("broken: "));
}

#[test]
fn test_command_not_found() {
    let dir = TempDir::new().unwrap();
    sh(&dir, "nonexistent_cmd_xyz --flag")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nonexistent_cmd_xyz: command not found"));
}

#[test]
fn test_missing_stage_does_not_stop_siblings() {
    let dir = TempDir::new().unwrap();
    sh(&dir, "nonexistent_cmd_xyz | echo still here")
        .assert()
        .success()
        .stdout("still here\n")
        .stderr(predicate::str::contains("command not found"));
}

#[test]
fn test_type_builtin() {
    let dir = TempDir::new().unwrap();
    sh(&dir, "type cd")
        .assert()
        .success()
        .stdout("cd is a shell builtin\n");
    sh(&dir, "type nonexistent_cmd_xyz")
        .assert()
        .code(1)
        .stdout("nonexistent_cmd_xyz: not found\n");
    sh(&dir, "type sh")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("sh is /").and(predicate::str::ends_with("/sh\n")));
}

#[test]
fn test_pwd_reports_working_directory() {
    let dir = TempDir::new().unwrap();
    let expected = fs::canonicalize(dir.path()).unwrap();
    sh(&dir, "pwd")
        .assert()
        .success()
        .stdout(predicate::function(move |out: &str| {
            fs::canonicalize(out.trim_end()).ok().as_ref() == Some(&expected)
        }));
}

#[test]
fn test_exit_status() {
    let dir = TempDir::new().unwrap();
    sh(&dir, "exit 7").assert().code(7);
    sh(&dir, "exit 300").assert().code(44);
    sh(&dir, "exit nope").assert().code(0);
    sh(&dir, "sh -c 'exit 3'").assert().code(3);
}

#[test]
fn test_parse_errors() {
    let dir = TempDir::new().unwrap();
    sh(&dir, "echo 'oops")
        .assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains("unclosed single quote"));
    sh(&dir, "echo hi 2>")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expected a file name after `2>`"));
    sh(&dir, "echo hi | | cat")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("empty command"));
}

#[test]
fn test_missing_target_spawns_nothing() {
    let dir = TempDir::new().unwrap();
    sh(&dir, "touch created > ").assert().code(2);
    assert!(!dir.path().join("created").exists());
}

#[test]
fn test_quoted_pipe_still_splits() {
    let dir = TempDir::new().unwrap();
    sh(&dir, "echo 'a|b'")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unclosed single quote"));
}

#[test]
fn test_interactive_session_persists_history() {
    let dir = TempDir::new().unwrap();
    let histfile = dir.path().join("hist");
    fs::write(&histfile, "echo earlier\n").unwrap();

    let mut cmd = cargo_bin_cmd!("minish");
    cmd.current_dir(dir.path())
        .env("HISTFILE", &histfile)
        .write_stdin("echo one\nhistory\nexit 4\n")
        .assert()
        .code(4)
        .stdout(predicate::str::contains("one\n"))
        .stdout(predicate::str::contains("    1  echo earlier\n    2  echo one\n    3  history\n"));

    assert_eq!(
        fs::read_to_string(&histfile).unwrap(),
        "echo earlier\necho one\nhistory\nexit 4\n"
    );
}

#[test]
fn test_end_of_input_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    let mut cmd = cargo_bin_cmd!("minish");
    cmd.current_dir(dir.path())
        .env_remove("HISTFILE")
        .write_stdin("echo bye > out\n")
        .assert()
        .success();
    assert_eq!(fs::read_to_string(dir.path().join("out")).unwrap(), "bye\n");
}
