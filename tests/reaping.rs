//! Wait accounting: every child forked for a pipeline is reaped before the
//! pipeline returns. Kept in its own test binary so no other test forks
//! concurrently.

use minish::Interpreter;
use minish::env::Environment;
use minish::parser::parse_line;
use minish::pipeline::{self, ChildSignals, Launch, Stage};
use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, waitpid};
use std::ffi::OsStr;
use std::fs;
use tempfile::TempDir;

fn no_children_left() -> bool {
    waitpid(None, Some(WaitPidFlag::WNOHANG)) == Err(Errno::ECHILD)
}

#[test]
fn pipelines_leave_no_zombies() {
    let dir = TempDir::new().unwrap();
    let mut env = Environment::new();
    env.current_dir = fs::canonicalize(dir.path()).unwrap();

    let line = r"printf 'b\na\nc\n' | sort | head -n 2 > out";
    let parsed = parse_line(line).unwrap().unwrap();
    let search_paths = env.get_var("PATH").unwrap_or_default().to_string();
    let stages = parsed
        .commands
        .iter()
        .map(|command| Stage {
            command,
            launch: minish::external::find_command_path(OsStr::new(&search_paths), command.name())
                .map_or(Launch::NotFound, Launch::External),
        })
        .collect();

    let run = pipeline::run(stages, &mut env, ChildSignals::Inherit).unwrap();
    assert_eq!(run.spawned, 3);
    assert_eq!(run.statuses, vec![0, 0, 0]);
    assert_eq!(fs::read_to_string(dir.path().join("out")).unwrap(), "a\nb\n");
    assert!(no_children_left());

    // an unresolved stage and a failing stage are reaped the same way
    let mut sh = Interpreter::default().with_env(env);
    let code = sh.execute_line("nonexistent_cmd_xyz 2> err | false | true");
    assert_eq!(code, 0);
    assert!(no_children_left());
    assert!(
        fs::read_to_string(dir.path().join("err"))
            .unwrap()
            .contains("nonexistent_cmd_xyz: command not found")
    );
}
