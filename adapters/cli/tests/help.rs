use std::process::Command;

fn help(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_maze-runner"))
        .args(args)
        .output()
        .expect("failed to launch maze-runner");
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn help_lists_every_subcommand() {
    let text = help(&["--help"]);
    for command in ["show", "validate", "run", "race"] {
        assert!(text.contains(command), "missing {command} in {text}");
    }
    assert!(text.contains("--config"));
}

#[test]
fn run_help_documents_pacing_flags() {
    let text = help(&["run", "--help"]);
    assert!(text.contains("--max-run-ms"), "{text}");
    assert!(text.contains("--instant"), "{text}");
    assert!(text.contains("--speed"), "{text}");
}
