//! Smoke tests driving the built binary end to end.

use std::process::Command;

use tempfile::TempDir;

fn ngramflow() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ngramflow"))
}

#[test]
fn list_prints_the_shard_urls() {
    let output = ngramflow().args(["list", "2"]).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 10 + 10 + 26 * 27);
    assert!(lines[0].ends_with("googlebooks-eng-all-2gram-20120701-0.gz"));
    assert!(lines.last().unwrap().ends_with("-zz.gz"));
}

#[test]
fn fully_resumed_index_run_prints_the_confirmation() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("list.txt"), "a.gz\nb.gz\n").unwrap();
    std::fs::write(dir.path().join("paths_done"), "a.gz\nb.gz\n").unwrap();

    // The backend is never launched when everything is already complete,
    // so the default java command being absent does not matter
    let output = ngramflow()
        .current_dir(dir.path())
        .args([
            "index",
            "--index",
            "idx",
            "--list",
            "list.txt",
            "--ledger",
            "paths_done",
        ])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // Even a nothing-to-do run must end with the confirmation lines
    let stdout = String::from_utf8_lossy(&output.stdout);
    let exited = stdout.find("Exited").expect("missing Exited line");
    let confirmed = stdout
        .find("Index should not be corrupted")
        .expect("missing confirmation line");
    assert!(exited < confirmed);
}
