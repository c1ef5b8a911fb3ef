// Drives the compiled binary through a PTY to exercise the real event loop
// and crossterm input handling.
//
// Notes:
// - Requires a TTY; uses expectrl which allocates a pseudo terminal.
// - Unix-only and ignored by default.
// - Run manually via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn minimal_session_completes_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let prompt = dir.path().join("prompt.txt");
    std::fs::write(&prompt, "hi\n")?;
    let db = dir.path().join("kata.db");

    let bin = assert_cmd::cargo::cargo_bin("kata");
    let cmd = format!(
        "{} --db {} --file {}",
        bin.display(),
        db.display(),
        prompt.display()
    );

    let mut p = spawn(cmd)?;

    // give the app a moment to enter the alternate screen
    std::thread::sleep(Duration::from_millis(200));
    p.send("hi")?;
    std::thread::sleep(Duration::from_millis(200));

    // results screen: quit
    p.send("\x1b")?;
    p.expect(Eof)?;

    let db = kata::StatsDb::open(&db)?;
    assert_eq!(db.session_count()?, 1);
    Ok(())
}
