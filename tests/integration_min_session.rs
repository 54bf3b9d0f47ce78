// Minimal integration test that drives the compiled binary through a PTY.
// This exercises the real event loop and crossterm input handling across
// the main boundaries without relying on internal modules.
//
// Notes:
// - Requires a TTY; uses expectrl which allocates a pseudo terminal.
// - Marked Unix-only and ignored by default to avoid CI/platform issues.
// - Run manually via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn checks_screen_starts_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let home = tempfile::tempdir()?;
    let bin = assert_cmd::cargo::cargo_bin("reckon");
    let cmd = format!(
        "env HOME={} {} --seed 1 --config {}",
        home.path().display(),
        bin.display(),
        home.path().join("config.json").display()
    );

    let mut p = spawn(cmd)?;

    // Give the app a moment to run the pre-checks and draw
    std::thread::sleep(Duration::from_millis(300));

    // Re-run the checks, then try to continue to the instructions
    p.send("c")?;
    std::thread::sleep(Duration::from_millis(100));
    p.send("\r")?;
    std::thread::sleep(Duration::from_millis(100));

    // ESC quits from every screen
    p.send("\x1b")?;

    p.expect(Eof)?;
    Ok(())
}
