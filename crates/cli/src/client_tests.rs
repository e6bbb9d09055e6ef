// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn timeouts_honor_defaults() {
    assert_eq!(timeout_ipc(), Duration::from_secs(5));
    assert_eq!(poll_interval(), Duration::from_millis(50));
}

#[test]
fn connect_without_socket_reports_not_running() {
    let dir = tempfile::tempdir().unwrap();
    // The default socket dir won't have a socket for a fresh temp dir either;
    // no env override needed, the project hash is unique to this path.
    let result = DaemonClient::connect(dir.path().to_path_buf());
    assert!(matches!(result, Err(ClientError::DaemonNotRunning)));
}

// One test covers everything that depends on XDG_STATE_HOME: env mutation
// is process-global, so splitting these would race under parallel testing.
#[test]
fn state_dir_lookups_and_startup_errors() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("XDG_STATE_HOME", dir.path());

    // No PID file yet.
    let pid = read_daemon_pid(dir.path()).unwrap();
    assert!(pid.is_none());

    // Startup errors are read from the tail of the last startup attempt.
    let daemon_dir = get_daemon_dir(dir.path()).unwrap();
    std::fs::create_dir_all(&daemon_dir).unwrap();
    std::fs::write(
        daemon_dir.join("daemon.log"),
        "--- skd: starting (pid: 1) ---\n\
         old noise\n\
         --- skd: starting (pid: 2) ---\n\
         2026-01-01T00:00:00Z ERROR skd: Failed to start daemon: no [[studio]] entries configured\n",
    )
    .unwrap();

    let err = read_startup_error(dir.path()).unwrap();
    assert!(err.contains("no [[studio]] entries configured"));

    // PID file round trip.
    std::fs::write(daemon_dir.join("daemon.pid"), "12345\n").unwrap();
    assert_eq!(read_daemon_pid(dir.path()).unwrap(), Some(12345));

    std::env::remove_var("XDG_STATE_HOME");
}

#[test]
fn nonexistent_process_is_not_running() {
    assert!(!process_exists(4_000_000));
}
