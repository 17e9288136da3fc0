//! Process-level tests: exit codes, environment handling and signals

#![cfg(unix)]

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::process::{Command, Output, Stdio};
use std::time::Duration;

const BIN: &str = env!("CARGO_BIN_EXE_http-echo");

fn run(args: &[&str], echo_text: Option<&str>) -> Output {
    let mut cmd = Command::new(BIN);
    cmd.args(args).env_remove("ECHO_TEXT");
    if let Some(text) = echo_text {
        cmd.env("ECHO_TEXT", text);
    }
    cmd.output().expect("Failed to run http-echo")
}

/// Reserve a free local port; the listener is dropped before the child binds it
fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind port finder listener");
    listener.local_addr().expect("bound address")
}

/// Wait for the child to accept connections, with exponential backoff
async fn wait_for_server(addr: SocketAddr, max_retries: u32) {
    let mut delay = Duration::from_millis(10);

    for attempt in 1..=max_retries {
        match TcpStream::connect(addr) {
            Ok(_) => return,
            Err(_) if attempt < max_retries => {
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_millis(200));
            }
            Err(e) => panic!("Server not ready after {} attempts: {}", max_retries, e),
        }
    }
}

async fn spawn_server(args: &[&str], echo_text: Option<&str>) -> (tokio::process::Child, SocketAddr) {
    let addr = free_addr();
    let listen = format!("-listen={}", addr);

    let mut cmd = tokio::process::Command::new(BIN);
    cmd.arg(&listen)
        .args(args)
        .env_remove("ECHO_TEXT")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    if let Some(text) = echo_text {
        cmd.env("ECHO_TEXT", text);
    }

    let child = cmd.spawn().expect("Failed to spawn http-echo");
    wait_for_server(addr, 20).await;
    (child, addr)
}

fn send_signal(child: &tokio::process::Child, signal: libc::c_int) {
    let pid = child.id().expect("child should still be running") as libc::pid_t;
    // SAFETY: pid belongs to a child we spawned and have not reaped
    let rc = unsafe { libc::kill(pid, signal) };
    assert_eq!(rc, 0, "kill() failed");
}

#[test]
fn test_version_prints_and_exits_zero() {
    let output = run(&["-version"], None);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("http-echo v"), "unexpected version: {}", stdout);
}

#[test]
fn test_missing_text_exits_127() {
    let output = run(&[], None);

    assert_eq!(output.status.code(), Some(127));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Missing -text option or ECHO_TEXT env var!"));
}

#[test]
fn test_extra_arguments_exit_127() {
    let output = run(&["-text=hi", "extra"], None);

    assert_eq!(output.status.code(), Some(127));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Too many arguments!"));
}

#[test]
fn test_listener_failure_exits_1() {
    // ARRANGE: occupy the port
    let taken = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let listen = format!("-listen={}", taken.local_addr().unwrap());

    // ACT
    let output = run(&[&listen, "-text=hi"], None);

    // ASSERT
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to create listener"));
}

#[test]
fn test_transparent_without_privilege_exits_1() {
    // SAFETY: geteuid has no preconditions
    if unsafe { libc::geteuid() } == 0 {
        // Root normally holds CAP_NET_ADMIN, so the option would succeed
        return;
    }

    let output = run(&["-listen=127.0.0.1:0", "-text=hi", "-transparent"], None);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("IP_TRANSPARENT"));
}

#[tokio::test]
async fn test_env_text_is_served() {
    let (mut child, addr) = spawn_server(&[], Some("hello")).await;

    let response = reqwest::get(format!("http://{}/", addr))
        .await
        .expect("Failed to connect to http-echo");
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "hello\n");

    child.kill().await.expect("Failed to kill http-echo");
}

#[tokio::test]
async fn test_text_flag_wins_over_env() {
    let (mut child, addr) = spawn_server(&["-text=world", "-status-code=418"], Some("hello")).await;

    let response = reqwest::get(format!("http://{}/", addr))
        .await
        .expect("Failed to connect to http-echo");
    assert_eq!(response.status(), 418);
    assert_eq!(response.text().await.unwrap(), "world\n");

    child.kill().await.expect("Failed to kill http-echo");
}

#[tokio::test]
async fn test_unrepresentable_status_code_still_serves() {
    for code in ["-status-code=42", "-status-code=-1"] {
        let (mut child, addr) = spawn_server(&["-text=hi", code], None).await;

        let health = reqwest::get(format!("http://{}/health", addr))
            .await
            .expect("Failed to connect to http-echo");
        assert_eq!(health.status(), 200, "{} should not prevent startup", code);

        let echo = reqwest::get(format!("http://{}/", addr))
            .await
            .expect("Failed to connect to http-echo");
        assert_eq!(echo.status(), 500);

        child.kill().await.expect("Failed to kill http-echo");
    }
}

#[tokio::test]
async fn test_sigterm_exits_2() {
    // ARRANGE
    let (mut child, addr) = spawn_server(&["-text=bye"], None).await;

    // ACT
    send_signal(&child, libc::SIGTERM);
    let status = tokio::time::timeout(Duration::from_secs(6), child.wait())
        .await
        .expect("should exit within the shutdown bound")
        .expect("Failed to wait for http-echo");

    // ASSERT: interrupt exit code, listener gone
    assert_eq!(status.code(), Some(2));
    assert!(TcpStream::connect(addr).is_err());
}

#[tokio::test]
async fn test_sigint_exits_2() {
    let (mut child, _addr) = spawn_server(&["-text=bye"], None).await;

    send_signal(&child, libc::SIGINT);
    let status = tokio::time::timeout(Duration::from_secs(6), child.wait())
        .await
        .expect("should exit within the shutdown bound")
        .expect("Failed to wait for http-echo");

    assert_eq!(status.code(), Some(2));
}
