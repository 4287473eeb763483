//! End-to-end TCP-driven tests covering whole-program scenarios against
//! a real listener on an ephemeral port.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use ward_engine::Database;

async fn start_server() -> (u16, CancellationToken) {
    let shutdown = CancellationToken::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let db = Database::new("admin");
    let token = shutdown.clone();
    tokio::spawn(async move {
        let _ = ward_server::listener::serve(port, db, Duration::from_secs(5), Duration::from_secs(5), token).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    (port, shutdown)
}

async fn send_program(port: u16, program: &str) -> Vec<String> {
    let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    write_half.write_all(program.as_bytes()).await.unwrap();

    let mut lines = BufReader::new(read_half).lines();
    let expected = program.lines().filter(|l| !l.trim().is_empty() && l.trim() != "***").count();
    let mut out = Vec::new();
    for _ in 0..expected {
        match tokio::time::timeout(Duration::from_secs(2), lines.next_line()).await {
            Ok(Ok(Some(line))) => out.push(line),
            _ => break,
        }
    }
    out
}

#[tokio::test]
async fn auth_failure_then_exit_scenario() {
    let (port, _shutdown) = start_server().await;
    let out = send_program(port, "as principal admin password \"wrong\" do\nexit\n***\n").await;
    assert_eq!(out.len(), 1);
    assert!(out[0].contains("DENIED"));
}

#[tokio::test]
async fn create_set_and_read_back_over_two_connections() {
    let (port, shutdown) = start_server().await;
    let setup = "as principal admin password \"admin\" do\ncreate principal alice \"pw\"\nset x = \"hello\"\nset delegation x admin read -> alice\nexit\n***\n";
    let out = send_program(port, setup).await;
    assert!(out.iter().all(|line| !line.contains("DENIED") && !line.contains("FAILED")));

    let read = "as principal alice password \"pw\" do\nreturn x\nexit\n***\n";
    let out = send_program(port, read).await;
    assert!(out[0].contains("\"RETURNING\""));
    assert!(out[0].contains("hello"));
    shutdown.cancel();
}

#[tokio::test]
async fn unauthorized_read_is_denied() {
    let (port, shutdown) = start_server().await;
    let setup = "as principal admin password \"admin\" do\ncreate principal bob \"pw\"\nset secret = \"s\"\nexit\n***\n";
    send_program(port, setup).await;

    let read = "as principal bob password \"pw\" do\nreturn secret\nexit\n***\n";
    let out = send_program(port, read).await;
    assert!(out[0].contains("DENIED"));
    shutdown.cancel();
}

#[tokio::test]
async fn exit_command_shuts_the_whole_server_down() {
    let (port, shutdown) = start_server().await;
    let program = "as principal admin password \"admin\" do\nexit\n***\n";
    send_program(port, program).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(shutdown.is_cancelled());
}
