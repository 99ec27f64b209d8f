//! TCP/UDP port executor.
//!
//! TCP opens a socket and measures connect time. UDP sends a probe
//! datagram and waits briefly for either a reply or an ICMP
//! port-unreachable; a silent peer still counts as up. That send-without-
//! confirmed-receipt semantics is inherently best-effort and is an accepted
//! limitation of UDP probing, not a bug.

use std::io::ErrorKind;
use std::net::SocketAddr;

use pulsemon_common::types::{CheckStatus, ExecutionOutcome, PortCheckConfig, PortProtocol};
use serde_json::json;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::{timeout, Duration, Instant};

use crate::validator::TargetValidator;
use crate::{elapsed_ms, remaining, CheckError};

pub(crate) async fn execute(
    validator: &TargetValidator,
    target: &str,
    config: &PortCheckConfig,
    deadline: Instant,
) -> Result<ExecutionOutcome, CheckError> {
    validator.check_injection(target)?;
    let addr = validator.resolve_socket_addr(target, config.port).await?;

    match config.protocol {
        PortProtocol::Tcp => check_tcp(addr, deadline).await,
        PortProtocol::Udp => check_udp(addr, deadline).await,
    }
}

async fn check_tcp(addr: SocketAddr, deadline: Instant) -> Result<ExecutionOutcome, CheckError> {
    let started = Instant::now();
    match timeout(remaining(deadline), TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => {
            let connect_ms = elapsed_ms(started);
            Ok(ExecutionOutcome::new(
                CheckStatus::Up,
                connect_ms,
                json!({
                    "protocol": "tcp",
                    "resolved_ip": addr.ip().to_string(),
                    "port": addr.port(),
                    "connect_ms": connect_ms,
                }),
            ))
        }
        Ok(Err(e)) => Err(CheckError::TransientNetwork(format!(
            "tcp connect to {addr} failed: {e}"
        ))),
        Err(_) => Ok(ExecutionOutcome::new(
            CheckStatus::Timeout,
            elapsed_ms(started),
            json!({
                "protocol": "tcp",
                "resolved_ip": addr.ip().to_string(),
                "port": addr.port(),
                "reason": "connect timed out",
            }),
        )),
    }
}

async fn check_udp(addr: SocketAddr, deadline: Instant) -> Result<ExecutionOutcome, CheckError> {
    let bind_addr: SocketAddr = if addr.is_ipv4() {
        "0.0.0.0:0".parse().unwrap()
    } else {
        "[::]:0".parse().unwrap()
    };
    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|e| CheckError::TransientNetwork(format!("udp bind failed: {e}")))?;
    socket
        .connect(addr)
        .await
        .map_err(|e| CheckError::TransientNetwork(format!("udp connect failed: {e}")))?;

    let started = Instant::now();
    if let Err(e) = socket.send(b"pulsemon-probe").await {
        return Err(CheckError::TransientNetwork(format!(
            "udp send to {addr} failed: {e}"
        )));
    }

    // A reply is a bonus; an ICMP port-unreachable surfaces as a recv error
    // on the connected socket. Silence within the grace window counts as up.
    let grace = remaining(deadline).min(Duration::from_secs(1));
    let mut buf = [0u8; 512];
    let (status, reply_received, reason) = match timeout(grace, socket.recv(&mut buf)).await {
        Ok(Ok(_len)) => (CheckStatus::Up, true, None),
        Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => (
            CheckStatus::Down,
            false,
            Some("icmp port unreachable".to_string()),
        ),
        Ok(Err(e)) => (CheckStatus::Down, false, Some(e.to_string())),
        Err(_) => (CheckStatus::Up, false, None),
    };

    let mut detail = json!({
        "protocol": "udp",
        "resolved_ip": addr.ip().to_string(),
        "port": addr.port(),
        "best_effort": true,
        "reply_received": reply_received,
    });
    if let Some(reason) = reason {
        detail["reason"] = json!(reason);
    }
    Ok(ExecutionOutcome::new(status, elapsed_ms(started), detail))
}
