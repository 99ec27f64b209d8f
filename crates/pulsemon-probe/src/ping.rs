//! ICMP echo executor: a single echo request with a short timeout; up iff a
//! reply arrives within the deadline.

use std::net::IpAddr;

use pulsemon_common::types::{CheckStatus, ExecutionOutcome, PingHostConfig};
use rand::random;
use serde_json::json;
use surge_ping::{PingIdentifier, PingSequence, SurgeError};
use tokio::time::Instant;

use crate::validator::TargetValidator;
use crate::{elapsed_ms, remaining, CheckError};

pub(crate) async fn execute(
    validator: &TargetValidator,
    target: &str,
    _config: &PingHostConfig,
    deadline: Instant,
) -> Result<ExecutionOutcome, CheckError> {
    // The injection guard runs before anything touches a raw socket.
    validator.check_injection(target)?;
    let ip = validator.resolve_host_ip(target).await?;

    let client_config = match ip {
        IpAddr::V4(_) => surge_ping::Config::default(),
        IpAddr::V6(_) => surge_ping::Config::builder()
            .kind(surge_ping::ICMP::V6)
            .build(),
    };
    let client = surge_ping::Client::new(&client_config).map_err(|e| {
        CheckError::TransientNetwork(format!("icmp socket unavailable: {e}"))
    })?;

    let started = Instant::now();
    let mut pinger = client.pinger(ip, PingIdentifier(random())).await;
    pinger.timeout(remaining(deadline));

    match pinger.ping(PingSequence(0), &[]).await {
        Ok((_reply, rtt)) => Ok(ExecutionOutcome::new(
            CheckStatus::Up,
            rtt.as_millis() as u64,
            json!({"resolved_ip": ip.to_string(), "rtt_ms": rtt.as_millis() as u64}),
        )),
        Err(SurgeError::Timeout { .. }) => Ok(ExecutionOutcome::new(
            CheckStatus::Timeout,
            elapsed_ms(started),
            json!({"resolved_ip": ip.to_string(), "reason": "no echo reply before deadline"}),
        )),
        Err(e) => Ok(ExecutionOutcome::new(
            CheckStatus::Down,
            elapsed_ms(started),
            json!({"resolved_ip": ip.to_string(), "reason": e.to_string()}),
        )),
    }
}
