//! SSRF and injection guard consulted before every network call.
//!
//! User-supplied targets must never reach internal infrastructure
//! (loopback, RFC 1918, link-local, ULA) unless the deployment explicitly
//! opts in, and host-style targets must never carry shell metacharacters
//! into a socket or subprocess call. Every rejection is a typed
//! [`CheckError`], never an exception that escapes the worker.

use std::net::{IpAddr, SocketAddr};

use crate::CheckError;

/// Characters that have meaning to a shell. Hostnames and IPs never contain
/// any of these, so their presence marks an injection attempt.
const SHELL_METACHARACTERS: &[char] = &[
    ';', '|', '&', '$', '`', '>', '<', '(', ')', '{', '}', '[', ']', '\\', '\'', '"', '!', '#',
    '~', '*', '?',
];

pub struct TargetValidator {
    allow_internal: bool,
}

impl TargetValidator {
    pub fn new(allow_internal: bool) -> Self {
        Self { allow_internal }
    }

    pub fn allows_internal(&self) -> bool {
        self.allow_internal
    }

    /// Rejects host-style targets (ping/port) containing shell
    /// metacharacters, whitespace, or control characters.
    pub fn check_injection(&self, target: &str) -> Result<(), CheckError> {
        if target.trim().is_empty() {
            return Err(CheckError::Validation("target is empty".to_string()));
        }
        if let Some(c) = target
            .chars()
            .find(|c| SHELL_METACHARACTERS.contains(c) || c.is_whitespace() || c.is_control())
        {
            return Err(CheckError::SecurityRejection(format!(
                "target contains forbidden character {c:?}"
            )));
        }
        Ok(())
    }

    /// Parses and screens an HTTP(S) URL target. Returns the parsed URL and
    /// the first resolved address.
    pub async fn validate_url(&self, target: &str) -> Result<(reqwest::Url, IpAddr), CheckError> {
        let url = reqwest::Url::parse(target)
            .map_err(|e| CheckError::Validation(format!("invalid url '{target}': {e}")))?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(CheckError::Validation(format!(
                    "unsupported url scheme '{other}'"
                )))
            }
        }
        let host = url
            .host_str()
            .ok_or_else(|| CheckError::Validation("url has no host".to_string()))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(80);
        let ip = self.resolve_and_screen(&host, port).await?;
        Ok((url, ip))
    }

    /// Resolves a bare host (ping targets) and screens the addresses.
    pub async fn resolve_host_ip(&self, host: &str) -> Result<IpAddr, CheckError> {
        self.resolve_and_screen(host, 0).await
    }

    /// Resolves host:port (port-check targets) and screens the addresses.
    pub async fn resolve_socket_addr(
        &self,
        host: &str,
        port: u16,
    ) -> Result<SocketAddr, CheckError> {
        let ip = self.resolve_and_screen(host, port).await?;
        Ok(SocketAddr::new(ip, port))
    }

    /// Every resolved address is screened, not just the first: a hostname
    /// with one public and one internal A record is rejected outright.
    async fn resolve_and_screen(&self, host: &str, port: u16) -> Result<IpAddr, CheckError> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| CheckError::Validation(format!("dns resolution failed for '{host}': {e}")))?
            .collect();
        let first = addrs
            .first()
            .ok_or_else(|| {
                CheckError::Validation(format!("'{host}' resolved to no addresses"))
            })?
            .ip();
        if !self.allow_internal {
            if let Some(bad) = addrs.iter().find(|a| is_internal(&a.ip())) {
                return Err(CheckError::SecurityRejection(format!(
                    "'{host}' resolves to internal address {}",
                    bad.ip()
                )));
            }
        }
        Ok(first)
    }
}

/// Loopback, private, link-local, unspecified, broadcast, and v6 ULA ranges
/// count as internal. v4-mapped v6 addresses are screened as their v4 form.
pub fn is_internal(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_internal(&IpAddr::V4(mapped));
            }
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // link-local
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // unique local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict() -> TargetValidator {
        TargetValidator::new(false)
    }

    #[test]
    fn internal_ranges_are_classified() {
        for addr in [
            "127.0.0.1",
            "10.0.0.1",
            "172.16.4.1",
            "192.168.1.1",
            "169.254.169.254",
            "0.0.0.0",
            "::1",
            "fe80::1",
            "fd12:3456::1",
            "::ffff:127.0.0.1",
        ] {
            let ip: IpAddr = addr.parse().unwrap();
            assert!(is_internal(&ip), "{addr} should be internal");
        }
        for addr in ["1.1.1.1", "93.184.216.34", "2606:4700::1111"] {
            let ip: IpAddr = addr.parse().unwrap();
            assert!(!is_internal(&ip), "{addr} should be external");
        }
    }

    #[tokio::test]
    async fn loopback_target_rejected_without_flag() {
        let err = strict().resolve_host_ip("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, CheckError::SecurityRejection(_)), "{err}");

        let err = strict()
            .resolve_host_ip("169.254.169.254")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::SecurityRejection(_)), "{err}");
    }

    #[tokio::test]
    async fn loopback_target_allowed_with_flag() {
        let validator = TargetValidator::new(true);
        let ip = validator.resolve_host_ip("127.0.0.1").await.unwrap();
        assert_eq!(ip, "127.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn url_validation_rejects_internal_and_bad_schemes() {
        let err = strict()
            .validate_url("http://127.0.0.1/metrics")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::SecurityRejection(_)), "{err}");

        let err = strict().validate_url("ftp://example.com").await.unwrap_err();
        assert!(matches!(err, CheckError::Validation(_)), "{err}");

        let err = strict().validate_url("not a url").await.unwrap_err();
        assert!(matches!(err, CheckError::Validation(_)), "{err}");
    }

    #[test]
    fn injection_attempts_are_rejected_before_any_socket_call() {
        let v = strict();
        for target in [
            "example.com; rm -rf /",
            "example.com`id`",
            "host|cat /etc/passwd",
            "host$(whoami)",
            "host > /tmp/x",
            "host\nping",
        ] {
            let err = v.check_injection(target).unwrap_err();
            assert!(
                matches!(err, CheckError::SecurityRejection(_)),
                "{target} should be rejected, got {err}"
            );
        }
        assert!(v.check_injection("example.com").is_ok());
        assert!(v.check_injection("192.0.2.7").is_ok());
        assert!(v.check_injection("2606:4700::1111").is_ok());
    }
}
