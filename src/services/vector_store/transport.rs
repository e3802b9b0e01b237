//! Transport-security policy for store credentials.

use std::net::IpAddr;

use reqwest::Url;

use crate::error::VectorStoreError;

/// How a configured credential will travel to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSecurity {
    /// No credential configured.
    NoCredential,
    /// Credential over https.
    Encrypted,
    /// Credential over plaintext to a loopback host.
    LocalPlaintext,
}

/// True for `localhost` and loopback addresses.
///
/// Accepts the host as printed in a URL, so IPv6 may be bracketed.
pub fn is_local_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    bare.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

/// Decide whether a credential may be sent to `url`.
///
/// Without a credential nothing is at stake and the check always passes.
/// With one, plaintext is only tolerated for local hosts.
pub fn check_transport(url: &Url, has_credential: bool) -> Result<TransportSecurity, VectorStoreError> {
    if !has_credential {
        return Ok(TransportSecurity::NoCredential);
    }
    if url.scheme() == "https" {
        return Ok(TransportSecurity::Encrypted);
    }

    if is_local_host(url.host_str().unwrap_or_default()) {
        tracing::warn!(
            url = %url,
            "sending Qdrant API key over plaintext HTTP to a local host"
        );
        return Ok(TransportSecurity::LocalPlaintext);
    }

    Err(VectorStoreError::InsecureTransport {
        host: url.host_str().unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_remote_plaintext_with_key_rejected() {
        let err = check_transport(&url("http://qdrant.example.com:6333"), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecurityPolicy);
        assert!(err.to_string().contains("qdrant.example.com"));
    }

    #[test]
    fn test_local_plaintext_with_key_allowed() {
        for local in [
            "http://localhost:6333",
            "http://LOCALHOST:6333",
            "http://127.0.0.1:6333",
            "http://127.1.2.3:6333",
            "http://[::1]:6333",
        ] {
            assert_eq!(
                check_transport(&url(local), true).unwrap(),
                TransportSecurity::LocalPlaintext,
                "{local}"
            );
        }
    }

    #[test]
    fn test_https_with_key_allowed() {
        assert_eq!(
            check_transport(&url("https://qdrant.example.com"), true).unwrap(),
            TransportSecurity::Encrypted
        );
    }

    #[test]
    fn test_no_key_never_fails() {
        assert_eq!(
            check_transport(&url("http://qdrant.example.com:6333"), false).unwrap(),
            TransportSecurity::NoCredential
        );
    }

    #[test]
    fn test_lookalike_hosts_are_remote() {
        assert!(!is_local_host("localhost.example.com"));
        assert!(!is_local_host("10.0.0.5"));
        assert!(!is_local_host("::2"));
        assert!(is_local_host("[::1]"));
    }
}
