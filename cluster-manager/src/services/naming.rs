//! Naming service reachability check

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

use shared::{process_debug, ProcessId};

use crate::error::SetupError;

/// Check that something accepts TCP connections at `host:port`
pub async fn probe_naming_service(host: &str, port: u16, wait: Duration) -> Result<(), SetupError> {
    let unreachable = |source: std::io::Error| SetupError::NamingUnreachable {
        host: host.to_string(),
        port,
        source,
    };

    match timeout(wait, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => {
            process_debug!(ProcessId::current(), "✅ Naming service reachable at {}:{}", host, port);
            Ok(())
        }
        Ok(Err(e)) => Err(unreachable(e)),
        Err(_) => Err(unreachable(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("no answer within {wait:?}"),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = probe_naming_service("127.0.0.1", port, Duration::from_secs(2)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_probe_reports_unreachable() {
        // Grab a free port, then close it so nothing is listening
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = probe_naming_service("127.0.0.1", port, Duration::from_secs(2)).await;
        match result {
            Err(SetupError::NamingUnreachable { port: p, .. }) => assert_eq!(p, port),
            other => panic!("expected NamingUnreachable, got {other:?}"),
        }
    }
}
