//! Network URL constants and endpoint derivation.

use crate::error::SdkError;

/// Default WebSocket URL (local development server).
pub const DEFAULT_WS_URL: &str = "ws://localhost:5000/ws";

/// Path the update server mounts its socket on.
pub const WS_PATH: &str = "/ws";

/// Derive the socket endpoint from the origin the app was served from.
///
/// `http://host` → `ws://host/ws`, `https://host` → `wss://host/ws`.
/// Any path on the origin is discarded.
pub fn ws_url_for_origin(origin: &str) -> Result<String, SdkError> {
    let origin = origin.trim();
    let (scheme, rest) = if let Some(rest) = origin.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = origin.strip_prefix("http://") {
        ("ws", rest)
    } else {
        return Err(SdkError::Validation(format!(
            "Origin must start with http:// or https://: {}",
            origin
        )));
    };

    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(SdkError::Validation(format!("Origin has no host: {}", origin)));
    }

    Ok(format!("{}://{}{}", scheme, host, WS_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_origin_maps_to_wss() {
        assert_eq!(
            ws_url_for_origin("https://mandi.example.in").unwrap(),
            "wss://mandi.example.in/ws"
        );
    }

    #[test]
    fn test_http_origin_keeps_port_and_drops_path() {
        assert_eq!(
            ws_url_for_origin("http://localhost:5000/circles/12").unwrap(),
            "ws://localhost:5000/ws"
        );
    }

    #[test]
    fn test_rejects_unknown_scheme_and_empty_host() {
        assert!(ws_url_for_origin("ftp://host").is_err());
        assert!(ws_url_for_origin("https://").is_err());
    }
}
