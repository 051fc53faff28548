//! Banner grabbing for open TCP connections.
//!
//! Reads whatever a service volunteers right after the handshake. Nothing
//! is ever written to the socket, and a silent service is not an error.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

/// Default maximum bytes to read for a banner.
pub const DEFAULT_MAX_BANNER_BYTES: usize = 1024;

/// Read an unsolicited greeting from `stream`.
///
/// At most `max_bytes` are read in a single read, bounded by `wait`.
/// Returns `None` when the service stays quiet, closes the connection,
/// sends something that is not valid UTF-8, or sends only whitespace.
pub async fn grab_banner<S>(stream: &mut S, max_bytes: usize, wait: Duration) -> Option<String>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; max_bytes.max(1)];

    match timeout(wait, stream.read(&mut buffer)).await {
        Ok(Ok(n)) if n > 0 => decode_banner(&buffer[..n]),
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "banner read failed");
            None
        }
        Err(_) => None,
    }
}

/// Decode raw banner bytes, trimming trailing whitespace and control
/// characters.
///
/// A character cut off by the read cap is dropped; any other invalid UTF-8
/// means no banner.
pub fn decode_banner(data: &[u8]) -> Option<String> {
    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(e) if e.error_len().is_none() => {
            std::str::from_utf8(&data[..e.valid_up_to()]).ok()?
        }
        Err(_) => return None,
    };
    let trimmed = text.trim_end_matches(|c: char| c.is_whitespace() || c.is_control());
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_trims_line_ending() {
        assert_eq!(
            decode_banner(b"SSH-2.0-OpenSSH_8.9\r\n").as_deref(),
            Some("SSH-2.0-OpenSSH_8.9")
        );
    }

    #[test]
    fn test_decode_trims_trailing_controls_only() {
        assert_eq!(
            decode_banner(b"  220 ftp ready\x00\x07\n").as_deref(),
            Some("  220 ftp ready")
        );
    }

    #[test]
    fn test_invalid_utf8_yields_nothing() {
        assert_eq!(decode_banner(b"\xff\xfe\x00binary"), None);
    }

    #[test]
    fn test_character_cut_by_cap_is_dropped() {
        let mut data = vec![b'a'; 1023];
        data.push("é".as_bytes()[0]);
        let banner = decode_banner(&data).unwrap();
        assert_eq!(banner.len(), 1023);
        assert!(banner.bytes().all(|b| b == b'a'));

        assert_eq!(decode_banner("220 café".as_bytes()).as_deref(), Some("220 café"));
        assert_eq!(decode_banner(b"220 caf\xc3\xa9\xff more"), None);
    }

    #[test]
    fn test_whitespace_only_yields_nothing() {
        assert_eq!(decode_banner(b"\r\n\t "), None);
    }

    #[tokio::test]
    async fn test_grab_reads_at_most_cap() {
        let mut stream: &[u8] = b"0123456789abcdef";
        let banner = grab_banner(&mut stream, 4, Duration::from_millis(100)).await;
        assert_eq!(banner.as_deref(), Some("0123"));
    }

    #[tokio::test]
    async fn test_grab_times_out_quietly() {
        let (mut client, _server) = tokio::io::duplex(64);
        let banner = grab_banner(&mut client, 64, Duration::from_millis(30)).await;
        assert_eq!(banner, None);
    }

    #[tokio::test]
    async fn test_grab_on_closed_stream() {
        let mut stream: &[u8] = b"";
        assert_eq!(grab_banner(&mut stream, 64, Duration::from_millis(30)).await, None);
    }
}
