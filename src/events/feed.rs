//! # Text signal feed.
//!
//! [`feed_signals`] reads `<topic> <payload>` lines from an async reader and
//! publishes each one on the [`Bus`]. It stands in for the real producers
//! (input, top-app and offscreen monitors) when driving the daemon by hand.
//!
//! ## Rules
//! - Lines are trimmed; blank and `#` lines are skipped.
//! - A line that does not parse is logged and skipped.
//! - The feed ends at EOF; read errors are returned.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use super::bus::Bus;
use super::signal::Signal;

/// Publishes every signal line of `reader` on `bus` until EOF.
///
/// Returns the number of published signals.
pub async fn feed_signals<R>(reader: R, bus: &Bus) -> io::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut published = 0;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<Signal>() {
            Ok(signal) => {
                bus.publish(&signal);
                published += 1;
            }
            Err(e) => warn!(reason = e.as_label(), "ignored input '{line}': {e}"),
        }
    }
    debug!(published, "signal feed closed");
    Ok(published)
}
