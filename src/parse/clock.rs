//! Clock value helpers shared by the text and alignment formats
//!
//! Alignment times are seconds with fractional precision on the wire and
//! integer milliseconds in memory.

/// Parse a clock value into milliseconds.
///
/// Accepts plain seconds (`"1.25"`), suffixed values (`"1.25s"`, `"1250ms"`)
/// and colon clocks (`"00:01.250"`, `"0:00:01.250"`). Negative or
/// non-finite values are rejected.
pub fn parse_clock_ms(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let seconds = if value.contains(':') {
        let mut total = 0.0f64;
        for part in value.split(':') {
            let part: f64 = part.trim().parse().ok()?;
            if !part.is_finite() || part < 0.0 {
                return None;
            }
            total = total * 60.0 + part;
        }
        total
    } else if let Some(ms) = value.strip_suffix("ms") {
        ms.trim().parse::<f64>().ok()? / 1000.0
    } else {
        value.strip_suffix('s').unwrap_or(value).trim().parse::<f64>().ok()?
    };

    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some((seconds * 1000.0).round() as u64)
}

/// Format milliseconds as seconds with three decimals (`1234` -> `"1.234"`)
pub fn format_seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}
