/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::format
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Human-readable rendering of byte sizes and transfer speeds
    for operator-facing status lines.

  Security / Safety Notes:
    Pure formatting; no I/O performed in this module.

  Dependencies:
    None beyond std.

  Operational Scope:
    Used by the session prompt text and the download status
    messages.

  Revision History:
    2026-10-12 COD  Added size and speed formatting.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic output for identical input
============================================================*/

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Render a byte count, e.g. `1.50 MB`.
pub fn display_size(bytes: u64) -> String {
    scaled(bytes as f64)
}

/// Render a bytes-per-second rate, e.g. `512.00 KB/s`.
pub fn display_speed(bytes_per_sec: f64) -> String {
    let rate = if bytes_per_sec.is_finite() && bytes_per_sec > 0.0 {
        bytes_per_sec
    } else {
        0.0
    };
    format!("{}/s", scaled(rate))
}

fn scaled(mut value: f64) -> String {
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", value.round() as u64, UNITS[0])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_pick_largest_unit() {
        assert_eq!(display_size(0), "0 B");
        assert_eq!(display_size(1023), "1023 B");
        assert_eq!(display_size(1536), "1.50 KB");
        assert_eq!(display_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn speeds_clamp_bad_input() {
        assert_eq!(display_speed(2048.0), "2.00 KB/s");
        assert_eq!(display_speed(f64::NAN), "0 B/s");
        assert_eq!(display_speed(-5.0), "0 B/s");
    }
}
