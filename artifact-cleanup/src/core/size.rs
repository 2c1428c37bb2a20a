//! Human-readable byte sizes with binary (1024) unit steps.

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Format a byte count like `"1.50 KiB"`.
///
/// Values are divided by 1024 until they drop below 1024; anything beyond
/// the GiB range is shown in TiB.
pub fn human_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let last = UNITS.len() - 1;
    for unit in &UNITS[..last] {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} {}", UNITS[last])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_unit_step() {
        assert_eq!(human_size(0), "0.00 B");
        assert_eq!(human_size(1023), "1023.00 B");
        assert_eq!(human_size(1536), "1.50 KiB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.00 MiB");
        assert_eq!(human_size(1_073_741_824), "1.00 GiB");
    }

    #[test]
    fn caps_display_at_tib() {
        assert_eq!(human_size(1024u64.pow(4)), "1.00 TiB");
        assert_eq!(human_size(2048 * 1024u64.pow(4)), "2048.00 TiB");
    }
}
