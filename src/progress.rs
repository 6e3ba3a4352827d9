//! Progress rendering for log output
//!
//! Transfers log a compact picture of where their piece window sits and how
//! far the payload has come. The bars are fixed-width so interleaved log
//! lines stay comparable at a glance.

/// Rendered width of a bar, in cells
const BAR_WIDTH: usize = 20;

/// Render the position of a piece window inside the whole piece space
///
/// Cells covered by `[start, end)` show `=`, the rest `.`, e.g.
/// `[....====............]` for `[20, 40)` of 100 pieces.
pub fn scale_bar(start: u32, end: u32, total: u32) -> String {
    let mut cells = ['.'; BAR_WIDTH];
    if total > 0 && start < end {
        let width = BAR_WIDTH as u64;
        let lo = (start as u64 * width / total as u64) as usize;
        let hi = (end as u64 * width).div_ceil(total as u64) as usize;
        for cell in cells.iter_mut().take(hi.min(BAR_WIDTH)).skip(lo) {
            *cell = '=';
        }
    }
    format!("[{}]", cells.iter().collect::<String>())
}

/// Render overall completion with a percentage, e.g.
/// `[==========..........] 50%`
pub fn progress_bar(current: u64, total: u64) -> String {
    let percent = if total == 0 {
        100
    } else {
        // Widen before multiplying; byte counts near u64::MAX would overflow
        (current.min(total) as u128 * 100 / total as u128) as usize
    };
    let filled = BAR_WIDTH * percent / 100;
    let mut cells = ['.'; BAR_WIDTH];
    for cell in cells.iter_mut().take(filled) {
        *cell = '=';
    }
    format!("[{}] {}%", cells.iter().collect::<String>(), percent)
}

/// Humanize a byte count, e.g. `1.5 MiB`
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_bar_marks_window() {
        assert_eq!(scale_bar(20, 40, 100), "[....====............]");
        assert_eq!(scale_bar(0, 100, 100), "[====================]");
        assert_eq!(scale_bar(0, 0, 100), "[....................]");
        assert_eq!(scale_bar(0, 10, 0), "[....................]");
    }

    #[test]
    fn test_scale_bar_small_piece_space() {
        // 4 pieces, window [1, 2): a quarter of the bar lights up
        assert_eq!(scale_bar(1, 2, 4), "[.....=====..........]");
    }

    #[test]
    fn test_progress_bar_percentages() {
        assert_eq!(progress_bar(0, 100), "[....................] 0%");
        assert_eq!(progress_bar(50, 100), "[==========..........] 50%");
        assert_eq!(progress_bar(100, 100), "[====================] 100%");
        assert_eq!(progress_bar(150, 100), "[====================] 100%");
        assert_eq!(progress_bar(0, 0), "[====================] 100%");
    }

    #[test]
    fn test_progress_bar_huge_totals() {
        assert_eq!(progress_bar(u64::MAX / 2, u64::MAX), "[=========...........] 49%");
        assert_eq!(progress_bar(u64::MAX, u64::MAX), "[====================] 100%");
    }

    #[test]
    fn test_human_bytes_units() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(1023), "1023 B");
        assert_eq!(human_bytes(1024), "1.0 KiB");
        assert_eq!(human_bytes(1536), "1.5 KiB");
        assert_eq!(human_bytes(1024 * 1024), "1.0 MiB");
        assert_eq!(human_bytes(5 * 1024 * 1024 * 1024), "5.0 GiB");
    }
}
