//! Unit-aware number formatting for labels and tooltips.

const BYTE_SUFFIXES: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
const BIT_SUFFIXES: [&str; 6] = ["b", "Kb", "Mb", "Gb", "Tb", "Pb"];
const BPS_SUFFIXES: [&str; 5] = ["bps", "Kbps", "Mbps", "Gbps", "Tbps"];
const SHORT_SUFFIXES: [&str; 5] = ["", "K", "Mil", "Bil", "Tri"];

/// Upper bound for explicit `decimals`.
pub const MAX_DECIMALS: u32 = 20;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 3600.0;
const DAY: f64 = 86_400.0;
const WEEK: f64 = 604_800.0;
const YEAR: f64 = 31_536_000.0;

fn trim_trailing_zeros_and_dot(s: &mut String) {
    if !s.contains('.') {
        return;
    }
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
}

/// Fixed `decimals` (capped at [`MAX_DECIMALS`]) when given, otherwise at most two decimals with
/// trailing zeros trimmed.
pub fn format_number(value: f64, decimals: Option<u32>) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }
    let mut out = match decimals {
        Some(d) => format!("{:.*}", d.min(MAX_DECIMALS) as usize, value),
        None => {
            let mut s = format!("{value:.2}");
            trim_trailing_zeros_and_dot(&mut s);
            s
        }
    };
    if out.starts_with('-') && out[1..].chars().all(|c| c == '0' || c == '.') {
        out.remove(0);
    }
    out
}

fn scaled(value: f64, step: f64, suffixes: &[&str], decimals: Option<u32>) -> String {
    let mut scaled = value;
    let mut idx = 0usize;
    while scaled.abs() >= step && idx + 1 < suffixes.len() {
        scaled /= step;
        idx += 1;
    }
    let number = format_number(scaled, decimals);
    match suffixes[idx] {
        "" => number,
        suffix => format!("{number} {suffix}"),
    }
}

fn duration_from_seconds(seconds: f64, decimals: Option<u32>) -> String {
    let abs = seconds.abs();
    let (divisor, suffix) = if abs < MINUTE {
        (1.0, "s")
    } else if abs < HOUR {
        (MINUTE, "min")
    } else if abs < DAY {
        (HOUR, "hour")
    } else if abs < WEEK {
        (DAY, "day")
    } else if abs < YEAR {
        (WEEK, "week")
    } else {
        (YEAR, "year")
    };
    format!("{} {suffix}", format_number(seconds / divisor, decimals))
}

/// Formats `value` for display according to `unit`.
///
/// Unknown units are appended verbatim after the number.
pub fn format_value(value: f64, unit: Option<&str>, decimals: Option<u32>) -> String {
    if !value.is_finite() {
        return format_number(value, decimals);
    }
    let unit = unit.map(str::trim).unwrap_or("");
    match unit {
        "" | "none" => format_number(value, decimals),
        "bytes" => scaled(value, 1024.0, &BYTE_SUFFIXES, decimals),
        "decbytes" => scaled(value, 1000.0, &BYTE_SUFFIXES, decimals),
        "bits" => scaled(value, 1000.0, &BIT_SUFFIXES, decimals),
        "bps" => scaled(value, 1000.0, &BPS_SUFFIXES, decimals),
        "short" => scaled(value, 1000.0, &SHORT_SUFFIXES, decimals),
        "percent" => format!("{}%", format_number(value, decimals)),
        "percent(0-1)" | "percentunit" => format!("{}%", format_number(value * 100.0, decimals)),
        "celsius" => format!("{}°C", format_number(value, decimals)),
        "ms" => {
            if value.abs() < 1000.0 {
                format!("{} ms", format_number(value, decimals))
            } else {
                duration_from_seconds(value / 1000.0, decimals)
            }
        }
        "s" | "seconds" => duration_from_seconds(value, decimals),
        other => format!("{} {other}", format_number(value, decimals)),
    }
}
