/// Currency prefix used for revenue amounts (Zambian kwacha).
pub const CURRENCY_SYMBOL: &str = "K";

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use osr_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let places = decimals as usize;
    let scaled = value.abs() * 10_f64.powi(decimals as i32);
    // Decimal midpoints such as 1.005 are stored just below the tie.
    let nudged = if scaled.fract() == 0.0 {
        scaled
    } else {
        scaled + scaled * f64::EPSILON
    };

    // Every digit of the rounded magnitude, at least one before the point.
    let digits = format!("{:0>width$.0}", nudged.round(), width = places + 1);
    let (integer, fraction) = digits.split_at(digits.len() - places);

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    if value < 0.0 && digits.bytes().any(|b| b != b'0') {
        out.push('-');
    }
    out.push_str(&group_thousands(integer));
    if places > 0 {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Format a revenue amount with the currency prefix, two decimals and
/// thousands separators.
///
/// # Examples
///
/// ```
/// use osr_core::formatting::format_amount;
///
/// assert_eq!(format_amount(1234.56), "K1,234.56");
/// assert_eq!(format_amount(-9.99),   "K-9.99");
/// ```
pub fn format_amount(amount: f64) -> String {
    format!("{CURRENCY_SYMBOL}{}", format_number(amount, 2))
}

/// Format an already-scaled percentage (`85.714` → `"85.71%"`).
pub fn format_percent(value: f64) -> String {
    format!("{}%", format_number(value, 2))
}

/// Right-pad or truncate `s` to exactly `width` characters.
pub fn fit_width(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count <= width {
        format!("{}{}", s, " ".repeat(width - count))
    } else if width == 0 {
        String::new()
    } else {
        let mut out: String = s.chars().take(width - 1).collect();
        out.push('…');
        out
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
