pub const NOT_AVAILABLE: &str = "NA";

/// Fixed-point rendering that never produces a negative zero.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    let (integer, fraction) = round_half_away(value, decimals);
    let mut rendered = String::with_capacity(integer.len() + fraction.len() + 2);
    if value.is_sign_negative() && !is_all_zero(&integer, &fraction) {
        rendered.push('-');
    }
    rendered.push_str(&integer);
    if !fraction.is_empty() {
        rendered.push('.');
        rendered.push_str(&fraction);
    }
    rendered
}

/// Fixed-point rendering with `,` between every group of three integer digits.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let (integer, fraction) = round_half_away(value, decimals);
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3 + fraction.len() + 2);
    if value.is_sign_negative() && !is_all_zero(&integer, &fraction) {
        grouped.push('-');
    }
    let lead = integer.len() % 3;
    for (idx, digit) in integer.chars().enumerate() {
        if idx > 0 && (idx + 3 - lead) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if !fraction.is_empty() {
        grouped.push('.');
        grouped.push_str(&fraction);
    }
    grouped
}

pub fn format_percent(value: f64) -> String {
    format!("{}%", format_fixed(value, 2))
}

/// Rounds the shortest decimal form of `|value|` to `decimals` places, ties
/// away from zero. Returns the integer and fraction digits.
fn round_half_away(value: f64, decimals: usize) -> (String, String) {
    if !value.is_finite() {
        return (value.abs().to_string(), String::new());
    }
    let shortest = value.abs().to_string();
    let (integer, fraction) = shortest.split_once('.').unwrap_or((shortest.as_str(), ""));
    let mut digits: Vec<u8> = integer
        .bytes()
        .chain(fraction.bytes().chain(std::iter::repeat(b'0')).take(decimals))
        .collect();

    if fraction.as_bytes().get(decimals).is_some_and(|digit| *digit >= b'5') {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    let split = digits.len() - decimals;
    let as_string = |part: &[u8]| part.iter().copied().map(char::from).collect::<String>();
    (as_string(&digits[..split]), as_string(&digits[split..]))
}

fn is_all_zero(integer: &str, fraction: &str) -> bool {
    integer.chars().chain(fraction.chars()).all(|ch| ch == '0')
}
