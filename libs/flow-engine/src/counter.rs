//! Decimal counter literals.
//!
//! Flow exporters write counters as plain integers most of the time, but large
//! values show up in scientific notation (`3e+05`) and occasionally with a
//! fraction. A literal is parsed exactly as a decimal and rounded to the
//! nearest integer, ties to even.

/// Cap for the exponent magnitude; anything beyond it is saturated either way.
const MAX_EXPONENT: i64 = 1_000_000;

/// Parse a decimal literal into a counter.
///
/// Accepted shape: `[+-]digits[.digits][(e|E)[+-]digits]`, with digits allowed
/// on either side of the dot but not both sides empty. Negative values clamp to
/// 0 and values above `u64::MAX` saturate. Returns `None` for anything else.
pub fn parse_counter(text: &str) -> Option<u64> {
    let (negative, rest) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (mantissa, exponent) = match rest.find(['e', 'E']) {
        Some(i) => (&rest[..i], parse_exponent(&rest[i + 1..])?),
        None => (rest, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !is_digits(int_part) || !is_digits(frac_part) {
        return None;
    }

    let digits: String = int_part
        .chars()
        .chain(frac_part.chars())
        .skip_while(|&c| c == '0')
        .collect();
    if digits.is_empty() {
        return Some(0);
    }

    let scale = exponent - frac_part.len() as i64;
    let value = if scale >= 0 {
        scale_up(&digits, scale as u64)
    } else {
        round_half_even(&digits, scale.unsigned_abs())
    };

    if negative && value > 0 { Some(0) } else { Some(value) }
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_exponent(s: &str) -> Option<i64> {
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    if digits.is_empty() || !is_digits(digits) {
        return None;
    }

    let magnitude = digits
        .bytes()
        .try_fold(0i64, |acc, b| {
            let next = acc * 10 + i64::from(b - b'0');
            (next <= MAX_EXPONENT).then_some(next)
        })
        .unwrap_or(MAX_EXPONENT);

    Some(if negative { -magnitude } else { magnitude })
}

/// `digits * 10^scale`, saturating. `digits` has no leading zeros.
fn scale_up(digits: &str, scale: u64) -> u64 {
    // u64::MAX has 20 digits.
    if digits.len() as u64 + scale > 20 {
        return u64::MAX;
    }
    let mut value = to_u128(digits);
    for _ in 0..scale {
        value *= 10;
    }
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// `digits / 10^drop`, rounded to nearest, ties to even.
fn round_half_even(digits: &str, drop: u64) -> u64 {
    let len = digits.len() as u64;
    if drop > len {
        // Below 0.1, always rounds down.
        return 0;
    }

    let (kept, dropped) = digits.split_at((len - drop) as usize);
    let kept = if kept.len() > 20 {
        return u64::MAX;
    } else {
        to_u128(kept)
    };

    let bytes = dropped.as_bytes();
    let first = bytes[0];
    let tail_nonzero = bytes[1..].iter().any(|&b| b != b'0');
    let round_up = first > b'5' || (first == b'5' && (tail_nonzero || kept % 2 == 1));

    let value = if round_up { kept + 1 } else { kept };
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// At most 20 ASCII digits, so the value always fits.
fn to_u128(digits: &str) -> u128 {
    digits
        .bytes()
        .fold(0u128, |acc, b| acc * 10 + u128::from(b - b'0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_integers() {
        assert_eq!(parse_counter("0"), Some(0));
        assert_eq!(parse_counter("22"), Some(22));
        assert_eq!(parse_counter("+110414"), Some(110414));
        assert_eq!(parse_counter("000123"), Some(123));
        assert_eq!(parse_counter("18446744073709551615"), Some(u64::MAX));
    }

    #[test]
    fn scientific_notation() {
        assert_eq!(parse_counter("3e+05"), Some(300_000));
        assert_eq!(parse_counter("3E5"), Some(300_000));
        assert_eq!(parse_counter("1.5e3"), Some(1_500));
        assert_eq!(parse_counter("2.5e-1"), Some(0));
        assert_eq!(parse_counter("12345e-2"), Some(123));
        assert_eq!(parse_counter("0e+00"), Some(0));
    }

    #[test]
    fn fractions_round_half_to_even() {
        assert_eq!(parse_counter("0.5"), Some(0));
        assert_eq!(parse_counter("1.5"), Some(2));
        assert_eq!(parse_counter("2.5"), Some(2));
        assert_eq!(parse_counter("2.50001"), Some(3));
        assert_eq!(parse_counter("2.4999"), Some(2));
        assert_eq!(parse_counter(".6"), Some(1));
        assert_eq!(parse_counter("7."), Some(7));
        assert_eq!(parse_counter("0.05"), Some(0));
    }

    #[test]
    fn out_of_range_values_clamp() {
        assert_eq!(parse_counter("-12"), Some(0));
        assert_eq!(parse_counter("-0"), Some(0));
        assert_eq!(parse_counter("1e20"), Some(u64::MAX));
        assert_eq!(parse_counter("18446744073709551616"), Some(u64::MAX));
        assert_eq!(parse_counter("1e999999999999"), Some(u64::MAX));
        assert_eq!(parse_counter("1e-999999999999"), Some(0));
    }

    #[test]
    fn rejects_non_numerals() {
        for text in [
            "", "+", "-", ".", "e5", "1e", "1e+", "1.2.3", "0x10", "1_000", " 1", "1 ", "inf",
            "NaN", "12abc", "1,5",
        ] {
            assert_eq!(parse_counter(text), None, "{text:?}");
        }
    }
}
