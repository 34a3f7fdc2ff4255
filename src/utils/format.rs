/// Format a float in shortest round-trip form, always carrying a decimal
/// point or an exponent (`2.0`, `0.75`, `1e-05`, `1.5e+20`).
///
/// Decimal notation covers magnitudes in `[1e-4, 1e16)`; outside that range
/// the exponent is signed and padded to two digits. Non-finite values are
/// written as `nan`, `inf` and `-inf`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // Debug already switches to exponent form at the same thresholds
    let repr = format!("{:?}", value);
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}

/// Format a vector as `[a, b, c]` using [`format_float`] for each element
pub fn format_vector(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|&v| format_float(v)).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float_decimal() {
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(-1.0), "-1.0");
        assert_eq!(format_float(0.75), "0.75");
        assert_eq!(format_float(0.55), "0.55");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn test_format_float_exponent() {
        assert_eq!(format_float(1e-5), "1e-05");
        assert_eq!(format_float(1.5e20), "1.5e+20");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(-2.5e-120), "-2.5e-120");
    }

    #[test]
    fn test_format_float_non_finite() {
        assert_eq!(format_float(f64::NAN), "nan");
        assert_eq!(format_float(f64::INFINITY), "inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_format_vector() {
        assert_eq!(format_vector(&[1.0, 2.0]), "[1.0, 2.0]");
        assert_eq!(format_vector(&[0.5]), "[0.5]");
        assert_eq!(format_vector(&[]), "[]");
    }
}
