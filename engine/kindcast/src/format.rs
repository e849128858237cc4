//! Numeric text rendering and parsing.
//!
//! Float rendering follows the `b e E f g G x X` format family with a
//! precision of `-1` meaning the shortest text that parses back to the same
//! value.

use std::num::IntErrorKind;

use num_complex::Complex64;

use crate::error::{CastError, CastResult};

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn checked_base(base: u32) -> u32 {
    if (2..=36).contains(&base) {
        base
    } else {
        10
    }
}

pub fn format_uint(value: u64, base: u32) -> String {
    let base = checked_base(base) as u64;
    if value == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    let mut rest = value;
    while rest > 0 {
        buf.push(DIGITS[(rest % base) as usize]);
        rest /= base;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn format_int(value: i64, base: u32) -> String {
    let digits = format_uint(value.unsigned_abs(), base);
    if value < 0 {
        format!("-{digits}")
    } else {
        digits
    }
}

/// Parse a signed integer in `base`, range checked against `bit_size`.
pub fn parse_int(text: &str, base: u32, bit_size: u32) -> CastResult<i64> {
    let value = i64::from_str_radix(text, checked_base(base)).map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => CastError::overflow("i64", text),
        _ => CastError::parse("int", text, err),
    })?;
    if bit_size == 32 && i32::try_from(value).is_err() {
        return Err(CastError::overflow("i32", text));
    }
    Ok(value)
}

pub fn parse_uint(text: &str, base: u32, bit_size: u32) -> CastResult<u64> {
    if text.starts_with('+') {
        return Err(CastError::parse("uint", text, "invalid digit found in string"));
    }
    let value = u64::from_str_radix(text, checked_base(base)).map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow => CastError::overflow("u64", text),
        _ => CastError::parse("uint", text, err),
    })?;
    if bit_size == 32 && u32::try_from(value).is_err() {
        return Err(CastError::overflow("u32", text));
    }
    Ok(value)
}

/// Parse a float of width `bit_size`. Finite text whose magnitude exceeds
/// the width is an overflow rather than an infinity.
pub fn parse_float(text: &str, bit_size: u32) -> CastResult<f64> {
    let unsigned = text.trim_start_matches(['+', '-']);
    let lowered = unsigned.to_ascii_lowercase();
    let value = if lowered.starts_with("0x") {
        parse_hex_float(text)?
    } else if bit_size == 32 {
        text.parse::<f32>()
            .map(f64::from)
            .map_err(|err| CastError::parse("float", text, err))?
    } else {
        text.parse::<f64>()
            .map_err(|err| CastError::parse("float", text, err))?
    };
    let literal_inf = lowered.starts_with("inf");
    if bit_size == 32 {
        let narrowed = value as f32;
        if narrowed.is_infinite() && !literal_inf {
            return Err(CastError::overflow("f32", text));
        }
        return Ok(narrowed as f64);
    }
    if value.is_infinite() && !literal_inf {
        return Err(CastError::overflow("f64", text));
    }
    Ok(value)
}

// Hexadecimal mantissa with a mandatory binary exponent: `-0x1.8p+01`.
fn parse_hex_float(text: &str) -> CastResult<f64> {
    let fail = |reason: &str| CastError::parse("float", text, reason);
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let rest = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
        .ok_or_else(|| fail("missing hex prefix"))?;
    let (mantissa, exponent) = rest
        .split_once(['p', 'P'])
        .ok_or_else(|| fail("missing binary exponent"))?;
    let exponent: i32 = exponent.parse().map_err(|_| fail("invalid binary exponent"))?;
    let mut mant: u64 = 0;
    let mut scale = exponent;
    let mut seen_point = false;
    let mut seen_digit = false;
    for ch in mantissa.chars() {
        if ch == '.' {
            if seen_point {
                return Err(fail("repeated point"));
            }
            seen_point = true;
            continue;
        }
        let digit = ch.to_digit(16).ok_or_else(|| fail("invalid hex digit"))? as u64;
        seen_digit = true;
        if mant >> 60 == 0 {
            mant = (mant << 4) | digit;
            if seen_point {
                scale -= 4;
            }
        } else if !seen_point {
            scale += 4;
        }
    }
    if !seen_digit {
        return Err(fail("missing mantissa"));
    }
    let magnitude = mant as f64 * 2f64.powi(scale);
    Ok(if negative { -magnitude } else { magnitude })
}

/// Accepts `1 t T TRUE true True 0 f F FALSE false False`.
pub fn parse_bool(text: &str) -> CastResult<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(CastError::parse("bool", text, "invalid syntax")),
    }
}

/// Parse `re`, `imi`, `re±imi`, optionally wrapped in parentheses.
pub fn parse_complex(text: &str, bit_size: u32) -> CastResult<Complex64> {
    let part_bits = if bit_size == 64 { 32 } else { 64 };
    let rewrap = |err: CastError| {
        if err.is_overflow() {
            err
        } else {
            CastError::parse("complex", text, err)
        }
    };
    let mut body = text;
    if body.len() >= 2 && body.starts_with('(') && body.ends_with(')') {
        body = &body[1..body.len() - 1];
    }
    if body.is_empty() {
        return Err(CastError::parse("complex", text, "empty input"));
    }
    let Some(imaginary) = body.strip_suffix('i') else {
        let re = parse_float(body, part_bits).map_err(rewrap)?;
        return Ok(Complex64::new(re, 0.0));
    };
    let (re_text, im_text) = match sign_split(imaginary) {
        Some(idx) => imaginary.split_at(idx),
        None => ("", imaginary),
    };
    let re = if re_text.is_empty() {
        0.0
    } else {
        parse_float(re_text, part_bits).map_err(rewrap)?
    };
    let im = match im_text {
        "" | "+" => 1.0,
        "-" => -1.0,
        part => parse_float(part, part_bits).map_err(rewrap)?,
    };
    Ok(Complex64::new(re, im))
}

// Position of the sign that starts the imaginary part, skipping exponent signs.
fn sign_split(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (1..bytes.len()).rev().find(|&idx| {
        matches!(bytes[idx], b'+' | b'-') && !matches!(bytes[idx - 1], b'e' | b'E' | b'p' | b'P')
    })
}

pub fn format_complex(value: Complex64, fmt: char, prec: i32, bit_size: u32) -> String {
    let part_bits = if bit_size == 64 { 32 } else { 64 };
    let re = format_float(value.re, fmt, prec, part_bits);
    let mut im = format_float(value.im, fmt, prec, part_bits);
    if !im.starts_with(['+', '-']) {
        im.insert(0, '+');
    }
    format!("({re}{im}i)")
}

/// Render `value` as a float of width `bit_size` (32 or 64).
pub fn format_float(value: f64, fmt: char, prec: i32, bit_size: u32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    let single = bit_size == 32;
    match fmt {
        'b' => format_binary(value, single),
        'x' | 'X' => format_hex(value, prec, fmt == 'X', single),
        'f' if prec >= 0 => {
            if single {
                format!("{:.*}", prec as usize, value as f32)
            } else {
                format!("{:.*}", prec as usize, value)
            }
        }
        'f' => {
            let digits = Digits::shortest(value, single);
            let decimals = (digits.len() - digits.point).max(0);
            digits.fixed(decimals as usize)
        }
        'e' | 'E' => {
            let upper = fmt == 'E';
            if prec >= 0 {
                Digits::rounded(value, single, prec as usize + 1).scientific(prec as usize, upper)
            } else {
                let digits = Digits::shortest(value, single);
                let decimals = (digits.len() - 1).max(0);
                digits.scientific(decimals as usize, upper)
            }
        }
        _ => format_general(value, prec, fmt == 'G', single),
    }
}

fn format_general(value: f64, prec: i32, upper: bool, single: bool) -> String {
    let shortest = prec < 0;
    let (digits, mut prec) = if shortest {
        let digits = Digits::shortest(value, single);
        let nd = digits.len();
        (digits, nd)
    } else {
        let prec = prec.max(1);
        (Digits::rounded(value, single, prec as usize), prec)
    };
    let nd = digits.len();
    let mut eprec = prec;
    if eprec > nd && nd >= digits.point {
        eprec = nd;
    }
    if shortest {
        eprec = 6;
    }
    let exp = digits.point - 1;
    if exp < -4 || exp >= eprec {
        if prec > nd {
            prec = nd;
        }
        return digits.scientific((prec - 1).max(0) as usize, upper);
    }
    if prec > digits.point {
        prec = nd;
    }
    digits.fixed((prec - digits.point).max(0) as usize)
}

/// Decimal digits of a float: the value is `0.d1d2... x 10^point`.
/// Trailing zeros are trimmed; zero has no digits.
struct Digits {
    negative: bool,
    digits: Vec<u8>,
    point: i32,
}

impl Digits {
    fn shortest(value: f64, single: bool) -> Self {
        let text = if single {
            format!("{:e}", value as f32)
        } else {
            format!("{value:e}")
        };
        Self::from_scientific(&text)
    }

    fn rounded(value: f64, single: bool, significant: usize) -> Self {
        let decimals = significant.saturating_sub(1);
        let text = if single {
            format!("{:.*e}", decimals, value as f32)
        } else {
            format!("{:.*e}", decimals, value)
        };
        Self::from_scientific(&text)
    }

    fn from_scientific(text: &str) -> Self {
        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (mantissa, exponent) = rest.split_once('e').unwrap_or((rest, "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let mut digits: Vec<u8> = mantissa.bytes().filter(|b| b.is_ascii_digit()).collect();
        while digits.last() == Some(&b'0') {
            digits.pop();
        }
        let point = if digits.is_empty() { 0 } else { exponent + 1 };
        Self {
            negative,
            digits,
            point,
        }
    }

    fn len(&self) -> i32 {
        self.digits.len() as i32
    }

    fn digit(&self, idx: i32) -> char {
        if idx < 0 {
            return '0';
        }
        self.digits.get(idx as usize).map_or('0', |d| *d as char)
    }

    fn scientific(&self, decimals: usize, upper: bool) -> String {
        let mut out = String::new();
        if self.negative {
            out.push('-');
        }
        out.push(self.digit(0));
        if decimals > 0 {
            out.push('.');
            for idx in 1..=decimals {
                out.push(self.digit(idx as i32));
            }
        }
        let exp = if self.digits.is_empty() { 0 } else { self.point - 1 };
        out.push(if upper { 'E' } else { 'e' });
        out.push(if exp < 0 { '-' } else { '+' });
        out.push_str(&format!("{:02}", exp.unsigned_abs()));
        out
    }

    fn fixed(&self, decimals: usize) -> String {
        let mut out = String::new();
        if self.negative {
            out.push('-');
        }
        if self.point > 0 {
            for idx in 0..self.point {
                out.push(self.digit(idx));
            }
        } else {
            out.push('0');
        }
        if decimals > 0 {
            out.push('.');
            for idx in 0..decimals {
                out.push(self.digit(self.point + idx as i32));
            }
        }
        out
    }
}

struct FloatBits {
    negative: bool,
    mant: u64,
    exp: i64,
    mant_bits: u32,
}

impl FloatBits {
    // Mantissa with the implicit bit restored and the unbiased exponent.
    fn decompose(value: f64, single: bool) -> Self {
        let (mant_bits, exp_bits, bias, bits) = if single {
            (23u32, 8u32, -127i64, (value as f32).to_bits() as u64)
        } else {
            (52, 11, -1023, value.to_bits())
        };
        let negative = bits >> (exp_bits + mant_bits) != 0;
        let mut exp = ((bits >> mant_bits) & ((1u64 << exp_bits) - 1)) as i64;
        let mut mant = bits & ((1u64 << mant_bits) - 1);
        if exp == 0 {
            exp += 1;
        } else {
            mant |= 1u64 << mant_bits;
        }
        Self {
            negative,
            mant,
            exp: exp + bias,
            mant_bits,
        }
    }
}

fn format_binary(value: f64, single: bool) -> String {
    let bits = FloatBits::decompose(value, single);
    let exp = bits.exp - bits.mant_bits as i64;
    format!(
        "{}{}p{}{}",
        if bits.negative { "-" } else { "" },
        bits.mant,
        if exp >= 0 { "+" } else { "" },
        exp
    )
}

fn format_hex(value: f64, prec: i32, upper: bool, single: bool) -> String {
    let FloatBits {
        negative,
        mut mant,
        mut exp,
        mant_bits,
    } = FloatBits::decompose(value, single);
    if mant == 0 {
        exp = 0;
    }
    mant <<= 60 - mant_bits;
    while mant != 0 && mant & (1u64 << 60) == 0 {
        mant <<= 1;
        exp -= 1;
    }
    if (0..15).contains(&prec) {
        let shift = (prec * 4) as u32;
        let extra = (mant << shift) & ((1u64 << 60) - 1);
        mant >>= 60 - shift;
        if extra | (mant & 1) > 1u64 << 59 {
            mant += 1;
        }
        mant <<= 60 - shift;
        if mant & (1u64 << 61) != 0 {
            mant >>= 1;
            exp += 1;
        }
    }
    let hex: &[u8; 16] = if upper {
        b"0123456789ABCDEF"
    } else {
        b"0123456789abcdef"
    };
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('0');
    out.push(if upper { 'X' } else { 'x' });
    out.push(if (mant >> 60) & 1 == 1 { '1' } else { '0' });
    mant <<= 4;
    if prec < 0 && mant != 0 {
        out.push('.');
        while mant != 0 {
            out.push(hex[((mant >> 60) & 15) as usize] as char);
            mant <<= 4;
        }
    } else if prec > 0 {
        out.push('.');
        for _ in 0..prec {
            out.push(hex[((mant >> 60) & 15) as usize] as char);
            mant <<= 4;
        }
    }
    out.push(if upper { 'P' } else { 'p' });
    out.push(if exp < 0 { '-' } else { '+' });
    out.push_str(&format!("{:02}", exp.unsigned_abs()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_format_switches_to_exponent() {
        assert_eq!(format_float(1.0, 'g', -1, 64), "1");
        assert_eq!(format_float(3.14, 'g', -1, 64), "3.14");
        assert_eq!(format_float(123456.0, 'g', -1, 64), "123456");
        assert_eq!(format_float(1e6, 'g', -1, 64), "1e+06");
        assert_eq!(format_float(0.0001, 'g', -1, 64), "0.0001");
        assert_eq!(format_float(0.000012, 'g', -1, 64), "1.2e-05");
        assert_eq!(format_float(123.456, 'g', 4, 64), "123.5");
        assert_eq!(format_float(0.0, 'g', -1, 64), "0");
        assert_eq!(format_float(-2.5, 'G', -1, 64), "-2.5");
    }

    #[test]
    fn single_precision_uses_shortest_f32_digits() {
        assert_eq!(format_float(0.1f32 as f64, 'g', -1, 32), "0.1");
        assert_eq!(format_float(0.1f32 as f64, 'g', -1, 64), "0.10000000149011612");
    }

    #[test]
    fn exponent_and_fixed_formats() {
        assert_eq!(format_float(1.5, 'e', -1, 64), "1.5e+00");
        assert_eq!(format_float(1234.5678, 'e', 2, 64), "1.23e+03");
        assert_eq!(format_float(1234.5678, 'E', 2, 64), "1.23E+03");
        assert_eq!(format_float(0.1, 'f', 2, 64), "0.10");
        assert_eq!(format_float(1e21, 'f', -1, 64), "1000000000000000000000");
        assert_eq!(format_float(0.25, 'f', -1, 64), "0.25");
    }

    #[test]
    fn binary_and_hex_formats() {
        assert_eq!(format_float(1.0, 'b', -1, 64), "4503599627370496p-52");
        assert_eq!(format_float(3.0, 'x', -1, 64), "0x1.8p+01");
        assert_eq!(format_float(1.0, 'x', -1, 64), "0x1p+00");
        assert_eq!(format_float(0.0, 'x', -1, 64), "0x0p+00");
        assert_eq!(format_float(-3.0, 'X', 3, 64), "-0X1.800P+01");
    }

    #[test]
    fn special_values() {
        assert_eq!(format_float(f64::NAN, 'g', -1, 64), "NaN");
        assert_eq!(format_float(f64::INFINITY, 'e', 3, 64), "+Inf");
        assert_eq!(format_float(f64::NEG_INFINITY, 'f', -1, 64), "-Inf");
    }

    #[test]
    fn integer_bases() {
        assert_eq!(format_int(-255, 16), "-ff");
        assert_eq!(format_uint(5, 2), "101");
        assert_eq!(format_uint(35, 36), "z");
        assert_eq!(parse_int("-ff", 16, 64).expect("hex"), -255);
        assert_eq!(parse_uint("z", 36, 64).expect("base36"), 35);
    }

    #[test]
    fn integer_range_checks() {
        assert!(parse_int("99999999999", 10, 32).expect_err("i32").is_overflow());
        assert!(parse_int("9223372036854775808", 10, 64).expect_err("i64").is_overflow());
        assert!(parse_uint("4294967296", 10, 32).expect_err("u32").is_overflow());
        assert!(matches!(
            parse_uint("-1", 10, 64),
            Err(CastError::ParseFailure { .. })
        ));
        assert!(matches!(
            parse_int("12a", 10, 64),
            Err(CastError::ParseFailure { .. })
        ));
    }

    #[test]
    fn float_parsing() {
        assert_eq!(parse_float("2.5", 64).expect("float"), 2.5);
        assert_eq!(parse_float("0x1.8p+01", 64).expect("hex float"), 3.0);
        assert_eq!(parse_float("-0x1p-2", 64).expect("hex float"), -0.25);
        assert!(parse_float("+Inf", 64).expect("inf").is_infinite());
        assert!(parse_float("1e400", 64).expect_err("overflow").is_overflow());
        assert!(parse_float("1e39", 32).expect_err("overflow").is_overflow());
        assert!(matches!(
            parse_float("banana", 64),
            Err(CastError::ParseFailure { .. })
        ));
    }

    #[test]
    fn bool_grammar() {
        for text in ["1", "t", "T", "TRUE", "true", "True"] {
            assert!(parse_bool(text).expect("truthy"));
        }
        for text in ["0", "f", "F", "FALSE", "false", "False"] {
            assert!(!parse_bool(text).expect("falsy"));
        }
        assert!(parse_bool("yes").is_err());
    }

    #[test]
    fn complex_parsing() {
        assert_eq!(parse_complex("(1+2i)", 128).expect("pair"), Complex64::new(1.0, 2.0));
        assert_eq!(parse_complex("2i", 128).expect("imag"), Complex64::new(0.0, 2.0));
        assert_eq!(parse_complex("1", 128).expect("real"), Complex64::new(1.0, 0.0));
        assert_eq!(parse_complex("-i", 128).expect("unit"), Complex64::new(0.0, -1.0));
        assert_eq!(
            parse_complex("1e+3-2.5i", 128).expect("exponent"),
            Complex64::new(1000.0, -2.5)
        );
        assert!(parse_complex("(1+x)", 128).is_err());
    }

    #[test]
    fn complex_rendering() {
        assert_eq!(format_complex(Complex64::new(1.0, -2.0), 'g', -1, 128), "(1-2i)");
        assert_eq!(format_complex(Complex64::new(0.5, 3.0), 'g', -1, 128), "(0.5+3i)");
    }
}
