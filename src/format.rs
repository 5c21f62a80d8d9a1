//! printf-style rendering of floating point numbers.
//!
//! Only the subset that makes sense for a single float is supported: an optional literal
//! prefix and suffix (with `%%` for a literal percent sign) around one conversion of the form
//! `%[flags][width][.precision]conversion`, where the flags are any of `-+ 0#` and the
//! conversion is one of `fFeEgG`.

use std::fmt::Write;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

use crate::error::Error;

const DEFAULT_PRECISION: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Fixed,
    Exponent,
    General,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Flags {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alternate: bool,
}

/// A parsed printf-style format for a single floating point value, such as `%f` or `%12.8e`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordFormat {
    source: String,
    prefix: String,
    suffix: String,
    flags: Flags,
    width: usize,
    precision: Option<usize>,
    conversion: Conversion,
    uppercase: bool,
}

impl Default for CoordFormat {
    /// Equivalent to `%f`.
    fn default() -> Self {
        Self {
            source: String::from("%f"),
            prefix: String::new(),
            suffix: String::new(),
            flags: Flags::default(),
            width: 0,
            precision: None,
            conversion: Conversion::Fixed,
            uppercase: false,
        }
    }
}

impl CoordFormat {
    pub fn parse(format: &str) -> Result<Self, Error> {
        let invalid = |details: &str| Error::InvalidFormat {
            format: format.to_string(),
            details: details.to_string(),
        };

        let (prefix, rest) = split_literal(format)
            .ok_or_else(|| invalid("expected a conversion such as '%f'"))?;
        let mut chars = rest.chars().peekable();

        let mut flags = Flags::default();
        while let Some(&c) = chars.peek() {
            match c {
                '-' => flags.left = true,
                '+' => flags.plus = true,
                ' ' => flags.space = true,
                '0' => flags.zero = true,
                '#' => flags.alternate = true,
                _ => break,
            }
            chars.next();
        }

        let width = digits(&mut chars).unwrap_or(0);
        let precision = if chars.peek() == Some(&'.') {
            chars.next();
            Some(digits(&mut chars).unwrap_or(0))
        } else {
            None
        };

        let c = chars
            .next()
            .ok_or_else(|| invalid("the format ends before its conversion"))?;
        let conversion = match c.to_ascii_lowercase() {
            'f' => Conversion::Fixed,
            'e' => Conversion::Exponent,
            'g' => Conversion::General,
            _ => return Err(invalid(&format!("unsupported conversion '{c}'"))),
        };

        let suffix: String = chars.collect();
        if split_literal(&suffix).is_some() {
            return Err(invalid("only a single conversion is supported"));
        }

        Ok(Self {
            source: format.to_string(),
            prefix: unescape(&prefix),
            suffix: unescape(&suffix),
            flags,
            width,
            precision,
            conversion,
            uppercase: c.is_ascii_uppercase(),
        })
    }

    /// The format string this was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn render(&self, value: f64) -> String {
        let mut s = String::new();
        self.render_into(&mut s, value);
        s
    }

    /// Appends the rendered `value` to `out`.
    pub fn render_into(&self, out: &mut String, value: f64) {
        let precision = self.precision.unwrap_or(DEFAULT_PRECISION);
        let magnitude = value.abs();
        let mut body = if !value.is_finite() {
            nonfinite(value)
        } else {
            match self.conversion {
                Conversion::Fixed => {
                    let mut s = format!("{magnitude:.precision$}");
                    if self.flags.alternate && !s.contains('.') {
                        s.push('.');
                    }
                    s
                }
                Conversion::Exponent => exponent(magnitude, precision),
                Conversion::General => general(magnitude, precision, self.flags.alternate),
            }
        };
        if self.uppercase {
            body.make_ascii_uppercase();
        }

        let sign = if value.is_sign_negative() && !value.is_nan() {
            "-"
        } else if self.flags.plus {
            "+"
        } else if self.flags.space {
            " "
        } else {
            ""
        };

        out.push_str(&self.prefix);
        let padding = self.width.saturating_sub(sign.len() + body.len());
        if self.flags.left {
            out.push_str(sign);
            out.push_str(&body);
            out.extend(std::iter::repeat(' ').take(padding));
        } else if self.flags.zero && value.is_finite() {
            out.push_str(sign);
            out.extend(std::iter::repeat('0').take(padding));
            out.push_str(&body);
        } else {
            out.extend(std::iter::repeat(' ').take(padding));
            out.push_str(sign);
            out.push_str(&body);
        }
        out.push_str(&self.suffix);
    }
}

impl FromStr for CoordFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn digits(chars: &mut Peekable<Chars<'_>>) -> Option<usize> {
    let mut n: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        n = Some(n.unwrap_or(0).saturating_mul(10).saturating_add(d as usize));
        chars.next();
    }
    n
}

/// Splits off the literal text in front of the first conversion, skipping `%%` escapes.
///
/// Returns [`None`] if there is no conversion.
fn split_literal(s: &str) -> Option<(String, &str)> {
    let mut literal = String::new();
    let mut rest = s;
    loop {
        let idx = rest.find('%')?;
        literal.push_str(&rest[..idx]);
        rest = &rest[idx + 1..];
        match rest.strip_prefix('%') {
            Some(after) => {
                literal.push_str("%%");
                rest = after;
            }
            None => return Some((literal, rest)),
        }
    }
}

fn unescape(literal: &str) -> String {
    literal.replace("%%", "%")
}

fn nonfinite(value: f64) -> String {
    if value.is_nan() {
        String::from("nan")
    } else {
        String::from("inf")
    }
}

/// Splits Rust's `{:e}` output into its mantissa and exponent.
fn rust_exponent(magnitude: f64, precision: usize) -> (String, i32) {
    let s = format!("{magnitude:.precision$e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => (mantissa.to_string(), exp.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

fn c_exponent(mantissa: &str, exp: i32) -> String {
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
}

fn exponent(magnitude: f64, precision: usize) -> String {
    let (mantissa, exp) = rust_exponent(magnitude, precision);
    c_exponent(&mantissa, exp)
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// The `%g` style: fixed notation for moderate exponents, scientific otherwise, with `precision`
/// significant digits and trailing zeros removed unless `alternate` is set.
fn general(magnitude: f64, precision: usize, alternate: bool) -> String {
    let p = precision.max(1);
    let (mantissa, exp) = rust_exponent(magnitude, p - 1);
    if exp < -4 || exp >= p as i32 {
        let mantissa = if alternate {
            mantissa.as_str()
        } else {
            strip_zeros(&mantissa)
        };
        c_exponent(mantissa, exp)
    } else {
        let decimals = (p as i32 - 1 - exp) as usize;
        let fixed = format!("{magnitude:.decimals$}");
        if alternate {
            fixed
        } else {
            strip_zeros(&fixed).to_string()
        }
    }
}

/// Renders `value` as `%.{precision}g` centred in a field of `width` characters.
pub(crate) fn write_centered_general(
    out: &mut impl Write,
    value: f64,
    width: usize,
    precision: usize,
) -> std::fmt::Result {
    let body = if value.is_finite() {
        general(value.abs(), precision, false)
    } else {
        nonfinite(value)
    };
    let sign = if value.is_sign_negative() && !value.is_nan() {
        "-"
    } else {
        ""
    };
    write!(out, "{:^width$}", format!("{sign}{body}"))
}
