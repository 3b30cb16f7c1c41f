//! The `number` kind: native machine numbers that silently promote to
//! arbitrary precision once the source text runs past what `i64`/`f64`
//! can represent exactly.

use std::fmt;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// The digit count above which an integer literal is parsed into a
/// [`BigInt`] rather than an `i64`.
pub const BIG_INT_DIGIT_THRESHOLD: usize = 20;

/// The significant-mantissa-digit count above which a floating literal is
/// parsed into a [`BigDecimal`] rather than an `f64`.
pub const BIG_DECIMAL_DIGIT_THRESHOLD: usize = 17;

/// A JSON number, preserving whether it was written as an integer or a
/// float, and promoting to arbitrary precision for very long literals.
///
/// Equality and ordering between variants (needed by the schema compiler's
/// `minimum`/`maximum`/`enum` conditions) compare by `f64` value, per the
/// value model's equality contract — this is intentionally lossy for
/// numbers beyond `f64`'s 53 bits of integer precision.
#[derive(Clone, Debug)]
pub enum Num {
    /// A native 64-bit integer.
    Int(i64),
    /// An arbitrary-precision integer (≥ 20 decimal digits in the source).
    BigInt(BigInt),
    /// A native 64-bit float.
    Float(f64),
    /// An arbitrary-precision decimal (≥ 17 significant mantissa digits).
    BigDecimal(BigDecimal),
}

impl Num {
    /// Whether this number has a zero fractional part, i.e. whether it
    /// matches the schema `"type": "integer"` keyword.
    pub fn is_integral(&self) -> bool {
        match self {
            Num::Int(_) | Num::BigInt(_) => true,
            Num::Float(f) => f.fract() == 0.0,
            Num::BigDecimal(d) => d.is_integer(),
        }
    }

    /// Lossy conversion to `f64`, used for equality, ordering, and the
    /// `multipleOf` check. Arbitrary-precision values beyond `f64`'s
    /// precision lose trailing digits here by design.
    pub fn as_f64(&self) -> f64 {
        match self {
            Num::Int(i) => *i as f64,
            Num::BigInt(b) => b.to_f64().unwrap_or(f64::INFINITY),
            Num::Float(f) => *f,
            Num::BigDecimal(d) => d.to_f64().unwrap_or(f64::INFINITY),
        }
    }
}

impl PartialEq for Num {
    fn eq(&self, other: &Num) -> bool {
        self.as_f64() == other.as_f64()
    }
}

impl PartialOrd for Num {
    fn partial_cmp(&self, other: &Num) -> Option<std::cmp::Ordering> {
        self.as_f64().partial_cmp(&other.as_f64())
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Num::Int(i) => write!(f, "{i}"),
            Num::BigInt(b) => write!(f, "{b}"),
            Num::Float(x) => write!(f, "{x}"),
            Num::BigDecimal(d) => write!(f, "{d}"),
        }
    }
}

impl From<i64> for Num {
    fn from(i: i64) -> Num {
        Num::Int(i)
    }
}

impl From<u64> for Num {
    fn from(u: u64) -> Num {
        i64::try_from(u).map(Num::Int).unwrap_or_else(|_| Num::BigInt(BigInt::from(u)))
    }
}

impl From<i32> for Num {
    fn from(i: i32) -> Num {
        Num::Int(i as i64)
    }
}

impl From<f64> for Num {
    fn from(f: f64) -> Num {
        assert!(f.is_finite(), "Num::from(f64): {f} is not representable in JSON");
        Num::Float(f)
    }
}

/// Parses the digit run of an integer literal (no sign, no fraction, no
/// exponent) into the smallest representation that holds it exactly.
pub fn parse_integer_literal(digits: &str, negative: bool) -> Num {
    if digits.len() < BIG_INT_DIGIT_THRESHOLD {
        let text = if negative { format!("-{digits}") } else { digits.to_string() };
        if let Ok(i) = text.parse::<i64>() {
            return Num::Int(i);
        }
    }
    let mut big: BigInt = digits.parse().expect("digit run must be all ASCII digits");
    if negative {
        big = -big;
    }
    Num::BigInt(big)
}

/// Parses a floating literal (full text, including sign/fraction/exponent)
/// into the smallest representation that holds its mantissa exactly.
pub fn parse_float_literal(text: &str, mantissa_digits: usize) -> Num {
    if mantissa_digits < BIG_DECIMAL_DIGIT_THRESHOLD {
        if let Ok(f) = text.parse::<f64>() {
            return Num::Float(f);
        }
    }
    let big: BigDecimal = text.parse().expect("float literal must be valid decimal text");
    Num::BigDecimal(big)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_integer_stays_native() {
        let n = parse_integer_literal("12345", false);
        assert!(matches!(n, Num::Int(12345)));
    }

    #[test]
    fn long_integer_promotes_to_bigint() {
        let n = parse_integer_literal("123456789012345678901234", false);
        assert!(matches!(n, Num::BigInt(_)));
        assert_eq!(n.to_string(), "123456789012345678901234");
    }

    #[test]
    fn negative_bigint_round_trips() {
        let n = parse_integer_literal("999999999999999999999", true);
        assert_eq!(n.to_string(), "-999999999999999999999");
    }

    #[test]
    fn short_float_stays_native() {
        let n = parse_float_literal("3.5", 2);
        assert!(matches!(n, Num::Float(_)));
    }

    #[test]
    fn long_float_promotes_to_bigdecimal() {
        let n = parse_float_literal("3.14159265358979323846", 21);
        assert!(matches!(n, Num::BigDecimal(_)));
    }

    #[test]
    fn integer_and_float_are_equal_by_value() {
        assert_eq!(Num::Int(1), Num::Float(1.0));
    }

    #[test]
    fn is_integral_detects_fraction() {
        assert!(Num::Float(5.0).is_integral());
        assert!(!Num::Float(5.5).is_integral());
    }
}
