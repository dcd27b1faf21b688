//! Kubernetes resource quantity parsing.
//!
//! Quantities are parsed into an exact fraction so that conversions to
//! millicores and bytes round the same way the API server does (up).

use thiserror::Error;

/// Errors produced when parsing a quantity string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
	#[error("empty quantity")]
	Empty,

	#[error("invalid quantity `{0}`")]
	Invalid(String),

	#[error("quantity `{0}` is out of range")]
	OutOfRange(String),
}

/// Bytes in one mebibyte.
pub const MEBIBYTE: i64 = 1024 * 1024;

/// Mantissa digits accepted before the value is rejected as out of range.
const MAX_DIGITS: usize = 24;

/// Exact non-negative value `numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fraction {
	numerator: i128,
	denominator: i128,
}

impl Fraction {
	fn ceil_scaled(self, scale: i128, input: &str) -> Result<i64, QuantityError> {
		let out_of_range = || QuantityError::OutOfRange(input.to_string());
		let scaled = self
			.numerator
			.checked_mul(scale)
			.and_then(|n| n.checked_add(self.denominator - 1))
			.ok_or_else(out_of_range)?;
		let value = scaled / self.denominator;
		i64::try_from(value).map_err(|_| QuantityError::OutOfRange(input.to_string()))
	}
}

/// Parse a quantity and return its value in millis, rounded up.
///
/// - `"100m"` -> 100
/// - `"1.5"` -> 1500
/// - `"250u"` -> 1
pub fn millis(input: &str) -> Result<i64, QuantityError> {
	parse(input)?.ceil_scaled(1000, input)
}

/// Parse a quantity and return its integer value, rounded up.
///
/// - `"256Mi"` -> 268435456
/// - `"1G"` -> 1000000000
pub fn whole(input: &str) -> Result<i64, QuantityError> {
	parse(input)?.ceil_scaled(1, input)
}

fn parse(input: &str) -> Result<Fraction, QuantityError> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(QuantityError::Empty);
	}
	let invalid = || QuantityError::Invalid(input.to_string());
	let out_of_range = || QuantityError::OutOfRange(input.to_string());

	let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
	let number_len = unsigned
		.find(|c: char| !c.is_ascii_digit() && c != '.')
		.unwrap_or(unsigned.len());
	let (number, suffix) = unsigned.split_at(number_len);

	let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
	if int_part.is_empty() && frac_part.is_empty() {
		return Err(invalid());
	}
	if frac_part.contains('.') {
		return Err(invalid());
	}
	if int_part.len() + frac_part.len() > MAX_DIGITS {
		return Err(out_of_range());
	}

	let digits = format!("{}{}", int_part, frac_part);
	let mut numerator: i128 = digits.parse().map_err(|_| invalid())?;
	let mut denominator: i128 = 10i128.pow(frac_part.len() as u32);

	match suffix {
		"" => {}
		"Ki" | "Mi" | "Gi" | "Ti" | "Pi" | "Ei" => {
			let power = match suffix {
				"Ki" => 1,
				"Mi" => 2,
				"Gi" => 3,
				"Ti" => 4,
				"Pi" => 5,
				_ => 6,
			};
			numerator = numerator
				.checked_mul(1024i128.pow(power))
				.ok_or_else(out_of_range)?;
		}
		"n" | "u" | "m" => {
			let factor = match suffix {
				"n" => 1_000_000_000,
				"u" => 1_000_000,
				_ => 1_000,
			};
			denominator = denominator.checked_mul(factor).ok_or_else(out_of_range)?;
		}
		"k" | "M" | "G" | "T" | "P" | "E" => {
			let power = match suffix {
				"k" => 1,
				"M" => 2,
				"G" => 3,
				"T" => 4,
				"P" => 5,
				_ => 6,
			};
			numerator = numerator
				.checked_mul(1000i128.pow(power))
				.ok_or_else(out_of_range)?;
		}
		_ => {
			let exponent = suffix
				.strip_prefix(['e', 'E'])
				.ok_or_else(invalid)?
				.parse::<i32>()
				.map_err(|_| invalid())?;
			if exponent.unsigned_abs() > 18 {
				return Err(out_of_range());
			}
			let factor = 10i128.pow(exponent.unsigned_abs());
			if exponent >= 0 {
				numerator = numerator.checked_mul(factor).ok_or_else(out_of_range)?;
			} else {
				denominator = denominator.checked_mul(factor).ok_or_else(out_of_range)?;
			}
		}
	}

	Ok(Fraction {
		numerator,
		denominator,
	})
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("100m", 100)]
	#[case("1", 1000)]
	#[case("1.5", 1500)]
	#[case("0.1", 100)]
	#[case(".5", 500)]
	#[case("250u", 1)]
	#[case("2e-3", 2)]
	#[case("+2", 2000)]
	fn test_millis(#[case] input: &str, #[case] expected: i64) {
		assert_eq!(millis(input), Ok(expected));
	}

	#[rstest]
	#[case("256Mi", 256 * MEBIBYTE)]
	#[case("1Gi", 1024 * MEBIBYTE)]
	#[case("128974848", 128_974_848)]
	#[case("129e6", 129_000_000)]
	#[case("123M", 123_000_000)]
	#[case("1.5Ki", 1536)]
	#[case("500m", 1)]
	fn test_whole(#[case] input: &str, #[case] expected: i64) {
		assert_eq!(whole(input), Ok(expected));
	}

	#[rstest]
	#[case("abc")]
	#[case("1.2.3")]
	#[case("-1")]
	#[case("5Xi")]
	#[case("m")]
	#[case("1e")]
	fn test_invalid(#[case] input: &str) {
		assert_matches!(whole(input), Err(QuantityError::Invalid(s)) if s == input);
	}

	#[test]
	fn test_empty() {
		assert_eq!(millis("  "), Err(QuantityError::Empty));
	}

	#[test]
	fn test_out_of_range() {
		assert_matches!(millis("100Ei"), Err(QuantityError::OutOfRange(_)));
		assert_matches!(whole("1e40"), Err(QuantityError::OutOfRange(_)));
	}

	#[rstest]
	#[case("0.0000000000000000000001e-18")]
	#[case("0.000000000000000000001E-18")]
	#[case("99999999999999999999999.9m")]
	fn test_out_of_range_denominator(#[case] input: &str) {
		assert_matches!(millis(input), Err(QuantityError::OutOfRange(s)) if s == input);
	}
}
