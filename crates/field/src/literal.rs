use num_bigint::BigUint;

use crate::FieldId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseLiteralError {
	#[error("empty literal")]
	Empty,
	#[error("malformed literal {literal:?}")]
	Malformed { literal: String },
	#[error("literal {literal} is not smaller than the {field} modulus")]
	OutOfRange { literal: String, field: FieldId },
}

/// Parses an unsigned integer literal.
///
/// Accepts decimal (`20240825`) and hexadecimal with a `0x`/`0X` prefix (`0x1dcc...`). Underscores
/// are accepted as digit separators. Signs and whitespace are not.
pub fn parse_literal(literal: &str) -> Result<BigUint, ParseLiteralError> {
	if literal.is_empty() {
		return Err(ParseLiteralError::Empty);
	}
	let (digits, radix) = match literal
		.strip_prefix("0x")
		.or_else(|| literal.strip_prefix("0X"))
	{
		Some(hex) => (hex, 16),
		None => (literal, 10),
	};
	let malformed = || ParseLiteralError::Malformed {
		literal: literal.to_string(),
	};
	let digits: Vec<u8> = digits.bytes().filter(|&b| b != b'_').collect();
	if digits.is_empty() || !digits.iter().all(|b| (*b as char).is_digit(radix)) {
		return Err(malformed());
	}
	BigUint::parse_bytes(&digits, radix).ok_or_else(malformed)
}
