//! Field-level validation shared by all records.

use super::Money;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{8,15}$").expect("valid phone regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});

/// Shape-level validation failure for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text is empty after trim.
    Blank(&'static str),
    /// Value does not match the expected format.
    InvalidFormat { field: &'static str, value: String },
    /// Numeric or temporal value outside its allowed range.
    OutOfRange {
        field: &'static str,
        message: String,
    },
    /// Collection that needs at least one element is empty.
    Empty(&'static str),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "{field} must not be blank"),
            Self::InvalidFormat { field, value } => {
                write!(f, "{field} has invalid format: `{value}`")
            }
            Self::OutOfRange { field, message } => write!(f, "{field} {message}"),
            Self::Empty(field) => write!(f, "{field} must contain at least one item"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank(field));
    }
    Ok(())
}

pub(crate) fn require_phone(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if !PHONE_RE.is_match(value) {
        return Err(ValidationError::InvalidFormat {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn require_email(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(value) {
        return Err(ValidationError::InvalidFormat {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Largest money amount accepted on a single price or line, in minor units.
pub const MAX_AMOUNT: Money = 1_000_000_000_000;
/// Largest quantity accepted on a single line.
pub const MAX_QUANTITY: i64 = 1_000_000;
/// Largest stock level a medicine may hold.
pub const MAX_STOCK: i64 = 1_000_000_000_000;

pub(crate) fn require_range(
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            message: format!("must be between {min} and {max}, got {value}"),
        });
    }
    Ok(())
}

/// Prices, costs and fees: `0..=MAX_AMOUNT`.
pub(crate) fn require_amount(field: &'static str, value: Money) -> Result<(), ValidationError> {
    require_range(field, value, 0, MAX_AMOUNT)
}

/// Line quantities: `1..=MAX_QUANTITY`.
pub(crate) fn require_quantity(field: &'static str, value: i64) -> Result<(), ValidationError> {
    require_range(field, value, 1, MAX_QUANTITY)
}

/// `quantity * unit_price`, or `OutOfRange` instead of overflowing.
pub fn line_amount(quantity: i64, unit_price: Money) -> Result<Money, ValidationError> {
    quantity
        .checked_mul(unit_price)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "amount",
            message: format!("{quantity} x {unit_price} overflows"),
        })
}

/// Sums line amounts, or `OutOfRange` instead of overflowing.
pub fn sum_amounts(
    amounts: impl IntoIterator<Item = Result<Money, ValidationError>>,
) -> Result<Money, ValidationError> {
    amounts.into_iter().try_fold(0, |total: Money, amount| {
        total
            .checked_add(amount?)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "total",
                message: "overflows".to_string(),
            })
    })
}

/// Stock after adding `quantity`, bounded by `MAX_STOCK`.
pub fn restocked(current: i64, quantity: i64) -> Result<i64, ValidationError> {
    let next = current
        .checked_add(quantity)
        .filter(|next| *next <= MAX_STOCK)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "stock",
            message: format!("{current} + {quantity} exceeds {MAX_STOCK}"),
        })?;
    Ok(next)
}

/// Normalizes a phone number: strips spaces, dots and dashes.
pub fn normalize_phone(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect()
}

/// Normalizes an email: trims and lowercases. Blank input becomes `None`.
pub fn normalize_email(value: Option<&str>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_ascii_lowercase())
        .filter(|email| !email.is_empty())
}

/// Trims optional free text. Blank input becomes `None`.
pub fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{
        line_amount, normalize_email, normalize_phone, require_amount, require_email,
        require_phone, require_quantity, restocked, sum_amounts, ValidationError, MAX_AMOUNT,
        MAX_QUANTITY, MAX_STOCK,
    };

    #[test]
    fn phone_normalization_strips_separators() {
        assert_eq!(normalize_phone("090-123 45.67"), "0901234567");
        assert!(require_phone("phone", "0901234567").is_ok());
        assert!(require_phone("phone", "12ab").is_err());
    }

    #[test]
    fn email_normalization_lowercases_and_drops_blank() {
        assert_eq!(
            normalize_email(Some("  Nurse@Clinic.ORG ")).as_deref(),
            Some("nurse@clinic.org")
        );
        assert_eq!(normalize_email(Some("   ")), None);
        assert!(require_email("email", "nurse@clinic.org").is_ok());
        assert!(require_email("email", "nurse@clinic").is_err());
    }

    #[test]
    fn amounts_and_quantities_are_bounded() {
        assert!(require_amount("price", 0).is_ok());
        assert!(require_amount("price", MAX_AMOUNT).is_ok());
        assert!(require_amount("price", MAX_AMOUNT + 1).is_err());
        assert!(require_amount("price", -1).is_err());
        assert!(require_quantity("quantity", 0).is_err());
        assert!(require_quantity("quantity", MAX_QUANTITY).is_ok());
        assert!(require_quantity("quantity", MAX_QUANTITY + 1).is_err());
    }

    #[test]
    fn arithmetic_overflow_is_reported_not_panicked() {
        assert_eq!(line_amount(3, 50_000), Ok(150_000));
        assert!(matches!(
            line_amount(1 << 40, 1 << 40),
            Err(ValidationError::OutOfRange { field: "amount", .. })
        ));
        assert_eq!(sum_amounts([Ok(1), Ok(2), Ok(3)]), Ok(6));
        assert!(matches!(
            sum_amounts([Ok(i64::MAX), Ok(150_000)]),
            Err(ValidationError::OutOfRange { field: "total", .. })
        ));
        assert_eq!(restocked(1, 9), Ok(10));
        assert!(restocked(1, i64::MAX).is_err());
        assert!(restocked(MAX_STOCK, 1).is_err());
    }
}
