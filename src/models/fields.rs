//! Column descriptors and payload validation.
//!
//! Each table lists its columns once as a `&'static [Field]`. The same list
//! drives request validation, SQL generation and foreign-key checks.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::http::response::FieldErrors;

/// Storage and validation type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Bounded string.
    Char { max_length: usize },
    /// Unbounded string.
    Text,
    /// 32-bit integer.
    Integer,
    /// 16-bit integer.
    SmallInteger,
    /// Fixed-point number, exchanged as a string.
    Decimal { max_digits: u32, decimal_places: u32 },
    /// `YYYY-MM-DD`.
    Date,
    /// Bytes, exchanged as base64.
    Binary,
}

/// Target of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

/// One column of a resource table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Name in JSON payloads.
    pub name: &'static str,
    /// Name in the database.
    pub column: &'static str,
    pub kind: FieldKind,
    /// Accepts null and blank, and may be omitted on create.
    pub nullable: bool,
    pub references: Option<ForeignKey>,
}

impl Field {
    const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            column,
            kind,
            nullable: false,
            references: None,
        }
    }

    pub const fn char(name: &'static str, column: &'static str, max_length: usize) -> Self {
        Self::new(name, column, FieldKind::Char { max_length })
    }

    pub const fn text(name: &'static str, column: &'static str) -> Self {
        Self::new(name, column, FieldKind::Text)
    }

    pub const fn integer(name: &'static str, column: &'static str) -> Self {
        Self::new(name, column, FieldKind::Integer)
    }

    pub const fn small_integer(name: &'static str, column: &'static str) -> Self {
        Self::new(name, column, FieldKind::SmallInteger)
    }

    /// A `DECIMAL(10, 2)` money column.
    pub const fn money(name: &'static str, column: &'static str) -> Self {
        Self::new(
            name,
            column,
            FieldKind::Decimal {
                max_digits: 10,
                decimal_places: 2,
            },
        )
    }

    pub const fn date(name: &'static str, column: &'static str) -> Self {
        Self::new(name, column, FieldKind::Date)
    }

    pub const fn binary(name: &'static str, column: &'static str) -> Self {
        Self::new(name, column, FieldKind::Binary)
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(ForeignKey { table, column });
        self
    }
}

/// How much of a payload must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Create or full update: every non-nullable field is required.
    Full,
    /// Partial update: only the fields sent are validated.
    Partial,
}

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";

/// Validate `payload` against `fields`.
///
/// Returns the normalised values of the known fields: strings trimmed,
/// integers as numbers, decimals as fixed-scale strings. Unknown keys are
/// ignored. In `Full` mode omitted nullable fields come back as null.
pub fn validate_payload(
    fields: &[Field],
    payload: &Map<String, Value>,
    mode: Mode,
) -> Result<Map<String, Value>, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut clean = Map::new();

    for field in fields {
        match payload.get(field.name) {
            Some(value) => match normalize(field, value) {
                Ok(value) => {
                    clean.insert(field.name.to_string(), value);
                }
                Err(messages) => {
                    for message in messages {
                        errors.add(field.name, message);
                    }
                }
            },
            None if mode == Mode::Partial => {}
            None if field.nullable => {
                clean.insert(field.name.to_string(), Value::Null);
            }
            None => errors.add(field.name, REQUIRED),
        }
    }

    if errors.is_empty() {
        Ok(clean)
    } else {
        Err(errors)
    }
}

/// Validate and normalise one value.
pub fn normalize(field: &Field, value: &Value) -> Result<Value, Vec<String>> {
    if value.is_null() {
        return if field.nullable {
            Ok(Value::Null)
        } else {
            Err(vec![NOT_NULL.to_string()])
        };
    }

    match field.kind {
        FieldKind::Char { max_length } => normalize_string(field, value, Some(max_length)),
        FieldKind::Text => normalize_string(field, value, None),
        FieldKind::Integer => normalize_integer(value, i64::from(i32::MIN), i64::from(i32::MAX)),
        FieldKind::SmallInteger => {
            normalize_integer(value, i64::from(i16::MIN), i64::from(i16::MAX))
        }
        FieldKind::Decimal {
            max_digits,
            decimal_places,
        } => normalize_decimal(value, max_digits, decimal_places),
        FieldKind::Date => normalize_date(value),
        FieldKind::Binary => normalize_binary(value),
    }
}

fn normalize_string(
    field: &Field,
    value: &Value,
    max_length: Option<usize>,
) -> Result<Value, Vec<String>> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return Err(vec!["Not a valid string.".to_string()]),
    };

    if text.is_empty() && !field.nullable {
        return Err(vec![NOT_BLANK.to_string()]);
    }
    if let Some(max) = max_length {
        if text.chars().count() > max {
            return Err(vec![format!(
                "Ensure this field has no more than {} characters.",
                max
            )]);
        }
    }
    Ok(Value::String(text))
}

fn normalize_integer(value: &Value, min: i64, max: i64) -> Result<Value, Vec<String>> {
    const INVALID: &str = "A valid integer is required.";

    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.strip_suffix(".0")
                    .and_then(|whole| whole.parse::<i64>().ok())
            })
        }
        _ => None,
    };
    let n = parsed.ok_or_else(|| vec![INVALID.to_string()])?;

    if n > max {
        return Err(vec![format!(
            "Ensure this value is less than or equal to {}.",
            max
        )]);
    }
    if n < min {
        return Err(vec![format!(
            "Ensure this value is greater than or equal to {}.",
            min
        )]);
    }
    Ok(Value::from(n))
}

fn normalize_decimal(
    value: &Value,
    max_digits: u32,
    decimal_places: u32,
) -> Result<Value, Vec<String>> {
    const INVALID: &str = "A valid number is required.";

    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(vec![INVALID.to_string()]),
    };
    let mut number: Decimal = raw.parse().map_err(|_| vec![INVALID.to_string()])?;

    // Digit counting follows the textual form, trailing zeros included.
    let digits = number.mantissa().unsigned_abs().to_string().len() as u32;
    let scale = number.scale();
    let (total, decimals) = if scale > digits {
        (scale, scale)
    } else {
        (digits, scale)
    };
    let whole = total - decimals;

    let mut messages = Vec::new();
    if total > max_digits {
        messages.push(format!(
            "Ensure that there are no more than {} digits in total.",
            max_digits
        ));
    }
    if decimals > decimal_places {
        messages.push(format!(
            "Ensure that there are no more than {} decimal places.",
            decimal_places
        ));
    }
    if whole > max_digits - decimal_places {
        messages.push(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            max_digits - decimal_places
        ));
    }
    if !messages.is_empty() {
        return Err(messages);
    }

    number.rescale(decimal_places);
    Ok(Value::String(number.to_string()))
}

fn normalize_date(value: &Value) -> Result<Value, Vec<String>> {
    const INVALID: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

    value
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
        .ok_or_else(|| vec![INVALID.to_string()])
}

fn normalize_binary(value: &Value) -> Result<Value, Vec<String>> {
    let encoded = value
        .as_str()
        .ok_or_else(|| vec!["Expected base64 encoded data.".to_string()])?;
    BASE64
        .decode(encoded.trim())
        .map(|bytes| Value::String(BASE64.encode(bytes)))
        .map_err(|_| vec!["Invalid base64 data.".to_string()])
}

/// Render a key value the way error messages quote it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &[Field] = &[
        Field::char("code", "code", 5),
        Field::money("price", "price"),
        Field::small_integer("qty", "qty"),
        Field::date("day", "day"),
        Field::char("note", "note", 10).nullable(),
    ];

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_full_mode_reports_every_missing_field() {
        let errors = validate_payload(FIELDS, &Map::new(), Mode::Full).unwrap_err();
        for name in ["code", "price", "qty", "day"] {
            assert_eq!(errors.get(name), Some(&[REQUIRED.to_string()][..]), "{}", name);
        }
        assert!(!errors.contains("note"));
    }

    #[test]
    fn test_normalises_values() {
        let clean = validate_payload(
            FIELDS,
            &object(json!({
                "code": "  S10 ",
                "price": 95.7,
                "qty": "7",
                "day": "2003-01-06",
                "extra": "ignored",
            })),
            Mode::Full,
        )
        .unwrap();

        assert_eq!(clean["code"], json!("S10"));
        assert_eq!(clean["price"], json!("95.70"));
        assert_eq!(clean["qty"], json!(7));
        assert_eq!(clean["day"], json!("2003-01-06"));
        assert_eq!(clean["note"], Value::Null);
        assert!(!clean.contains_key("extra"));
    }

    #[test]
    fn test_partial_mode_only_checks_sent_fields() {
        let clean =
            validate_payload(FIELDS, &object(json!({ "qty": 3 })), Mode::Partial).unwrap();
        assert_eq!(clean.len(), 1);

        let errors =
            validate_payload(FIELDS, &object(json!({ "qty": 40000 })), Mode::Partial).unwrap_err();
        assert_eq!(
            errors.get("qty"),
            Some(&["Ensure this value is less than or equal to 32767.".to_string()][..])
        );
    }

    #[test]
    fn test_string_rules() {
        let code = &FIELDS[0];
        assert_eq!(normalize(code, &json!("")), Err(vec![NOT_BLANK.to_string()]));
        assert_eq!(normalize(code, &Value::Null), Err(vec![NOT_NULL.to_string()]));
        assert_eq!(
            normalize(code, &json!("TOOLONG")),
            Err(vec!["Ensure this field has no more than 5 characters.".to_string()])
        );
        let note = &FIELDS[4];
        assert_eq!(normalize(note, &json!("")), Ok(json!("")));
        assert_eq!(normalize(note, &Value::Null), Ok(Value::Null));
    }

    #[test]
    fn test_decimal_limits() {
        let price = &FIELDS[1];
        assert_eq!(normalize(price, &json!("12345678.99")), Ok(json!("12345678.99")));
        assert_eq!(normalize(price, &json!("0.5")), Ok(json!("0.50")));
        assert_eq!(normalize(price, &json!("-3")), Ok(json!("-3.00")));

        let too_precise = normalize(price, &json!("1.234")).unwrap_err();
        assert_eq!(too_precise, vec!["Ensure that there are no more than 2 decimal places."]);

        let too_big = normalize(price, &json!("123456789.00")).unwrap_err();
        assert!(too_big.contains(&"Ensure that there are no more than 10 digits in total.".to_string()));
        assert!(too_big
            .contains(&"Ensure that there are no more than 8 digits before the decimal point.".to_string()));

        assert_eq!(
            normalize(price, &json!("abc")),
            Err(vec!["A valid number is required.".to_string()])
        );
    }

    #[test]
    fn test_integer_and_date_rules() {
        let qty = &FIELDS[2];
        assert_eq!(normalize(qty, &json!(5.0)), Ok(json!(5)));
        assert_eq!(normalize(qty, &json!("5.0")), Ok(json!(5)));
        assert!(normalize(qty, &json!(5.5)).is_err());
        assert!(normalize(qty, &json!("five")).is_err());

        let day = &FIELDS[3];
        assert!(normalize(day, &json!("2003-02-30")).is_err());
        assert!(normalize(day, &json!("06/01/2003")).is_err());
        assert!(normalize(day, &json!(20030106)).is_err());
    }

    #[test]
    fn test_binary_roundtrips_base64() {
        let image = Field::binary("image", "image").nullable();
        assert_eq!(normalize(&image, &json!("aGVsbG8=")), Ok(json!("aGVsbG8=")));
        assert!(normalize(&image, &json!("not base64!")).is_err());
    }
}
