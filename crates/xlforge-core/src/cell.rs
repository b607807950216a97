use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A single cell value.
///
/// On the wire a value is a bare JSON scalar: empty cells are `""`, numbers
/// are JSON numbers and everything else is a string.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Create a text value. An empty string becomes `Empty`.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    /// Check if the value is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// True when the display text is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Number(_) => false,
            CellValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Numeric value, only for cells stored as numbers
    pub fn number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Parse the value as a finite number. Text is trimmed before parsing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            CellValue::Empty => None,
        }
    }

    /// Finite number at the start of the value's text, ignoring any trailing
    /// characters: `"12 kg"` reads as 12 and `"5%"` as 5. Text that does not
    /// start with a number (after leading whitespace) gives `None`.
    pub fn leading_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => {
                let s = s.trim_start();
                s[..numeric_prefix_len(s)].parse::<f64>().ok().filter(|n| n.is_finite())
            }
            CellValue::Empty => None,
        }
    }

    /// Display text of the value
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
        }
    }
}

/// Length of the longest decimal literal at the start of `s`:
/// optional sign, digits with an optional fraction, optional exponent.
/// Zero when no digit is found.
fn numeric_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if has_digits || frac_end > end + 1 {
            has_digits = true;
            end = frac_end;
        }
    }
    if !has_digits {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    end
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::text(value)
    }
}

impl Serialize for CellValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            CellValue::Empty => serializer.serialize_str(""),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CellValueVisitor;

        impl<'de> Visitor<'de> for CellValueVisitor {
            type Value = CellValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string, number, boolean or null")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(CellValue::text(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(CellValue::text(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(CellValue::Number(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(CellValue::Number(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(CellValue::Number(v as f64))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(CellValue::Text(if v { "TRUE" } else { "FALSE" }.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(CellValue::Empty)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(CellValue::Empty)
            }
        }

        deserializer.deserialize_any(CellValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_as_text() {
        assert_eq!(CellValue::Number(30.0).as_text(), "30");
        assert_eq!(CellValue::Number(42.5).as_text(), "42.5");
        assert_eq!(CellValue::text("hello").as_text(), "hello");
        assert_eq!(CellValue::Empty.as_text(), "");
    }

    #[test]
    fn test_cell_value_as_number() {
        assert_eq!(CellValue::Number(42.0).as_number(), Some(42.0));
        assert_eq!(CellValue::text(" 10 ").as_number(), Some(10.0));
        assert_eq!(CellValue::text("n/a").as_number(), None);
        assert_eq!(CellValue::text("NaN").as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(CellValue::text("12 kg").leading_number(), Some(12.0));
        assert_eq!(CellValue::text("5%").leading_number(), Some(5.0));
        assert_eq!(CellValue::text("  -3.5e2x").leading_number(), Some(-350.0));
        assert_eq!(CellValue::text(".5").leading_number(), Some(0.5));
        assert_eq!(CellValue::text("7.").leading_number(), Some(7.0));
        assert_eq!(CellValue::text("4e").leading_number(), Some(4.0));
        assert_eq!(CellValue::Number(2.0).leading_number(), Some(2.0));
        assert_eq!(CellValue::text("$5").leading_number(), None);
        assert_eq!(CellValue::text("-").leading_number(), None);
        assert_eq!(CellValue::text(".").leading_number(), None);
        assert_eq!(CellValue::text("1e999").leading_number(), None);
        assert_eq!(CellValue::Empty.leading_number(), None);
    }

    #[test]
    fn test_empty_text_is_empty() {
        assert_eq!(CellValue::text(""), CellValue::Empty);
        assert!(CellValue::text("   ").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    #[test]
    fn test_json_scalars() {
        let values: Vec<CellValue> =
            serde_json::from_str(r#"["Bob", 30, "", null, true, 1.5]"#).unwrap();
        assert_eq!(
            values,
            vec![
                CellValue::text("Bob"),
                CellValue::Number(30.0),
                CellValue::Empty,
                CellValue::Empty,
                CellValue::text("TRUE"),
                CellValue::Number(1.5),
            ]
        );

        let json = serde_json::to_string(&vec![
            CellValue::text("ID"),
            CellValue::Number(11.0),
            CellValue::Empty,
        ])
        .unwrap();
        assert_eq!(json, r#"["ID",11.0,""]"#);
    }
}
