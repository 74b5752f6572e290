use std::fmt;

/// BotScript runtime value: a closed union of exactly three scalar kinds.
///
/// Every operator in the interpreter matches exhaustively over this enum, so
/// adding a kind forces a compile error at each call site.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
}

impl Value {
    /// The single source of truth for truthiness: booleans as-is, numbers
    /// nonzero, strings non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness_table() {
        let cases = [
            (Value::Number(0.0), false),
            (Value::Number(1.0), true),
            (Value::String(String::new()), false),
            (Value::String("x".to_string()), true),
            (Value::Boolean(false), false),
            (Value::Boolean(true), true),
        ];
        for (value, expected) in cases {
            assert_eq!(value.is_truthy(), expected, "truthiness of {value:?}");
        }
    }

    #[test]
    fn test_equality_is_kind_and_value() {
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
        assert_ne!(Value::Number(1.0), Value::String("1".to_string()));
        assert_ne!(Value::Boolean(true), Value::Number(1.0));
    }

    #[test]
    fn test_display_stringification() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::String("hi".to_string()).to_string(), "hi");
    }
}
