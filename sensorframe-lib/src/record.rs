use std::fmt::{self, Display};

/// A typed record value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    /// Floating point value with an optional printf-style display format, e.g., `"%.1f C"`.
    Double {
        value: f64,
        format: Option<&'static str>,
    },
    /// Floating point value displayed as a derived label, e.g., `"OK"`.
    Labeled { value: f64, label: String },
}

impl Value {
    #[must_use]
    pub fn double(value: f64, format: &'static str) -> Self {
        Value::Double {
            value,
            format: Some(format),
        }
    }

    #[must_use]
    pub fn labeled(value: f64, label: impl Into<String>) -> Self {
        Value::Labeled {
            value,
            label: label.into(),
        }
    }

    /// The display form of this value.
    #[must_use]
    pub fn formatted(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(v) => v.to_string(),
            Value::Double {
                value,
                format: Some(fmt),
            } => printf(fmt, *value),
            Value::Double { value, .. } => value.to_string(),
            Value::Labeled { label, .. } => label.clone(),
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Double { value, .. } | Value::Labeled { value, .. } => Some(*value),
            Value::Str(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Labeled { label, .. } => Some(label),
            _ => None,
        }
    }
}

/// Render `value` using the `%f`, `%.Nf` and `%%` conversions of `fmt`. Other text is
/// copied through.
fn printf(fmt: &str, value: f64) -> String {
    let mut out = String::with_capacity(fmt.len() + 8);
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let mut spec = String::new();
        while let Some(&c) = chars.peek() {
            spec.push(c);
            chars.next();
            if c.is_ascii_alphabetic() {
                break;
            }
        }
        let precision = match spec.strip_suffix('f') {
            Some("") => Some(6),
            Some(p) => p.strip_prefix('.').and_then(|p| p.parse::<usize>().ok()),
            None => None,
        };
        match precision {
            Some(p) => out.push_str(&format!("{value:.p$}")),
            None => {
                out.push('%');
                out.push_str(&spec);
            }
        }
    }
    out
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

macro_rules! int_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

int_value!(bool, u8, u16, u32, i32, i64);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double {
            value,
            format: None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub key: &'static str,
    /// Human readable name; empty when the key is descriptive enough.
    pub label: &'static str,
    pub value: Value,
}

/// Ordered set of uniquely named fields describing one decoded message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    #[must_use]
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.key == key).map(|f| &f.value)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", field.key, field.value)?;
        }
        Ok(())
    }
}

/// Assembles a [Record] in field declaration order.
///
/// ```
/// use sensorframe::{Record, Value};
///
/// let temp_ok = false;
/// let record = Record::builder()
///     .field("model", "", "Bresser-6in1")
///     .field_if(temp_ok, "temperature_C", "Temperature", Value::double(3.0, "%.1f C"))
///     .field("mic", "Integrity", "CRC")
///     .build();
/// assert_eq!(record.keys().collect::<Vec<_>>(), vec!["model", "mic"]);
/// ```
#[derive(Debug, Default)]
pub struct RecordBuilder {
    fields: Vec<Field>,
}

impl RecordBuilder {
    /// Appends a field.
    ///
    /// # Panics
    /// If a field named `key` was already added.
    #[must_use]
    pub fn field(mut self, key: &'static str, label: &'static str, value: impl Into<Value>) -> Self {
        assert!(
            self.fields.iter().all(|f| f.key != key),
            "duplicate record field {key:?}"
        );
        self.fields.push(Field {
            key,
            label,
            value: value.into(),
        });
        self
    }

    /// Appends a field only when `present` is true.
    ///
    /// # Panics
    /// If a field named `key` was already added.
    #[must_use]
    pub fn field_if(
        self,
        present: bool,
        key: &'static str,
        label: &'static str,
        value: impl Into<Value>,
    ) -> Self {
        if present {
            self.field(key, label, value)
        } else {
            self
        }
    }

    #[must_use]
    pub fn build(self) -> Record {
        Record {
            fields: self.fields,
        }
    }
}

#[cfg(feature = "serde")]
mod ser {
    use super::{Record, Value};
    use serde::ser::{Serialize, SerializeMap, Serializer};

    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Value::Str(s) => serializer.serialize_str(s),
                Value::Int(v) => serializer.serialize_i64(*v),
                Value::Double { value, .. } => serializer.serialize_f64(*value),
                Value::Labeled { label, .. } => serializer.serialize_str(label),
            }
        }
    }

    /// Serialized as a map in field order.
    impl Serialize for Record {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for field in self {
                map.serialize_entry(field.key, &field.value)?;
            }
            map.end()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("%.1f C", 3.0, "3.0 C")]
    #[test_case("%.1f", 22.5, "22.5")]
    #[test_case("%.2f m/s", 0.25, "0.25 m/s")]
    #[test_case("%f", 1.5, "1.500000")]
    #[test_case("%.1f %%", 95.0, "95.0 %")]
    #[test_case("%d", 1.0, "%d" ; "unsupported conversion")]
    #[test_case("no conversion", 1.0, "no conversion")]
    fn printf_format(fmt: &'static str, value: f64, expected: &str) {
        assert_eq!(Value::double(value, fmt).formatted(), expected);
    }

    #[test]
    fn negative_rounding() {
        assert_eq!(Value::double(-11.8, "%.1f C").formatted(), "-11.8 C");
    }

    #[test]
    fn value_conversions() {
        assert_eq!(Value::from(true), Value::Int(1));
        assert_eq!(Value::from(7u8).as_i64(), Some(7));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::labeled(1.0, "OK").formatted(), "OK");
        assert_eq!(Value::labeled(1.0, "OK").as_f64(), Some(1.0));
    }

    #[test]
    fn builder_keeps_order_and_gates() {
        let record = Record::builder()
            .field("model", "", "m")
            .field_if(false, "temperature_C", "Temperature", 1.0)
            .field_if(true, "humidity", "Humidity", 50)
            .field("mic", "Integrity", "CRC")
            .build();
        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            vec!["model", "humidity", "mic"]
        );
        assert!(!record.contains("temperature_C"));
        assert_eq!(record.get("humidity"), Some(&Value::Int(50)));
        assert_eq!(record.to_string(), "model: m, humidity: 50, mic: CRC");
    }

    #[test]
    #[should_panic(expected = "duplicate record field")]
    fn builder_rejects_duplicate_keys() {
        let _ = Record::builder().field("id", "", 1).field("id", "", 2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serialize_in_field_order() {
        let record = Record::builder()
            .field("model", "", "m")
            .field("id", "", 3)
            .field("temperature_C", "", Value::double(2.5, "%.1f C"))
            .field("battery", "", Value::labeled(1.0, "OK"))
            .build();
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"model":"m","id":3,"temperature_C":2.5,"battery":"OK"}"#
        );
    }
}
