// ════════════════════════════════════════════════════════════════
//  FieldValue
// ════════════════════════════════════════════════════════════════

/// Значение поля точки временного ряда.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self { FieldValue::Int(v) }
}

impl From<i16> for FieldValue {
    fn from(v: i16) -> Self { FieldValue::Int(v as i64) }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self { FieldValue::UInt(v) }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self { FieldValue::UInt(v as u64) }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self { FieldValue::UInt(v as u64) }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self { FieldValue::UInt(v as u64) }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self { FieldValue::Float(v) }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self { FieldValue::Bool(v) }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self { FieldValue::Str(v.to_string()) }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self { FieldValue::Str(v) }
}

// ════════════════════════════════════════════════════════════════
//  DataPoint
// ════════════════════════════════════════════════════════════════

/// Точка временного ряда: measurement + теги + поля + время.
///
/// Порядок тегов и полей сохраняется таким, каким его задал вызывающий.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, FieldValue)>,
    /// Unix-время в наносекундах.
    pub timestamp_ns: i64,
}

impl DataPoint {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: Vec::new(),
            fields: Vec::new(),
            timestamp_ns: 0,
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn at(mut self, timestamp_ns: i64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn field_value(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_order_and_lookups_work() {
        let p = DataPoint::new("vehicle_status")
            .tag("vehicle_id", "7")
            .field("speed", 120u16)
            .field("jerk", -5i16)
            .at(42);

        assert_eq!(p.tag_value("vehicle_id"), Some("7"));
        assert_eq!(p.field_value("speed"), Some(&FieldValue::UInt(120)));
        assert_eq!(p.field_value("jerk"), Some(&FieldValue::Int(-5)));
        assert_eq!(p.field_value("missing"), None);
        assert_eq!(p.fields[0].0, "speed");
        assert_eq!(p.timestamp_ns, 42);
    }
}
