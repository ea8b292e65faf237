use std::fmt::Write;

use ingest_api::{ClientError, DataPoint, FieldValue};

/// Escape measurement name: commas and spaces.
fn escape_measurement(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            ',' | ' ' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
}

/// Escape tag keys, tag values and field keys: commas, equals signs, spaces.
fn escape_key(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            ',' | '=' | ' ' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
}

fn write_field_value(v: &FieldValue, out: &mut String) -> Result<(), ClientError> {
    match v {
        FieldValue::Int(i) => {
            let _ = write!(out, "{i}i");
        }
        FieldValue::UInt(u) => {
            let _ = write!(out, "{u}u");
        }
        FieldValue::Float(f) => {
            if !f.is_finite() {
                return Err(ClientError::format_err(format!("non-finite float field: {f}")));
            }
            let _ = write!(out, "{f}");
        }
        FieldValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        FieldValue::Str(s) => {
            out.push('"');
            for c in s.chars() {
                if c == '"' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
        }
    }
    Ok(())
}

/// Append one point as a line of InfluxDB line protocol (with trailing `\n`).
///
/// `timestamp_ns == 0` omits the timestamp so the server assigns its own.
/// On error `out` is left unchanged.
pub fn encode_point(point: &DataPoint, out: &mut String) -> Result<(), ClientError> {
    if point.measurement.is_empty() {
        return Err(ClientError::format_err("point has empty measurement"));
    }
    if point.fields.is_empty() {
        return Err(ClientError::format_err(format!(
            "point '{}' has no fields",
            point.measurement
        )));
    }

    let start = out.len();
    let result = encode_into(point, out);
    if result.is_err() {
        out.truncate(start);
    }
    result
}

fn encode_into(point: &DataPoint, out: &mut String) -> Result<(), ClientError> {
    escape_measurement(&point.measurement, out);
    for (k, v) in &point.tags {
        out.push(',');
        escape_key(k, out);
        out.push('=');
        escape_key(v, out);
    }
    out.push(' ');
    for (i, (k, v)) in point.fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        escape_key(k, out);
        out.push('=');
        write_field_value(v, out)?;
    }
    if point.timestamp_ns != 0 {
        let _ = write!(out, " {}", point.timestamp_ns);
    }
    out.push('\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(p: &DataPoint) -> String {
        let mut s = String::new();
        encode_point(p, &mut s).unwrap();
        s
    }

    #[test]
    fn vehicle_status_line() {
        let p = DataPoint::new("vehicle_status")
            .tag("vehicle_id", "101")
            .field("speed", 88u16)
            .field("jerk", -12i16)
            .field("flags", 0u8)
            .at(1_700_000_000_000_000_000);
        assert_eq!(
            line(&p),
            "vehicle_status,vehicle_id=101 speed=88u,jerk=-12i,flags=0u 1700000000000000000\n"
        );
    }

    #[test]
    fn escapes_special_characters() {
        let p = DataPoint::new("my measurement,x")
            .tag("tag key", "a=b,c")
            .field("note", "say \"hi\" \\o/")
            .field("ok", true)
            .field("ratio", 0.5);
        assert_eq!(
            line(&p),
            "my\\ measurement\\,x,tag\\ key=a\\=b\\,c note=\"say \\\"hi\\\" \\\\o/\",ok=true,ratio=0.5\n"
        );
    }

    #[test]
    fn rejects_points_without_fields() {
        let mut out = String::from("prefix\n");
        let p = DataPoint::new("empty").tag("a", "b");
        assert!(encode_point(&p, &mut out).is_err());
        assert_eq!(out, "prefix\n");
    }

    #[test]
    fn rejects_nan_and_rolls_back() {
        let mut out = String::new();
        let p = DataPoint::new("m").field("a", 1u8).field("b", f64::NAN);
        assert!(encode_point(&p, &mut out).is_err());
        assert!(out.is_empty());
    }
}
