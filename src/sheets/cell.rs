//! Loose readers for unformatted cell values.
//!
//! Sheets hand back numbers, strings or nothing at all for the same logical
//! field, so every reader falls back to a zero value instead of failing.

use serde_json::Value;

pub fn cell_str(cell: Option<&Value>) -> String {
    match cell {
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

pub fn is_blank(cell: Option<&Value>) -> bool {
    match cell {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

#[allow(clippy::cast_possible_truncation)]
pub fn parse_int(cell: Option<&Value>) -> i64 {
    match cell {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

pub fn parse_float(cell: Option<&Value>) -> f64 {
    match cell {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
