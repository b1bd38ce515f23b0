//! Scalar value encoding for quad objects.

use chrono::{DateTime, FixedOffset};

use quadmap_core::{Geometry, MapperError, ObjectValue, PredicateDescriptor, Result, ScalarKind, Value};

use crate::password::PasswordHasher;

/// Seconds from 0001-01-01T00:00:00Z to the Unix epoch.
const UNIX_TO_INTERNAL: i64 = 62_135_596_800;

/// Binary datetime layout understood by the store.
///
/// `[version][seconds:8 BE][nanos:4 BE][offset minutes:2 BE]`, with a
/// trailing offset-seconds byte in version 2. Seconds count from
/// 0001-01-01 UTC; an offset of `-1` minutes means UTC, so a real zone
/// at minus one minute cannot be written.
pub fn datetime_binary(dt: &DateTime<FixedOffset>) -> std::result::Result<Vec<u8>, String> {
    let offset = dt.offset().local_minus_utc();
    let (offset_min, offset_sec) = if offset == 0 {
        (-1i16, 0i8)
    } else {
        // |offset| < 86400 so both parts fit.
        ((offset / 60) as i16, (offset % 60) as i8)
    };
    if offset != 0 && offset_min == -1 {
        return Err(format!("unexpected zone offset {offset}s"));
    }
    let version: u8 = if offset_sec == 0 { 1 } else { 2 };

    let seconds = dt.timestamp() + UNIX_TO_INTERNAL;
    let mut buf = Vec::with_capacity(16);
    buf.push(version);
    buf.extend_from_slice(&seconds.to_be_bytes());
    buf.extend_from_slice(&(dt.timestamp_subsec_nanos() as i32).to_be_bytes());
    buf.extend_from_slice(&offset_min.to_be_bytes());
    if version == 2 {
        buf.push(offset_sec as u8);
    }
    Ok(buf)
}

/// Validated GeoJSON bytes of a geometry.
pub fn geo_json(geometry: &Geometry) -> std::result::Result<Vec<u8>, String> {
    geometry.validate()?;
    serde_json::to_vec(geometry).map_err(|e| e.to_string())
}

/// Encode one scalar value as the object of a `desc` quad.
pub fn scalar_object(
    desc: &PredicateDescriptor,
    value: &Value,
    hasher: &dyn PasswordHasher,
) -> Result<ObjectValue> {
    match desc.kind {
        ScalarKind::String => match value {
            Value::Str(s) => Ok(ObjectValue::Str(s.clone())),
            other => Err(mismatch(desc, other)),
        },
        ScalarKind::Default => match value {
            Value::Str(s) => Ok(ObjectValue::Default(s.clone())),
            other => Err(mismatch(desc, other)),
        },
        ScalarKind::Password => match value {
            Value::Str(s) => hasher
                .hash(s)
                .map(ObjectValue::Password)
                .map_err(|e| MapperError::encoding(&desc.name, e)),
            other => Err(mismatch(desc, other)),
        },
        ScalarKind::Int => match value {
            Value::Int(i) => Ok(ObjectValue::Int(*i)),
            Value::UInt(u) => i64::try_from(*u)
                .map(ObjectValue::Int)
                .map_err(|_| MapperError::TypeMismatch {
                    predicate: desc.name.clone(),
                    expected: "int".into(),
                    found: format!("uint {u} beyond int range"),
                }),
            other => Err(mismatch(desc, other)),
        },
        ScalarKind::Float => match value {
            Value::Float(f) => Ok(ObjectValue::Float(*f)),
            other => Err(mismatch(desc, other)),
        },
        ScalarKind::Bool => match value {
            Value::Bool(b) => Ok(ObjectValue::Bool(*b)),
            other => Err(mismatch(desc, other)),
        },
        ScalarKind::DateTime => match value {
            Value::DateTime(dt) => datetime_binary(dt)
                .map(ObjectValue::DateTime)
                .map_err(|e| MapperError::encoding(&desc.name, e)),
            other => Err(mismatch(desc, other)),
        },
        ScalarKind::Geo => match value {
            Value::Geo(g) => geo_json(g)
                .map(ObjectValue::Geo)
                .map_err(|e| MapperError::encoding(&desc.name, e)),
            other => Err(mismatch(desc, other)),
        },
        ScalarKind::Uid => Err(mismatch(desc, value)),
        ScalarKind::Unsupported => Err(MapperError::UnsupportedScalarKind(format!(
            "{} on predicate {}",
            desc.kind, desc.name
        ))),
    }
}

pub(crate) fn mismatch(desc: &PredicateDescriptor, found: &Value) -> MapperError {
    let expected = if desc.list {
        format!("[{}]", desc.kind)
    } else {
        desc.kind.to_string()
    };
    MapperError::TypeMismatch {
        predicate: desc.name.clone(),
        expected,
        found: found.kind_name().to_string(),
    }
}
