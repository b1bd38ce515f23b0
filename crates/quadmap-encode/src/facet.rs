//! Facet encoding: field values to typed edge properties.

use quadmap_core::{Facet, MapperError, Result, Value};

/// Encode `value` as facet `key`.
///
/// Signed and unsigned integers become 8-byte little-endian ints, floats
/// 8-byte little-endian IEEE-754, datetimes RFC 3339 text.
pub fn encode_facet(key: &str, value: &Value) -> Result<Facet> {
    match value {
        Value::Int(i) => Ok(Facet::int(key, *i)),
        Value::UInt(u) => i64::try_from(*u)
            .map(|i| Facet::int(key, i))
            .map_err(|_| MapperError::TypeMismatch {
                predicate: key.to_string(),
                expected: "int facet".into(),
                found: format!("uint {u} beyond int range"),
            }),
        Value::Float(f) => Ok(Facet::float(key, *f)),
        Value::Bool(b) => Ok(Facet::bool(key, *b)),
        Value::Str(s) => Ok(Facet::string(key, s)),
        Value::DateTime(dt) => Ok(Facet::datetime(key, dt)),
        Value::Geo(_) | Value::Node(_) | Value::List(_) => Err(
            MapperError::UnsupportedScalarKind(format!("{} facet {key}", value.kind_name())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use quadmap_core::{FacetKind, FacetValue, Geometry};

    #[test]
    fn int_facet_is_little_endian() {
        let f = encode_facet("weight", &Value::Int(1)).unwrap();
        assert_eq!(f.kind, FacetKind::Int);
        assert_eq!(f.value, vec![1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn unsigned_facet_decodes_as_int() {
        let f = encode_facet("hops", &Value::UInt(3)).unwrap();
        assert_eq!(f.decode().unwrap(), FacetValue::Int(3));
        assert!(encode_facet("hops", &Value::UInt(u64::MAX)).is_err());
    }

    #[test]
    fn datetime_facet_is_rfc3339() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let dt = tz.with_ymd_and_hms(2020, 2, 3, 4, 5, 6).unwrap();
        let f = encode_facet("since", &Value::DateTime(dt)).unwrap();
        assert_eq!(f.value, b"2020-02-03T04:05:06+01:00".to_vec());
        assert_eq!(f.decode().unwrap(), FacetValue::DateTime(dt));
    }

    #[test]
    fn bool_and_string_facets() {
        let b = encode_facet("close", &Value::Bool(true)).unwrap();
        assert_eq!(b.value, b"true".to_vec());
        let s = encode_facet("via", &Value::from("work")).unwrap();
        assert_eq!(s.kind, FacetKind::String);
        assert_eq!(s.decode().unwrap(), FacetValue::String("work".into()));
    }

    #[test]
    fn geo_facet_is_unsupported() {
        let err = encode_facet("where", &Value::Geo(Geometry::Point([0.0, 0.0]))).unwrap_err();
        assert!(matches!(err, MapperError::UnsupportedScalarKind(_)));
    }
}
