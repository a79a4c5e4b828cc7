//! Lenient deserialization for upstream feeds that send `null` for empty values

use serde::{Deserialize, Deserializer};

/// Treat an explicit `null` the same as a missing field.
///
/// Pair with `#[serde(default)]` so both cases land on `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Record {
        #[serde(default, deserialize_with = "null_as_default")]
        tvl: f64,
        #[serde(default, deserialize_with = "null_as_default")]
        name: String,
    }

    #[test]
    fn test_null_and_missing_become_default() {
        let r: Record = serde_json::from_str(r#"{ "tvl": null }"#).unwrap();
        assert_eq!(r.tvl, 0.0);
        assert_eq!(r.name, "");

        let r: Record = serde_json::from_str(r#"{ "tvl": 12.5, "name": "x" }"#).unwrap();
        assert_eq!(r.tvl, 12.5);
        assert_eq!(r.name, "x");
    }

    #[test]
    fn test_wrong_type_still_fails() {
        assert!(serde_json::from_str::<Record>(r#"{ "tvl": "lots" }"#).is_err());
    }
}
