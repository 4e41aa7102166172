//! Type-safe identifiers for buses, routes and drivers.
//!
//! All identifiers use `Arc<str>` for cheap cloning. The live feed echoes
//! identifiers back to the server verbatim, so each identifier also remembers
//! whether the catalog delivered it as a JSON number or a JSON string and
//! serializes back in the same shape.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

macro_rules! impl_identifier {
    ($name:ident) => {
        #[derive(Clone, Debug)]
        pub struct $name {
            text: Arc<str>,
            numeric: bool,
        }

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self {
                    text: s.as_ref().into(),
                    numeric: false,
                }
            }

            pub fn from_number(n: i64) -> Self {
                Self {
                    text: n.to_string().into(),
                    numeric: true,
                }
            }

            pub fn as_str(&self) -> &str {
                &self.text
            }

            /// True when the identifier arrived as a JSON number
            pub fn is_numeric(&self) -> bool {
                self.numeric
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.text, &other.text) || self.text == other.text
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.text.hash(state);
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.text)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<i64> for $name {
            fn from(n: i64) -> Self {
                Self::from_number(n)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match self.numeric.then(|| self.text.parse::<i64>().ok()).flatten() {
                    Some(n) => serializer.serialize_i64(n),
                    None => serializer.serialize_str(&self.text),
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(IdentifierVisitor).map(|(text, numeric)| Self {
                    text: text.into(),
                    numeric,
                })
            }
        }
    };
}

/// Accepts either a JSON string or an integral JSON number
struct IdentifierVisitor;

impl<'de> Visitor<'de> for IdentifierVisitor {
    type Value = (String, bool);

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string or integer identifier")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok((v.to_owned(), false))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok((v.to_string(), true))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok((v.to_string(), true))
    }
}

impl_identifier!(BusIdentifier);
impl_identifier!(RouteIdentifier);
impl_identifier!(DriverIdentifier);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_equality() {
        let id1 = BusIdentifier::new("6");
        let id2 = BusIdentifier::from_number(6);
        let id3 = id1.clone();

        assert_eq!(id1, id2);
        assert_eq!(id1, id3);
        assert!(Arc::ptr_eq(&id1.text, &id3.text)); // Clone shares Arc
    }

    #[test]
    fn test_identifier_hash() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(RouteIdentifier::new("12"), 42);

        assert_eq!(map.get(&RouteIdentifier::from_number(12)), Some(&42));
    }

    #[test]
    fn test_identifier_keeps_json_shape() {
        let numeric: BusIdentifier = serde_json::from_str("113").unwrap();
        let text: BusIdentifier = serde_json::from_str("\"TN-67\"").unwrap();

        assert!(numeric.is_numeric());
        assert_eq!(serde_json::to_string(&numeric).unwrap(), "113");
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"TN-67\"");
    }

    #[test]
    fn test_identifier_display() {
        let id = DriverIdentifier::new("driver_1");
        assert_eq!(format!("{}", id), "driver_1");
    }
}
