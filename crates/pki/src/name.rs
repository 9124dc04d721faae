//! Distinguished names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PkiError;

/// Ordered list of `attribute=value` pairs, e.g. `CN=node-1,O=Keystone`.
///
/// The empty name is the NULL-DN used by protocol senders that do not know
/// their own name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DistinguishedName {
    attributes: Vec<(String, String)>,
}

impl DistinguishedName {
    /// The NULL-DN.
    pub fn null() -> Self {
        Self::default()
    }

    /// Single common-name DN.
    pub fn common_name(cn: impl Into<String>) -> Self {
        Self {
            attributes: vec![("CN".to_string(), cn.into())],
        }
    }

    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .push((attribute.into().to_ascii_uppercase(), value.into()));
        self
    }

    pub fn is_null(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(attribute))
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (attr, value)) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{attr}={value}")?;
        }
        Ok(())
    }
}

impl FromStr for DistinguishedName {
    type Err = PkiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::null());
        }

        let mut name = Self::null();
        for part in s.split(',') {
            let (attr, value) = part
                .split_once('=')
                .ok_or_else(|| PkiError::InvalidName(format!("missing '=' in {part:?}")))?;
            let attr = attr.trim();
            if attr.is_empty() {
                return Err(PkiError::InvalidName(format!("empty attribute in {part:?}")));
            }
            name = name.with(attr, value.trim());
        }
        Ok(name)
    }
}

impl TryFrom<String> for DistinguishedName {
    type Error = PkiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DistinguishedName> for String {
    fn from(name: DistinguishedName) -> Self {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let name: DistinguishedName = "cn=node-1, O=Keystone".parse().unwrap();
        assert_eq!(name.to_string(), "CN=node-1,O=Keystone");
        assert_eq!(name.get("o"), Some("Keystone"));
    }

    #[test]
    fn test_null_dn() {
        let name: DistinguishedName = "".parse().unwrap();
        assert!(name.is_null());
        assert_eq!(name, DistinguishedName::null());
        assert!(!DistinguishedName::common_name("x").is_null());
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("CN".parse::<DistinguishedName>().is_err());
        assert!("=value".parse::<DistinguishedName>().is_err());
    }

    #[test]
    fn test_order_matters() {
        let a = DistinguishedName::common_name("a").with("O", "b");
        let b = DistinguishedName::null().with("O", "b").with("CN", "a");
        assert_ne!(a, b);
    }

    #[test]
    fn test_serde_as_string() {
        let name = DistinguishedName::common_name("ca").with("O", "Keystone");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"CN=ca,O=Keystone\"");
        let back: DistinguishedName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
