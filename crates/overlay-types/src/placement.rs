use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier of a live placement.
///
/// A `PlacementId` is derived from the category label and a uniqueness
/// token (see [`crate::TokenClock`]). Its textual form is
/// `"{category}_{token}"`; the token is always the part after the last
/// underscore, so categories may themselves contain underscores or spaces.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlacementId {
    category: String,
    token: u64,
}

impl PlacementId {
    /// Derive an id from a category label and a uniqueness token.
    pub fn derive(category: impl Into<String>, token: u64) -> Self {
        Self {
            category: category.into(),
            token,
        }
    }

    /// The category label this id was derived from.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// The uniqueness token.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Parse the `"{category}_{token}"` form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let (category, token) = s
            .rsplit_once('_')
            .ok_or_else(|| TypeError::InvalidPlacementId(s.to_string()))?;
        if category.is_empty() {
            return Err(TypeError::InvalidPlacementId(s.to_string()));
        }
        let token = token
            .parse::<u64>()
            .map_err(|_| TypeError::InvalidPlacementId(s.to_string()))?;
        Ok(Self::derive(category, token))
    }
}

impl fmt::Debug for PlacementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlacementId({self})")
    }
}

impl fmt::Display for PlacementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.category, self.token)
    }
}

impl FromStr for PlacementId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Opaque placement anchor produced by the AR layer's hit test.
///
/// The core never looks inside an anchor; it only hands it back to the
/// scene attacher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor(u64);

impl Anchor {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

/// Opaque handle to an object attached to the scene.
///
/// Handles are not `Clone`: the registry holding one is the only party
/// allowed to release it.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle(u64);

impl NodeHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_category_and_token() {
        let id = PlacementId::derive("couch", 1_700_000_000_123);
        assert_eq!(id.to_string(), "couch_1700000000123");
    }

    #[test]
    fn parse_uses_last_underscore() {
        let id: PlacementId = "dining_table_42".parse().unwrap();
        assert_eq!(id.category(), "dining_table");
        assert_eq!(id.token(), 42);

        let spaced = PlacementId::parse("potted plant_7").unwrap();
        assert_eq!(spaced.category(), "potted plant");
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        assert!(PlacementId::parse("couch").is_err());
        assert!(PlacementId::parse("_12").is_err());
        assert!(PlacementId::parse("couch_abc").is_err());
    }

    #[test]
    fn same_category_different_tokens_differ() {
        assert_ne!(PlacementId::derive("chair", 1), PlacementId::derive("chair", 2));
    }

    #[test]
    fn display_parse_agree() {
        let id = PlacementId::derive("manual", 99);
        assert_eq!(PlacementId::parse(&id.to_string()).unwrap(), id);
    }
}
