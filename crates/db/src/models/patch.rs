//! Three-state field for partial updates.
//!
//! A JSON body distinguishes a field that is absent from one that is
//! explicitly `null`; `Option<T>` cannot. Update payloads mark their fields
//! `#[serde(default)]` so an absent field deserializes to [`Patch::Missing`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hierarchy::HierarchyError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Missing,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Patch::Missing)
    }

    /// Value for a column that cannot be cleared. `None` leaves it unchanged.
    pub fn required(&self, field: &'static str) -> Result<Option<&T>, HierarchyError> {
        match self {
            Patch::Missing => Ok(None),
            Patch::Null => Err(HierarchyError::validation(field, "must not be null")),
            Patch::Value(value) => Ok(Some(value)),
        }
    }

    /// Value for a nullable column: `None` leaves it unchanged, `Some(None)` clears it.
    pub fn nullable(&self) -> Option<Option<&T>> {
        match self {
            Patch::Missing => None,
            Patch::Null => Some(None),
            Patch::Value(value) => Some(Some(value)),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Missing | Patch::Null => serializer.serialize_none(),
            Patch::Value(value) => serializer.serialize_some(value),
        }
    }
}
