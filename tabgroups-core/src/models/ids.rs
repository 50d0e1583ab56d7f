//! Typed identifiers for host objects and groups

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Host-assigned tab id. Recycled by the host after removal, never a
    /// long-term identity across browser restarts.
    TabId
);

numeric_id!(
    /// Host-assigned window id
    WindowId
);

numeric_id!(
    /// Group id, monotonically assigned and never reused
    GroupId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_numbers() {
        assert_eq!(serde_json::to_string(&GroupId(5)).unwrap(), "5");
        let id: TabId = serde_json::from_str("42").unwrap();
        assert_eq!(id, TabId(42));
    }

    #[test]
    fn ids_display_as_numbers() {
        assert_eq!(WindowId(9).to_string(), "9");
    }
}
