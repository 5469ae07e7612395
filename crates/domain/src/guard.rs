use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use warrant_core::{AppResult, NonEmptyString};

/// Authentication guard name partitioning roles and permissions by principal type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuardName(NonEmptyString);

impl GuardName {
    /// Creates a validated guard name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        NonEmptyString::new(value).map(Self)
    }

    /// Returns the guard name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for GuardName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl PartialEq<str> for GuardName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for GuardName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}
