use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};

/// The logical identity of an application. Instances sharing an `AppGuid`
/// are colocation candidates and are penalized by the representative's
/// scoring function.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppGuid(String);

impl AppGuid {
    pub fn new(guid: impl Into<String>) -> Self {
        Self(guid.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AppGuid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The globally unique identity of a single placement attempt.
///
/// This is the idempotency key for `ReserveAndRecastVote`, `Release`, and
/// `Claim`: it is what a representative uses to find a prior reservation.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceGuid(String);

impl InstanceGuid {
    pub fn new(guid: impl Into<String>) -> Self {
        Self(guid.into())
    }

    /// Generates a new, globally unique instance guid.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("INS-{}", uuid::Uuid::new_v4()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for InstanceGuid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An application instance to be placed on, or already resident on, a
/// representative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instance {
    pub app_guid: AppGuid,
    pub instance_guid: InstanceGuid,
    pub required_resources: u32,
    pub tentative: bool,
}

impl Instance {
    /// Creates a fresh, non-tentative instance with a newly generated guid.
    #[must_use]
    pub fn new(app_guid: AppGuid, required_resources: u32) -> Self {
        Self {
            app_guid,
            instance_guid: InstanceGuid::generate(),
            required_resources,
            tentative: false,
        }
    }
}
