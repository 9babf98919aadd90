// Persistence service descriptors
use serde::Serialize;
use std::fmt;

/// What a backend can do beyond the base contract.
///
/// Ordered so that `Modifiable > Queryable > Standard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Capability {
    Standard,
    Queryable,
    Modifiable,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Standard => "standard",
            Capability::Queryable => "queryable",
            Capability::Modifiable => "modifiable",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistenceServiceDescriptor {
    pub id: String,
    pub label: String,
    pub capability: Capability,
}
