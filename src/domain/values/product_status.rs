use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a tracked product. `Testing` is the entry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Testing,
    Active,
    Scaling,
    Paused,
    Killed,
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductStatus::Testing => write!(f, "testing"),
            ProductStatus::Active => write!(f, "active"),
            ProductStatus::Scaling => write!(f, "scaling"),
            ProductStatus::Paused => write!(f, "paused"),
            ProductStatus::Killed => write!(f, "killed"),
        }
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "testing" => Ok(ProductStatus::Testing),
            "active" => Ok(ProductStatus::Active),
            "scaling" => Ok(ProductStatus::Scaling),
            "paused" => Ok(ProductStatus::Paused),
            "killed" => Ok(ProductStatus::Killed),
            _ => Err(format!("Unknown product status: {s}")),
        }
    }
}
