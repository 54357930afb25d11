//! Bundle header metadata

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::flags::FileStatus;
use crate::format::{supports, Feature};

/// Name of the base bundle every other bundle includes
pub const OS_CORE: &str = "os-core";

/// Lifecycle status of a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BundleStatus {
    #[default]
    Active,
    Experimental,
    Deprecated,
    #[serde(rename = "Pending-Delete")]
    PendingDelete,
}

impl BundleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleStatus::Active => "Active",
            BundleStatus::Experimental => "Experimental",
            BundleStatus::Deprecated => "Deprecated",
            BundleStatus::PendingDelete => "Pending-Delete",
        }
    }
}

impl fmt::Display for BundleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BundleStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "Active" => Ok(BundleStatus::Active),
            "Experimental" => Ok(BundleStatus::Experimental),
            "Deprecated" => Ok(BundleStatus::Deprecated),
            "Pending-Delete" => Ok(BundleStatus::PendingDelete),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// Descriptive header of a bundle definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleHeader {
    pub title: String,
    pub description: String,
    pub status: BundleStatus,
}

impl BundleHeader {
    /// Status facet the bundle's MoM entry carries at `format`
    pub fn mom_status(&self, format: u32) -> FileStatus {
        if self.status == BundleStatus::Experimental
            && supports(format, Feature::ExperimentalBundleStatus)
        {
            FileStatus::Experimental
        } else {
            FileStatus::Unset
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("Experimental".parse::<BundleStatus>().unwrap(), BundleStatus::Experimental);
        assert_eq!("".parse::<BundleStatus>().unwrap(), BundleStatus::Active);
        assert_eq!(
            "Pending-Delete".parse::<BundleStatus>().unwrap(),
            BundleStatus::PendingDelete
        );
        assert!("Retired".parse::<BundleStatus>().is_err());
    }

    #[test]
    fn test_mom_status_gated_by_format() {
        let header = BundleHeader {
            status: BundleStatus::Experimental,
            ..Default::default()
        };
        assert_eq!(header.mom_status(26), FileStatus::Unset);
        assert_eq!(header.mom_status(27), FileStatus::Experimental);
        assert_eq!(BundleHeader::default().mom_status(27), FileStatus::Unset);
    }

    #[test]
    fn test_header_deserializes_with_defaults() {
        let header: BundleHeader = serde_json::from_str(r#"{"status":"Experimental"}"#).unwrap();
        assert_eq!(header.status, BundleStatus::Experimental);
        assert!(header.title.is_empty());
    }
}
