//! File entry flags
//!
//! Flags are stored as four independent facets and only turned into the
//! fixed-width `<type><status><modifier><rename>` text at the codec boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Character written for an unset facet
const UNSET: char = '.';

/// What kind of object an entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FileType {
    #[default]
    Unset,
    File,
    Directory,
    Link,
    /// Bundle manifest reference (MoM only)
    Manifest,
    /// Iterative manifest reference (MoM only)
    IterativeManifest,
    /// Delta manifest reference (MoM only)
    DeltaManifest,
}

impl FileType {
    fn to_char(self) -> char {
        match self {
            FileType::Unset => UNSET,
            FileType::File => 'F',
            FileType::Directory => 'D',
            FileType::Link => 'L',
            FileType::Manifest => 'M',
            FileType::IterativeManifest => 'I',
            FileType::DeltaManifest => 'X',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            UNSET => FileType::Unset,
            'F' => FileType::File,
            'D' => FileType::Directory,
            'L' => FileType::Link,
            'M' => FileType::Manifest,
            'I' => FileType::IterativeManifest,
            'X' => FileType::DeltaManifest,
            _ => return None,
        })
    }
}

/// Lifecycle status of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileStatus {
    #[default]
    Unset,
    Deleted,
    Ghosted,
    /// Experimental bundle (MoM only)
    Experimental,
}

impl FileStatus {
    fn to_char(self) -> char {
        match self {
            FileStatus::Unset => UNSET,
            FileStatus::Deleted => 'd',
            FileStatus::Ghosted => 'g',
            FileStatus::Experimental => 'e',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            UNSET => FileStatus::Unset,
            'd' => FileStatus::Deleted,
            'g' => FileStatus::Ghosted,
            'e' => FileStatus::Experimental,
            _ => return None,
        })
    }
}

/// Location-derived modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileModifier {
    #[default]
    Unset,
    Config,
    State,
    Boot,
}

impl FileModifier {
    fn to_char(self) -> char {
        match self {
            FileModifier::Unset => UNSET,
            FileModifier::Config => 'C',
            FileModifier::State => 's',
            FileModifier::Boot => 'b',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            UNSET => FileModifier::Unset,
            'C' => FileModifier::Config,
            's' => FileModifier::State,
            'b' => FileModifier::Boot,
            _ => return None,
        })
    }

    /// Modifier implied by an absolute path inside a bundle tree
    pub fn for_path(path: &str) -> Self {
        let under = |prefix: &str| path == prefix || path.starts_with(&format!("{}/", prefix));
        if under("/etc") {
            FileModifier::Config
        } else if under("/var") {
            FileModifier::State
        } else if under("/boot") {
            FileModifier::Boot
        } else {
            FileModifier::Unset
        }
    }
}

/// The four flag facets of a file entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags {
    pub file_type: FileType,
    pub status: FileStatus,
    pub modifier: FileModifier,
    pub renamed: bool,
}

impl Flags {
    /// Flags for an entry of the given type with every other facet unset
    pub fn of_type(file_type: FileType) -> Self {
        Self {
            file_type,
            ..Self::default()
        }
    }

    /// Set the status facet
    pub fn with_status(mut self, status: FileStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the modifier facet
    pub fn with_modifier(mut self, modifier: FileModifier) -> Self {
        self.modifier = modifier;
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.status == FileStatus::Deleted
    }

    pub fn is_directory(&self) -> bool {
        self.file_type == FileType::Directory
    }

    pub fn is_experimental(&self) -> bool {
        self.status == FileStatus::Experimental
    }

    /// Encode to the four-character manifest field
    pub fn encode(&self) -> String {
        let rename = if self.renamed { 'r' } else { UNSET };
        [
            self.file_type.to_char(),
            self.status.to_char(),
            self.modifier.to_char(),
            rename,
        ]
        .iter()
        .collect()
    }

    /// Decode the four-character manifest field
    pub fn decode(field: &str) -> Result<Self> {
        let chars: Vec<char> = field.chars().collect();
        let &[t, s, m, r] = chars.as_slice() else {
            return Err(Error::InvalidFlags(field.to_string()));
        };
        let invalid = || Error::InvalidFlags(field.to_string());
        let renamed = match r {
            'r' => true,
            UNSET => false,
            _ => return Err(invalid()),
        };
        Ok(Self {
            file_type: FileType::from_char(t).ok_or_else(invalid)?,
            status: FileStatus::from_char(s).ok_or_else(invalid)?,
            modifier: FileModifier::from_char(m).ok_or_else(invalid)?,
            renamed,
        })
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Flags {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Flags::decode(s)
    }
}
