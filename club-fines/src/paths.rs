//! Where a club's data lives in the remote tree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use treesync::Path;

use crate::records::{ClubId, ListItem};

/// Which top level tree club data is read from and written to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseLevel {
    #[default]
    Regular,
    Debug,
    Testing,
}

impl DatabaseLevel {
    pub fn root(&self) -> &'static str {
        match self {
            DatabaseLevel::Regular => "clubs",
            DatabaseLevel::Debug => "debugClubs",
            DatabaseLevel::Testing => "testableClubs",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseLevel::Regular => "regular",
            DatabaseLevel::Debug => "debug",
            DatabaseLevel::Testing => "testing",
        }
    }
}

impl fmt::Display for DatabaseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown database level {0:?}, expected regular, debug or testing")]
pub struct UnknownLevel(pub String);

impl FromStr for DatabaseLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(DatabaseLevel::Regular),
            "debug" => Ok(DatabaseLevel::Debug),
            "testing" => Ok(DatabaseLevel::Testing),
            _ => Err(UnknownLevel(s.to_string())),
        }
    }
}

/// Paths of one club.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClubPaths {
    club: Path,
}

impl ClubPaths {
    pub fn new(level: DatabaseLevel, club_id: ClubId) -> Self {
        Self {
            club: Path::parse(level.root()).child(club_id.to_string()),
        }
    }

    pub fn club(&self) -> &Path {
        &self.club
    }

    pub fn list<T: ListItem>(&self) -> Path {
        self.club.child(T::COLLECTION)
    }

    pub fn item<T: ListItem>(&self, id: &T::Id) -> Path
    where
        T::Id: fmt::Display,
    {
        self.list::<T>().child(id.to_string())
    }

    pub fn identifier(&self) -> Path {
        self.club.child("identifier")
    }

    pub fn name(&self) -> Path {
        self.club.child("name")
    }

    pub fn region_code(&self) -> Path {
        self.club.child("regionCode")
    }

    pub fn in_app_payment_active(&self) -> Path {
        self.club.child("inAppPaymentActive")
    }

    pub fn late_payment_interest(&self) -> Path {
        self.club.child("latePaymentInterest")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Fine, Person, ReasonTemplate};

    #[test]
    fn test_club_paths() {
        let club_id: ClubId = "1E5A0B9C-2D3F-4A6B-8C7D-9E0F1A2B3C4D".parse().unwrap();
        let paths = ClubPaths::new(DatabaseLevel::Debug, club_id);
        assert_eq!(
            paths.list::<Person>().to_string(),
            "debugClubs/1E5A0B9C-2D3F-4A6B-8C7D-9E0F1A2B3C4D/persons"
        );
        assert!(paths.list::<Fine>().to_string().ends_with("/fines"));
        assert!(paths.list::<ReasonTemplate>().to_string().ends_with("/reasons"));
        assert!(paths.late_payment_interest().starts_with(paths.club()));
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("Testing".parse(), Ok(DatabaseLevel::Testing));
        assert_eq!(DatabaseLevel::Testing.root(), "testableClubs");
        assert!("staging".parse::<DatabaseLevel>().is_err());
        assert_eq!(DatabaseLevel::default().to_string(), "regular");
    }
}
