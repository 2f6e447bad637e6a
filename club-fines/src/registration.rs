//! Resumable sign up.
//!
//! Signing up takes several screens. The progress so far is a [`RegistrationStatus`], and every step replaces it
//! as a whole. [`SignInCache`] writes each status to disk atomically, so after a restart the user continues where
//! they left off. A missing or unreadable file just means that no sign up is in progress.
//!
//! The status moves forward like this, and each step can go back one step:
//!
//! ```text
//! NameInput -> ClubSelection -> PersonSelection        (joining an existing club)
//!                            -> ClubPropertiesInput    (creating a new club)
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::records::{ClubId, OptionalPersonName, PersonName};

pub const CACHE_FILE_NAME: &str = "signInCache.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameInputProperty {
    pub user_id: String,
    #[serde(default)]
    pub name: OptionalPersonName,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubSelectionProperty {
    pub user_id: String,
    pub name: PersonName,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSelectionProperty {
    pub user_id: String,
    pub name: PersonName,
    pub club_id: ClubId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubPropertiesInputProperty {
    pub user_id: String,
    pub name: PersonName,
}

impl NameInputProperty {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: OptionalPersonName::default(),
        }
    }

    pub fn with_name(self, name: PersonName) -> ClubSelectionProperty {
        ClubSelectionProperty {
            user_id: self.user_id,
            name,
        }
    }
}

impl ClubSelectionProperty {
    pub fn join_club(self, club_id: ClubId) -> PersonSelectionProperty {
        PersonSelectionProperty {
            user_id: self.user_id,
            name: self.name,
            club_id,
        }
    }

    pub fn create_club(self) -> ClubPropertiesInputProperty {
        ClubPropertiesInputProperty {
            user_id: self.user_id,
            name: self.name,
        }
    }

    pub fn back(self) -> NameInputProperty {
        NameInputProperty {
            user_id: self.user_id,
            name: self.name.into(),
        }
    }
}

impl PersonSelectionProperty {
    pub fn back(self) -> ClubSelectionProperty {
        ClubSelectionProperty {
            user_id: self.user_id,
            name: self.name,
        }
    }
}

impl ClubPropertiesInputProperty {
    pub fn back(self) -> ClubSelectionProperty {
        ClubSelectionProperty {
            user_id: self.user_id,
            name: self.name,
        }
    }
}

/// Persisted as `{"status": <variant>, "property": <payload>}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "property", rename_all = "camelCase")]
pub enum RegistrationStatus {
    NameInput(NameInputProperty),
    ClubSelection(ClubSelectionProperty),
    PersonSelection(PersonSelectionProperty),
    ClubPropertiesInput(ClubPropertiesInputProperty),
}

impl RegistrationStatus {
    pub fn user_id(&self) -> &str {
        match self {
            RegistrationStatus::NameInput(property) => &property.user_id,
            RegistrationStatus::ClubSelection(property) => &property.user_id,
            RegistrationStatus::PersonSelection(property) => &property.user_id,
            RegistrationStatus::ClubPropertiesInput(property) => &property.user_id,
        }
    }

    /// The complete name, once it has been entered.
    pub fn person_name(&self) -> Option<&PersonName> {
        match self {
            RegistrationStatus::NameInput(_) => None,
            RegistrationStatus::ClubSelection(property) => Some(&property.name),
            RegistrationStatus::PersonSelection(property) => Some(&property.name),
            RegistrationStatus::ClubPropertiesInput(property) => Some(&property.name),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            RegistrationStatus::NameInput(_) => "nameInput",
            RegistrationStatus::ClubSelection(_) => "clubSelection",
            RegistrationStatus::PersonSelection(_) => "personSelection",
            RegistrationStatus::ClubPropertiesInput(_) => "clubPropertiesInput",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("could not access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not encode registration status: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("can't go from {from} to {to}")]
    Illegal {
        from: &'static str,
        to: &'static str,
    },
    #[error("the registration belongs to user {expected}, not {found}")]
    UserMismatch { expected: String, found: String },
    #[error("the name can only be changed while it is being entered")]
    NameChanged,
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Checks that going from `from` to `to` is one of the allowed steps.
pub fn check_transition(
    from: Option<&RegistrationStatus>,
    to: &RegistrationStatus,
) -> Result<(), TransitionError> {
    use RegistrationStatus::*;

    let Some(from) = from else {
        return match to {
            NameInput(_) => Ok(()),
            _ => Err(TransitionError::Illegal {
                from: "none",
                to: to.tag(),
            }),
        };
    };
    if from.user_id() != to.user_id() {
        return Err(TransitionError::UserMismatch {
            expected: from.user_id().to_string(),
            found: to.user_id().to_string(),
        });
    }
    match (from, to) {
        (NameInput(_), NameInput(_) | ClubSelection(_)) => Ok(()),
        (ClubSelection(_), NameInput(_)) => Ok(()),
        (
            ClubSelection(_) | PersonSelection(_) | ClubPropertiesInput(_),
            ClubSelection(_) | PersonSelection(_) | ClubPropertiesInput(_),
        ) if from.person_name() != to.person_name() => Err(TransitionError::NameChanged),
        (
            ClubSelection(_),
            ClubSelection(_) | PersonSelection(_) | ClubPropertiesInput(_),
        ) => Ok(()),
        (PersonSelection(_), PersonSelection(_) | ClubSelection(_)) => Ok(()),
        (ClubPropertiesInput(_), ClubPropertiesInput(_) | ClubSelection(_)) => Ok(()),
        _ => Err(TransitionError::Illegal {
            from: from.tag(),
            to: to.tag(),
        }),
    }
}

/// The on-disk registration progress of this device.
pub struct SignInCache {
    file: PathBuf,
    state: Option<RegistrationStatus>,
}

impl SignInCache {
    /// Opens the cache in `dir`, creating the directory if needed, and loads the stored status.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| CacheError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let file = dir.join(CACHE_FILE_NAME);
        let state = read_document(&file);
        if let Some(state) = &state {
            log::info!("Resuming registration at {}", state.tag());
        }
        Ok(Self { file, state })
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Reads the stored status from disk. Absent or unreadable content is `None`.
    pub fn current_state(&self) -> Option<RegistrationStatus> {
        read_document(&self.file)
    }

    /// The last status this cache loaded or stored.
    pub fn state(&self) -> Option<&RegistrationStatus> {
        self.state.as_ref()
    }

    pub fn reload(&mut self) -> Option<&RegistrationStatus> {
        self.state = read_document(&self.file);
        self.state.as_ref()
    }

    /// Stores `status`, replacing whatever was stored before. `None` deletes the file.
    /// No transition checks happen here, see [`SignInCache::transition`].
    pub fn set_state(&mut self, status: Option<RegistrationStatus>) -> Result<(), CacheError> {
        match &status {
            Some(status) => self.write(status)?,
            None => self.delete()?,
        }
        self.state = status;
        Ok(())
    }

    /// Like [`SignInCache::set_state`], but only for allowed steps. Going to `None` (finishing or abandoning the
    /// registration) is always allowed.
    pub fn transition(&mut self, to: Option<RegistrationStatus>) -> Result<(), TransitionError> {
        if let Some(to) = &to {
            check_transition(self.state.as_ref(), to).inspect_err(|e| {
                log::warn!("Rejected registration step: {e}");
            })?;
        }
        Ok(self.set_state(to)?)
    }

    pub fn clear(&mut self) -> Result<(), CacheError> {
        self.set_state(None)
    }

    fn io_error(&self, source: io::Error) -> CacheError {
        CacheError::Io {
            path: self.file.clone(),
            source,
        }
    }

    fn write(&self, status: &RegistrationStatus) -> Result<(), CacheError> {
        let document = serde_json::to_vec(status)?;
        let dir = self.file.parent().unwrap_or(Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        temp.write_all(&document).map_err(|e| self.io_error(e))?;
        temp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        temp.persist(&self.file).map_err(|e| self.io_error(e.error))?;
        log::debug!("Stored registration status {}", status.tag());
        Ok(())
    }

    fn delete(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.file) {
            Ok(()) => {
                log::debug!("Removed registration cache");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

fn read_document(file: &Path) -> Option<RegistrationStatus> {
    let bytes = match fs::read(file) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            log::warn!("Could not read {}: {e}", file.display());
            return None;
        }
    };
    serde_json::from_slice(&bytes)
        .inspect_err(|e| {
            log::warn!("Ignoring unreadable registration cache: {e}");
        })
        .ok()
}
