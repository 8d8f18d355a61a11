/*
 * profile.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Scambio, a MAPI/RPC client protocol engine.
 *
 * Scambio is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Scambio is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Scambio.  If not, see <http://www.gnu.org/licenses/>.
 */

//! The profile database: named account profiles in one JSON file, default
//! path `~/.openchange/profiles.ldb`. One profile may be flagged as the
//! default and is used when logon is given no name.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MapiError;

/// One account profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub username: String,
    pub password: String,
    pub domain: String,
    pub server: String,
    /// Mailbox distinguished name; resolved through the directory service
    /// at logon when absent.
    pub mailbox_dn: Option<String>,
    pub codepage: u32,
    pub language: u32,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Profile {
    pub fn new(name: impl Into<String>, username: impl Into<String>) -> Profile {
        let now = Utc::now();
        Profile {
            name: name.into(),
            username: username.into(),
            password: String::new(),
            domain: String::new(),
            server: String::new(),
            mailbox_dn: None,
            codepage: 1252,
            language: 0x0409,
            created: now,
            modified: now,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    default: Option<String>,
    profiles: Vec<Profile>,
}

/// File-backed profile collection. Every mutation is written back
/// immediately.
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, Profile>,
    default: Option<String>,
}

impl ProfileStore {
    /// `~/.openchange/profiles.ldb`.
    pub fn default_path() -> Result<PathBuf, MapiError> {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .map(|h| h.join(".openchange").join("profiles.ldb"))
            .ok_or_else(|| MapiError::InvalidParameter("cannot resolve home directory".into()))
    }

    /// Open an existing database or start a fresh one at the given path.
    /// A missing file is fine when its directory exists; a path whose
    /// directory does not exist is rejected.
    pub fn open(path: &Path) -> Result<ProfileStore, MapiError> {
        let mut store = ProfileStore {
            path: path.to_path_buf(),
            profiles: BTreeMap::new(),
            default: None,
        };
        match fs::read(path) {
            Ok(raw) => {
                let file: StoreFile = serde_json::from_slice(&raw).map_err(|e| {
                    MapiError::InvalidParameter(format!(
                        "profile store {} is not readable: {}",
                        path.display(),
                        e
                    ))
                })?;
                for profile in file.profiles {
                    store.profiles.insert(profile.name.clone(), profile);
                }
                store.default = file.default;
                Ok(store)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let dir = path.parent().unwrap_or(Path::new("."));
                if dir.as_os_str().is_empty() || dir.is_dir() {
                    Ok(store)
                } else {
                    Err(MapiError::InvalidParameter(format!(
                        "profile store directory {} does not exist",
                        dir.display()
                    )))
                }
            }
            Err(e) => Err(MapiError::InvalidParameter(format!(
                "profile store {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn save(&self) -> Result<(), MapiError> {
        let file = StoreFile {
            default: self.default.clone(),
            profiles: self.profiles.values().cloned().collect(),
        };
        let raw = serde_json::to_vec_pretty(&file)
            .map_err(|e| MapiError::InvalidParameter(format!("profile store encoding: {}", e)))?;
        fs::write(&self.path, raw).map_err(|e| {
            MapiError::InvalidParameter(format!(
                "cannot write profile store {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn create(&mut self, mut profile: Profile) -> Result<(), MapiError> {
        if profile.name.is_empty() {
            return Err(MapiError::InvalidParameter("profile name is empty".into()));
        }
        if self.profiles.contains_key(&profile.name) {
            return Err(MapiError::InvalidParameter(format!(
                "profile {} already exists",
                profile.name
            )));
        }
        profile.modified = Utc::now();
        self.profiles.insert(profile.name.clone(), profile);
        self.save()
    }

    /// Look up by name, or the default profile when no name is given.
    pub fn get(&self, name: Option<&str>) -> Result<&Profile, MapiError> {
        let name = match name {
            Some(n) => n,
            None => self.default.as_deref().ok_or(MapiError::NotFound)?,
        };
        self.profiles.get(name).ok_or(MapiError::NotFound)
    }

    pub fn delete(&mut self, name: &str) -> Result<(), MapiError> {
        if self.profiles.remove(name).is_none() {
            return Err(MapiError::NotFound);
        }
        if self.default.as_deref() == Some(name) {
            self.default = None;
        }
        self.save()
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), MapiError> {
        if !self.profiles.contains_key(name) {
            return Err(MapiError::NotFound);
        }
        self.default = Some(name.to_string());
        self.save()
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(|n| n.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scambio-profile-{}-{}", std::process::id(), tag));
        fs::create_dir_all(&dir).unwrap();
        dir.join("profiles.ldb")
    }

    #[test]
    fn missing_directory_is_rejected() {
        let path = Path::new("/nonexistent-scambio-dir/profiles.ldb");
        assert!(matches!(
            ProfileStore::open(path),
            Err(MapiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn fresh_store_round_trips() {
        let path = temp_store("roundtrip");
        let _ = fs::remove_file(&path);
        let mut store = ProfileStore::open(&path).unwrap();
        let mut profile = Profile::new("work", "jdoe");
        profile.server = "exchange.example.net".into();
        store.create(profile.clone()).unwrap();
        store.set_default("work").unwrap();

        let reloaded = ProfileStore::open(&path).unwrap();
        assert_eq!(reloaded.default_name(), Some("work"));
        let got = reloaded.get(None).unwrap();
        assert_eq!(got.username, "jdoe");
        assert_eq!(got.server, "exchange.example.net");
    }

    #[test]
    fn duplicate_profile_rejected() {
        let path = temp_store("dup");
        let _ = fs::remove_file(&path);
        let mut store = ProfileStore::open(&path).unwrap();
        store.create(Profile::new("a", "u")).unwrap();
        assert!(store.create(Profile::new("a", "u")).is_err());
    }

    #[test]
    fn missing_profile_is_not_found() {
        let path = temp_store("missing");
        let _ = fs::remove_file(&path);
        let mut store = ProfileStore::open(&path).unwrap();
        assert!(matches!(store.get(Some("nope")), Err(MapiError::NotFound)));
        assert!(matches!(store.get(None), Err(MapiError::NotFound)));
        assert!(matches!(store.delete("nope"), Err(MapiError::NotFound)));
    }

    #[test]
    fn delete_clears_default() {
        let path = temp_store("deldefault");
        let _ = fs::remove_file(&path);
        let mut store = ProfileStore::open(&path).unwrap();
        store.create(Profile::new("a", "u")).unwrap();
        store.set_default("a").unwrap();
        store.delete("a").unwrap();
        assert_eq!(store.default_name(), None);
    }

    #[test]
    fn corrupt_store_is_rejected() {
        let path = temp_store("corrupt");
        fs::write(&path, b"not json at all").unwrap();
        assert!(ProfileStore::open(&path).is_err());
    }
}
