//! Profile stores: in-memory and one-JSON-file-per-profile directories.

use nichepipe_core::{Error, Profile, ProfileBatch, ProfileStore, Result, SkippedProfile};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Holds profiles for the lifetime of the process. Saving a name that already exists
/// replaces it in place.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<Vec<Profile>>,
}

impl MemoryProfileStore {
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: RwLock::new(profiles),
        }
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load_all(&self) -> Result<ProfileBatch> {
        let guard = self
            .profiles
            .read()
            .map_err(|e| Error::ProfileStore(e.to_string()))?;
        Ok(ProfileBatch {
            profiles: guard.clone(),
            skipped: Vec::new(),
        })
    }

    fn save(&self, profile: &Profile) -> Result<()> {
        let mut guard = self
            .profiles
            .write()
            .map_err(|e| Error::ProfileStore(e.to_string()))?;
        match guard.iter_mut().find(|p| p.name == profile.name) {
            Some(slot) => *slot = profile.clone(),
            None => guard.push(profile.clone()),
        }
        Ok(())
    }
}

/// `<root>/<name>.json`, one profile per file.
///
/// A missing root is an empty store. Files that fail to parse are reported in
/// [`ProfileBatch::skipped`] and never abort the load.
#[derive(Debug, Clone)]
pub struct DirProfileStore {
    root: PathBuf,
}

impl DirProfileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name for a profile: Unicode alphanumerics, `-` and `_` are kept, anything else
    /// (separators, dots, spaces) becomes `_`.
    pub fn file_name(name: &str) -> String {
        let stem: String = name
            .trim()
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let stem = if stem.is_empty() { "_".to_string() } else { stem };
        format!("{stem}.json")
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(Self::file_name(name))
    }

    fn load_file(path: &Path) -> std::result::Result<Profile, String> {
        let raw = fs::read(path).map_err(|e| e.to_string())?;
        let p: Profile = serde_json::from_slice(&raw).map_err(|e| e.to_string())?;
        if p.name.trim().is_empty() {
            return Err("profile has an empty name".to_string());
        }
        Ok(p)
    }
}

impl ProfileStore for DirProfileStore {
    fn load_all(&self) -> Result<ProfileBatch> {
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(root = %self.root.display(), "profile dir missing; empty store");
                return Ok(ProfileBatch::default());
            }
            Err(e) => return Err(Error::ProfileStore(format!("{}: {e}", self.root.display()))),
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|x| x == "json"))
            .collect();
        paths.sort();

        let mut batch = ProfileBatch::default();
        for path in paths {
            match Self::load_file(&path) {
                Ok(p) => batch.profiles.push(p),
                Err(reason) => {
                    tracing::warn!(path = %path.display(), %reason, "skipping unreadable profile");
                    batch.skipped.push(SkippedProfile {
                        origin: path.display().to_string(),
                        reason,
                    });
                }
            }
        }
        tracing::debug!(
            root = %self.root.display(),
            loaded = batch.profiles.len(),
            skipped = batch.skipped.len(),
            "loaded profiles"
        );
        Ok(batch)
    }

    fn save(&self, profile: &Profile) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| Error::ProfileStore(e.to_string()))?;
        let path = self.path_for(&profile.name);
        // Distinct names can still share a file name ("a b" and "a_b").
        if path.exists() {
            match Self::load_file(&path) {
                Ok(existing) if existing.name != profile.name => {
                    return Err(Error::ProfileStore(format!(
                        "{} already holds profile {:?}; refusing to overwrite it with {:?}",
                        path.display(),
                        existing.name,
                        profile.name
                    )));
                }
                Ok(_) => {}
                Err(reason) => {
                    tracing::warn!(path = %path.display(), %reason, "overwriting unreadable profile file");
                }
            }
        }
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(profile)?;
        fs::write(&tmp, body).map_err(|e| Error::ProfileStore(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| Error::ProfileStore(e.to_string()))?;
        Ok(())
    }
}
