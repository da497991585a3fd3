use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::CoreError;
use crate::parser::parse_document;
use crate::skill::{SkillDescriptor, skills_in_document};
use crate::wiring::{Connection, wiring_in_document};

/// Extension of skill library files.
pub const SKILL_EXTENSION: &str = "skill";

#[derive(Debug, Clone, PartialEq)]
pub struct SkillFile {
    /// Path relative to the library root.
    pub path: PathBuf,
    pub skills: Vec<SkillDescriptor>,
    pub connections: Vec<Connection>,
}

/// A library file that could not be read or parsed.
#[derive(Debug)]
pub struct LibraryIssue {
    pub path: PathBuf,
    pub error: CoreError,
}

#[derive(Debug, Default)]
pub struct SkillLibrary {
    pub files: Vec<SkillFile>,
    pub issues: Vec<LibraryIssue>,
}

impl SkillLibrary {
    pub fn skills(&self) -> impl Iterator<Item = &SkillDescriptor> {
        self.files.iter().flat_map(|file| file.skills.iter())
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.files.iter().flat_map(|file| file.connections.iter())
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn default_library_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../skills")
}

/// Loads every `*.skill` file under `root`, in file-name order.
pub fn load_skill_library(root: impl AsRef<Path>) -> Result<SkillLibrary, CoreError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(CoreError::MissingLibrary(root.to_path_buf()));
    }

    let mut library = SkillLibrary::default();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || !path.extension().is_some_and(|ext| ext == SKILL_EXTENSION) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        match load_skill_file(path) {
            Ok((skills, connections)) => {
                debug!(path = %relative.display(), skills = skills.len(), "loaded skill file");
                library.files.push(SkillFile {
                    path: relative,
                    skills,
                    connections,
                });
            }
            Err(error) => {
                warn!(path = %relative.display(), %error, "skipping skill file");
                library.issues.push(LibraryIssue {
                    path: relative,
                    error,
                });
            }
        }
    }
    Ok(library)
}

fn load_skill_file(path: &Path) -> Result<(Vec<SkillDescriptor>, Vec<Connection>), CoreError> {
    let contents = fs::read_to_string(path)?;
    let forms = parse_document(&contents)?;
    let connections = wiring_in_document(&forms)?.connections().to_vec();
    Ok((skills_in_document(&forms), connections))
}
