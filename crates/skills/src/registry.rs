//! The knowledge registry.
//!
//! Metadata for every package is always available; bodies are produced
//! only by an explicit [`SkillRegistry::load`]. The registry is built once
//! and then shared read-only (behind an `Arc`) by every loop, including
//! nested subagents.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use warmloop_core::error::SkillError;

use crate::package::{KnowledgePackage, SKILL_FILE, SkillMetadata};

/// Default upper bound on a package description.
pub const DEFAULT_MAX_DESCRIPTION_CHARS: usize = 1024;

#[derive(Debug, Clone)]
pub struct SkillRegistry {
    packages: BTreeMap<String, KnowledgePackage>,
    max_description_chars: usize,
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DESCRIPTION_CHARS)
    }
}

impl SkillRegistry {
    pub fn new(max_description_chars: usize) -> Self {
        Self {
            packages: BTreeMap::new(),
            max_description_chars,
        }
    }

    /// Build a registry from skill directories.
    ///
    /// Each immediate subdirectory holding a `SKILL.md` is one package.
    /// Earlier directories win when two define the same name. Broken
    /// packages are skipped with a warning; missing directories are ignored.
    pub fn from_dirs(dirs: &[PathBuf], max_description_chars: usize) -> Self {
        let mut registry = Self::new(max_description_chars);
        for dir in dirs {
            registry.scan_dir(dir);
        }
        info!(skills = registry.len(), "Knowledge registry ready");
        registry
    }

    fn scan_dir(&mut self, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(_) => {
                debug!(dir = %dir.display(), "Skill directory not found, skipping");
                return;
            }
        };

        let mut candidates: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir() && p.join(SKILL_FILE).is_file())
            .collect();
        candidates.sort();

        for path in candidates {
            let package = match KnowledgePackage::from_dir(&path) {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "Skipping skill package");
                    continue;
                }
            };
            match self.register(package) {
                Ok(()) => {}
                Err(SkillError::DuplicateName(name)) => {
                    debug!(
                        skill = %name,
                        path = %path.display(),
                        "Skill shadowed by an earlier directory"
                    );
                }
                Err(e) => warn!(error = %e, path = %path.display(), "Skipping skill package"),
            }
        }
    }

    /// Add a package. Names are unique and descriptions are bounded.
    pub fn register(&mut self, package: KnowledgePackage) -> Result<(), SkillError> {
        let len = package.description.chars().count();
        if len > self.max_description_chars {
            return Err(SkillError::DescriptionTooLong {
                name: package.name,
                len,
                max: self.max_description_chars,
            });
        }
        if self.packages.contains_key(&package.name) {
            return Err(SkillError::DuplicateName(package.name));
        }
        self.packages.insert(package.name.clone(), package);
        Ok(())
    }

    /// Name/description pairs for every package, ordered by name.
    pub fn list_metadata(&self) -> Vec<SkillMetadata> {
        self.packages.values().map(KnowledgePackage::metadata).collect()
    }

    /// The body of `name`, followed by a resource listing when the package
    /// has auxiliary folders. Never touches any conversation.
    pub fn load(&self, name: &str) -> Result<String, SkillError> {
        let package = self.packages.get(name).ok_or_else(|| SkillError::NotFound {
            name: name.to_string(),
            available: self.available(),
        })?;

        let mut content = package.read_body()?;
        if let Some(hint) = package.resource_hint() {
            content.push_str("\n\n");
            content.push_str(&hint);
        }
        Ok(content)
    }

    /// One `- name: description` line per package.
    pub fn describe(&self) -> String {
        if self.packages.is_empty() {
            return "(no skills available)".into();
        }
        self.packages
            .values()
            .map(|p| format!("- {}: {}", p.name, p.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn names(&self) -> Vec<&str> {
        self.packages.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn available(&self) -> String {
        if self.packages.is_empty() {
            "none".into()
        } else {
            self.names().join(", ")
        }
    }
}
