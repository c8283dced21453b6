//! A single knowledge package and its `SKILL.md` parsing.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use warmloop_core::error::SkillError;

/// File name that marks a directory as a knowledge package.
pub const SKILL_FILE: &str = "SKILL.md";

/// Resource folders listed (never read) when a package is loaded.
const RESOURCE_FOLDERS: [(&str, &str); 3] = [
    ("scripts", "Scripts"),
    ("references", "References"),
    ("assets", "Assets"),
];

static FRONTMATTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^---[ \t]*\n(.*?)\n---[ \t]*(?:\n(.*))?$").unwrap());

/// Where a package body comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum BodySource {
    /// Body held in memory.
    Inline(String),
    /// Body re-read from a `SKILL.md` file on every load.
    File(PathBuf),
}

/// Name and description, the always-resident part of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillMetadata {
    pub name: String,
    pub description: String,
}

/// A named unit of domain expertise.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgePackage {
    pub name: String,
    pub description: String,
    pub body: BodySource,
    /// Directory holding optional `scripts/`, `references/`, `assets/`.
    pub resource_dir: Option<PathBuf>,
}

impl KnowledgePackage {
    /// A package whose body lives in memory.
    pub fn inline(
        name: impl Into<String>,
        description: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            body: BodySource::Inline(body.into()),
            resource_dir: None,
        }
    }

    /// Read only the metadata of the package in `dir`.
    ///
    /// The body is not kept; [`read_body`](Self::read_body) reads it again
    /// from disk when the package is actually loaded.
    pub fn from_dir(dir: &Path) -> Result<Self, SkillError> {
        let path = dir.join(SKILL_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| SkillError::InvalidPackage {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let parsed = parse_skill_md(&content).map_err(|reason| SkillError::InvalidPackage {
            path: path.display().to_string(),
            reason,
        })?;

        Ok(Self {
            name: parsed.name,
            description: parsed.description,
            body: BodySource::File(path),
            resource_dir: Some(dir.to_path_buf()),
        })
    }

    pub fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    /// The full body text.
    pub fn read_body(&self) -> Result<String, SkillError> {
        match &self.body {
            BodySource::Inline(body) => Ok(body.clone()),
            BodySource::File(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| SkillError::Io {
                    name: self.name.clone(),
                    reason: e.to_string(),
                })?;
                parse_skill_md(&content)
                    .map(|parsed| parsed.body)
                    .map_err(|reason| SkillError::Io {
                        name: self.name.clone(),
                        reason,
                    })
            }
        }
    }

    /// A short listing of auxiliary resources, names only.
    pub fn resource_hint(&self) -> Option<String> {
        let dir = self.resource_dir.as_ref()?;
        let mut lines = Vec::new();

        for (folder, label) in RESOURCE_FOLDERS {
            let Ok(entries) = std::fs::read_dir(dir.join(folder)) else {
                continue;
            };
            let mut names: Vec<String> = entries
                .flatten()
                .filter_map(|e| e.file_name().to_str().map(str::to_string))
                .collect();
            if names.is_empty() {
                continue;
            }
            names.sort();
            lines.push(format!("- {label}: {}", names.join(", ")));
        }

        if lines.is_empty() {
            None
        } else {
            Some(format!(
                "**Available resources in {}:**\n{}",
                dir.display(),
                lines.join("\n")
            ))
        }
    }
}

struct ParsedSkill {
    name: String,
    description: String,
    body: String,
}

fn parse_skill_md(content: &str) -> Result<ParsedSkill, String> {
    let content = content.replace("\r\n", "\n");
    let caps = FRONTMATTER_RE
        .captures(&content)
        .ok_or_else(|| "missing '---' frontmatter".to_string())?;

    let mut name = None;
    let mut description = None;
    for line in caps.get(1).map(|m| m.as_str()).unwrap_or("").lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
        match key.trim() {
            "name" => name = Some(value),
            "description" => description = Some(value),
            _ => {}
        }
    }

    let name = name.filter(|n| !n.is_empty()).ok_or("frontmatter has no 'name'")?;
    let description = description
        .filter(|d| !d.is_empty())
        .ok_or("frontmatter has no 'description'")?;
    let body = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("").to_string();

    Ok(ParsedSkill {
        name,
        description,
        body,
    })
}
