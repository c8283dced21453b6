//! # warmloop Skills
//!
//! Knowledge packages with progressive disclosure: a name and a short
//! description are always resident, the body is read only when the model
//! asks for it through the `Skill` tool.
//!
//! Packages come from directories laid out as
//!
//! ```text
//! skills/
//!   pdf/
//!     SKILL.md        # frontmatter (name, description) + markdown body
//!     scripts/        # optional, listed on load, never read
//!     references/
//!     assets/
//! ```
//!
//! or are registered inline with [`KnowledgePackage::inline`].

pub mod package;
pub mod registry;

pub use package::{BodySource, KnowledgePackage, SKILL_FILE, SkillMetadata};
pub use registry::{DEFAULT_MAX_DESCRIPTION_CHARS, SkillRegistry};
