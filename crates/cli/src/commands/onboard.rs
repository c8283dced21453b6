//! `warmloop onboard`: first-time setup.

use warmloop_config::AppConfig;

const EXAMPLE_SKILL: &str = "---
name: example
description: Template showing the SKILL.md layout. Replace it with real domain knowledge.
---

# Example skill

Everything below the frontmatter is the body. It is only sent to the model
when the agent calls the Skill tool with `example`.

Put helper scripts in `scripts/`, longer documents in `references/` and
templates in `assets/`; their names are listed when the skill loads.
";

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let skills_dir = config_dir.join("skills");

    println!("warmloop: first-time setup");
    println!("==========================\n");

    // Create directories
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    let example_dir = skills_dir.join("example");
    if !example_dir.exists() {
        std::fs::create_dir_all(&example_dir)?;
        std::fs::write(example_dir.join("SKILL.md"), EXAMPLE_SKILL)?;
        println!("  Created example skill: {}", example_dir.display());
    }

    // Create config file
    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Created config.toml at: {}", config_path.display());
        println!("\n  Next steps:");
        println!("   1. export ANTHROPIC_API_KEY=... (or set api_key in the config)");
        println!("   2. Run: warmloop doctor");
        println!("   3. Run: warmloop agent\n");
    }

    println!("Setup complete.\n");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use warmloop_skills::KnowledgePackage;

    #[test]
    fn example_skill_parses() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = dir.path().join("example");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("SKILL.md"), EXAMPLE_SKILL).unwrap();

        let package = KnowledgePackage::from_dir(&skill_dir).unwrap();
        assert_eq!(package.name, "example");
        assert!(package.read_body().unwrap().contains("# Example skill"));
    }
}
