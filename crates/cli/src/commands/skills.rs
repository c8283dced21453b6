//! `warmloop skills`: inspect the knowledge packages the agent can load.

use warmloop_config::AppConfig;

/// Characters of body shown by `skills show`.
const PREVIEW_CHARS: usize = 2_000;

pub async fn list() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let workdir = config.workdir();
    let registry = super::load_skills(&config, &workdir);

    if registry.is_empty() {
        println!("No skills found. Searched:");
        for dir in config.skill_dirs(&workdir) {
            println!("  {}", dir.display());
        }
        return Ok(());
    }

    println!("{} skill(s):\n", registry.len());
    for meta in registry.list_metadata() {
        println!("  {:<20} {}", meta.name, meta.description);
    }
    Ok(())
}

pub async fn show(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let workdir = config.workdir();
    let registry = super::load_skills(&config, &workdir);

    let body = registry.load(name)?;
    let total = body.chars().count();
    if total > PREVIEW_CHARS {
        let preview: String = body.chars().take(PREVIEW_CHARS).collect();
        println!("{preview}\n\n... ({} more characters)", total - PREVIEW_CHARS);
    } else {
        println!("{body}");
    }
    Ok(())
}
