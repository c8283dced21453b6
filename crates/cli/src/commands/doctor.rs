//! `warmloop doctor`: diagnose configuration.

use warmloop_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("warmloop doctor");
    println!("===============\n");

    let mut issues = 0;

    // Check config
    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  [warn] No config file, using defaults (run `warmloop onboard`)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  [ok]   Configuration valid");
            config
        }
        Err(e) => {
            println!("  [fail] Configuration invalid: {e}");
            println!("\n  1 issue(s) found.");
            return Ok(());
        }
    };

    // Check API key
    if config.has_api_key() {
        println!("  [ok]   API key configured for '{}'", config.default_provider);
    } else {
        println!("  [fail] No API key: set ANTHROPIC_API_KEY or api_key in config.toml");
        issues += 1;
    }
    println!("  [ok]   Model: {}", warmloop_providers::resolve_model(&config));

    // Check workspace and skills
    let workdir = config.workdir();
    if workdir.is_dir() {
        println!("  [ok]   Workdir: {}", workdir.display());
    } else {
        println!("  [fail] Workdir does not exist: {}", workdir.display());
        issues += 1;
    }

    let dirs = config.skill_dirs(&workdir);
    let existing: Vec<_> = dirs.iter().filter(|d| d.is_dir()).collect();
    if existing.is_empty() {
        println!("  [warn] No skill directory found");
        issues += 1;
    } else {
        for dir in existing {
            println!("  [ok]   Skill directory: {}", dir.display());
        }
    }
    let skills = super::load_skills(&config, &workdir);
    println!("  [ok]   {} skill(s) loaded", skills.len());
    println!(
        "  [ok]   Subagents: {} (max depth {})",
        config
            .subagents
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        config.agent.max_depth
    );

    // Summary
    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
