use cb_domain::config::{CombinerConfig, ConfigSeverity, CONFIG_ENV};

fn config_path() -> String {
    std::env::var(CONFIG_ENV).unwrap_or_else(|_| "combiner.toml".into())
}

/// Validate the config, printing any issues.  Returns `false` when at
/// least one error-severity issue was found.
pub fn validate(config: &CombinerConfig) -> bool {
    let path = config_path();
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!("\n{error_count} error(s), {warning_count} warning(s) in {path}");

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &CombinerConfig) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)?;
    print!("{output}");
    Ok(())
}
