use std::path::Path;

use anyhow::Context;

/// Loads the env files for the active Rocket profile, later files overriding
/// earlier ones. Returns the files that were found.
///
/// Runs before tracing is initialized, so callers log the result.
pub fn load_environment() -> anyhow::Result<Vec<String>> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    let mut loaded = Vec::new();
    for env_file in env_files {
        if load_env_file(env_file)? {
            loaded.push(env_file.to_string());
        }
    }

    Ok(loaded)
}

fn load_env_file(path: &str) -> anyhow::Result<bool> {
    if !Path::new(path).exists() {
        return Ok(false);
    }

    dotenvy::from_filename_override(path)
        .with_context(|| format!("Failed to load environment file {}", path))?;
    Ok(true)
}
