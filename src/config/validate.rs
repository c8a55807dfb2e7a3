// src/config/validate.rs

use std::collections::HashSet;

use anyhow::{anyhow, Context, Result};

use crate::config::model::BuildFile;
use crate::watch::patterns::FileFilter;

/// Run basic semantic validation against a loaded settings file.
///
/// This checks:
/// - there is at least one step
/// - step names are non-empty and unique
/// - every step has a command and at least one watched path
/// - every file filter is a valid glob
/// - `poll_interval` parses and is non-zero
pub fn validate_build_file(file: &BuildFile) -> Result<()> {
    ensure_has_steps(file)?;
    validate_global_config(file)?;
    validate_steps(file)?;
    Ok(())
}

fn ensure_has_steps(file: &BuildFile) -> Result<()> {
    if file.steps.is_empty() {
        return Err(anyhow!(
            "settings must contain at least one [[step]] section"
        ));
    }
    Ok(())
}

fn validate_global_config(file: &BuildFile) -> Result<()> {
    let interval = file
        .poll_interval()
        .map_err(|e| anyhow!(e))
        .context("invalid [config].poll_interval")?;

    if interval.is_zero() {
        return Err(anyhow!("[config].poll_interval must be greater than zero"));
    }

    if let Some(filter) = &file.default.filter {
        FileFilter::new(filter).context("invalid [default].filter")?;
    }

    Ok(())
}

fn validate_steps(file: &BuildFile) -> Result<()> {
    let mut seen = HashSet::new();

    for (index, step) in file.steps.iter().enumerate() {
        if step.name.trim().is_empty() {
            return Err(anyhow!("step #{} has an empty name", index));
        }
        if !seen.insert(step.name.as_str()) {
            return Err(anyhow!("duplicate step name '{}'", step.name));
        }
        if step.cmd.trim().is_empty() {
            return Err(anyhow!("step '{}' has an empty `cmd`", step.name));
        }
        if step.paths.is_empty() {
            return Err(anyhow!(
                "step '{}' must watch at least one path in `paths`",
                step.name
            ));
        }
        if let Some(filter) = &step.filter {
            FileFilter::new(filter)
                .with_context(|| format!("invalid `filter` for step '{}'", step.name))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{ConfigSection, DefaultSection, StepConfig};

    fn step(name: &str) -> StepConfig {
        StepConfig {
            name: name.to_string(),
            cmd: "true".to_string(),
            paths: vec!["src".to_string()],
            filter: None,
        }
    }

    fn file(steps: Vec<StepConfig>) -> BuildFile {
        BuildFile {
            config: ConfigSection::default(),
            default: DefaultSection::default(),
            steps,
        }
    }

    #[test]
    fn accepts_minimal_file() {
        assert!(validate_build_file(&file(vec![step("a"), step("b")])).is_ok());
    }

    #[test]
    fn rejects_empty_step_list() {
        let err = validate_build_file(&file(vec![])).unwrap_err();
        assert!(err.to_string().contains("at least one [[step]]"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = validate_build_file(&file(vec![step("a"), step("a")])).unwrap_err();
        assert!(err.to_string().contains("duplicate step name 'a'"));
    }

    #[test]
    fn rejects_step_without_paths() {
        let mut s = step("a");
        s.paths.clear();
        let err = validate_build_file(&file(vec![s])).unwrap_err();
        assert!(err.to_string().contains("at least one path"));
    }

    #[test]
    fn rejects_bad_glob_and_zero_interval() {
        let mut s = step("a");
        s.filter = Some(vec!["src/[".to_string()]);
        assert!(validate_build_file(&file(vec![s])).is_err());

        let mut f = file(vec![step("a")]);
        f.config.poll_interval = "0ms".to_string();
        let err = validate_build_file(&f).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }
}
