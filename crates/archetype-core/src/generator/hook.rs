//! Post-generation hooks
//!
//! An archetype may bundle a script that runs once the project exists. The
//! engine hands the hook a read-only snapshot of what was generated; how the
//! script is executed is up to the hook implementation.

use super::request::GenerationRequest;
use crate::error::{ArchetypeError, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Everything a post-generation script may inspect
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub project_dir: &'a Path,
    pub properties: &'a BTreeMap<String, String>,
    pub request: &'a GenerationRequest,
}

/// Runs the script bundled with an archetype
pub trait PostGenerationHook {
    fn run(&self, script: &[u8], context: &HookContext<'_>) -> Result<()>;
}

/// Prefix for variables exported to scripts
pub const ENV_PREFIX: &str = "ARCHETYPE_";

/// `groupId` -> `ARCHETYPE_GROUP_ID`, `project.build.sourceEncoding` ->
/// `ARCHETYPE_PROJECT_BUILD_SOURCE_ENCODING`
pub fn env_name(key: &str) -> String {
    let mut name = String::from(ENV_PREFIX);
    let mut previous_lower = false;
    for c in key.chars() {
        if c.is_ascii_uppercase() && previous_lower {
            name.push('_');
        }
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_uppercase());
        } else {
            name.push('_');
        }
        previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
    }
    name
}

/// Environment exported to the script, on top of the inherited one
pub fn script_env(context: &HookContext<'_>) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = context
        .properties
        .iter()
        .map(|(k, v)| (env_name(k), v.clone()))
        .collect();
    let request = context.request;
    env.insert(
        format!("{}ARCHETYPE", ENV_PREFIX),
        request.archetype.to_string(),
    );
    env.insert(
        format!("{}OUTPUT_DIRECTORY", ENV_PREFIX),
        request.output_directory.display().to_string(),
    );
    env.insert(
        format!("{}PROJECT_DIRECTORY", ENV_PREFIX),
        context.project_dir.display().to_string(),
    );
    env.insert(
        format!("{}INTERACTIVE", ENV_PREFIX),
        request.interactive.to_string(),
    );
    env
}

/// Feeds the script to a POSIX shell on stdin, in the project directory
#[derive(Debug, Clone)]
pub struct ScriptHook {
    shell: String,
}

impl Default for ScriptHook {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl ScriptHook {
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl PostGenerationHook for ScriptHook {
    fn run(&self, script: &[u8], context: &HookContext<'_>) -> Result<()> {
        tracing::info!(shell = %self.shell, dir = %context.project_dir.display(), "running post-generation script");

        let mut child = Command::new(&self.shell)
            .arg("-s")
            .current_dir(context.project_dir)
            .envs(script_env(context))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ArchetypeError::wrap(format!("Failed to start '{}'", self.shell), e)
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(script)
                .map_err(|e| ArchetypeError::wrap("Failed to pass post-generation script", e))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| ArchetypeError::wrap("Post-generation script did not finish", e))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::info!(target: "archetype::script", "{}", line);
        }
        if !output.status.success() {
            return Err(ArchetypeError::failure(format!(
                "Post-generation script failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Ignores bundled scripts
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHook;

impl PostGenerationHook for NoHook {
    fn run(&self, _script: &[u8], context: &HookContext<'_>) -> Result<()> {
        tracing::warn!(dir = %context.project_dir.display(), "post-generation script skipped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(dir: &Path) -> GenerationRequest {
        GenerationRequest::new("org.acme:quickstart:1.0".parse().unwrap(), dir)
    }

    #[test]
    fn test_env_name() {
        assert_eq!(env_name("groupId"), "ARCHETYPE_GROUP_ID");
        assert_eq!(env_name("package"), "ARCHETYPE_PACKAGE");
        assert_eq!(
            env_name("project.build.sourceEncoding"),
            "ARCHETYPE_PROJECT_BUILD_SOURCE_ENCODING"
        );
        assert_eq!(env_name("db2Url"), "ARCHETYPE_DB2_URL");
    }

    #[test]
    fn test_script_env_includes_request() {
        let dir = TempDir::new().unwrap();
        let req = request(dir.path());
        let properties = BTreeMap::from([("artifactId".to_string(), "proj".to_string())]);
        let env = script_env(&HookContext {
            project_dir: dir.path(),
            properties: &properties,
            request: &req,
        });
        assert_eq!(env["ARCHETYPE_ARTIFACT_ID"], "proj");
        assert_eq!(env["ARCHETYPE_ARCHETYPE"], "org.acme:quickstart:1.0");
    }

    #[cfg(unix)]
    #[test]
    fn test_script_runs_in_project_dir() {
        let dir = TempDir::new().unwrap();
        let req = request(dir.path());
        let properties = BTreeMap::from([("artifactId".to_string(), "proj".to_string())]);
        let context = HookContext {
            project_dir: dir.path(),
            properties: &properties,
            request: &req,
        };

        ScriptHook::default()
            .run(b"echo \"$ARCHETYPE_ARTIFACT_ID\" > marker.txt\n", &context)
            .unwrap();

        let marker = std::fs::read_to_string(dir.path().join("marker.txt")).unwrap();
        assert_eq!(marker.trim(), "proj");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_script_is_generation_failure() {
        let dir = TempDir::new().unwrap();
        let req = request(dir.path());
        let properties = BTreeMap::new();
        let context = HookContext {
            project_dir: dir.path(),
            properties: &properties,
            request: &req,
        };

        let err = ScriptHook::default()
            .run(b"echo broken >&2\nexit 3\n", &context)
            .unwrap_err();
        assert!(matches!(err, ArchetypeError::GenerationFailure { .. }));
        assert!(err.to_string().contains("broken"));
    }
}
