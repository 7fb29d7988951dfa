use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

pub const APPLICATION_DIR_NAME: &str = "dastime";

/// Overrides the default application directory for both binaries.
pub const APPLICATION_DIR_ENV: &str = "DASTIME_DIR";

fn platform_state_dir() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        env::var("APPDATA")
            .map(PathBuf::from)
            .map_err(|_| anyhow!("APPDATA should be present on Windows"))
    }
    #[cfg(not(windows))]
    {
        env::var("XDG_STATE_HOME")
            .map(PathBuf::from)
            .or_else(|_| env::var("HOME").map(|home| PathBuf::from(home).join(".local/state")))
            .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))
    }
}

/// `$DASTIME_DIR`, otherwise `dastime` inside the platform state directory.
pub fn default_application_path() -> Result<PathBuf> {
    match env::var_os(APPLICATION_DIR_ENV).filter(|v| !v.is_empty()) {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(platform_state_dir()?.join(APPLICATION_DIR_NAME)),
    }
}

/// Resolves an explicit `--dir` or falls back to [default_application_path]. The directory is
/// created when missing.
pub fn resolve_application_path(dir: Option<PathBuf>) -> Result<PathBuf> {
    let path = match dir {
        Some(dir) => dir,
        None => default_application_path()?,
    };
    ensure_dir(path)
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::resolve_application_path;

    #[test]
    fn test_explicit_dir_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested").join("dastime");

        let resolved = resolve_application_path(Some(nested.clone())).unwrap();
        assert_eq!(resolved, nested);
        assert!(nested.is_dir());

        // Existing directories are fine too
        assert_eq!(resolve_application_path(Some(nested.clone())).unwrap(), nested);
    }
}
