use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

/// Resolves the directory used for logs and session files when `--dir` is not given.
pub fn create_application_default_path() -> Result<PathBuf> {
    let path = {
        #[cfg(windows)]
        {
            let mut path = env::var("APPDATA")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("APPDATA should be present on Windows"))?;
            path.push("studytimer");
            path
        }
        #[cfg(not(windows))]
        {
            let mut path = env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| {
                    env::var("HOME").map(|home| {
                        let mut path = PathBuf::from(home);
                        path.push(".local/state");
                        path
                    })
                })
                .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?;
            path.push("studytimer");
            path
        }
    };

    create_dir(path)
}

/// Creates `path` if needed. Failing here is one of the few fatal errors of the application.
pub fn create_dir(path: PathBuf) -> Result<PathBuf> {
    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(anyhow!("Can't create directory {path:?}: {v}")),
    }
}

/// Turns a free-form subject into something safe to use inside a file name.
pub fn sanitize_file_stem(subject: &str) -> String {
    let safe: String = subject
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if safe.is_empty() {
        "subject".into()
    } else {
        safe
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{create_dir, sanitize_file_stem};

    #[test]
    fn sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_file_stem("Organic Chem-2_b!"), "OrganicChem-2_b");
        assert_eq!(sanitize_file_stem(" ?/ "), "subject");
    }

    #[test]
    fn create_dir_is_idempotent() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let nested = dir.path().join("a").join("b");
        create_dir(nested.clone())?;
        create_dir(nested.clone())?;
        assert!(nested.is_dir());
        Ok(())
    }
}
