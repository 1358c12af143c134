//! Remote path helpers
//!
//! Dropbox paths are always `/`-separated and absolute, independent of the
//! local platform. These helpers turn a local file path into the remote path
//! it should be uploaded to.

use crate::error::{Error, Result};
use std::path::{Component, Path};

/// The remote root folder
pub const ROOT: &str = "/";

/// Join a remote root and a relative remote path into one absolute path
pub fn join_remote(root: &str, path: &str) -> String {
    let segments: Vec<&str> = root
        .split('/')
        .chain(path.split('/'))
        .filter(|s| !s.is_empty())
        .collect();

    format!("/{}", segments.join("/"))
}

/// Compute the remote path for a local file.
///
/// `local_root` is stripped from the front of `local`, and what is left is
/// placed under `remote_root`. Without a local root the whole local path is
/// kept, so `data/a.csv` lands at `<remote_root>/data/a.csv`.
pub fn remote_path_for(local: &Path, local_root: Option<&Path>, remote_root: &str) -> Result<String> {
    let relative = match local_root {
        Some(root) => local.strip_prefix(root).map_err(|_| {
            Error::InvalidInput(format!(
                "{} is not inside local root {}",
                local.display(),
                root.display()
            ))
        })?,
        None => local,
    };

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    Error::InvalidInput(format!("Path is not valid UTF-8: {}", local.display()))
                })?;
                segments.push(part);
            }
            Component::ParentDir => {
                return Err(Error::InvalidInput(format!(
                    "Parent directory references are not allowed: {}",
                    local.display()
                )));
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if segments.is_empty() {
        return Err(Error::InvalidInput(format!(
            "No file name left after removing the local root from {}",
            local.display()
        )));
    }

    Ok(join_remote(remote_root, &segments.join("/")))
}
