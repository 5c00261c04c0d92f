// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Downloading a release binary and swapping it in for the installed one

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{ClientError, Result};

/// Platform binary published for `project`, e.g. `demo-linux-amd64`.
#[must_use]
pub fn binary_name(project: &str) -> String {
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    };
    let suffix = if cfg!(windows) { ".exe" } else { "" };
    format!("{project}-{os}-{arch}{suffix}")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Where the previous binary is kept after an update.
#[must_use]
pub fn backup_path(target: &Path) -> PathBuf {
    with_suffix(target, ".backup")
}

/// Download location next to `target`, so the final rename stays on one
/// filesystem.
#[must_use]
pub fn staging_path(target: &Path) -> PathBuf {
    with_suffix(target, ".update")
}

/// Stream `url` into `path` and return the SHA-256 of what was written.
pub async fn download_to_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
) -> Result<String> {
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ClientError::Request(format!("GET {url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }

    let mut file = File::create(path)?;
    let mut hasher = Sha256::new();
    let mut written = 0_u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ClientError::Request(format!("Failed to download {url}: {e}")))?
    {
        hasher.update(&chunk);
        file.write_all(&chunk)?;
        written += chunk.len() as u64;
    }
    file.sync_all()?;

    if written == 0 {
        return Err(ClientError::EmptyDownload(url.to_owned()));
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Move `target` to its backup path and `staged` into its place.
///
/// If the second rename fails the backup is moved back. Returns the backup
/// path on success.
pub fn replace_binary(staged: &Path, target: &Path) -> Result<PathBuf> {
    let backup = backup_path(target);
    match fs::remove_file(&backup) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    fs::rename(target, &backup)?;
    if let Err(e) = fs::rename(staged, target) {
        if let Err(restore) = fs::rename(&backup, target) {
            warn!(
                target = %target.display(),
                backup = %backup.display(),
                error = %restore,
                "Failed to restore previous binary"
            );
        }
        return Err(e.into());
    }

    info!(
        target = %target.display(),
        backup = %backup.display(),
        "Binary replaced"
    );
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tempfile::TempDir;

    // sha256("test data")
    const TEST_DATA_HASH: &str = "916f0027a575074ce72a331777c3478d6513f786a591bd892da1a577bf2335f9";

    #[test]
    fn test_binary_name_has_project_os_and_arch() {
        let name = binary_name("demo");
        let parts: Vec<&str> = name.trim_end_matches(".exe").split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "demo");
        assert!(!parts[1].is_empty());
        assert!(!parts[2].is_empty());
        if cfg!(all(target_os = "linux", target_arch = "x86_64")) {
            assert_eq!(name, "demo-linux-amd64");
        }
    }

    #[test]
    fn test_sibling_paths() {
        let target = Path::new("/opt/demo/demo");
        assert_eq!(backup_path(target), PathBuf::from("/opt/demo/demo.backup"));
        assert_eq!(staging_path(target), PathBuf::from("/opt/demo/demo.update"));
    }

    #[tokio::test]
    async fn test_download_hashes_what_it_writes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/bin")
            .with_status(200)
            .with_body("test data")
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin");

        let url = format!("{}/bin", server.url());
        let hash = download_to_file(&reqwest::Client::new(), &url, &path)
            .await
            .unwrap();

        assert_eq!(hash, TEST_DATA_HASH);
        assert_eq!(fs::read(&path).unwrap(), b"test data");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_rejects_empty_and_missing() {
        let mut server = Server::new_async().await;
        let _empty = server
            .mock("GET", "/empty")
            .with_status(200)
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin");
        let client = reqwest::Client::new();

        assert!(matches!(
            download_to_file(&client, &format!("{}/empty", server.url()), &path).await,
            Err(ClientError::EmptyDownload(_))
        ));
        assert!(matches!(
            download_to_file(&client, &format!("{}/missing", server.url()), &path).await,
            Err(ClientError::Status { status: 404, .. })
        ));
    }

    #[test]
    fn test_replace_binary_keeps_backup() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("demo");
        let staged = staging_path(&target);
        fs::write(&target, b"old").unwrap();
        fs::write(backup_path(&target), b"older").unwrap();
        fs::write(&staged, b"new").unwrap();

        let backup = replace_binary(&staged, &target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert_eq!(fs::read(&backup).unwrap(), b"old");
        assert!(!staged.exists());
    }

    #[test]
    fn test_replace_binary_restores_on_failure() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("demo");
        fs::write(&target, b"old").unwrap();

        let result = replace_binary(&staging_path(&target), &target);

        assert!(matches!(result, Err(ClientError::Io(_))));
        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert!(!backup_path(&target).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin");
        fs::write(&path, b"x").unwrap();

        make_executable(&path).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o755);
    }
}
