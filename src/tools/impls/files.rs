use crate::tools::error::ToolError;
use crate::tools::result::{DirectoryEntry, ToolOutput};
use crate::utils::{count_lines, is_text_content, BackupManager};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

async fn metadata(path: &Path) -> Result<std::fs::Metadata, ToolError> {
    tokio::fs::metadata(path)
        .await
        .map_err(|e| ToolError::io(path, e))
}

pub async fn read_file(path: &Path) -> Result<ToolOutput, ToolError> {
    if !metadata(path).await?.is_file() {
        return Err(ToolError::NotAFile(path.to_path_buf()));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ToolError::io(path, e))?;
    if !is_text_content(&bytes) {
        return Err(ToolError::MalformedInput(format!(
            "{} is a binary file",
            path.display()
        )));
    }

    let size = bytes.len() as u64;
    let content = String::from_utf8(bytes).map_err(|_| {
        ToolError::MalformedInput(format!("{} is not valid UTF-8", path.display()))
    })?;
    let lines = count_lines(&content);

    debug!("Read {} bytes from {}", size, path.display());
    Ok(ToolOutput::ReadFile {
        path: path.to_path_buf(),
        content,
        size,
        lines,
    })
}

pub async fn write_file(path: &Path, content: &str) -> Result<ToolOutput, ToolError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ToolError::io(parent, e))?;
    }

    tokio::fs::write(path, content)
        .await
        .map_err(|e| ToolError::io(path, e))?;

    info!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(ToolOutput::WriteFile {
        path: path.to_path_buf(),
        size: content.len() as u64,
    })
}

/// Back up, verify, then delete. Nothing is removed unless the backup
/// succeeded.
pub async fn delete_file(path: &Path, backups: &BackupManager) -> Result<ToolOutput, ToolError> {
    if !metadata(path).await?.is_file() {
        return Err(ToolError::NotAFile(path.to_path_buf()));
    }

    let backup = backups.create_backup(path).await?;

    tokio::fs::remove_file(path)
        .await
        .map_err(|e| ToolError::io(path, e))?;

    info!(
        "Deleted {} (backup at {})",
        path.display(),
        backup.display()
    );
    Ok(ToolOutput::DeleteFile {
        path: path.to_path_buf(),
        backup,
    })
}

pub async fn list_directory(path: &Path) -> Result<ToolOutput, ToolError> {
    if !metadata(path).await?.is_dir() {
        return Err(ToolError::NotADirectory(path.to_path_buf()));
    }

    let root = path.to_path_buf();
    let entries = tokio::task::spawn_blocking(move || collect_entries(&root))
        .await
        .map_err(|e| ToolError::Io {
            context: format!("Listing {} was interrupted", path.display()),
            source: std::io::Error::other(e),
        })??;

    Ok(ToolOutput::ListDirectory {
        path: path.to_path_buf(),
        count: entries.len(),
        entries,
    })
}

fn collect_entries(root: &Path) -> Result<Vec<DirectoryEntry>, ToolError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let failed: PathBuf = e.path().unwrap_or(root).to_path_buf();
            ToolError::io(&failed, e.into())
        })?;
        let file_type = entry.file_type();
        let size = if file_type.is_file() {
            entry.metadata().ok().map(|m| m.len())
        } else {
            None
        };

        entries.push(DirectoryEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path().to_path_buf(),
            is_file: file_type.is_file(),
            is_dir: file_type.is_dir(),
            size,
        });
    }
    Ok(entries)
}

pub async fn check_file_exists(path: &Path) -> Result<ToolOutput, ToolError> {
    let (exists, is_file, is_dir) = match tokio::fs::metadata(path).await {
        Ok(meta) => (true, meta.is_file(), meta.is_dir()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => (false, false, false),
        Err(e) => return Err(ToolError::io(path, e)),
    };

    Ok(ToolOutput::CheckFileExists {
        path: path.to_path_buf(),
        exists,
        is_file,
        is_dir,
    })
}
