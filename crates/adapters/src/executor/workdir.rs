// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

/// Write `code` to `<root>/<prefix>-<uuid>/<file_name>` and return the
/// new directory.
///
/// Directories are left in place after use.
pub async fn materialize(
    root: &Path,
    prefix: &str,
    file_name: &str,
    code: &str,
) -> std::io::Result<PathBuf> {
    let dir = root.join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(dir.join(file_name), code).await?;
    tracing::debug!(dir = %dir.display(), "materialized working directory");
    Ok(dir)
}
