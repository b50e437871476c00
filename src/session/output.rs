use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::core::OutputFormat;

/// Highest numeric suffix tried before giving up on a name.
const MAX_NAME_SUFFIX: u32 = 1000;

/// Write `bytes` to a fresh `<stem>_framed[_N].<ext>` file in `dir`.
///
/// Names are claimed with create-new semantics, so concurrent writers and earlier outputs are
/// never overwritten. A partially written file is removed on failure.
pub(crate) fn write_output(
    dir: &Path,
    source: &Path,
    format: OutputFormat,
    bytes: &[u8],
) -> anyhow::Result<PathBuf> {
    let (path, mut file) = claim_output_path(dir, source, format)?;
    let mut guard = PartialFileGuard(Some(path.clone()));
    file.write_all(bytes)
        .and_then(|()| file.flush())
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    guard.disarm();
    Ok(path)
}

fn claim_output_path(
    dir: &Path,
    source: &Path,
    format: OutputFormat,
) -> anyhow::Result<(PathBuf, File)> {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_owned());
    let ext = format.extension();

    for n in 0..=MAX_NAME_SUFFIX {
        let name = if n == 0 {
            format!("{stem}_framed.{ext}")
        } else {
            format!("{stem}_framed_{n}.{ext}")
        };
        let candidate = dir.join(name);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to create '{}'", candidate.display()));
            }
        }
    }
    anyhow::bail!(
        "no free output name for '{stem}' after {MAX_NAME_SUFFIX} attempts in '{}'",
        dir.display()
    )
}

struct PartialFileGuard(Option<PathBuf>);

impl PartialFileGuard {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for PartialFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/output.rs"]
mod tests;
