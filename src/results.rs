use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use time::OffsetDateTime;
use time::macros::format_description;
use uuid::Uuid;

use crate::prompt::confirm;

/// Ensures the output directory exists. A regular file squatting on the name
/// is resolved interactively: delete it, rename it aside, or abort the run.
pub fn prepare_output_dir(dir: &Path, input: &mut impl BufRead) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        let delete = confirm(
            input,
            &format!("A file named {} is in the way; delete it?", dir.display()),
            false,
        )?;
        if delete {
            fs::remove_file(dir).with_context(|| format!("deleting {}", dir.display()))?;
        } else {
            let target = unique_rename_target(dir);
            let rename = confirm(
                input,
                &format!("Rename it to {} instead?", target.display()),
                false,
            )?;
            if !rename {
                bail!(
                    "output directory {} is blocked by an existing file",
                    dir.display()
                );
            }
            fs::rename(dir, &target)
                .with_context(|| format!("renaming {} to {}", dir.display(), target.display()))?;
        }
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(())
}

/// A fresh artifact path under `dir`: wall-clock time plus a v4 uuid, so no
/// artifact is ever overwritten.
pub fn artifact_path(dir: &Path, extension: &str) -> PathBuf {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let stamp = now
        .format(format_description!("[hour]-[minute]-[second]"))
        .unwrap_or_else(|_| "00-00-00".into());
    dir.join(format!("{stamp}_{}.{extension}", Uuid::new_v4()))
}

fn unique_rename_target(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}", Uuid::new_v4()));
    PathBuf::from(name)
}
