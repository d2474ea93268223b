use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Move a file that failed to load into `quarantine_dir`, creating the
/// directory if needed. The file keeps its name unless a file of that name
/// is already quarantined, in which case a timestamp (and counter, if still
/// taken) is inserted before the extension. Nothing is overwritten.
pub fn quarantine_file(file: &Path, quarantine_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(quarantine_dir)?;

    let file_name = file
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;

    let destination = free_destination(quarantine_dir, Path::new(file_name));
    move_file(file, &destination)?;
    Ok(destination)
}

fn free_destination(dir: &Path, file_name: &Path) -> PathBuf {
    let direct = dir.join(file_name);
    if !direct.exists() {
        return direct;
    }

    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");

    let stamped = dir.join(format!("{}.{}{}", stem, stamp, ext));
    if !stamped.exists() {
        return stamped;
    }

    (1u32..)
        .map(|n| dir.join(format!("{}.{}-{}{}", stem, stamp, n, ext)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(stamped)
}

/// Rename, falling back to copy + remove across filesystems
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if let Err(copy_err) = fs::copy(from, to) {
                // Report the original failure unless copying is what broke.
                return Err(if copy_err.kind() == io::ErrorKind::NotFound { rename_err } else { copy_err });
            }
            fs::remove_file(from)
        }
    }
}
