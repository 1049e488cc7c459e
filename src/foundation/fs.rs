use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::foundation::error::{PortraitError, PortraitResult};

/// Unique hidden sibling used as a write target before the final rename.
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tag = uuid::Uuid::new_v4().simple().to_string();
    path.with_file_name(format!(".{name}.{}.part", &tag[..12]))
}

/// Write `bytes` to `path` via a temp sibling and a rename; the target is never half-written.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> PortraitResult<()> {
    let tmp = temp_sibling(path);
    let result = (|| {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(PortraitError::io(format!("write '{}'", path.display()), e));
    }
    Ok(())
}

/// Write every `(path, bytes)` pair, or leave all targets as they were.
///
/// Contents are staged in temp siblings first. Existing targets are moved aside while the
/// staged files are renamed in, and are put back if any rename fails.
pub(crate) fn write_group_atomic(files: &[(PathBuf, Vec<u8>)]) -> PortraitResult<()> {
    let mut staged: Vec<PathBuf> = Vec::with_capacity(files.len());
    for (path, bytes) in files {
        if fs::symlink_metadata(path).is_ok_and(|m| !m.is_file()) {
            remove_quietly(&staged);
            return Err(PortraitError::io(
                format!("write '{}'", path.display()),
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "target is not a file"),
            ));
        }
        let tmp = temp_sibling(path);
        let result = (|| {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()
        })();
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            remove_quietly(&staged);
            return Err(PortraitError::io(format!("write '{}'", path.display()), e));
        }
        staged.push(tmp);
    }

    let mut swapped: Vec<(&Path, Option<PathBuf>)> = Vec::with_capacity(files.len());
    for ((path, _), tmp) in files.iter().zip(&staged) {
        let backup = if path.is_file() {
            let aside = temp_sibling(path);
            if let Err(e) = fs::rename(path, &aside) {
                roll_back(&swapped);
                remove_quietly(&staged);
                return Err(PortraitError::io(format!("replace '{}'", path.display()), e));
            }
            Some(aside)
        } else {
            None
        };
        if let Err(e) = fs::rename(tmp, path) {
            if let Some(aside) = &backup {
                let _ = fs::rename(aside, path);
            }
            roll_back(&swapped);
            remove_quietly(&staged);
            return Err(PortraitError::io(format!("write '{}'", path.display()), e));
        }
        swapped.push((path.as_path(), backup));
    }

    for (_, backup) in swapped {
        if let Some(aside) = backup {
            let _ = fs::remove_file(aside);
        }
    }
    Ok(())
}

fn roll_back(swapped: &[(&Path, Option<PathBuf>)]) {
    for (path, backup) in swapped.iter().rev() {
        let _ = fs::remove_file(path);
        if let Some(aside) = backup {
            let _ = fs::rename(aside, path);
        }
    }
}

fn remove_quietly(paths: &[PathBuf]) {
    for p in paths {
        let _ = fs::remove_file(p);
    }
}

/// Copy `src` to `dst` via a temp sibling of `dst`.
pub(crate) fn copy_atomic(src: &Path, dst: &Path) -> PortraitResult<()> {
    let tmp = temp_sibling(dst);
    let result = fs::copy(src, &tmp).and_then(|_| fs::rename(&tmp, dst));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(PortraitError::io(
            format!("copy '{}' to '{}'", src.display(), dst.display()),
            e,
        ));
    }
    Ok(())
}

pub(crate) fn ensure_dir(path: &Path) -> PortraitResult<()> {
    fs::create_dir_all(path)
        .map_err(|e| PortraitError::io(format!("create directory '{}'", path.display()), e))
}

/// A location is free when nothing is there or it is an empty directory.
pub(crate) fn is_free_location(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Err(_) => true,
        Ok(meta) if meta.is_dir() => fs::read_dir(path)
            .map(|mut rd| rd.next().is_none())
            .unwrap_or(false),
        Ok(_) => false,
    }
}

/// Four-space indented JSON, matching files written by earlier tools.
pub(crate) fn to_json_pretty<T: serde::Serialize>(value: &T) -> PortraitResult<Vec<u8>> {
    let mut buf = Vec::new();
    let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Lowercase extension, if any.
pub(crate) fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/fs.rs"]
mod tests;
