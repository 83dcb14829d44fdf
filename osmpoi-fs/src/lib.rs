//! Shared filesystem helpers built on `cap-std` and `camino`.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::OpenOptions, fs_utf8};
use std::io::{self, Write};
use std::path::Component;

/// File extension identifying OSM extract files.
pub const EXTRACT_EXTENSION: &str = "pbf";

/// Open a UTF-8 file path using ambient authority.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Resolve an ambient directory for the given path and return the directory with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Ensure the parent directory for `path` exists, handling absolute paths safely for cap-std.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    ensure_dir(parent)
}

/// Create `dir` and any missing ancestors.
pub fn ensure_dir(dir: &Utf8Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() || dir == Utf8Path::new("/") {
        return Ok(());
    }

    let (base_dir, relative) = base_dir_and_relative(dir)?;
    if relative.as_os_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Return whether a path exists and is a regular file using capability-based IO.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.metadata(name.as_str()).map(|meta| meta.is_file())
}

/// Append `line` plus a trailing newline to the file at `path`, creating it when absent.
pub fn append_line(path: &Utf8Path, line: &str) -> io::Result<()> {
    let (dir, name) = open_dir_and_file(path)?;
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    let mut file = dir.open_with(name.as_str(), &options)?;
    writeln!(file, "{line}")
}

/// Remove the file at `path`, treating a missing file as success.
pub fn remove_file_if_exists(path: &Utf8Path) -> io::Result<()> {
    let (dir, name) = open_dir_and_file(path)?;
    match dir.remove_file(name.as_str()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Collect extract files under `path`.
///
/// A file path is returned as-is when it carries the `.pbf` extension. A
/// directory is walked recursively and every `.pbf` file beneath it is
/// returned, ordered by lower-cased file name so runs are reproducible across
/// platforms.
pub fn list_extract_files(path: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
    if file_is_file(path)? {
        return Ok(if has_extract_extension(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let dir = fs_utf8::Dir::open_ambient_dir(path, ambient_authority())?;
    let mut found = Vec::new();
    collect_extracts(&dir, path, &mut found)?;
    found.sort_by_cached_key(|candidate| {
        (
            candidate.file_name().map(str::to_lowercase),
            candidate.clone(),
        )
    });
    Ok(found)
}

fn collect_extracts(
    dir: &fs_utf8::Dir,
    prefix: &Utf8Path,
    found: &mut Vec<Utf8PathBuf>,
) -> io::Result<()> {
    for entry in dir.entries()? {
        let entry = entry?;
        let name = entry.file_name()?;
        let file_type = entry.file_type()?;
        let full = prefix.join(&name);
        if file_type.is_dir() {
            let child = dir.open_dir(&name)?;
            collect_extracts(&child, &full, found)?;
        } else if file_type.is_file() && has_extract_extension(&full) {
            found.push(full);
        }
    }
    Ok(())
}

fn has_extract_extension(path: &Utf8Path) -> bool {
    path.extension() == Some(EXTRACT_EXTENSION)
}

/// Split an absolute or relative parent path into an ambient base directory and a relative suffix.
pub fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();

    let (base, relative) = match std_parent.components().next() {
        // Windows absolute path with a drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;

            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_parent.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from parent path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_parent.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative = Utf8PathBuf::from_path_buf(relative)
        .map_err(|_| io::Error::other("non-UTF-8 parent path"))?;

    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("create temp dir")
    }

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir")
    }

    #[rstest]
    fn lists_extracts_sorted_case_insensitively(temp_dir: TempDir) {
        let root = utf8(&temp_dir);
        fs::create_dir_all(root.join("nested")).expect("create nested dir");
        for name in ["b.pbf", "A.pbf", "notes.txt", "nested/c.pbf"] {
            fs::write(root.join(name), b"").expect("write file");
        }

        let files = list_extract_files(&root).expect("list extracts");
        let names: Vec<_> = files.iter().filter_map(|path| path.file_name()).collect();

        assert_eq!(names, ["A.pbf", "b.pbf", "c.pbf"]);
    }

    #[rstest]
    #[case("single.pbf", 1)]
    #[case("single.osm", 0)]
    fn a_file_path_is_its_own_listing(temp_dir: TempDir, #[case] name: &str, #[case] count: usize) {
        let path = utf8(&temp_dir).join(name);
        fs::write(&path, b"").expect("write file");

        let files = list_extract_files(&path).expect("list extracts");

        assert_eq!(files.len(), count);
    }

    #[rstest]
    fn appends_lines_and_removes_files(temp_dir: TempDir) {
        let path = utf8(&temp_dir).join("logs/events.log");
        ensure_parent_dir(&path).expect("create parent");

        append_line(&path, "first").expect("append first");
        append_line(&path, "second").expect("append second");
        let contents = fs::read_to_string(&path).expect("read log");
        assert_eq!(contents, "first\nsecond\n");

        remove_file_if_exists(&path).expect("remove log");
        remove_file_if_exists(&path).expect("second removal is a no-op");
        assert!(!path.exists());
    }
}
