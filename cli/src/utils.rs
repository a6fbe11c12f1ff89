use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Read, Write};

use crate::error::{Error, Result};

/// Name shown for input read from stdin.
pub(crate) const STDIN_NAME: &str = "<stdin>";

/// Read input from a file or stdin
///
/// If `file` is `Some`, reads from the specified file path.
/// If `file` is `None`, reads from stdin.
pub(crate) fn read_input(file: Option<&str>) -> Result<Vec<u8>> {
    match file {
        Some(path) => fs::read(path).map_err(|source| Error::File {
            path: path.to_string(),
            source,
        }),
        None => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            Ok(buffer)
        }
    }
}

/// Hidden sibling that output is staged in: `dir/name` -> `dir/.name.new`.
fn staging_path(path: &str) -> String {
    let idx = path.rfind('/').map_or(0, |i| i + 1);
    format!("{}.{}.new", &path[..idx], &path[idx..])
}

/// Writes `path` through a staging file that is renamed over it only once
/// `write` succeeds. On failure the staging file is removed and `path` is
/// left untouched.
///
/// The staging file is created exclusively, so a leftover from another run
/// makes this fail instead of clobbering it.
pub(crate) fn write_atomic<F>(path: &str, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<fs::File>) -> Result<()>,
{
    if path.ends_with('/') {
        return Err(Error::IsDirectory(path.to_string()));
    }
    let staging = staging_path(path);
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&staging)
        .map_err(|source| Error::File {
            path: staging.clone(),
            source,
        })?;

    let mut writer = BufWriter::new(file);
    let written = write(&mut writer).and_then(|()| {
        writer.flush()?;
        Ok(())
    });
    drop(writer);

    if let Err(e) = written {
        tracing::debug!(path = %staging, "removing staging file");
        // the write error is the one worth reporting
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    fs::rename(&staging, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::staging_path;

    #[rstest(
        input,
        expected,
        case("out.html", ".out.html.new"),
        case("dir/out.html", "dir/.out.html.new"),
        case("/tmp/a/b", "/tmp/a/.b.new")
    )]
    fn test_staging_path(input: &str, expected: &str) {
        assert_eq!(expected, staging_path(input));
    }
}
