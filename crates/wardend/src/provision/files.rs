use std::io::{self, Read, Write};
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

/// Creation mode of provisioned files before the umask applies, matching a
/// file created with [`std::fs::File::create`].
#[cfg(unix)]
const PLAIN_FILE_MODE: u32 = 0o666;

/// Writes `contents` to `path` through a persisted temporary file.
///
/// Data is flushed and fsync'd before the temporary file is renamed into
/// place so readers never observe a partially written payload.
pub(super) fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = temporary_beside(path)?;
    file.write_all(contents)?;
    persist(file, path)
}

/// Streams `reader` into `path` with the same guarantees as [`atomic_write`].
pub(super) fn atomic_copy(reader: &mut dyn Read, path: &Path) -> io::Result<u64> {
    let mut file = temporary_beside(path)?;
    let copied = io::copy(reader, &mut file)?;
    persist(file, path)?;
    Ok(copied)
}

fn temporary_beside(path: &Path) -> io::Result<NamedTempFile> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "target path did not have a parent directory",
        )
    })?;

    let mut builder = Builder::new();
    builder.prefix(
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("warden"),
    );
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(PLAIN_FILE_MODE));
    }
    builder.tempfile_in(directory)
}

fn persist(file: NamedTempFile, path: &Path) -> io::Result<()> {
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
