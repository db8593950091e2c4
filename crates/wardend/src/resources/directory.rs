use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use globset::GlobMatcher;

use super::{ResourceSource, normalise};

/// Resource source backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    name: String,
    root: PathBuf,
}

impl DirectorySource {
    /// Serves resources from below `root`.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path.trim_matches('/'));
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("resource path '{path}' escapes the resource root"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl ResourceSource for DirectorySource {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn find(&self, path: &str, matcher: &GlobMatcher, recursive: bool) -> io::Result<Vec<String>> {
        let directory = self.resolve(path)?;
        if !directory.is_dir() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        collect(&directory, &normalise(path), matcher, recursive, &mut found)?;
        found.sort();
        Ok(found)
    }

    fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|resolved| resolved.is_file())
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(self.resolve(path)?)?;
        Ok(Box::new(file))
    }
}

fn collect(
    directory: &Path,
    prefix: &str,
    matcher: &GlobMatcher,
    recursive: bool,
    found: &mut Vec<String>,
) -> io::Result<()> {
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let relative = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        if file_type.is_dir() {
            if recursive {
                collect(&entry.path(), &relative, matcher, recursive, found)?;
            }
        } else if matcher.is_match(&name) {
            found.push(relative);
        }
    }
    Ok(())
}
