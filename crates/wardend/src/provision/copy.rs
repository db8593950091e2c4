use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// Destination of an exact copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyTarget {
    /// Write to exactly this file.
    File(PathBuf),
    /// Write into this directory, keeping the resource's file name.
    Directory(PathBuf),
}

/// A copy from the resource bundle into the install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopySpec {
    /// Copy a single resource.
    Exact {
        /// Resource path.
        from: String,
        /// Where the copy lands.
        to: CopyTarget,
    },
    /// Copy every resource in `from_dir` whose file name matches `pattern`.
    DirectoryGlob {
        /// Resource directory searched, non-recursively.
        from_dir: String,
        /// File name glob.
        pattern: String,
        /// Directory receiving the copies.
        to_dir: PathBuf,
    },
}

impl CopySpec {
    /// Copies resource `from` to the file `to`.
    pub fn file(from: impl Into<String>, to: impl Into<PathBuf>) -> Self {
        Self::Exact {
            from: from.into(),
            to: CopyTarget::File(to.into()),
        }
    }

    /// Copies resources matching `pattern` in `from_dir` into `to_dir`.
    pub fn glob(
        from_dir: impl Into<String>,
        pattern: impl Into<String>,
        to_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::DirectoryGlob {
            from_dir: from_dir.into(),
            pattern: pattern.into(),
            to_dir: to_dir.into(),
        }
    }

    /// Infers a copy from trailing separators.
    ///
    /// | `from` ends in `/` | `to` ends in `/` | copy                                   |
    /// |--------------------|------------------|----------------------------------------|
    /// | no                 | no               | exact file to file                     |
    /// | no                 | yes              | exact file into directory              |
    /// | yes                | yes              | every resource in `from` into `to`     |
    /// | yes                | no               | resources in `from` named like `to`'s  |
    /// |                    |                  | file name, into `to`'s parent          |
    ///
    /// Returns `None` when either side is empty.
    #[must_use]
    pub fn parse(from: &str, to: &str) -> Option<Self> {
        if from.is_empty() || to.is_empty() {
            return None;
        }
        let from_is_dir = from.ends_with('/');
        let to_is_dir = to.ends_with('/') || to.ends_with(MAIN_SEPARATOR);
        let spec = match (from_is_dir, to_is_dir) {
            (false, false) => Self::file(from, to),
            (false, true) => Self::Exact {
                from: from.to_owned(),
                to: CopyTarget::Directory(PathBuf::from(to)),
            },
            (true, true) => Self::glob(from, "*", to),
            (true, false) => {
                let to = Path::new(to);
                let pattern = to.file_name()?.to_str()?;
                let to_dir = to.parent().map(Path::to_path_buf).unwrap_or_default();
                Self::glob(from, pattern, to_dir)
            }
        };
        Some(spec)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("config/buildinfo", "/srv/ds/config/buildinfo", CopySpec::file("config/buildinfo", "/srv/ds/config/buildinfo"))]
    #[case(
        "config/buildinfo",
        "/srv/ds/config/",
        CopySpec::Exact {
            from: "config/buildinfo".to_owned(),
            to: CopyTarget::Directory(PathBuf::from("/srv/ds/config/")),
        }
    )]
    #[case("config/schema/", "/srv/ds/config/schema/", CopySpec::glob("config/schema/", "*", "/srv/ds/config/schema/"))]
    #[case(
        "config/upgrade/",
        "/srv/ds/config/upgrade/schema.ldif.9086",
        CopySpec::glob("config/upgrade/", "schema.ldif.9086", "/srv/ds/config/upgrade")
    )]
    fn infers_copy_mode_from_trailing_separators(
        #[case] from: &str,
        #[case] to: &str,
        #[case] expected: CopySpec,
    ) {
        assert_eq!(CopySpec::parse(from, to), Some(expected));
    }

    #[rstest]
    #[case("", "/srv/ds/config/")]
    #[case("config/buildinfo", "")]
    fn empty_sides_are_rejected(#[case] from: &str, #[case] to: &str) {
        assert_eq!(CopySpec::parse(from, to), None);
    }
}
