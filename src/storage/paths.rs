use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, Result};

const HTML_DIR: &str = "templates";
const THUMBNAIL_DIR: &str = "thumbnails";

/// Maps files under the private storage root to URLs under the public prefix.
///
/// Constructed from [`crate::config::Config::paths`] and passed by value into the
/// store and service so that tests can point it at a temporary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    private_root: PathBuf,
    url_root: String,
}

impl PathMapping {
    pub fn new(private_root: impl Into<PathBuf>, url_root: &str) -> Self {
        Self {
            private_root: private_root.into(),
            url_root: url_root.trim_end_matches('/').to_string(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.private_root
    }

    pub fn html_dir(&self) -> PathBuf {
        self.private_root.join(HTML_DIR)
    }

    pub fn thumbnail_dir(&self) -> PathBuf {
        self.private_root.join(THUMBNAIL_DIR)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.html_dir())?;
        std::fs::create_dir_all(self.thumbnail_dir())?;
        Ok(())
    }

    /// `url_root + private_path` with the private root stripped.
    pub fn public_path(&self, private_path: &Path) -> Result<String> {
        let relative = private_path
            .strip_prefix(&self.private_root)
            .map_err(|_| AppError::PathOutsideRoot(private_path.to_path_buf()))?;

        let mut public = self.url_root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    public.push('/');
                    public.push_str(&part.to_string_lossy());
                }
                Component::CurDir => {}
                _ => return Err(AppError::PathOutsideRoot(private_path.to_path_buf())),
            }
        }

        if public.len() == self.url_root.len() {
            // The root itself is never an artifact.
            return Err(AppError::PathOutsideRoot(private_path.to_path_buf()));
        }
        Ok(public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_and_prepends_prefix() {
        let paths = PathMapping::new("static", "/static");
        let public = paths
            .public_path(Path::new("static/thumbnails/17_thumbnail.jpg"))
            .unwrap();
        assert_eq!(public, "/static/thumbnails/17_thumbnail.jpg");
    }

    #[test]
    fn absolute_roots_and_trailing_slash() {
        let paths = PathMapping::new("/var/lib/app/static", "/files/");
        let public = paths
            .public_path(Path::new("/var/lib/app/static/templates/1.html"))
            .unwrap();
        assert_eq!(public, "/files/templates/1.html");
    }

    #[test]
    fn artifact_dirs_sit_under_root() {
        let paths = PathMapping::new("data", "/static");
        assert_eq!(paths.html_dir(), PathBuf::from("data/templates"));
        assert_eq!(paths.thumbnail_dir(), PathBuf::from("data/thumbnails"));
        assert_eq!(paths.staging_dir(), Path::new("data"));
    }

    #[test]
    fn paths_outside_root_are_rejected() {
        let paths = PathMapping::new("static", "/static");
        assert!(matches!(
            paths.public_path(Path::new("other/x.html")),
            Err(AppError::PathOutsideRoot(_))
        ));
        assert!(matches!(
            paths.public_path(Path::new("static/../etc/passwd")),
            Err(AppError::PathOutsideRoot(_))
        ));
        assert!(paths.public_path(Path::new("static")).is_err());
    }
}
