//! Sources of the two filename sets fed to the indexer.

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Result, SurveyError};
use crate::pair::PairUniverse;

/// Extensions accepted by [`DirListing`] by default.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Something that can enumerate filenames.
pub trait FileListing: Send + Sync {
    fn list(&self) -> Result<Vec<String>>;
}

/// Regular files directly inside a directory.
#[derive(Clone, Debug)]
pub struct DirListing {
    root: PathBuf,
    extensions: Option<Vec<String>>,
}

impl DirListing {
    /// List image files in `root`.
    pub fn images(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: Some(IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// List every file in `root` regardless of extension.
    pub fn all(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn accepts(&self, name: &str) -> bool {
        if name.starts_with('.') {
            return false;
        }
        let Some(allowed) = &self.extensions else {
            return true;
        };
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
    }
}

impl FileListing for DirListing {
    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1).follow_links(true) {
            let entry = entry.map_err(|err| SurveyError::Listing {
                path: self.root.clone(),
                source: err.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                debug!(path = %entry.path().display(), "skipping non UTF-8 filename");
                continue;
            };
            if self.accepts(name) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

/// Fixed list of names, handy for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct StaticListing(pub Vec<String>);

impl<S: Into<String>> FromIterator<S> for StaticListing {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl FileListing for StaticListing {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Build the universe from two listings.
pub fn index_directories(
    real: &dyn FileListing,
    synth: &dyn FileListing,
    delimiter: char,
) -> Result<PairUniverse> {
    let real_files = real.list()?;
    let synth_files = synth.list()?;
    let universe = PairUniverse::build_with(&real_files, &synth_files, delimiter);
    info!(
        real = real_files.len(),
        synth = synth_files.len(),
        pairs = universe.len(),
        "indexed image pairs"
    );
    Ok(universe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_extension_and_hidden() {
        let listing = DirListing::images("unused");
        assert!(listing.accepts("a.JPG"));
        assert!(listing.accepts("b.webp"));
        assert!(!listing.accepts("notes.txt"));
        assert!(!listing.accepts(".a.jpg"));
        assert!(DirListing::all("unused").accepts("notes.txt"));
    }

    #[test]
    fn static_listing_indexes() {
        let real: StaticListing = ["c.jpg"].into_iter().collect();
        let synth = StaticListing::default();
        let universe = index_directories(&real, &synth, '_').unwrap();
        assert!(universe.is_empty());
    }
}
