//! Download manifests
//!
//! A [`Manifest`] is an immutable set of `(source URI, target file)` pairs
//! describing everything one bulk download must stage. It is assembled with a
//! [`ManifestBuilder`], which enforces at `build()` time that no two sources
//! are written to the same file.
//!
//! # Examples
//!
//! ```rust
//! use fetch_cache::app::manifest::ManifestBuilder;
//! use url::Url;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = ManifestBuilder::new();
//! builder
//!     .add_entry(Url::parse("https://my-server.com/setup.sh")?, "/job/setup.sh")
//!     .add_entry_with_target_directory(Url::parse("https://my-server.com/libs/a.jar")?, "/job/deps")?;
//! let manifest = builder.build()?;
//!
//! assert_eq!(manifest.len(), 2);
//! assert!(manifest.target_directories().contains(std::path::Path::new("/job/deps")));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use url::Url;

use crate::errors::{ManifestError, ManifestResult};

/// Immutable mapping of source URIs to target files
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    entries: BTreeMap<Url, PathBuf>,
}

impl Manifest {
    /// `(source URI, target file)` pairs, ordered by URI
    pub fn entries(&self) -> impl Iterator<Item = (&Url, &Path)> {
        self.entries.iter().map(|(uri, target)| (uri, target.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source_uris(&self) -> impl Iterator<Item = &Url> {
        self.entries.keys()
    }

    pub fn target_files(&self) -> BTreeSet<&Path> {
        self.entries.values().map(PathBuf::as_path).collect()
    }

    /// Distinct parent directories of all target files
    ///
    /// A bare relative file name lives in `.`.
    pub fn target_directories(&self) -> BTreeSet<&Path> {
        self.entries
            .values()
            .map(|target| match target.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            })
            .collect()
    }

    /// Target file registered for `uri`, if any
    pub fn target_file(&self, uri: &Url) -> Option<&Path> {
        self.entries.get(uri).map(PathBuf::as_path)
    }
}

/// Accumulates manifest entries
#[derive(Debug, Clone, Default)]
pub struct ManifestBuilder {
    entries: BTreeMap<Url, PathBuf>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with every source targeted into `directory`
    pub fn from_sources_into_directory<I>(sources: I, directory: impl AsRef<Path>) -> ManifestResult<Self>
    where
        I: IntoIterator<Item = Url>,
    {
        let mut builder = Self::new();
        for uri in sources {
            builder.add_entry_with_target_directory(uri, directory.as_ref())?;
        }
        Ok(builder)
    }

    /// Map `uri` to `target_file`, replacing any earlier mapping of `uri`
    pub fn add_entry(&mut self, uri: Url, target_file: impl Into<PathBuf>) -> &mut Self {
        self.entries.insert(uri, target_file.into());
        self
    }

    /// Map `uri` to a file in `directory` named after the last segment of
    /// the URI path
    ///
    /// # Errors
    ///
    /// `InvalidUri` if the URI path has no usable last segment
    pub fn add_entry_with_target_directory(
        &mut self,
        uri: Url,
        directory: impl AsRef<Path>,
    ) -> ManifestResult<&mut Self> {
        let file_name = file_name_of(&uri)?;
        let target = directory.as_ref().join(file_name);
        Ok(self.add_entry(uri, target))
    }

    /// Freeze the accumulated entries
    ///
    /// # Errors
    ///
    /// `DuplicateTarget` if two distinct sources map to the same file
    pub fn build(&self) -> ManifestResult<Manifest> {
        let mut seen: HashMap<&Path, &Url> = HashMap::with_capacity(self.entries.len());

        for (uri, target) in &self.entries {
            if let Some(first) = seen.insert(target.as_path(), uri) {
                return Err(ManifestError::DuplicateTarget {
                    target: target.clone(),
                    first: first.clone(),
                    second: uri.clone(),
                });
            }
        }

        Ok(Manifest {
            entries: self.entries.clone(),
        })
    }
}

fn file_name_of(uri: &Url) -> ManifestResult<String> {
    let invalid = |reason: &str| ManifestError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };

    if uri.cannot_be_a_base() {
        return Err(invalid("URI has no hierarchical path"));
    }

    let name = uri
        .path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    match name {
        "" => Err(invalid("URI path has no file name")),
        "." | ".." => Err(invalid("URI path does not end in a file name")),
        name => Ok(name.to_string()),
    }
}
