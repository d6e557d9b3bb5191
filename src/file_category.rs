//! Extension catalog and classifier for organizing files by type.
//!
//! This module maps file extensions (including their leading `.`) to named
//! categories such as "Image Files" or "Text Files". Any extension the catalog
//! does not know falls back to the [`OTHERS_CATEGORY`] bucket.
//!
//! # Examples
//!
//! ```
//! use dirsort::file_category::{Classifier, ExtensionCatalog};
//!
//! let classifier = Classifier::new(ExtensionCatalog::standard());
//! assert_eq!(classifier.classify("notes.txt"), "Text Files");
//! assert_eq!(classifier.classify("photo.JPG"), "Image Files");
//! assert_eq!(classifier.classify("mystery.xyz"), "Others");
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Category every unmatched file is sorted into.
pub const OTHERS_CATEGORY: &str = "Others";

/// Errors raised while building a custom catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The extension is already claimed by another category.
    #[error("extension '{extension}' already belongs to '{existing}', cannot add it to '{requested}'")]
    DuplicateExtension {
        extension: String,
        existing: String,
        requested: String,
    },
    /// The name cannot be used as a directory name, or shadows `Others`.
    #[error("invalid category name '{0}'")]
    InvalidCategoryName(String),
}

/// One named bucket of extensions with their human-readable descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEntry {
    name: String,
    extensions: Vec<(String, String)>,
}

impl CategoryEntry {
    /// The category name, which is also its directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `(extension, description)` pairs in insertion order.
    pub fn extensions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.extensions
            .iter()
            .map(|(ext, desc)| (ext.as_str(), desc.as_str()))
    }

    fn lookup(&self, ext: &str) -> Option<&str> {
        self.extensions
            .iter()
            .find(|(known, _)| known == ext)
            .map(|(_, desc)| desc.as_str())
    }
}

/// Ordered mapping from category name to its extensions.
///
/// Extensions are stored lowercased with a leading `.`, so lookups are
/// case-insensitive. Every extension belongs to at most one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionCatalog {
    categories: Vec<CategoryEntry>,
}

impl ExtensionCatalog {
    /// Creates an empty catalog. Every file classifies as [`OTHERS_CATEGORY`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in category table.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for (name, entries) in STANDARD_TABLE {
            catalog.push_category(name, entries);
        }
        catalog
    }

    /// Adds a category with its `(extension, description)` entries.
    ///
    /// Adding to an existing category name extends it. Fails without modifying
    /// the catalog if any extension is already claimed by a different category.
    pub fn add_category(
        &mut self,
        name: &str,
        entries: &[(&str, &str)],
    ) -> Result<(), CatalogError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || name == OTHERS_CATEGORY
        {
            return Err(CatalogError::InvalidCategoryName(name.to_string()));
        }

        for (ext, _) in entries {
            let ext = normalize_extension(ext);
            if let Some(existing) = self.category_of(&ext)
                && existing != name
            {
                return Err(CatalogError::DuplicateExtension {
                    extension: ext,
                    existing: existing.to_string(),
                    requested: name.to_string(),
                });
            }
        }

        self.push_category(name, entries);
        Ok(())
    }

    fn push_category(&mut self, name: &str, entries: &[(&str, &str)]) {
        let index = match self.categories.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.categories.push(CategoryEntry {
                    name: name.to_string(),
                    extensions: Vec::new(),
                });
                self.categories.len() - 1
            }
        };

        let category = &mut self.categories[index];
        for (ext, desc) in entries {
            let ext = normalize_extension(ext);
            if category.lookup(&ext).is_none() {
                category.extensions.push((ext, desc.to_string()));
            }
        }
    }

    /// Categories in their declaration order.
    pub fn categories(&self) -> impl Iterator<Item = &CategoryEntry> {
        self.categories.iter()
    }

    /// Every category name in declaration order, without [`OTHERS_CATEGORY`].
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the category owning `ext` (e.g. `".png"`), if any.
    pub fn category_of(&self, ext: &str) -> Option<&str> {
        let ext = normalize_extension(ext);
        self.categories
            .iter()
            .find(|c| c.lookup(&ext).is_some())
            .map(|c| c.name.as_str())
    }

    /// Returns the human-readable description of `ext`, if it is known.
    pub fn description_of(&self, ext: &str) -> Option<&str> {
        let ext = normalize_extension(ext);
        self.categories.iter().find_map(|c| c.lookup(&ext))
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Lowercases an extension and makes sure it starts with `.`.
fn normalize_extension(ext: &str) -> String {
    let lower = ext.to_lowercase();
    if lower.is_empty() || lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

/// Returns the extension of a file name, including its leading `.`.
///
/// Leading dots of the name are not separators, so `.bashrc` has no
/// extension. Returns an empty string when there is none.
///
/// ```
/// use dirsort::file_category::extension_of;
///
/// assert_eq!(extension_of("report.final.pdf"), ".pdf");
/// assert_eq!(extension_of("Makefile"), "");
/// assert_eq!(extension_of(".bashrc"), "");
/// ```
pub fn extension_of(filename: &str) -> &str {
    let skip = filename.len() - filename.trim_start_matches('.').len();
    match filename[skip..].rfind('.') {
        Some(dot) => &filename[skip + dot..],
        None => "",
    }
}

/// A file paired with the category it was resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    /// Path of the file before it is moved.
    pub source: PathBuf,
    /// Resolved category name.
    pub category: String,
    /// Extension as it appears in the file name.
    pub extension: String,
}

/// Resolves file names to categories using an injected catalog.
#[derive(Debug, Clone)]
pub struct Classifier {
    catalog: ExtensionCatalog,
}

impl Classifier {
    pub fn new(catalog: ExtensionCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ExtensionCatalog {
        &self.catalog
    }

    /// Returns the category for a file name, or [`OTHERS_CATEGORY`].
    ///
    /// Categories are searched in declaration order and the first match wins.
    pub fn classify(&self, filename: &str) -> &str {
        self.catalog
            .category_of(extension_of(filename))
            .unwrap_or(OTHERS_CATEGORY)
    }

    /// Classifies the file at `path` by its final component.
    pub fn classify_path(&self, path: &Path) -> ClassifiedFile {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = extension_of(&name).to_string();

        ClassifiedFile {
            source: path.to_path_buf(),
            category: self.classify(&name).to_string(),
            extension,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ExtensionCatalog::standard())
    }
}

type TableEntry = (&'static str, &'static [(&'static str, &'static str)]);

const STANDARD_TABLE: &[TableEntry] = &[
    (
        "Text Files",
        &[
            (".txt", "Plain Text"),
            (".rtf", "Rich Text Format"),
            (".log", "Log Files"),
        ],
    ),
    (
        "Image Files",
        &[
            (".jpg", "JPEG Images"),
            (".jpeg", "JPEG Images"),
            (".png", "Portable Network Graphics"),
            (".gif", "Graphics Interchange Format"),
            (".bmp", "Bitmap Images"),
            (".svg", "Scalable Vector Graphics"),
        ],
    ),
    (
        "Document Files",
        &[
            (".pdf", "Portable Document Format"),
            (".doc", "Microsoft Word Documents"),
            (".docx", "Microsoft Word Documents"),
            (".odt", "OpenDocument Text"),
            (".ppt", "Microsoft PowerPoint Files"),
            (".pptx", "Microsoft PowerPoint Files"),
        ],
    ),
    (
        "Audio Files",
        &[
            (".mp3", "MP3 Audio"),
            (".wav", "Waveform Audio File Format"),
            (".aac", "Advanced Audio Coding"),
            (".flac", "Free Lossless Audio Codec"),
        ],
    ),
    (
        "Video Files",
        &[
            (".mp4", "MPEG-4 Video"),
            (".mkv", "Matroska Video"),
            (".avi", "Audio Video Interleave"),
            (".mov", "Apple QuickTime Movie"),
        ],
    ),
    (
        "Compressed Files",
        &[
            (".zip", "ZIP Archive"),
            (".rar", "RAR Archive"),
            (".tar", "Tape Archive"),
            (".gz", "Gzip Compressed Archive"),
        ],
    ),
    (
        "Application & Code Files",
        &[
            (".exe", "Windows Executable File"),
            (".dll", "Dynamic Link Library"),
            (".java", "Java Source Code"),
            (".py", "Python Script"),
            (".html", "HyperText Markup Language"),
            (".css", "Cascading Style Sheets"),
            (".js", "JavaScript"),
        ],
    ),
];
