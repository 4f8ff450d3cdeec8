use serde::{Deserialize, Serialize};
use std::fmt;

use crate::filter;

/// File type or content class a discovered link is presumed to point at.
///
/// Variants are declared in classification priority order; the derived
/// `Ord` follows the same order, so a `BTreeMap<Category, _>` lists
/// categories the way they are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Documents,
    Images,
    Videos,
    Audio,
    Archives,
    Spreadsheets,
    Presentations,
    Pdfs,
    Executables,
    DiskImages,
    /// Catch-all for links accepted by hosting domain but with no known extension
    Other,
}

/// One classification rule: a category and the extensions that select it
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub category: Category,
    pub extensions: &'static [&'static str],
}

impl Rule {
    /// True if the lowercased path ends with `.ext` for one of the rule's extensions
    pub fn matches(&self, lowered_path: &str) -> bool {
        self.extensions.iter().any(|ext| {
            lowered_path
                .strip_suffix(*ext)
                .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// Ordered rule table shared by the classifier and the link validator.
/// First match wins.
pub const RULES: &[Rule] = &[
    Rule {
        category: Category::Documents,
        extensions: &["doc", "docx", "txt", "rtf"],
    },
    Rule {
        category: Category::Images,
        extensions: &["jpg", "jpeg", "png", "gif", "bmp"],
    },
    Rule {
        category: Category::Videos,
        extensions: &["mp4", "avi", "mov", "wmv"],
    },
    Rule {
        category: Category::Audio,
        extensions: &["mp3", "wav", "ogg", "m4a"],
    },
    Rule {
        category: Category::Archives,
        extensions: &["zip", "rar", "7z", "tar", "gz"],
    },
    Rule {
        category: Category::Spreadsheets,
        extensions: &["xls", "xlsx", "csv"],
    },
    Rule {
        category: Category::Presentations,
        extensions: &["ppt", "pptx"],
    },
    Rule {
        category: Category::Pdfs,
        extensions: &["pdf"],
    },
    Rule {
        category: Category::Executables,
        extensions: &["exe", "apk", "msi"],
    },
    Rule {
        category: Category::DiskImages,
        extensions: &["iso", "dmg"],
    },
];

impl Category {
    /// Every category, in priority order
    pub const ALL: [Category; 11] = [
        Category::Documents,
        Category::Images,
        Category::Videos,
        Category::Audio,
        Category::Archives,
        Category::Spreadsheets,
        Category::Presentations,
        Category::Pdfs,
        Category::Executables,
        Category::DiskImages,
        Category::Other,
    ];

    /// Label used in the persisted record and in summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Documents => "documents",
            Category::Images => "images",
            Category::Videos => "videos",
            Category::Audio => "audio",
            Category::Archives => "archives",
            Category::Spreadsheets => "spreadsheets",
            Category::Presentations => "presentations",
            Category::Pdfs => "pdfs",
            Category::Executables => "executables",
            Category::DiskImages => "disk_images",
            Category::Other => "other",
        }
    }

    /// Looks up the category for a path that has already been lowercased
    pub fn from_path(lowered_path: &str) -> Option<Category> {
        RULES
            .iter()
            .find(|rule| rule.matches(lowered_path))
            .map(|rule| rule.category)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a URL to exactly one category.
///
/// Matching runs on the same normalized path the validator inspects, so a
/// link accepted because of its extension always lands in that
/// extension's category. Anything else, including input that does not
/// parse, is `Other`.
pub fn classify(url: &str) -> Category {
    let category = filter::matching_path(url)
        .and_then(|path| Category::from_path(&path))
        .unwrap_or(Category::Other);
    ::log::trace!("Classified {} as {}", url, category);
    category
}
