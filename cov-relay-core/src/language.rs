//! The closed set of languages coverage can be reported for.
//!
//! Every run iterates [`Language::ALL`] exhaustively. Each variant owns the
//! identifier sent to the coverage service and the source file extensions
//! used to decide which coverage entries belong to it.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    Java,
    Kotlin,
    Scala,
    Groovy,
    JavaScript,
    TypeScript,
    Python,
    Go,
    Rust,
}

impl Language {
    /// Iteration order for a run. Submission order across languages follows it.
    pub const ALL: [Language; 9] = [
        Language::Java,
        Language::Kotlin,
        Language::Scala,
        Language::Groovy,
        Language::JavaScript,
        Language::TypeScript,
        Language::Python,
        Language::Go,
        Language::Rust,
    ];

    /// Identifier used to tag submissions for this language.
    pub fn id(self) -> &'static str {
        match self {
            Language::Java => "Java",
            Language::Kotlin => "Kotlin",
            Language::Scala => "Scala",
            Language::Groovy => "Groovy",
            Language::JavaScript => "Javascript",
            Language::TypeScript => "TypeScript",
            Language::Python => "Python",
            Language::Go => "Go",
            Language::Rust => "Rust",
        }
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Language::Java => &["java"],
            Language::Kotlin => &["kt", "kts"],
            Language::Scala => &["scala"],
            Language::Groovy => &["groovy"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts", "tsx"],
            Language::Python => &["py"],
            Language::Go => &["go"],
            Language::Rust => &["rs"],
        }
    }

    /// True when `path` is a source file of this language, judged by extension.
    pub fn owns(self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions().iter().any(|known| ext.eq_ignore_ascii_case(known)))
            .unwrap_or(false)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_unique() {
        let mut ids: Vec<_> = Language::ALL.iter().map(|l| l.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), Language::ALL.len());
    }

    #[test]
    fn ownership_is_decided_by_extension() {
        assert!(Language::Kotlin.owns(Path::new("src/main/kotlin/App.kt")));
        assert!(Language::Java.owns(Path::new("Main.JAVA")));
        assert!(!Language::Java.owns(Path::new("src/main/kotlin/App.kt")));
        assert!(!Language::Rust.owns(Path::new("Makefile")));
    }
}
