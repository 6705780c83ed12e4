//! Cyclomatic complexity estimate for source blobs.
//!
//! The score is `1 + decision points`, counted from branch keywords and
//! short-circuit operators per language family. Comment lines are skipped;
//! string literals are not parsed, so the result is an estimate.

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Rust,
    Python,
    Ruby,
    Go,
    CLike,
}

impl Family {
    fn from_path(path: &str) -> Option<Self> {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_lowercase();

        match extension.as_str() {
            "rs" => Some(Family::Rust),
            "py" => Some(Family::Python),
            "rb" => Some(Family::Ruby),
            "go" => Some(Family::Go),
            "c" | "h" | "cc" | "cpp" | "cxx" | "hpp" | "java" | "js" | "jsx" | "ts" | "tsx"
            | "cs" | "kt" | "swift" | "scala" | "php" => Some(Family::CLike),
            _ => None,
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Family::Rust => &["if", "while", "for"],
            Family::Python => &["if", "elif", "for", "while", "except", "and", "or", "case"],
            Family::Ruby => &["if", "elsif", "unless", "while", "until", "for", "when", "rescue"],
            Family::Go => &["if", "for", "case"],
            Family::CLike => &["if", "for", "while", "case", "catch"],
        }
    }

    fn operators(self) -> &'static [&'static str] {
        match self {
            Family::Rust => &["&&", "||", "=>"],
            Family::Python => &[],
            Family::Ruby | Family::Go => &["&&", "||"],
            Family::CLike => &["&&", "||", "?"],
        }
    }

    fn is_comment(self, line: &str) -> bool {
        match self {
            Family::Python | Family::Ruby => line.starts_with('#'),
            _ => line.starts_with("//") || line.starts_with("/*") || line.starts_with('*'),
        }
    }
}

/// `None` for files whose language is not recognised.
pub fn estimate(path: &str, source: &str) -> Option<u32> {
    let family = Family::from_path(path)?;
    let keywords = family.keywords();
    let operators = family.operators();

    let mut decisions = 0u32;
    for line in source.lines().map(str::trim) {
        if line.is_empty() || family.is_comment(line) {
            continue;
        }
        decisions += line
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|word| keywords.contains(word))
            .count() as u32;
        decisions += operators
            .iter()
            .map(|op| line.matches(op).count() as u32)
            .sum::<u32>();
    }
    Some(1 + decisions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_languages_have_no_score() {
        assert_eq!(estimate("README.md", "if this then that"), None);
        assert_eq!(estimate("Makefile", "all:"), None);
    }

    #[test]
    fn straight_line_code_scores_one() {
        assert_eq!(estimate("main.py", "print('hello')\n"), Some(1));
    }

    #[test]
    fn python_branches_are_counted() {
        let source = "\
def f(x):
    # if this were a comment it would not count
    if x and x > 1:
        return 1
    elif x:
        return 2
    for i in range(3):
        pass
";
        // if, and, elif, for
        assert_eq!(estimate("f.py", source), Some(5));
    }

    #[test]
    fn c_like_operators_are_counted() {
        let source = "int f(int a) { return a > 0 && a < 9 ? a : 0; }";
        assert_eq!(estimate("f.c", source), Some(3));
    }

    #[test]
    fn identifiers_containing_keywords_do_not_count() {
        assert_eq!(estimate("lib.rs", "let iffy = format_for(x);"), Some(1));
    }
}
