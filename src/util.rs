use crate::model::FileModification;

/// Normalizes a user-supplied extension filter.
///
/// Empty input and `all` mean "no filter". Anything not starting with `.` is
/// ignored with a warning.
pub fn extension_filter(input: Option<&str>) -> Option<String> {
    let raw = input?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        return None;
    }
    if !raw.starts_with('.') {
        log::warn!("extension filter '{raw}' does not start with '.', defaulting to all files");
        return None;
    }
    Some(raw.to_lowercase())
}

pub fn files_matching<'a>(
    files: &'a [FileModification],
    extension: Option<&'a str>,
) -> impl Iterator<Item = &'a FileModification> + 'a {
    files.iter().filter(move |fm| match extension {
        Some(ext) => fm.path.to_lowercase().ends_with(ext),
        None => true,
    })
}

/// `owner/name`, the only repository form the platform API accepts.
pub fn is_repo_slug(input: &str) -> bool {
    let mut parts = input.split('/');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extension_filter_rules() {
        assert_eq!(extension_filter(None), None);
        assert_eq!(extension_filter(Some("")), None);
        assert_eq!(extension_filter(Some("all")), None);
        assert_eq!(extension_filter(Some("rs")), None);
        assert_eq!(extension_filter(Some(".PY")), Some(".py".to_string()));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let files = vec![
            FileModification {
                path: "src/Main.RS".into(),
                added_lines: 1,
                deleted_lines: 0,
                complexity: None,
            },
            FileModification {
                path: "README.md".into(),
                added_lines: 1,
                deleted_lines: 0,
                complexity: None,
            },
        ];
        let matched: Vec<_> = files_matching(&files, Some(".rs")).map(|f| f.path.as_str()).collect();
        assert_eq!(matched, vec!["src/Main.RS"]);
        assert_eq!(files_matching(&files, None).count(), 2);
    }

    #[test]
    fn slug_detection() {
        assert!(is_repo_slug("qxf2/newsletter_automation"));
        assert!(!is_repo_slug("newsletter_automation"));
        assert!(!is_repo_slug("https://github.com/qxf2/x"));
        assert!(!is_repo_slug("/x"));
    }
}
