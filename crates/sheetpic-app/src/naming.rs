// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::path::{Path, PathBuf};

pub const EXTRACT_PREFIX: &str = "extracted_";
pub const KEYWORD_PLACEHOLDER: &str = "keyword";
pub const MERGED_FILE_NAME: &str = "merged.xlsx";
pub const MACROS_REMOVED_SUFFIX: &str = "(macros_removed)";
pub const WORKBOOK_EXTENSION: &str = "xlsx";

const FALLBACK_STEM: &str = "workbook";
const INVALID_FILE_NAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Default output name for keyword extraction. Only a display default: an
/// empty keyword still fails validation before any dialog opens.
pub fn keyword_output_name(keyword: &str) -> String {
    let trimmed = keyword.trim();
    let label = if trimmed.is_empty() {
        KEYWORD_PLACEHOLDER
    } else {
        trimmed
    };
    format!(
        "{EXTRACT_PREFIX}{}.{WORKBOOK_EXTENSION}",
        sanitize_file_name(label)
    )
}

pub fn selection_output_name(source: &Path) -> String {
    format!("{EXTRACT_PREFIX}{}.{WORKBOOK_EXTENSION}", source_stem(source))
}

pub fn macros_removed_output_name(source: &Path) -> String {
    format!(
        "{}{MACROS_REMOVED_SUFFIX}.{WORKBOOK_EXTENSION}",
        source_stem(source)
    )
}

/// Last path component with its final extension removed.
///
/// Splits on both separators so Windows-style paths behave the same on every
/// host.
pub fn source_stem(source: &Path) -> String {
    let raw = source.to_string_lossy();
    let file_name = raw
        .rsplit(|ch: char| ch == '/' || ch == '\\')
        .next()
        .unwrap_or_default();
    let stem = match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(dot) => &file_name[..dot],
    };
    if stem.is_empty() {
        FALLBACK_STEM.to_owned()
    } else {
        sanitize_file_name(stem)
    }
}

/// Parent directory used as the save dialog's starting point.
pub fn source_directory(source: &Path) -> Option<PathBuf> {
    source
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

pub fn sanitize_file_name(value: &str) -> String {
    value
        .chars()
        .map(|ch| {
            if INVALID_FILE_NAME_CHARS.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        keyword_output_name, macros_removed_output_name, selection_output_name, source_directory,
        source_stem,
    };
    use std::path::{Path, PathBuf};

    #[test]
    fn keyword_name_uses_trimmed_keyword() {
        assert_eq!(keyword_output_name("  Q1 "), "extracted_Q1.xlsx");
    }

    #[test]
    fn keyword_name_falls_back_to_placeholder() {
        assert_eq!(keyword_output_name(""), "extracted_keyword.xlsx");
        assert_eq!(keyword_output_name("   "), "extracted_keyword.xlsx");
    }

    #[test]
    fn keyword_name_replaces_path_separators() {
        assert_eq!(keyword_output_name("a/b:c"), "extracted_a_b_c.xlsx");
    }

    #[test]
    fn selection_name_strips_extension() {
        assert_eq!(
            selection_output_name(Path::new("/data/Budget 2026.xlsx")),
            "extracted_Budget 2026.xlsx"
        );
    }

    #[test]
    fn macro_name_normalizes_extension() {
        assert_eq!(
            macros_removed_output_name(Path::new("report.xlsm")),
            "report(macros_removed).xlsx"
        );
    }

    #[test]
    fn stem_handles_backslashes_dotfiles_and_missing_names() {
        assert_eq!(source_stem(Path::new(r"C:\books\sales.v2.xlsx")), "sales.v2");
        assert_eq!(source_stem(Path::new(".hidden")), ".hidden");
        assert_eq!(source_stem(Path::new("")), "workbook");
    }

    #[test]
    fn directory_is_none_for_bare_file_names() {
        assert_eq!(source_directory(Path::new("report.xlsm")), None);
        assert_eq!(
            source_directory(Path::new("/data/report.xlsm")),
            Some(PathBuf::from("/data"))
        );
    }
}
