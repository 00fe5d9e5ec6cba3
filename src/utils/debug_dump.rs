// src/utils/debug_dump.rs
use crate::extractors::sections::Sections;
use crate::utils::error::StorageError;
use std::fs;
use std::path::{Path, PathBuf};

/// Renders segmented sections as plain text, one header per section.
pub fn render_sections(sections: &Sections) -> String {
    let mut out = String::new();
    for (kind, lines) in sections.iter() {
        out.push_str(&format!("==== {:?} ({} lines) ====\n", kind, lines.len()));
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Writes the sections of `source` to `<dir>/<file stem>_sections.txt`.
pub fn save_sections(dir: &Path, source: &Path, sections: &Sections) -> Result<PathBuf, StorageError> {
    fs::create_dir_all(dir)?;

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let path = dir.join(format!("{}_sections.txt", stem));

    fs::write(&path, render_sections(sections))?;
    tracing::debug!("Saved section dump to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::sections::segment;
    use crate::extractors::vocabulary::Language;

    #[test]
    fn dump_is_named_after_source_stem() {
        let tmp = tempfile::tempdir().unwrap();
        let lines = ["Tax return summary", "First name John", "GST/HST Tax Credit", "July 2024 10 00"];
        let sections = segment(&lines, Language::English.vocabulary());

        let path = save_sections(&tmp.path().join("debug"), Path::new("/in/smith_2023.pdf"), &sections).unwrap();

        assert_eq!(path.file_name().unwrap(), "smith_2023_sections.txt");
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("==== TaxReturnSummary (1 lines) ===="));
        assert!(text.contains("July 2024 10 00"));
    }
}
