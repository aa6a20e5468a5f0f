use crate::assembler::AssemblyReport;
use crate::error::StudioError;
use std::fs;
use std::path::{Path, PathBuf};

const UNSAFE_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];
const FALLBACK_NAME: &str = "program";

/// Paths of the files written by one export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedFiles {
    pub hex: PathBuf,
    pub listing: PathBuf,
}

/// File name stem derived from a document name: extension stripped and characters
/// that are unsafe in file names replaced with '_'.
///
/// # Example
/// ```
/// use asmstudio::export::base_name;
///
/// assert_eq!(base_name("timer.asm"), "timer");
/// assert_eq!(base_name("a/b:c.asm"), "a_b_c");
/// assert_eq!(base_name(".asm"), ".asm");
/// assert_eq!(base_name("  "), "program");
/// ```
#[must_use]
pub fn base_name(document_name: &str) -> String {
    let name = document_name.trim();
    let stem = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };
    let safe: String = stem
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let safe = safe.trim();
    if safe.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        safe.to_string()
    }
}

/// Write `<base>.hex` and `<base>.lst` of `report` into `dir` (created if needed).
///
/// # Errors
/// Returns [`StudioError::IoFailure`] if the directory or either file cannot be
/// written. Files already written by this call are removed again.
#[tracing::instrument(skip(report, dir), fields(dir = %dir.display()))]
pub fn export(
    report: &AssemblyReport,
    document_name: &str,
    dir: &Path,
) -> Result<ExportedFiles, StudioError> {
    fs::create_dir_all(dir)
        .map_err(|e| StudioError::io(format!("Creating {}", dir.display()), &e))?;

    let base = base_name(document_name);
    let files = ExportedFiles {
        hex: dir.join(format!("{base}.hex")),
        listing: dir.join(format!("{base}.lst")),
    };

    let mut written: Vec<&Path> = Vec::with_capacity(2);
    for (path, content) in [
        (&files.hex, &report.canonical_hex),
        (&files.listing, &report.listing),
    ] {
        if let Err(e) = fs::write(path, content) {
            for done in written {
                if let Err(cleanup) = fs::remove_file(done) {
                    tracing::warn!(path = %done.display(), %cleanup, "could not remove partial export");
                }
            }
            return Err(StudioError::io(format!("Writing {}", path.display()), &e));
        }
        written.push(path);
    }

    tracing::info!(hex = %files.hex.display(), "exported");
    Ok(files)
}
