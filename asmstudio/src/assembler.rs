//! The `assembler` module connects the studio to the external assembler and runs the
//! HEX pipeline on its output.
//!
//! The assembler is a black box behind the string-based [`Assembler`] trait: a result
//! starting with `ERROR` is a failure message, anything else is raw Intel HEX.
//! [`assemble_request`] turns that raw HEX into a canonical, annotated report.

use crate::config::StudioConfig;
use crate::error::StudioError;
use crate::session::{Document, DocumentSet};
use ihexlib::{AnnotatedLine, annotate_listing, decode, encode, equal};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

/// Prefix of every failure string returned by an assembler.
pub const ERROR_PREFIX: &str = "ERROR";

pub trait Assembler: Send {
    /// Make `content` available to the next assembly under the include name `name`.
    fn register_include(&mut self, name: &str, content: &str);

    /// Assemble `source`. Returns raw Intel HEX, or a message starting with `ERROR`.
    fn assemble(&mut self, source: &str) -> String;

    /// Listing of the most recent successful assembly.
    fn listing(&self) -> String;
}

/// Drives an assembler executable:
/// `<program> <dir>/main.asm --out <dir>/main.hex --lst-out <dir>/main.lst`.
///
/// Every assembly runs in a fresh scratch directory. Registered includes are written
/// next to `main.asm` and are consumed by the assembly that follows them. When an
/// include already uses one of the `main` file names, the primary files become
/// `main-1.*`, `main-2.*` and so on.
#[derive(Debug, Clone)]
pub struct ProcessAssembler {
    program: PathBuf,
    scratch_root: PathBuf,
    includes: Vec<(String, String)>,
    last_listing: String,
}

impl ProcessAssembler {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            scratch_root: std::env::temp_dir(),
            includes: Vec::new(),
            last_listing: String::new(),
        }
    }

    /// Use `dir` instead of the system temp directory for scratch directories.
    #[must_use]
    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = dir.into();
        self
    }

    fn run(&mut self, dir: &Path, source: &str) -> Result<String, String> {
        let io_err = |what: &str, e: std::io::Error| format!("{ERROR_PREFIX}: {what}: {e}");

        let includes = std::mem::take(&mut self.includes);
        fs::create_dir_all(dir).map_err(|e| io_err("Creating scratch directory", e))?;

        let mut written = Vec::with_capacity(includes.len());
        for (name, content) in includes {
            // Only the file name, so includes cannot escape the scratch directory
            let Some(file_name) = Path::new(&name).file_name() else {
                tracing::warn!(%name, "skipping include with unusable name");
                continue;
            };
            fs::write(dir.join(file_name), content)
                .map_err(|e| io_err(&format!("Writing include {name}"), e))?;
            written.push(file_name.to_string_lossy().into_owned());
        }

        let stem = primary_stem(&written);
        let main_asm = dir.join(format!("{stem}.asm"));
        let main_hex = dir.join(format!("{stem}.hex"));
        let main_lst = dir.join(format!("{stem}.lst"));
        fs::write(&main_asm, source).map_err(|e| io_err(&format!("Writing {stem}.asm"), e))?;

        let output = Command::new(&self.program)
            .current_dir(dir)
            .arg(&main_asm)
            .arg("--out")
            .arg(&main_hex)
            .arg("--lst-out")
            .arg(&main_lst)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| io_err(&format!("Running {}", self.program.display()), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let message = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            let message = if message.is_empty() {
                format!("assembler exited with {}", output.status)
            } else {
                message.to_string()
            };
            return Err(error_string(&message));
        }

        let hex = fs::read_to_string(&main_hex)
            .map_err(|e| io_err(&format!("Reading {stem}.hex"), e))?;
        // A missing listing is not fatal
        self.last_listing = fs::read_to_string(&main_lst).unwrap_or_default();
        Ok(hex)
    }
}

impl Assembler for ProcessAssembler {
    fn register_include(&mut self, name: &str, content: &str) {
        if let Some(slot) = self.includes.iter_mut().find(|(n, _)| n == name) {
            slot.1 = content.to_string();
        } else {
            self.includes.push((name.to_string(), content.to_string()));
        }
    }

    #[tracing::instrument(skip_all, fields(program = %self.program.display()))]
    fn assemble(&mut self, source: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = self
            .scratch_root
            .join(format!("asmstudio-{}-{nanos}", std::process::id()));

        let result = self.run(&dir, source);
        if let Err(e) = fs::remove_dir_all(&dir) {
            tracing::debug!(dir = %dir.display(), %e, "could not remove scratch directory");
        }

        result.unwrap_or_else(|message| message)
    }

    fn listing(&self) -> String {
        self.last_listing.clone()
    }
}

/// First of `main`, `main-1`, `main-2`, ... whose `.asm`, `.hex` and `.lst` files
/// are not taken by an include.
fn primary_stem(taken: &[String]) -> String {
    let is_free = |stem: &str| {
        ["asm", "hex", "lst"]
            .iter()
            .all(|ext| !taken.iter().any(|name| *name == format!("{stem}.{ext}")))
    };
    if is_free("main") {
        return "main".to_string();
    }
    (1..)
        .map(|n| format!("main-{n}"))
        .find(|stem| is_free(stem))
        .unwrap_or_default()
}

/// Make sure a failure message starts with `ERROR`.
fn error_string(message: &str) -> String {
    if message.starts_with(ERROR_PREFIX) {
        message.to_string()
    } else {
        format!("{ERROR_PREFIX}: {message}")
    }
}

/// Immutable snapshot of everything one assembly needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssemblyRequest {
    pub source: String,
    /// Every open document, registered as an include under its name
    pub documents: Vec<Document>,
    /// Trusted HEX to verify the result against
    pub reference_hex: Option<String>,
}

impl AssemblyRequest {
    /// Snapshot the current document as the primary source, plus all documents.
    #[must_use]
    pub fn from_session(documents: &DocumentSet, reference_hex: Option<String>) -> Self {
        Self {
            source: documents.current().content.clone(),
            documents: documents.iter().cloned().collect(),
            reference_hex,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Canonical re-encoding of the assembler output
    pub canonical_hex: String,
    /// Listing text as returned by the assembler
    pub listing: String,
    /// Segmented lines of `canonical_hex` for the HEX view
    pub annotated: Vec<AnnotatedLine>,
    /// Number of bytes in the image
    pub image_len: usize,
    /// Whether the image matches the reference HEX, when one was supplied
    pub reference_match: Option<bool>,
}

/// Run one assembly and canonicalize its output.
///
/// # Errors
/// - [`StudioError::EmptySource`] if the source is blank.
/// - [`StudioError::IoFailure`] if the base definitions cannot be read.
/// - [`StudioError::AssemblyFailure`] with the assembler's message, verbatim.
#[tracing::instrument(skip_all, fields(documents = request.documents.len()))]
pub fn assemble_request<A: Assembler + ?Sized>(
    assembler: &mut A,
    request: &AssemblyRequest,
    config: &StudioConfig,
) -> Result<AssemblyReport, StudioError> {
    if request.source.trim().is_empty() {
        return Err(StudioError::EmptySource);
    }

    // Base definitions first, unless the user has their own copy open
    let has_definitions = request
        .documents
        .iter()
        .any(|doc| doc.name == config.definitions_name);
    if !has_definitions && let Some(path) = &config.definitions_path {
        let definitions = fs::read_to_string(path).map_err(|e| {
            StudioError::io(format!("Reading {}", path.display()), &e)
        })?;
        tracing::debug!(path = %path.display(), "registering base definitions");
        assembler.register_include(&config.definitions_name, &definitions);
    }

    for doc in &request.documents {
        assembler.register_include(&doc.name, &doc.content);
    }

    let raw_hex = assembler.assemble(&request.source);
    if raw_hex.trim_start().starts_with(ERROR_PREFIX) {
        tracing::info!("assembler reported failure");
        return Err(StudioError::AssemblyFailure(raw_hex));
    }

    let image = decode(&raw_hex);
    let canonical_hex = encode(&image, config.record_size);
    let reference_match = request
        .reference_hex
        .as_deref()
        .map(|reference| equal(&canonical_hex, reference));
    tracing::info!(bytes = image.len(), ?reference_match, "assembly succeeded");

    Ok(AssemblyReport {
        annotated: annotate_listing(&canonical_hex),
        listing: assembler.listing(),
        image_len: image.len(),
        canonical_hex,
        reference_match,
    })
}
