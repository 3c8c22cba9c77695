//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::CloneArgs;
use facsimile::{AppConfig, document};
use facsimile_core::{
    CloneOptions, CloneOutcome, Cloner, FacsimileError, Value, audit::Alias, deep_equal,
    deep_equal_with_shape, find_aliases,
};
use std::path::{Path, PathBuf};

/// How results are reported.
#[derive(Debug, Clone, Copy)]
pub struct OutputMode {
    pub json: bool,
    pub quiet: bool,
}

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of an input document (100 MB).
///
/// This prevents memory exhaustion from accidental large files.
const MAX_DOCUMENT_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), FacsimileError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| FacsimileError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(FacsimileError::InvalidDocument(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, FacsimileError> {
    let canonical = path.canonicalize().map_err(|e| {
        FacsimileError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(FacsimileError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, FacsimileError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        FacsimileError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(FacsimileError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| FacsimileError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SHARED STEPS
// =============================================================================

/// Load the config file and overlay command-line flags.
fn effective_config(config: Option<&Path>, args: &CloneArgs) -> Result<AppConfig, FacsimileError> {
    let mut config = AppConfig::load_or_default(config)?;
    args.apply(&mut config.cloning)?;
    config.validate()?;
    Ok(config)
}

fn read_document(input: &Path) -> Result<Value, FacsimileError> {
    let path = validate_file_path(input)?;
    validate_file_size(&path, MAX_DOCUMENT_SIZE)?;
    let text = std::fs::read_to_string(&path)
        .map_err(|e| FacsimileError::Io(format!("Cannot read '{}': {}", path.display(), e)))?;
    let value = document::from_str(&text)?;
    tracing::debug!(path = %path.display(), kind = %value.kind(), "document loaded");
    Ok(value)
}

fn clone_document(
    options: &CloneOptions,
    input: &Path,
) -> Result<(Value, CloneOutcome), FacsimileError> {
    let value = read_document(input)?;
    let outcome = Cloner::new(options.clone()).run(&value)?;
    tracing::info!(
        copied = outcome.stats.copied,
        cycles = outcome.stats.cycles_resolved,
        truncated = outcome.stats.truncated,
        "document cloned"
    );
    Ok((value, outcome))
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// CLONE COMMAND
// =============================================================================

/// Clone a document and write the copy.
pub fn cmd_clone(
    config: Option<&Path>,
    mode: OutputMode,
    input: &Path,
    output: Option<&Path>,
    args: &CloneArgs,
) -> Result<(), FacsimileError> {
    let config = effective_config(config, args)?;
    let options = config.cloning.to_options()?;
    let (_, outcome) = clone_document(&options, input)?;
    let rendered = document::to_string(&outcome.value, config.output.pretty)?;

    let Some(output) = output else {
        // The document is the output; the summary only goes to the log.
        println!("{}", rendered);
        return Ok(());
    };

    let path = validate_output_path(output)?;
    std::fs::write(&path, rendered.as_bytes()).map_err(|e| {
        FacsimileError::Io(format!("Cannot write '{}': {}", path.display(), e))
    })?;

    if mode.quiet {
        return Ok(());
    }
    let stats = outcome.stats;
    if mode.json {
        print_json(&serde_json::json!({
            "output": path.to_string_lossy(),
            "stats": stats,
        }));
        return Ok(());
    }

    println!("Clone complete");
    println!("==============");
    println!("Output:            {}", path.display());
    println!("Nodes copied:      {}", stats.copied);
    println!("Cycles resolved:   {}", stats.cycles_resolved);
    println!("Truncated:         {}", stats.truncated);
    println!("Byte buffers:      {}", stats.buffers);
    println!("Deferred results:  {}", stats.deferred);
    Ok(())
}

// =============================================================================
// VERIFY COMMAND
// =============================================================================

/// Clone a document and audit the copy.
pub fn cmd_verify(
    config: Option<&Path>,
    mode: OutputMode,
    input: &Path,
    require_independent: bool,
    args: &CloneArgs,
) -> Result<(), FacsimileError> {
    let config = effective_config(config, args)?;
    let options = config.cloning.to_options()?;
    let (original, outcome) = clone_document(&options, input)?;

    // Record copies carry the override shape, never the input's.
    let equal = match &options.shape_override {
        Some(shape) => deep_equal_with_shape(&original, &outcome.value, shape),
        None => deep_equal(&original, &outcome.value),
    };
    let aliases = find_aliases(&original, &outcome.value);

    if !mode.quiet {
        if mode.json {
            print_json(&serde_json::json!({
                "equal": equal,
                "independent": aliases.is_empty(),
                "aliases": aliases,
                "stats": outcome.stats,
            }));
        } else {
            print_report(equal, &aliases);
        }
    }

    if !equal {
        return Err(FacsimileError::Verification(
            "copy differs from the input".to_string(),
        ));
    }
    if require_independent && !aliases.is_empty() {
        return Err(FacsimileError::Verification(format!(
            "{} node(s) of the copy are shared with the input",
            aliases.len()
        )));
    }
    Ok(())
}

fn print_report(equal: bool, aliases: &[Alias]) {
    println!("Verification");
    println!("============");
    println!("Structurally equal: {}", if equal { "yes" } else { "NO" });
    if aliases.is_empty() {
        println!("Independent:        yes");
        return;
    }
    println!("Independent:        no ({} shared)", aliases.len());
    for alias in aliases {
        println!("  {} ({})", alias.path, alias.kind);
    }
}

// =============================================================================
// CONFIG COMMAND
// =============================================================================

/// Show the effective configuration.
pub fn cmd_config(
    config: Option<&Path>,
    mode: OutputMode,
    args: &CloneArgs,
) -> Result<(), FacsimileError> {
    let config = effective_config(config, args)?;

    if mode.json {
        print_json(&serde_json::to_value(&config).map_err(|e| {
            FacsimileError::Config(format!("Cannot render config: {}", e))
        })?);
        return Ok(());
    }

    let cloning = &config.cloning;
    println!("Facsimile Configuration");
    println!("=======================");
    println!("Circular:           {}", cloning.circular);
    match cloning.depth {
        Some(depth) => println!("Depth:              {}", depth),
        None => println!("Depth:              unbounded"),
    }
    println!("Include hidden:     {}", cloning.include_hidden);
    println!("On depth exhausted: {:?}", cloning.on_depth_exhausted);
    println!(
        "Shape override:     {}",
        cloning.shape.as_deref().unwrap_or("-")
    );
    println!("Pretty output:      {}", config.output.pretty);
    Ok(())
}
