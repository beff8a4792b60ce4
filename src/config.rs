//! Configuration for the run-exporter CLI.
//!
//! All options can also be set via environment variables with the
//! `RUN_EXPORTER_` prefix:
//!
//! - `RUN_EXPORTER_INPUT` - Input document stream file (required)
//! - `RUN_EXPORTER_OUTPUT` - Output directory (default: current directory)
//! - `RUN_EXPORTER_FILE_PREFIX` - File-name prefix template
//! - `RUN_EXPORTER_LAYOUT` - stacked | series (default: stacked)
//! - `RUN_EXPORTER_DTYPE` - u8 | u16 | u32 | f32 | f64 (default: u16)
//! - `RUN_EXPORTER_BIGTIFF` - Write BigTIFF containers (default: false)
//! - `RUN_EXPORTER_COMPRESSION` - none | lzw | deflate | packbits

use std::path::PathBuf;

use clap::Parser;

use crate::export::{FrameCompression, LayoutMode, OutputDType, SerializerOptions, TiffOptions};
use crate::naming::{FileNameTemplate, DEFAULT_FILE_PREFIX};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Run Exporter - write experiment document streams to TIFF files.
///
/// Reads an ordered document stream (one JSON `["<kind>", {...}]` pair
/// per line) and exports every 2D/3D image field to TIFF, plus a JSON
/// metadata sidecar for the run.
#[derive(Parser, Debug, Clone)]
#[command(name = "run-exporter")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Input document stream: one JSON `["<kind>", {...}]` pair per line.
    #[arg(long, env = "RUN_EXPORTER_INPUT")]
    pub input: PathBuf,

    /// Directory to place the TIFF artifacts and metadata sidecar in.
    #[arg(long, default_value = ".", env = "RUN_EXPORTER_OUTPUT")]
    pub output: PathBuf,

    /// File-name prefix template.
    ///
    /// May embed `{start[KEY]}`, `{descriptor[KEY]}`, `{event[KEY]}`,
    /// `{stream_name}` and `{field}` placeholders, resolved against the
    /// documents of the run. The default is the run uid, which is
    /// guaranteed present and unique.
    #[arg(long, default_value = DEFAULT_FILE_PREFIX, env = "RUN_EXPORTER_FILE_PREFIX")]
    pub file_prefix: String,

    /// Output layout: one stacked TIFF per (stream, field), or one file
    /// per frame.
    #[arg(long, value_enum, default_value_t = LayoutMode::Stacked, env = "RUN_EXPORTER_LAYOUT")]
    pub layout: LayoutMode,

    /// Numeric type of the TIFF samples.
    #[arg(long, value_enum, default_value_t = OutputDType::U16, env = "RUN_EXPORTER_DTYPE")]
    pub dtype: OutputDType,

    /// Write BigTIFF (64-bit offsets) containers.
    #[arg(long, default_value_t = false, env = "RUN_EXPORTER_BIGTIFF")]
    pub bigtiff: bool,

    /// Compression applied to every frame.
    #[arg(long, value_enum, default_value_t = FrameCompression::None, env = "RUN_EXPORTER_COMPRESSION")]
    pub compression: FrameCompression,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.input.as_os_str().is_empty() {
            return Err("input path is required. Set --input or RUN_EXPORTER_INPUT".to_string());
        }

        // Surface template syntax errors before any file is touched.
        FileNameTemplate::parse(&self.file_prefix).map_err(|e| e.to_string())?;

        Ok(())
    }

    /// Serializer options derived from this configuration.
    pub fn serializer_options(&self) -> SerializerOptions {
        SerializerOptions {
            file_prefix: self.file_prefix.clone(),
            dtype: self.dtype,
            tiff: TiffOptions {
                bigtiff: self.bigtiff,
                compression: self.compression,
            },
            layout: self.layout,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
