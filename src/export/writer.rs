//! TIFF frame writer bound to a single artifact sink.

use std::io::{Seek, Write};

use ndarray::ArrayView2;
use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::compression::{Deflate, Lzw, Packbits, Uncompressed};
use tiff::encoder::{TiffEncoder, TiffKind, TiffKindBig, TiffKindStandard, TiffValue};
use tiff::TiffResult;

use crate::error::ExportError;
use crate::export::OutputDType;
use crate::storage::ArtifactSink;

// =============================================================================
// Container Options
// =============================================================================

/// Per-frame compression scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FrameCompression {
    /// No compression
    #[default]
    None,

    /// Lempel-Ziv-Welch
    Lzw,

    /// Deflate (zlib)
    Deflate,

    /// PackBits run-length encoding
    Packbits,
}

impl std::fmt::Display for FrameCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FrameCompression::None => "none",
            FrameCompression::Lzw => "lzw",
            FrameCompression::Deflate => "deflate",
            FrameCompression::Packbits => "packbits",
        };
        f.write_str(name)
    }
}

/// TIFF container options, fixed per serializer instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffOptions {
    /// Write BigTIFF (64-bit offsets) instead of classic TIFF
    pub bigtiff: bool,

    /// Compression applied to every frame
    pub compression: FrameCompression,
}

// =============================================================================
// FrameWriter
// =============================================================================

/// One TIFF encoder bound to exactly one artifact.
///
/// Frames are appended as successive TIFF pages (grayscale, one sample
/// per pixel). The writer owns its sink; dropping it closes the
/// underlying file.
pub struct FrameWriter {
    name: String,
    frames: u64,
    compression: FrameCompression,
    encoder: EncoderKind,
}

/// Classic and BigTIFF encoders are distinct types; an enum keeps the
/// pool homogeneous without boxing the encoder.
enum EncoderKind {
    Standard(TiffEncoder<Box<dyn ArtifactSink>, TiffKindStandard>),
    Big(TiffEncoder<Box<dyn ArtifactSink>, TiffKindBig>),
}

impl FrameWriter {
    /// Create a writer over a fresh sink, writing the TIFF header.
    pub fn create(
        sink: Box<dyn ArtifactSink>,
        options: &TiffOptions,
        name: String,
    ) -> Result<Self, ExportError> {
        let encoder = if options.bigtiff {
            EncoderKind::Big(TiffEncoder::new_big(sink)?)
        } else {
            EncoderKind::Standard(TiffEncoder::new(sink)?)
        };

        Ok(Self {
            name,
            frames: 0,
            compression: options.compression,
            encoder,
        })
    }

    /// The artifact name this writer is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of frames appended so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Coerce a frame to `dtype` and append it as one TIFF page.
    ///
    /// The frame's first axis is the image height. Integer coercion
    /// saturates at the type bounds.
    pub fn append(&mut self, frame: ArrayView2<'_, f64>, dtype: OutputDType) -> Result<(), ExportError> {
        let (height, width) = frame.dim();
        let width = width as u32;
        let height = height as u32;

        match dtype {
            OutputDType::U8 => {
                let data: Vec<u8> = frame.iter().map(|&v| v as u8).collect();
                self.write_page::<colortype::Gray8>(width, height, &data)?;
            }
            OutputDType::U16 => {
                let data: Vec<u16> = frame.iter().map(|&v| v as u16).collect();
                self.write_page::<colortype::Gray16>(width, height, &data)?;
            }
            OutputDType::U32 => {
                let data: Vec<u32> = frame.iter().map(|&v| v as u32).collect();
                self.write_page::<colortype::Gray32>(width, height, &data)?;
            }
            OutputDType::F32 => {
                let data: Vec<f32> = frame.iter().map(|&v| v as f32).collect();
                self.write_page::<colortype::Gray32Float>(width, height, &data)?;
            }
            OutputDType::F64 => {
                let data: Vec<f64> = frame.iter().copied().collect();
                self.write_page::<colortype::Gray64Float>(width, height, &data)?;
            }
        }

        self.frames += 1;
        Ok(())
    }

    fn write_page<C>(&mut self, width: u32, height: u32, data: &[C::Inner]) -> TiffResult<()>
    where
        C: ColorType,
        [C::Inner]: TiffValue,
    {
        match &mut self.encoder {
            EncoderKind::Standard(encoder) => {
                write_compressed::<_, C, _>(encoder, width, height, data, self.compression)
            }
            EncoderKind::Big(encoder) => {
                write_compressed::<_, C, _>(encoder, width, height, data, self.compression)
            }
        }
    }
}

fn write_compressed<W, C, K>(
    encoder: &mut TiffEncoder<W, K>,
    width: u32,
    height: u32,
    data: &[C::Inner],
    compression: FrameCompression,
) -> TiffResult<()>
where
    W: Write + Seek,
    C: ColorType,
    [C::Inner]: TiffValue,
    K: TiffKind,
{
    match compression {
        FrameCompression::None => {
            encoder.write_image_with_compression::<C, _>(width, height, Uncompressed, data)
        }
        FrameCompression::Lzw => {
            encoder.write_image_with_compression::<C, _>(width, height, Lzw, data)
        }
        FrameCompression::Deflate => {
            encoder.write_image_with_compression::<C, _>(width, height, Deflate::default(), data)
        }
        FrameCompression::Packbits => {
            encoder.write_image_with_compression::<C, _>(width, height, Packbits, data)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
