//! Frame extraction from event field values.
//!
//! Image payloads arrive as nested JSON arrays. They are decoded into
//! dynamic-dimensional `f64` arrays, then split into the 2D frames that
//! become TIFF pages: a 2D array is one frame (treated as a length-1
//! stack), a 3D array contributes one frame per leading index. Dtype
//! coercion to the configured output type happens at write time, in the
//! frame writer.

use ndarray::{ArrayD, Axis, Ix2, IxDyn};
use serde_json::Value;

use crate::error::DocumentError;

// =============================================================================
// Output Dtype
// =============================================================================

/// Numeric type of the TIFF samples written out.
///
/// The default is 16-bit unsigned since many image viewers cannot open
/// higher bit depths. Integer coercion is saturating: values below zero
/// clamp to 0 and values above the type maximum clamp to the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputDType {
    /// 8-bit unsigned integer
    U8,

    /// 16-bit unsigned integer
    #[default]
    U16,

    /// 32-bit unsigned integer
    U32,

    /// 32-bit float
    F32,

    /// 64-bit float
    F64,
}

impl OutputDType {
    /// The dtype name as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputDType::U8 => "u8",
            OutputDType::U16 => "u16",
            OutputDType::U32 => "u32",
            OutputDType::F32 => "f32",
            OutputDType::F64 => "f64",
        }
    }
}

impl std::fmt::Display for OutputDType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// JSON Array Decoding
// =============================================================================

/// Decode a nested JSON array into an n-dimensional `f64` array.
///
/// The nesting must be rectangular (every level has a consistent length)
/// and every leaf must be a number.
///
/// # Errors
///
/// Returns [`DocumentError::BadFieldData`] for ragged nesting, mixed
/// scalar/array levels, or non-numeric elements.
pub fn decode_array(field: &str, value: &Value) -> Result<ArrayD<f64>, DocumentError> {
    let bad = |message: String| DocumentError::BadFieldData {
        field: field.to_string(),
        message,
    };

    let mut shape: Vec<usize> = Vec::new();
    let mut flat: Vec<f64> = Vec::new();
    let mut finalized = false;
    walk(value, 0, &mut shape, &mut flat, &mut finalized).map_err(bad)?;

    ArrayD::from_shape_vec(IxDyn(&shape), flat)
        .map_err(|e| DocumentError::BadFieldData {
            field: field.to_string(),
            message: e.to_string(),
        })
}

fn walk(
    value: &Value,
    depth: usize,
    shape: &mut Vec<usize>,
    flat: &mut Vec<f64>,
    finalized: &mut bool,
) -> Result<(), String> {
    match value {
        Value::Array(items) => {
            if !*finalized && depth == shape.len() {
                shape.push(items.len());
            } else if depth >= shape.len() {
                return Err(format!(
                    "mixed nesting: array found at depth {depth} where a number was expected"
                ));
            } else if shape[depth] != items.len() {
                return Err(format!(
                    "ragged array: expected {} elements at depth {depth}, found {}",
                    shape[depth],
                    items.len()
                ));
            }
            for item in items {
                walk(item, depth + 1, shape, flat, finalized)?;
            }
            Ok(())
        }
        Value::Number(number) => {
            if depth != shape.len() {
                return Err(format!(
                    "mixed nesting: number found at depth {depth}, expected {}",
                    shape.len()
                ));
            }
            *finalized = true;
            let value = number
                .as_f64()
                .ok_or_else(|| format!("number {number} is not representable as f64"))?;
            flat.push(value);
            Ok(())
        }
        other => Err(format!("non-numeric element: {other}")),
    }
}

// =============================================================================
// Frame Splitting
// =============================================================================

/// Split a decoded array into 2D frames.
///
/// A 2D array yields a single frame; a 3D array yields one frame per
/// leading index. Any other dimensionality is not image data and yields
/// `None`; the caller decides whether that is a skip or a warning.
pub fn split_frames(array: ArrayD<f64>) -> Option<Vec<ndarray::Array2<f64>>> {
    match array.ndim() {
        2 => array.into_dimensionality::<Ix2>().ok().map(|a| vec![a]),
        3 => {
            let mut frames = Vec::with_capacity(array.len_of(Axis(0)));
            for view in array.axis_iter(Axis(0)) {
                frames.push(view.to_owned().into_dimensionality::<Ix2>().ok()?);
            }
            Some(frames)
        }
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
