//! Export pipeline: routing, frame extraction, TIFF writing, sidecar.
//!
//! The [`Serializer`] is the single entry point; [`export`] drives it
//! over a whole document sequence with guaranteed cleanup. The other
//! submodules are its collaborators: [`frames`] turns event field
//! values into 2D frames, [`writer`] appends frames to TIFF artifacts,
//! and [`sidecar`] accumulates the run metadata written at stop.

pub mod frames;
pub mod serializer;
pub mod sidecar;
pub mod writer;

pub use frames::{decode_array, split_frames, OutputDType};
pub use serializer::{export, LayoutMode, Serializer, SerializerOptions};
pub use sidecar::{RunSidecar, StreamRecord};
pub use writer::{FrameCompression, FrameWriter, TiffOptions};
