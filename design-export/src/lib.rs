//! # Design Export
//!
//! Turns a design snapshot into a print-ready PDF sized in physical units.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────┐   ┌─────────────────┐
//! │ Snapshot │──▶│ PhysicalSpec │──▶│ Rasterizer │──▶│ PDF: design +   │
//! │          │   │ page size    │   │ (resvg)    │   │ specification   │
//! └──────────┘   └──────────────┘   └────────────┘   └─────────────────┘
//! ```
//!
//! The raster is stretched to fill the whole design page with no margin.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod decode;
pub mod error;
pub mod export;
pub mod physical;
pub mod raster;

pub use decode::{detect_format, DecodeError, ImageFormat, RasterDecoder};
pub use error::{ExportError, ExportResult};
pub use export::{ExportConfig, PrintArtifact, PrintExporter, PrintMetadata};
pub use physical::{PageSize, PhysicalSpec, Unit};
pub use raster::{RasterImage, Rasterizer, SvgRasterizer};
