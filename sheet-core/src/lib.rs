//! Rendering side of barcode sheets: bar patterns, rasterization, PDF output
//! and the run that ties them to `barcode_core`.

pub mod job;
pub mod pdf;
pub mod raster;
pub mod run;
pub mod svg;
pub mod symbology;
pub mod task;

pub use job::SheetJob;
pub use pdf::PdfSurface;
pub use raster::{RasterImage, SymbolRasterizer};
pub use run::SheetRun;
pub use svg::{SymbolStyle, build_symbol_svg};
pub use symbology::{Encoded, Symbology};
pub use task::{RunEvent, RunHandle, spawn_run};
