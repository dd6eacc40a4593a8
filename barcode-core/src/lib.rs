//! Code generation and page layout for printable barcode sheets.
//!
//! Everything here is pure: symbol rendering and document drawing are
//! supplied by the caller through [`SymbolRenderer`] and [`DrawingSurface`].

pub mod codes;
pub mod compose;
pub mod error;
pub mod fit;
pub mod layout;
pub mod progress;

pub use codes::{MAX_COUNT, Mode, generate, generate_with};
pub use compose::{
    ComposeOptions, DrawingSurface, GridStyle, PlacedItem, Rect, SheetComposer, Slot, SymbolImage,
    SymbolRenderer, locate, starts_new_page,
};
pub use error::{ErrorKind, Result, SheetError};
pub use fit::{Fit, fit};
pub use layout::{LayoutPlan, PageConfig, SymbolFootprint, compute_max_rows};
pub use progress::{CancelToken, NoProgress, ProgressReporter, percent};
