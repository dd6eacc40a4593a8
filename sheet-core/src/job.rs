use std::ops::RangeInclusive;
use std::path::PathBuf;

use barcode_core::codes::{MAX_COUNT, check_capacity};
use barcode_core::{
    ComposeOptions, GridStyle, LayoutPlan, Mode, PageConfig, Result, SheetError, SymbolFootprint,
};
use serde::{Deserialize, Serialize};

use crate::svg::SymbolStyle;
use crate::symbology::Symbology;

pub const CODE_LENGTH_RANGE: RangeInclusive<usize> = 4..=20;
pub const PX_PER_MODULE_RANGE: RangeInclusive<u32> = 1..=10;
pub const COLUMNS_RANGE: RangeInclusive<u32> = 1..=10;
pub const ROWS_RANGE: RangeInclusive<u32> = 1..=20;

/// Everything one sheet run needs, as read from a job file.
///
/// ```json
/// { "count": 48, "mode": "sequential", "code_length": 12,
///   "start_code": "000000000001", "symbology": "ean13" }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SheetJob {
    pub count: usize,
    pub mode: Mode,
    pub code_length: usize,
    #[serde(default)]
    pub start_code: Option<String>,
    #[serde(default = "default_columns")]
    pub columns: u32,
    /// Fixed row count; derived from the footprint when absent.
    #[serde(default)]
    pub rows: Option<u32>,
    #[serde(default)]
    pub page: PageConfig,
    #[serde(default)]
    pub footprint: SymbolFootprint,
    #[serde(default = "default_true")]
    pub draw_grid: bool,
    #[serde(default)]
    pub grid_style: GridStyle,
    #[serde(default)]
    pub symbology: Symbology,
    /// Clear space inside each cell, mm.
    #[serde(default = "default_inset")]
    pub inset: f64,
    #[serde(default = "default_true")]
    pub human_readable: bool,
    #[serde(default = "default_px_per_module")]
    pub px_per_module: u32,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_columns() -> u32 {
    3
}
fn default_true() -> bool {
    true
}
fn default_inset() -> f64 {
    3.0
}
fn default_px_per_module() -> u32 {
    3
}
fn default_output() -> PathBuf {
    PathBuf::from("barcodes.pdf")
}

impl SheetJob {
    pub fn new(count: usize, mode: Mode, code_length: usize) -> Self {
        SheetJob {
            count,
            mode,
            code_length,
            start_code: None,
            columns: default_columns(),
            rows: None,
            page: PageConfig::default(),
            footprint: SymbolFootprint::default(),
            draw_grid: true,
            grid_style: GridStyle::default(),
            symbology: Symbology::default(),
            inset: default_inset(),
            human_readable: true,
            px_per_module: default_px_per_module(),
            output: default_output(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| SheetError::configuration(format!("invalid job file: {e}")))
    }

    /// Checks every field once, before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.count < 1 {
            return Err(SheetError::configuration("count must be at least 1"));
        }
        if self.count > MAX_COUNT {
            return Err(SheetError::configuration(format!(
                "count must be at most {MAX_COUNT}, got {}",
                self.count
            )));
        }
        if !CODE_LENGTH_RANGE.contains(&self.code_length) {
            return Err(SheetError::configuration(format!(
                "code length must be between {} and {}, got {}",
                CODE_LENGTH_RANGE.start(),
                CODE_LENGTH_RANGE.end(),
                self.code_length
            )));
        }
        match (self.mode, self.start_code.as_deref()) {
            (Mode::Sequential, None) => {
                return Err(SheetError::configuration(
                    "sequential mode requires a start code",
                ));
            }
            (Mode::Sequential, Some(start)) => {
                if start.len() != self.code_length || !start.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(SheetError::configuration(format!(
                        "start code must be exactly {} digits, got {start:?}",
                        self.code_length
                    )));
                }
            }
            _ => check_capacity(self.count, self.mode, self.code_length)?,
        }
        if !COLUMNS_RANGE.contains(&self.columns) {
            return Err(SheetError::configuration(format!(
                "columns must be between {} and {}, got {}",
                COLUMNS_RANGE.start(),
                COLUMNS_RANGE.end(),
                self.columns
            )));
        }
        if let Some(rows) = self.rows {
            if !ROWS_RANGE.contains(&rows) {
                return Err(SheetError::configuration(format!(
                    "rows must be between {} and {}, got {rows}",
                    ROWS_RANGE.start(),
                    ROWS_RANGE.end()
                )));
            }
        }
        self.page.validate()?;
        self.footprint.validate()?;
        if !(self.inset >= 0.0) {
            return Err(SheetError::configuration(format!(
                "inset must not be negative, got {}",
                self.inset
            )));
        }
        if !PX_PER_MODULE_RANGE.contains(&self.px_per_module) {
            return Err(SheetError::configuration(format!(
                "px_per_module must be between {} and {}, got {}",
                PX_PER_MODULE_RANGE.start(),
                PX_PER_MODULE_RANGE.end(),
                self.px_per_module
            )));
        }
        if self.output.as_os_str().is_empty() {
            return Err(SheetError::configuration("output path is empty"));
        }
        Ok(())
    }

    pub fn layout_plan(&self) -> Result<LayoutPlan> {
        match self.rows {
            Some(rows) => LayoutPlan::with_rows(self.columns, rows, &self.page),
            None => LayoutPlan::plan(self.columns, &self.page, &self.footprint),
        }
    }

    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            draw_grid: self.draw_grid,
            grid_style: self.grid_style,
            inset: self.inset,
        }
    }

    pub fn symbol_style(&self) -> SymbolStyle {
        SymbolStyle {
            px_per_module: self.px_per_module,
            aspect: self.footprint.height / self.footprint.width,
            human_readable: self.human_readable,
        }
    }
}
