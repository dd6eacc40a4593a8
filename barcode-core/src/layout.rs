//! Page geometry. All lengths are millimetres.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetError};

// Guards floor() against results like 7.999999999 for exact fits.
const ROW_EPSILON: f64 = 1e-9;

/// Upper bound for [`compute_max_rows`], whatever the page and footprint.
pub const MAX_DERIVED_ROWS: u32 = u16::MAX as u32;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub width: f64,
    pub height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
}

impl Default for PageConfig {
    fn default() -> Self {
        PageConfig::a4()
    }
}

impl PageConfig {
    /// A4 portrait with 5 mm margins all round.
    pub fn a4() -> Self {
        PageConfig::with_uniform_margin(210.0, 297.0, 5.0)
    }

    /// US Letter portrait with 5 mm margins all round.
    pub fn letter() -> Self {
        PageConfig::with_uniform_margin(215.9, 279.4, 5.0)
    }

    pub fn with_uniform_margin(width: f64, height: f64, margin: f64) -> Self {
        PageConfig {
            width,
            height,
            margin_top: margin,
            margin_bottom: margin,
            margin_left: margin,
            margin_right: margin,
        }
    }

    pub fn available_width(&self) -> f64 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn available_height(&self) -> f64 {
        self.height - self.margin_top - self.margin_bottom
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(SheetError::configuration(format!(
                "page size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        let margins = [
            ("top", self.margin_top, self.height),
            ("bottom", self.margin_bottom, self.height),
            ("left", self.margin_left, self.width),
            ("right", self.margin_right, self.width),
        ];
        for (side, margin, extent) in margins {
            if !(margin > 0.0 && margin < extent / 2.0) {
                return Err(SheetError::configuration(format!(
                    "{side} margin must be positive and less than half the page, got {margin}"
                )));
            }
        }
        Ok(())
    }
}

/// Designed size of one symbol before it is fitted into a cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolFootprint {
    pub width: f64,
    pub height: f64,
    /// Smallest row height that still scans reliably.
    pub min_height: f64,
}

impl Default for SymbolFootprint {
    fn default() -> Self {
        SymbolFootprint {
            width: 40.0,
            height: 20.0,
            min_height: 12.0,
        }
    }
}

impl SymbolFootprint {
    pub fn validate(&self) -> Result<()> {
        if self.width > 0.0 && self.height > 0.0 && self.min_height > 0.0 {
            Ok(())
        } else {
            Err(SheetError::configuration(format!(
                "symbol footprint must be positive, got {}x{} (min height {})",
                self.width, self.height, self.min_height
            )))
        }
    }

    fn aspect_ratio(&self) -> f64 {
        self.height / self.width
    }
}

/// How many rows of `columns` symbols fit on one page.
///
/// The row height follows the real column width rather than the requested
/// footprint, so symbols keep their designed proportions as columns are
/// added; `min_height` keeps them scannable. Never returns less than 1.
pub fn compute_max_rows(columns: u32, page: &PageConfig, footprint: &SymbolFootprint) -> u32 {
    let columns = columns.max(1) as f64;
    let column_width = page.available_width() / columns;
    let row_height = footprint
        .min_height
        .max(column_width * footprint.aspect_ratio());
    let rows = (page.available_height() / row_height + ROW_EPSILON).floor();
    if rows.is_finite() && rows >= 1.0 {
        rows.min(MAX_DERIVED_ROWS as f64) as u32
    } else {
        1
    }
}

/// Grid chosen for one run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutPlan {
    pub columns: u32,
    pub rows: u32,
    pub items_per_page: u32,
    pub cell_width: f64,
    pub cell_height: f64,
    pub page: PageConfig,
}

impl LayoutPlan {
    /// Builds a plan with rows derived from the footprint.
    pub fn plan(columns: u32, page: &PageConfig, footprint: &SymbolFootprint) -> Result<Self> {
        let rows = compute_max_rows(columns, page, footprint);
        LayoutPlan::with_rows(columns, rows, page)
    }

    /// Builds a plan with a caller-chosen row count. Both counts are raised
    /// to at least 1; a grid whose item count does not fit in a `u32` is a
    /// configuration error.
    pub fn with_rows(columns: u32, rows: u32, page: &PageConfig) -> Result<Self> {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let items_per_page = columns.checked_mul(rows).ok_or_else(|| {
            SheetError::configuration(format!("grid of {columns}x{rows} cells is too large"))
        })?;
        Ok(LayoutPlan {
            columns,
            rows,
            items_per_page,
            cell_width: page.available_width() / columns as f64,
            cell_height: page.available_height() / rows as f64,
            page: *page,
        })
    }

    /// Pages needed for `count` items.
    pub fn page_count(&self, count: usize) -> usize {
        count.div_ceil(self.items_per_page as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_a4_three_columns_fits_eight_rows() {
        let page = PageConfig::a4();
        let footprint = SymbolFootprint {
            width: 40.0,
            height: 20.0,
            min_height: 12.0,
        };
        assert_eq!(compute_max_rows(3, &page, &footprint), 8);
    }

    #[test]
    fn test_min_height_floor_applies_with_many_columns() {
        let page = PageConfig::a4();
        let footprint = SymbolFootprint::default();
        // 200 / 10 = 20 mm columns -> 10 mm rows, raised to the 12 mm floor.
        assert_eq!(compute_max_rows(10, &page, &footprint), 23);
    }

    #[test]
    fn test_rows_clamped_to_at_least_one() {
        let page = PageConfig::a4();
        let footprint = SymbolFootprint {
            width: 10.0,
            height: 500.0,
            min_height: 12.0,
        };
        assert_eq!(compute_max_rows(1, &page, &footprint), 1);
    }

    #[test]
    fn test_exact_fit_is_not_lost_to_rounding() {
        let page = PageConfig::with_uniform_margin(100.0, 100.0, 5.0);
        let footprint = SymbolFootprint {
            width: 30.0,
            height: 10.0,
            min_height: 1.0,
        };
        // 90 / 3 = 30 mm columns -> 10 mm rows -> exactly 9 rows.
        assert_eq!(compute_max_rows(3, &page, &footprint), 9);
    }

    #[test]
    fn test_plan_cells_divide_the_printable_area() {
        let plan = LayoutPlan::plan(3, &PageConfig::a4(), &SymbolFootprint::default()).unwrap();
        assert_eq!(plan.rows, 8);
        assert_eq!(plan.items_per_page, 24);
        assert!(approx(plan.cell_width, 200.0 / 3.0));
        assert!(approx(plan.cell_height, 287.0 / 8.0));
    }

    #[test]
    fn test_fixed_rows_are_used_verbatim() {
        let plan = LayoutPlan::with_rows(2, 5, &PageConfig::a4()).unwrap();
        assert_eq!(plan.items_per_page, 10);
        assert!(approx(plan.cell_height, 287.0 / 5.0));
        assert_eq!(plan.page_count(21), 3);
        assert_eq!(plan.page_count(20), 2);
    }

    #[test]
    fn test_oversized_fixed_grid_is_rejected() {
        let err = LayoutPlan::with_rows(70_000, 70_000, &PageConfig::a4()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationError);
        let err = LayoutPlan::with_rows(u32::MAX, 2, &PageConfig::a4()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_derived_rows_stay_bounded() {
        let footprint = SymbolFootprint {
            width: 40.0,
            height: 20.0,
            min_height: 1e-12,
        };
        assert_eq!(
            compute_max_rows(u32::MAX, &PageConfig::a4(), &footprint),
            MAX_DERIVED_ROWS
        );
        // Huge column counts no longer overflow the cell count.
        let err = LayoutPlan::plan(u32::MAX, &PageConfig::a4(), &SymbolFootprint::default())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_page_validation() {
        assert!(PageConfig::a4().validate().is_ok());
        assert!(PageConfig::letter().validate().is_ok());
        let mut page = PageConfig::a4();
        page.margin_left = 105.0;
        assert!(page.validate().is_err());
        page = PageConfig::a4();
        page.height = 0.0;
        assert!(page.validate().is_err());
        page = PageConfig::a4();
        page.margin_bottom = 0.0;
        assert!(page.validate().is_err());
    }

    #[test]
    fn test_footprint_validation() {
        assert!(SymbolFootprint::default().validate().is_ok());
        let footprint = SymbolFootprint {
            min_height: -1.0,
            ..SymbolFootprint::default()
        };
        assert!(footprint.validate().is_err());
    }
}
