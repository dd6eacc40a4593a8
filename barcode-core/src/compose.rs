//! Sheet composition: walks the code list, places each code on the grid and
//! drives the rendering and drawing collaborators.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codes::MAX_COUNT;
use crate::error::{Result, SheetError};
use crate::fit::fit;
use crate::layout::LayoutPlan;
use crate::progress::{CancelToken, ProgressReporter, percent};

/// Rectangle in page coordinates (millimetres, origin bottom-left).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn contains(&self, other: &Rect) -> bool {
        const EPS: f64 = 1e-9;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.x + other.width <= self.x + self.width + EPS
            && other.y + other.height <= self.y + self.height + EPS
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridStyle {
    Solid,
    #[default]
    Dashed,
}

/// A rendered symbol with known pixel dimensions.
pub trait SymbolImage {
    fn pixel_size(&self) -> (u32, u32);
}

/// Turns a code into an image. `index` is the code's position in the run and
/// is the key for any artifact the renderer stores.
pub trait SymbolRenderer {
    type Image: SymbolImage;

    fn render(&mut self, index: usize, code: &str) -> Result<Self::Image>;
}

/// Document being drawn. The first page is open before any call.
pub trait DrawingSurface {
    type Image;

    fn new_page(&mut self) -> Result<()>;
    fn draw_rect(&mut self, rect: Rect, style: GridStyle) -> Result<()>;
    fn draw_image(&mut self, image: &Self::Image, rect: Rect) -> Result<()>;
    fn save(&mut self, path: &Path) -> Result<()>;
}

/// Grid position of an item, derived from its index alone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slot {
    pub page_index: usize,
    pub row: u32,
    pub col: u32,
    /// Bottom-left corner of the cell.
    pub origin_x: f64,
    pub origin_y: f64,
}

pub fn locate(plan: &LayoutPlan, index: usize) -> Slot {
    let per_page = plan.items_per_page as usize;
    let in_page = index % per_page;
    let row = (in_page / plan.columns as usize) as u32;
    let col = (in_page % plan.columns as usize) as u32;
    Slot {
        page_index: index / per_page,
        row,
        col,
        origin_x: plan.page.margin_left + col as f64 * plan.cell_width,
        origin_y: plan.page.height - plan.page.margin_top - (row as f64 + 1.0) * plan.cell_height,
    }
}

/// True for the first item of every page after the first.
pub fn starts_new_page(plan: &LayoutPlan, index: usize) -> bool {
    index > 0 && index % plan.items_per_page as usize == 0
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacedItem {
    pub index: usize,
    pub code: String,
    pub page_index: usize,
    pub row: u32,
    pub col: u32,
    pub origin_x: f64,
    pub origin_y: f64,
    pub rendered_width: f64,
    pub rendered_height: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComposeOptions {
    pub draw_grid: bool,
    pub grid_style: GridStyle,
    /// Clear space between the cell edge and the symbol, in millimetres.
    pub inset: f64,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        ComposeOptions {
            draw_grid: true,
            grid_style: GridStyle::default(),
            inset: 3.0,
        }
    }
}

pub struct SheetComposer {
    plan: LayoutPlan,
    options: ComposeOptions,
    cancel: Option<CancelToken>,
}

impl SheetComposer {
    pub fn new(plan: LayoutPlan, options: ComposeOptions) -> Self {
        SheetComposer {
            plan,
            options,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn plan(&self) -> &LayoutPlan {
        &self.plan
    }

    /// Places every code in order. The first failure ends the run; nothing is
    /// skipped and the caller owns cleanup.
    pub fn compose<R, S, P>(
        &self,
        codes: &[String],
        renderer: &mut R,
        surface: &mut S,
        progress: &mut P,
    ) -> Result<Vec<PlacedItem>>
    where
        R: SymbolRenderer,
        S: DrawingSurface<Image = R::Image>,
        P: ProgressReporter + ?Sized,
    {
        let plan = &self.plan;
        let mut placed = Vec::with_capacity(codes.len().min(MAX_COUNT));
        for (index, code) in codes.iter().enumerate() {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                return Err(SheetError::Cancelled);
            }
            if starts_new_page(plan, index) {
                surface.new_page()?;
            }
            let slot = locate(plan, index);
            let image = renderer.render(index, code)?;
            let (px_w, px_h) = image.pixel_size();
            if px_w == 0 || px_h == 0 {
                return Err(SheetError::rendering(format!(
                    "symbol for {code:?} rendered to an empty image"
                )));
            }

            let cell = Rect {
                x: slot.origin_x,
                y: slot.origin_y,
                width: plan.cell_width,
                height: plan.cell_height,
            };
            if self.options.draw_grid {
                surface.draw_rect(cell, self.options.grid_style)?;
            }
            let f = fit(
                px_w as f64,
                px_h as f64,
                plan.cell_width,
                plan.cell_height,
                self.options.inset,
            );
            let target = Rect {
                x: cell.x + f.offset_x,
                y: cell.y + f.offset_y,
                width: f.width,
                height: f.height,
            };
            surface.draw_image(&image, target)?;
            progress.report(percent(index + 1, codes.len()));

            placed.push(PlacedItem {
                index,
                code: code.clone(),
                page_index: slot.page_index,
                row: slot.row,
                col: slot.col,
                origin_x: slot.origin_x,
                origin_y: slot.origin_y,
                rendered_width: f.width,
                rendered_height: f.height,
            });
        }
        Ok(placed)
    }
}
