/// Size and offset of an image placed inside a cell, relative to the cell's
/// bottom-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fit {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Scales an image uniformly into a cell, leaving `inset` clear on every
/// side, and centres it in the full cell.
///
/// The inset is capped at a quarter of the shorter cell side so the inset
/// region never collapses.
pub fn fit(image_width: f64, image_height: f64, cell_width: f64, cell_height: f64, inset: f64) -> Fit {
    let inset = inset.max(0.0).min(cell_width.min(cell_height) / 4.0);
    let scale = ((cell_width - 2.0 * inset) / image_width)
        .min((cell_height - 2.0 * inset) / image_height);
    let width = image_width * scale;
    let height = image_height * scale;
    Fit {
        width,
        height,
        offset_x: (cell_width - width) / 2.0,
        offset_y: (cell_height - height) / 2.0,
    }
}
