use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use barcode_core::{Result, SheetError, SymbolImage, SymbolRenderer};
use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use tracing::debug;

use crate::svg::{SymbolStyle, build_symbol_svg};
use crate::symbology::Symbology;

/// A symbol rasterized to a PNG scratch file.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl SymbolImage for RasterImage {
    fn pixel_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Renders codes into `<scratch>/symbol-NNNNNN.png`, named by run index so
/// two codes can never share a file.
pub struct SymbolRasterizer {
    scratch: PathBuf,
    symbology: Symbology,
    style: SymbolStyle,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl SymbolRasterizer {
    pub fn new(scratch: &Path, symbology: Symbology, style: SymbolStyle) -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        if style.human_readable {
            fontdb.load_system_fonts();
            // Point generic 'sans-serif' at whatever face was found first.
            let family = fontdb
                .faces()
                .next()
                .and_then(|face| face.families.first().map(|(name, _)| name.clone()));
            match family {
                Some(name) => fontdb.set_sans_serif_family(name),
                None => debug!("no system fonts found; human readable text will be blank"),
            }
        }
        SymbolRasterizer {
            scratch: scratch.to_path_buf(),
            symbology,
            style,
            fontdb: Arc::new(fontdb),
        }
    }

    pub fn artifact_path(&self, index: usize) -> PathBuf {
        self.scratch.join(format!("symbol-{index:06}.png"))
    }
}

impl SymbolRenderer for SymbolRasterizer {
    type Image = RasterImage;

    fn render(&mut self, index: usize, code: &str) -> Result<RasterImage> {
        let encoded = self.symbology.encode(code)?;
        let (svg, w_px, h_px) = build_symbol_svg(&encoded, &self.style);
        let pixmap = rasterize_svg(&svg, w_px, h_px, &self.fontdb)?;
        let bytes = encode_rgba_to_png_bytes(w_px, h_px, pixmap.data())
            .map_err(|e| SheetError::rendering(format!("PNG encode failed for {code:?}: {e}")))?;
        let path = self.artifact_path(index);
        fs::write(&path, bytes)?;
        Ok(RasterImage {
            path,
            width: w_px,
            height: h_px,
        })
    }
}

pub fn rasterize_svg(
    svg: &str,
    w_px: u32,
    h_px: u32,
    fontdb: &Arc<usvg::fontdb::Database>,
) -> Result<tiny_skia::Pixmap> {
    let mut opt = usvg::Options::default();
    opt.fontdb = fontdb.clone();
    let tree = usvg::Tree::from_str(svg, &opt)
        .map_err(|e| SheetError::rendering(format!("SVG parse error: {e:?}")))?;
    let mut pixmap = tiny_skia::Pixmap::new(w_px, h_px)
        .ok_or_else(|| SheetError::rendering(format!("pixmap alloc failed ({w_px}x{h_px})")))?;
    let mut pm = pixmap.as_mut();
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pm);
    Ok(pixmap)
}

// RGBA -> PNG bytes, deterministic for the same input.
pub fn encode_rgba_to_png_bytes(
    width: u32,
    height: u32,
    rgba: &[u8],
) -> std::result::Result<Vec<u8>, png::EncodingError> {
    let mut buf = Vec::new();
    {
        let mut enc = Encoder::new(&mut buf, width, height);
        enc.set_color(ColorType::Rgba);
        enc.set_depth(BitDepth::Eight);
        enc.set_filter(FilterType::NoFilter);
        enc.set_compression(Compression::Default);
        let mut writer = enc.write_header()?;
        writer.write_image_data(rgba)?;
    }
    Ok(buf)
}
