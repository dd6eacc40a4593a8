//! PDF drawing surface on top of `pdf-writer`.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use barcode_core::{DrawingSurface, GridStyle, PageConfig, Rect, Result, SheetError};
use pdf_writer::{Content, Filter, Name, Pdf, Ref};
use tracing::debug;

use crate::raster::RasterImage;

const PT_PER_MM: f32 = 72.0 / 25.4;
const GRID_LINE_PT: f32 = 0.3;
const GRID_GRAY: f32 = 0.6;
const GRID_DASH_PT: [f32; 2] = [3.0, 2.0];

struct PageBuf {
    content: Content,
    images: Vec<(String, Ref)>,
}

impl PageBuf {
    fn new() -> Self {
        PageBuf {
            content: Content::new(),
            images: Vec::new(),
        }
    }
}

/// Multi-page document with every page the same size. Coordinates passed in
/// are millimetres from the bottom-left corner.
pub struct PdfSurface {
    pdf: Pdf,
    catalog_id: Ref,
    pages_id: Ref,
    next_id: i32,
    page_size_pt: (f32, f32),
    finished: Vec<PageBuf>,
    current: PageBuf,
    image_count: usize,
}

impl PdfSurface {
    pub fn new(page: &PageConfig) -> Self {
        PdfSurface {
            pdf: Pdf::new(),
            catalog_id: Ref::new(1),
            pages_id: Ref::new(2),
            next_id: 3,
            page_size_pt: (mm(page.width), mm(page.height)),
            finished: Vec::new(),
            current: PageBuf::new(),
            image_count: 0,
        }
    }

    fn alloc(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn page_count(&self) -> usize {
        self.finished.len() + 1
    }

    /// Writes the document to bytes. The surface is left empty afterwards.
    pub fn finish(&mut self) -> Vec<u8> {
        let last = std::mem::replace(&mut self.current, PageBuf::new());
        let mut pages = std::mem::take(&mut self.finished);
        pages.push(last);

        let (w, h) = self.page_size_pt;
        let mut page_ids = Vec::with_capacity(pages.len());
        for page in pages {
            let page_id = self.alloc();
            let content_id = self.alloc();
            page_ids.push(page_id);
            {
                let mut p = self.pdf.page(page_id);
                p.media_box(pdf_writer::Rect::new(0.0, 0.0, w, h));
                p.parent(self.pages_id);
                p.contents(content_id);
                {
                    let mut resources = p.resources();
                    let mut xobjects = resources.x_objects();
                    for (name, id) in &page.images {
                        xobjects.pair(Name(name.as_bytes()), *id);
                    }
                }
            }
            self.pdf.stream(content_id, &page.content.finish());
        }
        self.pdf
            .pages(self.pages_id)
            .kids(page_ids.iter().copied())
            .count(page_ids.len() as i32);
        self.pdf.catalog(self.catalog_id).pages(self.pages_id);

        let pdf = std::mem::replace(&mut self.pdf, Pdf::new());
        self.next_id = 3;
        self.image_count = 0;
        pdf.finish()
    }
}

fn mm(v: f64) -> f32 {
    v as f32 * PT_PER_MM
}

impl DrawingSurface for PdfSurface {
    type Image = RasterImage;

    fn new_page(&mut self) -> Result<()> {
        let done = std::mem::replace(&mut self.current, PageBuf::new());
        self.finished.push(done);
        debug!(page = self.finished.len() + 1, "started page");
        Ok(())
    }

    fn draw_rect(&mut self, rect: Rect, style: GridStyle) -> Result<()> {
        let c = &mut self.current.content;
        c.save_state();
        c.set_line_width(GRID_LINE_PT);
        c.set_stroke_gray(GRID_GRAY);
        if style == GridStyle::Dashed {
            c.set_dash_pattern(GRID_DASH_PT, 0.0);
        }
        c.rect(mm(rect.x), mm(rect.y), mm(rect.width), mm(rect.height));
        c.stroke();
        c.restore_state();
        Ok(())
    }

    fn draw_image(&mut self, image: &RasterImage, rect: Rect) -> Result<()> {
        let (gray, w, h) = read_png_gray(&image.path)?;
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&gray, 6);

        let id = self.alloc();
        {
            let mut xobj = self.pdf.image_xobject(id, &compressed);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w as i32);
            xobj.height(h as i32);
            xobj.color_space().device_gray();
            xobj.bits_per_component(8);
        }
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);

        let c = &mut self.current.content;
        c.save_state();
        c.transform([
            mm(rect.width),
            0.0,
            0.0,
            mm(rect.height),
            mm(rect.x),
            mm(rect.y),
        ]);
        c.x_object(Name(name.as_bytes()));
        c.restore_state();
        self.current.images.push((name, id));
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        let bytes = self.finish();
        fs::write(path, bytes)?;
        Ok(())
    }
}

/// Decodes an 8-bit PNG into gray samples composited over white.
fn read_png_gray(path: &Path) -> Result<(Vec<u8>, u32, u32)> {
    let decoder = png::Decoder::new(BufReader::new(File::open(path)?));
    let mut reader = decoder
        .read_info()
        .map_err(|e| SheetError::rendering(format!("{}: {e}", path.display())))?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| SheetError::rendering(format!("{}: {e}", path.display())))?;
    if info.bit_depth != png::BitDepth::Eight {
        return Err(SheetError::rendering(format!(
            "{}: expected 8-bit samples, got {:?}",
            path.display(),
            info.bit_depth
        )));
    }
    let data = &buf[..info.buffer_size()];
    let gray: Vec<u8> = match info.color_type {
        png::ColorType::Grayscale => data.to_vec(),
        png::ColorType::GrayscaleAlpha => data
            .chunks_exact(2)
            .map(|px| over_white(px[0], px[1]))
            .collect(),
        png::ColorType::Rgb => data.chunks_exact(3).map(|px| luma(px[0], px[1], px[2])).collect(),
        png::ColorType::Rgba => data
            .chunks_exact(4)
            .map(|px| over_white(luma(px[0], px[1], px[2]), px[3]))
            .collect(),
        png::ColorType::Indexed => {
            return Err(SheetError::rendering(format!(
                "{}: indexed PNGs are not supported",
                path.display()
            )));
        }
    };
    Ok((gray, info.width, info.height))
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

fn over_white(v: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((v as u32 * a + 255 * (255 - a)) / 255) as u8
}
