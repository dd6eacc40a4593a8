use crate::symbology::Encoded;

/// Pixel geometry of a rasterized symbol.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SymbolStyle {
    pub px_per_module: u32,
    /// Height over width of the whole symbol, quiet zones included.
    pub aspect: f64,
    pub human_readable: bool,
}

impl Default for SymbolStyle {
    fn default() -> Self {
        SymbolStyle {
            px_per_module: 3,
            aspect: 0.5,
            human_readable: true,
        }
    }
}

/// Builds a standalone SVG document for one symbol. Returns the document and
/// its pixel size.
pub fn build_symbol_svg(enc: &Encoded, style: &SymbolStyle) -> (String, u32, u32) {
    let m = style.px_per_module.max(1) as f64;
    let w_px = (enc.total_modules() as f64 * m).ceil() as u32;
    // Never shorter than ten modules so very wide symbols stay scannable.
    let h_px = ((w_px as f64 * style.aspect).round()).max(10.0 * m) as u32;

    let pad = m;
    let text_h = if style.human_readable && !enc.text.is_empty() {
        (h_px as f64 * 0.22).round()
    } else {
        0.0
    };
    let bar_h = (h_px as f64 - text_h - pad).max(m);
    let guard_h = (bar_h + text_h * 0.5).min(h_px as f64 - pad);

    let mut s = String::new();
    s.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    s.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\" shape-rendering=\"crispEdges\" font-family=\"sans-serif\">\n",
        w_px, h_px, w_px, h_px
    ));
    s.push_str("<rect x=\"0\" y=\"0\" width=\"100%\" height=\"100%\" fill=\"#ffffff\"/>\n");

    // Adjacent dark modules of the same height become one rect.
    let mut i = 0;
    while i < enc.dark.len() {
        if !enc.dark[i] {
            i += 1;
            continue;
        }
        let is_guard = enc.guard.get(i).copied().unwrap_or(false);
        let start = i;
        while i < enc.dark.len()
            && enc.dark[i]
            && enc.guard.get(i).copied().unwrap_or(false) == is_guard
        {
            i += 1;
        }
        let x = (enc.quiet_left + start) as f64 * m;
        let w = (i - start) as f64 * m;
        let h = if is_guard { guard_h } else { bar_h };
        s.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"#000000\"/>\n",
            x, pad, w, h
        ));
    }

    if text_h > 0.0 {
        let font_px = text_h * 0.8;
        s.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" fill=\"#000000\" font-size=\"{:.2}\">{}</text>\n",
            w_px as f64 / 2.0,
            h_px as f64 - text_h * 0.15,
            font_px,
            svg_escape(&enc.text)
        ));
    }

    s.push_str("</svg>\n");
    (s, w_px, h_px)
}

fn svg_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
