//! Caption banner layout and rasterization.
//!
//! The banner is a fixed-size white strip with the caption centered in black.
//! Finding the right font size is an iterative search: start large, estimate a
//! character budget per line from the glyph-width heuristic, greedy-wrap,
//! measure the shaped block with Parley, and step the size down until the
//! block fits inside the padded box. If nothing fits, the smallest size in the
//! range is used anyway; if the font file cannot be loaded at all, the raw
//! caption is rendered with the system sans-serif face at a fixed size. Both
//! degradations are intentional and never surface as errors.

use std::path::Path;

use crate::{
    config::BannerFontSearch,
    error::{BanderoleError, BanderoleResult},
    geometry::Dims,
};

/// Approximate advance width of a glyph relative to the font size.
const AVG_GLYPH_WIDTH_RATIO: f32 = 0.6;

/// Fixed size used when the requested font is unavailable.
const FALLBACK_FONT_SIZE: f32 = 48.0;

/// RGBA8 brush color carried through Parley layout styles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct TextBrushRgba8 {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

const BLACK: TextBrushRgba8 = TextBrushRgba8 {
    r: 0,
    g: 0,
    b: 0,
    a: 255,
};

/// A rasterized caption banner.
#[derive(Clone, Debug)]
pub struct RenderedBanner {
    pub width: u32,
    pub height: u32,
    /// Opaque RGBA8 pixels, white background with black text.
    pub rgba8: Vec<u8>,
    /// The font size the layout search settled on.
    pub font_size: f32,
    /// The caption after line wrapping (raw caption on the fallback path).
    pub wrapped: String,
}

/// Stateful banner renderer holding Parley font/layout contexts.
pub struct BannerRenderer {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl Default for BannerRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl BannerRenderer {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Lay out and rasterize `caption` into a `box_dims` banner.
    pub fn render(
        &mut self,
        caption: &str,
        font_path: &Path,
        box_dims: Dims,
        search: &BannerFontSearch,
    ) -> BanderoleResult<RenderedBanner> {
        search.validate()?;
        let pad = search.padding;
        if pad * 2 >= box_dims.width || pad * 2 >= box_dims.height {
            return Err(BanderoleError::validation(
                "banner padding leaves no room for text",
            ));
        }
        let avail_w = (box_dims.width - 2 * pad) as f32;
        let avail_h = (box_dims.height - 2 * pad) as f32;

        let family = match self.register_font_file(font_path) {
            Some(name) => name,
            None => {
                tracing::warn!(
                    font = %font_path.display(),
                    "caption font unavailable, falling back to system sans-serif"
                );
                return self.rasterize(caption, None, FALLBACK_FONT_SIZE, box_dims, pad);
            }
        };

        let (font_size, wrapped) = {
            let font_ctx = &mut self.font_ctx;
            let layout_ctx = &mut self.layout_ctx;
            search_font_fit(caption, avail_w, avail_h, search, |size, text| {
                let layout = build_layout(font_ctx, layout_ctx, text, Some(family.as_str()), size);
                Ok((layout.width(), layout.height()))
            })?
        };

        self.rasterize(&wrapped, Some(family.as_str()), font_size, box_dims, pad)
    }

    /// Register the caption font with the Parley collection; `None` when the
    /// file is unreadable or contains no usable family.
    fn register_font_file(&mut self, font_path: &Path) -> Option<String> {
        let bytes = std::fs::read(font_path).ok()?;
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes), None);
        let family_id = families.first().map(|(id, _)| *id)?;
        self.font_ctx
            .collection
            .family_name(family_id)
            .map(str::to_string)
    }

    fn rasterize(
        &mut self,
        text: &str,
        family: Option<&str>,
        font_size: f32,
        box_dims: Dims,
        pad: u32,
    ) -> BanderoleResult<RenderedBanner> {
        let width_u16: u16 = box_dims
            .width
            .try_into()
            .map_err(|_| BanderoleError::validation("banner width exceeds u16"))?;
        let height_u16: u16 = box_dims
            .height
            .try_into()
            .map_err(|_| BanderoleError::validation("banner height exceeds u16"))?;

        let avail_w = (box_dims.width - 2 * pad) as f32;
        let mut layout = build_layout(&mut self.font_ctx, &mut self.layout_ctx, text, family, font_size);
        layout.align(
            Some(avail_w),
            parley::Alignment::Center,
            parley::AlignmentOptions::default(),
        );

        let mut ctx = vello_cpu::RenderContext::new(width_u16, height_u16);

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(box_dims.width),
            f64::from(box_dims.height),
        ));

        let y_off = (f64::from(box_dims.height) - f64::from(layout.height())).max(0.0) / 2.0;
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((f64::from(pad), y_off)));
        draw_layout(&mut ctx, &layout);

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width_u16, height_u16);
        ctx.render_to_pixmap(&mut pixmap);

        Ok(RenderedBanner {
            width: box_dims.width,
            height: box_dims.height,
            rgba8: pixmap.data_as_u8_slice().to_vec(),
            font_size,
            wrapped: text.to_string(),
        })
    }
}

fn build_layout(
    font_ctx: &mut parley::FontContext,
    layout_ctx: &mut parley::LayoutContext<TextBrushRgba8>,
    text: &str,
    family: Option<&str>,
    font_size: f32,
) -> parley::Layout<TextBrushRgba8> {
    let stack = match family {
        Some(name) => parley::style::FontStack::Source(std::borrow::Cow::Owned(name.to_string())),
        None => parley::style::FontStack::Single(parley::style::FontFamily::Generic(
            parley::style::GenericFamily::SansSerif,
        )),
    };

    let mut builder = layout_ctx.ranged_builder(font_ctx, text, 1.0, true);
    builder.push_default(parley::style::StyleProperty::FontStack(stack));
    builder.push_default(parley::style::StyleProperty::FontSize(font_size));
    builder.push_default(parley::style::StyleProperty::Brush(BLACK));

    let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
    // Only the caption's own hard breaks split lines; wrapping was decided by
    // the character-budget pass.
    layout.break_all_lines(None);
    layout
}

fn draw_layout(ctx: &mut vello_cpu::RenderContext, layout: &parley::Layout<TextBrushRgba8>) {
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };

            let brush = run.style().brush;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                brush.r, brush.g, brush.b, brush.a,
            ));

            let font = run.run().font();
            let font_data = vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(font.data.as_ref().to_vec()),
                font.index,
            );

            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(&font_data)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

/// Character budget per line for a given font size and available width.
pub(crate) fn chars_per_line(font_size: f32, avail_w: f32) -> usize {
    let avg = font_size * AVG_GLYPH_WIDTH_RATIO;
    let cols = (avail_w / avg).floor() as usize;
    cols.max(10)
}

/// Greedy word wrap: words accumulate on a line while the running character
/// count, including a single separating space, stays within `max_chars`.
/// Overlong single words get their own line rather than being split.
pub(crate) fn wrap_caption(text: &str, max_chars: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut cur_chars = 0usize;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();
        if cur.is_empty() {
            cur.push_str(word);
            cur_chars = word_chars;
        } else if cur_chars + 1 + word_chars <= max_chars {
            cur.push(' ');
            cur.push_str(word);
            cur_chars += 1 + word_chars;
        } else {
            lines.push(std::mem::take(&mut cur));
            cur.push_str(word);
            cur_chars = word_chars;
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines.join("\n")
}

/// Downward font-size search over an injected measure function.
///
/// Returns the first `(size, wrapped)` whose measured block fits within
/// `(avail_w, avail_h)`; when nothing in the range fits, the smallest size
/// tried (always >= `search.min_size`) is returned best-effort.
pub(crate) fn search_font_fit<F>(
    caption: &str,
    avail_w: f32,
    avail_h: f32,
    search: &BannerFontSearch,
    mut measure: F,
) -> BanderoleResult<(f32, String)>
where
    F: FnMut(f32, &str) -> BanderoleResult<(f32, f32)>,
{
    let mut size = search.start_size;
    loop {
        let cols = chars_per_line(size, avail_w);
        let wrapped = wrap_caption(caption, cols);
        let (w, h) = measure(size, &wrapped)?;

        let next = size - search.step;
        if (w <= avail_w && h <= avail_h) || next < search.min_size {
            return Ok((size, wrapped));
        }
        size = next;
    }
}
