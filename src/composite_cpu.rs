//! CPU frame composition over opaque RGBA8 buffers.
//!
//! The output frame is built per tick from opaque layers: a black base, the
//! fitted video blitted at a vertical offset, and the caption banner on top.
//! Layers are opaque so placement is a row copy, not an alpha blend; the
//! fade-in is a per-channel scale toward black applied after layering.

use crate::{
    error::{BanderoleError, BanderoleResult},
    geometry::Dims,
};

/// Fill an RGBA8 frame with opaque black.
pub fn fill_black(frame: &mut [u8], dims: Dims) -> BanderoleResult<()> {
    check_len(frame.len(), dims, "fill_black")?;
    for px in frame.chunks_exact_mut(4) {
        px.copy_from_slice(&[0, 0, 0, 255]);
    }
    Ok(())
}

/// Copy an opaque layer into `dst` with its top-left corner at `(x, y)`.
///
/// The layer is clipped at the frame's right and bottom edges; a layer placed
/// entirely outside the frame is a no-op.
pub fn blit_opaque(
    dst: &mut [u8],
    dst_dims: Dims,
    src: &[u8],
    src_dims: Dims,
    x: u32,
    y: u32,
) -> BanderoleResult<()> {
    check_len(dst.len(), dst_dims, "blit_opaque dst")?;
    check_len(src.len(), src_dims, "blit_opaque src")?;
    if x >= dst_dims.width || y >= dst_dims.height {
        return Ok(());
    }

    let copy_w = src_dims.width.min(dst_dims.width - x) as usize;
    let copy_h = src_dims.height.min(dst_dims.height - y) as usize;
    let dst_stride = dst_dims.width as usize * 4;
    let src_stride = src_dims.width as usize * 4;
    let x_bytes = x as usize * 4;

    for row in 0..copy_h {
        let d0 = (y as usize + row) * dst_stride + x_bytes;
        let s0 = row * src_stride;
        dst[d0..d0 + copy_w * 4].copy_from_slice(&src[s0..s0 + copy_w * 4]);
    }
    Ok(())
}

/// Scale the color channels of an opaque frame toward black.
///
/// `factor` 0.0 is full black, 1.0 leaves the frame untouched. Alpha is kept
/// at its existing value.
pub fn fade_from_black_in_place(frame: &mut [u8], factor: f32) -> BanderoleResult<()> {
    if !frame.len().is_multiple_of(4) {
        return Err(BanderoleError::validation(
            "fade_from_black_in_place expects an rgba8 buffer",
        ));
    }
    let factor = factor.clamp(0.0, 1.0);
    if factor >= 1.0 {
        return Ok(());
    }
    let f = ((factor * 255.0).round() as i32).clamp(0, 255) as u16;
    for px in frame.chunks_exact_mut(4) {
        px[0] = mul_div255(u16::from(px[0]), f);
        px[1] = mul_div255(u16::from(px[1]), f);
        px[2] = mul_div255(u16::from(px[2]), f);
    }
    Ok(())
}

fn check_len(len: usize, dims: Dims, what: &str) -> BanderoleResult<()> {
    let expected = dims.width as usize * dims.height as usize * 4;
    if len != expected {
        return Err(BanderoleError::validation(format!(
            "{what}: buffer is {len} bytes, expected {expected} for {}x{}",
            dims.width, dims.height
        )));
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
