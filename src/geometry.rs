//! Aspect-ratio-aware resize-and-crop planning.
//!
//! [`fit`] maps an arbitrary source resolution into a fixed target frame by
//! uniformly scaling one dimension to an exact fit and center-cropping the
//! other. The computation is pure; the resulting [`FitPlan`] is handed to the
//! decoder's scale/crop filter.

use crate::error::{BanderoleError, BanderoleResult};

/// Frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dims {
    pub width: u32,
    pub height: u32,
}

impl Dims {
    pub fn new(width: u32, height: u32) -> BanderoleResult<Self> {
        if width == 0 || height == 0 {
            return Err(BanderoleError::validation(
                "frame dimensions must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Scale-then-crop parameters that fill a target frame without letterboxing.
///
/// The crop window always has the target's exact dimensions; `crop_x`/`crop_y`
/// are the window's top-left corner inside the scaled frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FitPlan {
    pub scaled: Dims,
    pub crop_x: u32,
    pub crop_y: u32,
}

/// Compute the uniform scale and center crop that fills `target` from `source`.
///
/// If the source is relatively wider than the target, it is scaled to the
/// target height and the width is center-cropped; otherwise it is scaled to
/// the target width and the height is center-cropped. Crop offsets are clamped
/// into `[0, scaled - target]` to guard against integer rounding.
pub fn fit(source: Dims, target: Dims) -> BanderoleResult<FitPlan> {
    if source.width == 0 || source.height == 0 || target.width == 0 || target.height == 0 {
        return Err(BanderoleError::validation(
            "fit requires non-zero source and target dimensions",
        ));
    }

    if source.aspect() > target.aspect() {
        // Wider than target: exact-fit height, crop width.
        let scaled_h = target.height;
        let scaled_w =
            (f64::from(source.width) * (f64::from(target.height) / f64::from(source.height)))
                as u32;
        let x1 = (f64::from(scaled_w) / 2.0 - f64::from(target.width) / 2.0) as u32;
        Ok(FitPlan {
            scaled: Dims {
                width: scaled_w,
                height: scaled_h,
            },
            crop_x: x1.min(scaled_w.saturating_sub(target.width)),
            crop_y: 0,
        })
    } else {
        // Taller than target (or equal aspect): exact-fit width, crop height.
        let scaled_w = target.width;
        let scaled_h =
            (f64::from(source.height) * (f64::from(target.width) / f64::from(source.width)))
                as u32;
        let y1 = (f64::from(scaled_h) / 2.0 - f64::from(target.height) / 2.0) as u32;
        Ok(FitPlan {
            scaled: Dims {
                width: scaled_w,
                height: scaled_h,
            },
            crop_x: 0,
            crop_y: y1.min(scaled_h.saturating_sub(target.height)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: Dims = Dims {
        width: 1080,
        height: 1920,
    };

    #[test]
    fn equal_aspect_spans_whole_scaled_frame() {
        let plan = fit(
            Dims {
                width: 540,
                height: 960,
            },
            TARGET,
        )
        .unwrap();
        assert_eq!(plan.scaled, TARGET);
        assert_eq!((plan.crop_x, plan.crop_y), (0, 0));
    }

    #[test]
    fn landscape_1080p_scales_to_height_and_center_crops_width() {
        let plan = fit(
            Dims {
                width: 1920,
                height: 1080,
            },
            TARGET,
        )
        .unwrap();
        assert_eq!(plan.scaled.height, 1920);
        assert_eq!(plan.scaled.width, 3413);
        assert_eq!(plan.crop_x, 1166);
        assert_eq!(plan.crop_y, 0);
        assert_eq!(plan.crop_x + TARGET.width, 2246);
    }

    #[test]
    fn tall_source_scales_to_width_and_center_crops_height() {
        let plan = fit(
            Dims {
                width: 1080,
                height: 4000,
            },
            TARGET,
        )
        .unwrap();
        assert_eq!(plan.scaled.width, 1080);
        assert_eq!(plan.scaled.height, 4000);
        assert_eq!(plan.crop_x, 0);
        assert_eq!(plan.crop_y, (4000 - 1920) / 2);
    }

    #[test]
    fn crop_window_always_lies_within_scaled_frame() {
        let sizes = [
            (16u32, 9u32),
            (640, 480),
            (1920, 1080),
            (1080, 1920),
            (3840, 2160),
            (100, 3000),
            (3000, 100),
            (1081, 1921),
            (1079, 1919),
        ];
        for (w, h) in sizes {
            let plan = fit(Dims { width: w, height: h }, TARGET).unwrap();
            assert!(plan.scaled.width >= TARGET.width, "{w}x{h}");
            assert!(plan.scaled.height >= TARGET.height, "{w}x{h}");
            assert!(plan.crop_x + TARGET.width <= plan.scaled.width, "{w}x{h}");
            assert!(plan.crop_y + TARGET.height <= plan.scaled.height, "{w}x{h}");
            // At most one axis is cropped.
            assert!(plan.crop_x == 0 || plan.crop_y == 0, "{w}x{h}");
        }
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(fit(Dims { width: 0, height: 10 }, TARGET).is_err());
        assert!(
            fit(
                Dims {
                    width: 10,
                    height: 10
                },
                Dims {
                    width: 0,
                    height: 1920
                }
            )
            .is_err()
        );
    }
}
