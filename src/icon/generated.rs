//! Generated fallback icons
//!
//! These icons are drawn in code so they never depend on a file, a resource,
//! or a native API. Each one is drawn once and shared afterwards.

use super::{AppIcon, ICON_SIZE, IconOrigin};
use image::{Rgba, RgbaImage};
use std::sync::LazyLock;

const PLACEHOLDER_FILL: Rgba<u8> = Rgba([200, 200, 200, 96]);
const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([72, 110, 160, 255]);
const PACKAGE_BACKGROUND: Rgba<u8> = Rgba([0, 120, 215, 255]);
const MISSING_STROKE: Rgba<u8> = Rgba([128, 128, 128, 255]);
const GLYPH: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// 5x7 question mark, one row per byte, bit 4 is the leftmost column
const QUESTION_GLYPH: [u8; 7] = [
    0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100,
];

static PLACEHOLDER: LazyLock<AppIcon> = LazyLock::new(|| {
    AppIcon::new(
        RgbaImage::from_pixel(ICON_SIZE, ICON_SIZE, PLACEHOLDER_FILL),
        IconOrigin::Placeholder,
    )
});

static DEFAULT: LazyLock<AppIcon> =
    LazyLock::new(|| AppIcon::new(draw_default(), IconOrigin::Default));

static MISSING: LazyLock<AppIcon> =
    LazyLock::new(|| AppIcon::new(draw_missing(), IconOrigin::Missing));

static PACKAGE: LazyLock<AppIcon> =
    LazyLock::new(|| AppIcon::new(draw_package(), IconOrigin::Package));

/// Lightweight icon shown until a deferred fetch completes
pub fn placeholder_icon() -> AppIcon {
    PLACEHOLDER.clone()
}

/// Flat background with a single application-window glyph
pub fn default_icon() -> AppIcon {
    DEFAULT.clone()
}

/// Dashed border with a question mark, for saved entries that vanished
pub fn missing_icon() -> AppIcon {
    MISSING.clone()
}

/// Badge for packaged apps that have no executable to extract from
pub fn package_icon() -> AppIcon {
    PACKAGE.clone()
}

fn draw_default() -> RgbaImage {
    let mut image = RgbaImage::from_pixel(ICON_SIZE, ICON_SIZE, DEFAULT_BACKGROUND);

    // Window outline with a filled title bar
    stroke_rect(&mut image, 7, 8, 24, 23, GLYPH);
    fill_rect(&mut image, 7, 8, 24, 11, GLYPH);
    image
}

fn draw_package() -> RgbaImage {
    let mut image = RgbaImage::from_pixel(ICON_SIZE, ICON_SIZE, PACKAGE_BACKGROUND);

    // Box with a lid band and a tape strip down the middle
    stroke_rect(&mut image, 8, 10, 23, 24, GLYPH);
    fill_rect(&mut image, 6, 7, 25, 10, GLYPH);
    fill_rect(&mut image, 15, 7, 16, 24, GLYPH);
    image
}

fn draw_missing() -> RgbaImage {
    let mut image = RgbaImage::from_pixel(ICON_SIZE, ICON_SIZE, TRANSPARENT);
    let last = ICON_SIZE - 1;

    for i in 0..ICON_SIZE {
        // 3 on, 3 off
        if (i / 3) % 2 == 0 {
            for (x, y) in [(i, 0), (i, 1), (i, last), (i, last - 1)] {
                image.put_pixel(x, y, MISSING_STROKE);
            }
            for (x, y) in [(0, i), (1, i), (last, i), (last - 1, i)] {
                image.put_pixel(x, y, MISSING_STROKE);
            }
        }
    }

    blit_glyph(&mut image, &QUESTION_GLYPH, 3, MISSING_STROKE);
    image
}

/// Draw a 5x7 glyph scaled by `scale`, centered
fn blit_glyph(image: &mut RgbaImage, glyph: &[u8; 7], scale: u32, color: Rgba<u8>) {
    let origin_x = (ICON_SIZE - 5 * scale) / 2;
    let origin_y = (ICON_SIZE - 7 * scale) / 2;

    for (row, bits) in (0u32..).zip(glyph.iter()) {
        for col in 0..5u32 {
            if bits & (0b10000 >> col) == 0 {
                continue;
            }
            let x0 = origin_x + col * scale;
            let y0 = origin_y + row * scale;
            fill_rect(image, x0, y0, x0 + scale - 1, y0 + scale - 1, color);
        }
    }
}

/// Fill the inclusive rectangle `(x0, y0)..=(x1, y1)`
fn fill_rect(image: &mut RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgba<u8>) {
    for y in y0..=y1.min(image.height() - 1) {
        for x in x0..=x1.min(image.width() - 1) {
            image.put_pixel(x, y, color);
        }
    }
}

/// One-pixel outline of the inclusive rectangle `(x0, y0)..=(x1, y1)`
fn stroke_rect(image: &mut RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgba<u8>) {
    fill_rect(image, x0, y0, x1, y0, color);
    fill_rect(image, x0, y1, x1, y1, color);
    fill_rect(image, x0, y0, x0, y1, color);
    fill_rect(image, x1, y0, x1, y1, color);
}
