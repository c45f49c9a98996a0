//! PNG snapshot of a rendered page with overlay outlines

use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgb, RgbImage};
use log::info;

use super::overlay::Overlay;
use crate::catalog::Placement;
use crate::pdf::RasterSurface;

const SELECTED: Rgb<u8> = Rgb([0x1e, 0x66, 0xf5]);
const EDITABLE: Rgb<u8> = Rgb([0xd2, 0x0f, 0x39]);
const AMBIGUOUS: Rgb<u8> = Rgb([0xfe, 0x64, 0x0b]);
const READ_ONLY: Rgb<u8> = Rgb([0x7c, 0x7f, 0x93]);

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("surface pixel buffer does not match {width}x{height}")]
    BadSurface { width: u32, height: u32 },

    #[error("could not write snapshot: {0}")]
    Image(#[from] image::ImageError),
}

pub fn snapshot_file_name(page: usize) -> String {
    format!("page-{page}-overlay.png")
}

/// Copy the raster and outline every overlay on it.
///
/// Overlay rectangles must be relative to the surface, i.e. computed with a
/// zero surface offset.
pub fn compose(surface: &RasterSurface, overlays: &[Overlay]) -> Result<RgbImage, SnapshotError> {
    let mut image: RgbImage =
        ImageBuffer::from_raw(surface.width_px, surface.height_px, surface.pixels.clone()).ok_or(
            SnapshotError::BadSurface {
                width: surface.width_px,
                height: surface.height_px,
            },
        )?;

    for overlay in overlays {
        let color = if overlay.selected {
            SELECTED
        } else if !overlay.editable {
            READ_ONLY
        } else if overlay.placement == Placement::Ambiguous {
            AMBIGUOUS
        } else {
            EDITABLE
        };
        let thickness = if overlay.selected { 3 } else { 2 };
        outline(&mut image, overlay, color, thickness);
    }

    Ok(image)
}

fn outline(image: &mut RgbImage, overlay: &Overlay, color: Rgb<u8>, thickness: i64) {
    let (w, h) = (i64::from(image.width()), i64::from(image.height()));
    let left = overlay.rect.x.floor() as i64;
    let top = overlay.rect.y.floor() as i64;
    let right = overlay.rect.right().ceil() as i64 - 1;
    let bottom = overlay.rect.bottom().ceil() as i64 - 1;

    let mut put = |x: i64, y: i64| {
        if (0..w).contains(&x) && (0..h).contains(&y) {
            image.put_pixel(x as u32, y as u32, color);
        }
    };

    for t in 0..thickness {
        for x in left..=right {
            put(x, top + t);
            put(x, bottom - t);
        }
        for y in top..=bottom {
            put(left + t, y);
            put(right - t, y);
        }
    }
}

/// Compose and save as `page-<n>-overlay.png` in `dir`
pub fn write_snapshot(
    surface: &RasterSurface,
    overlays: &[Overlay],
    dir: &Path,
) -> Result<PathBuf, SnapshotError> {
    let image = compose(surface, overlays)?;
    std::fs::create_dir_all(dir).map_err(|e| SnapshotError::Image(image::ImageError::IoError(e)))?;
    let path = dir.join(snapshot_file_name(surface.page));
    image.save_with_format(&path, image::ImageFormat::Png)?;
    info!("Wrote overlay snapshot to {path:?}");
    Ok(path)
}
