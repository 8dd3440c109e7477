use anyhow::{Context, Result};
use image::{RgbaImage, imageops};
use snaptext_types::CaptureRegion;
use xcap::Monitor;

fn bounds_of(monitor: &Monitor) -> CaptureRegion {
    CaptureRegion {
        x: monitor.x(),
        y: monitor.y(),
        width: monitor.width(),
        height: monitor.height(),
    }
}

/// Bounds of every connected monitor
pub fn monitor_bounds() -> Result<Vec<CaptureRegion>> {
    let monitors = Monitor::all().context("Failed to get monitors")?;
    Ok(monitors.iter().map(bounds_of).collect())
}

/// Smallest region covering every monitor
pub fn virtual_desktop() -> Result<CaptureRegion> {
    monitor_bounds()?
        .into_iter()
        .reduce(|acc, bounds| acc.union(&bounds))
        .context("No monitor found")
}

/// Capture a region of the virtual desktop.
///
/// Every monitor the region touches is grabbed and the overlapping parts are
/// stitched together, so the result is always `region.width` x
/// `region.height`.
pub fn capture_screen_region(region: CaptureRegion) -> Result<RgbaImage> {
    let monitors = Monitor::all().context("Failed to get monitors")?;

    let mut tiles = Vec::new();
    for monitor in &monitors {
        let bounds = bounds_of(monitor);
        if bounds.intersection(&region).is_none() {
            continue;
        }

        let image = monitor
            .capture_image()
            .with_context(|| format!("Failed to capture monitor at ({}, {})", bounds.x, bounds.y))?;
        tiles.push((bounds, image));
    }

    anyhow::ensure!(
        !tiles.is_empty(),
        "Region {:?} does not overlap any monitor",
        region
    );

    Ok(stitch(region, &tiles))
}

/// Copy the parts of each monitor image that fall inside `region` onto a
/// canvas of the region's size. Uncovered pixels stay transparent black.
pub fn stitch(region: CaptureRegion, tiles: &[(CaptureRegion, RgbaImage)]) -> RgbaImage {
    let mut canvas = RgbaImage::new(region.width, region.height);

    for (bounds, image) in tiles {
        let Some(overlap) = bounds.intersection(&region) else {
            continue;
        };

        let src_x = overlap.x.abs_diff(bounds.x);
        let src_y = overlap.y.abs_diff(bounds.y);
        // Some backends return fewer pixels than the reported bounds
        let width = overlap.width.min(image.width().saturating_sub(src_x));
        let height = overlap.height.min(image.height().saturating_sub(src_y));
        if width == 0 || height == 0 {
            continue;
        }

        let part = imageops::crop_imm(image, src_x, src_y, width, height).to_image();
        imageops::replace(
            &mut canvas,
            &part,
            i64::from(overlap.x - region.x),
            i64::from(overlap.y - region.y),
        );
    }

    canvas
}
