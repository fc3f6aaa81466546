use image::{Rgb, RgbImage};
use visor_core::model::{BoundingBox, DetectionSet};

const OUTLINE_WIDTH: u32 = 3;

const PALETTE: [Rgb<u8>; 8] = [
    Rgb([255, 56, 56]),
    Rgb([255, 157, 151]),
    Rgb([255, 112, 31]),
    Rgb([255, 178, 29]),
    Rgb([207, 210, 49]),
    Rgb([72, 249, 10]),
    Rgb([26, 147, 52]),
    Rgb([0, 194, 255]),
];

/// Stable outline color for a class.
#[must_use]
pub fn class_color(class_name: &str) -> Rgb<u8> {
    let hash = class_name
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(usize::from(b)));
    PALETTE[hash % PALETTE.len()]
}

/// Draw an outline for every detection that carries a box.
#[must_use]
pub fn annotate(mut image: RgbImage, detections: &DetectionSet) -> RgbImage {
    for detection in detections.detections() {
        if let Some(bbox) = detection.bbox {
            draw_outline(&mut image, bbox, class_color(&detection.class_name));
        }
    }
    image
}

fn draw_outline(image: &mut RgbImage, bbox: BoundingBox, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    if bbox.x >= width || bbox.y >= height || bbox.width == 0 || bbox.height == 0 {
        return;
    }
    let right = bbox.x.saturating_add(bbox.width).min(width);
    let bottom = bbox.y.saturating_add(bbox.height).min(height);
    let stroke = OUTLINE_WIDTH.min(bbox.width).min(bbox.height);

    for y in bbox.y..bottom {
        for x in bbox.x..right {
            let on_edge = x < bbox.x + stroke
                || y < bbox.y + stroke
                || x + stroke >= right
                || y + stroke >= bottom;
            if on_edge {
                image.put_pixel(x, y, color);
            }
        }
    }
}
