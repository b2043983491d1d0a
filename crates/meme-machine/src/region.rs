//! Caption region detection.
//!
//! Meme templates usually reserve a white box for the caption. The detector
//! thresholds the image to near-white, groups white pixels into 8-connected
//! regions, and picks the largest one big enough to hold text. When no such
//! box exists (photo memes), the caption goes over the whole image in white,
//! anchored at the bottom.

use image::DynamicImage;

use crate::types::{CaptionRegion, Rect, TextColor, VerticalAnchor};

/// Grayscale values strictly above this count as white.
pub const WHITE_THRESHOLD: u8 = 250;

/// Minimum region pixel count to qualify as a caption box.
pub const MIN_CAPTION_AREA: u32 = 5000;

/// Pixels of padding kept between the region edge and the text.
pub const CAPTION_MARGIN: u32 = 10;

/// A connected component of white pixels.
struct WhiteRegion {
    area: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl WhiteRegion {
    fn bounds(&self) -> Rect {
        Rect {
            x: self.min_x,
            y: self.min_y,
            w: self.max_x - self.min_x + 1,
            h: self.max_y - self.min_y + 1,
        }
    }
}

/// Find the caption region for a template image.
///
/// Returns the largest qualifying white box (inset by [`CAPTION_MARGIN`])
/// for black centered text, or the full image (same inset) for white
/// bottom-anchored text when no box qualifies. Equal-area regions resolve
/// to the one encountered first in row-major scan order.
pub fn detect_caption_region(img: &DynamicImage) -> CaptionRegion {
    let gray = img.to_luma8();
    let (w, h) = gray.dimensions();

    let regions = find_white_regions(&gray);

    let mut best: Option<&WhiteRegion> = None;
    let mut max_area = 0u32;
    for region in &regions {
        if region.area >= MIN_CAPTION_AREA && region.area > max_area {
            max_area = region.area;
            best = Some(region);
        }
    }

    match best {
        Some(region) => CaptionRegion {
            rect: region.bounds().inset(CAPTION_MARGIN),
            color: TextColor::Black,
            anchor: VerticalAnchor::Center,
        },
        None => CaptionRegion {
            rect: Rect { x: 0, y: 0, w, h }.inset(CAPTION_MARGIN),
            color: TextColor::White,
            anchor: VerticalAnchor::Bottom,
        },
    }
}

/// Collect 8-connected components of white pixels via iterative flood fill,
/// in row-major discovery order.
fn find_white_regions(gray: &image::GrayImage) -> Vec<WhiteRegion> {
    let (w, h) = gray.dimensions();
    let mut visited = vec![false; w as usize * h as usize];
    let idx = |x: u32, y: u32| y as usize * w as usize + x as usize;

    let mut regions = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if visited[idx(x, y)] || gray.get_pixel(x, y)[0] <= WHITE_THRESHOLD {
                continue;
            }

            let mut region = WhiteRegion {
                area: 0,
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            };
            let mut stack = vec![(x, y)];
            visited[idx(x, y)] = true;

            while let Some((cx, cy)) = stack.pop() {
                region.area += 1;
                region.min_x = region.min_x.min(cx);
                region.min_y = region.min_y.min(cy);
                region.max_x = region.max_x.max(cx);
                region.max_y = region.max_y.max(cy);

                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = cx as i64 + dx;
                        let ny = cy as i64 + dy;
                        if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                            continue;
                        }
                        let (nx, ny) = (nx as u32, ny as u32);
                        if visited[idx(nx, ny)] || gray.get_pixel(nx, ny)[0] <= WHITE_THRESHOLD {
                            continue;
                        }
                        visited[idx(nx, ny)] = true;
                        stack.push((nx, ny));
                    }
                }
            }

            regions.push(region);
        }
    }

    regions
}
