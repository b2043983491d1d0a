//! End-to-end composition: region detection, layout, and rasterization.

use image::{DynamicImage, RgbImage};

use crate::font::BlockFont;
use crate::layout::{layout_caption, WrapMode};
use crate::region::detect_caption_region;
use crate::render::draw_caption;
use crate::types::CaptionRegion;

/// A template image with its caption drawn on.
#[derive(Debug, Clone)]
pub struct ComposedMeme {
    pub image: RgbImage,
    pub region: CaptionRegion,
    pub lines: usize,
}

/// Compose a caption onto a template image.
///
/// Detects the caption region, wraps and places the text, and rasterizes
/// it in the region's contrast color. An empty caption leaves the image
/// untouched apart from the RGB conversion.
pub fn compose_meme(
    img: &DynamicImage,
    caption: &str,
    font: &BlockFont,
    wrap: WrapMode,
) -> ComposedMeme {
    let region = detect_caption_region(img);
    let commands = layout_caption(caption, &region, font, wrap);
    let mut image = img.to_rgb8();
    draw_caption(&mut image, &commands, font, region.color);

    ComposedMeme {
        image,
        region,
        lines: commands.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rect, TextColor, VerticalAnchor};
    use image::Rgb;

    fn template_with_white_box() -> DynamicImage {
        let mut img = RgbImage::from_pixel(300, 200, Rgb([30, 30, 30]));
        for y in 40..120 {
            for x in 50..200 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_compose_draws_black_text_in_white_box() {
        let template = template_with_white_box();
        let composed = compose_meme(&template, "hello", &BlockFont::new(1), WrapMode::WordWrap);

        assert_eq!(composed.region.color, TextColor::Black);
        assert_eq!(composed.region.anchor, VerticalAnchor::Center);
        assert_eq!(composed.lines, 1);

        let r = composed.region.rect;
        let black_in_region = composed
            .image
            .enumerate_pixels()
            .filter(|&(x, y, p)| {
                x >= r.x && x < r.right() && y >= r.y && y < r.bottom() && *p == Rgb([0, 0, 0])
            })
            .count();
        assert!(black_in_region > 0);
    }

    #[test]
    fn test_compose_dark_template_gets_white_bottom_text() {
        let template = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 200, Rgb([30, 30, 30])));
        let composed = compose_meme(&template, "hello", &BlockFont::new(1), WrapMode::WordWrap);

        assert_eq!(composed.region.color, TextColor::White);
        assert_eq!(composed.region.anchor, VerticalAnchor::Bottom);
        assert_eq!(composed.region.rect, Rect { x: 10, y: 10, w: 280, h: 180 });

        let white = composed
            .image
            .pixels()
            .filter(|&&p| p == Rgb([255, 255, 255]))
            .count();
        assert!(white > 0);
    }

    #[test]
    fn test_compose_empty_caption_leaves_image_untouched() {
        let template = template_with_white_box();
        let composed = compose_meme(&template, "", &BlockFont::default(), WrapMode::WordWrap);

        assert_eq!(composed.lines, 0);
        assert_eq!(composed.image, template.to_rgb8());
    }

    #[test]
    fn test_compose_long_caption_wraps() {
        let template = template_with_white_box();
        let composed = compose_meme(
            &template,
            "when the thing finally works on the very first try",
            &BlockFont::new(2),
            WrapMode::WordWrap,
        );
        assert!(composed.lines > 1);
    }
}
