use super::*;
use crate::style::action::Action;

fn run(line: &str, image: DynamicImage) -> StyleCacheResult<Bitmap> {
    let action = Action::parse(line, 0).unwrap();
    ImagePrimitives::new(".").apply_primitive(action.kind, &action.params, Bitmap::new(image))
}

fn solid(w: u32, h: u32, px: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(px)))
}

fn dims(b: &Bitmap) -> (u32, u32) {
    (b.width(), b.height())
}

#[test]
fn resize_family_dimensions() {
    let img = solid(200, 100, [10, 20, 30, 255]);
    assert_eq!(dims(&run("resize 100,100", img.clone()).unwrap()), (100, 100));
    assert_eq!(dims(&run("thumbnail 50,50", img.clone()).unwrap()), (50, 50));
    assert_eq!(dims(&run("best_fit 100,100", img.clone()).unwrap()), (100, 50));
    assert_eq!(dims(&run("best_fit 400,400", img.clone()).unwrap()), (200, 100));
    assert_eq!(dims(&run("fit_to_width 50", img.clone()).unwrap()), (50, 25));
    assert_eq!(dims(&run("fit_to_height 50", img).unwrap()), (100, 50));
}

#[test]
fn rotate_right_angles_swap_dimensions() {
    let img = solid(30, 10, [1, 2, 3, 255]);
    assert_eq!(dims(&run("rotate 90", img.clone()).unwrap()), (10, 30));
    assert_eq!(dims(&run("rotate 180", img.clone()).unwrap()), (30, 10));
    assert_eq!(dims(&run("rotate 360", img.clone()).unwrap()), (30, 10));
    // 30x10 at 45 degrees: both sides become (30 + 10) * sin(45) ~= 28.3.
    assert_eq!(dims(&run("rotate 45", img).unwrap()), (28, 28));
}

#[test]
fn crop_clamps_and_normalizes_corners() {
    let img = solid(20, 20, [0, 0, 0, 255]);
    assert_eq!(dims(&run("crop 15,15,5,5", img.clone()).unwrap()), (10, 10));
    assert_eq!(dims(&run("crop 10,10,100,100", img.clone()).unwrap()), (10, 10));
    assert!(run("crop 5,5,5,9", img).is_err());
}

#[test]
fn fill_and_invert_and_opacity() {
    let img = solid(2, 2, [0, 0, 0, 255]);
    let filled = run("fill #f00", img.clone()).unwrap().image.into_rgba8();
    assert_eq!(filled.get_pixel(1, 1).0, [255, 0, 0, 255]);

    let inverted = run("invert", img.clone()).unwrap().image.into_rgba8();
    assert_eq!(inverted.get_pixel(0, 0).0[..3], [255, 255, 255]);

    let faded = run("opacity 0.5", img).unwrap().image.into_rgba8();
    assert_eq!(faded.get_pixel(0, 0)[3], 128);
}

#[test]
fn colorize_blends_toward_tint() {
    let img = solid(1, 1, [0, 0, 0, 255]);
    let out = run("colorize #ffffff,0.5", img).unwrap().image.into_rgba8();
    assert_eq!(out.get_pixel(0, 0).0, [128, 128, 128, 255]);
}

#[test]
fn convolutions_keep_alpha() {
    let img = solid(4, 4, [100, 100, 100, 200]);
    for line in ["edges", "emboss", "mean_remove", "sketch", "smooth 2"] {
        let out = run(line, img.clone()).unwrap().image.into_rgba8();
        assert!(out.pixels().all(|p| p[3] == 200), "{line}");
    }
    // Flat input: edge kernel sums to zero, leaving only the offset.
    let edges = run("edges", img).unwrap().image.into_rgba8();
    assert_eq!(edges.get_pixel(1, 1)[0], 127);
}

#[test]
fn pixelate_averages_blocks() {
    let mut raw = RgbaImage::new(2, 1);
    raw.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
    raw.put_pixel(1, 0, Rgba([100, 100, 100, 255]));
    let out = run("pixelate 2", DynamicImage::ImageRgba8(raw))
        .unwrap()
        .image
        .into_rgba8();
    assert_eq!(out.get_pixel(0, 0), out.get_pixel(1, 0));
    assert_eq!(out.get_pixel(0, 0)[0], 50);
}

fn fixtures() -> ImagePrimitives {
    ImagePrimitives::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures"))
}

fn run_with(prims: &ImagePrimitives, line: &str, image: DynamicImage) -> StyleCacheResult<Bitmap> {
    let action = Action::parse(line, 0).unwrap();
    prims.apply_primitive(action.kind, &action.params, Bitmap::new(image))
}

#[test]
fn text_draws_glyphs_at_anchor() {
    let canvas = solid(60, 30, [0, 0, 0, 0]);
    let out = run_with(&fixtures(), "text HI,box.ttf,20,#ff0000,center,0,0", canvas)
        .unwrap()
        .image
        .into_rgba8();

    let painted = out.pixels().filter(|px| px[0] > 200 && px[3] > 200).count();
    assert!(painted > 100, "only {painted} glyph pixels");
    assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 0]);
    assert_eq!(out.get_pixel(59, 29).0, [0, 0, 0, 0]);
}

#[test]
fn text_offsets_move_the_glyphs() {
    let canvas = solid(60, 30, [0, 0, 0, 0]);
    let left = run_with(&fixtures(), "text I,box.ttf,20,#ffffff,topleft,0,0", canvas.clone())
        .unwrap()
        .image
        .into_rgba8();
    let shifted = run_with(&fixtures(), "text I,box.ttf,20,#ffffff,topleft,30,0", canvas)
        .unwrap()
        .image
        .into_rgba8();

    let min_x = |img: &RgbaImage| {
        img.enumerate_pixels()
            .filter(|(_, _, px)| px[3] > 0)
            .map(|(x, _, _)| x)
            .min()
            .unwrap()
    };
    assert!(min_x(&left) < 10);
    assert!(min_x(&shifted) >= 30);
}

#[test]
fn text_requires_a_readable_font() {
    let img = solid(4, 4, [0, 0, 0, 255]);
    assert!(run_with(&fixtures(), "text Hi,missing.ttf,12,#000,center,0,0", img.clone()).is_err());
    assert!(run_with(&fixtures(), "text Hi,../box.ttf,12,#000,center,0,0", img.clone()).is_err());
    assert!(run_with(&fixtures(), "text Hi,box.ttf,0,#000,center,0,0", img.clone()).is_err());
    assert!(run_with(&fixtures(), "text Hi,box.ttf,12,#000,middle,0,0", img).is_err());
}

#[test]
fn blur_uses_the_3x3_gaussian_kernel() {
    let mut img = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
    img.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
    let out = run("blur", DynamicImage::ImageRgba8(img)).unwrap().image.into_rgba8();

    // 255 * 4/16, 255 * 2/16, 255 * 1/16.
    assert_eq!(out.get_pixel(1, 1).0, [64, 64, 64, 255]);
    assert_eq!(out.get_pixel(1, 0).0, [32, 32, 32, 255]);
    assert_eq!(out.get_pixel(0, 0).0, [16, 16, 16, 255]);
}

#[test]
fn overlay_missing_file_fails() {
    let img = solid(4, 4, [0, 0, 0, 255]);
    assert!(run("overlay nope/missing.png,center,1,0,0", img.clone()).is_err());
    assert!(run("overlay ../escape.png,center,1,0,0", img).is_err());
}

#[test]
fn overlay_composites_relative_to_anchor() {
    let dir = tempfile::tempdir().unwrap();
    solid(2, 2, [255, 0, 0, 255])
        .save(dir.path().join("dot.png"))
        .unwrap();

    let action = Action::parse("overlay dot.png,bottom right,1,0,0", 0).unwrap();
    let out = ImagePrimitives::new(dir.path())
        .apply_primitive(
            action.kind,
            &action.params,
            Bitmap::new(solid(6, 6, [0, 0, 0, 255])),
        )
        .unwrap()
        .image
        .into_rgba8();
    assert_eq!(out.get_pixel(5, 5).0, [255, 0, 0, 255]);
    assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
}

#[test]
fn oversized_dimensions_are_rejected() {
    let img = solid(4, 4, [0, 0, 0, 255]);
    assert!(run("resize 100000,10", img.clone()).is_err());
    assert!(run("resize 0,10", img).is_err());
}
