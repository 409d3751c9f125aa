use parking_lot::Mutex;

use super::*;
use crate::style::action::parse_action_text;
use crate::transform::primitives::ImagePrimitives;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(ActionKind, usize)>>,
    fail_on: Option<ActionKind>,
}

impl PixelPrimitives for Recorder {
    fn apply_primitive(
        &self,
        kind: ActionKind,
        params: &[Param],
        bitmap: Bitmap,
    ) -> StyleCacheResult<Bitmap> {
        self.seen.lock().push((kind, params.len()));
        if self.fail_on == Some(kind) {
            return Err(StyleCacheError::validation("primitive exploded"));
        }
        Ok(bitmap)
    }
}

fn gradient(w: u32, h: u32) -> Bitmap {
    Bitmap::new(DynamicImage::ImageRgba8(image::RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba([(x * 7) as u8, (y * 11) as u8, ((x + y) * 3) as u8, 255])
    })))
}

#[test]
fn applies_actions_in_ascending_order() {
    let recorder = Arc::new(Recorder::default());
    let engine = TransformEngine::new(recorder.clone());

    let mut actions = parse_action_text("invert\nresize 4,4\nsepia").unwrap();
    actions.reverse();
    engine.apply(gradient(8, 8), &actions).unwrap();

    let kinds: Vec<ActionKind> = recorder.seen.lock().iter().map(|(k, _)| *k).collect();
    assert_eq!(
        kinds,
        vec![ActionKind::Invert, ActionKind::Resize, ActionKind::Sepia]
    );
}

#[test]
fn first_failure_aborts_and_names_the_action() {
    let recorder = Arc::new(Recorder {
        fail_on: Some(ActionKind::Resize),
        ..Default::default()
    });
    let engine = TransformEngine::new(recorder.clone());

    let actions = parse_action_text("invert\nresize 4,4\nsepia").unwrap();
    let err = engine.apply(gradient(8, 8), &actions).unwrap_err();
    match err {
        StyleCacheError::Transform { kind, order, .. } => {
            assert_eq!(kind, "resize");
            assert_eq!(order, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(recorder.seen.lock().len(), 2);
}

#[test]
fn same_input_and_chain_encode_identically() {
    let engine = TransformEngine::new(Arc::new(ImagePrimitives::new(".")));
    let actions =
        parse_action_text("resize 10,6\nrotate 33\nblur\nbrightness 20\nemboss").unwrap();

    let a = engine.apply(gradient(17, 9), &actions).unwrap();
    let b = engine.apply(gradient(17, 9), &actions).unwrap();
    assert_eq!(
        a.encode(ImageFormat::Png).unwrap(),
        b.encode(ImageFormat::Png).unwrap()
    );
}

#[test]
fn encode_decode_keeps_dimensions() {
    let bytes = gradient(5, 3).encode(ImageFormat::Png).unwrap();
    let back = Bitmap::decode_bytes(&bytes).unwrap();
    assert_eq!((back.width(), back.height()), (5, 3));
    assert_eq!(back.orientation, Orientation::NoTransforms);
}

#[test]
fn jpeg_encoding_flattens_alpha() {
    let bytes = gradient(4, 4).encode(ImageFormat::Jpeg).unwrap();
    let back = Bitmap::decode_bytes(&bytes).unwrap();
    assert!(!back.image.color().has_alpha());
}

#[test]
fn decoding_garbage_is_an_error() {
    assert!(Bitmap::decode_bytes(b"definitely not an image").is_err());
}
