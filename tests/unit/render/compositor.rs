use std::path::Path;

use super::*;
use crate::assets::fonts::find_system_font;
use crate::template::parser::parse_template_str;

fn solid(width: u32, height: u32, rgba: [u8; 4]) -> PreparedImage {
    let bytes = rgba.repeat(width as usize * height as usize);
    PreparedImage::from_straight_rgba8(width, height, bytes)
}

/// 100x80 opaque blue border of 10px around a transparent window.
fn window_frame() -> PreparedImage {
    let (w, h) = (100u32, 80u32);
    let mut bytes = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        for x in 0..w {
            let inside = (10..90).contains(&x) && (10..70).contains(&y);
            bytes.extend_from_slice(if inside { &[0, 0, 0, 0] } else { &[0, 0, 255, 255] });
        }
    }
    PreparedImage::from_straight_rgba8(w, h, bytes)
}

fn template(json: &str) -> Template {
    parse_template_str(json, Path::new("/tmp")).unwrap().0
}

fn slot_template() -> Template {
    template(
        r##"{ "slot": { "x": 10, "y": 10, "width": 80, "height": 60, "background": "#00ff00" } }"##,
    )
}

fn close(actual: [u8; 4], expected: [u8; 4]) -> bool {
    actual
        .iter()
        .zip(expected)
        .all(|(a, e)| (i16::from(*a) - i16::from(e)).abs() <= 2)
}

#[test]
fn fit_contain_preserves_aspect_and_centers() {
    let slot = Rect::new(10.0, 10.0, 90.0, 70.0);
    assert_eq!(
        fit_contain(40, 20, slot),
        PixelRect {
            x: 10,
            y: 20,
            width: 80,
            height: 40
        }
    );
    assert_eq!(
        fit_contain(300, 600, slot),
        PixelRect {
            x: 35,
            y: 10,
            width: 30,
            height: 60
        }
    );
    assert_eq!(
        fit_contain(80, 60, slot),
        PixelRect {
            x: 10,
            y: 10,
            width: 80,
            height: 60
        }
    );
    assert!(fit_contain(0, 10, slot).is_empty());
}

#[test]
fn output_matches_frame_size_and_layers_in_order() {
    let frame = window_frame();
    let product = solid(40, 20, [255, 0, 0, 255]);
    let t = slot_template();
    let mut c = Compositor::new();

    let out = c
        .compose(&frame, &product, &t, &FieldValues::new(), &FontBook::default())
        .unwrap();

    assert_eq!((out.width, out.height), (100, 80));
    assert_eq!(out.rgba.len(), 100 * 80 * 4);
    assert!(close(out.pixel(2, 2).unwrap(), [0, 0, 255, 255]), "frame border");
    assert!(close(out.pixel(50, 14).unwrap(), [0, 255, 0, 255]), "letterbox");
    assert!(close(out.pixel(50, 40).unwrap(), [255, 0, 0, 255]), "product");
}

#[test]
fn over_frame_product_covers_the_frame() {
    let frame = solid(60, 60, [0, 0, 255, 255]);
    let product = solid(10, 10, [255, 0, 0, 255]);
    let t = template(r#"{ "slot": { "x": 0, "y": 0, "width": 60, "height": 60 } }"#);
    let mut c = Compositor::new();
    let under = c
        .compose(&frame, &product, &t, &FieldValues::new(), &FontBook::default())
        .unwrap();
    assert!(close(under.pixel(30, 30).unwrap(), [0, 0, 255, 255]));

    let t = template(
        r#"{ "product_layer": "over_frame", "slot": { "x": 0, "y": 0, "width": 60, "height": 60 } }"#,
    );
    let over = c
        .compose(&frame, &product, &t, &FieldValues::new(), &FontBook::default())
        .unwrap();
    assert!(close(over.pixel(30, 30).unwrap(), [255, 0, 0, 255]));
}

#[test]
fn compose_is_deterministic() {
    let frame = window_frame();
    let product = solid(33, 17, [200, 100, 50, 255]);
    let t = slot_template();
    let mut a = Compositor::new();
    let mut b = Compositor::new();
    let first = a
        .compose(&frame, &product, &t, &FieldValues::new(), &FontBook::default())
        .unwrap();
    let second = a
        .compose(&frame, &product, &t, &FieldValues::new(), &FontBook::default())
        .unwrap();
    let fresh = b
        .compose(&frame, &product, &t, &FieldValues::new(), &FontBook::default())
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first, fresh);
}

#[test]
fn missing_or_blank_field_value_is_rejected() {
    let t = template(r#"{ "fields": [{ "name": "price", "position": [1, 1] }] }"#);
    let frame = solid(10, 10, [0, 0, 0, 255]);
    let product = solid(4, 4, [255, 255, 255, 255]);
    let mut c = Compositor::new();

    let err = c
        .compose(&frame, &product, &t, &FieldValues::new(), &FontBook::default())
        .unwrap_err();
    assert!(matches!(err, ComposeError::MissingField(n) if n == "price"));

    let values = FieldValues::from([("price".to_owned(), "   ".to_owned())]);
    let err = c
        .compose(&frame, &product, &t, &values, &FontBook::default())
        .unwrap_err();
    assert!(matches!(err, ComposeError::MissingField(_)));
}

#[test]
fn slot_outside_frame_is_rejected() {
    let t = template(r#"{ "slot": { "x": 50, "y": 0, "width": 60, "height": 10 } }"#);
    let frame = solid(100, 20, [0, 0, 0, 255]);
    let product = solid(4, 4, [255, 255, 255, 255]);
    let err = Compositor::new()
        .compose(&frame, &product, &t, &FieldValues::new(), &FontBook::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ComposeError::SlotOutOfBounds {
            width: 100,
            height: 20,
            ..
        }
    ));
}

#[test]
fn field_without_a_resolved_font_is_an_error() {
    let t = template(r#"{ "fields": [{ "name": "price", "position": [1, 1] }] }"#);
    let frame = solid(10, 10, [0, 0, 0, 255]);
    let product = solid(4, 4, [255, 255, 255, 255]);
    let values = FieldValues::from([("price".to_owned(), "$10".to_owned())]);

    let err = Compositor::new()
        .compose(&frame, &product, &t, &values, &FontBook::default())
        .unwrap_err();
    assert!(matches!(err, ComposeError::TextLayout { field, .. } if field == "price"));
}

#[test]
fn field_text_is_drawn_when_a_font_is_available() {
    let Some(font) = find_system_font() else {
        return;
    };
    let t = template(
        r##"{ "background": "#000000",
             "fields": [{ "name": "price", "position": [4, 4], "size": 40, "color": "#ffffff" }] }"##,
    );
    let fonts = FontBook::resolve(&t, Some(&font), false).unwrap();
    let frame = solid(200, 60, [0, 0, 0, 0]);
    let product = solid(1, 1, [0, 0, 0, 0]);
    let values = FieldValues::from([("price".to_owned(), "$10".to_owned())]);

    let out = Compositor::new()
        .compose(&frame, &product, &t, &values, &fonts)
        .unwrap();
    let lit = out
        .rgba
        .chunks_exact(4)
        .filter(|px| px[0] > 128 && px[3] == 255)
        .count();
    assert!(lit > 20, "expected visible glyph pixels, got {lit}");
}
