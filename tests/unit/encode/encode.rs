use super::*;

fn image_with_alpha() -> CompositeImage {
    let mut rgba = Vec::new();
    for i in 0..16u32 {
        let a = if i % 2 == 0 { 255 } else { 0 };
        rgba.extend_from_slice(&[200, 10, 10, a]);
    }
    CompositeImage {
        width: 4,
        height: 4,
        rgba,
    }
}

#[test]
fn png_round_trips_pixels_exactly() {
    let img = image_with_alpha();
    let bytes = encode(&img, OutputFormat::Png, 1, Rgba8::WHITE).unwrap();
    assert_eq!(
        image::guess_format(&bytes).unwrap(),
        image::ImageFormat::Png
    );
    let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(decoded.into_raw(), img.rgba);
}

#[test]
fn jpeg_is_flattened_over_the_background() {
    let img = image_with_alpha();
    let bytes = encode(&img, OutputFormat::Jpg, 95, Rgba8::WHITE).unwrap();
    assert_eq!(
        image::guess_format(&bytes).unwrap(),
        image::ImageFormat::Jpeg
    );
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (4, 4));
    assert!(!decoded.color().has_alpha());
}

#[test]
fn lossy_quality_outside_range_fails() {
    let img = image_with_alpha();
    for format in [OutputFormat::Jpg, OutputFormat::WebP] {
        for q in [0, 101] {
            assert!(matches!(
                encode(&img, format, q, Rgba8::WHITE),
                Err(EncodeError::EncodeFailure(_))
            ));
        }
    }
    assert!(encode(&img, OutputFormat::Png, 0, Rgba8::WHITE).is_ok());
}

fn gradient(width: u32, height: u32) -> CompositeImage {
    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            rgba.extend_from_slice(&[
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                ((x ^ y) & 0xff) as u8,
                255,
            ]);
        }
    }
    CompositeImage {
        width,
        height,
        rgba,
    }
}

#[test]
fn webp_honors_quality() {
    let img = gradient(64, 48);
    let low = encode(&img, OutputFormat::WebP, 1, Rgba8::WHITE).unwrap();
    let high = encode(&img, OutputFormat::WebP, 100, Rgba8::WHITE).unwrap();

    for bytes in [&low, &high] {
        assert_eq!(
            image::guess_format(bytes).unwrap(),
            image::ImageFormat::WebP
        );
        let decoded = image::load_from_memory(bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }
    assert_ne!(low, high);
    assert!(low.len() < high.len());
}

#[test]
fn webp_keeps_transparency() {
    let img = image_with_alpha();
    let bytes = encode(&img, OutputFormat::WebP, 90, Rgba8::WHITE).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(1, 0).0[3], 0);
    assert_eq!(decoded.get_pixel(0, 0).0[3], 255);
}

#[test]
fn mismatched_buffer_is_rejected() {
    let img = CompositeImage {
        width: 3,
        height: 3,
        rgba: vec![0; 4],
    };
    assert!(encode(&img, OutputFormat::Png, 80, Rgba8::WHITE).is_err());
}

#[test]
fn flatten_blends_translucent_pixels() {
    let out = flatten_to_rgb8(&[0, 0, 0, 128, 10, 20, 30, 255, 9, 9, 9, 0], Rgba8::WHITE);
    assert_eq!(out, vec![127, 127, 127, 10, 20, 30, 255, 255, 255]);
}
