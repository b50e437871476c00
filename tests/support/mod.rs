#![allow(dead_code)]

use std::path::{Path, PathBuf};

use framekit::{BatchRequest, FieldValues, OutputFormat, PreviewRequest};

/// Frame, template and product images generated into a unique temp directory.
pub struct Fixture {
    pub dir: PathBuf,
    pub frame: PathBuf,
    pub template: PathBuf,
    pub products: Vec<PathBuf>,
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

pub const FRAME_W: u32 = 120;
pub const FRAME_H: u32 = 100;

pub fn unique_dir(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "framekit_it_{tag}_{}_{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A 120x100 frame with a transparent 100x70 window and `products` photos of varying size.
pub fn fixture(tag: &str, products: usize) -> Fixture {
    let dir = unique_dir(tag);

    let frame = dir.join("frame.png");
    image::RgbaImage::from_fn(FRAME_W, FRAME_H, |x, y| {
        if (10..110).contains(&x) && (10..80).contains(&y) {
            image::Rgba([0, 0, 0, 0])
        } else {
            image::Rgba([30, 30, 30, 255])
        }
    })
    .save(&frame)
    .unwrap();

    let template = dir.join("template.json");
    std::fs::write(
        &template,
        r##"{
            "background": "#ffffff",
            "slot": { "x": 10, "y": 10, "width": 100, "height": 70, "background": "#eeeeee" },
            "fields": [
                { "name": "price", "position": [12, 82], "size": 14, "color": "#ffffff" },
                { "name": "size", "position": [108, 82], "size": 14, "color": "#ffcc00", "align": "right" }
            ]
        }"##,
    )
    .unwrap();

    let products = (0..products)
        .map(|i| write_product(&dir, i))
        .collect();

    Fixture {
        dir,
        frame,
        template,
        products,
    }
}

fn write_product(dir: &Path, i: usize) -> PathBuf {
    let w = 40 + (i as u32 % 4) * 15;
    let h = 30 + (i as u32 % 3) * 20;
    let img = image::RgbImage::from_fn(w, h, |x, y| {
        image::Rgb([(x * 5) as u8, (y * 7) as u8, (i * 40) as u8])
    });
    if i % 2 == 0 {
        let p = dir.join(format!("product_{i}.png"));
        img.save(&p).unwrap();
        p
    } else {
        let p = dir.join(format!("product_{i}.jpg"));
        img.save(&p).unwrap();
        p
    }
}

pub fn values() -> FieldValues {
    FieldValues::from([
        ("price".to_owned(), "$10".to_owned()),
        ("size".to_owned(), "M".to_owned()),
    ])
}

pub fn batch_request(f: &Fixture, products: Vec<PathBuf>, format: OutputFormat) -> BatchRequest {
    BatchRequest {
        product_paths: products,
        frame_path: f.frame.clone(),
        template_path: f.template.clone(),
        field_values: values(),
        output_dir: f.dir.join("out"),
        format,
        quality: 80,
    }
}

pub fn preview_request(f: &Fixture, format: OutputFormat) -> PreviewRequest {
    PreviewRequest::from(&batch_request(f, f.products.clone(), format))
}
