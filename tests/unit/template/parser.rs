use super::*;

const BASE: &str = "/templates/shop";

fn parse(json: &str) -> Result<(Template, Vec<String>), TemplateError> {
    parse_template_str(json, Path::new(BASE))
}

#[test]
fn full_template_parses_with_defaults() {
    let (t, names) = parse(
        r##"{
            "background": "#ffffff",
            "slot": { "x": 10, "y": 20, "width": 300, "height": 200, "background": "grey" },
            "fields": [
                { "name": "price", "position": [12, 400], "font": "fonts/a.ttf",
                  "size": 32, "color": "#ff0000", "align": "right", "max_width": 150 },
                { "name": "size", "position": "5, 6" }
            ]
        }"##,
    )
    .unwrap();

    assert_eq!(names, vec!["price".to_string(), "size".to_string()]);
    assert_eq!(t.background, Rgba8::WHITE);
    let slot = t.slot.unwrap();
    assert_eq!(slot.rect, Rect::new(10.0, 20.0, 310.0, 220.0));
    assert_eq!(t.slot_background(), Rgba8::rgb(128, 128, 128));
    assert_eq!(t.product_layer, ProductLayer::UnderFrame);

    let price = t.field("price").unwrap();
    assert_eq!(price.position, Point::new(12.0, 400.0));
    assert_eq!(price.font, Some(PathBuf::from(BASE).join("fonts/a.ttf")));
    assert_eq!(price.size, 32.0);
    assert_eq!(price.color, Rgba8::rgb(255, 0, 0));
    assert_eq!(price.align, TextAlign::Right);
    assert_eq!(price.max_width, Some(150.0));

    let size = t.field("size").unwrap();
    assert_eq!(size.position, Point::new(5.0, 6.0));
    assert_eq!(size.size, DEFAULT_FIELD_SIZE_PX);
    assert_eq!(size.color, Rgba8::WHITE);
    assert_eq!(size.align, TextAlign::Left);
    assert_eq!(size.font, None);
}

#[test]
fn same_template_twice_yields_same_field_set() {
    let json = r#"{ "fields": [
        { "name": "b", "position": [0, 0] },
        { "name": "a", "position": [0, 0] }
    ] }"#;
    let (_, first) = parse(json).unwrap();
    let (_, second) = parse(json).unwrap();
    let first: HashSet<_> = first.into_iter().collect();
    let second: HashSet<_> = second.into_iter().collect();
    assert_eq!(first, second);
}

#[test]
fn slot_only_template_is_valid_and_fields_only_template_is_valid() {
    let (t, names) = parse(r#"{ "slot": { "x": 0, "y": 0, "width": 1, "height": 1 } }"#).unwrap();
    assert!(names.is_empty());
    assert!(t.slot.is_some());
    assert_eq!(t.background, Rgba8::TRANSPARENT);

    let (t, _) = parse(r#"{ "fields": [{ "name": "x", "position": {"x": 1, "y": 2} }] }"#).unwrap();
    assert!(t.slot.is_none());
    assert_eq!(t.fields[0].position, Point::new(1.0, 2.0));
}

#[test]
fn empty_template_is_rejected() {
    assert!(matches!(parse("{}"), Err(TemplateError::EmptyTemplate)));
    assert!(matches!(
        parse(r#"{ "fields": [] }"#),
        Err(TemplateError::EmptyTemplate)
    ));
}

#[test]
fn duplicate_field_is_rejected() {
    let err = parse(
        r#"{ "fields": [
            { "name": "price", "position": [0, 0] },
            { "name": " price ", "position": [1, 1] }
        ] }"#,
    )
    .unwrap_err();
    assert!(matches!(err, TemplateError::DuplicateField(n) if n == "price"));
}

#[test]
fn malformed_inputs_are_rejected() {
    let cases = [
        "not json",
        r#"{ "fields": [{ "name": "", "position": [0, 0] }] }"#,
        r#"{ "fields": [{ "name": "a", "position": "nope" }] }"#,
        r#"{ "fields": [{ "name": "a", "position": [0, 0], "size": 0 }] }"#,
        r#"{ "fields": [{ "name": "a", "position": [0, 0], "max_width": -5 }] }"#,
        r#"{ "fields": [{ "name": "a", "position": [0, 0], "color": "puce" }] }"#,
        r#"{ "fields": [{ "name": "a", "position": [0, 0], "align": "justify" }] }"#,
        r#"{ "slot": { "x": 0, "y": 0, "width": 0, "height": 10 } }"#,
        r#"{ "slot": { "x": -1, "y": 0, "width": 5, "height": 10 } }"#,
        r#"{ "slot": { "x": 0, "y": 0, "width": 5, "height": 10 }, "extra": true }"#,
    ];
    for json in cases {
        assert!(
            matches!(parse(json), Err(TemplateError::MalformedTemplate(_))),
            "expected malformed for {json}"
        );
    }
}

#[test]
fn product_layer_and_absolute_font_paths() {
    let (t, _) = parse(
        r#"{ "product_layer": "over_frame",
             "fields": [{ "name": "a", "position": [0, 0], "font": "/abs/font.ttf" }] }"#,
    )
    .unwrap();
    assert_eq!(t.product_layer, ProductLayer::OverFrame);
    assert_eq!(t.fields[0].font, Some(PathBuf::from("/abs/font.ttf")));
}

#[test]
fn unreadable_file_is_reported() {
    let err = parse_template_file(Path::new("/definitely/missing/template.json")).unwrap_err();
    assert!(matches!(err, TemplateError::Unreadable { .. }));
}
