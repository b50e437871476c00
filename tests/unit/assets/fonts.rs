use super::*;
use crate::template::parser::parse_template_str;

fn template_with_font(font: &str) -> Template {
    let json = format!(
        r#"{{ "fields": [
            {{ "name": "a", "position": [0, 0], "font": "{font}" }},
            {{ "name": "b", "position": [0, 0] }}
        ] }}"#
    );
    parse_template_str(&json, Path::new("/")).unwrap().0
}

#[test]
fn unreadable_explicit_font_is_a_template_error() {
    let t = template_with_font("/definitely/missing/font.ttf");
    let err = FontBook::resolve(&t, None, true).unwrap_err();
    assert!(matches!(err, TemplateError::FontUnavailable { field, .. } if field == "a"));
}

#[test]
fn non_font_bytes_are_rejected() {
    let path = std::env::temp_dir().join(format!("framekit_not_a_font_{}.ttf", std::process::id()));
    std::fs::write(&path, b"definitely not a font").unwrap();
    let t = template_with_font(&path.display().to_string());
    let err = FontBook::resolve(&t, None, true).unwrap_err();
    let _ = std::fs::remove_file(&path);
    assert!(matches!(err, TemplateError::FontUnavailable { .. }));
}

#[test]
fn fields_share_the_default_font() {
    let Some(font) = find_system_font() else {
        return;
    };
    let t = template_with_font(&font.display().to_string());
    let book = FontBook::resolve(&t, Some(&font), false).unwrap();
    assert_eq!(book.font_for(0).map(LoadedFont::path), Some(font.as_path()));
    assert_eq!(book.font_for(1).map(LoadedFont::path), Some(font.as_path()));
    assert!(book.font_for(2).is_none());
}

#[test]
fn field_without_any_usable_font_is_a_template_error() {
    let t = parse_template_str(
        r#"{ "fields": [
            { "name": "price", "position": [0, 0] },
            { "name": "size", "position": [0, 20] }
        ] }"#,
        Path::new("/"),
    )
    .unwrap()
    .0;

    let err = FontBook::resolve(&t, None, false).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::FontUnavailable { ref field, ref path, .. }
            if field == "price" && path == "<default>"
    ));

    let err = FontBook::resolve_with(
        &t,
        Some(Path::new("/missing/default.ttf")),
        &["/missing/system.ttf"],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        TemplateError::FontUnavailable { ref path, .. } if path == "/missing/default.ttf"
    ));
}

#[test]
fn unusable_configured_default_falls_back_to_system_fonts() {
    let Some(system) = find_system_font() else {
        return;
    };
    let t = template_with_font(&system.display().to_string());
    let book = FontBook::resolve(&t, Some(Path::new("/missing/default.ttf")), true).unwrap();
    assert!(book.font_for(1).is_some());
}

#[test]
fn layout_wraps_at_max_width() {
    let Some(path) = find_system_font() else {
        return;
    };
    let font = LoadedFont::read(&path).unwrap();
    let mut engine = TextLayoutEngine::new();
    let brush = TextBrushRgba8::default();

    let single = engine
        .layout_plain("one two three four", &font, 20.0, brush, None)
        .unwrap();
    assert_eq!(single.lines().count(), 1);

    let wrapped = engine
        .layout_plain("one two three four", &font, 20.0, brush, Some(60.0))
        .unwrap();
    assert!(wrapped.lines().count() > 1);

    assert!(engine.layout_plain("x", &font, 0.0, brush, None).is_err());
}
