use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FramekitError::config("x")
            .to_string()
            .contains("config error:")
    );
    assert!(
        TemplateError::malformed("x")
            .to_string()
            .contains("malformed template:")
    );
    assert!(
        FramekitError::from(EncodeError::UnsupportedFormat("bmp".into()))
            .to_string()
            .contains("'bmp'")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FramekitError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn preflight_classification() {
    assert!(FramekitError::config("bad").is_preflight());
    assert!(FramekitError::MissingField("price".into()).is_preflight());
    assert!(FramekitError::from(TemplateError::EmptyTemplate).is_preflight());
    assert!(FramekitError::Busy.is_preflight());
    assert!(FramekitError::Frame(ComposeError::CorruptImage("frame".into())).is_preflight());
    assert!(
        !FramekitError::from(ComposeError::CorruptImage("x".into())).is_preflight()
    );
}
