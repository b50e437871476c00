use serde::Deserialize;

use crate::foundation::core::Rgba8;

/// Template color value.
///
/// Accepts `#RRGGBB`, `#RRGGBBAA`, `#RGB`, a small set of CSS-like names, or a `[r, g, b]` /
/// `[r, g, b, a]` array of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColorDef(pub(crate) Rgba8);

impl<'de> Deserialize<'de> for ColorDef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Arr(Vec<u8>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Str(s) => parse_color(&s).map(Self).map_err(serde::de::Error::custom),
            Repr::Arr(v) => match v.as_slice() {
                [r, g, b] => Ok(Self(Rgba8::rgb(*r, *g, *b))),
                [r, g, b, a] => Ok(Self(Rgba8::rgba(*r, *g, *b, *a))),
                _ => Err(serde::de::Error::custom(
                    "color array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}

/// Parse a color name or hex string.
pub fn parse_color(s: &str) -> Result<Rgba8, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    named_color(&s.to_ascii_lowercase()).ok_or_else(|| format!("unknown color \"{s}\""))
}

fn named_color(name: &str) -> Option<Rgba8> {
    let c = match name {
        "white" => Rgba8::WHITE,
        "black" => Rgba8::BLACK,
        "red" => Rgba8::rgb(255, 0, 0),
        "green" => Rgba8::rgb(0, 255, 0),
        "blue" => Rgba8::rgb(0, 0, 255),
        "yellow" => Rgba8::rgb(255, 255, 0),
        "cyan" => Rgba8::rgb(0, 255, 255),
        "magenta" => Rgba8::rgb(255, 0, 255),
        "gray" | "grey" => Rgba8::rgb(128, 128, 128),
        "transparent" => Rgba8::TRANSPARENT,
        _ => return None,
    };
    Some(c)
}

fn parse_hex(s: &str) -> Result<Rgba8, String> {
    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    if !s.is_ascii() {
        return Err("hex color must be ASCII".to_owned());
    }

    match s.len() {
        3 => {
            let r = hex_byte(&s[0..1])? * 17;
            let g = hex_byte(&s[1..2])? * 17;
            let b = hex_byte(&s[2..3])? * 17;
            Ok(Rgba8::rgb(r, g, b))
        }
        6 => Ok(Rgba8::rgb(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
        )),
        8 => Ok(Rgba8::rgba(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            hex_byte(&s[6..8])?,
        )),
        _ => Err("hex color must be #RGB, #RRGGBB or #RRGGBBAA".to_owned()),
    }
}
