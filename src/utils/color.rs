use anyhow::{Result, bail};
use image::Rgba;
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

/// Named colors accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Palette {
    /// Material grey 200, the default canvas behind the image views.
    #[strum(to_string = "grey_200", serialize = "gray_200")]
    Grey200,
    White,
    Black,
    Transparent,
}

impl Palette {
    pub fn rgba(self) -> Rgba<u8> {
        match self {
            Palette::Grey200 => Rgba([0xEE, 0xEE, 0xEE, 0xFF]),
            Palette::White => Rgba([0xFF, 0xFF, 0xFF, 0xFF]),
            Palette::Black => Rgba([0x00, 0x00, 0x00, 0xFF]),
            Palette::Transparent => Rgba([0x00, 0x00, 0x00, 0x00]),
        }
    }
}

/// Parse `#RRGGBB`, `#RRGGBBAA` or a [`Palette`] name.
pub fn parse_color(value: &str) -> Result<Rgba<u8>> {
    let value = value.trim();
    if let Ok(named) = Palette::from_str(value) {
        return Ok(named.rgba());
    }

    let hex = value.trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("invalid color: {value}");
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
    match hex.len() {
        6 => Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, 0xFF])),
        8 => Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, channel(6)?])),
        _ => bail!("invalid color: {value}"),
    }
}

/// Source-over blend of non-premultiplied RGBA.
pub fn blend_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = u32::from(src[3]);
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }

    let da = u32::from(dst[3]) * (255 - sa) / 255;
    let out_a = sa + da;
    let mix = |s: u8, d: u8| {
        let weighted = u32::from(s) * sa + u32::from(d) * da;
        ((weighted + out_a / 2) / out_a) as u8
    };
    Rgba([
        mix(src[0], dst[0]),
        mix(src[1], dst[1]),
        mix(src[2], dst[2]),
        out_a as u8,
    ])
}

/// Scale color channels by alpha.
pub fn premultiply(pixel: Rgba<u8>) -> Rgba<u8> {
    let a = u32::from(pixel[3]);
    let scale = |c: u8| ((u32::from(c) * a + 127) / 255) as u8;
    Rgba([scale(pixel[0]), scale(pixel[1]), scale(pixel[2]), pixel[3]])
}

/// Inverse of [`premultiply`]. Fully transparent pixels come back as zero.
pub fn unpremultiply(pixel: Rgba<u8>) -> Rgba<u8> {
    let a = u32::from(pixel[3]);
    if a == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let scale = |c: u8| ((u32::from(c) * 255 + a / 2) / a).min(255) as u8;
    Rgba([scale(pixel[0]), scale(pixel[1]), scale(pixel[2]), pixel[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_named_colors() {
        assert_eq!(parse_color("grey_200").unwrap(), Rgba([238, 238, 238, 255]));
        assert_eq!(parse_color("GRAY_200").unwrap(), Rgba([238, 238, 238, 255]));
        assert_eq!(parse_color("transparent").unwrap()[3], 0);
    }

    #[test]
    fn test_palette_names_round_trip() {
        for color in Palette::iter() {
            assert_eq!(parse_color(&color.to_string()).unwrap(), color.rgba());
        }
    }

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!(parse_color("#ff8000").unwrap(), Rgba([255, 128, 0, 255]));
        assert_eq!(parse_color("FF800080").unwrap(), Rgba([255, 128, 0, 128]));
    }

    #[test]
    fn test_parse_invalid_colors() {
        assert!(parse_color("#fff").is_err());
        assert!(parse_color("#gg0000").is_err());
        assert!(parse_color("mauve").is_err());
        assert!(parse_color("#ééé").is_err());
    }

    #[test]
    fn test_blend_over_extremes() {
        let red = Rgba([255, 0, 0, 255]);
        let grey = Rgba([238, 238, 238, 255]);
        assert_eq!(blend_over(red, grey), red);
        assert_eq!(blend_over(Rgba([9, 9, 9, 0]), grey), grey);
    }

    #[test]
    fn test_blend_over_half_alpha() {
        let out = blend_over(Rgba([255, 255, 255, 128]), Rgba([0, 0, 0, 255]));
        assert_eq!(out[3], 255);
        assert!((127..=129).contains(&out[0]), "got {out:?}");
    }

    #[test]
    fn test_blend_over_transparent_destination() {
        let out = blend_over(Rgba([200, 100, 50, 64]), Rgba([0, 0, 0, 0]));
        assert_eq!(out, Rgba([200, 100, 50, 64]));
    }

    #[test]
    fn test_premultiply_round_trip() {
        let opaque = Rgba([12, 200, 99, 255]);
        assert_eq!(premultiply(opaque), opaque);
        assert_eq!(unpremultiply(premultiply(opaque)), opaque);

        assert_eq!(premultiply(Rgba([255, 0, 0, 96])), Rgba([96, 0, 0, 96]));
        assert_eq!(unpremultiply(Rgba([96, 0, 0, 96])), Rgba([255, 0, 0, 96]));
        assert_eq!(unpremultiply(Rgba([7, 7, 7, 0])), Rgba([0, 0, 0, 0]));
    }
}
