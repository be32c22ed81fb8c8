use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
/// Light and desaturated enough to sit behind a black data line.
pub fn generate_palette(n: usize) -> Vec<Srgb<u8>> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = 30.0 + (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.75);
            let rgb: Srgb = hsl.into_color();
            let rgb: Srgb<u8> = rgb.into_format();
            rgb
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Hex conversions
// ---------------------------------------------------------------------------

/// Parse `#rrggbb`.
pub fn parse_hex(s: &str) -> Option<Srgb<u8>> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Srgb::new(channel(0)?, channel(2)?, channel(4)?))
}

pub fn to_hex(c: Srgb<u8>) -> String {
    format!("#{:02X}{:02X}{:02X}", c.red, c.green, c.blue)
}

/// Colour for the `index`-th of `count` highlight spans: the configured one
/// when it parses, otherwise a generated palette entry.
pub fn span_color(configured: Option<&str>, index: usize, count: usize) -> Srgb<u8> {
    configured.and_then(parse_hex).unwrap_or_else(|| {
        generate_palette(count.max(1))
            .get(index % count.max(1))
            .copied()
            .unwrap_or(Srgb::new(200, 200, 200))
    })
}

/// Translucent egui colour for the preview window.
pub fn to_color32(c: Srgb<u8>, alpha: f32) -> Color32 {
    Color32::from_rgba_unmultiplied(c.red, c.green, c.blue, (alpha.clamp(0.0, 1.0) * 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trips() {
        let c = parse_hex("#FFB347").unwrap();
        assert_eq!((c.red, c.green, c.blue), (0xFF, 0xB3, 0x47));
        assert_eq!(to_hex(c), "#FFB347");
        assert!(parse_hex("FFB347").is_none());
        assert!(parse_hex("#FFB34").is_none());
        assert!(parse_hex("#GGGGGG").is_none());
    }

    #[test]
    fn palette_colours_are_distinct() {
        let colors = generate_palette(4);
        assert_eq!(colors.len(), 4);
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn unset_span_colour_comes_from_palette() {
        assert_eq!(span_color(Some("#ADD8E6"), 0, 2), Srgb::new(0xAD, 0xD8, 0xE6));
        assert_eq!(span_color(None, 1, 2), generate_palette(2)[1]);
    }
}
