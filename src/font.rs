use crate::types::Pt;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const ASCII_FIRST: u8 = 32;
const ASCII_LAST: u8 = 126;

/// Optional metrics source for the built-in typesetter. Without any
/// registered font, measurement falls back to a 0.6em advance per
/// character and 0.8em/0.2em vertical metrics.
#[derive(Debug, Default)]
pub struct FontRegistry {
    fonts: Vec<FontMetrics>,
    lookup: HashMap<String, usize>,
}

#[derive(Debug)]
struct FontMetrics {
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    // Advances for ASCII 32..=126, in font units.
    widths: Vec<u16>,
    missing_width: u16,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_dir(&mut self, path: impl AsRef<Path>) {
        let Ok(entries) = fs::read_dir(path.as_ref()) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                self.register_file(path);
            }
        }
    }

    pub fn register_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let Some(ext) = path.extension().and_then(|v| v.to_str()) else {
            return;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" {
            return;
        }
        let Ok(data) = fs::read(path) else {
            return;
        };
        let fallback_name = path
            .file_stem()
            .and_then(|v| v.to_str())
            .unwrap_or("font")
            .to_string();
        self.register_bytes(&data, fallback_name);
    }

    pub fn register_bytes(&mut self, data: &[u8], fallback_name: String) {
        let Ok(face) = ttf_parser::Face::parse(data, 0) else {
            return;
        };
        let name = face
            .names()
            .into_iter()
            .find(|entry| entry.name_id == ttf_parser::name_id::FAMILY && entry.is_unicode())
            .and_then(|entry| entry.to_string())
            .unwrap_or(fallback_name);

        let missing_width = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .unwrap_or(500);
        let mut widths = Vec::with_capacity((ASCII_LAST - ASCII_FIRST + 1) as usize);
        for code in ASCII_FIRST..=ASCII_LAST {
            let advance = face
                .glyph_index(code as char)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .unwrap_or(missing_width);
            widths.push(advance);
        }

        let metrics = FontMetrics {
            units_per_em: face.units_per_em(),
            ascender: face.ascender(),
            descender: face.descender(),
            widths,
            missing_width,
        };
        let index = self.fonts.len();
        self.fonts.push(metrics);
        self.lookup.insert(normalize_name(&name), index);
    }

    pub fn measure_text_width(&self, name: &str, font_size: Pt, text: &str) -> Pt {
        let Some(font) = self.lookup_font(name) else {
            let char_width = (font_size * 0.6).max(Pt::from_f32(1.0));
            return char_width * (text.chars().count() as i32);
        };
        let mut units = 0i64;
        for ch in text.chars() {
            units += font.advance_units(ch) as i64;
        }
        font.scale(font_size, units)
    }

    pub fn ascent(&self, name: &str, font_size: Pt) -> Pt {
        match self.lookup_font(name) {
            Some(font) => font.scale(font_size, font.ascender as i64),
            None => font_size.mul_ratio(4, 5),
        }
    }

    pub fn descent(&self, name: &str, font_size: Pt) -> Pt {
        match self.lookup_font(name) {
            Some(font) => font.scale(font_size, -(font.descender as i64)),
            None => font_size.mul_ratio(1, 5),
        }
    }

    fn lookup_font(&self, name: &str) -> Option<&FontMetrics> {
        let index = self.lookup.get(&normalize_name(name))?;
        self.fonts.get(*index)
    }
}

impl FontMetrics {
    fn advance_units(&self, ch: char) -> u16 {
        let code = ch as u32;
        if (ASCII_FIRST as u32..=ASCII_LAST as u32).contains(&code) {
            self.widths[(code - ASCII_FIRST as u32) as usize]
        } else {
            self.missing_width
        }
    }

    fn scale(&self, font_size: Pt, units: i64) -> Pt {
        if self.units_per_em == 0 {
            return Pt::ZERO;
        }
        let milli = font_size.to_milli_i64() as i128 * units as i128;
        let scaled = milli / self.units_per_em as i128;
        Pt::from_milli_i64(scaled.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_font_uses_approximate_char_width() {
        let registry = FontRegistry::new();
        let width = registry.measure_text_width("Nope", Pt::from_f32(10.0), "abcd");
        assert_eq!(width.to_milli_i64(), 24_000);
    }

    #[test]
    fn unknown_font_vertical_metrics_split_the_em() {
        let registry = FontRegistry::new();
        let size = Pt::from_f32(10.0);
        assert_eq!(registry.ascent("Nope", size).to_milli_i64(), 8_000);
        assert_eq!(registry.descent("Nope", size).to_milli_i64(), 2_000);
    }

    #[test]
    fn register_file_ignores_non_font_paths() {
        let mut registry = FontRegistry::new();
        registry.register_file("/definitely/not/here.ttf");
        registry.register_file("/etc/hostname");
        let width = registry.measure_text_width("anything", Pt::from_f32(12.0), "x");
        assert_eq!(width.to_milli_i64(), 7_200);
    }
}
