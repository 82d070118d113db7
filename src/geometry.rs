use crate::error::TypeflowError;
use crate::types::{PageDimensions, Pt};

const ONE_CM: &str = "1cm";

/// Default-page record extracted from the stylesheet. Margins are raw
/// length literals; the empty string means "not specified".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageStyle {
    pub papersize: String,
    pub margin_top: String,
    pub margin_bottom: String,
    pub margin_left: String,
    pub margin_right: String,
}

/// Maps a paper-size name to its (width, height) length literals.
/// A two-token value like "210mm 297mm" is taken as an explicit pair;
/// unknown names fall back to A4.
pub fn papersize_literals(name: &str) -> (String, String) {
    let mut tokens = name.split_whitespace();
    if let (Some(width), Some(height), None) = (tokens.next(), tokens.next(), tokens.next()) {
        return (width.to_string(), height.to_string());
    }
    let (width, height) = match name.trim().to_ascii_lowercase().as_str() {
        "a3" => ("297mm", "420mm"),
        "a5" => ("148mm", "210mm"),
        "letter" => ("8.5in", "11in"),
        "legal" => ("8.5in", "14in"),
        _ => ("210mm", "297mm"),
    };
    (width.to_string(), height.to_string())
}

fn parse_margin(literal: &str) -> Result<Pt, TypeflowError> {
    if literal.is_empty() {
        Pt::parse(ONE_CM)
    } else {
        Pt::parse(literal)
    }
}

/// Resolves the physical page size and margins. The hard-coded fallback
/// (no default page style) is evaluated through the same literals as an
/// explicit `A4` style with unspecified margins, so the two paths cannot
/// diverge. Fails atomically: a malformed literal anywhere commits
/// nothing.
pub fn resolve_page_dimensions(
    style: Option<&PageStyle>,
) -> Result<PageDimensions, TypeflowError> {
    let fallback = PageStyle {
        papersize: "A4".to_string(),
        ..PageStyle::default()
    };
    let style = style.unwrap_or(&fallback);

    let (width_literal, height_literal) = papersize_literals(&style.papersize);
    let width = Pt::parse(&width_literal)?;
    let height = Pt::parse(&height_literal)?;
    let margin_top = parse_margin(&style.margin_top)?;
    let margin_bottom = parse_margin(&style.margin_bottom)?;
    let margin_left = parse_margin(&style.margin_left)?;
    let margin_right = parse_margin(&style.margin_right)?;

    Ok(PageDimensions {
        width,
        height,
        margin_left,
        margin_right,
        margin_top,
        margin_bottom,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_matches_explicit_a4_literals() {
        let explicit = PageStyle {
            papersize: "A4".to_string(),
            margin_top: String::new(),
            margin_bottom: String::new(),
            margin_left: String::new(),
            margin_right: String::new(),
        };
        let from_style = resolve_page_dimensions(Some(&explicit)).unwrap();
        let from_fallback = resolve_page_dimensions(None).unwrap();
        assert_eq!(from_style, from_fallback);
        assert_eq!(from_fallback.width, Pt::parse("210mm").unwrap());
        assert_eq!(from_fallback.height, Pt::parse("297mm").unwrap());
        assert_eq!(from_fallback.margin_top, Pt::parse("1cm").unwrap());
        assert_eq!(from_fallback.margin_bottom, Pt::parse("1cm").unwrap());
        assert_eq!(from_fallback.margin_left, Pt::parse("1cm").unwrap());
        assert_eq!(from_fallback.margin_right, Pt::parse("1cm").unwrap());
    }

    #[test]
    fn explicit_margins_override_the_default() {
        let style = PageStyle {
            papersize: "letter".to_string(),
            margin_top: "2cm".to_string(),
            margin_left: "18pt".to_string(),
            ..PageStyle::default()
        };
        let dims = resolve_page_dimensions(Some(&style)).unwrap();
        assert_eq!(dims.width, Pt::parse("8.5in").unwrap());
        assert_eq!(dims.height, Pt::parse("11in").unwrap());
        assert_eq!(dims.margin_top, Pt::parse("2cm").unwrap());
        assert_eq!(dims.margin_left, Pt::parse("18pt").unwrap());
        assert_eq!(dims.margin_bottom, Pt::parse("1cm").unwrap());
        assert_eq!(dims.margin_right, Pt::parse("1cm").unwrap());
    }

    #[test]
    fn explicit_size_pair_is_used_verbatim() {
        let (w, h) = papersize_literals("100mm 200mm");
        assert_eq!(w, "100mm");
        assert_eq!(h, "200mm");
    }

    #[test]
    fn unknown_papersize_falls_back_to_a4() {
        let (w, h) = papersize_literals("quarto");
        assert_eq!(w, "210mm");
        assert_eq!(h, "297mm");
    }

    #[test]
    fn malformed_margin_literal_fails_without_committing() {
        let style = PageStyle {
            papersize: "A4".to_string(),
            margin_bottom: "2 thumbs".to_string(),
            ..PageStyle::default()
        };
        let err = resolve_page_dimensions(Some(&style)).unwrap_err();
        assert!(matches!(err, TypeflowError::Parse(_)));
    }
}
