use crate::error::TypeflowError;
use crate::flow::{LaidOutText, PlacedLine, ShapeOptions, TextBlock, Typesetter};
use crate::font::FontRegistry;
use crate::types::Pt;
use std::sync::Arc;

/// Built-in typesetter: greedy word wrap against the column width with
/// optional left indent on the leading rows. Line height is 1.2em;
/// vertical extents come from the font registry (or its approximation
/// when no font is registered).
pub struct ParagraphShaper {
    registry: Arc<FontRegistry>,
    font_name: String,
    font_size: Pt,
}

impl ParagraphShaper {
    pub fn new(registry: Arc<FontRegistry>) -> Self {
        Self {
            registry,
            font_name: "Helvetica".to_string(),
            font_size: Pt::from_f32(10.0),
        }
    }

    pub fn with_font(mut self, name: impl Into<String>, size: Pt) -> Self {
        self.font_name = name.into();
        self.font_size = size;
        self
    }

    fn measure(&self, text: &str) -> Pt {
        self.registry
            .measure_text_width(&self.font_name, self.font_size, text)
    }
}

impl Typesetter for ParagraphShaper {
    fn shape(
        &self,
        block: &TextBlock,
        width: Pt,
        options: &ShapeOptions,
    ) -> Result<LaidOutText, TypeflowError> {
        if width <= Pt::ZERO {
            return Err(TypeflowError::Shaping(
                "column width must be positive".to_string(),
            ));
        }

        let indent_for_row = |row: usize| -> Pt {
            match options.indent_left {
                Some((indent, rows)) if (row as u64) < rows as u64 => indent,
                _ => Pt::ZERO,
            }
        };

        let space_width = self.measure(" ");
        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_width = Pt::ZERO;

        for word in block.text.split_whitespace() {
            let word_width = self.measure(word);
            if current.is_empty() {
                let avail = width - indent_for_row(lines.len());
                if word_width > avail {
                    return Err(TypeflowError::Shaping(format!(
                        "unbreakable text wider than column: {:?}",
                        word
                    )));
                }
                current.push_str(word);
                current_width = word_width;
                continue;
            }
            let avail = width - indent_for_row(lines.len());
            let candidate = current_width + space_width + word_width;
            if candidate > avail {
                lines.push(std::mem::take(&mut current));
                // The word must also fit the next row's indent.
                let avail = width - indent_for_row(lines.len());
                if word_width > avail {
                    return Err(TypeflowError::Shaping(format!(
                        "unbreakable text wider than column: {:?}",
                        word
                    )));
                }
                current.push_str(word);
                current_width = word_width;
            } else {
                current.push(' ');
                current.push_str(word);
                current_width = candidate;
            }
        }
        if !current.is_empty() || lines.is_empty() {
            lines.push(current);
        }

        let line_height = self.font_size.mul_ratio(6, 5);
        let ascent = self.registry.ascent(&self.font_name, self.font_size);
        let depth = self.registry.descent(&self.font_name, self.font_size);
        let placed: Vec<PlacedLine> = lines
            .into_iter()
            .enumerate()
            .map(|(row, text)| PlacedLine {
                dx: indent_for_row(row),
                baseline: line_height * (row as i32) + ascent,
                text,
            })
            .collect();
        let last_row = placed.len().saturating_sub(1) as i32;
        let height = line_height * last_row + ascent;

        Ok(LaidOutText {
            height,
            depth,
            font_name: self.font_name.clone(),
            font_size: self.font_size,
            lines: placed,
        })
    }
}
