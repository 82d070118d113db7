use crate::canvas::Canvas;
use crate::error::TypeflowError;
use crate::types::Pt;

/// Block-level spacing and indent settings. Every field carries its own
/// presence flag; "unset" is never encoded as a sentinel value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlockSettings {
    pub indent_left: Option<Pt>,
    pub indent_left_rows: Option<u32>,
    pub margin_top: Option<Pt>,
    pub margin_bottom: Option<Pt>,
}

impl BlockSettings {
    /// Later submissions win field by field.
    pub fn merge(self, other: BlockSettings) -> BlockSettings {
        BlockSettings {
            indent_left: other.indent_left.or(self.indent_left),
            indent_left_rows: other.indent_left_rows.or(self.indent_left_rows),
            margin_top: other.margin_top.or(self.margin_top),
            margin_bottom: other.margin_bottom.or(self.margin_bottom),
        }
    }
}

/// A styled text block awaiting placement. The text is opaque to the
/// placer; only the settings drive spacing and shaping options.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub settings: BlockSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShapeOptions {
    /// Left indent amount and the number of leading lines it applies to.
    pub indent_left: Option<(Pt, u32)>,
}

/// One line of a laid-out unit. `baseline` is measured down from the
/// unit's top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub dx: Pt,
    pub baseline: Pt,
    pub text: String,
}

/// A measured, drawable vertical unit returned by the typesetter.
/// `height` spans the top edge to the final baseline; `depth` is the
/// descent below it.
#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutText {
    pub height: Pt,
    pub depth: Pt,
    pub font_name: String,
    pub font_size: Pt,
    pub lines: Vec<PlacedLine>,
}

pub trait Typesetter {
    fn shape(
        &self,
        block: &TextBlock,
        width: Pt,
        options: &ShapeOptions,
    ) -> Result<LaidOutText, TypeflowError>;
}

fn shape_options(settings: &BlockSettings) -> ShapeOptions {
    ShapeOptions {
        indent_left: settings
            .indent_left
            .map(|indent| (indent, settings.indent_left_rows.unwrap_or(1))),
    }
}

/// Places blocks top-to-bottom starting at (x, y), collapsing adjacent
/// vertical margins: the gap between two blocks is the larger of the
/// first's margin_bottom and the second's margin_top, never their sum.
/// The last block still applies its own margin_bottom. Fails fast on the
/// first shaping error; blocks already placed stay on the canvas.
/// Returns the final cursor position.
pub fn place_blocks(
    blocks: &[TextBlock],
    width: Pt,
    x: Pt,
    mut y: Pt,
    typesetter: &dyn Typesetter,
    canvas: &mut Canvas,
) -> Result<Pt, TypeflowError> {
    for (i, block) in blocks.iter().enumerate() {
        let options = shape_options(&block.settings);
        let unit = typesetter.shape(block, width, &options)?;
        canvas.place_at(x, y, &unit);
        y -= unit.height + unit.depth;

        let mut gap = block.settings.margin_bottom.unwrap_or(Pt::ZERO);
        if let Some(next) = blocks.get(i + 1) {
            gap = gap.max(next.settings.margin_top.unwrap_or(Pt::ZERO));
        }
        y -= gap;
    }
    Ok(y)
}
