use crate::error::TypeflowError;
use crate::flow::BlockSettings;
use crate::geometry::PageStyle;
use crate::types::Pt;
use lightningcss::properties::Property;
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::traits::ToCss;

/// Cumulative stylesheet. Each `add_css` call parses one CSS chunk and
/// folds its rules into the set: the default `@page` record (raw length
/// literals, consumed later by the dimension resolver) and per-tag block
/// rules for the settings keys the flow placer understands.
#[derive(Default)]
pub struct StyleSet {
    default_page: Option<PageStyle>,
    block_rules: Vec<(String, BlockSettings)>,
}

impl StyleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_css(&mut self, css: &str) -> Result<(), TypeflowError> {
        let sheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|err| TypeflowError::Style(err.to_string()))?;
        for rule in &sheet.rules.0 {
            match rule {
                CssRule::Page(page) => {
                    if !page_rule_targets_default(page) {
                        continue;
                    }
                    let mut style = self.default_page.take().unwrap_or_default();
                    for property in page
                        .declarations
                        .declarations
                        .iter()
                        .chain(&page.declarations.important_declarations)
                    {
                        apply_page_property(property, &mut style);
                    }
                    self.default_page = Some(style);
                }
                CssRule::Style(style) => {
                    let mut settings = BlockSettings::default();
                    for property in style
                        .declarations
                        .declarations
                        .iter()
                        .chain(&style.declarations.important_declarations)
                    {
                        apply_block_property(property, &mut settings);
                    }
                    if settings == BlockSettings::default() {
                        continue;
                    }
                    let selectors = style
                        .selectors
                        .to_css_string(PrinterOptions::default())
                        .unwrap_or_default();
                    for selector in selectors.split(',') {
                        let tag = selector.trim().to_ascii_lowercase();
                        if !tag.is_empty() && tag.chars().all(|ch| ch.is_ascii_alphanumeric()) {
                            self.block_rules.push((tag, settings));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn default_page(&self) -> Option<&PageStyle> {
        self.default_page.as_ref()
    }

    /// Folds all rules matching the tag, in submission order.
    pub fn settings_for(&self, tag: &str) -> BlockSettings {
        let mut settings = BlockSettings::default();
        for (rule_tag, rule_settings) in &self.block_rules {
            if rule_tag == tag {
                settings = settings.merge(*rule_settings);
            }
        }
        settings
    }
}

fn page_rule_targets_default(rule: &lightningcss::rules::page::PageRule) -> bool {
    if rule.selectors.is_empty() {
        return true;
    }
    rule.selectors
        .iter()
        .any(|selector| selector.name.is_none() && selector.pseudo_classes.is_empty())
}

fn property_literal(property: &Property) -> Option<String> {
    property
        .value_to_css_string(PrinterOptions::default())
        .ok()
        .map(|value| value.trim().to_string())
}

fn apply_page_property(property: &Property, style: &mut PageStyle) {
    let name = property.property_id().name().to_ascii_lowercase();
    let Some(literal) = property_literal(property) else {
        return;
    };
    match name.as_str() {
        "size" => style.papersize = literal,
        "margin" => {
            let values: Vec<&str> = literal.split_whitespace().collect();
            let (top, right, bottom, left) = match values.as_slice() {
                [all] => (*all, *all, *all, *all),
                [tb, lr] => (*tb, *lr, *tb, *lr),
                [top, lr, bottom] => (*top, *lr, *bottom, *lr),
                [top, right, bottom, left, ..] => (*top, *right, *bottom, *left),
                [] => return,
            };
            style.margin_top = top.to_string();
            style.margin_right = right.to_string();
            style.margin_bottom = bottom.to_string();
            style.margin_left = left.to_string();
        }
        "margin-top" => style.margin_top = literal,
        "margin-right" => style.margin_right = literal,
        "margin-bottom" => style.margin_bottom = literal,
        "margin-left" => style.margin_left = literal,
        _ => {}
    }
}

fn apply_block_property(property: &Property, settings: &mut BlockSettings) {
    let name = property.property_id().name().to_ascii_lowercase();
    let Some(literal) = property_literal(property) else {
        return;
    };
    match name.as_str() {
        // Relative units (em, %) are outside the placer's contract and
        // are ignored rather than rejected.
        "margin-top" => {
            if let Ok(value) = Pt::parse(&literal) {
                settings.margin_top = Some(value);
            }
        }
        "margin-bottom" => {
            if let Ok(value) = Pt::parse(&literal) {
                settings.margin_bottom = Some(value);
            }
        }
        "margin" => {
            let values: Vec<&str> = literal.split_whitespace().collect();
            let (top, bottom) = match values.as_slice() {
                [all] => (*all, *all),
                [tb, _lr] => (*tb, *tb),
                [top, _lr, bottom, ..] => (*top, *bottom),
                [] => return,
            };
            if let Ok(value) = Pt::parse(top) {
                settings.margin_top = Some(value);
            }
            if let Ok(value) = Pt::parse(bottom) {
                settings.margin_bottom = Some(value);
            }
        }
        "text-indent" => {
            if let Ok(value) = Pt::parse(&literal) {
                settings.indent_left = Some(value);
            }
        }
        "--typeflow-indent-rows" => {
            if let Ok(rows) = literal.parse::<u32>() {
                settings.indent_left_rows = Some(rows);
            }
        }
        _ => {}
    }
}
