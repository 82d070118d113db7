use crate::flow::LaidOutText;
use crate::types::{Pt, Size};

/// Drawing commands recorded per page. Coordinates are PDF-native:
/// origin bottom-left, y grows upward.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetFontName(String),
    SetFontSize(Pt),
    DrawString { x: Pt, y: Pt, text: String },
}

#[derive(Debug, Clone)]
pub struct Page {
    pub size: Size,
    pub commands: Vec<Command>,
}

/// The page sink. Owns the physical pages, the document-wide default
/// page size used when a page is created, and the drawing state. It has
/// no undo: content placed before a failed call stays drawn.
pub struct Canvas {
    default_page_size: Size,
    pages: Vec<Page>,
    current: Option<Page>,
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            default_page_size: Size {
                width: Pt::ZERO,
                height: Pt::ZERO,
            },
            pages: Vec::new(),
            current: None,
        }
    }

    pub fn set_default_page_size(&mut self, size: Size) {
        self.default_page_size = size;
    }

    /// Opens a new current page with the document-wide default size.
    pub fn new_page(&mut self) {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        self.current = Some(Page {
            size: self.default_page_size,
            commands: Vec::new(),
        });
    }

    /// Draws a laid-out unit with its top edge at (x, y).
    pub fn place_at(&mut self, x: Pt, y: Pt, unit: &LaidOutText) {
        if self.current.is_none() {
            self.new_page();
        }
        let Some(page) = self.current.as_mut() else {
            return;
        };
        page.commands
            .push(Command::SetFontName(unit.font_name.clone()));
        page.commands.push(Command::SetFontSize(unit.font_size));
        for line in &unit.lines {
            page.commands.push(Command::DrawString {
                x: x + line.dx,
                y: y - line.baseline,
                text: line.text.clone(),
            });
        }
    }

    /// Finalizes the current page into the shipped page list.
    pub fn ship(&mut self) {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub(crate) fn current_commands(&self) -> &[Command] {
        match &self.current {
            Some(page) => &page.commands,
            None => &[],
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}
