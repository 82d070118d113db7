mod canvas;
mod debug;
mod error;
mod flow;
mod font;
mod geometry;
mod html;
mod pdf;
mod style;
mod typeset;
mod types;

pub use canvas::{Canvas, Command, Page};
use debug::TraceLog;
pub use error::TypeflowError;
pub use flow::{
    BlockSettings, LaidOutText, PlacedLine, ShapeOptions, TextBlock, Typesetter, place_blocks,
};
pub use font::FontRegistry;
pub use geometry::{PageStyle, papersize_literals, resolve_page_dimensions};
pub use style::StyleSet;
pub use typeset::ParagraphShaper;
pub use types::{PageDimensions, Pt, Size};

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Page lifecycle of a document. The only transition is
/// `Uninitialized -> Active`, taken by the first successful
/// `ensure_page`; geometry is never re-resolved afterwards.
enum PageState {
    Uninitialized,
    Active(PageDimensions),
}

/// The main starting point of PDF generation: accumulates CSS, places
/// HTML fragments at absolute page coordinates and writes the result on
/// `finish`. A document is single-owner and fully synchronous.
pub struct Document {
    pub title: String,
    pub author: String,
    // Separated by comma.
    pub keywords: String,
    pub creator: String,
    pub subject: String,
    styles: StyleSet,
    page_state: PageState,
    canvas: Canvas,
    pending: Vec<TextBlock>,
    font_registry: Arc<FontRegistry>,
    font_name: String,
    font_size: Pt,
    custom_typesetter: Option<Box<dyn Typesetter>>,
    writer: Box<dyn Write>,
    debug: Option<TraceLog>,
}

impl Document {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, TypeflowError> {
        let file = std::fs::File::create(path)?;
        Ok(Self::with_writer(file))
    }

    pub fn with_writer(writer: impl Write + 'static) -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            keywords: String::new(),
            creator: String::new(),
            subject: String::new(),
            styles: StyleSet::new(),
            page_state: PageState::Uninitialized,
            canvas: Canvas::new(),
            pending: Vec::new(),
            font_registry: Arc::new(FontRegistry::new()),
            font_name: "Helvetica".to_string(),
            font_size: Pt::from_f32(10.0),
            custom_typesetter: None,
            writer: Box::new(writer),
            debug: None,
        }
    }

    /// Mirrors placement and page-setup events into a JSONL file.
    pub fn with_debug_log(mut self, path: impl AsRef<Path>) -> Result<Self, TypeflowError> {
        self.debug = Some(TraceLog::new(path)?);
        Ok(self)
    }

    /// Selects the font used by the built-in typesetter. The name must
    /// match a registered face to get real metrics; unknown names fall
    /// back to the approximate ones.
    pub fn set_font(&mut self, name: impl Into<String>, size: Pt) {
        self.font_name = name.into();
        self.font_size = size;
    }

    /// Replaces the built-in typesetter, e.g. with an external shaping
    /// service.
    pub fn set_typesetter(&mut self, typesetter: Box<dyn Typesetter>) {
        self.custom_typesetter = Some(typesetter);
    }

    /// Registers font metrics for the built-in typesetter. Only usable
    /// before the first placement call.
    pub fn register_font_file(&mut self, path: impl AsRef<Path>) {
        if let Some(registry) = Arc::get_mut(&mut self.font_registry) {
            registry.register_file(path);
        }
    }

    pub fn register_font_dir(&mut self, path: impl AsRef<Path>) {
        if let Some(registry) = Arc::get_mut(&mut self.font_registry) {
            registry.register_dir(path);
        }
    }

    /// Adds CSS instructions to the stylesheet. Cumulative.
    pub fn add_css(&mut self, css: &str) -> Result<(), TypeflowError> {
        self.styles.add_css(css)?;
        if let Some(trace) = &mut self.debug {
            trace.css_submitted();
        }
        Ok(())
    }

    /// Resolves page geometry and opens the first page if none exists
    /// yet. Idempotent; on failure nothing is committed, so a later call
    /// with a corrected stylesheet can still succeed.
    pub fn ensure_page(&mut self) -> Result<PageDimensions, TypeflowError> {
        if let PageState::Active(dims) = self.page_state {
            return Ok(dims);
        }
        let dims = resolve_page_dimensions(self.styles.default_page())?;
        self.canvas.set_default_page_size(Size {
            width: dims.width,
            height: dims.height,
        });
        self.canvas.new_page();
        self.page_state = PageState::Active(dims);
        if let Some(trace) = &mut self.debug {
            trace.page_setup(&dims);
        }
        Ok(dims)
    }

    /// Returns the dimensions of the current page, resolving them
    /// lazily on first use.
    pub fn page_size(&mut self) -> Result<PageDimensions, TypeflowError> {
        self.ensure_page()
    }

    /// Writes an HTML fragment to the page: parses it into styled text
    /// blocks, queues them, and places the queue top-to-bottom starting
    /// at (x, y) within the given column width. The queue drains on
    /// every exit path; a failed placement never leaks blocks into a
    /// later call, and blocks drawn before the failure stay on the page.
    pub fn output_at(
        &mut self,
        html: &str,
        width: Pt,
        x: Pt,
        y: Pt,
    ) -> Result<(), TypeflowError> {
        self.ensure_page()?;
        let blocks = html::fragment_to_blocks(html, &self.styles)?;
        self.pending.extend(blocks);
        let pending = std::mem::take(&mut self.pending);

        let built_in;
        let typesetter: &dyn Typesetter = match &self.custom_typesetter {
            Some(custom) => custom.as_ref(),
            None => {
                built_in = ParagraphShaper::new(self.font_registry.clone())
                    .with_font(self.font_name.clone(), self.font_size);
                &built_in
            }
        };
        let result = place_blocks(&pending, width, x, y, typesetter, &mut self.canvas);
        if let Some(trace) = &mut self.debug {
            trace.placement(pending.len(), result.is_ok());
        }
        result.map(|_| ())
    }

    /// Writes metadata, ships the current page and serializes the PDF.
    /// Consuming `self` makes a second finish unrepresentable.
    pub fn finish(mut self) -> Result<(), TypeflowError> {
        self.ensure_page()?;
        self.canvas.ship();
        let meta = pdf::Metadata {
            title: self.title,
            author: self.author,
            keywords: self.keywords,
            creator: self.creator,
            subject: self.subject,
        };
        pdf::write_document(&self.canvas, &meta, &mut self.writer)?;
        self.writer.flush()?;
        if let Some(trace) = &mut self.debug {
            trace.finish();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct CountingTypesetter {
        shaped: Rc<RefCell<Vec<String>>>,
        fail_on: Option<String>,
    }

    impl Typesetter for CountingTypesetter {
        fn shape(
            &self,
            block: &TextBlock,
            _width: Pt,
            _options: &ShapeOptions,
        ) -> Result<LaidOutText, TypeflowError> {
            if self.fail_on.as_deref() == Some(block.text.as_str()) {
                return Err(TypeflowError::Shaping(block.text.clone()));
            }
            self.shaped.borrow_mut().push(block.text.clone());
            Ok(LaidOutText {
                height: Pt::from_f32(10.0),
                depth: Pt::from_f32(2.0),
                font_name: "Helvetica".to_string(),
                font_size: Pt::from_f32(10.0),
                lines: vec![PlacedLine {
                    dx: Pt::ZERO,
                    baseline: Pt::from_f32(8.0),
                    text: block.text.clone(),
                }],
            })
        }
    }

    fn doc_with_counter(
        fail_on: Option<&str>,
    ) -> (Document, Rc<RefCell<Vec<String>>>) {
        let shaped = Rc::new(RefCell::new(Vec::new()));
        let mut doc = Document::with_writer(Vec::new());
        doc.set_typesetter(Box::new(CountingTypesetter {
            shaped: shaped.clone(),
            fail_on: fail_on.map(|s| s.to_string()),
        }));
        (doc, shaped)
    }

    #[test]
    fn page_geometry_defaults_to_a4_with_one_cm_margins() {
        let mut doc = Document::with_writer(Vec::new());
        let dims = doc.page_size().unwrap();
        assert_eq!(dims.width, Pt::parse("210mm").unwrap());
        assert_eq!(dims.height, Pt::parse("297mm").unwrap());
        assert_eq!(dims.margin_top, Pt::parse("1cm").unwrap());
        assert_eq!(dims.margin_bottom, Pt::parse("1cm").unwrap());
        assert_eq!(dims.margin_left, Pt::parse("1cm").unwrap());
        assert_eq!(dims.margin_right, Pt::parse("1cm").unwrap());
    }

    #[test]
    fn geometry_is_resolved_exactly_once() {
        let mut doc = Document::with_writer(Vec::new());
        doc.add_css("@page { margin-top: 3cm; }").unwrap();
        let first = doc.page_size().unwrap();
        // Style mutations after the first resolution have no effect.
        doc.add_css("@page { margin-top: 5cm; size: letter; }")
            .unwrap();
        let second = doc.page_size().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.margin_top, Pt::parse("3cm").unwrap());
    }

    #[test]
    fn malformed_page_style_fails_and_commits_nothing() {
        let mut doc = Document::with_writer(Vec::new());
        doc.add_css("@page { margin-top: 2vw; }").unwrap();
        let err = doc.page_size().unwrap_err();
        assert!(matches!(err, TypeflowError::Parse(_)));
        // A corrected stylesheet can still resolve.
        doc.add_css("@page { margin-top: 2cm; }").unwrap();
        let dims = doc.page_size().unwrap();
        assert_eq!(dims.margin_top, Pt::parse("2cm").unwrap());
    }

    #[test]
    fn pending_queue_drains_exactly_once() {
        let (mut doc, shaped) = doc_with_counter(None);
        doc.output_at("<p>one</p><p>two</p>", Pt::from_f32(400.0), Pt::ZERO, Pt::from_f32(800.0))
            .unwrap();
        assert_eq!(shaped.borrow().len(), 2);
        doc.output_at("<p>three</p>", Pt::from_f32(400.0), Pt::ZERO, Pt::from_f32(700.0))
            .unwrap();
        // No replays of earlier submissions.
        assert_eq!(*shaped.borrow(), vec!["one", "two", "three"]);
    }

    #[test]
    fn failed_placement_does_not_leak_queued_blocks() {
        let (mut doc, shaped) = doc_with_counter(Some("boom"));
        let err = doc
            .output_at(
                "<p>ok</p><p>boom</p><p>after</p>",
                Pt::from_f32(400.0),
                Pt::ZERO,
                Pt::from_f32(800.0),
            )
            .unwrap_err();
        assert!(matches!(err, TypeflowError::Shaping(_)));
        assert_eq!(*shaped.borrow(), vec!["ok"]);
        doc.output_at("<p>fresh</p>", Pt::from_f32(400.0), Pt::ZERO, Pt::from_f32(700.0))
            .unwrap();
        assert_eq!(*shaped.borrow(), vec!["ok", "fresh"]);
    }

    #[test]
    fn single_block_is_drawn_at_the_requested_coordinate() {
        // No default page style: geometry must come out as A4 with 1cm
        // margins, and the block's first line lands one baseline below
        // the placement coordinate.
        let (mut doc, _shaped) = doc_with_counter(None);
        doc.output_at("<p>x</p>", Pt::from_f32(400.0), Pt::ZERO, Pt::from_f32(800.0))
            .unwrap();
        let dims = doc.page_size().unwrap();
        assert_eq!(dims.width, Pt::parse("210mm").unwrap());
        assert_eq!(dims.height, Pt::parse("297mm").unwrap());
        let drawn: Vec<_> = doc
            .canvas
            .current_commands()
            .iter()
            .filter_map(|cmd| match cmd {
                Command::DrawString { x, y, text } => Some((*x, *y, text.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            drawn,
            vec![(Pt::ZERO, Pt::from_f32(792.0), "x".to_string())]
        );
    }

    #[test]
    fn finish_writes_metadata_and_a_page() {
        let buffer: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));

        struct SharedWriter(Rc<RefCell<Vec<u8>>>);
        impl Write for SharedWriter {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.borrow_mut().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut doc = Document::with_writer(SharedWriter(buffer.clone()));
        doc.title = "Report".to_string();
        doc.author = "typeflow".to_string();
        doc.keywords = "a,b".to_string();
        doc.output_at(
            "<p>hello world</p>",
            Pt::from_f32(400.0),
            Pt::from_f32(72.0),
            Pt::from_f32(780.0),
        )
        .unwrap();
        doc.finish().unwrap();

        let bytes = buffer.borrow();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.7"));
        assert!(text.contains("/Title (Report)"));
        assert!(text.contains("/Author (typeflow)"));
        assert!(text.contains("/Keywords (a,b)"));
        assert!(text.contains("(hello world) Tj"));
        assert!(text.contains("/Count 1"));
    }

    #[test]
    fn finish_without_content_still_produces_one_page() {
        let buffer: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));

        struct SharedWriter(Rc<RefCell<Vec<u8>>>);
        impl Write for SharedWriter {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.borrow_mut().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let doc = Document::with_writer(SharedWriter(buffer.clone()));
        doc.finish().unwrap();
        let bytes = buffer.borrow();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Count 1"));
    }

    #[test]
    fn debug_log_records_page_setup_and_placement() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "typeflow_doc_log_{}_{}.jsonl",
            std::process::id(),
            nanos
        ));
        let mut doc = Document::with_writer(Vec::new())
            .with_debug_log(&path)
            .unwrap();
        doc.output_at("<p>logged</p>", Pt::from_f32(400.0), Pt::ZERO, Pt::from_f32(800.0))
            .unwrap();
        doc.finish().unwrap();
        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.contains("\"type\":\"page_setup\""));
        assert!(log.contains("\"type\":\"place\""));
        assert!(log.contains("\"placed_blocks\":1"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn selected_font_flows_into_the_drawn_commands() {
        let mut doc = Document::with_writer(Vec::new());
        doc.set_font("Custom Sans", Pt::from_f32(14.0));
        doc.output_at("<p>t</p>", Pt::from_f32(400.0), Pt::ZERO, Pt::from_f32(800.0))
            .unwrap();
        let commands = doc.canvas.current_commands();
        assert!(commands.contains(&Command::SetFontName("Custom Sans".to_string())));
        assert!(commands.contains(&Command::SetFontSize(Pt::from_f32(14.0))));
    }
}
