use crate::types::PageDimensions;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// JSONL trace of a document's lifecycle: one `page_setup` event when
/// geometry is resolved, one `place` event per placement call, and a
/// closing `summary`. Events are informational only; error paths never
/// depend on the trace being present.
pub(crate) struct TraceLog {
    writer: BufWriter<File>,
    css_chunks: u64,
    place_calls: u64,
    placed_blocks: u64,
    failed_places: u64,
}

impl TraceLog {
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            css_chunks: 0,
            place_calls: 0,
            placed_blocks: 0,
            failed_places: 0,
        })
    }

    pub fn css_submitted(&mut self) {
        self.css_chunks += 1;
    }

    pub fn page_setup(&mut self, dims: &PageDimensions) {
        let _ = writeln!(
            self.writer,
            "{{\"type\":\"page_setup\",\"width\":{:.3},\"height\":{:.3},\
             \"margin_top\":{:.3},\"margin_right\":{:.3},\
             \"margin_bottom\":{:.3},\"margin_left\":{:.3}}}",
            dims.width.to_f32(),
            dims.height.to_f32(),
            dims.margin_top.to_f32(),
            dims.margin_right.to_f32(),
            dims.margin_bottom.to_f32(),
            dims.margin_left.to_f32()
        );
    }

    pub fn placement(&mut self, blocks: usize, ok: bool) {
        self.place_calls += 1;
        self.placed_blocks += blocks as u64;
        if !ok {
            self.failed_places += 1;
        }
        let _ = writeln!(
            self.writer,
            "{{\"type\":\"place\",\"blocks\":{},\"ok\":{}}}",
            blocks, ok
        );
    }

    pub fn finish(&mut self) {
        let _ = writeln!(
            self.writer,
            "{{\"type\":\"summary\",\"css_chunks\":{},\"place_calls\":{},\
             \"placed_blocks\":{},\"failed_places\":{}}}",
            self.css_chunks, self.place_calls, self.placed_blocks, self.failed_places
        );
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pt;

    fn dims() -> PageDimensions {
        PageDimensions {
            width: Pt::from_f32(595.0),
            height: Pt::from_f32(842.0),
            margin_left: Pt::from_f32(28.0),
            margin_right: Pt::from_f32(28.0),
            margin_top: Pt::from_f32(28.0),
            margin_bottom: Pt::from_f32(28.0),
        }
    }

    #[test]
    fn trace_records_events_and_a_summary() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "typeflow_trace_{}_{}.jsonl",
            std::process::id(),
            nanos
        ));
        let mut trace = TraceLog::new(&path).unwrap();
        trace.css_submitted();
        trace.page_setup(&dims());
        trace.placement(3, true);
        trace.placement(1, false);
        trace.finish();

        let log = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("\"type\":\"page_setup\""));
        assert!(lines[0].contains("\"width\":595.000"));
        assert!(lines[1].contains("\"blocks\":3"));
        assert!(lines[2].contains("\"ok\":false"));
        assert!(lines[3].contains("\"css_chunks\":1"));
        assert!(lines[3].contains("\"placed_blocks\":4"));
        assert!(lines[3].contains("\"failed_places\":1"));
        let _ = std::fs::remove_file(path);
    }
}
