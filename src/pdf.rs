use crate::canvas::{Canvas, Command};
use crate::types::Pt;
use std::io::{self, Write};

#[derive(Debug, Clone, Default)]
pub(crate) struct Metadata {
    pub title: String,
    pub author: String,
    // Comma-separated.
    pub keywords: String,
    pub creator: String,
    pub subject: String,
}

/// Serializes shipped pages into a single-font PDF 1.7 file. Text is
/// drawn with the base-14 Helvetica resource regardless of the font
/// name recorded on the canvas; embedding arbitrary font programs is a
/// non-goal of this writer.
pub(crate) fn write_document<W: Write>(
    canvas: &Canvas,
    meta: &Metadata,
    writer: W,
) -> io::Result<()> {
    let mut pdf = PdfWriter::new(writer);
    pdf.write_all(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n")?;

    let pages = canvas.pages();
    // 1 catalog, 2 pages root, 3 font, then (content, page) per page,
    // finally the info dictionary.
    let catalog_id = 1;
    let pages_id = 2;
    let font_id = 3;
    let first_page_id = 4;
    let info_id = first_page_id + pages.len() * 2;

    pdf.write_object(catalog_id, "<< /Type /Catalog /Pages 2 0 R >>")?;

    let kids = (0..pages.len())
        .map(|i| format!("{} 0 R", first_page_id + i * 2 + 1))
        .collect::<Vec<_>>()
        .join(" ");
    pdf.write_object(
        pages_id,
        &format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages.len()),
    )?;

    pdf.write_object(
        font_id,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    )?;

    for (index, page) in pages.iter().enumerate() {
        let content_id = first_page_id + index * 2;
        let page_id = content_id + 1;
        let stream = render_commands(&page.commands);
        pdf.begin_object(content_id)?;
        pdf.write_all(format!("<< /Length {} >>\nstream\n", stream.len()).as_bytes())?;
        pdf.write_all(stream.as_bytes())?;
        pdf.write_all(b"endstream\nendobj\n")?;
        pdf.write_object(
            page_id,
            &format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 {} 0 R >> >> /Contents {} 0 R >>",
                fmt_pt(page.size.width),
                fmt_pt(page.size.height),
                font_id,
                content_id
            ),
        )?;
    }

    let mut info = String::from("<<");
    for (key, value) in [
        ("Title", &meta.title),
        ("Author", &meta.author),
        ("Keywords", &meta.keywords),
        ("Creator", &meta.creator),
        ("Subject", &meta.subject),
    ] {
        if !value.is_empty() {
            info.push_str(&format!(" /{} ({})", key, escape_string(value)));
        }
    }
    info.push_str(" >>");
    pdf.write_object(info_id, &info)?;

    pdf.write_xref_and_trailer(catalog_id, info_id)
}

fn render_commands(commands: &[Command]) -> String {
    let mut out = String::new();
    let mut font_size = Pt::from_f32(10.0);
    for command in commands {
        match command {
            // A single base-14 resource backs every recorded font name.
            Command::SetFontName(_) => {}
            Command::SetFontSize(size) => font_size = *size,
            Command::DrawString { x, y, text } => {
                out.push_str(&format!(
                    "BT /F1 {} Tf {} {} Td ({}) Tj ET\n",
                    fmt_pt(font_size),
                    fmt_pt(*x),
                    fmt_pt(*y),
                    escape_string(text)
                ));
            }
        }
    }
    out
}

fn fmt_pt(value: Pt) -> String {
    let milli = value.to_milli_i64();
    if milli % 1000 == 0 {
        format!("{}", milli / 1000)
    } else {
        format!("{:.3}", milli as f64 / 1000.0)
    }
}

/// Escapes a string for a literal-string token. The target encoding is
/// WinAnsi, so every character must come out as exactly one byte:
/// printable ASCII verbatim, the rest of the code page as an octal
/// escape, anything unrepresentable as '?'.
fn escape_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => match winansi_byte(ch) {
                Some(byte @ 0x20..=0x7E) => out.push(byte as char),
                Some(byte) => out.push_str(&format!("\\{:03o}", byte)),
                None => out.push('?'),
            },
        }
    }
    out
}

/// WinAnsi (CP1252) code for a character: ASCII and Latin-1 map
/// directly, the 0x80..0x9F slots hold the Windows additions.
fn winansi_byte(ch: char) -> Option<u8> {
    match ch as u32 {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => Some(code as u8),
        _ => Some(match ch {
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => return None,
        }),
    }
}

struct PdfWriter<W: Write> {
    writer: W,
    written: u64,
    // offsets[n] is the byte offset of object n; slot 0 stays unused.
    offsets: Vec<u64>,
}

impl<W: Write> PdfWriter<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            offsets: vec![0],
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn begin_object(&mut self, obj_id: usize) -> io::Result<()> {
        if self.offsets.len() <= obj_id {
            self.offsets.resize(obj_id + 1, 0);
        }
        self.offsets[obj_id] = self.written;
        self.write_all(format!("{} 0 obj\n", obj_id).as_bytes())
    }

    fn write_object(&mut self, obj_id: usize, body: &str) -> io::Result<()> {
        self.begin_object(obj_id)?;
        self.write_all(body.as_bytes())?;
        self.write_all(b"\nendobj\n")
    }

    fn write_xref_and_trailer(&mut self, root_id: usize, info_id: usize) -> io::Result<()> {
        let count = self.offsets.len();
        let xref_offset = self.written;
        self.write_all(format!("xref\n0 {}\n", count).as_bytes())?;
        self.write_all(b"0000000000 65535 f \n")?;
        for index in 1..count {
            let offset = self.offsets[index];
            self.write_all(format!("{:010} 00000 n \n", offset).as_bytes())?;
        }
        self.write_all(
            format!(
                "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
                count, root_id, info_id, xref_offset
            )
            .as_bytes(),
        )?;
        self.writer.flush()
    }
}
