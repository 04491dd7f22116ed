use std::io::Write as _;

use super::{Block, Photo, ProfileDocument, ProfileRenderer, RenderError};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const PHOTO_SIZE: f32 = 100.0;
const REGULAR: &str = "F1";
const BOLD: &str = "F2";

/// Writes profiles as A4 PDF 1.4 using the built-in Helvetica faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl ProfileRenderer for PdfRenderer {
    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn render(&self, document: &ProfileDocument) -> Result<Vec<u8>, RenderError> {
        let mut layout = Layout::default();
        for block in &document.blocks {
            layout.place(block);
        }
        let (pages, photos) = layout.finish();
        assemble(&pages, &photos).map_err(|err| RenderError::Output(err.to_string()))
    }
}

struct TextRun {
    font: &'static str,
    size: f32,
    x: f32,
    y: f32,
    text: String,
}

/// Bottom-left corner of a photo; `photo` indexes the document's photo list.
struct Placement {
    photo: usize,
    x: f32,
    y: f32,
}

#[derive(Default)]
struct Page {
    runs: Vec<TextRun>,
    photos: Vec<Placement>,
}

/// Flows blocks top to bottom, starting a new page when one fills up.
struct Layout<'a> {
    pages: Vec<Page>,
    photos: Vec<&'a Photo>,
    y: f32,
}

impl Default for Layout<'_> {
    fn default() -> Self {
        Self {
            pages: vec![Page::default()],
            photos: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }
}

impl<'a> Layout<'a> {
    fn place(&mut self, block: &'a Block) {
        match block {
            Block::Title(text) => {
                let width = approx_width(text, 18.0);
                let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
                self.run(BOLD, 18.0, x, text, 36.0);
            }
            Block::Photo(photo) => {
                self.ensure_room(PHOTO_SIZE + 10.0);
                let placement = Placement {
                    photo: self.photos.len(),
                    x: (PAGE_WIDTH - PHOTO_SIZE) / 2.0,
                    y: self.y - PHOTO_SIZE,
                };
                self.photos.push(photo);
                self.current().photos.push(placement);
                self.y -= PHOTO_SIZE + 10.0;
            }
            Block::Heading(text) => {
                self.gap(12.0);
                self.run(BOLD, 14.0, MARGIN, text, 22.0);
            }
            Block::Line(text) => self.run(REGULAR, 12.0, MARGIN, text, 18.0),
            Block::Paragraph(text) => {
                for line in wrap(text, 12.0, PAGE_WIDTH - 2.0 * MARGIN) {
                    self.run(REGULAR, 12.0, MARGIN, &line, 16.0);
                }
            }
            Block::Table { headers, rows } => {
                let columns = headers.len().max(1);
                let column_width = (PAGE_WIDTH - 2.0 * MARGIN) / columns as f32;
                self.row(BOLD, headers, column_width);
                for row in rows {
                    self.row(REGULAR, row, column_width);
                }
                self.gap(8.0);
            }
        }
    }

    fn row(&mut self, font: &'static str, cells: &[String], column_width: f32) {
        self.ensure_room(20.0);
        let y = self.y;
        for (index, cell) in cells.iter().enumerate() {
            let x = MARGIN + index as f32 * column_width;
            let text = clip(cell, 10.0, column_width - 6.0);
            self.current().runs.push(TextRun {
                font,
                size: 10.0,
                x,
                y,
                text,
            });
        }
        self.y -= 20.0;
    }

    fn run(&mut self, font: &'static str, size: f32, x: f32, text: &str, advance: f32) {
        self.ensure_room(advance);
        let y = self.y;
        self.current().runs.push(TextRun {
            font,
            size,
            x,
            y,
            text: text.to_string(),
        });
        self.y -= advance;
    }

    fn gap(&mut self, amount: f32) {
        self.y -= amount;
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < MARGIN {
            self.pages.push(Page::default());
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn current(&mut self) -> &mut Page {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn finish(self) -> (Vec<Page>, Vec<&'a Photo>) {
        (self.pages, self.photos)
    }
}

/// Helvetica averages a little over half an em per glyph.
fn approx_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.52
}

fn clip(text: &str, size: f32, width: f32) -> String {
    let max_chars = (width / (size * 0.52)).floor().max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    clipped.push('~');
    clipped
}

fn wrap(text: &str, size: f32, width: f32) -> Vec<String> {
    let max_chars = (width / (size * 0.52)).floor().max(1.0) as usize;
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > max_chars {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    lines
}

/// Escapes PDF string delimiters and writes non-ASCII as WinAnsi octal codes.
///
/// Characters the encoding lacks become `?`.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '(' | ')' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            ' '..='~' => escaped.push(ch),
            _ => match win_ansi(ch) {
                Some(code) => escaped.push_str(&format!("\\{code:03o}")),
                None => escaped.push('?'),
            },
        }
    }
    escaped
}

fn win_ansi(ch: char) -> Option<u8> {
    match ch {
        '\u{a0}'..='\u{ff}' => u8::try_from(u32::from(ch)).ok(),
        '\u{20ac}' => Some(0x80),
        '\u{201a}' => Some(0x82),
        '\u{0192}' => Some(0x83),
        '\u{201e}' => Some(0x84),
        '\u{2026}' => Some(0x85),
        '\u{2020}' => Some(0x86),
        '\u{2021}' => Some(0x87),
        '\u{02c6}' => Some(0x88),
        '\u{2030}' => Some(0x89),
        '\u{0160}' => Some(0x8a),
        '\u{2039}' => Some(0x8b),
        '\u{0152}' => Some(0x8c),
        '\u{017d}' => Some(0x8e),
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201c}' => Some(0x93),
        '\u{201d}' => Some(0x94),
        '\u{2022}' => Some(0x95),
        '\u{2013}' => Some(0x96),
        '\u{2014}' => Some(0x97),
        '\u{02dc}' => Some(0x98),
        '\u{2122}' => Some(0x99),
        '\u{0161}' => Some(0x9a),
        '\u{203a}' => Some(0x9b),
        '\u{0153}' => Some(0x9c),
        '\u{017e}' => Some(0x9e),
        '\u{0178}' => Some(0x9f),
        _ => None,
    }
}

fn content_stream(page: &Page) -> String {
    let mut stream = String::new();
    for placement in &page.photos {
        stream.push_str(&format!(
            "q {PHOTO_SIZE:.2} 0 0 {PHOTO_SIZE:.2} {:.2} {:.2} cm /Im{} Do Q\n",
            placement.x,
            placement.y,
            placement.photo + 1
        ));
    }
    for run in &page.runs {
        stream.push_str(&format!(
            "BT /{} {:.1} Tf {:.2} {:.2} Td ({}) Tj ET\n",
            run.font,
            run.size,
            run.x,
            run.y,
            escape(&run.text)
        ));
    }
    stream
}

fn image_object(photo: &Photo) -> Vec<u8> {
    let color_space = match photo.components {
        1 => "/DeviceGray",
        4 => "/DeviceCMYK",
        _ => "/DeviceRGB",
    };
    let mut body = format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {color_space} \
         /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>\nstream\n",
        photo.width,
        photo.height,
        photo.data.len()
    )
    .into_bytes();
    body.extend_from_slice(&photo.data);
    body.extend_from_slice(b"\nendstream");
    body
}

/// Serializes pages into a complete file with a cross-reference table.
fn assemble(pages: &[Page], photos: &[&Photo]) -> std::io::Result<Vec<u8>> {
    // 1 catalog, 2 page tree, 3-4 fonts, a (page, contents) pair per page, then photos.
    let page_object = |index: usize| 5 + index * 2;
    let photo_object = |index: usize| 5 + pages.len() * 2 + index;
    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(4 + pages.len() * 2 + photos.len());

    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    let kids = (0..pages.len())
        .map(|index| format!("{} 0 R", page_object(index)))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(
        format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()).into_bytes(),
    );
    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );
    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );

    let x_objects = if photos.is_empty() {
        String::new()
    } else {
        let entries = (0..photos.len())
            .map(|index| format!("/Im{} {} 0 R", index + 1, photo_object(index)))
            .collect::<Vec<_>>()
            .join(" ");
        format!(" /XObject << {entries} >>")
    };

    for (index, page) in pages.iter().enumerate() {
        let contents = page_object(index) + 1;
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /{REGULAR} 3 0 R /{BOLD} 4 0 R >>{x_objects} >> \
                 /Contents {contents} 0 R >>"
            )
            .into_bytes(),
        );
        let stream = content_stream(page);
        objects.push(
            format!("<< /Length {} >>\nstream\n{stream}endstream", stream.len()).into_bytes(),
        );
    }
    objects.extend(photos.iter().map(|photo| image_object(photo)));

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        write!(out, "{} 0 obj\n", index + 1)?;
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = out.len();
    write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1)?;
    for offset in offsets {
        write!(out, "{offset:010} 00000 n \n")?;
    }
    write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    )?;

    Ok(out)
}
