//! Paginated table PDF writer.
//!
//! Every sheet starts a new page with the sheet name as a title, followed by
//! a grid table: a filled head row with the headers, then one body row per
//! data row. Long tables continue on further pages and repeat the head.
//! Cell text wraps inside equal-width columns.
//!
//! Text uses the standard Helvetica fonts with WinAnsi encoding, so no font
//! is embedded; characters outside Latin-1 are written as `?`.

use std::fmt::Write as _;

use crate::types::{Sheet, Workbook};

/// Page geometry and table styling. Lengths are in points (1/72 inch).
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    pub title_font_size: f64,
    pub body_font_size: f64,
    pub cell_padding: f64,
    /// RGB fill of the head row.
    pub head_fill: [u8; 3],
}

impl Default for PdfOptions {
    /// A4 portrait.
    fn default() -> Self {
        Self {
            page_width: 595.28,
            page_height: 841.89,
            margin: 40.0,
            title_font_size: 16.0,
            body_font_size: 10.0,
            cell_padding: 5.0,
            head_fill: [41, 128, 185],
        }
    }
}

const LINE_SPACING: f64 = 1.15;
const TITLE_GAP: f64 = 10.0;
const GRID_GRAY: f64 = 0.78;

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

/// Width used for Latin-1 letters above ASCII.
const DEFAULT_WIDTH: u16 = 556;

fn glyph_width(byte: u8) -> f64 {
    let width = byte
        .checked_sub(32)
        .and_then(|i| HELVETICA_WIDTHS.get(usize::from(i)))
        .copied()
        .unwrap_or(DEFAULT_WIDTH);
    f64::from(width)
}

fn text_width(text: &[u8], size: f64) -> f64 {
    text.iter().map(|&b| glyph_width(b)).sum::<f64>() * size / 1000.0
}

/// Encode text as WinAnsi bytes. Returns the bytes and whether any character
/// had to be replaced.
fn encode_win_ansi(text: &str) -> (Vec<u8>, bool) {
    let mut replaced = false;
    let bytes = text
        .chars()
        .map(|c| match u32::from(c) {
            0x20..=0x7E | 0xA0..=0xFF => u8::try_from(u32::from(c)).unwrap_or(b'?'),
            0x09 | 0x0A | 0x0D => b' ',
            _ => {
                replaced = true;
                b'?'
            }
        })
        .collect();
    (bytes, replaced)
}

/// Break `text` into lines no wider than `max_width`, preferring spaces.
fn wrap(text: &[u8], max_width: f64, size: f64) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut line: Vec<u8> = Vec::new();
    for word in text.split(|&b| b == b' ') {
        let mut candidate = line.clone();
        if !candidate.is_empty() {
            candidate.push(b' ');
        }
        candidate.extend_from_slice(word);
        if text_width(&candidate, size) <= max_width {
            line = candidate;
            continue;
        }
        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        // Hard-break a word wider than the column.
        for &b in word {
            line.push(b);
            if text_width(&line, size) > max_width && line.len() > 1 {
                let last = line.pop().unwrap_or(b);
                lines.push(std::mem::replace(&mut line, vec![last]));
            }
        }
    }
    lines.push(line);
    lines
}

fn push_pdf_string(out: &mut Vec<u8>, text: &[u8]) {
    out.push(b'(');
    for &b in text {
        if matches!(b, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out.push(b')');
}

fn ops(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
}

/// Content stream of the page being filled.
struct PageCursor {
    content: Vec<u8>,
    /// Top edge of the next row.
    y: f64,
}

/// Lays out sheets into page content streams.
struct Layout<'a> {
    opts: &'a PdfOptions,
    pages: Vec<Vec<u8>>,
    replaced: bool,
}

impl<'a> Layout<'a> {
    fn new(opts: &'a PdfOptions) -> Self {
        Self {
            opts,
            pages: Vec::new(),
            replaced: false,
        }
    }

    fn encode(&mut self, text: &str) -> Vec<u8> {
        let (bytes, replaced) = encode_win_ansi(text);
        self.replaced |= replaced;
        bytes
    }

    fn line_height(&self) -> f64 {
        self.opts.body_font_size * LINE_SPACING
    }

    fn new_page(&self) -> PageCursor {
        PageCursor {
            content: Vec::new(),
            y: self.opts.page_height - self.opts.margin,
        }
    }

    fn text(&self, page: &mut Vec<u8>, font: &str, size: f64, x: f64, y: f64, text: &[u8]) {
        ops(page, &format!("BT /{font} {size:.2} Tf {x:.2} {y:.2} Td "));
        push_pdf_string(page, text);
        ops(page, " Tj ET\n");
    }

    /// Draw one table row of pre-wrapped cells at the cursor and move it down.
    fn row(&self, page: &mut PageCursor, cells: &[Vec<Vec<u8>>], col_width: f64, head: bool) {
        let opts = self.opts;
        let height = row_height(cells, self.line_height(), opts.cell_padding);
        let bottom = page.y - height;
        let mut x = opts.margin;
        for lines in cells {
            if head {
                let [r, g, b] = opts.head_fill.map(|c| f64::from(c) / 255.0);
                ops(
                    &mut page.content,
                    &format!("{r:.3} {g:.3} {b:.3} rg {x:.2} {bottom:.2} {col_width:.2} {height:.2} re f\n"),
                );
            }
            ops(
                &mut page.content,
                &format!("{GRID_GRAY} G 0.5 w {x:.2} {bottom:.2} {col_width:.2} {height:.2} re S\n"),
            );
            ops(&mut page.content, if head { "1 g\n" } else { "0 g\n" });
            let font = if head { "F2" } else { "F1" };
            let mut baseline = page.y - opts.cell_padding - opts.body_font_size * 0.8;
            for line in lines {
                self.text(
                    &mut page.content,
                    font,
                    opts.body_font_size,
                    x + opts.cell_padding,
                    baseline,
                    line,
                );
                baseline -= self.line_height();
            }
            x += col_width;
        }
        page.y = bottom;
    }

    fn sheet(&mut self, name: &str, sheet: &Sheet) {
        let opts = self.opts;
        let mut page = self.new_page();

        let title = self.encode(name);
        let title_baseline = page.y - opts.title_font_size;
        self.text(
            &mut page.content,
            "F2",
            opts.title_font_size,
            opts.margin,
            title_baseline,
            &title,
        );
        page.y = title_baseline - TITLE_GAP;

        if sheet.width() > 0 {
            #[allow(clippy::cast_precision_loss)]
            let col_width = (opts.page_width - 2.0 * opts.margin) / sheet.width() as f64;
            let text_room = (col_width - 2.0 * opts.cell_padding).max(opts.body_font_size);
            let size = opts.body_font_size;

            let head: Vec<Vec<Vec<u8>>> = sheet
                .headers()
                .iter()
                .map(|h| wrap(&self.encode(h), text_room, size))
                .collect();
            self.row(&mut page, &head, col_width, true);

            for cells in sheet.rows() {
                let wrapped: Vec<Vec<Vec<u8>>> = cells
                    .iter()
                    .map(|c| wrap(&self.encode(&c.to_string()), text_room, size))
                    .collect();
                let height = row_height(&wrapped, self.line_height(), opts.cell_padding);
                if page.y - height < opts.margin {
                    self.pages.push(std::mem::take(&mut page.content));
                    page = self.new_page();
                    self.row(&mut page, &head, col_width, true);
                }
                self.row(&mut page, &wrapped, col_width, false);
            }
        }

        self.pages.push(page.content);
    }
}

fn row_height(cells: &[Vec<Vec<u8>>], line_height: f64, padding: f64) -> f64 {
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    #[allow(clippy::cast_precision_loss)]
    let lines = lines as f64;
    lines * line_height + 2.0 * padding
}

/// Assemble the document: catalog, page tree, two base fonts, then a page
/// object and a content stream per page.
fn assemble(pages: &[Vec<u8>], opts: &PdfOptions) -> Vec<u8> {
    let page_obj = |i: usize| 5 + 2 * i;
    let kids = (0..pages.len()).fold(String::new(), |mut acc, i| {
        let _ = write!(acc, "{} 0 R ", page_obj(i));
        acc
    });

    let mut objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.trim_end(), pages.len()).into_bytes(),
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_vec(),
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    ];
    for (i, content) in pages.iter().enumerate() {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                opts.page_width,
                opts.page_height,
                page_obj(i) + 1
            )
            .into_bytes(),
        );
        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(content);
        stream.extend_from_slice(b"\nendstream");
        objects.push(stream);
    }

    let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = writeln!(xref, "{offset:010} 00000 n ");
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    );
    out.extend_from_slice(xref.as_bytes());
    out
}

/// Render every sheet of `workbook` as a PDF table document.
pub fn export_pdf_with(workbook: &Workbook, opts: &PdfOptions) -> Vec<u8> {
    let mut layout = Layout::new(opts);
    for named in workbook.sheets() {
        layout.sheet(&named.name, &named.sheet);
    }
    if layout.replaced {
        log::warn!("characters outside Latin-1 were replaced with '?' in PDF output");
    }
    if layout.pages.is_empty() {
        layout.pages.push(Vec::new());
    }
    log::debug!("PDF has {} page(s)", layout.pages.len());
    assemble(&layout.pages, opts)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::types::{Cell, NamedSheet};

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn workbook(sheets: Vec<(&str, Sheet)>) -> Workbook {
        Workbook::from_sheets(
            "w",
            sheets
                .into_iter()
                .map(|(n, s)| NamedSheet::new(n, s))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_one_page_per_sheet_with_titles() {
        let wb = workbook(vec![
            ("Alpha", Sheet::new(vec!["A".into()], vec![vec![Cell::Number(1.0)]])),
            ("Beta (2)", Sheet::new(vec!["B".into()], vec![vec![Cell::Empty]])),
        ]);
        let pdf = export_pdf_with(&wb, &PdfOptions::default());
        assert!(pdf.starts_with(b"%PDF-1.4"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert_eq!(count(&pdf, b"/Type /Page "), 2);
        assert_eq!(count(&pdf, b"(Alpha) Tj"), 1);
        assert_eq!(count(&pdf, b"(Beta \\(2\\)) Tj"), 1);
        assert!(count(&pdf, b"0.161 0.502 0.725 rg") >= 2);
    }

    #[test]
    fn test_long_table_repeats_head() {
        let rows = (0..200).map(|i| vec![Cell::Number(f64::from(i))]).collect();
        let wb = workbook(vec![("Long", Sheet::new(vec!["Value".into()], rows))]);
        let pdf = export_pdf_with(&wb, &PdfOptions::default());
        let pages = count(&pdf, b"/Type /Page ");
        assert!(pages > 1);
        assert_eq!(count(&pdf, b"(Value) Tj"), pages);
        assert_eq!(count(&pdf, b"(199) Tj"), 1);
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let wb = workbook(vec![("S", Sheet::new(vec!["H".into()], vec![]))]);
        let pdf = export_pdf_with(&wb, &PdfOptions::default());
        let xref = pdf.windows(5).position(|w| w == b"xref\n").unwrap();
        let tail = std::str::from_utf8(&pdf[xref..]).unwrap();
        let first_entry = tail.lines().nth(3).unwrap();
        let offset: usize = first_entry[..10].parse().unwrap();
        assert!(pdf[offset..].starts_with(b"1 0 obj"));
    }

    #[test]
    fn test_encoding_replaces_non_latin1() {
        let (bytes, replaced) = encode_win_ansi("café ✓");
        assert_eq!(bytes, vec![b'c', b'a', b'f', 0xE9, b' ', b'?']);
        assert!(replaced);
        assert!(!encode_win_ansi("plain").1);
    }

    #[test]
    fn test_wrap() {
        let lines = wrap(b"aaa bbb ccc", text_width(b"aaa bbb", 10.0), 10.0);
        assert_eq!(lines, vec![b"aaa bbb".to_vec(), b"ccc".to_vec()]);
        let hard = wrap(b"wwwwwwwwww", text_width(b"www", 10.0), 10.0);
        assert!(hard.len() >= 3);
        assert!(hard.iter().all(|l| !l.is_empty()));
        assert_eq!(wrap(b"", 50.0, 10.0), vec![Vec::<u8>::new()]);
    }
}
