//! Worksheet parsing - turns one sheet part into rows of raw values.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

use super::within_cell_budget;
use crate::cell_ref::{parse_cell_ref_bytes, parse_range_end};
use crate::dates::{date_to_serial, is_serial_candidate, parse_iso_date};
use crate::error::ParseError;
use crate::normalize::RawValue;

/// Serial offset between the 1904 and 1900 date systems.
const DATE1904_OFFSET: f64 = 1462.0;

/// Sheet metadata from workbook.xml
pub(super) struct SheetInfo {
    pub name: String,
    pub path: String,
}

/// Workbook-level lookups shared by every sheet.
pub(super) struct SheetContext<'a> {
    pub shared_strings: &'a [String],
    pub date_styles: &'a [bool],
    pub date1904: bool,
    pub detect_dates: bool,
    pub honor_dimension: bool,
}

/// Cell type tag from the `t` attribute of a `<c>` element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum CellTypeTag {
    Shared,
    Inline,
    Str,
    Bool,
    Error,
    IsoDate,
    Default,
}

pub(super) fn parse_cell_type_tag(value: &[u8]) -> CellTypeTag {
    match value {
        b"s" => CellTypeTag::Shared,
        b"b" => CellTypeTag::Bool,
        b"e" => CellTypeTag::Error,
        b"str" => CellTypeTag::Str,
        b"inlineStr" => CellTypeTag::Inline,
        b"d" => CellTypeTag::IsoDate,
        _ => CellTypeTag::Default,
    }
}

pub(super) fn parse_u32_bytes(value: &[u8]) -> Option<u32> {
    let mut num: u32 = 0;
    let mut seen = false;
    for &b in value {
        if !b.is_ascii_digit() {
            return None;
        }
        seen = true;
        num = num.saturating_mul(10).saturating_add(u32::from(b - b'0'));
    }
    if seen {
        Some(num)
    } else {
        None
    }
}

/// A `<c>` element whose children are still being read.
struct PendingCell {
    row: usize,
    col: usize,
    tag: CellTypeTag,
    style: Option<u32>,
    value: Option<String>,
}

/// Row-major grid that grows to fit every placed cell.
///
/// `width` is the widest row so far; the normalizer pads every row to it, so
/// the cell budget is checked against `rows x width` before anything grows.
#[derive(Default)]
struct Grid {
    rows: Vec<Vec<RawValue>>,
    width: usize,
}

/// Extent a grid refused to grow to.
#[derive(Debug, PartialEq, Eq)]
struct Oversized {
    rows: usize,
    cols: usize,
}

impl Grid {
    fn reserve(&mut self, rows: usize, cols: usize) -> Result<(), Oversized> {
        let rows = rows.max(self.rows.len());
        let cols = cols.max(self.width);
        if !within_cell_budget(rows, cols) {
            return Err(Oversized { rows, cols });
        }
        self.width = cols;
        if self.rows.len() < rows {
            self.rows.resize_with(rows, Vec::new);
        }
        Ok(())
    }

    fn place(&mut self, row: usize, col: usize, value: RawValue) -> Result<(), Oversized> {
        self.reserve(row.saturating_add(1), col.saturating_add(1))?;
        if let Some(cells) = self.rows.get_mut(row) {
            if cells.len() <= col {
                cells.resize(col + 1, RawValue::Empty);
            }
            if let Some(slot) = cells.get_mut(col) {
                *slot = value;
            }
        }
        Ok(())
    }

    /// Grow to at least `rows` x `cols`. Only the first row is widened; the
    /// normalizer pads the rest.
    fn extend_to(&mut self, rows: usize, cols: usize) -> Result<(), Oversized> {
        self.reserve(rows, cols)?;
        if let Some(first) = self.rows.first_mut() {
            if first.len() < cols {
                first.resize(cols, RawValue::Empty);
            }
        }
        Ok(())
    }
}

fn u32_to_index(v: u32) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}

fn text_of(text: &quick_xml::events::BytesText<'_>) -> String {
    text.unescape()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(text.as_ref()).into_owned())
}

fn open_cell(e: &BytesStart<'_>, row: usize, next_col: usize) -> PendingCell {
    let mut cell = PendingCell {
        row,
        col: next_col,
        tag: CellTypeTag::Default,
        style: None,
        value: None,
    };
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => {
                if let Some((c, r)) = parse_cell_ref_bytes(&attr.value) {
                    cell.col = u32_to_index(c);
                    cell.row = u32_to_index(r);
                }
            }
            b"t" => cell.tag = parse_cell_type_tag(&attr.value),
            b"s" => cell.style = parse_u32_bytes(&attr.value),
            _ => {}
        }
    }
    cell
}

/// Resolve a cell's cached text into a raw value according to its type tag.
fn resolve_cell_value(cell: &PendingCell, ctx: &SheetContext<'_>) -> RawValue {
    let Some(raw) = cell.value.as_deref() else {
        return RawValue::Empty;
    };
    match cell.tag {
        CellTypeTag::Shared => {
            let idx = raw.trim().parse::<usize>().ok();
            match idx.and_then(|i| ctx.shared_strings.get(i)) {
                Some(s) => RawValue::Text(s.clone()),
                None => {
                    log::warn!("shared string index '{raw}' out of range");
                    RawValue::Empty
                }
            }
        }
        CellTypeTag::Str | CellTypeTag::Inline | CellTypeTag::Error => {
            RawValue::Text(raw.to_string())
        }
        CellTypeTag::Bool => match raw {
            "1" | "true" => RawValue::Text("TRUE".to_string()),
            "0" | "false" => RawValue::Text("FALSE".to_string()),
            other => RawValue::Text(other.to_string()),
        },
        CellTypeTag::IsoDate => raw
            .get(..10)
            .and_then(parse_iso_date)
            .map_or_else(
                || RawValue::Text(raw.to_string()),
                |d| RawValue::date_serial(date_to_serial(d)),
            ),
        CellTypeTag::Default => match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => {
                let date_styled = cell
                    .style
                    .and_then(|s| ctx.date_styles.get(u32_to_index(s)))
                    .copied()
                    .unwrap_or(false);
                // Row 0 is the header row and never becomes a date.
                let read_as_date =
                    ctx.detect_dates && cell.row > 0 && is_serial_candidate(value, date_styled);
                let value = if ctx.date1904 && read_as_date {
                    value + DATE1904_OFFSET
                } else {
                    value
                };
                RawValue::Number { value, date_styled }
            }
            _ => RawValue::Text(raw.to_string()),
        },
    }
}

/// Parse a single worksheet part.
pub(super) fn parse_sheet<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    info: &SheetInfo,
    ctx: &SheetContext<'_>,
) -> Result<Vec<Vec<RawValue>>, ParseError> {
    let file = archive
        .by_name(&info.path)
        .map_err(|_| ParseError::MissingPart(info.path.clone()))?;
    read_sheet_rows(BufReader::new(file), &info.name, ctx)
}

/// Read `<sheetData>` into rows. Gaps between referenced cells and rows are
/// filled with empty values; a sheet without any `<row>` or `<c>` element
/// yields no rows at all. Cells that would stretch the grid past the cell
/// budget fail with [`ParseError::TooLarge`].
pub(super) fn read_sheet_rows<B: BufRead>(
    reader: B,
    name: &str,
    ctx: &SheetContext<'_>,
) -> Result<Vec<Vec<RawValue>>, ParseError> {
    let too_large = |Oversized { rows, cols }| ParseError::TooLarge {
        name: name.to_string(),
        rows,
        cols,
    };
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut grid = Grid::default();
    let mut dimension: Option<(u32, u32)> = None;
    let mut saw_content = false;

    let mut buf = Vec::new();
    let mut current_row: usize = 0;
    let mut next_col: usize = 0;
    let mut rows_seen: usize = 0;
    let mut pending: Option<PendingCell> = None;
    let mut in_value = false;
    let mut in_inline = false;
    let mut in_rph = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_start = matches!(event, Event::Start(_));
                match e.local_name().as_ref() {
                    b"dimension" => {
                        dimension = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"ref")
                            .and_then(|a| {
                                std::str::from_utf8(&a.value).ok().and_then(parse_range_end)
                            });
                    }
                    b"row" => {
                        saw_content = true;
                        current_row = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"r")
                            .and_then(|a| parse_u32_bytes(&a.value))
                            .filter(|r| *r > 0)
                            .map_or(rows_seen, |r| u32_to_index(r) - 1);
                        rows_seen = current_row.saturating_add(1);
                        next_col = 0;
                        grid.reserve(rows_seen, 0).map_err(too_large)?;
                    }
                    b"c" => {
                        saw_content = true;
                        let cell = open_cell(e, current_row, next_col);
                        next_col = cell.col.saturating_add(1);
                        if is_start {
                            pending = Some(cell);
                        } else {
                            grid.place(cell.row, cell.col, RawValue::Empty)
                                .map_err(too_large)?;
                        }
                    }
                    b"v" if is_start && pending.is_some() => {
                        in_value = true;
                        if let Some(cell) = pending.as_mut() {
                            cell.value = Some(String::new());
                        }
                    }
                    b"is" if is_start && pending.is_some() => {
                        in_inline = true;
                        if let Some(cell) = pending.as_mut() {
                            cell.value = Some(String::new());
                        }
                    }
                    b"rPh" if is_start && in_inline => in_rph = true,
                    b"t" if is_start && in_inline && !in_rph => in_value = true,
                    _ => {}
                }
            }
            Ok(Event::Text(ref t)) if in_value => {
                if let Some(value) = pending.as_mut().and_then(|c| c.value.as_mut()) {
                    value.push_str(&text_of(t));
                }
            }
            Ok(Event::CData(ref t)) if in_value => {
                if let Some(value) = pending.as_mut().and_then(|c| c.value.as_mut()) {
                    value.push_str(&String::from_utf8_lossy(t.as_ref()));
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"rPh" => in_rph = false,
                b"is" => in_inline = false,
                b"c" => {
                    if let Some(cell) = pending.take() {
                        let value = resolve_cell_value(&cell, ctx);
                        grid.place(cell.row, cell.col, value).map_err(too_large)?;
                    }
                    in_value = false;
                    in_inline = false;
                }
                b"sheetData" => break,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    if !saw_content {
        return Ok(Vec::new());
    }

    if ctx.honor_dimension {
        if let Some((end_col, end_row)) = dimension {
            let rows = u32_to_index(end_row).saturating_add(1);
            let cols = u32_to_index(end_col).saturating_add(1);
            if let Err(Oversized { rows, cols }) = grid.extend_to(rows, cols) {
                log::warn!("ignoring oversized dimension {cols}x{rows}");
            }
        }
    }

    Ok(grid.rows)
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

    fn ctx<'a>(shared: &'a [String], styles: &'a [bool]) -> SheetContext<'a> {
        SheetContext {
            shared_strings: shared,
            date_styles: styles,
            date1904: false,
            detect_dates: true,
            honor_dimension: true,
        }
    }

    fn rows(xml: &str, ctx: &SheetContext<'_>) -> Vec<Vec<RawValue>> {
        read_sheet_rows(xml.as_bytes(), "Sheet1", ctx).unwrap()
    }

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    #[test]
    fn test_cell_types() {
        let shared = vec!["Name".to_string()];
        let xml = r#"<worksheet><sheetData>
            <row r="1">
              <c r="A1" t="s"><v>0</v></c>
              <c r="B1" t="inlineStr"><is><r><t>Sc</t></r><r><t>ore</t></r></is></c>
              <c r="C1" t="b"><v>1</v></c>
              <c r="D1" t="e"><v>#DIV/0!</v></c>
              <c r="E1"><f>1+1</f><v>2</v></c>
              <c r="F1" t="str"><f>A1</f><v>Name</v></c>
            </row>
        </sheetData></worksheet>"#;
        let result = rows(xml, &ctx(&shared, &[]));
        assert_eq!(
            result,
            vec![vec![
                text("Name"),
                text("Score"),
                text("TRUE"),
                text("#DIV/0!"),
                RawValue::number(2.0),
                text("Name"),
            ]]
        );
    }

    #[test]
    fn test_gaps_and_blank_rows_filled() {
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1"><v>1</v></c><c r="C1"><v>3</v></c></row>
            <row r="4"><c r="B4"><v>5</v></c></row>
        </sheetData></worksheet>"#;
        let result = rows(xml, &ctx(&[], &[]));
        assert_eq!(result.len(), 4);
        assert_eq!(result[0][1], RawValue::Empty);
        assert!(result[1].is_empty());
        assert!(result[2].is_empty());
        assert_eq!(result[3], vec![RawValue::Empty, RawValue::number(5.0)]);
    }

    #[test]
    fn test_cells_without_references_are_sequential() {
        let xml = r#"<worksheet><sheetData>
            <row><c t="inlineStr"><is><t>a</t></is></c><c><v>1</v></c></row>
            <row><c><v>2</v></c></row>
        </sheetData></worksheet>"#;
        let result = rows(xml, &ctx(&[], &[]));
        assert_eq!(result[0], vec![text("a"), RawValue::number(1.0)]);
        assert_eq!(result[1], vec![RawValue::number(2.0)]);
    }

    #[test]
    fn test_date_style_flag() {
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" s="1"><v>45000</v></c><c r="B1" s="0"><v>45000</v></c></row>
        </sheetData></worksheet>"#;
        let result = rows(xml, &ctx(&[], &[false, true]));
        assert_eq!(result[0][0], RawValue::date_serial(45000.0));
        assert_eq!(result[0][1], RawValue::number(45000.0));
    }

    #[test]
    fn test_date1904_shifts_cells_read_as_dates() {
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" s="1"><v>100</v></c></row>
            <row r="2"><c r="A2" s="1"><v>100</v></c><c r="B2"><v>100</v></c><c r="C2"><v>100.5</v></c></row>
        </sheetData></worksheet>"#;
        let styles = [false, true];
        let mut context = ctx(&[], &styles);
        context.date1904 = true;
        let result = rows(xml, &context);
        assert_eq!(result[0][0], RawValue::date_serial(100.0));
        assert_eq!(result[1][0], RawValue::date_serial(1562.0));
        assert_eq!(result[1][1], RawValue::number(100.0));
        assert_eq!(result[1][2], RawValue::number(1562.5));

        context.detect_dates = false;
        let result = rows(xml, &context);
        assert_eq!(result[1][0], RawValue::date_serial(100.0));
        assert_eq!(result[1][2], RawValue::number(100.5));
    }

    #[test]
    fn test_dimension_extends_grid() {
        let xml = r#"<worksheet><dimension ref="A1:D3"/><sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t>H</t></is></c></row>
        </sheetData></worksheet>"#;
        let result = rows(xml, &ctx(&[], &[]));
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].len(), 4);

        let mut no_dim = ctx(&[], &[]);
        no_dim.honor_dimension = false;
        let result = rows(xml, &no_dim);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].len(), 1);
    }

    #[test]
    fn test_far_cell_exceeds_cell_budget() {
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t>H</t></is></c></row>
            <row r="1048576"><c r="XFD1048576"><v>1</v></c></row>
        </sheetData></worksheet>"#;
        let err = read_sheet_rows(xml.as_bytes(), "Wide", &ctx(&[], &[])).unwrap_err();
        match err {
            ParseError::TooLarge { name, rows, cols } => {
                assert_eq!(name, "Wide");
                assert_eq!(rows, 1_048_576);
                assert!(cols >= 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wide_then_tall_exceeds_cell_budget() {
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="XFD1"><v>1</v></c></row>
            <row r="300"><c r="A300"><v>2</v></c></row>
        </sheetData></worksheet>"#;
        let err = read_sheet_rows(xml.as_bytes(), "S", &ctx(&[], &[])).unwrap_err();
        assert!(matches!(
            err,
            ParseError::TooLarge { rows: 300, cols: 16_384, .. }
        ));
    }

    #[test]
    fn test_oversized_dimension_is_ignored() {
        let xml = r#"<worksheet><dimension ref="A1:XFD1048576"/><sheetData>
            <row r="1"><c r="A1"><v>1</v></c></row>
        </sheetData></worksheet>"#;
        let result = rows(xml, &ctx(&[], &[]));
        assert_eq!(result, vec![vec![RawValue::number(1.0)]]);
    }

    #[test]
    fn test_empty_sheet_has_no_rows() {
        let xml = r#"<worksheet><dimension ref="A1"/><sheetData/></worksheet>"#;
        assert!(rows(xml, &ctx(&[], &[])).is_empty());
    }

    #[test]
    fn test_empty_inline_string_is_text() {
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t></t></is></c><c r="B1" s="2"/></row>
        </sheetData></worksheet>"#;
        let result = rows(xml, &ctx(&[], &[]));
        assert_eq!(result[0], vec![text(""), RawValue::Empty]);
    }

    #[test]
    fn test_unescapes_entities() {
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t>R&amp;D &lt;1&gt;</t></is></c></row>
        </sheetData></worksheet>"#;
        let result = rows(xml, &ctx(&[], &[]));
        assert_eq!(result[0][0], text("R&D <1>"));
    }
}
