//! Native spreadsheet package (`.xlsx`) writer.
//!
//! Builds a minimal but complete package: content types, relationships,
//! workbook, a styles part carrying the date format, and one worksheet part
//! per sheet in workbook order.

use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::error::ExportError;
use crate::numfmt::{DATE_NUM_FMT_CODE, DATE_NUM_FMT_ID};
use crate::types::Workbook;

use super::sheet_writer::{write_sheet_xml, xml_escape};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

fn content_types_xml(sheet_count: usize) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    );
    out.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    out.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    out.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    out.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    for n in 1..=sheet_count {
        let _ = write!(
            out,
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        );
    }
    out.push_str("</Types>");
    out
}

fn workbook_xml(workbook: &Workbook) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str(r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
    let active = workbook
        .sheet_names()
        .position(|n| n == workbook.active_sheet_name())
        .unwrap_or(0);
    let _ = write!(
        out,
        r#"<bookViews><workbookView activeTab="{active}"/></bookViews><sheets>"#
    );
    for (idx, name) in workbook.sheet_names().enumerate() {
        let n = idx + 1;
        let _ = write!(
            out,
            r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
            xml_escape(name)
        );
    }
    out.push_str("</sheets></workbook>");
    out
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for n in 1..=sheet_count {
        let _ = write!(
            out,
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        );
    }
    let styles_id = sheet_count + 1;
    let _ = write!(
        out,
        r#"<Relationship Id="rId{styles_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#
    );
    out.push_str("</Relationships>");
    out
}

/// Style 0 is the default; style 1 formats date serials.
fn styles_xml() -> String {
    let mut out = String::from(XML_DECL);
    out.push_str(r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#);
    let _ = write!(
        out,
        r#"<numFmts count="1"><numFmt numFmtId="{DATE_NUM_FMT_ID}" formatCode="{}"/></numFmts>"#,
        xml_escape(DATE_NUM_FMT_CODE)
    );
    out.push_str(r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>"#);
    out.push_str(r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#);
    out.push_str(r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#);
    out.push_str(r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#);
    let _ = write!(
        out,
        r#"<cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="{DATE_NUM_FMT_ID}" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs>"#
    );
    out.push_str(r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#);
    out.push_str("</styleSheet>");
    out
}

/// Write every sheet of `workbook` as an `.xlsx` package.
pub fn write_native(workbook: &Workbook) -> Result<Vec<u8>, ExportError> {
    let sheets = workbook.sheets();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut put = |name: &str, body: &str| -> Result<(), ExportError> {
        writer.start_file(name, options)?;
        writer.write_all(body.as_bytes())?;
        Ok(())
    };

    put("[Content_Types].xml", &content_types_xml(sheets.len()))?;
    put("_rels/.rels", ROOT_RELS_XML)?;
    put("xl/workbook.xml", &workbook_xml(workbook))?;
    put("xl/_rels/workbook.xml.rels", &workbook_rels_xml(sheets.len()))?;
    put("xl/styles.xml", &styles_xml())?;
    for (idx, named) in sheets.iter().enumerate() {
        log::debug!("writing sheet '{}'", named.name);
        put(
            &format!("xl/worksheets/sheet{}.xml", idx + 1),
            &write_sheet_xml(&named.sheet),
        )?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
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
    use crate::types::{Cell, NamedSheet, Sheet};
    use std::io::Read;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut out = String::new();
        part.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_package_parts() {
        let wb = Workbook::from_sheets(
            "b.xlsx",
            vec![
                NamedSheet::new("One & Two", Sheet::new(vec!["A".into()], vec![])),
                NamedSheet::new("Second", Sheet::new(vec!["B".into()], vec![vec![Cell::Number(1.0)]])),
            ],
        )
        .unwrap()
        .with_active_sheet("Second")
        .unwrap();
        let bytes = write_native(&wb).unwrap();

        let workbook = read_part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"<sheet name="One &amp; Two" sheetId="1" r:id="rId1"/>"#));
        assert!(workbook.contains(r#"activeTab="1""#));

        let rels = read_part(&bytes, "xl/_rels/workbook.xml.rels");
        assert!(rels.contains(r#"Target="worksheets/sheet2.xml""#));
        assert!(rels.contains(r#"Target="styles.xml""#));

        let styles = read_part(&bytes, "xl/styles.xml");
        assert!(styles.contains(r#"formatCode="mmm d, yyyy""#));

        let sheet2 = read_part(&bytes, "xl/worksheets/sheet2.xml");
        assert!(sheet2.contains("<v>1</v>"));
    }
}
