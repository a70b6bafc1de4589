//! Cell format table - only the part needed to tell date cells from numbers.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

use crate::numfmt::is_date_format_id;

fn parse_u32_attr(value: &[u8]) -> Option<u32> {
    std::str::from_utf8(value).ok().and_then(|s| s.parse().ok())
}

/// Parse styles.xml into one flag per `cellXfs` entry: `true` when the
/// entry's number format is a date/time format.
///
/// A missing or malformed styles part yields an empty table, in which case no
/// cell counts as date-styled.
pub(super) fn parse_date_styles<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: Option<&str>,
) -> Vec<bool> {
    let Ok(file) = archive.by_name(path.unwrap_or("xl/styles.xml")) else {
        return Vec::new();
    };
    read_date_styles(BufReader::new(file))
}

fn read_date_styles<B: std::io::BufRead>(reader: B) -> Vec<bool> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut custom_formats: Vec<(u32, String)> = Vec::new();
    let mut xf_formats: Vec<u32> = Vec::new();
    let mut in_num_fmts = false;
    let mut in_cell_xfs = false;
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_start = matches!(event, Event::Start(_));
                match e.local_name().as_ref() {
                    b"numFmts" => in_num_fmts = is_start,
                    b"cellXfs" => in_cell_xfs = is_start,
                    b"numFmt" if in_num_fmts => {
                        let mut id = 0u32;
                        let mut code = String::new();
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"numFmtId" => id = parse_u32_attr(&attr.value).unwrap_or(0),
                                b"formatCode" => {
                                    code = attr
                                        .unescape_value()
                                        .map(|v| v.into_owned())
                                        .unwrap_or_default();
                                }
                                _ => {}
                            }
                        }
                        custom_formats.push((id, code));
                    }
                    b"xf" if in_cell_xfs => {
                        let num_fmt_id = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"numFmtId")
                            .and_then(|a| parse_u32_attr(&a.value))
                            .unwrap_or(0);
                        xf_formats.push(num_fmt_id);
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"numFmts" => in_num_fmts = false,
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("styles part unreadable, ignoring date formats: {e}");
                return Vec::new();
            }
            _ => {}
        }
        buf.clear();
    }

    xf_formats
        .into_iter()
        .map(|id| is_date_format_id(id, &custom_formats))
        .collect()
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

    #[test]
    fn test_custom_and_builtin_date_formats() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="2">
    <numFmt numFmtId="164" formatCode="mmm d, yyyy"/>
    <numFmt numFmtId="165" formatCode="0.000"/>
  </numFmts>
  <cellStyleXfs count="1"><xf numFmtId="14"/></cellStyleXfs>
  <cellXfs count="5">
    <xf numFmtId="0"/>
    <xf numFmtId="164" applyNumberFormat="1"/>
    <xf numFmtId="165"/>
    <xf numFmtId="14"><alignment horizontal="left"/></xf>
    <xf/>
  </cellXfs>
</styleSheet>"#;
        let flags = read_date_styles(xml.as_bytes());
        assert_eq!(flags, vec![false, true, false, true, false]);
    }

    #[test]
    fn test_malformed_styles_yield_no_flags() {
        let flags = read_date_styles("<styleSheet><cellXfs><xf numFmtId=\"14\"".as_bytes());
        assert!(flags.iter().all(|f| !f));
    }
}
