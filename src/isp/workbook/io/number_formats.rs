//! Narrow reader for per-cell number formats in an XLSX package.
//!
//! calamine only hands back computed values, so the percentage pass reads
//! formats straight from the package: sheet name → worksheet part via the
//! workbook relationships, then `s` (style index) attributes from the
//! worksheet part, resolved through `cellXfs` and `numFmts` in the styles
//! part. Only cells inside the requested window are resolved.

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::isp::workbook::columns::parse_cell_reference;
use crate::isp::workbook::error::{Result, WorkbookError};
use crate::isp::workbook::io::source::{CellWindow, FormatGrid};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const STYLES_PART: &str = "xl/styles.xml";

/// Style information shared by every sheet of a package.
#[derive(Debug, Clone, Default)]
pub(crate) struct PackageFormats {
    /// Sheet name → worksheet part path inside the archive.
    sheet_parts: HashMap<String, String>,
    /// Format code for each `cellXfs` entry, by style index.
    style_formats: Vec<String>,
}

impl PackageFormats {
    /// Reads the workbook, relationship and styles parts of a package.
    pub(crate) fn load<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Self> {
        let workbook = read_part(archive, WORKBOOK_PART)?.ok_or_else(|| {
            WorkbookError::InvalidWorkbook(format!("missing package part '{WORKBOOK_PART}'"))
        })?;
        let relationships = read_part(archive, WORKBOOK_RELS_PART)?.unwrap_or_default();
        let styles = read_part(archive, STYLES_PART)?.unwrap_or_default();

        let targets = parse_relationships(&relationships)?;
        let mut sheet_parts = HashMap::new();
        for (sheet_name, relationship_id) in parse_sheet_entries(&workbook)? {
            if let Some(target) = targets.get(&relationship_id) {
                sheet_parts.insert(sheet_name, resolve_target(target));
            }
        }

        Ok(Self {
            sheet_parts,
            style_formats: parse_style_formats(&styles)?,
        })
    }

    /// Format codes for a window of the named sheet.
    pub(crate) fn read_window<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        sheet_name: &str,
        window: &CellWindow,
    ) -> Result<FormatGrid> {
        let part = self
            .sheet_parts
            .get(sheet_name)
            .ok_or_else(|| WorkbookError::SheetNotFound {
                sheet: sheet_name.to_string(),
            })?;
        let xml = read_part(archive, part)?.ok_or_else(|| {
            WorkbookError::InvalidWorkbook(format!("missing worksheet part '{part}'"))
        })?;
        self.formats_in_window(&xml, window)
    }

    fn formats_in_window(&self, xml: &str, window: &CellWindow) -> Result<FormatGrid> {
        let mut grid = window.empty_grid();
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event()? {
                Event::Start(element) | Event::Empty(element)
                    if element.local_name().as_ref() == b"c" =>
                {
                    let Some(reference) = attribute(&element, b"r")? else {
                        continue;
                    };
                    let Some((row, column)) = parse_cell_reference(&reference) else {
                        continue;
                    };
                    if row > window.last_row {
                        break;
                    }
                    if !window.contains(row, column) {
                        continue;
                    }
                    let style = attribute(&element, b"s")?
                        .and_then(|value| value.parse::<usize>().ok())
                        .unwrap_or(0);
                    grid[(row - window.first_row) as usize]
                        [(column - window.first_column) as usize] = self.format_for_style(style);
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(grid)
    }

    fn format_for_style(&self, style: usize) -> Option<String> {
        self.style_formats.get(style).cloned()
    }
}

/// Standard code for a built-in number format id, if it is one the sheets
/// are known to use.
pub(crate) fn builtin_format(id: u32) -> Option<&'static str> {
    let code = match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    };
    Some(code)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let path = archive
        .file_names()
        .find(|file_name| file_name.eq_ignore_ascii_case(name))
        .map(str::to_owned);
    let Some(path) = path else {
        return Ok(None);
    };
    match archive.by_name(&path) {
        Ok(mut file) => {
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            Ok(Some(contents))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == name {
            let raw = String::from_utf8_lossy(&attr.value);
            let value = quick_xml::escape::unescape(&raw)
                .map_err(|err| WorkbookError::InvalidWorkbook(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// `(sheet name, relationship id)` pairs from the workbook part.
fn parse_sheet_entries(xml: &str) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::new();
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"sheet" =>
            {
                if let (Some(name), Some(id)) =
                    (attribute(&element, b"name")?, attribute(&element, b"id")?)
                {
                    entries.push((name, id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(entries)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut targets = HashMap::new();
    if xml.is_empty() {
        return Ok(targets);
    }
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) =
                    (attribute(&element, b"Id")?, attribute(&element, b"Target")?)
                {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

/// Format code for every `xf` inside `cellXfs`, in order.
fn parse_style_formats(xml: &str) -> Result<Vec<String>> {
    let mut formats = Vec::new();
    if xml.is_empty() {
        return Ok(formats);
    }

    let mut custom: HashMap<u32, String> = HashMap::new();
    let mut xf_format_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element) => match element.local_name().as_ref() {
                b"numFmt" => {
                    let id = attribute(&element, b"numFmtId")?.and_then(|id| id.parse().ok());
                    let code = attribute(&element, b"formatCode")?;
                    if let (Some(id), Some(code)) = (id, code) {
                        custom.insert(id, code);
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let id = attribute(&element, b"numFmtId")?
                        .and_then(|id| id.parse().ok())
                        .unwrap_or(0);
                    xf_format_ids.push(id);
                }
                _ => {}
            },
            Event::End(element) if element.local_name().as_ref() == b"cellXfs" => {
                in_cell_xfs = false;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    for id in xf_format_ids {
        let code = custom
            .get(&id)
            .cloned()
            .or_else(|| builtin_format(id).map(str::to_string))
            .unwrap_or_else(|| "General".to_string());
        formats.push(code);
    }
    Ok(formats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="0.0%"/></numFmts>
  <cellStyleXfs count="1"><xf numFmtId="0"/></cellStyleXfs>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0"/>
    <xf numFmtId="10" fontId="0" applyNumberFormat="1"/>
    <xf numFmtId="164" fontId="0" applyNumberFormat="1"><alignment wrapText="1"/></xf>
  </cellXfs>
</styleSheet>"#;

    const SHEET: &str = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" s="1"><v>0.5</v></c></row>
<row r="2"><c r="A2" s="2"><v>0.25</v></c><c r="B2"/></row>
<row r="3"><c r="A3" s="1"><v>1</v></c></row>
</sheetData></worksheet>"#;

    #[test]
    fn style_formats_resolve_builtin_and_custom_codes() {
        let formats = parse_style_formats(STYLES).expect("styles parsed");
        assert_eq!(formats, vec!["General", "0.00%", "0.0%"]);
    }

    #[test]
    fn window_only_reports_cells_inside_it() {
        let package = PackageFormats {
            sheet_parts: HashMap::new(),
            style_formats: parse_style_formats(STYLES).expect("styles parsed"),
        };
        let window = CellWindow {
            first_row: 1,
            last_row: 2,
            first_column: 2,
            last_column: 2,
        };
        let grid = package.formats_in_window(SHEET, &window).expect("window read");
        assert_eq!(
            grid,
            vec![vec![Some("0.00%".to_string())], vec![Some("General".to_string())]]
        );
    }

    #[test]
    fn relationship_targets_resolve_relative_and_absolute_paths() {
        assert_eq!(resolve_target("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
    }
}
