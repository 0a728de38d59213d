use super::{write_package, xml_text, DocumentError};
use std::fmt::Write as _;
use std::path::Path;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#;

// cellXfs: 0 default, 1 bold header with borders, 2 body with borders
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="2"><border><left/><right/><top/><bottom/><diagonal/></border><border><left style="thin"><color auto="1"/></left><right style="thin"><color auto="1"/></right><top style="thin"><color auto="1"/></top><bottom style="thin"><color auto="1"/></bottom><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="1" xfId="0" applyFont="1" applyBorder="1" applyAlignment="1"><alignment wrapText="1" vertical="top"/></xf><xf numFmtId="0" fontId="0" fillId="0" borderId="1" xfId="0" applyBorder="1" applyAlignment="1"><alignment wrapText="1" vertical="top"/></xf></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="0" uniqueCount="0"/>"#;

const HEADER_STYLE: u8 = 1;
const BODY_STYLE: u8 = 2;

/// A single-sheet table with a bold header row
#[derive(Debug, Clone, PartialEq)]
pub struct XlsxTable {
    /// Worksheet name
    pub sheet_name: String,
    /// Header cells
    pub header: Vec<String>,
    /// Body rows
    pub rows: Vec<Vec<String>>,
    /// Column widths in characters, left to right
    pub column_widths: Vec<f64>,
}

/// `0 -> A`, `25 -> Z`, `26 -> AA`
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + u8::try_from(index % 26).unwrap_or(0));
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.iter().rev().map(|&b| char::from(b)).collect()
}

fn row_xml(out: &mut String, row_number: usize, cells: &[String], style: u8) {
    let _ = write!(out, r#"<row r="{row_number}">"#);
    for (col, value) in cells.iter().enumerate() {
        let _ = write!(
            out,
            r#"<c r="{}{row_number}" s="{style}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            column_name(col),
            xml_text(value),
        );
    }
    out.push_str("</row>");
}

fn sheet_xml(table: &XlsxTable) -> String {
    let mut cols = String::new();
    for (idx, width) in table.column_widths.iter().enumerate() {
        let n = idx + 1;
        let _ = write!(
            cols,
            r#"<col min="{n}" max="{n}" width="{width}" customWidth="1"/>"#
        );
    }
    if !cols.is_empty() {
        cols = format!("<cols>{cols}</cols>");
    }

    let mut data = String::new();
    row_xml(&mut data, 1, &table.header, HEADER_STYLE);
    for (idx, row) in table.rows.iter().enumerate() {
        row_xml(&mut data, idx + 2, row, BODY_STYLE);
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{cols}<sheetData>{data}</sheetData></worksheet>"#
    )
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        xml_text(sheet_name)
    )
}

/// Writes `table` as a one-sheet workbook
///
/// # Errors
///
/// Returns `DocumentError` if the file cannot be written.
pub fn write_table(path: &Path, table: &XlsxTable) -> Result<(), DocumentError> {
    write_package(
        path,
        &[
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", ROOT_RELS.to_string()),
            ("xl/workbook.xml", workbook_xml(&table.sheet_name)),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
            ("xl/styles.xml", STYLES.to_string()),
            ("xl/sharedStrings.xml", SHARED_STRINGS.to_string()),
            ("xl/worksheets/sheet1.xml", sheet_xml(table)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::Reader;
    use std::error::Error;

    #[test]
    fn test_column_name() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn test_sheet_xml_styles_and_widths() {
        let table = XlsxTable {
            sheet_name: "Агент".into(),
            header: vec!["Поле".into(), "Значение".into()],
            rows: vec![vec!["Название".into(), "A & B".into()]],
            column_widths: vec![30.0, 60.0],
        };
        let xml = sheet_xml(&table);
        assert!(xml.contains(r#"<col min="1" max="1" width="30" customWidth="1"/>"#));
        assert!(xml.contains(r#"<c r="A1" s="1" t="inlineStr">"#));
        assert!(xml.contains(r#"<c r="B2" s="2" t="inlineStr"><is><t xml:space="preserve">A &amp; B</t>"#));
    }

    #[test]
    fn test_written_workbook_reads_back() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("table.xlsx");
        let table = XlsxTable {
            sheet_name: "Инициативы".into(),
            header: vec!["Название".into(), "Суть агента".into()],
            rows: vec![
                vec!["Сверка".into(), "Сверяет <акты>".into()],
                vec!["HR-бот".into(), "Строка 1\nСтрока 2".into()],
            ],
            column_widths: vec![30.0, 60.0],
        };
        write_table(&path, &table)?;

        let mut workbook = calamine::open_workbook_auto(&path)?;
        assert_eq!(workbook.sheet_names(), vec!["Инициативы".to_string()]);
        let range = workbook.worksheet_range("Инициативы")?;
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|r| r.iter().map(ToString::to_string).collect())
            .collect();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["Название", "Суть агента"]);
        assert_eq!(rows[1], vec!["Сверка", "Сверяет <акты>"]);
        assert_eq!(rows[2][1], "Строка 1\nСтрока 2");
        Ok(())
    }
}
