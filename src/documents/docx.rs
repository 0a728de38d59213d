use super::{write_package, xml_text, DocumentError};
use std::fmt::Write as _;
use std::path::Path;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

// Font sizes are in half-points, spacing in twentieths of a point
const TITLE_SIZE: u32 = 40;
const FIELD_SIZE: u32 = 28;
const VALUE_SIZE: u32 = 24;
const SPACING_AFTER: u32 = 240;

/// Text run; embedded newlines become `<w:br/>`
fn run(text: &str, size: u32, bold: bool) -> String {
    let bold = if bold { "<w:b/>" } else { "" };
    let body = text
        .split('\n')
        .map(|line| format!(r#"<w:t xml:space="preserve">{}</w:t>"#, xml_text(line)))
        .collect::<Vec<_>>()
        .join("<w:br/>");
    format!(r#"<w:r><w:rPr>{bold}<w:sz w:val="{size}"/></w:rPr>{body}</w:r>"#)
}

fn document_xml(title: &str, fields: &[(String, String)]) -> String {
    let mut body = format!(
        r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr>{}</w:p>"#,
        run(title, TITLE_SIZE, true)
    );

    for (field, value) in fields {
        let _ = write!(
            body,
            r#"<w:p><w:pPr><w:spacing w:after="{SPACING_AFTER}"/></w:pPr>{}<w:r><w:br/></w:r>{}</w:p>"#,
            run(&format!("{field}:"), FIELD_SIZE, true),
            run(value, VALUE_SIZE, false),
        );
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

/// Writes a Word document with a centered title and one paragraph per field
///
/// # Errors
///
/// Returns `DocumentError` if the file cannot be written.
pub fn write_template(
    path: &Path,
    title: &str,
    fields: &[(String, String)],
) -> Result<(), DocumentError> {
    write_package(
        path,
        &[
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", ROOT_RELS.to_string()),
            ("word/document.xml", document_xml(title, fields)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;
    use std::error::Error;
    use std::io::Read;

    fn read_document(path: &Path) -> Result<String, Box<dyn Error>> {
        let mut archive = zip::ZipArchive::new(std::fs::File::open(path)?)?;
        let mut xml = String::new();
        archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;
        Ok(xml)
    }

    fn paragraphs(xml: &str) -> Result<Vec<String>, Box<dyn Error>> {
        let mut reader = quick_xml::Reader::from_str(xml);
        let mut out = Vec::new();
        let mut current = String::new();
        let mut in_text = false;
        loop {
            match reader.read_event()? {
                Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
                Event::End(e) if e.local_name().as_ref() == b"t" => in_text = false,
                Event::Empty(e) if e.local_name().as_ref() == b"br" => current.push('\n'),
                Event::End(e) if e.local_name().as_ref() == b"p" => {
                    out.push(std::mem::take(&mut current));
                }
                Event::Text(t) if in_text => current.push_str(&t.unescape()?),
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(out)
    }

    #[test]
    fn test_document_contains_escaped_fields() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("agent.docx");
        let fields = vec![
            ("Название".to_string(), "Сверка <актов> & платежей".to_string()),
            ("Масштаб процесса".to_string(), "Розница\nКИБ".to_string()),
        ];

        write_template(&path, "AI-агент — шаблон", &fields)?;
        let xml = read_document(&path)?;
        assert!(xml.contains("Сверка &lt;актов&gt; &amp; платежей"));
        assert!(xml.contains(r#"<w:sz w:val="28"/>"#));

        let paragraphs = paragraphs(&xml)?;
        assert_eq!(paragraphs[0], "AI-агент — шаблон");
        assert_eq!(paragraphs[1], "Название:\nСверка <актов> & платежей");
        assert_eq!(paragraphs[2], "Масштаб процесса:\nРозница\nКИБ");
        Ok(())
    }
}
