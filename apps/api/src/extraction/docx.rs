use std::io::{Cursor, Read};

use quick_xml::events::Event;

use super::ExtractionError;

/// Reads `word/document.xml` and returns paragraph texts in document order,
/// one paragraph per line.
pub(super) fn extract_paragraphs(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::Docx(format!("not a ZIP container: {e}")))?;

    let mut doc_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractionError::Docx("missing word/document.xml".to_string()))?
        .read_to_string(&mut doc_xml)
        .map_err(|e| ExtractionError::Docx(format!("failed to read document.xml: {e}")))?;

    paragraphs_from_xml(&doc_xml).map(|paragraphs| paragraphs.join("\n"))
}

fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => current = Some(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" => {
                    if let Some(p) = current.as_mut() {
                        p.push('\t');
                    }
                }
                b"br" | b"cr" => {
                    if let Some(p) = current.as_mut() {
                        p.push('\n');
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(p) = current.take() {
                        paragraphs.push(p);
                    }
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|err| ExtractionError::Docx(format!("bad text run: {err}")))?;
                if let Some(p) = current.as_mut() {
                    p.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::Docx(format!(
                    "XML parse error at {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}
