//! Test documents from XML text, fed through quick-xml events.

use super::document::{DocumentBuilder, XmlDocument};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

fn utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn element_parts(e: &BytesStart<'_>) -> (String, Vec<(String, String)>) {
    let name = utf8(e.name().as_ref());
    let attrs = e
        .attributes()
        .map(|a| {
            let a = a.expect("fixture attribute");
            (utf8(a.key.as_ref()), utf8(&a.value))
        })
        .collect();
    (name, attrs)
}

fn start(builder: &mut DocumentBuilder, e: &BytesStart<'_>) {
    let (name, attrs) = element_parts(e);
    let borrowed: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    builder.start_element(&name, &borrowed);
}

/// Build a document from well-formed XML text. Entities are not decoded.
pub(crate) fn parse(xml: &str) -> XmlDocument {
    let mut reader = Reader::from_str(xml);
    let mut builder = DocumentBuilder::new();
    loop {
        match reader.read_event().expect("fixture must be well-formed") {
            Event::Start(e) => start(&mut builder, &e),
            Event::Empty(e) => {
                start(&mut builder, &e);
                builder.end_element();
            }
            Event::End(_) => builder.end_element(),
            Event::Text(t) => {
                builder.text(&utf8(&t));
            }
            Event::CData(c) => {
                builder.cdata(&utf8(&c));
            }
            Event::Comment(c) => {
                builder.comment(&utf8(&c));
            }
            Event::PI(pi) => {
                builder.processing_instruction(&utf8(pi.target()), utf8(pi.content()).trim());
            }
            Event::Decl(_) => {
                builder.xml_declaration("");
            }
            Event::DocType(d) => {
                builder.doctype(utf8(&d).trim());
            }
            Event::Eof => break,
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }
    builder.finish()
}
