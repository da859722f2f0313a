//! Receipt rendering on top of a single-page PDF template.
//!
//! The template is parsed once to measure its first page. Each render reparses the
//! template bytes so no state leaks from one receipt into the next.

use crate::core::text::{encode_win_ansi, truncate_to_width, wrap_to_width};
use crate::domain::model::{Overflow, PageSize, Placement, StudentRecord};
use crate::utils::error::{ReceiptError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::Path;

/// Resource name of the Helvetica font added to the template page.
pub const FONT_RESOURCE: &str = "FRcpt";

/// Page tree depth after which inherited attribute lookup gives up.
const MAX_TREE_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct ReceiptTemplate {
    bytes: Vec<u8>,
    page: PageSize,
    origin: (f32, f32),
}

impl ReceiptTemplate {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(&path)
            .map_err(|e| ReceiptError::file(path.as_ref().display().to_string(), e.to_string()))?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let doc = load(&bytes)?;
        let page_id = first_page(&doc)?;
        let media_box = inherited(&doc, page_id, b"MediaBox")?
            .ok_or_else(|| ReceiptError::render("template page has no MediaBox"))?;
        let (origin, page) = media_box_size(&doc, &media_box)?;

        tracing::debug!(
            "Template page measured at {}x{} points",
            page.width,
            page.height
        );

        Ok(Self {
            bytes,
            page,
            origin,
        })
    }

    pub fn page_size(&self) -> PageSize {
        self.page
    }

    /// Draws every placement onto a fresh copy of the template and returns the PDF bytes.
    pub fn render(&self, placements: &[Placement]) -> Result<Vec<u8>> {
        let mut doc = load(&self.bytes)?;
        let page_id = first_page(&doc)?;

        register_font(&mut doc, page_id)?;
        let overlay = Content {
            operations: self.text_operations(placements),
        }
        .encode()?;
        overlay_content(&mut doc, page_id, overlay)?;

        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        Ok(out)
    }

    fn text_operations(&self, placements: &[Placement]) -> Vec<Operation> {
        let mut operations = Vec::new();

        for placement in placements {
            let lines = match placement.overflow {
                Overflow::Truncate => vec![truncate_to_width(
                    &placement.text,
                    placement.font_size,
                    placement.max_width,
                )],
                Overflow::Wrap => {
                    wrap_to_width(&placement.text, placement.font_size, placement.max_width)
                }
            };
            let lines: Vec<String> = lines.into_iter().filter(|l| !l.is_empty()).collect();
            if lines.is_empty() {
                continue;
            }

            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![FONT_RESOURCE.into(), placement.font_size.into()],
            ));
            operations.push(Operation::new(
                "Td",
                vec![
                    (self.origin.0 + placement.x).into(),
                    (self.origin.1 + placement.y).into(),
                ],
            ));
            for (index, line) in lines.iter().enumerate() {
                if index > 0 {
                    operations.push(Operation::new(
                        "Td",
                        vec![0.into(), (-placement.line_height).into()],
                    ));
                }
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(
                        encode_win_ansi(line),
                        StringFormat::Hexadecimal,
                    )],
                ));
            }
            operations.push(Operation::new("ET", vec![]));
        }

        operations
    }
}

/// `Jean Uwase` -> `Jean_Uwase_Receipt.pdf`; falls back to the receipt number.
pub fn receipt_file_name(record: &StudentRecord) -> String {
    let sanitized: String = record
        .name
        .trim()
        .chars()
        .map(|ch| if ch.is_whitespace() { '_' } else { ch })
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'))
        .collect();
    let stem = sanitized.trim_matches('.');

    if stem.is_empty() {
        format!("{}_Receipt.pdf", record.receipt_number)
    } else {
        format!("{}_Receipt.pdf", stem)
    }
}

fn load(bytes: &[u8]) -> Result<Document> {
    Document::load_mem(bytes).map_err(|e| ReceiptError::render(format!("invalid template PDF: {}", e)))
}

fn first_page(doc: &Document) -> Result<ObjectId> {
    doc.get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| ReceiptError::render("template PDF has no pages"))
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Looks `key` up on the page and then up the `/Parent` chain.
fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
    let mut node = doc.get_dictionary(page_id)?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Ok(Some(resolve(doc, value)?.clone()));
        }
        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => node = doc.get_dictionary(parent)?,
            Err(_) => return Ok(None),
        }
    }
    Ok(None)
}

fn media_box_size(doc: &Document, media_box: &Object) -> Result<((f32, f32), PageSize)> {
    let corners = media_box
        .as_array()?
        .iter()
        .map(|value| resolve(doc, value).and_then(|v| Ok(v.as_float()?)))
        .collect::<Result<Vec<f32>>>()?;

    match corners.as_slice() {
        [x0, y0, x1, y1] if x1 > x0 && y1 > y0 => Ok((
            (*x0, *y0),
            PageSize {
                width: x1 - x0,
                height: y1 - y0,
            },
        )),
        _ => Err(ReceiptError::render(format!(
            "unusable MediaBox {:?}",
            corners
        ))),
    }
}

/// Gives the page its own resource dictionary containing the receipt font.
///
/// Shared resource and font dictionaries are copied inline so other pages of the
/// template are left untouched.
fn register_font(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut resources = match inherited(doc, page_id, b"Resources")? {
        Some(Object::Dictionary(dict)) => dict,
        _ => Dictionary::new(),
    };
    let mut fonts = match resources.get(b"Font") {
        Ok(fonts) => resolve(doc, fonts)?.as_dict()?.clone(),
        Err(_) => Dictionary::new(),
    };

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    fonts.set(FONT_RESOURCE, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Appends `content_stream` after the page content, isolating the template's
/// graphics state with a `q`/`Q` pair so its transforms do not move the overlay.
fn overlay_content(doc: &mut Document, page_id: ObjectId, content_stream: Vec<u8>) -> Result<()> {
    let existing = match doc.get_dictionary(page_id)?.get(b"Contents") {
        Ok(Object::Array(streams)) => streams.clone(),
        // An indirect /Contents may point at a stream or at an array of streams.
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(streams)) => streams.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(single) => vec![single.clone()],
        Err(_) => Vec::new(),
    };

    let mut contents = Vec::with_capacity(existing.len() + 3);
    if !existing.is_empty() {
        let save_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let restore_id = doc.add_object(Stream::new(dictionary! {}, b"Q\n".to_vec()));
        contents.push(Object::Reference(save_id));
        contents.extend(existing);
        contents.push(Object::Reference(restore_id));
    }
    let overlay_id = doc.add_object(Stream::new(dictionary! {}, content_stream));
    contents.push(Object::Reference(overlay_id));

    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Contents", Object::Array(contents));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// A one-page template with some existing text and shared resources.
    fn template_pdf(width: i64, height: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Roman",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 18.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(b"OFFICIAL RECEIPT".to_vec(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1i64,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
                "Resources" => resources_id,
            }
            .into(),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn placement(key: &str, text: &str, y: f32, overflow: Overflow) -> Placement {
        Placement {
            key: key.to_string(),
            text: text.to_string(),
            x: 60.0,
            y,
            max_width: 120.0,
            font_size: 10.0,
            line_height: 12.0,
            overflow,
        }
    }

    fn drawn_strings(pdf: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands.first())
            .filter_map(|operand| operand.as_str().ok())
            .map(|bytes| String::from_utf8_lossy(bytes).to_string())
            .collect()
    }

    #[test]
    fn test_page_size_is_inherited_from_page_tree() {
        let template = ReceiptTemplate::from_bytes(template_pdf(595, 842)).unwrap();
        assert_eq!(
            template.page_size(),
            PageSize {
                width: 595.0,
                height: 842.0
            }
        );
    }

    #[test]
    fn test_malformed_template_is_render_error() {
        let err = ReceiptTemplate::from_bytes(b"not a pdf".to_vec()).unwrap_err();
        assert!(matches!(err, ReceiptError::RenderError { .. }));
    }

    #[test]
    fn test_render_keeps_template_and_adds_text() {
        let template = ReceiptTemplate::from_bytes(template_pdf(612, 792)).unwrap();
        let pdf = template
            .render(&[
                placement("amount", "25,000 RWF", 600.0, Overflow::Truncate),
                placement("name", "Alice Uwase", 640.0, Overflow::Truncate),
            ])
            .unwrap();

        let strings = drawn_strings(&pdf);
        assert!(strings.contains(&"OFFICIAL RECEIPT".to_string()));
        assert!(strings.contains(&"25,000 RWF".to_string()));
        assert!(strings.contains(&"Alice Uwase".to_string()));

        let doc = Document::load_mem(&pdf).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let fonts = page
            .get(b"Resources")
            .and_then(Object::as_dict)
            .and_then(|r| r.get(b"Font"))
            .and_then(Object::as_dict)
            .unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(FONT_RESOURCE.as_bytes()));
    }

    #[test]
    fn test_render_flattens_referenced_contents_array() {
        let mut doc = Document::load_mem(&template_pdf(612, 792)).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let stream_ref = doc.get_dictionary(page_id).unwrap().get(b"Contents").unwrap().clone();
        let array_id = doc.add_object(Object::Array(vec![stream_ref]));
        doc.get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .set("Contents", Object::Reference(array_id));
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let template = ReceiptTemplate::from_bytes(bytes).unwrap();
        let pdf = template
            .render(&[placement("name", "Alice Uwase", 640.0, Overflow::Truncate)])
            .unwrap();

        let rendered = Document::load_mem(&pdf).unwrap();
        let page_id = *rendered.get_pages().values().next().unwrap();
        let contents = rendered
            .get_dictionary(page_id)
            .and_then(|page| page.get(b"Contents"))
            .and_then(Object::as_array)
            .unwrap();
        assert_eq!(contents.len(), 4);
        assert!(contents.iter().all(|item| item.as_reference().is_ok()));

        let strings = drawn_strings(&pdf);
        assert!(strings.contains(&"OFFICIAL RECEIPT".to_string()));
        assert!(strings.contains(&"Alice Uwase".to_string()));
    }

    #[test]
    fn test_render_is_deterministic() {
        let template = ReceiptTemplate::from_bytes(template_pdf(612, 792)).unwrap();
        let placements = vec![placement("name", "Alice Uwase", 640.0, Overflow::Truncate)];

        let first = template.render(&placements).unwrap();
        let second = template.render(&placements).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_truncate_and_wrap_overflow() {
        let template = ReceiptTemplate::from_bytes(template_pdf(612, 792)).unwrap();
        let long = "Twenty five thousand Rwandan francs only";

        let truncated = drawn_strings(
            &template
                .render(&[placement("amount_words", long, 500.0, Overflow::Truncate)])
                .unwrap(),
        );
        let clipped = truncated.iter().find(|s| long.starts_with(s.as_str()) && s.len() > 1);
        assert!(clipped.map(|s| s.len() < long.len()).unwrap_or(false));

        let wrapped = drawn_strings(
            &template
                .render(&[placement("amount_words", long, 500.0, Overflow::Wrap)])
                .unwrap(),
        );
        let lines: Vec<&String> = wrapped.iter().filter(|s| *s != "OFFICIAL RECEIPT").collect();
        assert!(lines.len() > 1);
        assert_eq!(
            lines.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" "),
            long
        );
    }

    #[test]
    fn test_receipt_file_name() {
        let mut record = StudentRecord {
            row: 2,
            name: "Jean  d'Arc Uwase".to_string(),
            email: "jean@example.com".to_string(),
            amount: "5,000 RWF".to_string(),
            date: String::new(),
            payment_method: String::new(),
            receipt_number: "R-0002".to_string(),
            extra: BTreeMap::new(),
        };
        assert_eq!(receipt_file_name(&record), "Jean__dArc_Uwase_Receipt.pdf");

        record.name = "/// ".to_string();
        assert_eq!(receipt_file_name(&record), "R-0002_Receipt.pdf");
    }
}
