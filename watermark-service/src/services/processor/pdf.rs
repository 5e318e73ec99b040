//! Text watermarks on top of the `lopdf` object model.
//!
//! Each selected page gets one extra content stream that draws the text with a shared
//! Type1 font and a shared ExtGState carrying the opacity. Page resources are copied onto
//! the page before they are extended, so inherited or shared dictionaries stay untouched.

use super::font_metrics::{encode_win_ansi, text_width};
use super::style::{HorizontalAlign, VerticalAlign, WatermarkStyle};
use super::{DocumentProcessor, MetadataOverride, ProcessorError, TextWatermark};
use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// US Letter, used when a page tree carries no MediaBox at all.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Guards the parent walk against cyclic page trees.
const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfProcessor;

impl LopdfProcessor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentProcessor for LopdfProcessor {
    async fn add_text_watermarks(
        &self,
        input: &Path,
        output: &Path,
        watermark: &TextWatermark,
    ) -> Result<(), ProcessorError> {
        let input: PathBuf = input.to_path_buf();
        let output: PathBuf = output.to_path_buf();
        let watermark = watermark.clone();

        tokio::task::spawn_blocking(move || watermark_file(&input, &output, &watermark)).await?
    }
}

/// Blocking file-to-file watermarking.
pub fn watermark_file(
    input: &Path,
    output: &Path,
    watermark: &TextWatermark,
) -> Result<(), ProcessorError> {
    let mut doc = Document::load(input).map_err(ProcessorError::Load)?;
    let stamped = stamp_document(&mut doc, watermark)?;

    let file = File::create(output).map_err(|e| ProcessorError::Save(e.into()))?;
    let mut writer = BufWriter::new(file);
    doc.save_to(&mut writer)
        .map_err(|e| ProcessorError::Save(e.into()))?;
    writer.flush().map_err(|e| ProcessorError::Save(e.into()))?;

    tracing::debug!(
        input = ?input,
        output = ?output,
        pages = stamped,
        "Text watermark applied"
    );

    Ok(())
}

/// Stamps `watermark` onto the selected pages of `doc`. Returns the number of stamped pages.
pub fn stamp_document(
    doc: &mut Document,
    watermark: &TextWatermark,
) -> Result<usize, ProcessorError> {
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(ProcessorError::Encrypted);
    }

    let pages = doc.get_pages();
    let page_count = u32::try_from(pages.len())
        .map_err(|_| ProcessorError::Malformed("page count out of range".to_string()))?;
    let selected: Vec<ObjectId> = watermark
        .pages
        .resolve(page_count)
        .into_iter()
        .filter_map(|number| pages.get(&number).copied())
        .collect();

    if selected.is_empty() {
        return Err(ProcessorError::NoPagesSelected(pages.len()));
    }

    let style = &watermark.style;
    let font_id = doc.add_object(font_dictionary(style));
    let gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(style.opacity as _),
        "CA" => Object::Real(style.opacity as _),
    });

    // Balances whatever graphics state the original content leaves behind.
    let wrap = if watermark.on_top {
        let open = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let close = doc.add_object(Stream::new(dictionary! {}, b"\nQ\n".to_vec()));
        Some((open, close))
    } else {
        None
    };

    let text = encode_win_ansi(&watermark.text);
    for page_id in &selected {
        stamp_page(doc, *page_id, font_id, gs_id, wrap, &text, style)?;
    }

    if let Some(metadata) = &watermark.metadata {
        apply_metadata(doc, metadata)?;
    }

    Ok(selected.len())
}

fn font_dictionary(style: &WatermarkStyle) -> Dictionary {
    let mut font = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => style.font.base_name(),
    };
    if style.font.uses_win_ansi() {
        font.set("Encoding", "WinAnsiEncoding");
    }
    font
}

fn stamp_page(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
    gs_id: ObjectId,
    wrap: Option<(ObjectId, ObjectId)>,
    text: &[u8],
    style: &WatermarkStyle,
) -> Result<(), ProcessorError> {
    let media_box = media_box(doc, page_id);

    let mut resources = match inherited(doc, page_id, b"Resources") {
        Some(obj) => resolve_dict(doc, &obj)?,
        None => Dictionary::new(),
    };
    let font_name = insert_resource(doc, &mut resources, b"Font", "FWm", font_id)?;
    let gs_name = insert_resource(doc, &mut resources, b"ExtGState", "GSWm", gs_id)?;

    let content = watermark_content(&font_name, &gs_name, media_box, text, style)?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));

    let existing = page_contents(doc, page_id)?;
    let mut contents = Vec::with_capacity(existing.len() + 3);
    match wrap {
        Some((open, close)) => {
            contents.push(Object::Reference(open));
            contents.extend(existing);
            contents.push(Object::Reference(close));
            contents.push(Object::Reference(content_id));
        }
        None => {
            contents.push(Object::Reference(content_id));
            contents.extend(existing);
        }
    }

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| ProcessorError::Malformed(format!("page {:?}: {}", page_id, e)))?;
    page.set("Resources", resources);
    page.set("Contents", contents);

    Ok(())
}

/// Looks `key` up on the page, then on its ancestors.
fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = Some(page_id);
    let mut depth = 0;

    while let Some(id) = current {
        if depth > MAX_TREE_DEPTH {
            break;
        }
        let node = doc.get_object(id).and_then(Object::as_dict).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    None
}

fn resolve(doc: &Document, obj: &Object) -> Result<Object, ProcessorError> {
    match obj {
        Object::Reference(id) => doc
            .get_object(*id)
            .cloned()
            .map_err(|e| ProcessorError::Malformed(format!("object {:?}: {}", id, e))),
        other => Ok(other.clone()),
    }
}

fn resolve_dict(doc: &Document, obj: &Object) -> Result<Dictionary, ProcessorError> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Ok(dict),
        other => Err(ProcessorError::Malformed(format!(
            "expected dictionary, found {}",
            kind(&other)
        ))),
    }
}

fn kind(obj: &Object) -> &'static str {
    match obj {
        Object::Null => "null",
        Object::Boolean(_) => "boolean",
        Object::Integer(_) | Object::Real(_) => "number",
        Object::Name(_) => "name",
        Object::String(..) => "string",
        Object::Array(_) => "array",
        Object::Dictionary(_) => "dictionary",
        Object::Stream(_) => "stream",
        Object::Reference(_) => "reference",
        #[allow(unreachable_patterns)]
        _ => "object",
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// `[llx, lly, urx, ury]` of the page, normalised so that `ll` is the lower-left corner.
fn media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let values: Option<Vec<f64>> = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| resolve(doc, &obj).ok())
        .and_then(|obj| match obj {
            Object::Array(items) => items.iter().map(number).collect(),
            _ => None,
        });

    match values.as_deref() {
        Some([x0, y0, x1, y1]) => [x0.min(*x1), y0.min(*y1), x0.max(*x1), y0.max(*y1)],
        _ => DEFAULT_MEDIA_BOX,
    }
}

/// Adds `id` under a fresh name in the `category` sub-dictionary and returns the name.
fn insert_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &[u8],
    prefix: &str,
    id: ObjectId,
) -> Result<String, ProcessorError> {
    let mut entries = match resources.get(category) {
        Ok(obj) => resolve_dict(doc, obj)?,
        Err(_) => Dictionary::new(),
    };

    let mut index = 0usize;
    let name = loop {
        let candidate = format!("{}{}", prefix, index);
        if !entries.has(candidate.as_bytes()) {
            break candidate;
        }
        index += 1;
    };

    entries.set(name.clone(), Object::Reference(id));
    resources.set(category.to_vec(), entries);
    Ok(name)
}

/// Current `Contents` of the page as a list of stream references.
fn page_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, ProcessorError> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| ProcessorError::Malformed(format!("page {:?}: {}", page_id, e)))?;

    match page.get(b"Contents") {
        Err(_) => Ok(Vec::new()),
        Ok(Object::Array(items)) => Ok(items.clone()),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => Ok(items.clone()),
            Ok(_) => Ok(vec![Object::Reference(*id)]),
            Err(e) => Err(ProcessorError::Malformed(format!("contents {:?}: {}", id, e))),
        },
        Ok(other) => Err(ProcessorError::Malformed(format!(
            "unexpected page contents {}",
            kind(other)
        ))),
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as _)
}

/// Placement of the text's lower-left corner before rotation.
fn anchor(media_box: [f64; 4], width: f64, height: f64, style: &WatermarkStyle) -> (f64, f64) {
    let [llx, lly, urx, ury] = media_box;

    let x = match style.position.horizontal() {
        HorizontalAlign::Left => llx,
        HorizontalAlign::Center => llx + (urx - llx - width) / 2.0,
        HorizontalAlign::Right => urx - width,
    };
    let y = match style.position.vertical() {
        VerticalAlign::Bottom => lly,
        VerticalAlign::Middle => lly + (ury - lly - height) / 2.0,
        VerticalAlign::Top => ury - height,
    };

    (x + style.offset.0, y + style.offset.1)
}

fn watermark_content(
    font_name: &str,
    gs_name: &str,
    media_box: [f64; 4],
    text: &[u8],
    style: &WatermarkStyle,
) -> Result<Vec<u8>, ProcessorError> {
    let width = text_width(style.font, text, style.points);
    let height = style.points;
    let (x, y) = anchor(media_box, width, height, style);

    // Rotate about the centre of the text box.
    let (sin, cos) = style.rotation.to_radians().sin_cos();
    let (cx, cy) = (x + width / 2.0, y + height / 2.0);
    let e = cx - (cos * width / 2.0 - sin * height / 2.0);
    let f = cy - (sin * width / 2.0 + cos * height / 2.0);

    let [r, g, b] = style.fill_color.components();

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(gs_name.as_bytes().to_vec())]),
            Operation::new("rg", vec![real(r), real(g), real(b)]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font_name.as_bytes().to_vec()), real(style.points)],
            ),
            Operation::new(
                "Tm",
                vec![real(cos), real(sin), real(-sin), real(cos), real(e), real(f)],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(text.to_vec(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    };

    content
        .encode()
        .map_err(|e| ProcessorError::Encode(e.into()))
}

fn apply_metadata(doc: &mut Document, metadata: &MetadataOverride) -> Result<(), ProcessorError> {
    let info_id = match doc.trailer.get(b"Info").and_then(Object::as_reference) {
        Ok(id) => id,
        Err(_) => {
            let id = doc.add_object(Dictionary::new());
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
    };

    let info = doc
        .get_object_mut(info_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| ProcessorError::Malformed(format!("info dictionary: {}", e)))?;

    if let Some(producer) = &metadata.producer {
        info.set("Producer", Object::string_literal(producer.as_str()));
    }
    if let Some(title) = &metadata.title {
        info.set("Title", Object::string_literal(title.as_str()));
    }

    Ok(())
}
