//! Burn annotations into PDF page content
//!
//! Each page that carries annotations gets its existing content wrapped in a
//! `q`/`Q` pair followed by one appended content stream that draws the
//! annotations. Nothing is added as an interactive PDF annotation object, so
//! the result looks the same in every viewer and cannot be edited afterwards.

use std::collections::BTreeMap;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, info};

use crate::annotation::{Annotation, AnnotationPayload, ImageData, StampContent, TextStyle};
use crate::coords::PageBox;
use crate::error::AnnotateError;
use crate::store::Snapshot;

const FONT_RESOURCE: &str = "AnnotF1";
// Parent chains deeper than this are treated as broken
const MAX_TREE_DEPTH: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositeOptions {
    /// Rotate each annotation about its center by its stored angle.
    /// Off by default: exported annotations are drawn upright.
    pub apply_rotation: bool,
}

/// Composite a snapshot onto the source PDF and return the new document bytes
pub fn composite(source: &[u8], snapshot: &Snapshot) -> Result<Vec<u8>, AnnotateError> {
    composite_with(source, snapshot, &CompositeOptions::default())
}

pub fn composite_with(
    source: &[u8],
    snapshot: &Snapshot,
    options: &CompositeOptions,
) -> Result<Vec<u8>, AnnotateError> {
    let mut doc =
        Document::load_mem(source).map_err(|e| AnnotateError::ParseError(e.to_string()))?;

    let pages = doc.get_pages();
    let mut by_page: BTreeMap<u32, Vec<&Annotation>> = BTreeMap::new();
    for annotation in snapshot.annotations() {
        if pages.contains_key(&annotation.page) {
            by_page.entry(annotation.page).or_default().push(annotation);
        } else {
            debug!(
                id = annotation.id,
                page = annotation.page,
                page_count = pages.len(),
                "skipping annotation outside document"
            );
        }
    }

    let mut font_id = None;
    for (page_num, annotations) in &by_page {
        let page_id = pages[page_num];
        let page_box = page_box(&doc, page_id)?;
        let mut painter = PagePainter::new(page_box, options);

        for annotation in annotations {
            match &annotation.payload {
                AnnotationPayload::Signature { image }
                | AnnotationPayload::Stamp {
                    content: StampContent::Image { image },
                } => {
                    let image_id = embed_png(&mut doc, image).map_err(|reason| {
                        AnnotateError::EmbedError {
                            id: annotation.id,
                            reason,
                        }
                    })?;
                    painter.draw_image(annotation, image_id);
                }
                AnnotationPayload::Stamp {
                    content: StampContent::Text { text, style },
                } => painter.draw_text(annotation, text, style),
                AnnotationPayload::Text { content, style } => {
                    painter.draw_text(annotation, content, style)
                }
            }
        }

        if painter.uses_font {
            let id = *font_id.get_or_insert_with(|| doc.add_object(helvetica()));
            painter.fonts.push((FONT_RESOURCE.to_string(), id));
        }
        install_resources(&mut doc, page_id, &painter.fonts, &painter.images)?;
        append_content(&mut doc, page_id, painter.operations)?;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| AnnotateError::OperationError(e.to_string()))?;

    info!(
        annotations = snapshot.len(),
        pages_touched = by_page.len(),
        bytes = output.len(),
        "composited annotations"
    );
    Ok(output)
}

/// Collects drawing operations and resource names for one page
struct PagePainter<'a> {
    page_box: PageBox,
    options: &'a CompositeOptions,
    operations: Vec<Operation>,
    fonts: Vec<(String, ObjectId)>,
    images: Vec<(String, ObjectId)>,
    uses_font: bool,
}

impl<'a> PagePainter<'a> {
    fn new(page_box: PageBox, options: &'a CompositeOptions) -> Self {
        Self {
            page_box,
            options,
            operations: Vec::new(),
            fonts: Vec::new(),
            images: Vec::new(),
            uses_font: false,
        }
    }

    fn draw_image(&mut self, annotation: &Annotation, image_id: ObjectId) {
        let name = format!("AnnotIm{}", annotation.id);
        let (x, y) = self
            .page_box
            .image_origin(annotation.position, annotation.size);

        self.operations.push(Operation::new("q", vec![]));
        self.push_rotation(annotation);
        self.operations.push(Operation::new(
            "cm",
            vec![
                real(annotation.size.width),
                real(0.0),
                real(0.0),
                real(annotation.size.height),
                real(x),
                real(y),
            ],
        ));
        self.operations
            .push(Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]));
        self.operations.push(Operation::new("Q", vec![]));
        self.images.push((name, image_id));
    }

    fn draw_text(&mut self, annotation: &Annotation, text: &str, style: &TextStyle) {
        let (x, y) = self.page_box.text_baseline(annotation.position);
        let (r, g, b) = style.rgb();

        self.operations.push(Operation::new("q", vec![]));
        self.push_rotation(annotation);
        self.operations.push(Operation::new("BT", vec![]));
        self.operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                real(style.font_size),
            ],
        ));
        self.operations.push(Operation::new(
            "rg",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ));
        self.operations
            .push(Operation::new("Td", vec![real(x), real(y)]));
        self.operations.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi_bytes(text), StringFormat::Literal)],
        ));
        self.operations.push(Operation::new("ET", vec![]));
        self.operations.push(Operation::new("Q", vec![]));
        self.uses_font = true;
    }

    fn push_rotation(&mut self, annotation: &Annotation) {
        if !self.options.apply_rotation || annotation.rotation == 0.0 {
            return;
        }
        // Screen rotation is clockwise, PDF angles run counter-clockwise
        let radians = -annotation.rotation.to_radians();
        let (sin, cos) = radians.sin_cos();
        let (cx, cy) = self.page_box.image_origin(annotation.position, annotation.size);
        let cx = cx + annotation.size.width / 2.0;
        let cy = cy + annotation.size.height / 2.0;

        self.operations.push(Operation::new(
            "cm",
            vec![real(1.0), real(0.0), real(0.0), real(1.0), real(cx), real(cy)],
        ));
        self.operations.push(Operation::new(
            "cm",
            vec![real(cos), real(sin), real(-sin), real(cos), real(0.0), real(0.0)],
        ));
        self.operations.push(Operation::new(
            "cm",
            vec![real(1.0), real(0.0), real(0.0), real(1.0), real(-cx), real(-cy)],
        ));
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

// WinAnsi code points 0x80..=0x9F that differ from Latin-1; unassigned slots are 0
const WIN_ANSI_HIGH: [u16; 32] = [
    0x20AC, 0, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160, 0x2039,
    0x0152, 0, 0x017D, 0, 0, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, 0x02DC,
    0x2122, 0x0161, 0x203A, 0x0153, 0, 0x017E, 0x0178,
];

/// Encode text for the WinAnsi Helvetica font; characters outside it print as '?'
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    let code = u32::from(c);
    match code {
        0x00..=0x7F | 0xA0..=0xFF => code as u8,
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|&mapped| mapped != 0 && u32::from(mapped) == code)
            .map(|offset| 0x80 + offset as u8)
            .unwrap_or(b'?'),
    }
}

fn helvetica() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Walk the page and its ancestors for an inheritable attribute
fn inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, AnnotateError> {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let Some(id) = current else { break };
        let node = doc.get_dictionary(id)?;
        if let Ok(value) = node.get(key) {
            return Ok(Some(value));
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(None)
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

fn page_box(doc: &Document, page_id: ObjectId) -> Result<PageBox, AnnotateError> {
    let Some(media_box) = inherited(doc, page_id, b"MediaBox")? else {
        return Ok(PageBox::LETTER);
    };
    let values = resolve(doc, media_box)
        .as_array()?
        .iter()
        .map(|v| resolve(doc, v).as_float().map(f64::from))
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [llx, lly, urx, ury] => Ok(PageBox::from_media_box([*llx, *lly, *urx, *ury])),
        _ => Err(AnnotateError::OperationError(format!(
            "MediaBox has {} entries",
            values.len()
        ))),
    }
}

/// An owned copy of a resource sub-dictionary such as /Font or /XObject
fn owned_subdictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    match resources.get(key).map(|o| resolve(doc, o)) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    }
}

/// Give the page its own Resources dictionary carrying our font and images.
/// Shared or inherited resources are copied, never modified in place.
fn install_resources(
    doc: &mut Document,
    page_id: ObjectId,
    fonts: &[(String, ObjectId)],
    images: &[(String, ObjectId)],
) -> Result<(), AnnotateError> {
    let mut resources = match inherited(doc, page_id, b"Resources")?.map(|o| resolve(doc, o)) {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };

    if !fonts.is_empty() {
        let mut font_dict = owned_subdictionary(doc, &resources, b"Font");
        for (name, id) in fonts {
            font_dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
        }
        resources.set("Font", Object::Dictionary(font_dict));
    }
    if !images.is_empty() {
        let mut xobject_dict = owned_subdictionary(doc, &resources, b"XObject");
        for (name, id) in images {
            xobject_dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
        }
        resources.set("XObject", Object::Dictionary(xobject_dict));
    }

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Wrap existing content in q/Q and append the annotation stream after it
fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), AnnotateError> {
    let mut existing = match doc.get_dictionary(page_id)?.get(b"Contents") {
        // An indirect array is spliced in, it cannot be nested inside ours
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let mut ops = Vec::with_capacity(operations.len() + 1);
    if !existing.is_empty() {
        let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        existing.insert(0, Object::Reference(save_id));
        ops.push(Operation::new("Q", vec![]));
    }
    ops.extend(operations);

    // Streams are concatenated verbatim, so start on a fresh line
    let mut bytes = b"\n".to_vec();
    bytes.extend(Content { operations: ops }.encode()?);
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), bytes));
    existing.push(Object::Reference(stream_id));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", Object::Array(existing));
    Ok(())
}

/// Decoded pixels split into color samples and an optional alpha channel
struct DecodedImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

fn decode_png(image: &ImageData) -> Result<DecodedImage, String> {
    let mut decoder = png::Decoder::new(image.as_bytes());
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(|e| e.to_string())?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf).map_err(|e| e.to_string())?;
    let pixels = &buf[..frame.buffer_size()];

    let (rgb, alpha) = match frame.color_type {
        png::ColorType::Rgba => {
            let mut rgb = Vec::with_capacity(pixels.len() / 4 * 3);
            let mut alpha = Vec::with_capacity(pixels.len() / 4);
            for px in pixels.chunks_exact(4) {
                rgb.extend_from_slice(&px[..3]);
                alpha.push(px[3]);
            }
            (rgb, Some(alpha))
        }
        png::ColorType::Rgb => (pixels.to_vec(), None),
        png::ColorType::GrayscaleAlpha => {
            let mut rgb = Vec::with_capacity(pixels.len() / 2 * 3);
            let mut alpha = Vec::with_capacity(pixels.len() / 2);
            for px in pixels.chunks_exact(2) {
                rgb.extend_from_slice(&[px[0], px[0], px[0]]);
                alpha.push(px[1]);
            }
            (rgb, Some(alpha))
        }
        png::ColorType::Grayscale => (pixels.iter().flat_map(|&v| [v, v, v]).collect(), None),
        png::ColorType::Indexed => return Err("palette image was not expanded".to_string()),
    };

    Ok(DecodedImage {
        width: frame.width,
        height: frame.height,
        rgb,
        alpha,
    })
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(|e| e.to_string())?;
    encoder.finish().map_err(|e| e.to_string())
}

/// Add the PNG as an Image XObject (plus SMask for transparency)
fn embed_png(doc: &mut Document, image: &ImageData) -> Result<ObjectId, String> {
    let decoded = decode_png(image)?;

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => decoded.width as i64,
        "Height" => decoded.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };

    if let Some(alpha) = decoded.alpha {
        let smask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => decoded.width as i64,
                "Height" => decoded.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            deflate(&alpha)?,
        );
        let smask_id = doc.add_object(smask);
        image_dict.set("SMask", Object::Reference(smask_id));
    }

    let stream = Stream::new(image_dict, deflate(&decoded.rgb)?);
    Ok(doc.add_object(stream))
}
