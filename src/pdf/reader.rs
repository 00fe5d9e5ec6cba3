// src/pdf/reader.rs
//! Positioned words from a PDF's text layer, read with lopdf.
//!
//! Only what line reconstruction needs is modelled: text runs are placed by
//! the text matrix and the current transformation matrix, split on
//! whitespace, and each word gets an estimated horizontal extent from the
//! effective font size. Form XObjects are followed.

use crate::extractors::layout::{PageWords, PositionedWord};
use crate::utils::error::PdfError;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;

// --- Constants ---

const DEFAULT_PAGE_HEIGHT: f32 = 792.0;
// average glyph advance as a fraction of the font size
const GLYPH_WIDTH_EM: f32 = 0.5;
// TJ adjustments past this many thousandths of an em read as a word gap
const WORD_GAP_THOUSANDTHS: f32 = 200.0;
const MAX_FORM_DEPTH: usize = 8;

type Matrix = [f32; 6];
const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m` applied first, then `n`.
fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn matrix_from(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = IDENTITY;
    for (slot, operand) in m.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(m)
}

// --- Public Entry Points ---

/// Reads every page of the PDF at `path`, in page order.
pub fn read_pages<P: AsRef<Path>>(path: P) -> Result<Vec<PageWords>, PdfError> {
    let path = path.as_ref();
    let doc = Document::load(path).map_err(|e| PdfError::Load {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::debug!("Loaded {} ({} pages)", path.display(), doc.get_pages().len());
    read_document(&doc)
}

/// Same as [`read_pages`] for an in-memory PDF.
pub fn read_pages_mem(buffer: &[u8]) -> Result<Vec<PageWords>, PdfError> {
    let doc = Document::load_mem(buffer).map_err(|e| PdfError::Load {
        path: "<memory>".into(),
        message: e.to_string(),
    })?;
    read_document(&doc)
}

fn read_document(doc: &Document) -> Result<Vec<PageWords>, PdfError> {
    doc.get_pages()
        .iter()
        .map(|(&page_num, &page_id)| {
            let page = PageWords::new(page_words(doc, page_id, page_num)?);
            if page.is_empty() {
                tracing::warn!("Page {} has no text layer", page_num);
            } else {
                tracing::trace!("Page {}: {} words", page_num, page.len());
            }
            Ok(page)
        })
        .collect()
}

// --- Resources ---

/// Fonts and XObjects visible to one content stream.
#[derive(Debug, Clone, Default)]
struct Resources<'a> {
    fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
    xobjects: Option<&'a Dictionary>,
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        other => other.as_dict().ok(),
    }
}

/// Looks `key` up on the page, then on its ancestors in the page tree.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    loop {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
}

fn resource_fonts<'a>(doc: &'a Document, resources: &'a Dictionary) -> BTreeMap<Vec<u8>, &'a Dictionary> {
    resources
        .get(b"Font")
        .ok()
        .and_then(|fonts| resolve_dict(doc, fonts))
        .map(|fonts| {
            fonts
                .iter()
                .filter_map(|(name, font)| resolve_dict(doc, font).map(|d| (name.clone(), d)))
                .collect()
        })
        .unwrap_or_default()
}

fn resource_xobjects<'a>(doc: &'a Document, resources: &'a Dictionary) -> Option<&'a Dictionary> {
    resources
        .get(b"XObject")
        .ok()
        .and_then(|xobjects| resolve_dict(doc, xobjects))
}

// --- Interpreter State ---

struct TextState {
    font: Vec<u8>,
    font_size: f32,
    leading: f32,
    text_matrix: Matrix,
    line_matrix: Matrix,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    page_height: f32,
}

impl TextState {
    fn new(ctm: Matrix, page_height: f32) -> Self {
        Self {
            font: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            ctm,
            ctm_stack: Vec::new(),
            page_height,
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix[4] += tx * self.line_matrix[0] + ty * self.line_matrix[2];
        self.line_matrix[5] += tx * self.line_matrix[1] + ty * self.line_matrix[3];
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.leading != 0.0 { self.leading } else { self.font_size * 1.2 };
        self.move_line(0.0, -leading);
    }

    /// Splits `text` into words at the current position and advances it.
    fn show(&mut self, text: &str, words: &mut Vec<PositionedWord>) {
        let rendering = multiply(&self.text_matrix, &self.ctm);
        let [a, b, ..] = rendering;
        let scale = (a * a + b * b).sqrt();
        let glyph = self.font_size * if scale > 0.0 { scale } else { 1.0 } * GLYPH_WIDTH_EM;
        let origin = rendering[4];
        let baseline = self.page_height - rendering[5];

        let mut start: Option<(usize, String)> = None;
        let mut count = 0usize;
        for ch in text.chars() {
            if ch.is_whitespace() {
                if let Some((first, word)) = start.take() {
                    words.push(word_at(origin, glyph, first, count, baseline, word));
                }
            } else {
                start.get_or_insert_with(|| (count, String::new())).1.push(ch);
            }
            count += 1;
        }
        if let Some((first, word)) = start {
            words.push(word_at(origin, glyph, first, count, baseline, word));
        }

        // advance in text space
        let advance = self.font_size * GLYPH_WIDTH_EM * count as f32;
        self.text_matrix[4] += advance * self.text_matrix[0];
        self.text_matrix[5] += advance * self.text_matrix[1];
    }

    fn decode(&self, doc: &Document, fonts: &BTreeMap<Vec<u8>, &Dictionary>, obj: &Object) -> Option<String> {
        let Object::String(bytes, _) = obj else {
            return None;
        };

        if let Some(font_dict) = fonts.get(&self.font) {
            if let Ok(encoding) = font_dict.get_font_encoding(doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return Some(text);
                }
            }
        }

        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let utf16: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            return Some(String::from_utf16_lossy(&utf16));
        }

        // Latin-1
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}

fn word_at(origin: f32, glyph: f32, first: usize, end: usize, baseline: f32, text: String) -> PositionedWord {
    PositionedWord {
        left: origin + glyph * first as f32,
        right: origin + glyph * end as f32,
        baseline,
        text,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn page_height(doc: &Document, page_id: ObjectId) -> f32 {
    inherited(doc, page_id, b"MediaBox")
        .and_then(|media_box| media_box.as_array().ok())
        .and_then(|values| match values.as_slice() {
            [_, y0, _, y1] => Some((number(y1)? - number(y0)?).abs()),
            _ => None,
        })
        .unwrap_or(DEFAULT_PAGE_HEIGHT)
}

// --- Content Stream Walk ---

fn page_words(doc: &Document, page_id: ObjectId, page_num: u32) -> Result<Vec<PositionedWord>, PdfError> {
    let content_data = doc.get_page_content(page_id).map_err(|e| PdfError::Content {
        page: page_num,
        message: e.to_string(),
    })?;
    let content = Content::decode(&content_data).map_err(|e| PdfError::Content {
        page: page_num,
        message: e.to_string(),
    })?;

    let resources = Resources {
        fonts: doc.get_page_fonts(page_id).unwrap_or_default(),
        xobjects: inherited(doc, page_id, b"Resources")
            .and_then(|res| resolve_dict(doc, res))
            .and_then(|res| resource_xobjects(doc, res)),
    };

    let mut words = Vec::new();
    interpret(
        doc,
        &content.operations,
        &resources,
        IDENTITY,
        page_height(doc, page_id),
        0,
        &mut words,
    );
    Ok(words)
}

/// Runs the Form XObject `name` with `ctm` as its starting transform.
fn run_form(
    doc: &Document,
    name: &[u8],
    parent: &Resources<'_>,
    ctm: Matrix,
    page_height: f32,
    depth: usize,
    words: &mut Vec<PositionedWord>,
) {
    if depth >= MAX_FORM_DEPTH {
        tracing::debug!("Form XObject nesting deeper than {}, skipping", MAX_FORM_DEPTH);
        return;
    }
    let Some(stream) = parent
        .xobjects
        .and_then(|xobjects| xobjects.get(name).ok())
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        })
        .and_then(|obj| obj.as_stream().ok())
    else {
        return;
    };
    let is_form = stream
        .dict
        .get(b"Subtype")
        .and_then(Object::as_name)
        .is_ok_and(|subtype| subtype == b"Form");
    if !is_form {
        return;
    }

    let bytes = if stream.dict.get(b"Filter").is_ok() {
        match stream.decompressed_content() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("Could not decompress form XObject: {}", e);
                return;
            }
        }
    } else {
        stream.content.clone()
    };
    let content = match Content::decode(&bytes) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!("Could not decode form XObject: {}", e);
            return;
        }
    };

    let form_matrix = stream
        .dict
        .get(b"Matrix")
        .ok()
        .and_then(|m| m.as_array().ok())
        .and_then(|m| matrix_from(m))
        .unwrap_or(IDENTITY);

    // forms without their own resources use the caller's
    let resources = match stream.dict.get(b"Resources").ok().and_then(|r| resolve_dict(doc, r)) {
        Some(own) => Resources {
            fonts: resource_fonts(doc, own),
            xobjects: resource_xobjects(doc, own),
        },
        None => parent.clone(),
    };

    interpret(
        doc,
        &content.operations,
        &resources,
        multiply(&form_matrix, &ctm),
        page_height,
        depth + 1,
        words,
    );
}

fn interpret(
    doc: &Document,
    operations: &[Operation],
    resources: &Resources<'_>,
    ctm: Matrix,
    page_height: f32,
    depth: usize,
    words: &mut Vec<PositionedWord>,
) {
    let mut state = TextState::new(ctm, page_height);

    for op in operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => state.ctm_stack.push(state.ctm),
            "Q" => {
                if let Some(saved) = state.ctm_stack.pop() {
                    state.ctm = saved;
                }
            }
            "cm" => {
                if let Some(m) = matrix_from(operands) {
                    state.ctm = multiply(&m, &state.ctm);
                }
            }
            "Do" if !operands.is_empty() => {
                if let Ok(name) = operands[0].as_name() {
                    run_form(doc, name, resources, state.ctm, page_height, depth, words);
                }
            }
            "BT" => {
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "Tf" if operands.len() >= 2 => {
                if let Ok(name) = operands[0].as_name() {
                    state.font = name.to_vec();
                }
                if let Some(size) = number(&operands[1]) {
                    state.font_size = size;
                }
            }
            "TL" if !operands.is_empty() => {
                state.leading = number(&operands[0]).unwrap_or(state.leading);
            }
            "Td" | "TD" if operands.len() >= 2 => {
                let tx = number(&operands[0]).unwrap_or(0.0);
                let ty = number(&operands[1]).unwrap_or(0.0);
                if op.operator == "TD" {
                    state.leading = -ty;
                }
                state.move_line(tx, ty);
            }
            "Tm" => {
                if let Some(m) = matrix_from(operands) {
                    state.text_matrix = m;
                    state.line_matrix = m;
                }
            }
            "T*" => state.next_line(),
            "Tj" if !operands.is_empty() => {
                if let Some(text) = state.decode(doc, &resources.fonts, &operands[0]) {
                    state.show(&text, words);
                }
            }
            "'" | "\"" if !operands.is_empty() => {
                state.next_line();
                if let Some(text) = operands.last().and_then(|o| state.decode(doc, &resources.fonts, o)) {
                    state.show(&text, words);
                }
            }
            "TJ" if !operands.is_empty() => {
                let Ok(array) = operands[0].as_array() else {
                    continue;
                };
                let mut combined = String::new();
                for item in array {
                    match number(item) {
                        Some(adjust) if -adjust > WORD_GAP_THOUSANDTHS => combined.push(' '),
                        Some(_) => {}
                        None => {
                            if let Some(text) = state.decode(doc, &resources.fonts, item) {
                                combined.push_str(&text);
                            }
                        }
                    }
                }
                state.show(&combined, words);
            }
            _ => {}
        }
    }
}
