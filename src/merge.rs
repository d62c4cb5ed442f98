//! Sequential concatenation of PDF documents.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use thiserror::Error;
use tracing::debug;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("no documents to merge")]
    Empty,

    #[error("part {index} is not a readable PDF: {source}")]
    Unreadable {
        index: usize,
        #[source]
        source: lopdf::Error,
    },

    #[error("part {index} has a malformed page tree: {source}")]
    PageTree {
        index: usize,
        #[source]
        source: lopdf::Error,
    },

    #[error("part {index} contains no pages")]
    NoPages { index: usize },

    #[error("failed to write merged document: {0}")]
    Write(String),
}

/// Concatenates `parts` into one document; pages keep their input order.
pub fn merge_pdfs(parts: &[Vec<u8>]) -> Result<Vec<u8>, MergeError> {
    if parts.is_empty() {
        return Err(MergeError::Empty);
    }

    let mut merged = Document::with_version("1.5");
    let mut next_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();

    for (index, bytes) in parts.iter().enumerate() {
        let mut doc =
            Document::load_mem(bytes).map_err(|source| MergeError::Unreadable { index, source })?;
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(MergeError::NoPages { index });
        }

        for page_id in &page_ids {
            let page = flatten_page(&doc, *page_id)
                .map_err(|source| MergeError::PageTree { index, source })?;
            pages.push((*page_id, page));
        }

        debug!("Merged part {}: {} pages", index, page_ids.len());

        for (id, object) in doc.objects {
            if is_structural(&object) {
                continue;
            }
            merged.objects.insert(id, object);
        }
    }

    merged.max_id = next_id;
    let pages_id = merged.new_object_id();

    let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
    let count = kids.len() as i64;
    for (id, mut page) in pages {
        page.set("Parent", pages_id);
        merged.objects.insert(id, Object::Dictionary(page));
    }

    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    merged
        .save_to(&mut out)
        .map_err(|e| MergeError::Write(e.to_string()))?;
    Ok(out)
}

/// Copies a page dictionary and pulls down any inheritable attribute it lacks,
/// since the original page tree nodes are discarded.
fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary, lopdf::Error> {
    let mut page = doc.get_dictionary(page_id)?.clone();

    for key in INHERITABLE_KEYS {
        if page.has(key) {
            continue;
        }
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        while let Some(parent_id) = parent {
            let node = doc.get_dictionary(parent_id)?;
            if let Ok(value) = node.get(key) {
                page.set(key.to_vec(), value.clone());
                break;
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
    }

    Ok(page)
}

/// Catalogs, page tree nodes, pages and outlines are rebuilt for the merged document.
/// Object streams and cross-reference streams describe the source file's layout;
/// their contents are already loaded as plain objects.
fn is_structural(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return false,
    };
    match dict.get(b"Type").and_then(Object::as_name) {
        Ok(name) => matches!(
            name,
            b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" | b"ObjStm" | b"XRef"
        ),
        Err(_) => false,
    }
}
