//! Page-level PDF concatenation
//!
//! Source documents are renumbered into one object space, their page trees
//! are dropped, and a fresh page tree pointing at every page is written.

use crate::merge::MergeError;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Object types that belong to a source document's structure, not its pages
const STRUCTURAL_TYPES: [&[u8]; 6] = [
    b"Catalog",
    b"Pages",
    b"Outlines",
    b"Outline",
    b"XRef",
    b"ObjStm",
];

/// Guards against cyclic `Parent` chains in malformed input
const MAX_TREE_DEPTH: usize = 64;

/// Sink for the pages of a merge
pub trait PageWriter {
    /// Parses `bytes` as a PDF and queues all of its pages
    ///
    /// Returns the number of pages queued. On error nothing is queued.
    fn append(&mut self, bytes: &[u8]) -> Result<u32, MergeError>;

    /// Writes every queued page, in append order, to `output`
    fn write(&mut self, output: &Path) -> Result<(), MergeError>;
}

/// `PageWriter` backed by lopdf
#[derive(Debug, Default)]
pub struct LopdfPageWriter {
    next_id: u32,
    pages: Vec<(ObjectId, Dictionary)>,
    objects: BTreeMap<ObjectId, Object>,
}

impl LopdfPageWriter {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }
}

fn pdf_error(e: lopdf::Error) -> MergeError {
    MergeError::Pdf(e.to_string())
}

fn type_name(object: &Object) -> Option<&[u8]> {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return None,
    };
    dict.get(b"Type").and_then(Object::as_name).ok()
}

fn parent_of(dict: &Dictionary) -> Option<ObjectId> {
    dict.get(b"Parent").and_then(Object::as_reference).ok()
}

/// Looks `key` up along the page's `Parent` chain
fn inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = parent_of(page);

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = parent_of(node);
    }

    None
}

impl PageWriter for LopdfPageWriter {
    fn append(&mut self, bytes: &[u8]) -> Result<u32, MergeError> {
        let mut doc = Document::load_mem(bytes).map_err(pdf_error)?;
        doc.renumber_objects_with(self.next_id.max(1));

        let mut pages = Vec::new();
        for page_id in doc.get_pages().into_values() {
            let mut page = doc.get_dictionary(page_id).map_err(pdf_error)?.clone();
            for key in INHERITABLE {
                if !page.has(key) {
                    if let Some(value) = inherited(&doc, &page, key) {
                        page.set(key, value);
                    }
                }
            }
            pages.push((page_id, page));
        }

        if pages.is_empty() {
            return Err(MergeError::Pdf("document has no pages".to_string()));
        }

        let page_ids: HashSet<ObjectId> = pages.iter().map(|(id, _)| *id).collect();
        self.next_id = doc.max_id + 1;

        for (id, object) in doc.objects {
            if page_ids.contains(&id) {
                continue;
            }
            if type_name(&object).is_some_and(|name| STRUCTURAL_TYPES.iter().any(|t| *t == name)) {
                continue;
            }
            self.objects.insert(id, object);
        }

        let count = pages.len() as u32;
        self.pages.extend(pages);
        Ok(count)
    }

    fn write(&mut self, output: &Path) -> Result<(), MergeError> {
        if self.pages.is_empty() {
            return Err(MergeError::Pdf("no pages to write".to_string()));
        }

        let pages_id: ObjectId = (self.next_id.max(1), 0);
        let catalog_id: ObjectId = (pages_id.0 + 1, 0);

        let mut doc = Document::with_version("1.5");
        doc.objects = std::mem::take(&mut self.objects);

        let pages = std::mem::take(&mut self.pages);
        let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
        let count = pages.len() as i64;

        for (id, mut page) in pages {
            page.set("Parent", Object::Reference(pages_id));
            doc.objects.insert(id, Object::Dictionary(page));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        doc.objects.insert(
            catalog_id,
            Object::Dictionary(dictionary! {
                "Type" => "Catalog",
                "Pages" => Object::Reference(pages_id),
            }),
        );
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.max_id = catalog_id.0;

        doc.renumber_objects();
        doc.compress();
        doc.save(output)
            .map_err(|e| MergeError::Pdf(format!("failed to write {}: {}", output.display(), e)))?;

        self.next_id = 1;
        Ok(())
    }
}
