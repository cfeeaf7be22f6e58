use lopdf::{Document, Object, ObjectId};

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

const DEFAULT_PAGE_SIZE: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    /// Size after a quarter-turn rotation.
    pub fn transposed(self) -> Self {
        Self { width_pt: self.height_pt, height_pt: self.width_pt }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        DEFAULT_PAGE_SIZE
    }
}

/// What the viewer needs from a parsed document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    page_sizes: Vec<PageSize>,
}

impl ParsedDocument {
    pub fn new(page_sizes: Vec<PageSize>) -> Result<Self, PdfEngineError> {
        if page_sizes.is_empty() {
            return Err(PdfEngineError::NoPages);
        }
        Ok(Self { page_sizes })
    }

    pub fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    /// Size of a 1-based page.
    pub fn page_size(&self, page: u32) -> Result<PageSize, PdfEngineError> {
        page.checked_sub(1)
            .and_then(|index| self.page_sizes.get(index as usize))
            .copied()
            .ok_or(PdfEngineError::PageOutOfRange { page, page_count: self.page_count() })
    }

    pub fn page_sizes(&self) -> &[PageSize] {
        &self.page_sizes
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("document has no pages")]
    NoPages,
}

/// Turns document bytes into page geometry.
///
/// Parsing is CPU-bound; async callers should run it on a blocking thread.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument, PdfEngineError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfParser;

impl LopdfParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, PdfEngineError> {
        let doc = match Document::load_mem(bytes) {
            Ok(doc) => doc,
            // Decryption failures surface as parse errors.
            Err(_) if contains_encrypt_key(bytes) => {
                return Err(PdfEngineError::EncryptedUnsupported)
            }
            Err(err) => return Err(err.into()),
        };
        if doc.is_encrypted() {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        doc.get_pages()
            .into_values()
            .map(|page_id| media_box(&doc, page_id).map(|size| size.unwrap_or(DEFAULT_PAGE_SIZE)))
            .collect()
    }
}

/// Bound on `/Parent` hops, guarding against cyclic page trees.
const MAX_TREE_DEPTH: usize = 32;

/// The page's MediaBox, inherited from its `/Pages` ancestors when absent.
fn media_box(doc: &Document, page_id: ObjectId) -> Result<Option<PageSize>, PdfEngineError> {
    let mut node = doc.get_dictionary(page_id)?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Some(size) = node.get(b"MediaBox").ok().and_then(page_size_of) {
            return Ok(Some(size));
        }
        let Ok(parent_id) = node.get(b"Parent").and_then(Object::as_reference) else {
            return Ok(None);
        };
        node = doc.get_dictionary(parent_id)?;
    }

    tracing::warn!(?page_id, "page tree too deep, using default page size");
    Ok(None)
}

fn page_size_of(media_box: &Object) -> Option<PageSize> {
    let array = media_box.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let x0 = array[0].as_float().ok()?;
    let y0 = array[1].as_float().ok()?;
    let x1 = array[2].as_float().ok()?;
    let y1 = array[3].as_float().ok()?;
    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
}

fn contains_encrypt_key(bytes: &[u8]) -> bool {
    bytes.windows(b"/Encrypt".len()).any(|window| window == b"/Encrypt")
}

impl DocumentParser for LopdfParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument, PdfEngineError> {
        let document = ParsedDocument::new(Self::parse_sizes(bytes)?)?;
        tracing::debug!(pages = document.page_count(), bytes = bytes.len(), "document parsed");
        Ok(document)
    }
}

pub fn default_parser() -> LopdfParser {
    LopdfParser::new()
}
