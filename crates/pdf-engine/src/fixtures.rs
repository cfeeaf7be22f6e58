//! Minimal generated PDFs for tests in this and downstream crates.

use crate::{PageSize, PdfEngineError};
use lopdf::{dictionary, Document, Object};

/// A document with `page_count` US-letter pages.
pub fn sample_pdf(page_count: usize) -> Result<Vec<u8>, PdfEngineError> {
    pdf_with_page_sizes(&vec![Some(PageSize::default()); page_count])
}

/// A document whose pages carry the given media boxes; `None` omits the box.
pub fn pdf_with_page_sizes(sizes: &[Option<PageSize>]) -> Result<Vec<u8>, PdfEngineError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = sizes
        .iter()
        .map(|size| {
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
            };
            if let Some(size) = size {
                page.set(
                    "MediaBox",
                    vec![0.into(), 0.into(), size.width_pt.into(), size.height_pt.into()],
                );
            }
            doc.add_object(page).into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => sizes.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}
