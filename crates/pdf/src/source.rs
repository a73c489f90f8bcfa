use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::PdfError;

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = ObjectId;

/// Page bounds as `[llx, lly, urx, ury]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    pub fn to_object(self) -> Object {
        Object::Array(vec![
            Object::Real(self.llx),
            Object::Real(self.lly),
            Object::Real(self.urx),
            Object::Real(self.ury),
        ])
    }
}

/// One page of a source document, ready to become a Form XObject.
#[derive(Debug, Clone)]
pub struct SourcePage {
    pub media_box: PageBox,
    /// Decoded, concatenated content streams.
    pub content: Vec<u8>,
    /// The resource entry as found on the page or inherited from its parents.
    pub resources: Object,
}

/// A loaded input PDF (background or browser output).
pub struct SourceDocument {
    doc: Document,
}

impl SourceDocument {
    /// Parse a PDF from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    /// Mapping from 1-based page number to [`PageId`].
    pub fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Shift every object number so that the smallest one is `start`.
    pub fn renumber_from(&mut self, start: u32) {
        self.doc.renumber_objects_with(start);
    }

    pub fn max_id(&self) -> u32 {
        self.doc.max_id
    }

    /// Hand over every object. Page ids read before this call stay valid in
    /// the receiving document.
    pub fn into_objects(self) -> BTreeMap<ObjectId, Object> {
        self.doc.objects
    }

    /// Extract the MediaBox of a page, walking up the page tree when the
    /// page inherits it.
    pub fn media_box(&self, page: PageId) -> Result<PageBox, PdfError> {
        let page_dict = self.page_dict(page)?;

        let media_box = self
            .find_inherited(page_dict, b"MediaBox")
            .and_then(|obj| self.resolve_array(obj))
            .ok_or_else(|| PdfError::Parse("MediaBox not found for page".into()))?;

        let nums = self.array_to_f32s(&media_box)?;
        if nums.len() < 4 {
            return Err(PdfError::Parse(format!(
                "MediaBox has {} elements, expected 4",
                nums.len()
            )));
        }

        Ok(PageBox {
            llx: nums[0].min(nums[2]),
            lly: nums[1].min(nums[3]),
            urx: nums[0].max(nums[2]),
            ury: nums[1].max(nums[3]),
        })
    }

    /// Extract page dimensions `(width, height)` from the MediaBox.
    pub fn page_dimensions(&self, page: PageId) -> Result<(f32, f32), PdfError> {
        let media_box = self.media_box(page)?;
        Ok((media_box.width(), media_box.height()))
    }

    /// Everything needed to redraw `page` elsewhere.
    pub fn page(&self, page: PageId) -> Result<SourcePage, PdfError> {
        let media_box = self.media_box(page)?;
        let content = self.page_content(page)?;
        let resources = self
            .find_inherited(self.page_dict(page)?, b"Resources")
            .cloned()
            .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));

        Ok(SourcePage {
            media_box,
            content,
            resources,
        })
    }

    // -- private helpers ----------------------------------------------------

    /// Each content stream decoded, separated by a newline so tokens at the
    /// end of one stream never run into the next.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        let mut content = Vec::new();
        for id in self.doc.get_page_contents(page) {
            let stream = self
                .doc
                .get_object(id)
                .and_then(Object::as_stream)
                .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))?;
            if !content.is_empty() {
                content.push(b'\n');
            }
            match stream.decompressed_content() {
                Ok(data) => content.extend_from_slice(&data),
                Err(_) => content.extend_from_slice(&stream.content),
            }
        }
        Ok(content)
    }

    fn page_dict(&self, page: PageId) -> Result<&Dictionary, PdfError> {
        let page_obj = self
            .doc
            .get_object(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page object: {}", e)))?;

        page_obj
            .as_dict()
            .map_err(|e| PdfError::Parse(format!("page object is not a dictionary: {}", e)))
    }

    /// Look up `key` on the page, then on each parent in turn.
    fn find_inherited<'a>(&'a self, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        if let Ok(obj) = dict.get(key) {
            return Some(obj);
        }

        let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent = self.doc.get_object(parent_id).ok()?.as_dict().ok()?;
        self.find_inherited(parent, key)
    }

    /// Resolve an object to an array, following a single level of indirection.
    fn resolve_array(&self, obj: &Object) -> Option<Vec<Object>> {
        match obj {
            Object::Array(arr) => Some(arr.clone()),
            Object::Reference(id) => self
                .doc
                .get_object(*id)
                .ok()
                .and_then(|resolved| resolved.as_array().ok())
                .cloned(),
            _ => None,
        }
    }

    /// Convert a vector of lopdf objects to `f32` values.
    fn array_to_f32s(&self, objects: &[Object]) -> Result<Vec<f32>, PdfError> {
        objects
            .iter()
            .map(|obj| {
                let resolved = match obj {
                    Object::Reference(id) => self
                        .doc
                        .get_object(*id)
                        .map_err(|e| PdfError::Parse(e.to_string()))?,
                    other => other,
                };
                match resolved {
                    Object::Integer(i) => Ok(*i as f32),
                    Object::Real(f) => Ok(*f),
                    _ => Err(PdfError::Parse(format!(
                        "expected number in array, got {:?}",
                        resolved
                    ))),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{blank_pdf, split_content_pdf};
    use lopdf::content::Content;
    use lopdf::dictionary;

    #[test]
    fn load_rejects_garbage() {
        assert!(matches!(
            SourceDocument::load_bytes(b"not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn page_dimensions_of_generated_pages() {
        let bytes = blank_pdf(&[(595.0, 842.0), (612.0, 792.0)]);
        let source = SourceDocument::load_bytes(&bytes).unwrap();
        assert_eq!(source.page_count(), 2);
        let pages = source.pages();
        assert_eq!(source.page_dimensions(pages[&1]).unwrap(), (595.0, 842.0));
        assert_eq!(source.page_dimensions(pages[&2]).unwrap(), (612.0, 792.0));
    }

    #[test]
    fn media_box_and_resources_are_inherited() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let content_id = doc.add_object(lopdf::Stream::new(Dictionary::new(), b"0 0 m".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![10.into(), 20.into(), 310.into(), 420.into()],
                "Resources" => dictionary! { "Font" => dictionary! { "F9" => font_id } },
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let source = SourceDocument::load_bytes(&bytes).unwrap();
        let page = source.page(source.pages()[&1]).unwrap();
        assert_eq!(
            page.media_box,
            PageBox { llx: 10.0, lly: 20.0, urx: 310.0, ury: 420.0 }
        );
        assert_eq!(page.media_box.width(), 300.0);
        assert_eq!(page.content, b"0 0 m".to_vec());
        let resources = page.resources.as_dict().unwrap();
        assert!(resources.get(b"Font").is_ok());
    }

    #[test]
    fn content_streams_are_kept_apart() {
        let bytes = split_content_pdf(&[b"0 0 10 10 re".as_slice(), b"f".as_slice()]);
        let source = SourceDocument::load_bytes(&bytes).unwrap();
        let page = source.page(source.pages()[&1]).unwrap();
        let operators: Vec<String> = Content::decode(&page.content)
            .unwrap()
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect();
        assert_eq!(operators, vec!["re", "f"]);
    }
}
