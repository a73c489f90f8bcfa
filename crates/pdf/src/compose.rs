//! Assembly of a fresh output document.
//!
//! Pages of input PDFs are brought in as Form XObjects: their content is
//! copied byte for byte and their resources are moved along with them, so
//! nothing is re-encoded or rasterized.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::content::Canvas;
use crate::fonts::StandardFont;
use crate::source::SourceDocument;
use crate::PdfError;

/// A page of an input document, available as a Form XObject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportedPage {
    pub form: ObjectId,
    pub width: f32,
    pub height: f32,
}

impl ImportedPage {
    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

/// Resources referenced by one output page.
#[derive(Debug, Default)]
pub struct PageResources {
    fonts: Dictionary,
    xobjects: Dictionary,
}

impl PageResources {
    pub fn new() -> Self {
        PageResources::default()
    }

    pub fn font(&mut self, name: &str, id: ObjectId) -> &mut Self {
        self.fonts.set(name, id);
        self
    }

    pub fn xobject(&mut self, name: &str, id: ObjectId) -> &mut Self {
        self.xobjects.set(name, id);
        self
    }

    fn into_dictionary(self) -> Dictionary {
        let mut resources = Dictionary::new();
        if !self.fonts.is_empty() {
            resources.set("Font", self.fonts);
        }
        if !self.xobjects.is_empty() {
            resources.set("XObject", self.xobjects);
        }
        resources
    }
}

pub struct OutputDocument {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for OutputDocument {
    fn default() -> Self {
        OutputDocument::new()
    }
}

impl OutputDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        OutputDocument {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        self.doc.add_object(object)
    }

    #[cfg(test)]
    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.doc.objects.get(&id)
    }

    pub fn add_font(&mut self, font: StandardFont) -> ObjectId {
        self.doc.add_object(font.dictionary())
    }

    /// Import every page of `source` (or only the first one) as Form
    /// XObjects, in page order.
    pub fn import(
        &mut self,
        mut source: SourceDocument,
        first_only: bool,
    ) -> Result<Vec<ImportedPage>, PdfError> {
        source.renumber_from(self.doc.max_id + 1);

        let mut page_ids: Vec<_> = source.pages().into_values().collect();
        if first_only {
            page_ids.truncate(1);
        }

        let mut forms = Vec::with_capacity(page_ids.len());
        for page_id in page_ids {
            let page = source.page(page_id)?;
            let media_box = page.media_box;
            let form = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => media_box.to_object(),
                    "Matrix" => vec![
                        Object::Integer(1),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(1),
                        Object::Real(-media_box.llx),
                        Object::Real(-media_box.lly),
                    ],
                    "Resources" => page.resources,
                },
                page.content,
            );
            forms.push((form, media_box.width(), media_box.height()));
        }

        self.doc.max_id = self.doc.max_id.max(source.max_id());
        self.doc.objects.extend(source.into_objects());

        Ok(forms
            .into_iter()
            .map(|(form, width, height)| ImportedPage {
                form: self.doc.add_object(form),
                width,
                height,
            })
            .collect())
    }

    /// Load `bytes` and import its pages.
    pub fn import_bytes(
        &mut self,
        bytes: &[u8],
        first_only: bool,
    ) -> Result<Vec<ImportedPage>, PdfError> {
        let source = SourceDocument::load_bytes(bytes)?;
        self.import(source, first_only)
    }

    /// Append a page of the given size drawing `canvas`.
    pub fn add_page(
        &mut self,
        size: (f32, f32),
        resources: PageResources,
        canvas: Canvas,
    ) -> Result<ObjectId, PdfError> {
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), canvas.encode()?));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(size.0),
                Object::Real(size.1),
            ],
            "Resources" => resources.into_dictionary(),
            "Contents" => content_id,
        });
        self.kids.push(page_id.into());
        Ok(page_id)
    }

    /// Write the page tree, drop whatever the imports brought along that no
    /// page uses, and serialize.
    pub fn finish(mut self) -> Result<Vec<u8>, PdfError> {
        if self.page_count() == 0 {
            return Err(PdfError::NoPages);
        }

        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        self.doc.prune_objects();
        self.doc.compress();

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| PdfError::Write(e.to_string()))?;
        Ok(bytes)
    }
}
