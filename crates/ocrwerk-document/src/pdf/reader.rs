// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: page tree inspection and embedded page-image extraction using
// the `lopdf` crate.

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use ocrwerk_core::error::{OcrwerkError, Result};
use tracing::{debug, instrument, warn};

/// Inheritable page attributes are looked up at most this many levels up.
const MAX_TREE_DEPTH: usize = 32;

/// Page size in PDF points, from `/MediaBox`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// An image XObject placed on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageImage {
    pub object_id: ObjectId,
    pub width: u32,
    pub height: u32,
}

impl PageImage {
    fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Read-only view of a PDF held in memory.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    /// Parse a PDF already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            OcrwerkError::RenderFailure(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Object id of the zero-based `page_index`.
    fn page_id(&self, page_index: usize) -> Result<ObjectId> {
        let pages = self.document.get_pages();
        // lopdf keys pages by 1-based page number.
        u32::try_from(page_index + 1)
            .ok()
            .and_then(|number| pages.get(&number).copied())
            .ok_or_else(|| {
                OcrwerkError::RenderFailure(format!(
                    "page {} out of range (document has {} pages)",
                    page_index + 1,
                    pages.len()
                ))
            })
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        match object {
            Object::Reference(id) => self.document.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn dict_of(&self, id: ObjectId) -> Option<&Dictionary> {
        match self.document.get_object(id).ok()? {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        }
    }

    /// Look `key` up on the page, then on its ancestors.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = self.dict_of(page_id)?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = current.get(key) {
                return self.resolve(value);
            }
            match current.get(b"Parent").ok()? {
                Object::Reference(parent) => current = self.dict_of(*parent)?,
                _ => return None,
            }
        }
        None
    }

    /// `/MediaBox` dimensions of a page.
    pub fn page_size(&self, page_index: usize) -> Result<PageSize> {
        let page_id = self.page_id(page_index)?;
        let media_box = match self.inherited(page_id, b"MediaBox") {
            Some(Object::Array(values)) if values.len() == 4 => values,
            _ => {
                return Err(OcrwerkError::RenderFailure(format!(
                    "page {} has no usable /MediaBox",
                    page_index + 1
                )));
            }
        };

        let coords: Vec<f32> = media_box
            .iter()
            .filter_map(|v| self.resolve(v).and_then(number))
            .collect();
        match coords.as_slice() {
            [x0, y0, x1, y1] => Ok(PageSize {
                width: (x1 - x0).abs(),
                height: (y1 - y0).abs(),
            }),
            _ => Err(OcrwerkError::RenderFailure(format!(
                "page {} has a malformed /MediaBox",
                page_index + 1
            ))),
        }
    }

    /// Image XObjects referenced from a page's resources, largest first.
    pub fn page_images(&self, page_index: usize) -> Result<Vec<PageImage>> {
        let page_id = self.page_id(page_index)?;
        let Some(Object::Dictionary(resources)) = self.inherited(page_id, b"Resources") else {
            return Ok(Vec::new());
        };
        let Some(Object::Dictionary(xobjects)) =
            resources.get(b"XObject").ok().and_then(|x| self.resolve(x))
        else {
            return Ok(Vec::new());
        };

        let mut images = Vec::new();
        for (_, value) in xobjects.iter() {
            let Object::Reference(object_id) = value else {
                continue;
            };
            let Ok(Object::Stream(stream)) = self.document.get_object(*object_id) else {
                continue;
            };
            if !name_is(stream.dict.get(b"Subtype").ok(), b"Image") {
                continue;
            }
            let width = self.dict_u32(&stream.dict, b"Width");
            let height = self.dict_u32(&stream.dict, b"Height");
            if let (Some(width), Some(height)) = (width, height) {
                images.push(PageImage {
                    object_id: *object_id,
                    width,
                    height,
                });
            }
        }

        images.sort_by_key(|image| std::cmp::Reverse(image.area()));
        Ok(images)
    }

    fn dict_u32(&self, dict: &Dictionary, key: &[u8]) -> Option<u32> {
        let value = self.resolve(dict.get(key).ok()?)?;
        value.as_i64().ok().and_then(|v| u32::try_from(v).ok())
    }

    /// Decode an embedded image into pixels.
    ///
    /// Handles JPEG (`/DCTDecode`) and 8-bit Gray/RGB/CMYK samples, raw or
    /// Flate-compressed. Anything else is a `RenderFailure`.
    #[instrument(skip(self), fields(object = ?image.object_id))]
    pub fn decode_image(&self, image: &PageImage) -> Result<DynamicImage> {
        let unsupported = |why: String| {
            OcrwerkError::RenderFailure(format!(
                "embedded image {:?} cannot be decoded: {why}",
                image.object_id
            ))
        };

        let stream = match self.document.get_object(image.object_id) {
            Ok(Object::Stream(stream)) => stream,
            _ => return Err(unsupported("not a stream".into())),
        };

        let filters = self.filters(stream);
        if filters.iter().any(|f| f.as_slice() == b"DCTDecode") {
            return image::load_from_memory(&stream.content)
                .map_err(|err| unsupported(format!("JPEG data: {err}")));
        }
        if let Some(other) = filters
            .iter()
            .find(|f| f.as_slice() != b"FlateDecode")
        {
            return Err(unsupported(format!(
                "filter /{} is not supported",
                String::from_utf8_lossy(other)
            )));
        }

        let bits = self.dict_u32(&stream.dict, b"BitsPerComponent").unwrap_or(8);
        if bits != 8 {
            return Err(unsupported(format!("{bits} bits per component")));
        }

        let samples = if filters.is_empty() {
            stream.content.clone()
        } else {
            stream
                .decompressed_content()
                .map_err(|err| unsupported(format!("Flate data: {err}")))?
        };

        let components = self
            .color_components(&stream.dict)
            .ok_or_else(|| unsupported("unsupported colour space".into()))?;
        samples_to_image(image.width, image.height, components, samples)
            .ok_or_else(|| unsupported("sample data is shorter than the image".into()))
    }

    /// Filter names applied to a stream, in order.
    fn filters(&self, stream: &Stream) -> Vec<Vec<u8>> {
        match stream.dict.get(b"Filter").ok().and_then(|f| self.resolve(f)) {
            Some(Object::Name(name)) => vec![name.clone()],
            Some(Object::Array(items)) => items
                .iter()
                .filter_map(|item| match self.resolve(item) {
                    Some(Object::Name(name)) => Some(name.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Colour components per sample: 1, 3, or 4.
    fn color_components(&self, dict: &Dictionary) -> Option<u8> {
        match self.resolve(dict.get(b"ColorSpace").ok()?)? {
            Object::Name(name) => match name.as_slice() {
                b"DeviceGray" | b"CalGray" => Some(1),
                b"DeviceRGB" | b"CalRGB" => Some(3),
                b"DeviceCMYK" => Some(4),
                _ => None,
            },
            Object::Array(items) => {
                let family = items.first().and_then(|f| self.resolve(f));
                if !name_is(family, b"ICCBased") {
                    return None;
                }
                let Some(Object::Stream(profile)) = items.get(1).and_then(|p| self.resolve(p))
                else {
                    return None;
                };
                match self.dict_u32(&profile.dict, b"N")? {
                    1 => Some(1),
                    3 => Some(3),
                    4 => Some(4),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Decode the largest decodable image on a page.
    pub fn largest_page_image(&self, page_index: usize) -> Result<DynamicImage> {
        let images = self.page_images(page_index)?;
        if images.is_empty() {
            return Err(OcrwerkError::RenderFailure(format!(
                "page {} has no embedded raster image",
                page_index + 1
            )));
        }

        let mut last_error = None;
        for image in &images {
            match self.decode_image(image) {
                Ok(decoded) => return Ok(decoded),
                Err(err) => {
                    warn!(%err, "Skipping unusable embedded image");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            OcrwerkError::RenderFailure(format!(
                "page {} has no decodable raster image",
                page_index + 1
            ))
        }))
    }
}

fn name_is(object: Option<&Object>, expected: &[u8]) -> bool {
    matches!(object, Some(Object::Name(name)) if name.as_slice() == expected)
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Build an image from interleaved 8-bit samples.
fn samples_to_image(
    width: u32,
    height: u32,
    components: u8,
    samples: Vec<u8>,
) -> Option<DynamicImage> {
    let pixels = width as usize * height as usize;
    match components {
        1 => {
            let mut samples = samples;
            samples.truncate(pixels);
            GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8)
        }
        3 => {
            let mut samples = samples;
            samples.truncate(pixels * 3);
            RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8)
        }
        4 => {
            if samples.len() < pixels * 4 {
                return None;
            }
            let rgb: Vec<u8> = samples
                .chunks_exact(4)
                .take(pixels)
                .flat_map(|cmyk| {
                    let k = 255 - u16::from(cmyk[3]);
                    let channel = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
                    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
                })
                .collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        _ => None,
    }
}
