//! Page layout engines
//!
//! The extractor never reads the document container itself. A layout engine
//! hands it the horizontally oriented text regions of each page, in page
//! order, and the fragment stream places them in one vertical coordinate
//! space spanning the whole document.
//!
//! ```text
//! engine output (per page)
//!     ↓
//! [LayoutEngine]      TextRegion, page coordinates
//!     ↓
//! [FragmentStream]    PositionedFragment, document coordinates
//!     ↓
//! ExtractionSession
//! ```
//!
//! ## Available engines
//!
//! - `BboxXhtmlEngine` - poppler `pdftotext -bbox-layout` output
//! - `JsonLayoutEngine` - pre-extracted regions as JSON

pub mod bbox_xhtml;
pub mod json;

use crate::error::ExtractError;
use crate::types::{PageFragments, PositionedFragment, TextRegion};
use std::path::Path;

pub use bbox_xhtml::BboxXhtmlEngine;
pub use json::JsonLayoutEngine;

/// Source of per-page text regions.
///
/// Called once per page, in order, starting at page 0. `Ok(None)` means the
/// document has no more pages; an error means the page could not be laid
/// out and the document cannot be extracted.
pub trait LayoutEngine {
    fn layout_page(&mut self, page_index: usize) -> Result<Option<Vec<TextRegion>>, ExtractError>;

    /// Engine name for logging
    fn name(&self) -> &str;
}

impl<E: LayoutEngine + ?Sized> LayoutEngine for Box<E> {
    fn layout_page(&mut self, page_index: usize) -> Result<Option<Vec<TextRegion>>, ExtractError> {
        (**self).layout_page(page_index)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Backend enum for runtime engine selection
pub enum LayoutBackend {
    BboxXhtml(BboxXhtmlEngine),
    Json(JsonLayoutEngine),
}

impl LayoutBackend {
    /// Pick an engine from the file extension.
    pub fn for_file(path: &Path, content: String) -> Result<Self, ExtractError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();
        match extension.as_str() {
            "json" => Ok(LayoutBackend::Json(JsonLayoutEngine::from_json(&content)?)),
            "html" | "xhtml" | "xml" => Ok(LayoutBackend::BboxXhtml(BboxXhtmlEngine::new(content))),
            other => Err(ExtractError::Document(format!(
                "no layout engine for '.{}' files (expected .json, .html, .xhtml or .xml)",
                other
            ))),
        }
    }

    pub fn supports_file_type(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                matches!(
                    ext.to_lowercase().as_str(),
                    "json" | "html" | "xhtml" | "xml"
                )
            })
            .unwrap_or(false)
    }
}

impl LayoutEngine for LayoutBackend {
    fn layout_page(&mut self, page_index: usize) -> Result<Option<Vec<TextRegion>>, ExtractError> {
        match self {
            LayoutBackend::BboxXhtml(engine) => engine.layout_page(page_index),
            LayoutBackend::Json(engine) => engine.layout_page(page_index),
        }
    }

    fn name(&self) -> &str {
        match self {
            LayoutBackend::BboxXhtml(engine) => engine.name(),
            LayoutBackend::Json(engine) => engine.name(),
        }
    }
}

/// Largest absolute coordinate a fragment may carry once placed; row keys
/// hold hundredths in an `i64`.
pub const MAX_COORDINATE: f64 = 1.0e12;

/// Lazy, page-ordered sequence of normalized fragments.
///
/// Each region's `y` becomes `page_index * page_stride + y`, rounded to two
/// decimals. Text is trimmed and blank regions are dropped. The stream ends
/// after the last page or after the first engine failure.
pub struct FragmentStream<E> {
    engine: E,
    page_stride: f64,
    next_page: usize,
    finished: bool,
}

impl<E: LayoutEngine> FragmentStream<E> {
    pub fn new(engine: E, page_stride: f64) -> Self {
        Self {
            engine,
            page_stride,
            next_page: 0,
            finished: false,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// `Ok(None)` for blank regions. Geometry that cannot be placed fails the page.
    fn place(
        &self,
        page_index: usize,
        region: TextRegion,
    ) -> Result<Option<PositionedFragment>, ExtractError> {
        let text = region.text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let y = page_index as f64 * self.page_stride + region.y;
        for (name, value) in [("x", region.x), ("y", y), ("height", region.height)] {
            if !value.is_finite() || value.abs() > MAX_COORDINATE {
                return Err(ExtractError::Upstream {
                    page: page_index,
                    reason: format!("region '{}' has unusable {} coordinate {}", text, name, value),
                });
            }
        }
        Ok(Some(PositionedFragment::new(
            region.x,
            round2(y),
            round2(region.height),
            text,
        )))
    }
}

impl<E: LayoutEngine> Iterator for FragmentStream<E> {
    type Item = Result<PageFragments, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let page_index = self.next_page;
        match self.engine.layout_page(page_index) {
            Ok(Some(regions)) => {
                self.next_page += 1;
                let fragments = regions
                    .into_iter()
                    .filter_map(|region| self.place(page_index, region).transpose())
                    .collect::<Result<Vec<_>, _>>();
                match fragments {
                    Ok(fragments) => Some(Ok(PageFragments {
                        page_index,
                        fragments,
                    })),
                    Err(e) => {
                        self.finished = true;
                        Some(Err(e))
                    }
                }
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<E: LayoutEngine> std::iter::FusedIterator for FragmentStream<E> {}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves canned pages and fails on request.
    struct ScriptedEngine {
        pages: Vec<Vec<TextRegion>>,
        fail_on: Option<usize>,
    }

    impl LayoutEngine for ScriptedEngine {
        fn layout_page(&mut self, page_index: usize) -> Result<Option<Vec<TextRegion>>, ExtractError> {
            if self.fail_on == Some(page_index) {
                return Err(ExtractError::Upstream {
                    page: page_index,
                    reason: "broken content stream".to_string(),
                });
            }
            Ok(self.pages.get(page_index).cloned())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn region(y: f64, text: &str) -> TextRegion {
        TextRegion {
            x: 10.0,
            y,
            height: 8.004,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_pages_placed_in_one_coordinate_space() {
        let engine = ScriptedEngine {
            pages: vec![
                vec![region(700.123, " Charge No. "), region(650.0, "   ")],
                vec![region(700.0, "Capital")],
            ],
            fail_on: None,
        };
        let pages: Vec<_> = FragmentStream::new(engine, 1000.0)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].fragments.len(), 1);
        assert_eq!(pages[0].fragments[0].text, "Charge No.");
        assert_eq!(pages[0].fragments[0].y, 700.12);
        assert_eq!(pages[0].fragments[0].height, 8.0);
        assert_eq!(pages[1].page_index, 1);
        assert_eq!(pages[1].fragments[0].y, 1700.0);
    }

    #[test]
    fn test_stream_stops_after_failure() {
        let engine = ScriptedEngine {
            pages: vec![vec![region(700.0, "a")], vec![region(700.0, "b")]],
            fail_on: Some(1),
        };
        let mut stream = FragmentStream::new(engine, 1000.0);
        assert!(stream.next().unwrap().is_ok());
        assert!(matches!(
            stream.next(),
            Some(Err(ExtractError::Upstream { page: 1, .. }))
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_unplaceable_coordinates_fail_the_page() {
        for y in [f64::NAN, f64::INFINITY, 1e20] {
            let engine = ScriptedEngine {
                pages: vec![vec![region(700.0, "ok"), region(y, "bad")]],
                fail_on: None,
            };
            let mut stream = FragmentStream::new(engine, 1000.0);
            assert!(
                matches!(stream.next(), Some(Err(ExtractError::Upstream { page: 0, .. }))),
                "y = {y} was accepted"
            );
            assert!(stream.next().is_none());
        }
    }

    #[test]
    fn test_blank_region_geometry_is_not_checked() {
        let engine = ScriptedEngine {
            pages: vec![vec![region(f64::NAN, "  ")]],
            fail_on: None,
        };
        let pages: Vec<_> = FragmentStream::new(engine, 1000.0)
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(pages[0].fragments.is_empty());
    }

    #[test]
    fn test_backend_selected_by_extension() {
        let json = r#"{"pages": []}"#.to_string();
        let backend = LayoutBackend::for_file(Path::new("filing.JSON"), json).unwrap();
        assert_eq!(backend.name(), "json");
        assert!(LayoutBackend::supports_file_type(Path::new("filing.xhtml")));
        assert!(!LayoutBackend::supports_file_type(Path::new("filing.pdf")));
        assert!(matches!(
            LayoutBackend::for_file(Path::new("filing.pdf"), String::new()),
            Err(ExtractError::Document(_))
        ));
    }
}
