//! Poppler bbox XHTML engine
//!
//! Reads the output of `pdftotext -bbox-layout`:
//!
//! ```text
//! <page width=".." height="..">
//!   <flow><block xMin yMin xMax yMax>
//!     <line ..><word ..>Charge</word><word ..>No.</word></line>
//!   </block></flow>
//! </page>
//! ```
//!
//! Every `<block>` becomes one text region: its lines joined by newlines,
//! words by spaces. Poppler measures y from the top of the page; regions
//! are reported bottom-up (`y = page height - yMin`), so rows further down
//! the page have smaller keys.

use super::LayoutEngine;
use crate::error::ExtractError;
use crate::types::TextRegion;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Layout engine over a complete bbox XHTML document, read one page per call.
pub struct BboxXhtmlEngine {
    xhtml: String,
    /// Byte offset just past the last page read
    position: usize,
    pages_read: usize,
}

#[derive(Default)]
struct BlockBuilder {
    x: f64,
    y_min: f64,
    y_max: f64,
    lines: Vec<String>,
}

impl BboxXhtmlEngine {
    pub fn new(xhtml: String) -> Self {
        Self {
            xhtml,
            position: 0,
            pages_read: 0,
        }
    }

    fn read_next_page(&mut self, page: usize) -> Result<Option<Vec<TextRegion>>, ExtractError> {
        let upstream = |reason: String| ExtractError::Upstream { page, reason };

        let rest = &self.xhtml[self.position..];
        let mut reader = Reader::from_str(rest);
        reader.trim_text(true);
        // reading starts mid-document, so closing tags of the outer elements are unbalanced
        reader.check_end_names(false);

        let mut page_height: Option<f64> = None;
        let mut regions = Vec::new();
        let mut block: Option<BlockBuilder> = None;
        let mut line: Vec<String> = Vec::new();
        let mut word: Option<String> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| upstream(format!("malformed XHTML: {}", e)))?;
            match event {
                Event::Start(e) => match e.name().as_ref() {
                    b"page" => page_height = Some(attr_f64(&e, "height", page)?),
                    b"block" if page_height.is_some() => {
                        block = Some(BlockBuilder {
                            x: attr_f64(&e, "xMin", page)?,
                            y_min: attr_f64(&e, "yMin", page)?,
                            y_max: attr_f64(&e, "yMax", page)?,
                            lines: Vec::new(),
                        });
                    }
                    b"line" => line.clear(),
                    b"word" => word = Some(String::new()),
                    _ => {}
                },
                Event::Empty(e) if e.name().as_ref() == b"page" => {
                    self.position += reader.buffer_position();
                    return Ok(Some(Vec::new()));
                }
                Event::Text(t) => {
                    if let Some(word) = word.as_mut() {
                        let text = t
                            .unescape()
                            .map_err(|e| upstream(format!("bad text: {}", e)))?;
                        word.push_str(&text);
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    b"word" => {
                        if let Some(word) = word.take() {
                            line.push(word);
                        }
                    }
                    b"line" => {
                        if let Some(block) = block.as_mut() {
                            block.lines.push(line.join(" "));
                        }
                        line.clear();
                    }
                    b"block" => {
                        if let (Some(finished), Some(height)) = (block.take(), page_height) {
                            regions.push(TextRegion {
                                x: finished.x,
                                y: height - finished.y_min,
                                height: finished.y_max - finished.y_min,
                                text: finished.lines.join("\n"),
                            });
                        }
                    }
                    b"page" => {
                        self.position += reader.buffer_position();
                        return Ok(Some(regions));
                    }
                    _ => {}
                },
                Event::Eof => {
                    return if page_height.is_some() {
                        Err(upstream("document ends inside a page".to_string()))
                    } else {
                        self.position = self.xhtml.len();
                        Ok(None)
                    };
                }
                _ => {}
            }
        }
    }
}

impl LayoutEngine for BboxXhtmlEngine {
    fn layout_page(&mut self, page_index: usize) -> Result<Option<Vec<TextRegion>>, ExtractError> {
        if page_index != self.pages_read {
            return Err(ExtractError::Upstream {
                page: page_index,
                reason: format!("pages must be read in order (next is {})", self.pages_read),
            });
        }
        let page = self.read_next_page(page_index)?;
        if page.is_some() {
            self.pages_read += 1;
        }
        Ok(page)
    }

    fn name(&self) -> &str {
        "bbox-xhtml"
    }
}

fn attr_f64(element: &BytesStart, name: &str, page: usize) -> Result<f64, ExtractError> {
    let upstream = |reason: String| ExtractError::Upstream { page, reason };
    let attribute = element
        .try_get_attribute(name)
        .map_err(|e| upstream(format!("bad attribute '{}': {}", name, e)))?
        .ok_or_else(|| upstream(format!("missing attribute '{}'", name)))?;
    let value = attribute
        .unescape_value()
        .map_err(|e| upstream(format!("bad attribute '{}': {}", name, e)))?;
    value
        .trim()
        .parse()
        .map_err(|_| upstream(format!("attribute '{}' is not a number: {}", name, value)))
}
