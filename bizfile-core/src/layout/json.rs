use super::LayoutEngine;
use crate::error::ExtractError;
use crate::types::TextRegion;
use serde::{Deserialize, Serialize};

/// Regions already extracted by some other tool, one array per page:
/// `{"pages": [[{"x": .., "y": .., "height": .., "text": ".."}, ..], ..]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonLayout {
    pub pages: Vec<Vec<TextRegion>>,
}

pub struct JsonLayoutEngine {
    layout: JsonLayout,
}

impl JsonLayoutEngine {
    pub fn new(layout: JsonLayout) -> Self {
        Self { layout }
    }

    pub fn from_json(content: &str) -> Result<Self, ExtractError> {
        let layout: JsonLayout = serde_json::from_str(content)
            .map_err(|e| ExtractError::Document(format!("invalid layout JSON: {}", e)))?;
        Ok(Self::new(layout))
    }

    pub fn page_count(&self) -> usize {
        self.layout.pages.len()
    }
}

impl LayoutEngine for JsonLayoutEngine {
    fn layout_page(&mut self, page_index: usize) -> Result<Option<Vec<TextRegion>>, ExtractError> {
        Ok(self.layout.pages.get(page_index).cloned())
    }

    fn name(&self) -> &str {
        "json"
    }
}
