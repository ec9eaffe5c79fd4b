//! Page-level settings edits.

use bio_common::{Handle, ServiceError, ServiceResult};
use bio_layout::Page;
use serde::{Deserialize, Serialize};

/// Partial update of a page's settings; absent fields are left alone
///
/// An empty `description` or `image_url` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    /// Raw handle input, normalized with [`Handle::parse`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

impl PageSettings {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn handle(raw: impl Into<String>) -> Self {
        Self {
            handle: Some(raw.into()),
            ..Self::default()
        }
    }

    pub fn visibility(is_public: bool) -> Self {
        Self {
            is_public: Some(is_public),
            ..Self::default()
        }
    }

    /// Normalized new handle, if one was requested
    pub fn parsed_handle(&self) -> ServiceResult<Option<Handle>> {
        self.handle
            .as_deref()
            .map(Handle::parse)
            .transpose()
            .map_err(ServiceError::from)
    }

    /// Check every field without touching a page
    pub fn validate(&self) -> ServiceResult<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ServiceError::validation("title cannot be empty"));
            }
        }
        self.parsed_handle()?;
        Ok(())
    }

    /// Next state of `page` with these settings applied
    pub fn apply(&self, page: &Page) -> ServiceResult<Page> {
        self.validate()?;

        let mut next = page.clone();
        if let Some(title) = &self.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            next.description = non_empty(description);
        }
        if let Some(image_url) = &self.image_url {
            next.image_url = non_empty(image_url);
        }
        if let Some(is_public) = self.is_public {
            next.is_public = is_public;
        }
        if let Some(handle) = self.parsed_handle()? {
            next.handle = handle;
        }
        Ok(next)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
