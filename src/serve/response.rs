use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use image::ImageFormat;

use crate::foundation::error::{StyleCacheError, StyleCacheResult};

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// HTTP cache metadata for one served artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheHeaders {
    /// `public, max-age=N`.
    pub cache_control: String,
    /// IMF-fixdate of the artifact's modification time.
    pub last_modified: String,
    pub content_length: u64,
    pub content_type: String,
}

impl CacheHeaders {
    /// Derive headers from the artifact on disk.
    pub fn for_file(path: &Path, max_age_secs: u64) -> StyleCacheResult<Self> {
        let meta = std::fs::metadata(path)?;
        let modified = meta.modified()?;
        Ok(Self {
            cache_control: format!("public, max-age={max_age_secs}"),
            last_modified: http_date(modified),
            content_length: meta.len(),
            content_type: content_type(path).to_string(),
        })
    }

    /// Header name/value pairs in emission order.
    pub fn pairs(&self) -> [(&'static str, String); 4] {
        [
            ("Cache-Control", self.cache_control.clone()),
            ("Last-Modified", self.last_modified.clone()),
            ("Content-Length", self.content_length.to_string()),
            ("Content-Type", self.content_type.clone()),
        ]
    }
}

/// A cache artifact ready to be written to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Served {
    pub path: PathBuf,
    pub body: Vec<u8>,
    pub headers: CacheHeaders,
    /// `true` when this request produced the artifact, `false` on a cache hit.
    pub generated: bool,
}

impl Served {
    pub(crate) fn from_file(
        path: PathBuf,
        max_age_secs: u64,
        generated: bool,
    ) -> StyleCacheResult<Self> {
        let body = std::fs::read(&path)?;
        let mut headers = CacheHeaders::for_file(&path, max_age_secs)?;
        // The file may be replaced by an identical concurrent write between the two reads.
        headers.content_length = body.len() as u64;
        Ok(Self {
            path,
            body,
            headers,
            generated,
        })
    }
}

/// Outcome of one request. Every failure is the same `NotFound`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Served(Served),
    NotFound,
}

impl Response {
    pub fn status(&self) -> u16 {
        match self {
            Self::Served(_) => 200,
            Self::NotFound => 404,
        }
    }

    pub fn served(&self) -> Option<&Served> {
        match self {
            Self::Served(s) => Some(s),
            Self::NotFound => None,
        }
    }

    pub fn into_served(self) -> StyleCacheResult<Served> {
        match self {
            Self::Served(s) => Ok(s),
            Self::NotFound => Err(StyleCacheError::not_found("no such image")),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

pub fn http_date(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).format(HTTP_DATE).to_string()
}

/// MIME type by file extension, `application/octet-stream` when unknown.
pub fn content_type(path: &Path) -> &'static str {
    ImageFormat::from_path(path)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream")
}

#[cfg(test)]
#[path = "../../tests/unit/serve/response.rs"]
mod tests;
