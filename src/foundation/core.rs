use std::fmt;

use crate::foundation::error::{StyleCacheError, StyleCacheResult};

/// Prefix reserved for in-flight cache writes; never a valid path segment.
pub(crate) const TEMP_PREFIX: &str = ".stylecache-";

/// Stable identifier of a style; doubles as the style's cache directory name.
///
/// Ids are a single path segment. Numeric ids from a style document are kept in their decimal
/// form, so `5` and `"5"` name the same style.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "RawStyleId", into = "String")]
pub struct StyleId(String);

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawStyleId {
    Num(u64),
    Str(String),
}

impl StyleId {
    /// Validate and wrap a style id.
    pub fn new(id: impl Into<String>) -> StyleCacheResult<Self> {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() {
            return Err(StyleCacheError::validation("style id must be non-empty"));
        }
        if id == "." || id == ".." || id.contains(['/', '\\']) {
            return Err(StyleCacheError::validation(format!(
                "style id '{id}' must be a single path segment"
            )));
        }
        if id.starts_with(TEMP_PREFIX) {
            return Err(StyleCacheError::validation(format!(
                "style id '{id}' uses a reserved prefix"
            )));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<RawStyleId> for StyleId {
    type Error = StyleCacheError;

    fn try_from(value: RawStyleId) -> Result<Self, Self::Error> {
        match value {
            RawStyleId::Num(n) => Self::new(n.to_string()),
            RawStyleId::Str(s) => Self::new(s),
        }
    }
}

impl From<StyleId> for String {
    fn from(value: StyleId) -> Self {
        value.0
    }
}

impl std::str::FromStr for StyleId {
    type Err = StyleCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Opaque RGB color written as `#RGB` or `#RRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    /// Parse `#RGB` / `#RRGGBB` (case-insensitive). Anything else is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok();
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => Some(Self {
                r: nibble(0)? * 17,
                g: nibble(1)? * 17,
                b: nibble(2)? * 17,
            }),
            6 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
            }),
            _ => None,
        }
    }

    pub fn to_rgba(self, alpha: u8) -> [u8; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
