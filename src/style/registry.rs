use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::foundation::core::StyleId;
use crate::foundation::error::{StyleCacheError, StyleCacheResult};
use crate::style::action::{Action, parse_and_validate};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleStatus {
    #[default]
    Enabled,
    Disabled,
}

/// A named, ordered chain of validated actions.
#[derive(Clone, Debug, PartialEq)]
pub struct Style {
    pub id: StyleId,
    pub name: String,
    pub status: StyleStatus,
    actions: Vec<Action>,
}

impl Style {
    /// Build a style from action text lines, validating them as one batch.
    pub fn new<S: AsRef<str>>(
        id: StyleId,
        name: impl Into<String>,
        status: StyleStatus,
        lines: &[S],
    ) -> StyleCacheResult<Self> {
        let actions = parse_and_validate(lines)?;
        Ok(Self::from_actions(id, name, status, actions))
    }

    /// Build a style from already validated actions. Actions are kept in ascending `order`,
    /// ties in the given sequence.
    pub fn from_actions(
        id: StyleId,
        name: impl Into<String>,
        status: StyleStatus,
        mut actions: Vec<Action>,
    ) -> Self {
        actions.sort_by_key(|a| a.order);
        Self {
            id,
            name: name.into(),
            status,
            actions,
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn is_enabled(&self) -> bool {
        self.status == StyleStatus::Enabled
    }

    /// Action chain rendered back to its line form.
    pub fn action_lines(&self) -> Vec<String> {
        self.actions.iter().map(ToString::to_string).collect()
    }
}

/// Selection passed to [`StyleSource::list`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleFilter {
    All,
    Enabled,
    Disabled,
}

impl StyleFilter {
    fn admits(self, style: &Style) -> bool {
        match self {
            Self::All => true,
            Self::Enabled => style.is_enabled(),
            Self::Disabled => !style.is_enabled(),
        }
    }
}

/// Read side of the style configuration store.
pub trait StyleSource: Send + Sync {
    fn get(&self, id: &StyleId) -> Option<Style>;

    fn list(&self, filter: StyleFilter) -> Vec<Style>;
}

#[derive(serde::Deserialize)]
struct StyleDocument {
    styles: Vec<StyleRecord>,
}

#[derive(serde::Deserialize)]
struct StyleRecord {
    id: StyleId,
    #[serde(default)]
    name: String,
    #[serde(default = "default_status")]
    status: bool,
    #[serde(default)]
    actions: Vec<String>,
}

fn default_status() -> bool {
    true
}

/// In-memory style store, optionally loaded from a JSON style document.
///
/// ```json
/// { "styles": [ { "id": "thumb", "name": "Thumbnail", "status": true,
///                 "actions": ["resize 100,100"] } ] }
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryStyleSource {
    styles: BTreeMap<StyleId, Style>,
}

impl MemoryStyleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, style: Style) -> Option<Style> {
        self.styles.insert(style.id.clone(), style)
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.insert(style);
        self
    }

    pub fn from_json_str(json: &str) -> StyleCacheResult<Self> {
        let doc: StyleDocument =
            serde_json::from_str(json).map_err(|e| StyleCacheError::serde(e.to_string()))?;

        let mut out = Self::new();
        for record in doc.styles {
            let status = if record.status {
                StyleStatus::Enabled
            } else {
                StyleStatus::Disabled
            };
            let id = record.id;
            let style = Style::new(id.clone(), record.name, status, record.actions.as_slice())
                .map_err(|e| StyleCacheError::validation(format!("style '{id}': {e}")))?;
            if out.insert(style).is_some() {
                return Err(StyleCacheError::validation(format!(
                    "duplicate style id '{id}'"
                )));
            }
        }
        Ok(out)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> StyleCacheResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            StyleCacheError::validation(format!("read style document '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

impl StyleSource for MemoryStyleSource {
    fn get(&self, id: &StyleId) -> Option<Style> {
        self.styles.get(id).cloned()
    }

    fn list(&self, filter: StyleFilter) -> Vec<Style> {
        self.styles
            .values()
            .filter(|s| filter.admits(s))
            .cloned()
            .collect()
    }
}

/// Read-through view over a [`StyleSource`].
///
/// Styles fetched once are kept for the lifetime of the registry. Edits made to the backing store
/// are only observed after [`StyleRegistry::forget`] or [`StyleRegistry::forget_all`].
pub struct StyleRegistry {
    source: Arc<dyn StyleSource>,
    cache: RwLock<HashMap<StyleId, Arc<Style>>>,
}

impl StyleRegistry {
    pub fn new(source: Arc<dyn StyleSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a usable style. Absent, disabled and action-less styles are all `NotFound`.
    pub fn get_style(&self, id: &StyleId) -> StyleCacheResult<Arc<Style>> {
        let cached = self.cache.read().get(id).cloned();
        let style = match cached {
            Some(style) => style,
            None => {
                let style = self
                    .source
                    .get(id)
                    .map(Arc::new)
                    .ok_or_else(|| StyleCacheError::not_found(format!("style '{id}'")))?;
                self.cache.write().insert(id.clone(), Arc::clone(&style));
                style
            }
        };

        if !style.is_enabled() {
            return Err(StyleCacheError::not_found(format!(
                "style '{id}' is disabled"
            )));
        }
        if style.actions().is_empty() {
            return Err(StyleCacheError::not_found(format!(
                "style '{id}' has no actions"
            )));
        }
        Ok(style)
    }

    /// Every enabled style that has at least one action.
    pub fn list_enabled(&self) -> Vec<Arc<Style>> {
        let styles: Vec<Arc<Style>> = self
            .source
            .list(StyleFilter::Enabled)
            .into_iter()
            .filter(|s| s.is_enabled() && !s.actions().is_empty())
            .map(Arc::new)
            .collect();

        let mut cache = self.cache.write();
        for style in &styles {
            cache.insert(style.id.clone(), Arc::clone(style));
        }
        styles
    }

    /// Drop the cached copy of one style.
    pub fn forget(&self, id: &StyleId) {
        self.cache.write().remove(id);
    }

    pub fn forget_all(&self) {
        self.cache.write().clear();
    }
}

impl std::fmt::Debug for StyleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyleRegistry")
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/style/registry.rs"]
mod tests;
