//! Diagnostic taxonomy reported by failing checks

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A rule violation found on a page.
///
/// Serialises as `{"id": "...", "values": {...}}`; variants without
/// interpolation data omit `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "id", content = "values", rename_all = "camelCase")]
pub enum Diagnostic {
    /// No `<meta name="color-scheme">` declaring both light and dark.
    NotColorScheme,

    /// The dark theme toggle is missing from the header.
    SwitchButtonsChanged,

    /// The dark render's dominant palette drifted from the canonical one.
    NotDarkColorScheme,

    /// A block does not fill the viewport height exactly.
    BlockNotFullScreen { name: String },

    SemanticTagsMissing {
        #[serde(rename = "tagNames")]
        tag_names: String,
    },

    NotResetMargins {
        #[serde(rename = "tagNames")]
        tag_names: String,
    },

    NotFixedBackground { selector: String },
}

impl Diagnostic {
    /// Every id the checks can emit, in declaration order.
    pub const IDS: [&'static str; 7] = [
        "notColorScheme",
        "switchButtonsChanged",
        "notDarkColorScheme",
        "blockNotFullScreen",
        "semanticTagsMissing",
        "notResetMargins",
        "notFixedBackground",
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Diagnostic::NotColorScheme => "notColorScheme",
            Diagnostic::SwitchButtonsChanged => "switchButtonsChanged",
            Diagnostic::NotDarkColorScheme => "notDarkColorScheme",
            Diagnostic::BlockNotFullScreen { .. } => "blockNotFullScreen",
            Diagnostic::SemanticTagsMissing { .. } => "semanticTagsMissing",
            Diagnostic::NotResetMargins { .. } => "notResetMargins",
            Diagnostic::NotFixedBackground { .. } => "notFixedBackground",
        }
    }

    /// Interpolation values keyed the way message templates expect them.
    pub fn values(&self) -> BTreeMap<&'static str, String> {
        let mut values = BTreeMap::new();
        match self {
            Diagnostic::NotColorScheme
            | Diagnostic::SwitchButtonsChanged
            | Diagnostic::NotDarkColorScheme => {}
            Diagnostic::BlockNotFullScreen { name } => {
                values.insert("name", name.clone());
            }
            Diagnostic::SemanticTagsMissing { tag_names }
            | Diagnostic::NotResetMargins { tag_names } => {
                values.insert("tagNames", tag_names.clone());
            }
            Diagnostic::NotFixedBackground { selector } => {
                values.insert("selector", selector.clone());
            }
        }
        values
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.values();
        if values.is_empty() {
            return f.write_str(self.id());
        }

        let rendered: Vec<String> = values
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        write!(f, "{} ({})", self.id(), rendered.join(", "))
    }
}
