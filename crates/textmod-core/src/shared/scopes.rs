use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The editing strategy a modification request requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModificationScope {
    FullFile,
    TargetedNodes,
    ComponentAddition,
    ThemeChange,
    TextReplace,
}

impl ModificationScope {
    pub const ALL: [ModificationScope; 5] = [
        ModificationScope::TextReplace,
        ModificationScope::ThemeChange,
        ModificationScope::TargetedNodes,
        ModificationScope::ComponentAddition,
        ModificationScope::FullFile,
    ];

    /// Lower wins when two scopes are equally plausible.
    pub fn priority(self) -> u8 {
        match self {
            ModificationScope::TextReplace => 0,
            ModificationScope::ThemeChange => 1,
            ModificationScope::TargetedNodes => 2,
            ModificationScope::ComponentAddition => 3,
            ModificationScope::FullFile => 4,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            ModificationScope::FullFile => "FULL_FILE",
            ModificationScope::TargetedNodes => "TARGETED_NODES",
            ModificationScope::ComponentAddition => "COMPONENT_ADDITION",
            ModificationScope::ThemeChange => "THEME_CHANGE",
            ModificationScope::TextReplace => "TEXT_REPLACE",
        }
    }
}

impl fmt::Display for ModificationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ModificationScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "fullfile" => Ok(ModificationScope::FullFile),
            "targetednodes" | "targetednode" => Ok(ModificationScope::TargetedNodes),
            "componentaddition" => Ok(ModificationScope::ComponentAddition),
            "themechange" => Ok(ModificationScope::ThemeChange),
            "textreplace" | "textreplacement" => Ok(ModificationScope::TextReplace),
            _ => Err(format!("unknown modification scope: {}", s.trim())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScopeDefinition {
    pub scope: ModificationScope,
    pub name: &'static str,
    pub description: &'static str,
}

pub static SCOPES: Lazy<Vec<ScopeDefinition>> = Lazy::new(|| {
    vec![
        ScopeDefinition {
            scope: ModificationScope::TextReplace,
            name: "Text replacement",
            description: "Change visible wording only: headings, labels, button text, paragraphs. \
                          The user names the current text and the new text.",
        },
        ScopeDefinition {
            scope: ModificationScope::ThemeChange,
            name: "Theme change",
            description: "Global colors, palette, dark/light mode or brand styling with no single \
                          element targeted.",
        },
        ScopeDefinition {
            scope: ModificationScope::TargetedNodes,
            name: "Targeted nodes",
            description: "Styling or attribute edits on one specific element (this button, the \
                          header, that card).",
        },
        ScopeDefinition {
            scope: ModificationScope::ComponentAddition,
            name: "Component addition",
            description: "Create a new component, section, page or form.",
        },
        ScopeDefinition {
            scope: ModificationScope::FullFile,
            name: "Full file",
            description: "Broad structural work: redesigns, layout changes, edits across \
                          everything.",
        },
    ]
});

pub fn get_scope_definition(scope: ModificationScope) -> &'static ScopeDefinition {
    SCOPES
        .iter()
        .find(|d| d.scope == scope)
        .unwrap_or(&SCOPES[SCOPES.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_str_is_tolerant() {
        let cases = vec![
            ("TEXT_REPLACE", ModificationScope::TextReplace),
            ("text-replace", ModificationScope::TextReplace),
            ("TextReplace", ModificationScope::TextReplace),
            (" theme_change ", ModificationScope::ThemeChange),
            ("TARGETED_NODES", ModificationScope::TargetedNodes),
            ("component addition", ModificationScope::ComponentAddition),
            ("FULL_FILE", ModificationScope::FullFile),
        ];

        for (input, expected) in cases {
            assert_eq!(input.parse::<ModificationScope>(), Ok(expected), "input: {}", input);
        }
        assert!("REWRITE_EVERYTHING".parse::<ModificationScope>().is_err());
    }

    #[test]
    fn test_priority_order() {
        let mut scopes = ModificationScope::ALL.to_vec();
        scopes.reverse();
        scopes.sort_by_key(|s| s.priority());
        assert_eq!(scopes, ModificationScope::ALL.to_vec());
    }

    #[test]
    fn test_every_scope_has_a_definition() {
        for scope in ModificationScope::ALL {
            assert_eq!(get_scope_definition(scope).scope, scope);
        }
    }
}
