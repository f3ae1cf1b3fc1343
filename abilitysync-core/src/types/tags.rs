//! Gameplay tag containers
//!
//! Spreadsheet exports write tag containers either as JSON arrays or as a
//! single separator-joined cell (`"State.Burning, State.Debuff"`). Both
//! decode into the same ordered set so that comparisons are order-free.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// A single hierarchical tag, e.g. `State.Burning`. Empty means "no tag".
pub type GameplayTag = String;

/// Ordered set of gameplay tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TagContainer(BTreeSet<GameplayTag>);

impl TagContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Add a tag; blank tags are ignored
    pub fn add(&mut self, tag: impl Into<GameplayTag>) {
        let tag = tag.into();
        let tag = tag.trim();
        if !tag.is_empty() {
            self.0.insert(tag.to_string());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameplayTag> {
        self.0.iter()
    }

    /// Parse a separator-joined cell (`,` `;` or `|`)
    pub fn parse(cell: &str) -> Self {
        let mut container = Self::new();
        for tag in cell.split([',', ';', '|']) {
            container.add(tag);
        }
        container
    }
}

impl<S: Into<GameplayTag>> FromIterator<S> for TagContainer {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut container = Self::new();
        for tag in iter {
            container.add(tag);
        }
        container
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagContainerRepr {
    List(Vec<String>),
    Cell(String),
    Wrapped {
        #[serde(rename = "GameplayTags", alias = "gameplayTags")]
        gameplay_tags: Vec<WrappedTag>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WrappedTag {
    Plain(String),
    Named {
        #[serde(rename = "TagName", alias = "tagName")]
        tag_name: String,
    },
}

impl<'de> Deserialize<'de> for TagContainer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match TagContainerRepr::deserialize(deserializer)? {
            TagContainerRepr::List(tags) => tags.into_iter().collect(),
            TagContainerRepr::Cell(cell) => Self::parse(&cell),
            TagContainerRepr::Wrapped { gameplay_tags } => gameplay_tags
                .into_iter()
                .map(|tag| match tag {
                    WrappedTag::Plain(name) | WrappedTag::Named { tag_name: name } => name,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell() {
        let tags = TagContainer::parse("State.Burning, State.Debuff;;  |Damage.Fire");
        assert_eq!(tags.len(), 3);
        assert!(tags.contains("State.Burning"));
        assert!(tags.contains("Damage.Fire"));
    }

    #[test]
    fn test_deserialize_shapes() {
        let list: TagContainer = serde_json::from_str(r#"["B.Tag", "A.Tag", ""]"#).unwrap();
        let cell: TagContainer = serde_json::from_str(r#""A.Tag,B.Tag""#).unwrap();
        let wrapped: TagContainer =
            serde_json::from_str(r#"{"GameplayTags":[{"TagName":"A.Tag"},{"TagName":"B.Tag"}]}"#)
                .unwrap();
        assert_eq!(list, cell);
        assert_eq!(list, wrapped);
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"["A.Tag","B.Tag"]"#);
    }

    #[test]
    fn test_empty_cell_is_empty() {
        let tags: TagContainer = serde_json::from_str(r#""""#).unwrap();
        assert!(tags.is_empty());
    }
}
