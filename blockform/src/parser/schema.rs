//! Raw serde shapes of a declaration file, before validation and lowering.

use std::fmt;

use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use toml::Spanned;

#[derive(Debug, Deserialize)]
pub(crate) struct RawDocument {
    #[serde(default, rename = "block")]
    pub blocks: Vec<Spanned<RawBlock>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawBlock {
    pub name: Spanned<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub form_template: Option<String>,
    #[serde(default)]
    pub extends: Option<Spanned<String>>,
    #[serde(default, rename = "field")]
    pub fields: Vec<Spanned<RawField>>,
    #[serde(default)]
    pub layout: Option<Spanned<RawLayout>>,
    #[serde(default, rename = "edit")]
    pub edits: Vec<Spanned<RawEdit>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawField {
    pub name: Spanned<String>,
    #[serde(rename = "type")]
    pub kind: Spanned<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub default: Option<Spanned<toml::Value>>,
    #[serde(default)]
    pub choices: Vec<(String, String)>,
    #[serde(default)]
    pub block: Option<Spanned<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawGroup {
    #[serde(default)]
    pub children: Vec<Spanned<RawNode>>,
    #[serde(default)]
    pub settings: Vec<Spanned<RawNode>>,
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub classname: Option<String>,
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub attrs: Option<Spanned<toml::Table>>,
    #[serde(default)]
    pub label_format: Option<Spanned<String>>,
}

/// A layout entry: a bare string names a field, a table is a group.
#[derive(Debug)]
pub(crate) enum RawNode {
    Field(String),
    Group(RawGroup),
}

impl<'de> Deserialize<'de> for RawNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NodeVisitor;

        impl<'de> Visitor<'de> for NodeVisitor {
            type Value = RawNode;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a field name or a group table")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RawNode, E> {
                Ok(RawNode::Field(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<RawNode, E> {
                Ok(RawNode::Field(v))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<RawNode, A::Error> {
                RawGroup::deserialize(MapAccessDeserializer::new(map)).map(RawNode::Group)
            }
        }

        deserializer.deserialize_any(NodeVisitor)
    }
}

/// A whole layout: an array is a flat layout, a table is the root group.
#[derive(Debug)]
pub(crate) enum RawLayout {
    Flat(Vec<Spanned<RawNode>>),
    Root(RawGroup),
}

impl<'de> Deserialize<'de> for RawLayout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LayoutVisitor;

        impl<'de> Visitor<'de> for LayoutVisitor {
            type Value = RawLayout;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array of layout entries or a root group table")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<RawLayout, A::Error> {
                Vec::<Spanned<RawNode>>::deserialize(SeqAccessDeserializer::new(seq))
                    .map(RawLayout::Flat)
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<RawLayout, A::Error> {
                RawGroup::deserialize(MapAccessDeserializer::new(map)).map(RawLayout::Root)
            }
        }

        deserializer.deserialize_any(LayoutVisitor)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawEdit {
    pub op: Spanned<String>,
    /// Steps to the target group: integers index `children`, `"s<N>"` indexes `settings`.
    #[serde(default)]
    pub group: Option<Spanned<Vec<toml::Value>>>,
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub node: Option<RawNode>,
}
