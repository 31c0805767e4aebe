use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Watch status of a catalog entry. Serialized with the labels shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum ItemStatus {
    #[default]
    #[serde(rename = "Want to Watch")]
    WantToWatch,
    #[serde(rename = "Watching")]
    Watching,
    #[serde(rename = "Watched")]
    Watched,
}

impl ItemStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::WantToWatch => "Want to Watch",
            ItemStatus::Watching => "Watching",
            ItemStatus::Watched => "Watched",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Want to Watch" => Ok(ItemStatus::WantToWatch),
            "Watching" => Ok(ItemStatus::Watching),
            "Watched" => Ok(ItemStatus::Watched),
            other => Err(format!("unknown item status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogItem {
    pub id: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub year: Option<String>,
    pub poster: Option<String>,
    pub status: ItemStatus,
    /// Runtime in minutes
    pub runtime: u32,
    /// Minutes watched so far
    pub progress: u32,
    /// Calendar date recorded when the item was added; empty when the
    /// calendar service could not be reached.
    #[serde(default)]
    pub date_added: String,
}

impl CatalogItem {
    pub fn from_draft(id: u64, draft: NewItem, date_added: impl Into<String>) -> Self {
        Self {
            id,
            title: draft.title,
            kind: draft.kind,
            year: draft.year,
            poster: draft.poster,
            status: ItemStatus::default(),
            runtime: draft.runtime,
            progress: 0,
            date_added: date_added.into(),
        }
    }
}

/// Fields supplied by the front end when adding an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewItem {
    #[schema(example = "Spirited Away")]
    pub title: String,
    #[serde(rename = "type", default = "default_kind")]
    #[schema(example = "movie")]
    pub kind: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub runtime: u32,
}

fn default_kind() -> String {
    "movie".to_string()
}

impl NewItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: default_kind(),
            year: None,
            poster: None,
            runtime: 0,
        }
    }

    pub fn with_runtime(mut self, runtime: u32) -> Self {
        self.runtime = runtime;
        self
    }
}
