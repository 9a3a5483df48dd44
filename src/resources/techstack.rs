use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use super::{crud_router, Entry, Resource};
use crate::database::{Collection, Column, Database};
use crate::error::FieldErrors;
use crate::rpc::schema::{blank_to_cleared, blank_to_none, patch_field, rules, Schema};
use crate::rpc::transformer::{child_path, Rich, TypeMeta};
use crate::rpc::RpcRouter;

/// A technology shown on the public techstack page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TechstackEntry {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub url: Option<String>,
    pub category: Option<String>,
    pub published: bool,
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechstackInput {
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub order: i32,
}

impl Schema for TechstackInput {
    fn normalize(mut self) -> Self {
        self.url = blank_to_none(self.url);
        self.category = blank_to_none(self.category);
        self
    }

    fn validate(&self, errors: &mut FieldErrors) {
        rules::non_empty(errors, "name", &self.name);
        rules::url(errors, "icon", &self.icon);
        rules::optional_url(errors, "url", self.url.as_deref());
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechstackPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "patch_field")]
    pub url: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub category: Option<Option<String>>,
    #[serde(default)]
    pub published: Option<bool>,
    #[serde(default)]
    pub order: Option<i32>,
}

impl Schema for TechstackPatch {
    fn normalize(mut self) -> Self {
        self.url = blank_to_cleared(self.url);
        self.category = blank_to_cleared(self.category);
        self
    }

    fn validate(&self, errors: &mut FieldErrors) {
        if let Some(name) = &self.name {
            rules::non_empty(errors, "name", name);
        }
        if let Some(icon) = &self.icon {
            rules::url(errors, "icon", icon);
        }
        rules::optional_url(errors, "url", self.url.as_ref().and_then(|u| u.as_deref()));
    }
}

impl Rich for TechstackEntry {
    fn annotate(&self, path: &str, meta: &mut TypeMeta) {
        self.created_at.annotate(&child_path(path, "createdAt"), meta);
    }
}

impl Entry for TechstackEntry {
    fn id(&self) -> Uuid {
        self.id
    }

    fn published(&self) -> bool {
        self.published
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Resource for TechstackEntry {
    const NAME: &'static str = "Techstack entry";
    const TABLE: &'static str = "techstack";

    type Record = TechstackEntry;
    type Create = TechstackInput;
    type Patch = TechstackPatch;

    fn build(id: Uuid, created_at: DateTime<Utc>, input: TechstackInput) -> TechstackEntry {
        TechstackEntry {
            id,
            name: input.name,
            icon: input.icon,
            url: input.url,
            category: input.category,
            published: input.published,
            order: input.order,
            created_at,
        }
    }

    fn apply(record: &mut TechstackEntry, patch: TechstackPatch) {
        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(icon) = patch.icon {
            record.icon = icon;
        }
        if let Some(url) = patch.url {
            record.url = url;
        }
        if let Some(category) = patch.category {
            record.category = category;
        }
        if let Some(published) = patch.published {
            record.published = published;
        }
        if let Some(order) = patch.order {
            record.order = order;
        }
    }

    fn columns(record: &TechstackEntry) -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Uuid(record.id)),
            ("name", Column::Text(Some(record.name.clone()))),
            ("icon", Column::Text(Some(record.icon.clone()))),
            ("url", Column::Text(record.url.clone())),
            ("category", Column::Text(record.category.clone())),
            ("published", Column::Bool(record.published)),
            ("order", Column::Int(record.order)),
            ("created_at", Column::Timestamp(record.created_at)),
        ]
    }

    fn patch_columns(patch: &TechstackPatch) -> Vec<(&'static str, Column)> {
        let mut columns = Vec::new();
        if let Some(name) = &patch.name {
            columns.push(("name", Column::Text(Some(name.clone()))));
        }
        if let Some(icon) = &patch.icon {
            columns.push(("icon", Column::Text(Some(icon.clone()))));
        }
        if let Some(url) = &patch.url {
            columns.push(("url", Column::Text(url.clone())));
        }
        if let Some(category) = &patch.category {
            columns.push(("category", Column::Text(category.clone())));
        }
        if let Some(published) = patch.published {
            columns.push(("published", Column::Bool(published)));
        }
        if let Some(order) = patch.order {
            columns.push(("order", Column::Int(order)));
        }
        columns
    }

    fn collection(db: &Database) -> &Arc<dyn Collection<Self>> {
        &db.techstack
    }

    fn collection_mut(db: &mut Database) -> &mut Arc<dyn Collection<Self>> {
        &mut db.techstack
    }
}

pub fn router() -> RpcRouter {
    crud_router::<TechstackEntry>()
}
