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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Investor {
    pub id: Uuid,
    pub name: Option<String>,
    pub logo: String,
    pub url: Option<String>,
    pub published: bool,
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

fn default_published() -> bool {
    true
}

/// Input of `investor.create`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorInput {
    #[serde(default)]
    pub name: Option<String>,
    pub logo: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub order: i32,
}

impl Schema for InvestorInput {
    fn normalize(mut self) -> Self {
        self.url = blank_to_none(self.url);
        self
    }

    fn validate(&self, errors: &mut FieldErrors) {
        rules::url(errors, "logo", &self.logo);
        rules::optional_url(errors, "url", self.url.as_deref());
        if let Some(name) = &self.name {
            rules::max_len(errors, "name", name, 200);
        }
    }
}

/// `data` of `investor.update`: only the fields present are written.
/// `url: ""` or `url: null` clears the link.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorPatch {
    #[serde(default, deserialize_with = "patch_field")]
    pub name: Option<Option<String>>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default, deserialize_with = "patch_field")]
    pub url: Option<Option<String>>,
    #[serde(default)]
    pub published: Option<bool>,
    #[serde(default)]
    pub order: Option<i32>,
}

impl Schema for InvestorPatch {
    fn normalize(mut self) -> Self {
        self.url = blank_to_cleared(self.url);
        self
    }

    fn validate(&self, errors: &mut FieldErrors) {
        if let Some(logo) = &self.logo {
            rules::url(errors, "logo", logo);
        }
        rules::optional_url(errors, "url", self.url.as_ref().and_then(|u| u.as_deref()));
        if let Some(Some(name)) = &self.name {
            rules::max_len(errors, "name", name, 200);
        }
    }
}

impl Rich for Investor {
    fn annotate(&self, path: &str, meta: &mut TypeMeta) {
        self.created_at.annotate(&child_path(path, "createdAt"), meta);
    }
}

impl Entry for Investor {
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

impl Resource for Investor {
    const NAME: &'static str = "Investor";
    const TABLE: &'static str = "investors";

    type Record = Investor;
    type Create = InvestorInput;
    type Patch = InvestorPatch;

    fn build(id: Uuid, created_at: DateTime<Utc>, input: InvestorInput) -> Investor {
        Investor {
            id,
            name: input.name,
            logo: input.logo,
            url: input.url,
            published: input.published,
            order: input.order,
            created_at,
        }
    }

    fn apply(record: &mut Investor, patch: InvestorPatch) {
        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(logo) = patch.logo {
            record.logo = logo;
        }
        if let Some(url) = patch.url {
            record.url = url;
        }
        if let Some(published) = patch.published {
            record.published = published;
        }
        if let Some(order) = patch.order {
            record.order = order;
        }
    }

    fn columns(record: &Investor) -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Uuid(record.id)),
            ("name", Column::Text(record.name.clone())),
            ("logo", Column::Text(Some(record.logo.clone()))),
            ("url", Column::Text(record.url.clone())),
            ("published", Column::Bool(record.published)),
            ("order", Column::Int(record.order)),
            ("created_at", Column::Timestamp(record.created_at)),
        ]
    }

    fn patch_columns(patch: &InvestorPatch) -> Vec<(&'static str, Column)> {
        let mut columns = Vec::new();
        if let Some(name) = &patch.name {
            columns.push(("name", Column::Text(name.clone())));
        }
        if let Some(logo) = &patch.logo {
            columns.push(("logo", Column::Text(Some(logo.clone()))));
        }
        if let Some(url) = &patch.url {
            columns.push(("url", Column::Text(url.clone())));
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
        &db.investors
    }

    fn collection_mut(db: &mut Database) -> &mut Arc<dyn Collection<Self>> {
        &mut db.investors
    }
}

pub fn router() -> RpcRouter {
    crud_router::<Investor>()
}
