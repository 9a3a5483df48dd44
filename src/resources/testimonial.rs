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

const QUOTE_MAX: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: Uuid,
    pub name: String,
    pub role: Option<String>,
    pub company: Option<String>,
    pub quote: String,
    pub avatar: Option<String>,
    pub published: bool,
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialInput {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    pub quote: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub order: i32,
}

impl Schema for TestimonialInput {
    fn normalize(mut self) -> Self {
        self.avatar = blank_to_none(self.avatar);
        self
    }

    fn validate(&self, errors: &mut FieldErrors) {
        rules::non_empty(errors, "name", &self.name);
        rules::non_empty(errors, "quote", &self.quote);
        rules::max_len(errors, "quote", &self.quote, QUOTE_MAX);
        rules::optional_url(errors, "avatar", self.avatar.as_deref());
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "patch_field")]
    pub role: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub company: Option<Option<String>>,
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default, deserialize_with = "patch_field")]
    pub avatar: Option<Option<String>>,
    #[serde(default)]
    pub published: Option<bool>,
    #[serde(default)]
    pub order: Option<i32>,
}

impl Schema for TestimonialPatch {
    fn normalize(mut self) -> Self {
        self.avatar = blank_to_cleared(self.avatar);
        self
    }

    fn validate(&self, errors: &mut FieldErrors) {
        if let Some(name) = &self.name {
            rules::non_empty(errors, "name", name);
        }
        if let Some(quote) = &self.quote {
            rules::non_empty(errors, "quote", quote);
            rules::max_len(errors, "quote", quote, QUOTE_MAX);
        }
        rules::optional_url(errors, "avatar", self.avatar.as_ref().and_then(|a| a.as_deref()));
    }
}

impl Rich for Testimonial {
    fn annotate(&self, path: &str, meta: &mut TypeMeta) {
        self.created_at.annotate(&child_path(path, "createdAt"), meta);
    }
}

impl Entry for Testimonial {
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

impl Resource for Testimonial {
    const NAME: &'static str = "Testimonial";
    const TABLE: &'static str = "testimonials";

    type Record = Testimonial;
    type Create = TestimonialInput;
    type Patch = TestimonialPatch;

    fn build(id: Uuid, created_at: DateTime<Utc>, input: TestimonialInput) -> Testimonial {
        Testimonial {
            id,
            name: input.name,
            role: input.role,
            company: input.company,
            quote: input.quote,
            avatar: input.avatar,
            published: input.published,
            order: input.order,
            created_at,
        }
    }

    fn apply(record: &mut Testimonial, patch: TestimonialPatch) {
        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(role) = patch.role {
            record.role = role;
        }
        if let Some(company) = patch.company {
            record.company = company;
        }
        if let Some(quote) = patch.quote {
            record.quote = quote;
        }
        if let Some(avatar) = patch.avatar {
            record.avatar = avatar;
        }
        if let Some(published) = patch.published {
            record.published = published;
        }
        if let Some(order) = patch.order {
            record.order = order;
        }
    }

    fn columns(record: &Testimonial) -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Uuid(record.id)),
            ("name", Column::Text(Some(record.name.clone()))),
            ("role", Column::Text(record.role.clone())),
            ("company", Column::Text(record.company.clone())),
            ("quote", Column::Text(Some(record.quote.clone()))),
            ("avatar", Column::Text(record.avatar.clone())),
            ("published", Column::Bool(record.published)),
            ("order", Column::Int(record.order)),
            ("created_at", Column::Timestamp(record.created_at)),
        ]
    }

    fn patch_columns(patch: &TestimonialPatch) -> Vec<(&'static str, Column)> {
        let mut columns = Vec::new();
        if let Some(name) = &patch.name {
            columns.push(("name", Column::Text(Some(name.clone()))));
        }
        if let Some(role) = &patch.role {
            columns.push(("role", Column::Text(role.clone())));
        }
        if let Some(company) = &patch.company {
            columns.push(("company", Column::Text(company.clone())));
        }
        if let Some(quote) = &patch.quote {
            columns.push(("quote", Column::Text(Some(quote.clone()))));
        }
        if let Some(avatar) = &patch.avatar {
            columns.push(("avatar", Column::Text(avatar.clone())));
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
        &db.testimonials
    }

    fn collection_mut(db: &mut Database) -> &mut Arc<dyn Collection<Self>> {
        &mut db.testimonials
    }
}

pub fn router() -> RpcRouter {
    crud_router::<Testimonial>()
}
