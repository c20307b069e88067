//! # Blog Output Models
//!
//! Typed shapes of resolved blog documents. They mirror what the schema table in
//! [`crate::schema`] exposes, so a resolved and marshalled tree deserializes straight into them
//! via [`ResolutionService::resolve_typed`](entity_resolver::ResolutionService::resolve_typed).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    #[serde(default)]
    pub members: Vec<Person>,
}

/// Owner of an article: a person or an organization, told apart by the resource `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Owner {
    #[serde(rename = "person--user")]
    Person(Person),
    #[serde(rename = "person--org")]
    Organization(Organization),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
}

/// A comment. Comments withheld from the viewer come back empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub text: String,
    pub author: Option<Person>,
}

impl Comment {
    pub fn is_withheld(&self) -> bool {
        self.text.is_empty() && self.author.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub code: String,
}

/// Postal address embedded in the article document itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub country: Country,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub body: String,
    pub published_at: String,
    pub author: Person,
    pub owner: Owner,
    #[serde(default)]
    pub reviewer: Option<Person>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub location: Option<Address>,
}

/// Who is reading. Consulted by the conditional fields of the blog schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Anonymous,
    Member,
    Editor,
}

#[derive(Debug, Clone)]
pub struct Viewer {
    pub role: Role,
    /// Upper bound on the number of comments resolved for this viewer.
    pub comment_limit: usize,
}

impl Viewer {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            comment_limit: usize::MAX,
        }
    }

    pub fn with_comment_limit(mut self, limit: usize) -> Self {
        self.comment_limit = limit;
        self
    }

    pub fn is_editor(&self) -> bool {
        self.role == Role::Editor
    }
}
