//! Article lookups addressed through typed resource descriptors.

use axum::{
    extract::{Path, Query},
    routing::get,
    Router,
};
use serde::Deserialize;

/// A route described by a type: its path template plus a link builder.
pub trait Resource {
    const PATH: &'static str;

    fn href(&self) -> String;
}

/// `/articles`, optionally narrowed by `?id=`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Articles {
    pub id: Option<i64>,
}

impl Resource for Articles {
    const PATH: &'static str = "/articles";

    fn href(&self) -> String {
        match self.id {
            Some(id) => format!("{}?id={id}", Self::PATH),
            None => Self::PATH.to_string(),
        }
    }
}

/// `/articles/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArticleById {
    pub id: i64,
}

impl Resource for ArticleById {
    const PATH: &'static str = "/articles/:id";

    fn href(&self) -> String {
        format!("{}/{}", Articles::PATH, self.id)
    }
}

pub fn router() -> Router {
    Router::new()
        .route(Articles::PATH, get(list_articles))
        .route(ArticleById::PATH, get(get_article))
}

pub async fn list_articles(Query(articles): Query<Articles>) -> String {
    match articles.id {
        Some(id) => format!("An article with id {id}"),
        None => "No query id".to_string(),
    }
}

pub async fn get_article(Path(article): Path<ArticleById>) -> String {
    tracing::debug!(href = %article.href(), "article requested");
    format!("An article with id {}", article.id)
}
