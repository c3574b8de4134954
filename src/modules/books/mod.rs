pub mod models;
pub mod routes;
pub mod service;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_kernel::{settings::BooksSettings, InitCtx, Migration, Module};

use routes::BooksState;
use service::BookService;
use store::BookStore;

/// Book records: listing, scored lookups, bulk add, update and bulk soft-delete
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(store: Arc<dyn BookStore>, settings: &BooksSettings) -> Self {
        let service = Arc::new(BookService::new(store));
        Self {
            state: BooksState::new(service, settings.default_page_size),
        }
    }

    /// Schema of the `books` table. No unique index on (title, author):
    /// duplicates are rejected by a check before insert.
    pub fn schema() -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id               BIGSERIAL    PRIMARY KEY,
                    title            VARCHAR(255) NOT NULL CHECK (title <> ''),
                    author           VARCHAR(255) NOT NULL CHECK (author <> ''),
                    publication_year INTEGER      NOT NULL CHECK (publication_year BETWEEN 1450 AND 2100),
                    views            BIGINT       NOT NULL DEFAULT 0 CHECK (views >= 0),
                    is_deleted       BOOLEAN      NOT NULL DEFAULT FALSE
                );
                CREATE INDEX IF NOT EXISTS books_title_author_idx ON books (title, author);
                "#,
        }]
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.settings.database.backend,
            default_page_size = self.state.default_page_size,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        Self::schema()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let active = self.state.service.list_all().await?.len();
        tracing::info!(module = self.name(), active, "books module started");
        Ok(())
    }

    async fn health(&self) -> anyhow::Result<()> {
        self.state.service.ping().await?;
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(store: Arc<dyn BookStore>, settings: &BooksSettings) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store, settings))
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": { "schema": schema }
        }
    })
}

fn json_body(schema: serde_json::Value) -> serde_json::Value {
    json!({
        "required": true,
        "content": {
            "application/json": { "schema": schema }
        }
    })
}

fn id_parameter() -> serde_json::Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    })
}

fn openapi_fragment() -> serde_json::Value {
    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books by popularity",
                    "tags": ["Books"],
                    "parameters": [
                        { "name": "titlesOnly", "in": "query", "required": false, "schema": { "type": "boolean", "default": false } },
                        { "name": "pageNumber", "in": "query", "required": false, "schema": { "type": "integer", "default": 1 } },
                        { "name": "pageSize", "in": "query", "required": false, "schema": { "type": "integer", "default": 5 } }
                    ],
                    "responses": {
                        "200": json_response("One page of books, most viewed first", json!({
                            "oneOf": [
                                { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                                { "type": "array", "items": { "type": "string" } }
                            ]
                        })),
                        "400": error_response("Malformed query string")
                    }
                },
                "post": {
                    "summary": "Add books in bulk",
                    "tags": ["Books"],
                    "requestBody": json_body(json!({
                        "type": "array",
                        "items": { "$ref": "#/components/schemas/NewBook" }
                    })),
                    "responses": {
                        "200": json_response("All books added", json!({ "$ref": "#/components/schemas/BulkOutcome" })),
                        "400": error_response("Empty payload, or per-book errors in details")
                    }
                },
                "delete": {
                    "summary": "Soft-delete books in bulk",
                    "tags": ["Books"],
                    "requestBody": json_body(json!({
                        "type": "array",
                        "items": { "type": "integer", "format": "int64" }
                    })),
                    "responses": {
                        "200": json_response("All books deleted", json!({ "$ref": "#/components/schemas/BulkOutcome" })),
                        "400": error_response("Empty payload, or per-id errors in details")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Fetch a book and count the view",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": json_response("Book with popularity score", json!({ "$ref": "#/components/schemas/BookDetails" })),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Update a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "requestBody": json_body(json!({ "$ref": "#/components/schemas/UpdateBook" })),
                    "responses": {
                        "204": { "description": "Updated" },
                        "400": error_response("Id mismatch or validation error"),
                        "404": error_response("Book not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "title": { "type": "string", "maxLength": 255 },
                        "author": { "type": "string", "maxLength": 255 },
                        "publicationYear": { "type": "integer", "minimum": 1450, "maximum": 2100 },
                        "views": { "type": "integer", "format": "int64", "minimum": 0 },
                        "isDeleted": { "type": "boolean" }
                    },
                    "required": ["id", "title", "author", "publicationYear", "views", "isDeleted"]
                },
                "NewBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "maxLength": 255 },
                        "author": { "type": "string", "maxLength": 255 },
                        "publicationYear": { "type": "integer", "minimum": 1450, "maximum": 2100 }
                    },
                    "required": ["title", "author", "publicationYear"]
                },
                "UpdateBook": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "title": { "type": "string", "maxLength": 255 },
                        "author": { "type": "string", "maxLength": 255 },
                        "publicationYear": { "type": "integer", "minimum": 1450, "maximum": 2100 }
                    },
                    "required": ["id", "title", "author", "publicationYear"]
                },
                "BookDetails": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "publicationYear": { "type": "integer" },
                        "views": { "type": "integer", "format": "int64" },
                        "popularityScore": { "type": "number", "format": "double" }
                    },
                    "required": ["id", "title", "author", "publicationYear", "views", "popularityScore"]
                },
                "BulkOutcome": {
                    "type": "object",
                    "properties": {
                        "message": { "type": "string" },
                        "count": { "type": "integer" }
                    },
                    "required": ["message", "count"]
                }
            }
        }
    })
}
