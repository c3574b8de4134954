use serde::{Deserialize, Serialize};

pub const MAX_TEXT_LEN: usize = 255;
pub const MIN_PUBLICATION_YEAR: i32 = 1450;
pub const MAX_PUBLICATION_YEAR: i32 = 2100;

/// A stored book record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Store-assigned identifier
    pub id: i64,
    pub title: String,
    pub author: String,
    pub publication_year: i32,
    /// Number of single-item fetches so far
    pub views: i64,
    /// Soft-delete flag; deleted rows never leave the table
    pub is_deleted: bool,
}

/// A validated book that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub publication_year: i32,
}

/// Request body item for bulk creation.
///
/// Every field is optional at the wire level so that an item with missing
/// fields fails validation on its own. A wrongly typed field still rejects
/// the whole batch at deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
}

impl NewBook {
    pub fn validate(&self) -> Result<BookDraft, Vec<String>> {
        validate_fields(
            self.title.as_deref(),
            self.author.as_deref(),
            self.publication_year,
        )
    }

    /// Title as given by the client, for error messages.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }
}

/// Request body for `PUT /{id}`. Views and the delete flag are not client-editable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
}

impl UpdateBook {
    pub fn validate(&self) -> Result<BookDraft, Vec<String>> {
        validate_fields(
            self.title.as_deref(),
            self.author.as_deref(),
            self.publication_year,
        )
    }
}

/// Single-book response with the derived popularity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetails {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub publication_year: i32,
    pub views: i64,
    pub popularity_score: f64,
}

impl BookDetails {
    pub fn from_book(book: Book, current_year: i32) -> Self {
        let popularity_score = popularity_score(book.views, book.publication_year, current_year);
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            publication_year: book.publication_year,
            views: book.views,
            popularity_score,
        }
    }
}

/// `views * 0.5 + yearsSincePublished * 2`. Books dated in the future get a
/// negative age term.
pub fn popularity_score(views: i64, publication_year: i32, current_year: i32) -> f64 {
    let years_since_published = i64::from(current_year) - i64::from(publication_year);
    views as f64 * 0.5 + years_since_published as f64 * 2.0
}

/// Query string for the list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub titles_only: bool,
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
}

/// Page of the list endpoint: bare titles or full records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BookListing {
    Titles(Vec<String>),
    Books(Vec<Book>),
}

/// Body of successful bulk operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub message: String,
    pub count: usize,
}

fn validate_fields(
    title: Option<&str>,
    author: Option<&str>,
    publication_year: Option<i32>,
) -> Result<BookDraft, Vec<String>> {
    let mut errors = Vec::new();

    let title = required_text(title, "Title", "Title", &mut errors);
    let author = required_text(author, "Author", "Author name", &mut errors);

    let publication_year = publication_year.unwrap_or_default();
    if !(MIN_PUBLICATION_YEAR..=MAX_PUBLICATION_YEAR).contains(&publication_year) {
        errors.push(format!(
            "Publication year must be between {MIN_PUBLICATION_YEAR} and {MAX_PUBLICATION_YEAR}."
        ));
    }

    match (title, author) {
        (Some(title), Some(author)) if errors.is_empty() => Ok(BookDraft {
            title: title.to_string(),
            author: author.to_string(),
            publication_year,
        }),
        _ => Err(errors),
    }
}

fn required_text<'a>(
    value: Option<&'a str>,
    field: &str,
    label: &str,
    errors: &mut Vec<String>,
) -> Option<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => {
            if v.chars().count() > MAX_TEXT_LEN {
                errors.push(format!(
                    "{label} cannot be longer than {MAX_TEXT_LEN} characters."
                ));
                None
            } else {
                Some(v)
            }
        }
        _ => {
            errors.push(format!("{field} is required."));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_book(title: &str, author: &str, year: i32) -> NewBook {
        NewBook {
            title: Some(title.to_string()),
            author: Some(author.to_string()),
            publication_year: Some(year),
        }
    }

    #[test]
    fn valid_book_becomes_draft() {
        let draft = new_book("Dune", "Frank Herbert", 1965).validate().unwrap();
        assert_eq!(draft.title, "Dune");
        assert_eq!(draft.publication_year, 1965);
    }

    #[test]
    fn year_bounds_are_inclusive() {
        assert!(new_book("A", "B", 1450).validate().is_ok());
        assert!(new_book("A", "B", 2100).validate().is_ok());
        assert!(new_book("A", "B", 1449).validate().is_err());
        assert!(new_book("A", "B", 2101).validate().is_err());
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let errors = NewBook::default().validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Title is required.".to_string(),
                "Author is required.".to_string(),
                "Publication year must be between 1450 and 2100.".to_string(),
            ]
        );
    }

    #[test]
    fn blank_title_is_missing() {
        let errors = new_book("   ", "Someone", 2000).validate().unwrap_err();
        assert_eq!(errors, vec!["Title is required.".to_string()]);
    }

    #[test]
    fn length_limit_counts_characters() {
        let at_limit = "é".repeat(MAX_TEXT_LEN);
        assert!(new_book(&at_limit, "Someone", 2000).validate().is_ok());

        let errors = new_book("Title", &"x".repeat(MAX_TEXT_LEN + 1), 2000)
            .validate()
            .unwrap_err();
        assert_eq!(
            errors,
            vec!["Author name cannot be longer than 255 characters.".to_string()]
        );
    }

    #[test]
    fn popularity_score_combines_views_and_age() {
        assert_eq!(popularity_score(0, 2024, 2024), 0.0);
        assert_eq!(popularity_score(3, 2000, 2024), 49.5);
        assert_eq!(popularity_score(1, 2030, 2024), -11.5);
    }

    #[test]
    fn details_omit_delete_flag() {
        let book = Book {
            id: 7,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            publication_year: 1965,
            views: 2,
            is_deleted: false,
        };
        let json = serde_json::to_value(BookDetails::from_book(book, 2025)).unwrap();

        assert_eq!(json["publicationYear"], 1965);
        assert_eq!(json["popularityScore"], 121.0);
        assert!(json.get("isDeleted").is_none());
    }

    #[test]
    fn list_query_defaults() {
        let query: ListQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.titles_only);
        assert_eq!(query.page_number, None);
        assert_eq!(query.page_size, None);
    }
}
