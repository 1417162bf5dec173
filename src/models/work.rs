//! Catalog works: articles, science books and fiction books

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use super::author::{parse_author_lists, Author, AuthorName};
use crate::error::{AppError, AppResult};

/// The three kinds of catalog work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkKind {
    Article,
    ScienceBook,
    FictionBook,
}

impl WorkKind {
    pub const ALL: [WorkKind; 3] = [WorkKind::Article, WorkKind::ScienceBook, WorkKind::FictionBook];

    /// Parse a URL selector (`articles`, `science_books`, `fiction_books`).
    pub fn from_selector(selector: &str) -> Option<Self> {
        match selector {
            "articles" => Some(WorkKind::Article),
            "science_books" => Some(WorkKind::ScienceBook),
            "fiction_books" => Some(WorkKind::FictionBook),
            _ => None,
        }
    }

    pub fn selector(&self) -> &'static str {
        match self {
            WorkKind::Article => "articles",
            WorkKind::ScienceBook => "science_books",
            WorkKind::FictionBook => "fiction_books",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkKind::Article => "Article",
            WorkKind::ScienceBook => "Science book",
            WorkKind::FictionBook => "Fiction book",
        }
    }
}

impl std::fmt::Display for WorkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.selector())
    }
}

// ---------------------------------------------------------------------------
// Field sets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Validate, ToSchema)]
pub struct ArticleFields {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(min = 1, max = 300))]
    pub journal: String,
    #[validate(range(min = 0, max = 32767))]
    pub impact_factor: i32,
    #[validate(range(min = 0, max = 32767))]
    pub volume: i32,
    #[validate(range(min = 0, max = 32767))]
    pub article_number: i32,
    /// Page range, e.g. "101-117"
    #[validate(length(min = 1, max = 20))]
    pub pages: String,
    pub publishing_year: NaiveDate,
    #[validate(length(min = 1, max = 200))]
    pub doi: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Validate, ToSchema)]
pub struct ScienceBookFields {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(min = 1, max = 200))]
    pub publisher: String,
    #[validate(range(min = 0, max = 32767))]
    pub edition: i32,
    pub publishing_year: NaiveDate,
    #[validate(length(min = 1, max = 200))]
    pub isbn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Validate, ToSchema)]
pub struct FictionBookFields {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
}

/// Non-author fields of any work
#[derive(Debug, Clone, PartialEq)]
pub enum WorkFields {
    Article(ArticleFields),
    ScienceBook(ScienceBookFields),
    FictionBook(FictionBookFields),
}

impl WorkFields {
    pub fn kind(&self) -> WorkKind {
        match self {
            WorkFields::Article(_) => WorkKind::Article,
            WorkFields::ScienceBook(_) => WorkKind::ScienceBook,
            WorkFields::FictionBook(_) => WorkKind::FictionBook,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            WorkFields::Article(f) => f.validate(),
            WorkFields::ScienceBook(f) => f.validate(),
            WorkFields::FictionBook(f) => f.validate(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            WorkFields::Article(f) => &f.title,
            WorkFields::ScienceBook(f) => &f.title,
            WorkFields::FictionBook(f) => &f.title,
        }
    }
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Article {
    pub id: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: ArticleFields,
    #[sqlx(skip)]
    #[serde(default)]
    pub authors: Vec<Author>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ScienceBook {
    pub id: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: ScienceBookFields,
    #[sqlx(skip)]
    #[serde(default)]
    pub authors: Vec<Author>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FictionBook {
    pub id: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: FictionBookFields,
    #[sqlx(skip)]
    #[serde(default)]
    pub authors: Vec<Author>,
}

/// Any stored work with its authors (ordered by position)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Work {
    Article(Article),
    ScienceBook(ScienceBook),
    FictionBook(FictionBook),
}

impl Work {
    /// Assemble a work from stored fields and authors.
    pub fn from_parts(id: i32, fields: WorkFields, authors: Vec<Author>) -> Self {
        match fields {
            WorkFields::Article(fields) => Work::Article(Article { id, fields, authors }),
            WorkFields::ScienceBook(fields) => {
                Work::ScienceBook(ScienceBook { id, fields, authors })
            }
            WorkFields::FictionBook(fields) => {
                Work::FictionBook(FictionBook { id, fields, authors })
            }
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Work::Article(w) => w.id,
            Work::ScienceBook(w) => w.id,
            Work::FictionBook(w) => w.id,
        }
    }

    pub fn kind(&self) -> WorkKind {
        match self {
            Work::Article(_) => WorkKind::Article,
            Work::ScienceBook(_) => WorkKind::ScienceBook,
            Work::FictionBook(_) => WorkKind::FictionBook,
        }
    }

    pub fn authors(&self) -> &[Author] {
        match self {
            Work::Article(w) => &w.authors,
            Work::ScienceBook(w) => &w.authors,
            Work::FictionBook(w) => &w.authors,
        }
    }

    pub fn authors_mut(&mut self) -> &mut Vec<Author> {
        match self {
            Work::Article(w) => &mut w.authors,
            Work::ScienceBook(w) => &mut w.authors,
            Work::FictionBook(w) => &mut w.authors,
        }
    }

    pub fn fields(&self) -> WorkFields {
        match self {
            Work::Article(w) => WorkFields::Article(w.fields.clone()),
            Work::ScienceBook(w) => WorkFields::ScienceBook(w.fields.clone()),
            Work::FictionBook(w) => WorkFields::FictionBook(w.fields.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Listing response. Only the selected category is filled; an unknown
/// selector yields three empty lists.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct CatalogListing {
    pub articles: Vec<Article>,
    pub science_books: Vec<ScienceBook>,
    pub fiction_books: Vec<FictionBook>,
}

impl CatalogListing {
    pub fn from_works(works: Vec<Work>) -> Self {
        let mut listing = CatalogListing::default();
        for work in works {
            match work {
                Work::Article(w) => listing.articles.push(w),
                Work::ScienceBook(w) => listing.science_books.push(w),
                Work::FictionBook(w) => listing.fiction_books.push(w),
            }
        }
        listing
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty() && self.science_books.is_empty() && self.fiction_books.is_empty()
    }
}

/// Detail response. At most one of the three slots is set.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct CatalogDetail {
    pub article: Option<Article>,
    pub science_book: Option<ScienceBook>,
    pub fiction_book: Option<FictionBook>,
}

impl From<Work> for CatalogDetail {
    fn from(work: Work) -> Self {
        let mut detail = CatalogDetail::default();
        match work {
            Work::Article(w) => detail.article = Some(w),
            Work::ScienceBook(w) => detail.science_book = Some(w),
            Work::FictionBook(w) => detail.fiction_book = Some(w),
        }
        detail
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Author part of an add form: two parallel comma-separated lists.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AuthorLists {
    pub author_name: String,
    pub author_surname: String,
}

/// Validated add request
#[derive(Debug, Clone)]
pub struct NewWork {
    pub fields: WorkFields,
    pub authors: Vec<AuthorName>,
}

fn decode<T: DeserializeOwned>(kind: WorkKind, body: serde_json::Value) -> AppResult<T> {
    serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("Invalid {} form: {}", kind.label(), e)))
}

impl NewWork {
    /// Decode and validate the add form of the given kind.
    pub fn from_json(kind: WorkKind, body: serde_json::Value) -> AppResult<Self> {
        let lists: AuthorLists = decode(kind, body.clone())?;
        let fields = match kind {
            WorkKind::Article => WorkFields::Article(decode(kind, body)?),
            WorkKind::ScienceBook => WorkFields::ScienceBook(decode(kind, body)?),
            WorkKind::FictionBook => WorkFields::FictionBook(decode(kind, body)?),
        };
        fields.validate()?;
        let authors = parse_author_lists(&lists.author_name, &lists.author_surname)?;
        Ok(Self { fields, authors })
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub journal: Option<String>,
    pub impact_factor: Option<i32>,
    pub volume: Option<i32>,
    pub article_number: Option<i32>,
    pub pages: Option<String>,
    pub publishing_year: Option<NaiveDate>,
    pub doi: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ScienceBookChanges {
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub edition: Option<i32>,
    pub publishing_year: Option<NaiveDate>,
    pub isbn: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FictionBookChanges {
    pub title: Option<String>,
}

/// Set `target` to `value` when provided and different; report whether it changed.
fn assign<T: PartialEq>(target: &mut T, value: Option<T>) -> bool {
    match value {
        Some(v) if *target != v => {
            *target = v;
            true
        }
        _ => false,
    }
}

impl ArticleChanges {
    fn apply(self, f: &mut ArticleFields) -> bool {
        // Non-short-circuiting `|` so that every field is applied.
        assign(&mut f.title, self.title)
            | assign(&mut f.journal, self.journal)
            | assign(&mut f.impact_factor, self.impact_factor)
            | assign(&mut f.volume, self.volume)
            | assign(&mut f.article_number, self.article_number)
            | assign(&mut f.pages, self.pages)
            | assign(&mut f.publishing_year, self.publishing_year)
            | assign(&mut f.doi, self.doi)
    }
}

impl ScienceBookChanges {
    fn apply(self, f: &mut ScienceBookFields) -> bool {
        assign(&mut f.title, self.title)
            | assign(&mut f.publisher, self.publisher)
            | assign(&mut f.edition, self.edition)
            | assign(&mut f.publishing_year, self.publishing_year)
            | assign(&mut f.isbn, self.isbn)
    }
}

impl FictionBookChanges {
    fn apply(self, f: &mut FictionBookFields) -> bool {
        assign(&mut f.title, self.title)
    }
}

#[derive(Debug, Clone)]
pub enum WorkChanges {
    Article(ArticleChanges),
    ScienceBook(ScienceBookChanges),
    FictionBook(FictionBookChanges),
}

impl WorkChanges {
    /// Merge into `fields`. Returns `Ok(true)` if anything changed.
    pub fn apply(self, fields: &mut WorkFields) -> AppResult<bool> {
        let changed = match (self, fields) {
            (WorkChanges::Article(c), WorkFields::Article(f)) => c.apply(f),
            (WorkChanges::ScienceBook(c), WorkFields::ScienceBook(f)) => c.apply(f),
            (WorkChanges::FictionBook(c), WorkFields::FictionBook(f)) => c.apply(f),
            _ => {
                return Err(AppError::Internal(
                    "Work changes do not match the stored work kind".to_string(),
                ))
            }
        };
        Ok(changed)
    }
}

#[derive(Debug, Default, Deserialize)]
struct AuthorChanges {
    authors: Option<Vec<AuthorName>>,
}

/// Edit request: changed fields only, plus an optional positional author list
#[derive(Debug, Clone)]
pub struct UpdateWork {
    pub changes: WorkChanges,
    pub authors: Option<Vec<AuthorName>>,
}

impl UpdateWork {
    pub fn from_json(kind: WorkKind, body: serde_json::Value) -> AppResult<Self> {
        let AuthorChanges { authors } = decode(kind, body.clone())?;
        let changes = match kind {
            WorkKind::Article => WorkChanges::Article(decode(kind, body)?),
            WorkKind::ScienceBook => WorkChanges::ScienceBook(decode(kind, body)?),
            WorkKind::FictionBook => WorkChanges::FictionBook(decode(kind, body)?),
        };
        Ok(Self { changes, authors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn article_form() -> serde_json::Value {
        json!({
            "title": "On Lending",
            "journal": "Library Quarterly",
            "impact_factor": 3,
            "volume": 12,
            "article_number": 7,
            "pages": "101-117",
            "publishing_year": "2019-01-01",
            "doi": "10.1000/lq.2019.7",
            "author_name": "Jane,John",
            "author_surname": "Doe,Smith"
        })
    }

    #[test]
    fn selectors_round_trip() {
        for kind in WorkKind::ALL {
            assert_eq!(WorkKind::from_selector(kind.selector()), Some(kind));
        }
        assert_eq!(WorkKind::from_selector("magazines"), None);
        assert_eq!(WorkKind::from_selector(""), None);
    }

    #[test]
    fn new_article_from_form() {
        let new = NewWork::from_json(WorkKind::Article, article_form()).unwrap();
        assert_eq!(new.fields.kind(), WorkKind::Article);
        assert_eq!(new.fields.title(), "On Lending");
        assert_eq!(new.authors.len(), 2);
        assert_eq!(new.authors[1], AuthorName::new("John", "Smith"));
    }

    #[test]
    fn new_work_rejects_invalid_fields() {
        let mut form = article_form();
        form["pages"] = json!("1-2-3-4-5-6-7-8-9-10-11");
        let err = NewWork::from_json(WorkKind::Article, form).unwrap_err();
        assert!(matches!(err, AppError::Form(_)));
    }

    #[test]
    fn new_work_rejects_missing_fields() {
        let err = NewWork::from_json(
            WorkKind::ScienceBook,
            json!({ "title": "T", "author_name": "A", "author_surname": "B" }),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn changes_only_report_real_differences() {
        let mut fields = WorkFields::FictionBook(FictionBookFields {
            title: "Dune".to_string(),
        });
        let same = WorkChanges::FictionBook(FictionBookChanges {
            title: Some("Dune".to_string()),
        });
        assert!(!same.apply(&mut fields).unwrap());

        let renamed = WorkChanges::FictionBook(FictionBookChanges {
            title: Some("Dune Messiah".to_string()),
        });
        assert!(renamed.apply(&mut fields).unwrap());
        assert_eq!(fields.title(), "Dune Messiah");
    }

    #[test]
    fn update_work_reads_structured_authors() {
        let update = UpdateWork::from_json(
            WorkKind::FictionBook,
            json!({ "authors": [{ "name": "Frank", "surname": "Herbert" }] }),
        )
        .unwrap();
        assert_eq!(update.authors, Some(vec![AuthorName::new("Frank", "Herbert")]));
    }

    #[test]
    fn listing_sorts_works_into_categories() {
        let works = vec![
            Work::from_parts(
                1,
                WorkFields::FictionBook(FictionBookFields { title: "A".into() }),
                vec![],
            ),
            Work::from_parts(
                2,
                WorkFields::FictionBook(FictionBookFields { title: "B".into() }),
                vec![],
            ),
        ];
        let listing = CatalogListing::from_works(works);
        assert_eq!(listing.fiction_books.len(), 2);
        assert!(listing.articles.is_empty());
        assert!(listing.science_books.is_empty());
    }
}
