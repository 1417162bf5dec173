//! Catalog service: listing, detail and staff mutations of works

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorName},
        work::{CatalogDetail, CatalogListing, NewWork, UpdateWork, Work, WorkKind},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

/// Kind named by a mutation route
fn work_kind(kind: &str) -> AppResult<WorkKind> {
    WorkKind::from_selector(kind).ok_or_else(|| AppError::NotFound("Unknown work type".to_string()))
}

fn not_found(kind: WorkKind, id: i32) -> AppError {
    AppError::NotFound(format!("{} with id {} not found", kind.label(), id))
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Works of the selected category. An unknown selector lists nothing.
    pub async fn list(&self, selector: &str) -> AppResult<CatalogListing> {
        match WorkKind::from_selector(selector) {
            Some(kind) => Ok(CatalogListing::from_works(self.repository.catalog.list(kind).await?)),
            None => {
                tracing::debug!("Unknown catalog selector {:?}", selector);
                Ok(CatalogListing::default())
            }
        }
    }

    /// One work with its authors. An unknown selector yields an empty detail.
    pub async fn detail(&self, selector: &str, id: i32) -> AppResult<CatalogDetail> {
        let Some(kind) = WorkKind::from_selector(selector) else {
            return Ok(CatalogDetail::default());
        };
        self.repository
            .catalog
            .get(kind, id)
            .await?
            .map(CatalogDetail::from)
            .ok_or_else(|| not_found(kind, id))
    }

    pub async fn get(&self, kind: WorkKind, id: i32) -> AppResult<Work> {
        self.repository
            .catalog
            .get(kind, id)
            .await?
            .ok_or_else(|| not_found(kind, id))
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn add(&self, kind: &str, body: serde_json::Value) -> AppResult<Work> {
        let kind = work_kind(kind)?;
        let new = NewWork::from_json(kind, body)?;
        let work = self.repository.catalog.create(&new.fields, &new.authors).await?;
        tracing::info!("Created {} id={} with {} author(s)", kind, work.id(), new.authors.len());
        Ok(work)
    }

    /// Merge the changed fields into the stored work and rename authors by
    /// position. Only rows that actually change are written.
    #[tracing::instrument(skip(self, body))]
    pub async fn edit(&self, kind: &str, id: i32, body: serde_json::Value) -> AppResult<Work> {
        let kind = work_kind(kind)?;
        let update = UpdateWork::from_json(kind, body)?;
        let work = self.get(kind, id).await?;

        let mut fields = work.fields();
        let fields_changed = update.changes.apply(&mut fields)?;
        if fields_changed {
            fields.validate()?;
        }

        let renamed = match update.authors {
            Some(names) => renamed_authors(work.authors(), &names)?,
            None => Vec::new(),
        };

        if fields_changed || !renamed.is_empty() {
            self.repository
                .catalog
                .update(id, fields_changed.then_some(&fields), &renamed)
                .await?;
            tracing::info!(
                "Updated {} id={} (fields changed: {}, authors renamed: {})",
                kind,
                id,
                fields_changed,
                renamed.len()
            );
        }

        self.get(kind, id).await
    }

    pub async fn delete(&self, kind: &str, id: i32) -> AppResult<()> {
        let kind = work_kind(kind)?;
        if !self.repository.catalog.delete(kind, id).await? {
            return Err(not_found(kind, id));
        }
        tracing::info!("Deleted {} id={}", kind, id);
        Ok(())
    }
}

/// Pair the submitted names with the current authors by position and keep
/// the ones whose name or surname differs.
fn renamed_authors(current: &[Author], names: &[AuthorName]) -> AppResult<Vec<Author>> {
    if names.len() != current.len() {
        return Err(AppError::field(
            "authors",
            "count_mismatch",
            format!(
                "Expected {} author(s), got {}",
                current.len(),
                names.len()
            ),
        ));
    }

    let mut renamed = Vec::new();
    for (position, (author, submitted)) in current.iter().zip(names).enumerate() {
        let name = submitted.normalized(position)?;
        if !author.has_name(&name) {
            renamed.push(Author {
                id: author.id,
                name: name.name,
                surname: name.surname,
            });
        }
    }
    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fiction(title: &str, names: &str, surnames: &str) -> serde_json::Value {
        json!({ "title": title, "author_name": names, "author_surname": surnames })
    }

    fn science_book() -> serde_json::Value {
        json!({
            "title": "Algorithms",
            "publisher": "MIT Press",
            "edition": 3,
            "publishing_year": "2009-01-01",
            "isbn": "978-0262033848",
            "author_name": "Thomas,Charles",
            "author_surname": "Cormen,Leiserson"
        })
    }

    #[tokio::test]
    async fn listing_fills_only_the_selected_category() {
        let service = CatalogService::new(Repository::in_memory());
        service.add("fiction_books", fiction("Solaris", "Stanislaw", "Lem")).await.unwrap();
        service.add("fiction_books", fiction("Eden", "Stanislaw", "Lem")).await.unwrap();
        service.add("science_books", science_book()).await.unwrap();

        let listing = service.list("fiction_books").await.unwrap();
        let titles: Vec<&str> = listing.fiction_books.iter().map(|b| b.fields.title.as_str()).collect();
        assert_eq!(titles, vec!["Eden", "Solaris"]);
        assert!(listing.science_books.is_empty());
        assert!(listing.articles.is_empty());

        assert!(service.list("magazines").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn detail_carries_authors_in_order() {
        let service = CatalogService::new(Repository::in_memory());
        let work = service.add("science_books", science_book()).await.unwrap();

        let detail = service.detail("science_books", work.id()).await.unwrap();
        let book = detail.science_book.unwrap();
        let surnames: Vec<&str> = book.authors.iter().map(|a| a.surname.as_str()).collect();
        assert_eq!(surnames, vec!["Cormen", "Leiserson"]);
        assert!(detail.article.is_none());

        let unknown = service.detail("magazines", work.id()).await.unwrap();
        assert!(unknown.article.is_none() && unknown.science_book.is_none() && unknown.fiction_book.is_none());

        let missing = service.detail("articles", work.id()).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn mutations_reject_unknown_kinds() {
        let service = CatalogService::new(Repository::in_memory());
        for err in [
            service.add("magazines", json!({})).await.unwrap_err(),
            service.edit("magazines", 1, json!({})).await.unwrap_err(),
            service.delete("magazines", 1).await.unwrap_err(),
        ] {
            assert!(matches!(err, AppError::NotFound(ref m) if m == "Unknown work type"));
        }
    }

    #[tokio::test]
    async fn add_rejects_mismatched_author_lists() {
        let service = CatalogService::new(Repository::in_memory());
        let err = service
            .add("fiction_books", fiction("Dune", "Frank,Brian", "Herbert"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Form(_)));
        assert!(service.list("fiction_books").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn edit_renames_the_right_twin_author() {
        let service = CatalogService::new(Repository::in_memory());
        let work = service
            .add("fiction_books", fiction("Twins", "Alex,Alex", "Smith,Smith"))
            .await
            .unwrap();
        let first_id = work.authors()[0].id;
        let second_id = work.authors()[1].id;

        let edited = service
            .edit(
                "fiction_books",
                work.id(),
                json!({ "authors": [
                    { "name": "Alex", "surname": "Smith" },
                    { "name": "Sam", "surname": "Smith" }
                ]}),
            )
            .await
            .unwrap();

        assert_eq!(edited.authors()[0].id, first_id);
        assert_eq!(edited.authors()[0].name, "Alex");
        assert_eq!(edited.authors()[1].id, second_id);
        assert_eq!(edited.authors()[1].name, "Sam");
    }

    #[tokio::test]
    async fn edit_merges_fields_and_revalidates() {
        let service = CatalogService::new(Repository::in_memory());
        let work = service.add("science_books", science_book()).await.unwrap();

        let edited = service
            .edit("science_books", work.id(), json!({ "edition": 4 }))
            .await
            .unwrap();
        match edited {
            Work::ScienceBook(book) => {
                assert_eq!(book.fields.edition, 4);
                assert_eq!(book.fields.publisher, "MIT Press");
            }
            other => panic!("unexpected work: {:?}", other),
        }

        let err = service
            .edit("science_books", work.id(), json!({ "title": "" }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Form(_)));
    }

    #[tokio::test]
    async fn edit_requires_one_name_per_author() {
        let service = CatalogService::new(Repository::in_memory());
        let work = service.add("fiction_books", fiction("Solo", "Ann", "Lee")).await.unwrap();
        let err = service
            .edit(
                "fiction_books",
                work.id(),
                json!({ "authors": [
                    { "name": "Ann", "surname": "Lee" },
                    { "name": "Bob", "surname": "Lee" }
                ]}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Form(_)));
    }

    #[tokio::test]
    async fn delete_then_delete_again() {
        let service = CatalogService::new(Repository::in_memory());
        let work = service.add("fiction_books", fiction("Gone", "A", "B")).await.unwrap();
        service.delete("fiction_books", work.id()).await.unwrap();
        let err = service.delete("fiction_books", work.id()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn unchanged_authors_are_not_renamed() {
        let current = vec![Author {
            id: 5,
            name: "Ann".to_string(),
            surname: "Lee".to_string(),
        }];
        let names = vec![AuthorName::new(" Ann ", "Lee")];
        assert!(renamed_authors(&current, &names).unwrap().is_empty());
    }
}
