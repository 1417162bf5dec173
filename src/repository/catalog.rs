//! Works repository: articles, science books and fiction books with their authors

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, Pool, Postgres, Transaction};

use super::CatalogRepository;
use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorName},
        loan::WorkRef,
        work::{Article, FictionBook, ScienceBook, Work, WorkFields, WorkKind},
    },
};

const ARTICLE_COLUMNS: &str =
    "id, title, journal, impact_factor, volume, article_number, pages, publishing_year, doi";
const SCIENCE_BOOK_COLUMNS: &str = "id, title, publisher, edition, publishing_year, isbn";
const FICTION_BOOK_COLUMNS: &str = "id, title";

fn work_table(kind: WorkKind) -> &'static str {
    match kind {
        WorkKind::Article => "articles",
        WorkKind::ScienceBook => "science_books",
        WorkKind::FictionBook => "fiction_books",
    }
}

fn link_table(kind: WorkKind) -> &'static str {
    match kind {
        WorkKind::Article => "article_authors",
        WorkKind::ScienceBook => "science_book_authors",
        WorkKind::FictionBook => "fiction_book_authors",
    }
}

#[derive(FromRow)]
struct LinkedAuthorRow {
    work_id: i32,
    id: i32,
    name: String,
    surname: String,
}

#[derive(Clone)]
pub struct WorksRepository {
    pool: Pool<Postgres>,
}

impl WorksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Authors of the given works, keyed by work id, in position order
    async fn authors_for(&self, kind: WorkKind, work_ids: &[i32]) -> AppResult<HashMap<i32, Vec<Author>>> {
        let rows = sqlx::query_as::<_, LinkedAuthorRow>(&format!(
            r#"
            SELECT l.work_id, a.id, a.name, a.surname
            FROM {} l
            JOIN authors a ON a.id = l.author_id
            WHERE l.work_id = ANY($1)
            ORDER BY l.work_id, l.position
            "#,
            link_table(kind)
        ))
        .bind(work_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_work: HashMap<i32, Vec<Author>> = HashMap::new();
        for row in rows {
            by_work.entry(row.work_id).or_default().push(Author {
                id: row.id,
                name: row.name,
                surname: row.surname,
            });
        }
        Ok(by_work)
    }

    async fn attach_authors(&self, kind: WorkKind, mut works: Vec<Work>) -> AppResult<Vec<Work>> {
        if works.is_empty() {
            return Ok(works);
        }
        let ids: Vec<i32> = works.iter().map(Work::id).collect();
        let mut by_work = self.authors_for(kind, &ids).await?;
        for work in works.iter_mut() {
            *work.authors_mut() = by_work.remove(&work.id()).unwrap_or_default();
        }
        Ok(works)
    }

    async fn insert_fields(tx: &mut Transaction<'_, Postgres>, fields: &WorkFields) -> AppResult<i32> {
        let id: i32 = match fields {
            WorkFields::Article(f) => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO articles
                        (title, journal, impact_factor, volume, article_number, pages, publishing_year, doi)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING id
                    "#,
                )
                .bind(&f.title)
                .bind(&f.journal)
                .bind(f.impact_factor)
                .bind(f.volume)
                .bind(f.article_number)
                .bind(&f.pages)
                .bind(f.publishing_year)
                .bind(&f.doi)
                .fetch_one(&mut **tx)
                .await?
            }
            WorkFields::ScienceBook(f) => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO science_books (title, publisher, edition, publishing_year, isbn)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(&f.title)
                .bind(&f.publisher)
                .bind(f.edition)
                .bind(f.publishing_year)
                .bind(&f.isbn)
                .fetch_one(&mut **tx)
                .await?
            }
            WorkFields::FictionBook(f) => {
                sqlx::query_scalar("INSERT INTO fiction_books (title) VALUES ($1) RETURNING id")
                    .bind(&f.title)
                    .fetch_one(&mut **tx)
                    .await?
            }
        };
        Ok(id)
    }

    async fn update_fields(tx: &mut Transaction<'_, Postgres>, id: i32, fields: &WorkFields) -> AppResult<u64> {
        let result = match fields {
            WorkFields::Article(f) => {
                sqlx::query(
                    r#"
                    UPDATE articles
                    SET title = $1, journal = $2, impact_factor = $3, volume = $4,
                        article_number = $5, pages = $6, publishing_year = $7, doi = $8
                    WHERE id = $9
                    "#,
                )
                .bind(&f.title)
                .bind(&f.journal)
                .bind(f.impact_factor)
                .bind(f.volume)
                .bind(f.article_number)
                .bind(&f.pages)
                .bind(f.publishing_year)
                .bind(&f.doi)
                .bind(id)
                .execute(&mut **tx)
                .await?
            }
            WorkFields::ScienceBook(f) => {
                sqlx::query(
                    r#"
                    UPDATE science_books
                    SET title = $1, publisher = $2, edition = $3, publishing_year = $4, isbn = $5
                    WHERE id = $6
                    "#,
                )
                .bind(&f.title)
                .bind(&f.publisher)
                .bind(f.edition)
                .bind(f.publishing_year)
                .bind(&f.isbn)
                .bind(id)
                .execute(&mut **tx)
                .await?
            }
            WorkFields::FictionBook(f) => {
                sqlx::query("UPDATE fiction_books SET title = $1 WHERE id = $2")
                    .bind(&f.title)
                    .bind(id)
                    .execute(&mut **tx)
                    .await?
            }
        };
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CatalogRepository for WorksRepository {
    async fn list(&self, kind: WorkKind) -> AppResult<Vec<Work>> {
        let table = work_table(kind);
        let works: Vec<Work> = match kind {
            WorkKind::Article => sqlx::query_as::<_, Article>(&format!(
                "SELECT {} FROM {} ORDER BY title, id",
                ARTICLE_COLUMNS, table
            ))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Work::Article)
            .collect(),
            WorkKind::ScienceBook => sqlx::query_as::<_, ScienceBook>(&format!(
                "SELECT {} FROM {} ORDER BY title, id",
                SCIENCE_BOOK_COLUMNS, table
            ))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Work::ScienceBook)
            .collect(),
            WorkKind::FictionBook => sqlx::query_as::<_, FictionBook>(&format!(
                "SELECT {} FROM {} ORDER BY title, id",
                FICTION_BOOK_COLUMNS, table
            ))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Work::FictionBook)
            .collect(),
        };

        self.attach_authors(kind, works).await
    }

    async fn get(&self, kind: WorkKind, id: i32) -> AppResult<Option<Work>> {
        let table = work_table(kind);
        let work: Option<Work> = match kind {
            WorkKind::Article => sqlx::query_as::<_, Article>(&format!(
                "SELECT {} FROM {} WHERE id = $1",
                ARTICLE_COLUMNS, table
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Work::Article),
            WorkKind::ScienceBook => sqlx::query_as::<_, ScienceBook>(&format!(
                "SELECT {} FROM {} WHERE id = $1",
                SCIENCE_BOOK_COLUMNS, table
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Work::ScienceBook),
            WorkKind::FictionBook => sqlx::query_as::<_, FictionBook>(&format!(
                "SELECT {} FROM {} WHERE id = $1",
                FICTION_BOOK_COLUMNS, table
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Work::FictionBook),
        };

        match work {
            Some(work) => Ok(self.attach_authors(kind, vec![work]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn exists(&self, work: WorkRef) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            work_table(work.kind)
        ))
        .bind(work.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create(&self, fields: &WorkFields, authors: &[AuthorName]) -> AppResult<Work> {
        let kind = fields.kind();
        let mut tx = self.pool.begin().await?;

        let id = Self::insert_fields(&mut tx, fields).await?;

        let mut created_authors = Vec::with_capacity(authors.len());
        for (position, author) in authors.iter().enumerate() {
            let position = i16::try_from(position)
                .map_err(|_| AppError::Validation("Too many authors for one work".to_string()))?;
            let created = sqlx::query_as::<_, Author>(
                "INSERT INTO authors (name, surname) VALUES ($1, $2) RETURNING id, name, surname",
            )
            .bind(&author.name)
            .bind(&author.surname)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(&format!(
                "INSERT INTO {} (work_id, author_id, position) VALUES ($1, $2, $3)",
                link_table(kind)
            ))
            .bind(id)
            .bind(created.id)
            .bind(position)
            .execute(&mut *tx)
            .await?;

            created_authors.push(created);
        }

        tx.commit().await?;

        Ok(Work::from_parts(id, fields.clone(), created_authors))
    }

    async fn update(&self, id: i32, fields: Option<&WorkFields>, renamed_authors: &[Author]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        if let Some(fields) = fields {
            if Self::update_fields(&mut tx, id, fields).await? == 0 {
                return Err(AppError::NotFound(format!(
                    "{} with id {} not found",
                    fields.kind().label(),
                    id
                )));
            }
        }

        for author in renamed_authors {
            sqlx::query("UPDATE authors SET name = $1, surname = $2 WHERE id = $3")
                .bind(&author.name)
                .bind(&author.surname)
                .bind(author.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, kind: WorkKind, id: i32) -> AppResult<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", work_table(kind)))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
