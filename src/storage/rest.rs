//! Hosted REST backend.
//!
//! Talks to a PostgREST style gateway under `{url}/rest/v1/{table}`.
//! Filters use the gateway's query syntax (`id=eq.X`, `order=col.desc`) and
//! writes ask for the stored row back with `Prefer: return=representation`.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{
    BackendConfig, Book, BookPatch, LibrarySettings, NewBook, NewStudent, NewTransaction, Student,
    StudentPatch, Transaction, TransactionPatch,
};
use crate::storage::LibraryStorage;
use crate::utils::http;

const BOOKS: &str = "books";
const STUDENTS: &str = "students";
const TRANSACTIONS: &str = "transactions";
const SETTINGS: &str = "settings";

/// Select clause embedding the referenced book and student rows.
const TRANSACTION_JOIN: &str = "*,book:books(*),student:students(*)";

const PREFER_REPRESENTATION: &str = "return=representation";
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";

/// Unique violation detail, e.g. `Key (isbn)=(A1) already exists.`
static CONFLICT_DETAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Key \((?P<field>[^)]+)\)=\((?P<value>.*?)\) already exists")
        .expect("conflict pattern is valid")
});

/// REST storage backed by the hosted gateway.
pub struct RestStorage {
    client: Client,
    base: Url,
}

impl RestStorage {
    /// Create a client for the project at `config.url`.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base = Url::parse(&format!(
            "{}/rest/v1/",
            config.url.trim().trim_end_matches('/')
        ))?;
        Ok(Self {
            client: http::create_client(config)?,
            base,
        })
    }

    /// Build the URL of a table with the given query pairs.
    fn table_url(&self, table: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base.join(table)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        Self::check_response(response).await
    }

    /// Turn non-success responses into errors. A 409 is a unique violation.
    async fn check_response(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT {
            return Err(parse_conflict(&body));
        }
        log::debug!("Backend answered {status}: {body}");
        Err(AppError::backend(status.as_u16(), body))
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let url = self.table_url(table, query)?;
        log::debug!("GET {url}");
        let response = Self::send(self.client.get(url)).await?;
        Ok(response.json().await?)
    }

    async fn insert<B, T>(&self, table: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.table_url(table, &[])?;
        log::debug!("POST {url}");
        let response = Self::send(
            self.client
                .post(url)
                .header("Prefer", PREFER_REPRESENTATION)
                .json(body),
        )
        .await?;

        let mut rows: Vec<T> = response.json().await?;
        if rows.is_empty() {
            return Err(AppError::backend(200, format!("insert into {table} returned no row")));
        }
        Ok(rows.swap_remove(0))
    }

    async fn patch<B, T>(&self, table: &str, id: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.table_url(table, &[("id", eq(id))])?;
        log::debug!("PATCH {url}");
        let response = Self::send(
            self.client
                .patch(url)
                .header("Prefer", PREFER_REPRESENTATION)
                .json(body),
        )
        .await?;

        let mut rows: Vec<T> = response.json().await?;
        if rows.is_empty() {
            return Err(AppError::not_found(table, id));
        }
        Ok(rows.swap_remove(0))
    }

    /// Delete matching rows, returning how many were removed.
    async fn remove(&self, table: &str, query: &[(&str, String)]) -> Result<usize> {
        let url = self.table_url(table, query)?;
        log::debug!("DELETE {url}");
        let response = Self::send(
            self.client
                .delete(url)
                .header("Prefer", PREFER_REPRESENTATION),
        )
        .await?;
        let rows: Vec<serde_json::Value> = response.json().await?;
        Ok(rows.len())
    }
}

/// `eq.` filter value.
fn eq(value: &str) -> String {
    format!("eq.{value}")
}

/// Map a 409 body to a duplicate-key error.
fn parse_conflict(body: &str) -> AppError {
    match CONFLICT_DETAIL.captures(body) {
        Some(caps) => AppError::duplicate(&caps["field"], &caps["value"]),
        None => AppError::duplicate("key", body.trim()),
    }
}

#[async_trait]
impl LibraryStorage for RestStorage {
    async fn list_books(&self) -> Result<Vec<Book>> {
        self.select(
            BOOKS,
            &[("select", "*".into()), ("order", "created_at.desc".into())],
        )
        .await
    }

    async fn get_book(&self, id: &str) -> Result<Option<Book>> {
        let rows: Vec<Book> = self
            .select(BOOKS, &[("select", "*".into()), ("id", eq(id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_book(&self, book: &NewBook) -> Result<Book> {
        self.insert(BOOKS, book).await
    }

    async fn update_book(&self, id: &str, patch: &BookPatch) -> Result<Book> {
        self.patch(BOOKS, id, patch).await
    }

    async fn delete_book(&self, id: &str) -> Result<()> {
        let history = self.remove(TRANSACTIONS, &[("book_id", eq(id))]).await?;
        if self.remove(BOOKS, &[("id", eq(id))]).await? == 0 {
            return Err(AppError::not_found(BOOKS, id));
        }
        log::info!("Deleted book {id} with {history} transaction(s)");
        Ok(())
    }

    async fn list_students(&self) -> Result<Vec<Student>> {
        self.select(
            STUDENTS,
            &[("select", "*".into()), ("order", "created_at.desc".into())],
        )
        .await
    }

    async fn get_student(&self, id: &str) -> Result<Option<Student>> {
        let rows: Vec<Student> = self
            .select(STUDENTS, &[("select", "*".into()), ("id", eq(id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn find_student_by_reg(&self, reg_number: &str) -> Result<Option<Student>> {
        let rows: Vec<Student> = self
            .select(
                STUDENTS,
                &[("select", "*".into()), ("reg_number", eq(reg_number))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_student(&self, student: &NewStudent) -> Result<Student> {
        self.insert(STUDENTS, student).await
    }

    async fn update_student(&self, id: &str, patch: &StudentPatch) -> Result<Student> {
        self.patch(STUDENTS, id, patch).await
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        self.select(
            TRANSACTIONS,
            &[
                ("select", TRANSACTION_JOIN.into()),
                ("order", "borrowed_date.desc".into()),
            ],
        )
        .await
    }

    async fn open_transactions_for_book(&self, book_id: &str) -> Result<Vec<Transaction>> {
        self.select(
            TRANSACTIONS,
            &[
                ("select", "*".into()),
                ("book_id", eq(book_id)),
                ("status", eq("Borrowed")),
                ("order", "borrowed_date.desc".into()),
            ],
        )
        .await
    }

    async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>> {
        let rows: Vec<Transaction> = self
            .select(TRANSACTIONS, &[("select", "*".into()), ("id", eq(id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_transaction(&self, tx: &NewTransaction) -> Result<Transaction> {
        self.insert(TRANSACTIONS, tx).await
    }

    async fn update_transaction(&self, id: &str, patch: &TransactionPatch) -> Result<Transaction> {
        self.patch(TRANSACTIONS, id, patch).await
    }

    async fn load_settings(&self) -> Result<Option<LibrarySettings>> {
        let rows: Vec<LibrarySettings> = self
            .select(SETTINGS, &[("select", "*".into()), ("id", eq("1"))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn save_settings(&self, settings: &LibrarySettings) -> Result<()> {
        settings.validate()?;
        let url = self.table_url(SETTINGS, &[])?;
        log::debug!("POST {url} (upsert)");
        Self::send(
            self.client
                .post(url)
                .header("Prefer", PREFER_UPSERT)
                .json(settings),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(url: &str) -> RestStorage {
        let config = BackendConfig {
            url: url.to_string(),
            anon_key: "anon".to_string(),
            ..BackendConfig::default()
        };
        RestStorage::new(&config).unwrap()
    }

    #[test]
    fn test_table_url() {
        let storage = storage("https://demo.supabase.co/");
        let url = storage
            .table_url("books", &[("id", eq("b1")), ("order", "created_at.desc".into())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo.supabase.co/rest/v1/books?id=eq.b1&order=created_at.desc"
        );
    }

    #[test]
    fn test_join_select_is_encoded() {
        let storage = storage("https://demo.supabase.co");
        let url = storage
            .table_url("transactions", &[("select", TRANSACTION_JOIN.into())])
            .unwrap();
        let (_, select) = url.query_pairs().next().unwrap();
        assert_eq!(select, TRANSACTION_JOIN);
    }

    #[test]
    fn test_parse_conflict() {
        let body = r#"{"code":"23505","details":"Key (isbn)=(A1) already exists.","message":"duplicate key value violates unique constraint \"books_isbn_key\""}"#;
        match parse_conflict(body) {
            AppError::DuplicateKey { field, value } => {
                assert_eq!(field, "isbn");
                assert_eq!(value, "A1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_conflict_without_detail() {
        assert!(matches!(
            parse_conflict("conflict"),
            AppError::DuplicateKey { .. }
        ));
    }
}
