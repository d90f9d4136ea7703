//! Local filesystem storage implementation.
//!
//! Keeps the backend tables as JSON files for offline operation and tests.
//! Production deployments should use `RestStorage`.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── books.json          # newest first
//! ├── students.json       # newest first
//! ├── transactions.json   # stored without joined rows
//! └── settings.json       # single settings row
//! ```
//!
//! Unique constraints of the hosted schema (`books.isbn`,
//! `students.reg_number`) are enforced here as well so both backends reject
//! the same writes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    Book, BookPatch, LibrarySettings, NewBook, NewStudent, NewTransaction, Student, StudentPatch,
    Transaction, TransactionPatch, TransactionStatus,
};
use crate::storage::LibraryStorage;
use crate::utils::fs;

const BOOKS: &str = "books.json";
const STUDENTS: &str = "students.json";
const TRANSACTIONS: &str = "transactions.json";
const SETTINGS: &str = "settings.json";

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    /// Serializes read-modify-write cycles within this process
    lock: Arc<Mutex<()>>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get the full path for a table file.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    async fn read_table<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        Ok(fs::read_json(&self.path(key)).await?.unwrap_or_default())
    }

    async fn write_table<T: Serialize>(&self, key: &str, rows: &[T]) -> Result<()> {
        fs::write_json(&self.path(key), rows).await
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn ensure_unique_isbn(books: &[Book], isbn: &str, except_id: Option<&str>) -> Result<()> {
        let taken = books
            .iter()
            .any(|b| b.isbn == isbn && Some(b.id.as_str()) != except_id);
        if taken {
            return Err(AppError::duplicate("isbn", isbn));
        }
        Ok(())
    }

    fn ensure_unique_reg(students: &[Student], reg: &str, except_id: Option<&str>) -> Result<()> {
        let taken = students
            .iter()
            .any(|s| s.reg_number == reg && Some(s.id.as_str()) != except_id);
        if taken {
            return Err(AppError::duplicate("reg_number", reg));
        }
        Ok(())
    }

    fn sort_latest_first(transactions: &mut [Transaction]) {
        transactions.sort_by(|a, b| b.borrowed_date.cmp(&a.borrowed_date));
    }
}

#[async_trait]
impl LibraryStorage for LocalStorage {
    async fn list_books(&self) -> Result<Vec<Book>> {
        self.read_table(BOOKS).await
    }

    async fn get_book(&self, id: &str) -> Result<Option<Book>> {
        let books: Vec<Book> = self.read_table(BOOKS).await?;
        Ok(books.into_iter().find(|b| b.id == id))
    }

    async fn insert_book(&self, book: &NewBook) -> Result<Book> {
        let _guard = self.lock.lock().await;
        let mut books: Vec<Book> = self.read_table(BOOKS).await?;
        Self::ensure_unique_isbn(&books, &book.isbn, None)?;

        let now = Utc::now();
        let row = Book {
            id: Self::new_id(),
            isbn: book.isbn.clone(),
            name: book.name.clone(),
            author: book.author.clone(),
            is_available: book.is_available,
            created_at: now,
            updated_at: now,
        };
        books.insert(0, row.clone());
        self.write_table(BOOKS, &books).await?;
        Ok(row)
    }

    async fn update_book(&self, id: &str, patch: &BookPatch) -> Result<Book> {
        let _guard = self.lock.lock().await;
        let mut books: Vec<Book> = self.read_table(BOOKS).await?;
        if let Some(isbn) = &patch.isbn {
            Self::ensure_unique_isbn(&books, isbn, Some(id))?;
        }

        let book = books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::not_found("Book", id))?;
        patch.apply(book);
        book.updated_at = Utc::now();
        let updated = book.clone();

        self.write_table(BOOKS, &books).await?;
        Ok(updated)
    }

    async fn delete_book(&self, id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut books: Vec<Book> = self.read_table(BOOKS).await?;
        let before = books.len();
        books.retain(|b| b.id != id);
        if books.len() == before {
            return Err(AppError::not_found("Book", id));
        }

        let mut transactions: Vec<Transaction> = self.read_table(TRANSACTIONS).await?;
        transactions.retain(|t| t.book_id != id);

        self.write_table(BOOKS, &books).await?;
        self.write_table(TRANSACTIONS, &transactions).await?;
        Ok(())
    }

    async fn list_students(&self) -> Result<Vec<Student>> {
        self.read_table(STUDENTS).await
    }

    async fn get_student(&self, id: &str) -> Result<Option<Student>> {
        let students: Vec<Student> = self.read_table(STUDENTS).await?;
        Ok(students.into_iter().find(|s| s.id == id))
    }

    async fn find_student_by_reg(&self, reg_number: &str) -> Result<Option<Student>> {
        let students: Vec<Student> = self.read_table(STUDENTS).await?;
        Ok(students.into_iter().find(|s| s.reg_number == reg_number))
    }

    async fn insert_student(&self, student: &NewStudent) -> Result<Student> {
        let _guard = self.lock.lock().await;
        let mut students: Vec<Student> = self.read_table(STUDENTS).await?;
        Self::ensure_unique_reg(&students, &student.reg_number, None)?;

        let now = Utc::now();
        let row = Student {
            id: Self::new_id(),
            reg_number: student.reg_number.clone(),
            name: student.name.clone(),
            department: student.department.clone(),
            section: student.section.clone(),
            year: student.year,
            semester: student.semester,
            contact_number: student.contact_number.clone(),
            contact_info: student.contact_info.clone(),
            email: student.email.clone(),
            status: student.status,
            created_at: now,
            updated_at: now,
        };
        students.insert(0, row.clone());
        self.write_table(STUDENTS, &students).await?;
        Ok(row)
    }

    async fn update_student(&self, id: &str, patch: &StudentPatch) -> Result<Student> {
        let _guard = self.lock.lock().await;
        let mut students: Vec<Student> = self.read_table(STUDENTS).await?;
        if let Some(reg) = &patch.reg_number {
            Self::ensure_unique_reg(&students, reg, Some(id))?;
        }

        let student = students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::not_found("Student", id))?;
        patch.apply(student);
        student.updated_at = Utc::now();
        let updated = student.clone();

        self.write_table(STUDENTS, &students).await?;
        Ok(updated)
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let books: Vec<Book> = self.read_table(BOOKS).await?;
        let students: Vec<Student> = self.read_table(STUDENTS).await?;
        let mut transactions: Vec<Transaction> = self.read_table(TRANSACTIONS).await?;

        let books: HashMap<&str, &Book> = books.iter().map(|b| (b.id.as_str(), b)).collect();
        let students: HashMap<&str, &Student> =
            students.iter().map(|s| (s.id.as_str(), s)).collect();

        for tx in &mut transactions {
            tx.book = books.get(tx.book_id.as_str()).map(|b| (*b).clone());
            tx.student = students.get(tx.student_id.as_str()).map(|s| (*s).clone());
        }
        Self::sort_latest_first(&mut transactions);
        Ok(transactions)
    }

    async fn open_transactions_for_book(&self, book_id: &str) -> Result<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> = self.read_table(TRANSACTIONS).await?;
        transactions.retain(|t| t.book_id == book_id && t.status == TransactionStatus::Borrowed);
        Self::sort_latest_first(&mut transactions);
        Ok(transactions)
    }

    async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>> {
        let transactions: Vec<Transaction> = self.read_table(TRANSACTIONS).await?;
        Ok(transactions.into_iter().find(|t| t.id == id))
    }

    async fn insert_transaction(&self, tx: &NewTransaction) -> Result<Transaction> {
        let _guard = self.lock.lock().await;
        let mut transactions: Vec<Transaction> = self.read_table(TRANSACTIONS).await?;

        let now = Utc::now();
        let row = Transaction {
            id: Self::new_id(),
            book_id: tx.book_id.clone(),
            student_id: tx.student_id.clone(),
            borrowed_date: tx.borrowed_date,
            due_date: tx.due_date,
            return_date: tx.return_date,
            status: tx.status,
            remarks: tx.remarks.clone(),
            remarks_date: None,
            remarks_by: None,
            created_at: now,
            updated_at: now,
            book: None,
            student: None,
        };
        transactions.push(row.clone());
        self.write_table(TRANSACTIONS, &transactions).await?;
        Ok(row)
    }

    async fn update_transaction(&self, id: &str, patch: &TransactionPatch) -> Result<Transaction> {
        let _guard = self.lock.lock().await;
        let mut transactions: Vec<Transaction> = self.read_table(TRANSACTIONS).await?;

        let tx = transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| AppError::not_found("Transaction", id))?;
        patch.apply(tx);
        tx.updated_at = Utc::now();
        let updated = tx.clone();

        self.write_table(TRANSACTIONS, &transactions).await?;
        Ok(updated)
    }

    async fn load_settings(&self) -> Result<Option<LibrarySettings>> {
        fs::read_json(&self.path(SETTINGS)).await
    }

    async fn save_settings(&self, settings: &LibrarySettings) -> Result<()> {
        settings.validate()?;
        fs::write_json(&self.path(SETTINGS), settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn borrow_of(book_id: &str, student_id: &str, days_ago: i64) -> NewTransaction {
        let borrowed = Utc::now() - Duration::days(days_ago);
        NewTransaction {
            book_id: book_id.to_string(),
            student_id: student_id.to_string(),
            borrowed_date: borrowed,
            due_date: borrowed + Duration::days(15),
            return_date: None,
            status: TransactionStatus::Borrowed,
            remarks: None,
        }
    }

    #[tokio::test]
    async fn test_books_newest_first() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.insert_book(&NewBook::new("A1", "First", "X")).await.unwrap();
        storage.insert_book(&NewBook::new("A2", "Second", "Y")).await.unwrap();

        let books = storage.list_books().await.unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].isbn, "A2");
    }

    #[tokio::test]
    async fn test_unique_access_number() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let first = storage.insert_book(&NewBook::new("A1", "First", "X")).await.unwrap();
        let second = storage.insert_book(&NewBook::new("A2", "Second", "Y")).await.unwrap();

        let err = storage.insert_book(&NewBook::new("A1", "Again", "Z")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey { .. }));

        let patch = BookPatch {
            isbn: Some("A1".into()),
            ..BookPatch::default()
        };
        assert!(storage.update_book(&second.id, &patch).await.is_err());
        // Re-saving a book with its own access number is fine
        assert!(storage.update_book(&first.id, &patch).await.is_ok());
    }

    #[tokio::test]
    async fn test_transactions_are_joined() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let book = storage.insert_book(&NewBook::new("A1", "Rust", "K")).await.unwrap();
        let student = storage
            .insert_student(&NewStudent {
                reg_number: "R1".into(),
                name: Some("Asha".into()),
                ..NewStudent::default()
            })
            .await
            .unwrap();

        storage.insert_transaction(&borrow_of(&book.id, &student.id, 3)).await.unwrap();
        storage.insert_transaction(&borrow_of(&book.id, &student.id, 1)).await.unwrap();

        let all = storage.list_transactions().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].borrowed_date > all[1].borrowed_date);
        assert_eq!(all[0].book_name(), "Rust");
        assert_eq!(all[0].student_reg_number(), "R1");

        let open = storage.open_transactions_for_book(&book.id).await.unwrap();
        assert_eq!(open.len(), 2);
        assert!(open[0].book.is_none());
    }

    #[tokio::test]
    async fn test_delete_book_cascades() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let book = storage.insert_book(&NewBook::new("A1", "Rust", "K")).await.unwrap();
        storage.insert_transaction(&borrow_of(&book.id, "s1", 1)).await.unwrap();

        storage.delete_book(&book.id).await.unwrap();
        assert!(storage.list_books().await.unwrap().is_empty());
        assert!(storage.list_transactions().await.unwrap().is_empty());
        assert!(storage.delete_book(&book.id).await.is_err());
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.load_settings().await.unwrap().is_none());
        let settings = LibrarySettings::with_return_days(21).unwrap();
        storage.save_settings(&settings).await.unwrap();
        assert_eq!(storage.load_settings().await.unwrap(), Some(settings));
    }
}
