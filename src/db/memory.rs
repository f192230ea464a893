//! In-memory `ClientStore` used by handler and front-end tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{ClientStore, StoreError};
use crate::models::{ClientRecord, NewClient};

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<ClientRecord>>,
    failure: Mutex<Option<StoreError>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following call fails with `err`.
    pub fn fail_with(&self, err: StoreError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn insert_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn rows(&self) -> Vec<ClientRecord> {
        self.rows.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        StoreError::QueryFailed(format!("invalid input syntax for type date: \"{value}\""))
    })
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<ClientRecord>, StoreError> {
        self.check()?;
        let mut rows = self.rows();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn insert(&self, client: &NewClient) -> Result<i32, StoreError> {
        self.check()?;
        let birth_date = client.birth_date.as_deref().map(parse_date).transpose()?;
        let registration_date = parse_date(&client.registration_date)?;

        let mut rows = self.rows.lock().unwrap();
        let id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        rows.push(ClientRecord {
            id,
            name: client.name.clone(),
            paternal_surname: client.paternal_surname.clone(),
            maternal_surname: client.maternal_surname.clone(),
            birth_date,
            address: client.address.clone(),
            phone: client.phone.clone(),
            registration_date,
        });
        Ok(id)
    }
}
