use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A persisted client row. Serialized with the lower-case column names the
/// front end reads directly.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClientRecord {
    pub id: i32,
    #[sqlx(rename = "nombre")]
    #[serde(rename = "nombre")]
    pub name: String,
    #[sqlx(rename = "apellidopaterno")]
    #[serde(rename = "apellidopaterno")]
    pub paternal_surname: String,
    #[sqlx(rename = "apellidomaterno")]
    #[serde(rename = "apellidomaterno")]
    pub maternal_surname: Option<String>,
    #[sqlx(rename = "fechanacimiento")]
    #[serde(rename = "fechanacimiento")]
    pub birth_date: Option<NaiveDate>,
    #[sqlx(rename = "direccion")]
    #[serde(rename = "direccion")]
    pub address: Option<String>,
    #[sqlx(rename = "telefono")]
    #[serde(rename = "telefono")]
    pub phone: Option<String>,
    #[sqlx(rename = "fecharegistro")]
    #[serde(rename = "fecharegistro")]
    pub registration_date: NaiveDate,
}

/// Insert input. Dates stay textual and are cast by the database.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClient {
    pub name: String,
    pub paternal_surname: String,
    pub maternal_surname: Option<String>,
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub registration_date: String,
}
