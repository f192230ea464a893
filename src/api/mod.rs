mod envelope;

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Form, FromRequest, Multipart, Query, Request, State};
use axum::http::{Method, header};
use axum::routing::any;
use chrono::Local;
use tracing::{info, warn};

use crate::db::ClientStore;
use crate::models::NewClient;

pub use envelope::{ApiFailure, Envelope};

pub const API_PATH: &str = "/api";

/// Form field names shared by the endpoint and the front end.
pub mod fields {
    pub const ACTION: &str = "action";
    pub const NAME: &str = "nombre";
    pub const PATERNAL_SURNAME: &str = "apellidoPaterno";
    pub const MATERNAL_SURNAME: &str = "apellidoMaterno";
    pub const BIRTH_DATE: &str = "fechaNacimiento";
    pub const ADDRESS: &str = "direccion";
    pub const PHONE: &str = "telefono";
    pub const REGISTRATION_DATE: &str = "fechaRegistro";
}

pub const ACTION_LOAD: &str = "load";
pub const ACTION_SAVE: &str = "save";

const MIN_NAME_CHARS: usize = 3;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ClientStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn ClientStore>) -> Self {
        Self { store }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route(API_PATH, any(handle))
        .with_state(state)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    List,
    Create,
}

/// GET always lists, even with `action=save`; only then is POST or the
/// action marker considered.
fn dispatch(method: &Method, action: Option<&str>) -> Option<Operation> {
    if *method == Method::GET || action == Some(ACTION_LOAD) {
        Some(Operation::List)
    } else if *method == Method::POST || action == Some(ACTION_SAVE) {
        Some(Operation::Create)
    } else {
        None
    }
}

async fn handle(
    State(state): State<AppState>,
    method: Method,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    request: Request,
) -> Envelope {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    // Only POST bodies carry fields; other methods select by query string alone.
    let form = if method == Method::POST {
        read_post_fields(request).await
    } else {
        HashMap::new()
    };

    let action = form
        .get(fields::ACTION)
        .or_else(|| query.get(fields::ACTION))
        .map(String::as_str);

    match dispatch(&method, action) {
        Some(Operation::List) => {
            info!(%method, ?action, "listing clients");
            list(state.store.as_ref()).await
        }
        Some(Operation::Create) => {
            info!(%method, ?action, "registering client");
            create(state.store.as_ref(), &form).await
        }
        None => {
            warn!(%method, ?action, "rejected request");
            ApiFailure::not_supported().into()
        }
    }
}

/// Collects the text fields of a urlencoded or multipart body. Anything
/// unreadable yields no fields.
async fn read_post_fields(request: Request) -> HashMap<String, String> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if is_multipart {
        match Multipart::from_request(request, &()).await {
            Ok(multipart) => collect_multipart(multipart).await,
            Err(rejection) => {
                warn!(error = %rejection, "unreadable multipart body");
                HashMap::new()
            }
        }
    } else {
        match Form::<HashMap<String, String>>::from_request(request, &()).await {
            Ok(Form(fields)) => fields,
            Err(rejection) => {
                warn!(error = %rejection, "unreadable form body");
                HashMap::new()
            }
        }
    }
}

async fn collect_multipart(mut multipart: Multipart) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let Some(name) = field.name().map(str::to_string) else {
                    continue;
                };
                match field.text().await {
                    Ok(value) => {
                        fields.insert(name, value);
                    }
                    Err(err) => {
                        warn!(error = %err, field = %name, "unreadable multipart field");
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "malformed multipart body");
                break;
            }
        }
    }
    fields
}

async fn list(store: &dyn ClientStore) -> Envelope {
    match store.list_all().await {
        Ok(clients) => Envelope::Listed(clients),
        Err(err) => {
            warn!(error = %err, "list failed");
            ApiFailure::listing(&err).into()
        }
    }
}

async fn create(store: &dyn ClientStore, form: &HashMap<String, String>) -> Envelope {
    let client = match read_new_client(form) {
        Some(client) => client,
        None => return ApiFailure::validation().into(),
    };

    match store.insert(&client).await {
        Ok(id) => {
            info!(id, "client registered");
            Envelope::Created { id }
        }
        Err(err) => {
            warn!(error = %err, "insert failed");
            ApiFailure::inserting(&err).into()
        }
    }
}

fn text(form: &HashMap<String, String>, key: &str) -> String {
    form.get(key).map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Required fields treat a lone "0" the same as no value.
fn is_missing(value: &str) -> bool {
    value.is_empty() || value == "0"
}

fn optional_text(form: &HashMap<String, String>, key: &str) -> Option<String> {
    Some(text(form, key)).filter(|v| !v.is_empty())
}

/// Trims the submitted fields and applies the required-field checks.
/// Returns `None` when the input must be rejected.
fn read_new_client(form: &HashMap<String, String>) -> Option<NewClient> {
    let name = text(form, fields::NAME);
    let paternal_surname = text(form, fields::PATERNAL_SURNAME);

    if is_missing(&name)
        || is_missing(&paternal_surname)
        || name.chars().count() < MIN_NAME_CHARS
    {
        return None;
    }

    let registration_date = optional_text(form, fields::REGISTRATION_DATE)
        .unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string());

    Some(NewClient {
        name,
        paternal_surname,
        maternal_surname: optional_text(form, fields::MATERNAL_SURNAME),
        birth_date: optional_text(form, fields::BIRTH_DATE),
        address: optional_text(form, fields::ADDRESS),
        phone: optional_text(form, fields::PHONE),
        registration_date,
    })
}
