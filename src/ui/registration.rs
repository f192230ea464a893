//! Front-end state for the registration screen: the client table, the form
//! being filled in and the transient status message.
//!
//! Every network call is awaited by the single task that owns the view
//! model. Operations take `&mut self`, so two submissions can never be in
//! flight at once.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use super::api_client::{ApiReply, ClientApi};
use crate::api::{ACTION_SAVE, fields};

pub const EMPTY_TABLE_MESSAGE: &str = "No hay clientes registrados aún.";
pub const DATE_FORMAT_MESSAGE: &str = "El formato debe ser dd/mm/aaaa.";
pub const LOAD_FAILED_MESSAGE: &str = "Error al cargar los datos.";
pub const SAVE_FAILED_MESSAGE: &str = "Error al registrar cliente.";
pub const TRANSPORT_FAILED_MESSAGE: &str = "Error al comunicar con la API.";

pub const TOAST_LIFETIME: Duration = Duration::from_secs(5);

/// Record keys shown in the table, in column order.
pub const COLUMN_KEYS: [&str; 7] = [
    "nombre",
    "apellidopaterno",
    "apellidomaterno",
    "fechanacimiento",
    "direccion",
    "telefono",
    "fecharegistro",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Rendered,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    shown_at: Instant,
}

/// One rendered table line. `index` is a display counter, not the record id.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub index: usize,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableBody {
    Placeholder,
    Rows(Vec<DisplayRow>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Saved,
    InvalidDate,
    Rejected,
    TransportFailed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationForm {
    pub name: String,
    pub paternal_surname: String,
    pub maternal_surname: String,
    pub birth_date: String,
    pub address: String,
    pub phone: String,
}

impl RegistrationForm {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn pairs(&self, birth_date: String) -> Vec<(String, String)> {
        vec![
            (fields::NAME.to_string(), self.name.clone()),
            (fields::PATERNAL_SURNAME.to_string(), self.paternal_surname.clone()),
            (fields::MATERNAL_SURNAME.to_string(), self.maternal_surname.clone()),
            (fields::BIRTH_DATE.to_string(), birth_date),
            (fields::ADDRESS.to_string(), self.address.clone()),
            (fields::PHONE.to_string(), self.phone.clone()),
        ]
    }
}

/// Rewrites a strict `dd/mm/yyyy` date as `yyyy-mm-dd`. Anything else,
/// including other separators or missing zero padding, yields `None`.
pub fn reformat_birth_date(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    if bytes.len() != 10 || bytes[2] != b'/' || bytes[5] != b'/' {
        return None;
    }
    let digits = [0, 1, 3, 4, 6, 7, 8, 9];
    if !digits.iter().all(|&i| bytes[i].is_ascii_digit()) {
        return None;
    }
    Some(format!("{}-{}-{}", &input[6..10], &input[3..5], &input[0..2]))
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => String::new(),
        Some(other) => other.to_string(),
    }
}

fn table_from(reply: &ApiReply) -> TableBody {
    match (reply.success, &reply.clientes) {
        (true, Some(Value::Array(records))) => TableBody::Rows(
            records
                .iter()
                .enumerate()
                .map(|(i, record)| DisplayRow {
                    index: i + 1,
                    cells: COLUMN_KEYS
                        .iter()
                        .map(|key| cell_text(record.get(*key)))
                        .collect(),
                })
                .collect(),
        ),
        _ => TableBody::Placeholder,
    }
}

pub struct RegistrationViewModel {
    phase: Phase,
    table: TableBody,
    toast: Option<Toast>,
    pub form: RegistrationForm,
}

impl Default for RegistrationViewModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationViewModel {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            table: TableBody::Rows(Vec::new()),
            toast: None,
            form: RegistrationForm::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn table(&self) -> &TableBody {
        &self.table
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    fn show(&mut self, text: impl Into<String>, kind: ToastKind, now: Instant) {
        self.toast = Some(Toast {
            text: text.into(),
            kind,
            shown_at: now,
        });
    }

    /// Clears a message once it has been visible for `TOAST_LIFETIME`.
    pub fn expire_toast(&mut self, now: Instant) {
        if let Some(toast) = &self.toast {
            if now.duration_since(toast.shown_at) >= TOAST_LIFETIME {
                self.toast = None;
            }
        }
    }

    /// Fetches the client list and rebuilds the table.
    pub async fn load(&mut self, api: &dyn ClientApi, now: Instant) {
        self.phase = Phase::Loading;
        match api.load().await {
            Ok(reply) => {
                self.table = table_from(&reply);
                debug!(table = ?self.table, "client table refreshed");
            }
            Err(err) => {
                debug!(error = %err, "loading clients failed");
                self.show(LOAD_FAILED_MESSAGE, ToastKind::Error, now);
            }
        }
        self.phase = Phase::Rendered;
    }

    /// Validates the form, posts it and refreshes the table on success.
    pub async fn submit(
        &mut self,
        api: &dyn ClientApi,
        today: NaiveDate,
        now: Instant,
    ) -> SubmitOutcome {
        self.toast = None;

        let birth_date = if self.form.birth_date.is_empty() {
            String::new()
        } else {
            match reformat_birth_date(&self.form.birth_date) {
                Some(date) => date,
                None => {
                    self.show(DATE_FORMAT_MESSAGE, ToastKind::Error, now);
                    return SubmitOutcome::InvalidDate;
                }
            }
        };

        let mut form = self.form.pairs(birth_date);
        form.push((fields::ACTION.to_string(), ACTION_SAVE.to_string()));
        form.push((
            fields::REGISTRATION_DATE.to_string(),
            today.format("%Y-%m-%d").to_string(),
        ));

        self.phase = Phase::Submitting;
        let outcome = match api.save(&form).await {
            Ok(reply) if reply.success => {
                self.show(reply.message.unwrap_or_default(), ToastKind::Ok, now);
                self.form.reset();
                self.load(api, now).await;
                return SubmitOutcome::Saved;
            }
            Ok(reply) => {
                let message = reply
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| SAVE_FAILED_MESSAGE.to_string());
                self.show(message, ToastKind::Error, now);
                SubmitOutcome::Rejected
            }
            Err(err) => {
                debug!(error = %err, "saving client failed");
                self.show(TRANSPORT_FAILED_MESSAGE, ToastKind::Error, now);
                SubmitOutcome::TransportFailed
            }
        };
        self.phase = Phase::Idle;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AppState, app};
    use crate::db::memory::MemoryStore;
    use crate::ui::api_client::{HttpClientApi, TransportError};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct ScriptedApi {
        loads: Mutex<Vec<Option<ApiReply>>>,
        saves: Mutex<Vec<Option<ApiReply>>>,
        sent: Mutex<Vec<Vec<(String, String)>>>,
        load_calls: Mutex<usize>,
    }

    impl ScriptedApi {
        fn on_load(self, reply: Option<ApiReply>) -> Self {
            self.loads.lock().unwrap().push(reply);
            self
        }

        fn on_save(self, reply: Option<ApiReply>) -> Self {
            self.saves.lock().unwrap().push(reply);
            self
        }

        fn sent(&self) -> Vec<Vec<(String, String)>> {
            self.sent.lock().unwrap().clone()
        }

        fn load_calls(&self) -> usize {
            *self.load_calls.lock().unwrap()
        }
    }

    fn unreachable() -> TransportError {
        TransportError::Decode("connection refused".to_string())
    }

    #[async_trait]
    impl ClientApi for ScriptedApi {
        async fn load(&self) -> Result<ApiReply, TransportError> {
            *self.load_calls.lock().unwrap() += 1;
            let mut loads = self.loads.lock().unwrap();
            let next = if loads.is_empty() { None } else { loads.remove(0) };
            next.ok_or_else(unreachable)
        }

        async fn save(&self, form: &[(String, String)]) -> Result<ApiReply, TransportError> {
            self.sent.lock().unwrap().push(form.to_vec());
            let mut saves = self.saves.lock().unwrap();
            let next = if saves.is_empty() { None } else { saves.remove(0) };
            next.ok_or_else(unreachable)
        }
    }

    fn listed(clientes: Value) -> ApiReply {
        ApiReply {
            success: true,
            clientes: Some(clientes),
            ..ApiReply::default()
        }
    }

    fn filled_form(birth_date: &str) -> RegistrationForm {
        RegistrationForm {
            name: "Lucía".to_string(),
            paternal_surname: "Pérez".to_string(),
            maternal_surname: String::new(),
            birth_date: birth_date.to_string(),
            address: "Av. Reforma 10".to_string(),
            phone: "5512345678".to_string(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn value_of<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn reformat_accepts_only_strict_dates() {
        assert_eq!(reformat_birth_date("25/12/1990").as_deref(), Some("1990-12-25"));
        assert_eq!(reformat_birth_date("1990-12-25"), None);
        assert_eq!(reformat_birth_date("5/12/1990"), None);
        assert_eq!(reformat_birth_date("25-12-1990"), None);
        assert_eq!(reformat_birth_date("25/12/90"), None);
        assert_eq!(reformat_birth_date("aa/bb/cccc"), None);
        assert_eq!(reformat_birth_date("25/12/1990 "), None);
    }

    #[tokio::test]
    async fn load_renders_rows_in_returned_order() {
        let api = ScriptedApi::default().on_load(Some(listed(serde_json::json!([
            {"id": 9, "nombre": "Carla", "apellidopaterno": "Soto", "apellidomaterno": null,
             "fechanacimiento": "1990-12-25", "direccion": null, "telefono": "555",
             "fecharegistro": "2024-06-03"},
            {"id": 4, "nombre": "Alba", "apellidopaterno": "Ruiz"},
        ]))));
        let mut vm = RegistrationViewModel::new();

        vm.load(&api, Instant::now()).await;

        assert_eq!(vm.phase(), Phase::Rendered);
        let TableBody::Rows(rows) = vm.table() else {
            panic!("expected rows, got {:?}", vm.table());
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].index, 1);
        assert_eq!(
            rows[0].cells,
            ["Carla", "Soto", "", "1990-12-25", "", "555", "2024-06-03"]
        );
        assert_eq!(rows[1].index, 2);
        assert_eq!(rows[1].cells, ["Alba", "Ruiz", "", "", "", "", ""]);
    }

    #[tokio::test]
    async fn unsuccessful_or_shapeless_reply_shows_placeholder() {
        let failed = ApiReply {
            success: false,
            message: Some("Error al listar clientes: boom".to_string()),
            ..ApiReply::default()
        };
        let not_a_list = listed(serde_json::json!({"nombre": "Ana"}));
        let api = ScriptedApi::default()
            .on_load(Some(failed))
            .on_load(Some(not_a_list));
        let mut vm = RegistrationViewModel::new();

        vm.load(&api, Instant::now()).await;
        assert_eq!(vm.table(), &TableBody::Placeholder);

        vm.load(&api, Instant::now()).await;
        assert_eq!(vm.table(), &TableBody::Placeholder);
        assert!(vm.toast().is_none());
    }

    #[tokio::test]
    async fn load_transport_failure_keeps_table_and_warns() {
        let api = ScriptedApi::default()
            .on_load(Some(listed(serde_json::json!([{"nombre": "Ana"}]))))
            .on_load(None);
        let mut vm = RegistrationViewModel::new();

        vm.load(&api, Instant::now()).await;
        let before = vm.table().clone();
        vm.load(&api, Instant::now()).await;

        assert_eq!(vm.table(), &before);
        let toast = vm.toast().unwrap();
        assert_eq!(toast.text, LOAD_FAILED_MESSAGE);
        assert_eq!(toast.kind, ToastKind::Error);
    }

    #[tokio::test]
    async fn malformed_birth_date_never_hits_the_network() {
        let api = ScriptedApi::default();
        let mut vm = RegistrationViewModel::new();
        vm.form = filled_form("1990-12-25");

        let outcome = vm.submit(&api, today(), Instant::now()).await;

        assert_eq!(outcome, SubmitOutcome::InvalidDate);
        assert!(api.sent().is_empty());
        assert_eq!(vm.toast().unwrap().text, DATE_FORMAT_MESSAGE);
        assert_eq!(vm.form, filled_form("1990-12-25"));
    }

    #[tokio::test]
    async fn successful_submit_resets_form_and_reloads() {
        let saved = ApiReply {
            success: true,
            message: Some("Cliente registrado correctamente.".to_string()),
            id: Some(1),
            ..ApiReply::default()
        };
        let api = ScriptedApi::default()
            .on_save(Some(saved))
            .on_load(Some(listed(serde_json::json!([{"nombre": "Lucía"}]))));
        let mut vm = RegistrationViewModel::new();
        vm.form = filled_form("25/12/1990");

        let outcome = vm.submit(&api, today(), Instant::now()).await;

        assert_eq!(outcome, SubmitOutcome::Saved);
        let sent = api.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(value_of(&sent[0], "fechaNacimiento"), Some("1990-12-25"));
        assert_eq!(value_of(&sent[0], "action"), Some("save"));
        assert_eq!(value_of(&sent[0], "fechaRegistro"), Some("2024-06-03"));
        assert_eq!(value_of(&sent[0], "nombre"), Some("Lucía"));

        assert_eq!(vm.form, RegistrationForm::default());
        assert_eq!(api.load_calls(), 1);
        assert_eq!(vm.phase(), Phase::Rendered);
        let toast = vm.toast().unwrap();
        assert_eq!(toast.kind, ToastKind::Ok);
        assert_eq!(toast.text, "Cliente registrado correctamente.");
    }

    #[tokio::test]
    async fn rejected_submit_keeps_form_and_shows_server_message() {
        let rejected = ApiReply {
            success: false,
            message: Some("Todos los campos son obligatorios.".to_string()),
            ..ApiReply::default()
        };
        let api = ScriptedApi::default()
            .on_save(Some(rejected))
            .on_save(Some(ApiReply::default()));
        let mut vm = RegistrationViewModel::new();
        vm.form = filled_form("");

        assert_eq!(
            vm.submit(&api, today(), Instant::now()).await,
            SubmitOutcome::Rejected
        );
        assert_eq!(vm.toast().unwrap().text, "Todos los campos son obligatorios.");
        assert_eq!(vm.form, filled_form(""));
        assert_eq!(vm.phase(), Phase::Idle);

        vm.submit(&api, today(), Instant::now()).await;
        assert_eq!(vm.toast().unwrap().text, SAVE_FAILED_MESSAGE);
        assert_eq!(api.load_calls(), 0);
    }

    #[tokio::test]
    async fn transport_failure_on_submit_uses_generic_message() {
        let api = ScriptedApi::default();
        let mut vm = RegistrationViewModel::new();
        vm.form = filled_form("");

        let outcome = vm.submit(&api, today(), Instant::now()).await;

        assert_eq!(outcome, SubmitOutcome::TransportFailed);
        assert_eq!(vm.toast().unwrap().text, TRANSPORT_FAILED_MESSAGE);
        assert_eq!(vm.form, filled_form(""));
    }

    #[tokio::test]
    async fn toast_clears_after_five_seconds() {
        let api = ScriptedApi::default();
        let mut vm = RegistrationViewModel::new();
        vm.form = filled_form("31-01-2000");
        let shown = Instant::now();

        vm.submit(&api, today(), shown).await;
        vm.expire_toast(shown + Duration::from_secs(4));
        assert!(vm.toast().is_some());

        vm.expire_toast(shown + TOAST_LIFETIME);
        assert!(vm.toast().is_none());
    }

    #[tokio::test]
    async fn birth_date_round_trips_through_the_endpoint() {
        let store = Arc::new(MemoryStore::new());
        let router = app(AppState::new(store.clone()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let api = HttpClientApi::new(format!("http://{addr}/api"));
        let mut vm = RegistrationViewModel::new();
        vm.load(&api, Instant::now()).await;
        assert_eq!(vm.table(), &TableBody::Rows(Vec::new()));

        vm.form = filled_form("25/12/1990");
        let outcome = vm.submit(&api, today(), Instant::now()).await;
        assert_eq!(outcome, SubmitOutcome::Saved);

        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].birth_date, NaiveDate::from_ymd_opt(1990, 12, 25));
        assert_eq!(rows[0].registration_date, today());
        assert_eq!(rows[0].maternal_surname, None);

        let TableBody::Rows(rendered) = vm.table() else {
            panic!("expected rows after save");
        };
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].cells[0], "Lucía");
        assert_eq!(rendered[0].cells[3], "1990-12-25");
    }
}
