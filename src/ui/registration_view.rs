use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    Frame,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table},
};

use super::registration::{
    EMPTY_TABLE_MESSAGE, RegistrationForm, RegistrationViewModel, TableBody, ToastKind,
};

/// How long input polling blocks before the loop redraws.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RegistrationAction {
    Quit,
    Submit,
    Reload,
}

#[derive(Clone, PartialEq, Copy)]
pub enum FormField {
    Name,
    PaternalSurname,
    MaternalSurname,
    BirthDate,
    Address,
    Phone,
}

impl FormField {
    const ALL: [FormField; 6] = [
        FormField::Name,
        FormField::PaternalSurname,
        FormField::MaternalSurname,
        FormField::BirthDate,
        FormField::Address,
        FormField::Phone,
    ];

    fn label(self) -> &'static str {
        match self {
            FormField::Name => "Nombre",
            FormField::PaternalSurname => "Apellido paterno",
            FormField::MaternalSurname => "Apellido materno",
            FormField::BirthDate => "Fecha de nacimiento (dd/mm/aaaa)",
            FormField::Address => "Dirección",
            FormField::Phone => "Teléfono",
        }
    }

    fn value(self, form: &RegistrationForm) -> &String {
        match self {
            FormField::Name => &form.name,
            FormField::PaternalSurname => &form.paternal_surname,
            FormField::MaternalSurname => &form.maternal_surname,
            FormField::BirthDate => &form.birth_date,
            FormField::Address => &form.address,
            FormField::Phone => &form.phone,
        }
    }

    fn value_mut(self, form: &mut RegistrationForm) -> &mut String {
        match self {
            FormField::Name => &mut form.name,
            FormField::PaternalSurname => &mut form.paternal_surname,
            FormField::MaternalSurname => &mut form.maternal_surname,
            FormField::BirthDate => &mut form.birth_date,
            FormField::Address => &mut form.address,
            FormField::Phone => &mut form.phone,
        }
    }
}

/// Cursor state of the form; the values themselves live in the view model.
pub struct RegistrationScreen {
    pub current_field: FormField,
    pub editing: bool,
}

impl Default for RegistrationScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationScreen {
    pub fn new() -> Self {
        Self {
            current_field: FormField::Name,
            editing: false,
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
    }

    pub fn next_field(&mut self) {
        self.current_field = match self.current_field {
            FormField::Name => FormField::PaternalSurname,
            FormField::PaternalSurname => FormField::MaternalSurname,
            FormField::MaternalSurname => FormField::BirthDate,
            FormField::BirthDate => FormField::Address,
            FormField::Address => FormField::Phone,
            FormField::Phone => FormField::Name,
        };
    }

    pub fn previous_field(&mut self) {
        self.current_field = match self.current_field {
            FormField::Name => FormField::Phone,
            FormField::PaternalSurname => FormField::Name,
            FormField::MaternalSurname => FormField::PaternalSurname,
            FormField::BirthDate => FormField::MaternalSurname,
            FormField::Address => FormField::BirthDate,
            FormField::Phone => FormField::Address,
        };
    }

    pub fn edit_current_field(&mut self, form: &mut RegistrationForm, key: KeyCode) {
        if !self.editing {
            return;
        }

        let field_value = self.current_field.value_mut(form);
        match key {
            KeyCode::Char(c) => field_value.push(c),
            KeyCode::Backspace => {
                field_value.pop();
            }
            _ => {}
        }
    }
}

pub fn render_registration<B: Backend>(
    f: &mut Frame<B>,
    screen: &RegistrationScreen,
    view_model: &RegistrationViewModel,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(8),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    render_form(f, screen, &view_model.form, chunks[0]);
    render_message(f, view_model, chunks[1]);
    render_table(f, view_model.table(), chunks[2]);

    let help_text = if screen.editing {
        "Enter - Guardar campo | Esc - Terminar edición"
    } else {
        "Enter - Editar campo | Arriba/Abajo - Navegar | S - Registrar | R - Recargar | Esc/Q - Salir"
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}

fn render_form<B: Backend>(
    f: &mut Frame<B>,
    screen: &RegistrationScreen,
    form: &RegistrationForm,
    area: Rect,
) {
    let items: Vec<ListItem> = FormField::ALL
        .iter()
        .map(|&field| {
            let selected = field == screen.current_field;
            let value = field.value(form);
            let content = if selected && screen.editing {
                Spans::from(vec![
                    Span::styled(
                        format!("{}: ", field.label()),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::styled(
                        format!("{}|", value),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                let style = if selected {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };

                Spans::from(vec![
                    Span::styled(format!("{}: ", field.label()), style),
                    Span::raw(value.as_str()),
                ])
            };

            ListItem::new(content)
        })
        .collect();

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Registro de clientes"));

    f.render_widget(form_list, area);
}

fn render_message<B: Backend>(f: &mut Frame<B>, view_model: &RegistrationViewModel, area: Rect) {
    let (text, style) = match view_model.toast() {
        Some(toast) => {
            let color = match toast.kind {
                ToastKind::Ok => Color::Green,
                ToastKind::Error => Color::Red,
            };
            (toast.text.as_str(), Style::default().fg(color))
        }
        None => ("", Style::default()),
    };

    let message = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(message, area);
}

fn render_table<B: Backend>(f: &mut Frame<B>, table: &TableBody, area: Rect) {
    let header = Row::new(vec![
        "#",
        "Nombre",
        "Ap. paterno",
        "Ap. materno",
        "Nacimiento",
        "Dirección",
        "Teléfono",
        "Registro",
    ])
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = match table {
        TableBody::Placeholder => vec![Row::new(vec![
            Cell::from(""),
            Cell::from(EMPTY_TABLE_MESSAGE),
        ])],
        TableBody::Rows(rows) => rows
            .iter()
            .map(|row| {
                let mut cells = vec![Cell::from(row.index.to_string())];
                cells.extend(row.cells.iter().map(|c| Cell::from(c.clone())));
                Row::new(cells)
            })
            .collect(),
    };

    let widths = [
        Constraint::Length(4),
        Constraint::Percentage(14),
        Constraint::Percentage(14),
        Constraint::Percentage(14),
        Constraint::Length(12),
        Constraint::Percentage(20),
        Constraint::Length(12),
        Constraint::Length(12),
    ];

    let clients_table = Table::new(rows)
        .header(header)
        .block(Block::default().title("Clientes").borders(Borders::ALL))
        .widths(&widths)
        .column_spacing(1);

    f.render_widget(clients_table, area);
}

/// Polls for one key press. Returns `Ok(None)` when nothing actionable
/// happened within `POLL_INTERVAL`.
pub fn handle_input(
    screen: &mut RegistrationScreen,
    form: &mut RegistrationForm,
) -> Result<Option<RegistrationAction>> {
    if !event::poll(POLL_INTERVAL)? {
        return Ok(None);
    }

    match event::read()? {
        Event::Key(key) => Ok(apply_key(screen, form, key.code)),
        _ => Ok(None),
    }
}

/// Applies one key press to the screen and form.
fn apply_key(
    screen: &mut RegistrationScreen,
    form: &mut RegistrationForm,
    code: KeyCode,
) -> Option<RegistrationAction> {
    match code {
        KeyCode::Esc if screen.editing => screen.toggle_editing(),
        KeyCode::Esc => return Some(RegistrationAction::Quit),
        KeyCode::Enter => screen.toggle_editing(),
        KeyCode::Up if !screen.editing => screen.previous_field(),
        KeyCode::Down | KeyCode::Tab if !screen.editing => screen.next_field(),
        KeyCode::Char('q') if !screen.editing => return Some(RegistrationAction::Quit),
        KeyCode::Char('s') if !screen.editing => return Some(RegistrationAction::Submit),
        KeyCode::Char('r') if !screen.editing => return Some(RegistrationAction::Reload),
        _ if screen.editing => screen.edit_current_field(form, code),
        _ => {}
    }
    None
}
