use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gestora::db;
use gestora::entities::{Bono, EstadoMaquinaria, FichaEmpresa, Maquinaria, Trabajador};
use gestora::error::DomainError;
use gestora::lifecycle::SoftDelete;
use gestora::roles::{Action, Role};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use rusqlite::Connection;
use std::collections::HashMap;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Trabajadores,
    Maquinaria,
    Bonos,
}

const PAGES: [Page; 3] = [Page::Trabajadores, Page::Maquinaria, Page::Bonos];

impl Page {
    pub fn title(&self) -> &'static str {
        match self {
            Page::Trabajadores => "Trabajadores",
            Page::Maquinaria => "Maquinaria",
            Page::Bonos => "Bonos",
        }
    }

    /// What a role needs to see this page
    pub fn required_action(&self) -> Action {
        match self {
            Page::Trabajadores => Action::ViewWorkers,
            Page::Maquinaria => Action::ViewMachinery,
            Page::Bonos => Action::ManageBonos,
        }
    }

    fn index(&self) -> usize {
        match self {
            Page::Trabajadores => 0,
            Page::Maquinaria => 1,
            Page::Bonos => 2,
        }
    }
}

/// Everything the UI shows, inactive records included
#[derive(Debug, Default)]
pub struct Data {
    pub trabajadores: Vec<Trabajador>,
    /// Current ficha by cleaned RUT
    pub fichas: HashMap<String, FichaEmpresa>,
    pub maquinarias: Vec<Maquinaria>,
    pub bonos: Vec<Bono>,
}

impl Data {
    pub fn load(conn: &Connection) -> Result<Self> {
        let trabajadores = db::list_trabajadores(conn, true)?;

        let mut fichas = HashMap::new();
        for t in &trabajadores {
            if let Some(historial) = db::get_historial(conn, &t.rut)? {
                fichas.insert(t.rut.as_str().to_string(), historial.current().value.clone());
            }
        }

        Ok(Data {
            trabajadores,
            fichas,
            maquinarias: db::list_maquinarias(conn, true)?,
            bonos: db::list_bonos(conn, true)?,
        })
    }
}

pub struct App {
    pub empresa: String,
    pub role: Role,
    pub data: Data,
    pub include_inactive: bool,
    pub current_page: Page,
    pub state: TableState,
    pub show_detail: bool,
}

impl App {
    /// Fails when the role may not see any page
    pub fn new(empresa: String, role: Role, data: Data) -> Result<Self, DomainError> {
        let first = PAGES
            .iter()
            .copied()
            .find(|p| role.can(p.required_action()))
            .ok_or_else(|| DomainError::Forbidden {
                role: role.to_string(),
                action: "usar la interfaz de gestión".to_string(),
            })?;

        let mut app = Self {
            empresa,
            role,
            data,
            include_inactive: false,
            current_page: first,
            state: TableState::default(),
            show_detail: false,
        };
        app.reset_selection();
        Ok(app)
    }

    pub fn allowed_pages(&self) -> Vec<Page> {
        PAGES
            .iter()
            .copied()
            .filter(|p| self.role.can(p.required_action()))
            .collect()
    }

    fn step_page(&mut self, forward: bool) {
        let n = PAGES.len();
        let mut i = self.current_page.index();
        for _ in 0..n {
            i = if forward { (i + 1) % n } else { (i + n - 1) % n };
            if self.role.can(PAGES[i].required_action()) {
                break;
            }
        }
        self.current_page = PAGES[i];
        self.show_detail = false;
        self.reset_selection();
    }

    pub fn next_page(&mut self) {
        self.step_page(true);
    }

    pub fn previous_page(&mut self) {
        self.step_page(false);
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn toggle_inactive(&mut self) {
        self.include_inactive = !self.include_inactive;
        self.reset_selection();
    }

    fn reset_selection(&mut self) {
        if self.row_count() == 0 {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn visible_trabajadores(&self) -> Vec<&Trabajador> {
        self.data
            .trabajadores
            .iter()
            .filter(|t| self.include_inactive || t.is_active())
            .collect()
    }

    pub fn visible_maquinarias(&self) -> Vec<&Maquinaria> {
        self.data
            .maquinarias
            .iter()
            .filter(|m| self.include_inactive || m.en_inventario)
            .collect()
    }

    pub fn visible_bonos(&self) -> Vec<&Bono> {
        self.data
            .bonos
            .iter()
            .filter(|b| self.include_inactive || b.is_active())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        match self.current_page {
            Page::Trabajadores => self.visible_trabajadores().len(),
            Page::Maquinaria => self.visible_maquinarias().len(),
            Page::Bonos => self.visible_bonos().len(),
        }
    }

    pub fn selected_trabajador(&self) -> Option<&Trabajador> {
        if self.current_page != Page::Trabajadores {
            return None;
        }
        let i = self.state.selected()?;
        self.visible_trabajadores().get(i).copied()
    }

    pub fn next(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn last(&mut self) {
        let len = self.row_count();
        if len > 0 {
            self.state.select(Some(len - 1));
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore the terminal before reporting anything
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('i') => app.toggle_inactive(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Home => app.state.select(Some(0)),
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Trabajadores {
        let content = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_trabajadores(f, content[0], app);
        render_detail_panel(f, content[1], app);
    } else {
        match app.current_page {
            Page::Trabajadores => render_trabajadores(f, chunks[1], app),
            Page::Maquinaria => render_maquinaria(f, chunks[1], app),
            Page::Bonos => render_bonos(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        format!(" {} ", app.empresa),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];

    for page in app.allowed_pages() {
        spans.push(Span::raw(" │ "));
        let style = if page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Rol: {}", app.role),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn table_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

/// Inactive rows are dimmed
fn row_style(active: bool) -> Style {
    if active {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
    }
}

fn render_trabajadores(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .visible_trabajadores()
        .into_iter()
        .map(|t| {
            let cargo = app
                .data
                .fichas
                .get(t.rut.as_str())
                .map(|ficha| ficha.cargo.clone())
                .unwrap_or_else(|| "-".to_string());

            Row::new(vec![
                Cell::from(t.rut.to_string()),
                Cell::from(truncate(&t.nombre_completo(), 32)),
                Cell::from(truncate(&cargo, 20)),
                Cell::from(t.fecha_ingreso.format("%d-%m-%Y").to_string()),
            ])
            .style(row_style(t.is_active()))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(34),
            Constraint::Length(22),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["RUT", "Nombre", "Cargo", "Ingreso"]))
    .block(table_block(format!(" Trabajadores ({}) ", app.row_count())))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn estado_color(estado: EstadoMaquinaria) -> Color {
    match estado {
        EstadoMaquinaria::Disponible => Color::Green,
        EstadoMaquinaria::EnArriendo => Color::Yellow,
        EstadoMaquinaria::Mantenimiento => Color::Magenta,
        EstadoMaquinaria::Vendida => Color::DarkGray,
    }
}

fn render_maquinaria(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .visible_maquinarias()
        .into_iter()
        .map(|m| {
            Row::new(vec![
                Cell::from(m.patente.to_string()),
                Cell::from(m.grupo.as_str()),
                Cell::from(truncate(&format!("{} {}", m.marca, m.modelo), 28)),
                Cell::from(m.anio.to_string()),
                Cell::from(m.estado.as_str())
                    .style(Style::default().fg(estado_color(m.estado))),
            ])
            .style(row_style(m.en_inventario))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(16),
            Constraint::Length(30),
            Constraint::Length(6),
            Constraint::Length(14),
        ],
    )
    .header(header_row(&["Patente", "Grupo", "Marca / modelo", "Año", "Estado"]))
    .block(table_block(format!(" Maquinaria ({}) ", app.row_count())))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_bonos(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .visible_bonos()
        .into_iter()
        .map(|b| {
            Row::new(vec![
                Cell::from(truncate(&b.nombre, 30)),
                Cell::from(pesos(b.monto)),
                Cell::from(b.tipo.as_str()),
                Cell::from(b.temporalidad.as_str()),
            ])
            .style(row_style(b.is_active()))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(32),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["Bono", "Monto", "Tipo", "Temporalidad"]))
    .block(table_block(format!(" Bonos ({}) ", app.row_count())))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::Cyan));

    let lines = match app.selected_trabajador() {
        None => vec![Line::from("Sin selección")],
        Some(t) => {
            let mut lines = vec![
                Line::from(Span::styled(
                    t.nombre_completo(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(vec![label("RUT:       "), Span::raw(t.rut.to_string())]),
                Line::from(vec![label("Correo:    "), Span::raw(t.correo.clone())]),
                Line::from(vec![label("Teléfono:  "), Span::raw(t.telefono.clone())]),
                Line::from(vec![
                    label("Nacimiento:"),
                    Span::raw(format!(" {}", t.fecha_nacimiento.format("%d-%m-%Y"))),
                ]),
            ];

            if !t.is_active() {
                lines.push(Line::from(Span::styled(
                    format!(
                        "Inactivo: {}",
                        t.estado.reason.as_deref().unwrap_or("sin motivo")
                    ),
                    Style::default().fg(Color::Red),
                )));
            }

            lines.push(Line::from(""));
            match app.data.fichas.get(t.rut.as_str()) {
                None => lines.push(Line::from("Sin ficha de empresa")),
                Some(ficha) => {
                    lines.push(Line::from(Span::styled(
                        "Ficha de empresa",
                        Style::default().fg(Color::Yellow),
                    )));
                    lines.push(Line::from(vec![label("Cargo:     "), Span::raw(ficha.cargo.clone())]));
                    lines.push(Line::from(vec![label("Área:      "), Span::raw(ficha.area.clone())]));
                    lines.push(Line::from(vec![
                        label("Contrato:  "),
                        Span::raw(ficha.tipo_contrato.as_str()),
                    ]));
                    lines.push(Line::from(vec![
                        label("Jornada:   "),
                        Span::raw(ficha.jornada.as_str()),
                    ]));
                    lines.push(Line::from(vec![
                        label("Sueldo:    "),
                        Span::raw(pesos(ficha.sueldo_base)),
                    ]));
                    lines.push(Line::from(vec![
                        label("Estado:    "),
                        Span::raw(ficha.estado_laboral.as_str()),
                    ]));
                }
            }
            lines
        }
    };

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Detalle "),
    );
    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let key = |s: &'static str| Span::styled(s, Style::default().fg(Color::Yellow));

    let mut spans = vec![
        Span::styled(
            format!(" Fila: {}/{} ", selected, app.row_count()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        key("i"),
        Span::raw(if app.include_inactive {
            " Ocultar inactivos | "
        } else {
            " Mostrar inactivos | "
        }),
    ];
    if app.current_page == Page::Trabajadores {
        spans.push(key("Enter"));
        spans.push(Span::raw(" Ficha | "));
    }
    spans.push(key("Tab"));
    spans.push(Span::raw(" Página | "));
    spans.push(key("↑/↓"));
    spans.push(Span::raw(" Navegar | "));
    spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    spans.push(Span::raw(" Salir"));

    let status = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(status, area);
}

/// 1234567 -> "$1.234.567"
fn pesos(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}${grouped}")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gestora::entities::{NuevoBono, NuevoTrabajador, Temporalidad, TipoBono};
    use gestora::forms::FormValidator;

    fn trabajador(rut: &str, activo: bool) -> Trabajador {
        let mut t = Trabajador::from_form(
            NuevoTrabajador {
                rut: rut.to_string(),
                nombres: "Camila".to_string(),
                apellido_paterno: "Fuentes".to_string(),
                apellido_materno: String::new(),
                fecha_nacimiento: "1992-09-18".to_string(),
                telefono: String::new(),
                correo: "camila@empresa.cl".to_string(),
                direccion: String::new(),
                fecha_ingreso: "2021-04-01".to_string(),
            },
            &FormValidator::new(),
        )
        .unwrap();
        if !activo {
            t.soft_delete("rrhh", None).unwrap();
        }
        t
    }

    fn data() -> Data {
        Data {
            trabajadores: vec![
                trabajador("12.345.678-5", true),
                trabajador("11.111.111-1", false),
            ],
            fichas: HashMap::new(),
            maquinarias: Vec::new(),
            bonos: vec![Bono::from_form(
                NuevoBono {
                    nombre: "Colación".to_string(),
                    monto: 50_000,
                    tipo: TipoBono::NoImponible,
                    temporalidad: Temporalidad::Permanente,
                    descripcion: String::new(),
                },
                &FormValidator::new(),
            )
            .unwrap()],
        }
    }

    #[test]
    fn test_pages_follow_role() {
        let app = App::new("Gestora".to_string(), Role::Gerencia, data()).unwrap();
        assert_eq!(app.allowed_pages(), vec![Page::Trabajadores, Page::Maquinaria]);

        let app = App::new("Gestora".to_string(), Role::RecursosHumanos, data()).unwrap();
        assert_eq!(app.allowed_pages(), vec![Page::Trabajadores, Page::Bonos]);
    }

    #[test]
    fn test_usuario_cannot_open_ui() {
        assert!(matches!(
            App::new("Gestora".to_string(), Role::Usuario, data()),
            Err(DomainError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_tab_skips_forbidden_pages() {
        let mut app = App::new("Gestora".to_string(), Role::RecursosHumanos, data()).unwrap();
        assert_eq!(app.current_page, Page::Trabajadores);
        app.next_page();
        assert_eq!(app.current_page, Page::Bonos);
        app.next_page();
        assert_eq!(app.current_page, Page::Trabajadores);
        app.previous_page();
        assert_eq!(app.current_page, Page::Bonos);
    }

    #[test]
    fn test_toggle_inactive() {
        let mut app = App::new("Gestora".to_string(), Role::Administrador, data()).unwrap();
        assert_eq!(app.row_count(), 1);

        app.toggle_inactive();
        assert_eq!(app.row_count(), 2);
        app.last();
        assert!(!app.selected_trabajador().unwrap().is_active());
    }

    #[test]
    fn test_selection_wraps() {
        let mut app = App::new("Gestora".to_string(), Role::Administrador, data()).unwrap();
        app.toggle_inactive();
        app.next();
        assert_eq!(app.state.selected(), Some(1));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.previous();
        assert_eq!(app.state.selected(), Some(1));
    }

    #[test]
    fn test_empty_page_has_no_selection() {
        let mut app = App::new("Gestora".to_string(), Role::Gerencia, data()).unwrap();
        app.next_page();
        assert_eq!(app.current_page, Page::Maquinaria);
        assert_eq!(app.state.selected(), None);
        app.next();
        assert_eq!(app.state.selected(), None);
    }

    #[test]
    fn test_formatting_helpers() {
        assert_eq!(pesos(1_234_567), "$1.234.567");
        assert_eq!(pesos(950), "$950");
        assert_eq!(pesos(-50_000), "-$50.000");
        assert_eq!(truncate("Retroexcavadora", 8), "Retro...");
        assert_eq!(truncate("Grúa", 8), "Grúa");
    }
}
