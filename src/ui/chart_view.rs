// ============================================================================
// Écran graphique - chandeliers, axes et overlay en mode texte
// ============================================================================
// Le contenu de la zone graphique est d'abord peint dans une grille de
// cellules (ChartCanvas), dans cet ordre :
//   1. axes (prix à gauche, dates en bas)
//   2. chandeliers, colonne par colonne
//   3. nœuds de l'overlay, par z croissant (sélection, lignes, marqueurs,
//      bulles, popovers)
// puis converti en lignes de Spans pour un Paragraph ratatui.
//
// ALGORITHME DES CHANDELIERS :
// - Rendu vertical : ligne par ligne de haut en bas
// - Logique des 3 zones : mèche supérieure, corps, mèche inférieure
// - Seuils fractionnaires (0.25, 0.75) pour précision sub-caractère
//
// CARACTÈRES UNICODE :
// ┃ Corps plein          │ Mèche pleine
// ╻ Demi-corps (bas)     ╹ Demi-corps (haut)
// ╽ Transition top       ╿ Transition bottom
// ╷ Demi-mèche sup       ╵ Demi-mèche inf
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::chart::overlay::PopoverContent;
use crate::chart::terminal::Y_AXIS_WIDTH;
use crate::chart::{
    Bounds, ChartSurface, CoordinateSpace, HostState, NodeKind, OverlayLayer, Selection, TerminalSurface,
};
use crate::models::{Bias, Candle, LoadState, SignalCategory};
use crate::ui::dashboard::quit_confirmation_line;

// ============================================================================
// Constantes
// ============================================================================

const UNICODE_VOID: char = ' ';
const UNICODE_BODY: char = '┃';
const UNICODE_HALF_BODY_BOTTOM: char = '╻';
const UNICODE_HALF_BODY_TOP: char = '╹';
const UNICODE_WICK: char = '│';
const UNICODE_TOP: char = '╽';
const UNICODE_BOTTOM: char = '╿';
const UNICODE_UPPER_WICK: char = '╷';
const UNICODE_LOWER_WICK: char = '╵';

/// Ligne entre le marqueur et la clôture de référence
const UNICODE_CONNECTOR: char = '┊';

const BULLISH_COLOR: Color = Color::Rgb(52, 208, 88);
const BEARISH_COLOR: Color = Color::Rgb(234, 74, 90);
const NEUTRAL_COLOR: Color = Color::Gray;

/// Fond du rectangle de sélection
const SELECTION_BG: Color = Color::Rgb(35, 55, 85);

/// Un label de prix toutes les 4 lignes
const PRICE_LABEL_EVERY: usize = 4;

/// Largeur d'un label de date ("DD/MM") plus 2 espaces
const DATE_LABEL_SPACE: f64 = 7.0;

/// Message unique pour données ou surface indisponibles (pas de nouvel essai)
pub const CHART_UNAVAILABLE: &str = "Données du graphique indisponibles";

// ============================================================================
// Couleurs et glyphes des signaux
// ============================================================================

/// Couleur associée à une catégorie de signal
///
/// Une catégorie non reconnue prend la couleur neutre.
pub fn category_color(category: SignalCategory) -> Color {
    match category {
        SignalCategory::StrongBuy => Color::Rgb(0, 200, 83),
        SignalCategory::Buy => BULLISH_COLOR,
        SignalCategory::Positive => Color::Rgb(140, 215, 150),
        SignalCategory::Hold => Color::Rgb(240, 190, 60),
        SignalCategory::Neutral => NEUTRAL_COLOR,
        SignalCategory::Concern => Color::Rgb(245, 150, 60),
        SignalCategory::Sell => BEARISH_COLOR,
        SignalCategory::StrongSell => Color::Rgb(200, 30, 45),
        SignalCategory::Unrecognized => NEUTRAL_COLOR,
    }
}

fn marker_glyph(category: SignalCategory) -> char {
    match category.bias() {
        Bias::Bullish => '▲',
        Bias::Bearish => '▼',
        Bias::Neutral => '●',
    }
}

// ============================================================================
// Grille de cellules
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct CanvasCell {
    ch: char,
    style: Style,
}

/// Grille de caractères stylés de la taille de la zone graphique
///
/// CONCEPT : Clipping
/// - Toute écriture hors de la grille est ignorée silencieusement
/// - Les nœuds de l'overlay peuvent donc déborder de la zone
pub struct ChartCanvas {
    width: usize,
    height: usize,
    cells: Vec<CanvasCell>,
}

impl ChartCanvas {
    pub fn new(width: u16, height: u16) -> Self {
        let (width, height) = (width as usize, height as usize);
        Self {
            width,
            height,
            cells: vec![
                CanvasCell {
                    ch: UNICODE_VOID,
                    style: Style::default(),
                };
                width * height
            ],
        }
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    fn put(&mut self, x: i64, y: i64, ch: char, style: Style) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = CanvasCell { ch, style };
        }
    }

    fn put_str(&mut self, x: i64, y: i64, text: &str, style: Style) {
        for (offset, ch) in text.chars().enumerate() {
            self.put(x + offset as i64, y, ch, style);
        }
    }

    /// Applique un style sur une zone sans toucher aux caractères
    fn tint(&mut self, bounds: Bounds, style: Style) {
        for (x, y) in cells_of(bounds) {
            if let Some(i) = self.index(x, y) {
                self.cells[i].style = self.cells[i].style.patch(style);
            }
        }
    }

    /// Boîte à bordure arrondie, fond effacé, lignes de texte à l'intérieur
    fn boxed(&mut self, bounds: Bounds, lines: &[String], border: Style, text: Style, padding: i64) {
        let (x0, y0) = (bounds.x as i64, bounds.y as i64);
        let (w, h) = (bounds.width as i64, bounds.height as i64);
        if w < 2 || h < 2 {
            return;
        }

        for (x, y) in cells_of(bounds) {
            self.put(x, y, UNICODE_VOID, Style::default());
        }
        for x in x0 + 1..x0 + w - 1 {
            self.put(x, y0, '─', border);
            self.put(x, y0 + h - 1, '─', border);
        }
        for y in y0 + 1..y0 + h - 1 {
            self.put(x0, y, '│', border);
            self.put(x0 + w - 1, y, '│', border);
        }
        self.put(x0, y0, '╭', border);
        self.put(x0 + w - 1, y0, '╮', border);
        self.put(x0, y0 + h - 1, '╰', border);
        self.put(x0 + w - 1, y0 + h - 1, '╯', border);

        let inner = (w - 2 - 2 * padding).max(0) as usize;
        for (row, line) in lines.iter().take((h - 2) as usize).enumerate() {
            let clipped: String = line.chars().take(inner).collect();
            self.put_str(x0 + 1 + padding, y0 + 1 + row as i64, &clipped, text);
        }
    }

    pub fn char_at(&self, x: u16, y: u16) -> Option<char> {
        self.index(i64::from(x), i64::from(y)).map(|i| self.cells[i].ch)
    }

    /// Texte d'une ligne (pour les tests et le debug)
    pub fn row_text(&self, y: u16) -> String {
        (0..self.width as u16).filter_map(|x| self.char_at(x, y)).collect()
    }

    /// Convertit la grille en lignes ratatui
    ///
    /// CONCEPT : Run-length des styles
    /// - Les cellules consécutives de même style forment un seul Span
    pub fn into_lines(self) -> Vec<Line<'static>> {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| {
                let mut spans = Vec::new();
                let mut current = String::new();
                let mut style = row.first().map(|c| c.style).unwrap_or_default();

                for cell in row {
                    if cell.style != style && !current.is_empty() {
                        spans.push(Span::styled(std::mem::take(&mut current), style));
                    }
                    style = cell.style;
                    current.push(cell.ch);
                }
                if !current.is_empty() {
                    spans.push(Span::styled(current, style));
                }
                Line::from(spans)
            })
            .collect()
    }
}

/// Cellules entières couvertes par une zone
fn cells_of(bounds: Bounds) -> impl Iterator<Item = (i64, i64)> {
    let (x0, y0) = (bounds.x.floor() as i64, bounds.y.floor() as i64);
    let (x1, y1) = (bounds.right().ceil() as i64, bounds.bottom().ceil() as i64);
    (y0..y1).flat_map(move |y| (x0..x1).map(move |x| (x, y)))
}

// ============================================================================
// Chandeliers
// ============================================================================

fn candle_color(candle: &Candle) -> Color {
    if candle.is_bullish() {
        BULLISH_COLOR
    } else {
        BEARISH_COLOR
    }
}

/// Rend un chandelier à une hauteur donnée
///
/// `to_height` convertit un prix en hauteur (0 en bas de la zone de tracé).
/// `height_unit` va de 1 (ligne du bas) à la hauteur de la zone.
fn render_candle(candle: &Candle, height_unit: f64, to_height: impl Fn(f64) -> f64) -> char {
    let high_y = to_height(candle.high);
    let low_y = to_height(candle.low);
    let max_y = to_height(candle.open.max(candle.close));
    let min_y = to_height(candle.close.min(candle.open));

    let mut output = UNICODE_VOID;

    // Zone 1 : mèche supérieure (high → max)
    if high_y.ceil() >= height_unit && height_unit >= max_y.floor() {
        if max_y - height_unit > 0.75 {
            output = UNICODE_BODY;
        } else if (max_y - height_unit) > 0.25 {
            if (high_y - height_unit) > 0.75 {
                output = UNICODE_TOP;
            } else {
                output = UNICODE_HALF_BODY_BOTTOM;
            }
        } else if (high_y - height_unit) > 0.75 {
            output = UNICODE_WICK;
        } else if (high_y - height_unit) > 0.25 {
            output = UNICODE_UPPER_WICK;
        }
    }
    // Zone 2 : corps (min → max)
    else if max_y.floor() >= height_unit && height_unit >= min_y.ceil() {
        output = UNICODE_BODY;
    }
    // Zone 3 : mèche inférieure (min → low)
    else if min_y.ceil() >= height_unit && height_unit >= low_y.floor() {
        if (min_y - height_unit) < 0.25 {
            output = UNICODE_BODY;
        } else if (min_y - height_unit) < 0.75 {
            if (low_y - height_unit) < 0.25 {
                output = UNICODE_BOTTOM;
            } else {
                output = UNICODE_HALF_BODY_TOP;
            }
        } else if low_y - height_unit < 0.25 {
            output = UNICODE_WICK;
        } else if low_y - height_unit < 0.75 {
            output = UNICODE_LOWER_WICK;
        }
    }

    output
}

fn draw_candles(canvas: &mut ChartCanvas, surface: &TerminalSurface) {
    let plot = surface.plot_bounds();
    let height = plot.height;
    let to_height = |price: f64| {
        surface
            .price_to_coordinate(price)
            .map(|y| height - (y - plot.y))
            .unwrap_or(f64::NAN)
    };

    for (index, candle) in surface.visible_candles() {
        let Some(x) = surface.index_to_coordinate(index as f64) else {
            continue;
        };
        if x < plot.x || x >= plot.right() {
            continue;
        }
        let column = x.floor() as i64;
        let style = Style::default().fg(candle_color(candle));

        for row in 0..height as i64 {
            let ch = render_candle(candle, height - row as f64, to_height);
            if ch != UNICODE_VOID {
                canvas.put(column, plot.y as i64 + row, ch, style);
            }
        }
    }
}

// ============================================================================
// Axes
// ============================================================================

fn format_price_label(price: f64) -> String {
    if price.abs() >= 100_000.0 {
        format!("{:>8.0}", price)
    } else {
        format!("{:>8.2}", price)
    }
}

/// Axe des prix : labels toutes les 4 lignes, trait vertical
fn draw_price_axis(canvas: &mut ChartCanvas, surface: &TerminalSurface) {
    let plot = surface.plot_bounds();
    let axis = Style::default().fg(Color::Gray);
    let separator = Y_AXIS_WIDTH as i64 - 1;

    for row in 0..plot.height as usize {
        let y = plot.y as i64 + row as i64;
        canvas.put(separator, y, '│', axis);

        if row % PRICE_LABEL_EVERY == 0 {
            if let Some(price) = surface.coordinate_to_price(y as f64 + 0.5) {
                canvas.put_str(0, y, &format_price_label(price), axis);
            }
        }
    }
}

/// Axe des dates : "DD/MM" sous les chandelles, sans chevauchement
fn draw_time_axis(canvas: &mut ChartCanvas, surface: &TerminalSurface) {
    let plot = surface.plot_bounds();
    let axis = Style::default().fg(Color::Gray);
    let row = plot.bottom() as i64;

    for x in plot.x as i64..plot.right() as i64 {
        canvas.put(x, row, '─', axis);
    }

    let spacing = surface.bar_spacing().unwrap_or(1.0);
    let every = (DATE_LABEL_SPACE / spacing).ceil().max(1.0) as usize;
    let mut next_free = plot.x as i64;

    for (index, candle) in surface.visible_candles() {
        if index % every != 0 {
            continue;
        }
        let Some(x) = surface.index_to_coordinate(index as f64) else {
            continue;
        };
        let label = candle.time.format("%d/%m").to_string();
        let start = x.floor() as i64 - 2;
        if start < next_free || start + 5 > plot.right() as i64 {
            continue;
        }
        canvas.put_str(start, row, &label, axis);
        next_free = start + DATE_LABEL_SPACE as i64;
    }
}

// ============================================================================
// Overlay
// ============================================================================

fn popover_lines(content: &PopoverContent, inner: usize) -> Vec<String> {
    let badge = if content.attribution.is_empty() {
        content.category.label().to_string()
    } else {
        format!("{} · {}", content.attribution, content.category.label())
    };

    let mut lines = vec![badge];
    for paragraph in content.text.lines() {
        let chars: Vec<char> = paragraph.chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }
        lines.extend(chars.chunks(inner.max(1)).map(|chunk| chunk.iter().collect::<String>()));
    }
    if let Some(link) = &content.link {
        lines.push(link.clone());
    }
    lines
}

/// Peint les nœuds visibles de l'overlay, du plus bas au plus haut
fn draw_overlay(canvas: &mut ChartCanvas, overlay: &OverlayLayer) {
    for (_, node) in overlay.painted() {
        if !node.visible {
            continue;
        }
        let bounds = node.bounds;

        match &node.kind {
            NodeKind::SelectionRect => {
                canvas.tint(bounds, Style::default().bg(SELECTION_BG));
            }
            NodeKind::Connector { lit } => {
                let color = if *lit { Color::Yellow } else { Color::DarkGray };
                for (x, y) in cells_of(bounds) {
                    canvas.put(x, y, UNICODE_CONNECTOR, Style::default().fg(color));
                }
            }
            NodeKind::Marker { category, enlarged } => {
                let mut style = Style::default().fg(category_color(*category));
                if *enlarged {
                    style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
                }
                canvas.put(bounds.x as i64, bounds.y as i64, marker_glyph(*category), style);
            }
            NodeKind::PreviewBubble { lines } => {
                let border = Style::default().fg(Color::Cyan);
                canvas.boxed(bounds, lines, border, Style::default().fg(Color::White), 1);
            }
            NodeKind::DetailPopover(content) => {
                let border = Style::default().fg(category_color(content.category));
                let inner = (bounds.width as usize).saturating_sub(2);
                let lines = popover_lines(content, inner);
                canvas.boxed(bounds, &lines, border, Style::default().fg(Color::White), 0);
            }
            NodeKind::ComparisonResult { lines, gain } => {
                let color = if *gain { BULLISH_COLOR } else { BEARISH_COLOR };
                let text = Style::default().fg(color).add_modifier(Modifier::BOLD);
                canvas.boxed(bounds, lines, Style::default().fg(color), text, 1);
            }
        }
    }
}

/// Peint la zone graphique complète d'une instance montée
pub fn build_canvas(app: &App, width: u16, height: u16) -> Option<ChartCanvas> {
    let instance = app.host().instance()?;
    let surface = instance.surface();

    let mut canvas = ChartCanvas::new(width, height);
    draw_price_axis(&mut canvas, surface);
    draw_time_axis(&mut canvas, surface);
    draw_candles(&mut canvas, surface);
    if let Some(overlay) = app.container().overlay() {
        draw_overlay(&mut canvas, overlay);
    }
    Some(canvas)
}

// ============================================================================
// Écran
// ============================================================================

fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Graphique
            Constraint::Length(3), // Footer
        ])
        .split(area)
        .to_vec()
}

/// Zone occupée par le conteneur du graphique (intérieur du cadre)
///
/// La boucle principale s'en sert pour dimensionner le conteneur et pour
/// traduire les positions de la souris.
pub fn container_area(area: Rect) -> Rect {
    let chunks = create_layout(area);
    Block::default().borders(Borders::ALL).inner(chunks[1])
}

/// Dessine l'écran graphique de l'actif ouvert
pub fn render_chart_screen(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = create_layout(area);

    render_header(frame, app, chunks[0]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(chunks[1]);
    frame.render_widget(block, chunks[1]);

    match app.host().state() {
        HostState::Ready(_) => {
            if let Some(canvas) = build_canvas(app, inner.width, inner.height) {
                frame.render_widget(Paragraph::new(canvas.into_lines()), inner);
            }
        }
        state => render_message(frame, app, state, inner),
    }

    render_footer(frame, app, chunks[2]);
}

/// Message affiché à la place du graphique
fn state_message(app: &App, state: &HostState) -> (String, Color) {
    match state {
        HostState::Unsupported(symbol) => (format!("Graphique non disponible pour {}", symbol), Color::Gray),
        HostState::Loading(_) => ("Chargement du graphique...".to_string(), Color::Yellow),
        HostState::Failed { .. } => (CHART_UNAVAILABLE.to_string(), Color::Red),
        HostState::Empty | HostState::Ready(_) => match app.chart_item().map(|item| &item.state) {
            Some(LoadState::Loading) => ("Chargement des données...".to_string(), Color::Yellow),
            _ => (String::new(), Color::Gray),
        },
    }
}

fn render_message(frame: &mut Frame, app: &App, state: &HostState, area: Rect) {
    let (message, color) = state_message(app, state);
    let top = area.height / 2;
    let mut text = vec![Line::from(""); top as usize];
    text.push(Line::from(Span::styled(
        message,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )));

    let paragraph = Paragraph::new(text).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let (title, info) = match app.chart_item() {
        Some(item) => {
            let price = item
                .current_price()
                .map(|p| format!("${:.2}", p))
                .unwrap_or_default();
            let change = item
                .change_percent()
                .map(|c| format!("{:+.2}%", c))
                .unwrap_or_default();
            (format!(" {} ", item.symbol), format!("{}  {}  {}", item.name, price, change))
        }
        None => (" Graphique ".to_string(), String::new()),
    };

    let comparison = app
        .host()
        .instance()
        .and_then(|instance| match instance.comparison().state() {
            Selection::Resolved { comparison, .. } => Some(format!(
                "   Δ {}  {}",
                comparison.format_delta(),
                comparison.format_pct()
            )),
            _ => None,
        })
        .unwrap_or_default();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title)
        .title_alignment(Alignment::Center);

    let line = Line::from(vec![
        Span::styled(info, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::styled(comparison, Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(line).block(block).alignment(Alignment::Center), area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let key = |label: &'static str| {
        Span::styled(label, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    };

    let line = if app.is_awaiting_quit_confirmation() {
        quit_confirmation_line()
    } else {
        Line::from(vec![
            key("[Esc]"),
            Span::raw(" Retour  "),
            key("[← →]"),
            Span::raw(" Défiler  "),
            key("[+ -]"),
            Span::raw(" Zoom  "),
            key("[f]"),
            Span::raw(" Ajuster  "),
            key("[glisser]"),
            Span::raw(" Comparer  "),
            key("[clic]"),
            Span::raw(" Détail"),
        ])
    };

    frame.render_widget(Paragraph::new(line).block(block).alignment(Alignment::Center), area);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SignalBook;
    use crate::config::{AppConfig, WatchlistEntry};
    use crate::models::{CandleSeries, Signal, SignalId};
    use chrono::NaiveDate;
    use ratatui::{backend::TestBackend, Terminal};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn app() -> App {
        let mut config = AppConfig::default();
        config.watchlist = vec![WatchlistEntry {
            symbol: "AAPL".to_string(),
            name: "Apple Inc.".to_string(),
            chart: true,
        }];
        let mut book = SignalBook::new();
        book.insert(
            "AAPL".to_string(),
            vec![
                Signal::new("buy", Some(day(2)), SignalCategory::Buy).with_text("Desk", "Cassure"),
                Signal::new("odd", Some(day(3)), SignalCategory::Unrecognized),
            ],
        );
        let mut app = App::new(&config, book);
        app.resize_chart_area(60, 20);
        app
    }

    fn series() -> CandleSeries {
        CandleSeries::new(vec![
            Candle::new(day(2), 100.0, 104.0, 98.0, 103.0),
            Candle::new(day(3), 103.0, 105.0, 96.0, 97.0),
        ])
        .unwrap()
    }

    async fn ready_app() -> App {
        let mut app = app();
        app.on_candles_loaded("AAPL", series());
        let loaded = app.open_chart().unwrap().run().await;
        app.attach_surface(loaded).unwrap();
        app
    }

    fn marker_cell(app: &App, id: &str) -> (u16, u16) {
        let point = app
            .host()
            .instance()
            .and_then(|instance| instance.markers().view(&SignalId::new(id)))
            .and_then(|view| view.position)
            .unwrap();
        (point.x.floor() as u16, point.y.floor() as u16)
    }

    fn screen_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(62, 28)).unwrap();
        terminal
            .draw(|frame| render_chart_screen(frame, app, frame.size()))
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_render_candle_zones() {
        let candle = Candle::new(day(2), 10.0, 20.0, 5.0, 18.0);
        let identity = |price: f64| price;

        assert_eq!(render_candle(&candle, 19.0, identity), UNICODE_WICK);
        assert_eq!(render_candle(&candle, 14.0, identity), UNICODE_BODY);
        assert_eq!(render_candle(&candle, 7.0, identity), UNICODE_WICK);
        assert_eq!(render_candle(&candle, 2.0, identity), UNICODE_VOID);
    }

    #[test]
    fn test_category_colors() {
        assert_eq!(category_color(SignalCategory::Buy), BULLISH_COLOR);
        assert_eq!(category_color(SignalCategory::Sell), BEARISH_COLOR);
        assert_eq!(category_color(SignalCategory::Unrecognized), NEUTRAL_COLOR);
        assert_eq!(marker_glyph(SignalCategory::Unrecognized), '●');
    }

    #[test]
    fn test_canvas_clips_and_boxes() {
        let mut canvas = ChartCanvas::new(10, 5);
        canvas.put(-1, 0, 'x', Style::default());
        canvas.put(10, 0, 'x', Style::default());
        canvas.boxed(
            Bounds::new(6.0, 1.0, 8.0, 3.0),
            &["abc".to_string()],
            Style::default(),
            Style::default(),
            1,
        );

        assert_eq!(canvas.row_text(0), " ".repeat(10));
        assert_eq!(canvas.char_at(6, 1), Some('╭'));
        assert_eq!(canvas.char_at(8, 2), Some('a'));
        assert_eq!(canvas.into_lines().len(), 5);
    }

    #[test]
    fn test_popover_lines_wrap_text() {
        let content = PopoverContent {
            attribution: "Desk".to_string(),
            category: SignalCategory::Hold,
            text: "abcdefghij".to_string(),
            link: Some("https://example.com".to_string()),
        };
        let lines = popover_lines(&content, 4);
        assert_eq!(lines, vec!["Desk · Conserver", "abcd", "efgh", "ij", "https://example.com"]);
    }

    #[tokio::test]
    async fn test_markers_drawn_on_canvas() {
        let app = ready_app().await;
        let canvas = build_canvas(&app, 60, 20).unwrap();

        let (x, y) = marker_cell(&app, "buy");
        assert_eq!(canvas.char_at(x, y), Some('▲'));
        let (x, y) = marker_cell(&app, "odd");
        assert_eq!(canvas.char_at(x, y), Some('●'));

        // Axe des prix
        assert_eq!(canvas.char_at(Y_AXIS_WIDTH as u16 - 1, 0), Some('│'));
        assert!(canvas.row_text(19).contains("02/01"));
    }

    #[tokio::test]
    async fn test_comparison_result_drawn() {
        let mut app = ready_app().await;
        // Barres centrées en x = 22.5 (02/01) et 47.5 (03/01)
        app.pointer(crate::chart::PointerKind::Down, 22, 15);
        app.pointer(crate::chart::PointerKind::Move, 47, 15);
        app.pointer(crate::chart::PointerKind::Up, 47, 15);

        let text = screen_text(&app);
        assert!(text.contains("-6.00"));
        assert!(text.contains("-5.8%"));
    }

    #[test]
    fn test_failure_message_is_static() {
        let mut app = app();
        app.open_chart();
        app.on_load_failed("AAPL", "HTTP 500".to_string());
        assert!(screen_text(&app).contains(CHART_UNAVAILABLE));
    }

    #[test]
    fn test_container_area_is_inside_frame() {
        let area = container_area(Rect::new(0, 0, 80, 30));
        assert_eq!(area, Rect::new(1, 4, 78, 22));
    }
}
