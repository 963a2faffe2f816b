// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Dessine la watchlist : symbole, nom, prix, variation et nombre de signaux
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Layout : découpage de l'espace en zones (header, contenu, footer)
// 3. Style : couleurs et attributs de texte
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::{App, Screen};
use crate::models::LoadState;
use crate::ui::chart_view;

/// Dessine l'interface complète
///
/// CONCEPT RUST : Routing avec match sur enum
/// - Le compilateur garantit l'exhaustivité (tous les écrans gérés)
pub fn render(frame: &mut Frame, app: &App) {
    match app.current_screen {
        Screen::Dashboard => render_dashboard(frame, app),
        Screen::ChartView => chart_view::render_chart_screen(frame, app, frame.size()),
    }
}

fn render_dashboard(frame: &mut Frame, app: &App) {
    let chunks = create_layout(frame.size());

    render_header(frame, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_footer(frame, app, chunks[2]);
}

/// Crée le layout principal (header, content, footer)
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Watchlist
            Constraint::Length(3), // Footer
        ])
        .split(area)
        .to_vec()
}

fn render_header(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" LazySignals ")
        .title_alignment(Alignment::Center);

    let text = vec![Line::from(Span::styled(
        "Signaux et comparaisons sur graphique journalier",
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    ))];

    let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

/// Dessine la watchlist
///
/// CONCEPT RATATUI : List widget
/// - ListItem : chaque ligne de la liste
/// - L'item sélectionné est inversé (REVERSED)
fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Watchlist ");

    if app.watchlist.is_empty() {
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Watchlist vide : ajoutez des entrées [[watchlist]] dans lazysignals.toml",
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .watchlist
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let style = match item.state {
                LoadState::Loaded(_) if item.is_positive() => Style::default().fg(Color::Green),
                LoadState::Loaded(_) => Style::default().fg(Color::Red),
                LoadState::Failed(_) => Style::default().fg(Color::DarkGray),
                LoadState::Loading => Style::default().fg(Color::Gray),
            };

            let line = format!(" {}", item.display());
            if index == app.selected_index {
                ListItem::new(line).style(style.add_modifier(Modifier::BOLD).add_modifier(Modifier::REVERSED))
            } else {
                ListItem::new(line).style(style)
            }
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

/// Dessine le footer avec les raccourcis clavier
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let key = |label: &'static str| {
        Span::styled(label, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    };

    let shortcuts = if app.is_awaiting_quit_confirmation() {
        quit_confirmation_line()
    } else {
        Line::from(vec![
            key("[q]"),
            Span::raw(" Quit  "),
            key("[↑↓ / j k]"),
            Span::raw(" Navigate  "),
            key("[Enter]"),
            Span::raw(" Chart"),
        ])
    };

    let paragraph = Paragraph::new(vec![shortcuts])
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

/// Message de confirmation de quit (partagé avec l'écran graphique)
pub(crate) fn quit_confirmation_line() -> Line<'static> {
    Line::from(vec![
        Span::styled(
            "⚠  Appuyez sur ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "[q]",
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::SLOW_BLINK),
        ),
        Span::styled(
            " à nouveau pour quitter, ou n'importe quelle autre touche pour annuler ⚠",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
    ])
}
