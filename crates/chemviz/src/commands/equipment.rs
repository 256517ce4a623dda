//! Equipment command handlers.

use std::io::IsTerminal;

use dialoguer::{Input, Select};
use serde::Serialize;
use strum::IntoEnumIterator;
use tabled::Tabled;

use chemviz_core::{Dashboard, EquipmentRecord, LoadOutcome, Page, SortDirection, SortField};

use crate::cli::{EquipmentArgs, EquipmentCommand, FilterArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct EquipmentRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Material")]
    material: String,
    #[tabled(rename = "Pressure")]
    pressure: String,
    #[tabled(rename = "Temperature")]
    temperature: String,
    #[tabled(rename = "Flowrate")]
    flowrate: String,
    #[tabled(rename = "Dataset")]
    dataset: String,
}

impl From<&EquipmentRecord> for EquipmentRow {
    fn from(r: &EquipmentRecord) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            kind: r.equipment_type.clone(),
            material: r.material.clone(),
            pressure: format!("{:.2}", r.pressure),
            temperature: format!("{:.2}", r.temperature),
            flowrate: format!("{:.2}", r.flowrate),
            dataset: r.dataset.map(|d| d.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct MaterialRow {
    #[tabled(rename = "Material")]
    material: String,
}

#[derive(Serialize)]
struct ChartView {
    labels: Vec<String>,
    pressures: Vec<f64>,
    temperatures: Vec<f64>,
}

// ── Rendering ───────────────────────────────────────────────────────

fn render_page(page: &Page, format: &OutputFormat) -> String {
    output::render_list(
        format,
        &page.items,
        |r| EquipmentRow::from(r),
        |r| r.name.clone(),
    )
}

/// "Showing 25 of 130 · more: next" footer for table output.
fn page_footer(page: &Page) -> String {
    let shown = page.items.len();
    let total = page
        .count
        .map_or_else(|| shown.to_string(), |c| c.to_string());
    let mut links = Vec::new();
    if page.has_previous() {
        links.push("previous");
    }
    if page.has_next() {
        links.push("next");
    }
    if links.is_empty() {
        format!("Showing {shown} of {total}")
    } else {
        format!("Showing {shown} of {total} · more: {}", links.join(", "))
    }
}

fn print_page(page: &Page, global: &GlobalOpts) {
    output::print_output(&render_page(page, &global.output), global.quiet);
    if matches!(global.output, OutputFormat::Table) && !global.quiet {
        let color = output::should_color(&global.color);
        eprintln!("{}", output::hint(&page_footer(page), color));
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: EquipmentArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        EquipmentCommand::List { filters, page } => list(dashboard, &filters, page, global).await,
        EquipmentCommand::Browse { filters } => browse(dashboard, &filters, global).await,

        EquipmentCommand::Materials { filters } => {
            dashboard.apply_query(filters.to_query()).await?;
            let materials: Vec<String> = dashboard.page().materials().into_iter().collect();
            let out = output::render_list(
                &global.output,
                &materials,
                |m| MaterialRow {
                    material: m.clone(),
                },
                String::clone,
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        EquipmentCommand::Chart { filters } => {
            dashboard.apply_query(filters.to_query()).await?;
            let series = dashboard.page().series();
            let view = ChartView {
                labels: series.labels,
                pressures: series.pressures,
                temperatures: series.temperatures,
            };
            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &view,
                |v| {
                    format!(
                        "{}\n\n{}",
                        output::render_bars("Pressure", &v.labels, &v.pressures, color),
                        output::render_bars("Temperature", &v.labels, &v.temperatures, color),
                    )
                },
                |v| v.labels.join("\n"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

async fn list(
    dashboard: &Dashboard,
    filters: &FilterArgs,
    page: u32,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    dashboard.apply_query(filters.to_query()).await?;
    for reached in 1..page {
        if dashboard.next_page().await? == LoadOutcome::NoCursor {
            return Err(CliError::Validation {
                field: "page".into(),
                reason: format!("only {reached} page(s) match these filters"),
            });
        }
    }
    print_page(&dashboard.page(), global);
    Ok(())
}

// ── Interactive browsing ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BrowseAction {
    Next,
    Previous,
    Sort,
    ClearSort,
    Search,
    Refresh,
    Quit,
}

impl BrowseAction {
    fn label(self) -> &'static str {
        match self {
            Self::Next => "Next page",
            Self::Previous => "Previous page",
            Self::Sort => "Sort by column…",
            Self::ClearSort => "Clear sort",
            Self::Search => "Search…",
            Self::Refresh => "Refresh",
            Self::Quit => "Quit",
        }
    }
}

fn available_actions(page: &Page, sorted: bool) -> Vec<BrowseAction> {
    let mut actions = Vec::with_capacity(7);
    if page.has_next() {
        actions.push(BrowseAction::Next);
    }
    if page.has_previous() {
        actions.push(BrowseAction::Previous);
    }
    actions.push(BrowseAction::Sort);
    if sorted {
        actions.push(BrowseAction::ClearSort);
    }
    actions.extend([
        BrowseAction::Search,
        BrowseAction::Refresh,
        BrowseAction::Quit,
    ]);
    actions
}

fn sort_label(field: SortField, current: Option<(SortField, SortDirection)>) -> String {
    match current {
        Some((f, SortDirection::Ascending)) if f == field => format!("{field} ▲"),
        Some((f, SortDirection::Descending)) if f == field => format!("{field} ▼"),
        _ => field.to_string(),
    }
}

async fn browse(
    dashboard: &Dashboard,
    filters: &FilterArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "browse".into(),
            reason: "interactive browsing needs a terminal; use `equipment list --page N`".into(),
        });
    }

    dashboard.apply_query(filters.to_query()).await?;

    loop {
        let page = dashboard.page();
        print_page(&page, global);

        let actions = available_actions(&page, dashboard.query().sort.is_some());
        let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
        let choice = Select::new()
            .with_prompt("Action")
            .items(&labels)
            .default(0)
            .interact()
            .map_err(util::prompt_err)?;
        let Some(action) = actions.get(choice).copied() else {
            continue;
        };

        match action {
            BrowseAction::Next => {
                dashboard.next_page().await?;
            }
            BrowseAction::Previous => {
                dashboard.previous_page().await?;
            }
            BrowseAction::Sort => {
                let mut query = dashboard.query();
                let current = query.sort.map(|s| (s.field, s.direction));
                let fields: Vec<SortField> = SortField::iter().collect();
                let names: Vec<String> = fields.iter().map(|f| sort_label(*f, current)).collect();
                let picked = Select::new()
                    .with_prompt("Sort by (again to reverse)")
                    .items(&names)
                    .default(0)
                    .interact()
                    .map_err(util::prompt_err)?;
                if let Some(field) = fields.get(picked) {
                    query.toggle_sort(*field);
                    dashboard.apply_query(query).await?;
                }
            }
            BrowseAction::ClearSort => {
                let mut query = dashboard.query();
                query.clear_sort();
                dashboard.apply_query(query).await?;
            }
            BrowseAction::Search => {
                let mut query = dashboard.query();
                let search: String = Input::new()
                    .with_prompt("Search")
                    .with_initial_text(query.search.clone())
                    .allow_empty(true)
                    .interact_text()
                    .map_err(util::prompt_err)?;
                query.search = search;
                dashboard.apply_query(query).await?;
            }
            BrowseAction::Refresh => {
                dashboard.refresh_list().await?;
            }
            BrowseAction::Quit => return Ok(()),
        }
    }
}
