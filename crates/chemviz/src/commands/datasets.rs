//! Dataset command handlers.

use tabled::Tabled;

use chemviz_core::{Dashboard, DatasetSummary};

use crate::cli::{DatasetsArgs, DatasetsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct DatasetRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Uploaded")]
    uploaded: String,
    #[tabled(rename = "Records")]
    records: u64,
    #[tabled(rename = "Avg Flowrate")]
    avg_flowrate: String,
    #[tabled(rename = "Avg Pressure")]
    avg_pressure: String,
    #[tabled(rename = "Avg Temperature")]
    avg_temperature: String,
}

impl From<&DatasetSummary> for DatasetRow {
    fn from(d: &DatasetSummary) -> Self {
        Self {
            id: d.id,
            name: d.name.clone(),
            uploaded: d.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
            records: d.equipment_count,
            avg_flowrate: format!("{:.2}", d.avg_flowrate),
            avg_pressure: format!("{:.2}", d.avg_pressure),
            avg_temperature: format!("{:.2}", d.avg_temperature),
        }
    }
}

fn detail(d: &DatasetSummary) -> String {
    let mut lines = vec![
        format!("ID:               {}", d.id),
        format!("Name:             {}", d.name),
        format!("Uploaded:         {}", d.uploaded_at.to_rfc3339()),
        format!("Records:          {}", d.equipment_count),
        format!("Avg flowrate:     {:.2}", d.avg_flowrate),
        format!("Avg pressure:     {:.2}", d.avg_pressure),
        format!("Avg temperature:  {:.2}", d.avg_temperature),
    ];
    if !d.type_distribution.is_empty() {
        lines.push("Types:".into());
        lines.extend(
            d.type_distribution
                .iter()
                .map(|(kind, count)| format!("  {kind:<16}{count}")),
        );
    }
    lines.join("\n")
}

pub async fn handle(
    dashboard: &Dashboard,
    args: DatasetsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DatasetsCommand::List => {
            let datasets = dashboard.refresh_datasets().await?;
            let out = output::render_list(
                &global.output,
                datasets.as_slice(),
                |d| DatasetRow::from(d),
                |d| d.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DatasetsCommand::Summary { id } => {
            let summary = dashboard.dataset_summary(id).await?;
            let out = output::render_single(&global.output, &summary, detail, |d| d.name.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DatasetsCommand::Report { id, dest } => {
            let bar = util::spinner(&format!("Generating report for dataset {id}…"), global);
            let saved = dashboard.download_report_to(id, &dest).await;
            bar.finish_and_clear();
            let path = saved?;

            let color = output::should_color(&global.color);
            output::print_output(
                &output::success(&format!("Report saved to {}", path.display()), color),
                global.quiet,
            );
            Ok(())
        }
    }
}
