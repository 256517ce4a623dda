//! Upload and export handlers.

use bytesize::ByteSize;
use serde::Serialize;

use chemviz_core::{Dashboard, OperationKind, OperationState, UploadResponse};

use crate::cli::{ExportArgs, GlobalOpts, UploadArgs};
use crate::error::CliError;
use crate::output;

use super::util;

fn upload_detail(resp: &UploadResponse, notice: &str) -> String {
    match resp.dataset {
        Some(ref ds) => format!("{notice}\nDataset:  {} (id {})", ds.name, ds.id),
        None => notice.to_owned(),
    }
}

pub async fn upload(
    dashboard: &Dashboard,
    args: UploadArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let bar = util::spinner("Uploading…", global);
    let uploaded = dashboard.upload_csv(args.file.as_deref()).await;
    bar.finish_and_clear();
    let resp = uploaded?;

    let notice = match dashboard.operation_state(OperationKind::Upload) {
        OperationState::Succeeded(message) => message,
        _ => format!("Uploaded — {} rows", resp.created),
    };
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &resp,
        |r| output::success(&upload_detail(r, &notice), color),
        |r| r.created.to_string(),
    );
    output::print_output(&out, global.quiet);

    if let OperationState::Failed(failure) = dashboard.operation_state(OperationKind::Listing) {
        tracing::warn!(reason = %failure.reason, "equipment list did not refresh after upload");
    }
    Ok(())
}

#[derive(Serialize)]
struct SavedFile {
    path: String,
    bytes: u64,
}

pub async fn export(
    dashboard: &Dashboard,
    args: ExportArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let query = args.filters.to_query();

    let bar = util::spinner("Exporting…", global);
    let download = dashboard.export_csv(&query).await;
    bar.finish_and_clear();
    let download = download?;

    let path = chemviz_core::save_download(&download, &args.dest).await?;
    let saved = SavedFile {
        path: path.display().to_string(),
        bytes: u64::try_from(download.len()).unwrap_or(u64::MAX),
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &saved,
        |s| {
            output::success(
                &format!("Exported {} to {}", ByteSize::b(s.bytes), s.path),
                color,
            )
        },
        |s| s.path.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
