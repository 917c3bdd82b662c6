mod bootstrap;
mod views;

use anyhow::Result;
use osr_core::settings::Settings;
use osr_core::OsrError;
use osr_data::analysis::{analyze, load_dataset};

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("OSR dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Data dir: {}, Years: {:?}, View: {}",
        settings.data_dir.display(),
        settings.years,
        settings.view
    );

    let loaded = match load_dataset(&settings.data_dir, &settings.years) {
        Ok(loaded) => loaded,
        Err(e @ OsrError::NoDataAvailable { .. }) => {
            // Terminal empty state: nothing is computed.
            if settings.wants_json() {
                let body = serde_json::json!({ "status": "no_data", "message": e.to_string() });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("{e}");
            }
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let params = settings.analysis_params();
    let report = analyze(&loaded, &params)?;

    if settings.wants_json() {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", views::render_report(&report, &loaded.dataset.columns));
    }

    Ok(())
}
