mod app;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use flex_view::client::HttpBackend;
use flex_view::config::{Args, Settings};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flex_view=info")),
        )
        .init();

    let settings = Settings::from(Args::parse());
    info!(
        analyze_url = %settings.endpoints.analyze_url,
        explain_url = %settings.endpoints.explain_url,
        orientation = ?settings.layout.orientation,
        "starting"
    );

    let backend = match HttpBackend::new(settings.endpoints.clone()) {
        Ok(backend) => Arc::new(backend),
        Err(error) => {
            error!("{error:#}");
            return ExitCode::FAILURE;
        }
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        "flex-view",
        options,
        Box::new(move |cc| Ok(Box::new(app::FlexApp::new(cc, backend, settings.layout)))),
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "window closed with an error");
            ExitCode::FAILURE
        }
    }
}
