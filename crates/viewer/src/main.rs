mod app;
mod ui;
mod viewport;

use app::HeartViewApp;
use heartview_lib::state::ViewerSettings;

/// Command-line options
#[derive(Debug, Default)]
struct Args {
    patient: Option<String>,
    api_base: Option<String>,
    data_base: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heartview=info,heartview_lib=info".into()),
        )
        .init();

    let args = parse_args(std::env::args().skip(1));

    let stored_settings = ViewerSettings::load();
    let settings = stored_settings
        .clone()
        .with_env()
        .with_overrides(args.api_base, args.data_base);
    tracing::info!("Models from {}, data from {}", settings.api_base(), settings.data_base());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            return;
        }
    };
    let handle = runtime.handle().clone();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("heartview")
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    let patient = args.patient;
    if let Err(e) = eframe::run_native(
        "heartview",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(HeartViewApp::new(
                cc,
                stored_settings,
                settings,
                handle,
                patient,
            )))
        }),
    ) {
        tracing::error!("Failed to start application: {e}");
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Args {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--patient" => &mut parsed.patient,
            "--api-base" => &mut parsed.api_base,
            "--data-base" => &mut parsed.data_base,
            other => {
                tracing::warn!("Ignoring unknown argument {other}");
                continue;
            }
        };
        match args.next() {
            Some(value) => *slot = Some(value),
            None => tracing::warn!("{arg} needs a value"),
        }
    }
    parsed
}
