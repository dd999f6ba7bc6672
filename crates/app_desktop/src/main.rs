mod input;
mod view;

use std::sync::Arc;
use std::time::Duration;
use std::{fs, path::Path};

use anyhow::Result;
use config::{AppConfig, ConfigStore, ENV_PLATFORM_ANON_KEY, ENV_PLATFORM_URL};
use core_types::RealtimeClient;
use extraction_client::BackendClient;
use gpui::{App, Application, Bounds, WindowBounds, WindowOptions, prelude::*, px, size};
use i18n::I18n;
use studio_services::{ServiceSettings, Studio, StudioClients, StudioContext, ToastLog, Toaster};
use supabase_client::SupabaseClient;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::view::StudioView;

const TOAST_CAPACITY: usize = 5;

fn main() {
    let mut data_dir = dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
    data_dir.push("agent-studio");
    if let Err(err) = fs::create_dir_all(&data_dir) {
        eprintln!("failed to prepare data dir: {err}");
    }
    let _log_guard = init_local_logger(&data_dir.join("logs"));

    let config_store =
        ConfigStore::from_default_location().unwrap_or_else(|_| ConfigStore::from_dir(&data_dir));
    let config = match config_store.load_with_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to load config: {err}");
            let mut cfg = AppConfig::default();
            cfg.apply_env_overrides();
            cfg
        }
    };

    if !config.platform.is_configured() {
        error!(path = %config_store.path().display(), "platform url or anon key missing");
        eprintln!(
            "platform is not configured: set platform.url and platform.anon_key in {} or export {ENV_PLATFORM_URL} and {ENV_PLATFORM_ANON_KEY}",
            config_store.path().display()
        );
        return;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => Arc::new(rt),
        Err(err) => {
            eprintln!("failed to create tokio runtime: {err}");
            return;
        }
    };

    let i18n = Arc::new(I18n::new(config.language));
    let toasts = Arc::new(ToastLog::bounded(TOAST_CAPACITY));
    let studio = match build_studio(&config, toasts.clone(), i18n.clone()) {
        Ok(studio) => studio,
        Err(err) => {
            error!("failed to build services: {err:#}");
            eprintln!("failed to build services: {err:#}");
            return;
        }
    };
    info!(
        backend = %config.backend.url,
        realtime = config.realtime.enabled,
        "agent studio starting"
    );

    Application::new().run(move |cx: &mut App| {
        let bounds = Bounds::centered(None, size(px(1200.0), px(780.0)), cx);
        cx.open_window(
            WindowOptions {
                window_bounds: Some(WindowBounds::Windowed(bounds)),
                titlebar: Some(gpui::TitlebarOptions {
                    title: Some(i18n.t("app.title").to_owned().into()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            move |_, cx| cx.new(|cx| StudioView::new(studio, runtime, toasts, i18n, cx)),
        )
        .expect("open main window");
        cx.activate(true);
    });
}

fn build_studio(config: &AppConfig, toasts: Arc<ToastLog>, i18n: Arc<I18n>) -> Result<Studio> {
    let platform = SupabaseClient::new(&config.platform.url, config.platform.anon_key.clone())?
        .with_heartbeat(Duration::from_secs(config.realtime.heartbeat_secs));
    let realtime: Option<Arc<dyn RealtimeClient>> = if config.realtime.enabled {
        Some(Arc::new(platform.realtime()))
    } else {
        None
    };

    let clients = StudioClients {
        tables: Arc::new(platform.rest()),
        auth: Arc::new(platform.auth()),
        storage: Arc::new(platform.storage()),
        realtime,
        extractor: Arc::new(BackendClient::new(config.backend.url.clone())),
    };
    let toaster = Toaster::new(toasts, i18n);
    Ok(Studio::new(StudioContext::new(
        clients,
        toaster,
        ServiceSettings::from_config(config),
    )))
}

fn init_local_logger(log_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("failed to create log dir `{}`: {err}", log_dir.display());
    }
    let file_appender = tracing_appender::rolling::daily(log_dir, "agent-studio.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,app_desktop=debug,studio_services=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_writer(writer)
        .init();

    guard
}
