use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use clap::Parser;
use time::{UtcOffset, macros::format_description};
use tower_http::services::ServeDir;
use tracing::{error, info};
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod app_state;
mod carousel;
mod catalog;
mod config;
mod context;
mod errors;
mod helpers;
mod middleware;
mod pages;
mod registry;
mod templates;
mod utils;

use app_state::AppState;
use config::SiteConfig;
use errors::{StartupError, TemplateError};
use pages::{GalleriesPage, GalleryPage, HomePage, ImagePage};
use registry::PageRegistry;

#[derive(Parser, Debug)]
#[command(name = "photo_site", about = "Serve a photo gallery website from templates")]
struct Args {
    /// Path to the configuration file (e.g. site.json)
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Path to the log file (e.g. site.log)
    #[arg(short = 'l', long = "log")]
    log: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: "photo_site", "{e}");
            eprintln!("photo_site: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), StartupError> {
    let config = SiteConfig::load(&args.config)?;
    init_tracing(&args.log)?;
    info!(target: "photo_site", "[photo_site] www root = {}", config.www_root.display());

    let state = AppState::from_config(config);
    let app = build_app(state.clone()).await?;

    let addr = bind_addr(&state.config.listen_address);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    match listener.local_addr() {
        Ok(bound) => info!(target: "photo_site", "[photo_site] started, serving pages on http://{bound}"),
        Err(_) => info!(target: "photo_site", "[photo_site] started, serving pages on {addr}"),
    }
    axum::serve(listener, app).await.map_err(StartupError::Serve)
}

// Installed once, before any route is registered; never replaced afterwards.
fn init_tracing(log_path: &Path) -> Result<(), StartupError> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|source| StartupError::Log {
            path: log_path.to_path_buf(),
            source,
        })?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Format timestamp as local time: "YYYY-MM-DD HH:MM:SS"
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let ts_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let timer = OffsetTime::new(offset, ts_format);
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(false)
        .with_timer(timer)
        .with_writer(Mutex::new(file));
    let subscriber = Registry::default().with(env_filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).ok();
    Ok(())
}

// ":8080" means every interface.
fn bind_addr(listen: &str) -> String {
    if listen.starts_with(':') {
        format!("0.0.0.0{listen}")
    } else {
        listen.to_string()
    }
}

async fn build_app(state: AppState) -> Result<Router, TemplateError> {
    let pages = PageRegistry::new(state.clone())
        .register("/", HomePage, "home")
        .await?
        .register("/home.html", HomePage, "home")
        .await?
        .register("/galleries.html", GalleriesPage, "galleries")
        .await?
        .register("/gallery/{gallery}", GalleryPage, "gallery")
        .await?
        .register("/image/{gallery}/{image}", ImagePage, "image")
        .await?
        .into_router();
    info!(
        target: "photo_site",
        "[photo_site] {} templates compiled at startup",
        state.templates.compilations()
    );

    let app = pages
        .nest_service("/static", ServeDir::new(state.config.static_dir()))
        .with_state(state.clone())
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::log_requests_mw,
        ));
    Ok(app)
}

// ============ Helpers ============
pub(crate) fn http_not_found(msg: &str) -> Response {
    (StatusCode::NOT_FOUND, msg.to_string()).into_response()
}

pub(crate) fn http_error(status: StatusCode, msg: &str) -> Response {
    (status, msg.to_string()).into_response()
}
