use clap::Parser;
use pattern_hunter::browser::chrome::{ChromeDriver, ConnectionMode};
use pattern_hunter::capture::{capture_full_page, CaptureOptions};
use pattern_hunter::mapping::{map_bounding_box_to_dom, mapping_context_for, BoundingBox, Size};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use warp::Filter;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PATTERN_HUNTER_PORT", default_value_t = 9670)]
    port: u16,

    /// Path to a Chrome/Chromium executable
    #[arg(long)]
    chrome_path: Option<String>,

    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,

    /// Pass --no-sandbox to Chrome (needed in most containers)
    #[arg(long)]
    no_sandbox: bool,

    /// Attach to an already running Chrome on this debug port instead of launching
    #[arg(long)]
    debug_port: Option<u16>,
}

#[derive(Debug, serde::Deserialize)]
struct CaptureRequest {
    url: String,
    #[serde(default)]
    options: Option<CaptureOptions>,
}

#[derive(Debug, serde::Deserialize)]
struct MapRequest {
    bbox: BoundingBox,
    screenshot_size: Size,
    #[serde(default = "default_normalized")]
    is_normalized: bool,
}

fn default_normalized() -> bool {
    true
}

#[derive(Debug, serde::Serialize)]
struct BridgeResponse {
    status: String,
    message: String,
    result: Option<serde_json::Value>,
}

impl BridgeResponse {
    fn success(message: &str, result: serde_json::Value) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            result: Some(result),
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            message,
            result: None,
        }
    }
}

// Shared state
struct AppState {
    driver: Mutex<Option<ChromeDriver>>,
    args: Args,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    log::info!("Starting Pattern Hunter bridge on port {}", args.port);

    let port = args.port;
    let state = Arc::new(AppState {
        driver: Mutex::new(None),
        args,
    });

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

    let state_filter = warp::any().map(move || state.clone());

    let capture = warp::path("capture")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_capture);

    let map = warp::path("map")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter)
        .and_then(handle_map);

    let routes = health.or(capture).or(map);

    // Bind manually to handle "port in use" error gracefully
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            log::info!("Listening on http://{}", addr);
            warp::serve(routes)
                .run_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
                .await;
        }
        Err(e) => {
            log::error!("Failed to bind to port {}: {}", port, e);
            eprintln!("Error: Port {} is already in use or unavailable.", port);
            std::process::exit(1);
        }
    }
}

/// Make sure the guarded slot holds a live browser, relaunching if it died
async fn ensure_driver<'a>(
    slot: &'a mut Option<ChromeDriver>,
    args: &Args,
) -> anyhow::Result<&'a ChromeDriver> {
    if let Some(driver) = slot.as_ref() {
        if !driver.is_alive().await {
            log::warn!("Chrome session DEAD, restarting...");
            *slot = None;
        }
    }

    if slot.is_none() {
        log::info!("Launching new Chrome session...");
        let mode = match args.debug_port {
            Some(port) => ConnectionMode::DebugPort(port),
            None => ConnectionMode::Sandboxed {
                chrome_path: args.chrome_path.clone(),
                no_sandbox: args.no_sandbox,
                headless: args.headless,
            },
        };
        let driver = ChromeDriver::new(mode).await?;
        log::info!("Chrome launched successfully.");
        *slot = Some(driver);
    }

    slot.as_ref()
        .ok_or_else(|| anyhow::anyhow!("Chrome session unavailable"))
}

async fn run_capture(req: CaptureRequest, state: &AppState) -> anyhow::Result<serde_json::Value> {
    // Held for the whole capture: scrolling the shared page is exclusive
    let mut driver_guard = state.driver.lock().await;
    let driver = ensure_driver(&mut driver_guard, &state.args).await?;

    driver.navigate(&req.url).await?;
    let page = driver.current_page().await?;

    let options = req.options.unwrap_or_default();
    let capture = capture_full_page(&page, &options).await?;
    Ok(serde_json::to_value(capture)?)
}

async fn run_map(req: MapRequest, state: &AppState) -> anyhow::Result<serde_json::Value> {
    let mut driver_guard = state.driver.lock().await;
    let driver = ensure_driver(&mut driver_guard, &state.args).await?;
    let page = driver.current_page().await?;

    let context = mapping_context_for(&page, req.screenshot_size, req.is_normalized).await?;
    let mapping = map_bounding_box_to_dom(&page, req.bbox, &context).await;
    Ok(serde_json::to_value(mapping)?)
}

async fn handle_capture(
    req: CaptureRequest,
    state: Arc<AppState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    log::info!("Received capture request: {}", req.url);

    let response = match run_capture(req, &state).await {
        Ok(result) => BridgeResponse::success("Full-page capture complete", result),
        Err(e) => {
            log::error!("Capture failed: {:#}", e);
            BridgeResponse::error(format!("Capture failed: {:#}", e))
        }
    };
    Ok(warp::reply::json(&response))
}

async fn handle_map(
    req: MapRequest,
    state: Arc<AppState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    log::info!("Received map request: {:?}", req.bbox.to_array());

    let response = match run_map(req, &state).await {
        Ok(result) => BridgeResponse::success("Box mapped", result),
        Err(e) => {
            log::error!("Mapping failed: {:#}", e);
            BridgeResponse::error(format!("Mapping failed: {:#}", e))
        }
    };
    Ok(warp::reply::json(&response))
}
