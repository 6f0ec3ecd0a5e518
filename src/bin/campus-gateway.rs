use campus_gateway::{GatewayConfig, GatewayState};

const USAGE: &str = "usage: campus-gateway [--listen HOST:PORT] [--auth-url URL] [--courses-url URL] [--payments-url URL] [--timeout-secs SECS] [--legacy-auth-header]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut listen = "127.0.0.1:8080".to_string();
    let mut config = GatewayConfig::from_env();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--listen" | "--addr" => {
                listen = args.next().ok_or("missing value for --listen/--addr")?;
            }
            "--auth-url" => {
                config.identity_base_url = args.next().ok_or("missing value for --auth-url")?;
            }
            "--courses-url" => {
                config.course_base_url = args.next().ok_or("missing value for --courses-url")?;
            }
            "--payments-url" => {
                config.payment_base_url = args.next().ok_or("missing value for --payments-url")?;
            }
            "--timeout-secs" => {
                let raw = args.next().ok_or("missing value for --timeout-secs")?;
                config.request_timeout_secs =
                    raw.parse().map_err(|_| "invalid --timeout-secs")?;
            }
            "--legacy-auth-header" => {
                config.identity_legacy_auth = true;
            }
            other => {
                return Err(format!("unknown argument: {other}\n{USAGE}").into());
            }
        }
    }

    let state = GatewayState::new(&config)?;
    let app = campus_gateway::router(state);
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    tracing::info!(listen = %listen, "campus-gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
