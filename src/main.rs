use dotenvy::dotenv;
use tracing::info;

use paysync::infra::{
    app::create_app,
    setup::{init_app_state, init_tracing, load_reference_data},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let app_state = init_app_state().await?;

    let bind_addr = app_state.config.bind_addr;

    load_reference_data(&app_state).await?;

    #[cfg(unix)]
    spawn_reload_on_hangup(app_state.clone())?;

    let app = create_app(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Reload the reference id files on SIGHUP.
#[cfg(unix)]
fn spawn_reload_on_hangup(
    app_state: paysync::adapters::http::app_state::AppState,
) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangups = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            info!("SIGHUP received, reloading reference data");
            if let Err(err) = load_reference_data(&app_state).await {
                tracing::error!(error = %err, "reference data reload failed");
            }
        }
    });
    Ok(())
}
