use std::process;

use futures::StreamExt;
use shellstream::{
    application::{
        error::AppError,
        stream::{ResponseBody, stream_node},
    },
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        renderer::TemplateRenderer,
        telemetry,
    },
};
use tokio::io::AsyncWriteExt;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(_) => run_render(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let router = http::build_router(HttpState::new(settings.page));

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(addr = %settings.server.addr, "listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| InfraError::server(err.to_string()))?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}

async fn run_render(settings: config::Settings) -> Result<(), AppError> {
    let page = &settings.page;
    let response = stream_node(
        &TemplateRenderer,
        http::application_page(page),
        http::render_options(page),
        http::response_config(page),
    )
    .await;

    let status = response.status();
    let mut stdout = tokio::io::stdout();

    match response.into_body() {
        ResponseBody::Text(text) => {
            stdout
                .write_all(text.as_bytes())
                .await
                .map_err(InfraError::from)?;
            stdout.flush().await.map_err(InfraError::from)?;
            Err(AppError::unexpected(format!(
                "render failed with status {status}"
            )))
        }
        ResponseBody::Stream(mut tail) => {
            while let Some(chunk) = tail.next().await {
                match chunk {
                    Ok(bytes) => stdout.write_all(&bytes).await.map_err(InfraError::from)?,
                    Err(failure) => {
                        stdout.flush().await.map_err(InfraError::from)?;
                        return Err(AppError::unexpected(failure.to_string()));
                    }
                }
            }
            stdout.flush().await.map_err(InfraError::from)?;
            Ok(())
        }
    }
}
