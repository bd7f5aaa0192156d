use std::sync::Arc;

use tango_bot::channels::{CliChannel, CliTransport, Transport, WhatsAppTransport, webhook_router};
use tango_bot::config::{BotConfig, RunMode};
use tango_bot::directory::{InMemoryDirectory, User};
use tango_bot::error::ConfigError;
use tango_bot::extraction::openai::OpenAiExtractor;
use tango_bot::flow::{Dispatcher, FlowDeps};

/// Sender id used for every line typed in CLI mode.
const CLI_PHONE: &str = "5492215550000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;

    eprintln!("💃 Tango bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Mode: {}",
        match config.mode {
            RunMode::Webhook => "webhook",
            RunMode::Cli => "cli",
        }
    );
    eprintln!(
        "   Years accepted: {}-{}",
        config.rules.years.min, config.rules.years.max
    );

    // ── Collaborators ───────────────────────────────────────────────────
    let directory = Arc::new(InMemoryDirectory::new());

    let mut deps = FlowDeps::new(directory.clone()).with_rules(config.rules.clone());
    deps.phone_format = config.phone_format.clone();
    deps.require_teacher_password = config.require_teacher_password;
    deps.min_confidence = config.min_confidence;

    if let Some(extraction) = &config.extraction {
        eprintln!("   Free-text extraction: enabled ({})", extraction.model);
        deps = deps.with_extractor(Arc::new(OpenAiExtractor::new(
            extraction.api_key.clone(),
            extraction.model.clone(),
        )));
    } else {
        eprintln!("   Free-text extraction: disabled (OPENAI_API_KEY not set)");
    }

    match config.mode {
        RunMode::Cli => {
            // The local user can reach the organizer menu without a backend.
            let key = config.phone_format.normalize(CLI_PHONE);
            directory
                .add_user(User {
                    id: key.clone(),
                    phone: key,
                    name: "Local".to_string(),
                    details: None,
                    is_teacher: true,
                })
                .await;

            let transport: Arc<dyn Transport> = Arc::new(CliTransport);
            let dispatcher = Arc::new(
                Dispatcher::standard(deps, transport)?
                    .with_secret_access_code(config.secret_access_code.clone()),
            );
            eprintln!("   Sender: {}", CLI_PHONE);
            eprintln!("   Type a message and press Enter. Ctrl-D to exit.\n");

            CliChannel::new(dispatcher, CLI_PHONE)
                .run(CliChannel::start())
                .await?;
        }
        RunMode::Webhook => {
            let whatsapp = config
                .whatsapp
                .clone()
                .ok_or_else(|| ConfigError::MissingEnvVar("WHATSAPP_TOKEN".to_string()))?;
            let verify_token = whatsapp.verify_token.clone();

            let transport: Arc<dyn Transport> = Arc::new(WhatsAppTransport::new(whatsapp));
            let dispatcher = Arc::new(
                Dispatcher::standard(deps, transport)?
                    .with_secret_access_code(config.secret_access_code.clone()),
            );

            let app = webhook_router(dispatcher, verify_token);
            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
            eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);
            eprintln!("   Health: http://0.0.0.0:{}/health\n", config.port);
            tracing::info!(port = config.port, "Webhook server started");
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
