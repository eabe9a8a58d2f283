use anyhow::Result;
use cosmo_assistant::bot::{self, BotDeps, TelegramNotifier};
use cosmo_assistant::completion::CompletionClient;
use cosmo_assistant::config::AppConfig;
use cosmo_assistant::dialogue::{AssistantDialogue, AssistantDialogueState};
use cosmo_assistant::errors::error_logging;
use cosmo_assistant::liveness;
use cosmo_assistant::localization;
use cosmo_assistant::observability;
use cosmo_assistant::reminders::ReminderScheduler;
use cosmo_assistant::speech::SpeechSynthesizer;
use cosmo_assistant::storage::StateStore;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    // Configuration errors abort startup before anything is spawned
    let config = AppConfig::from_env()?;
    config.validate()?;

    // Initialize complete observability stack (metrics, tracing, logging)
    let metrics_handle =
        observability::init_observability_with_config(config.observability.clone()).await?;
    let _uptime_handle = observability::start_uptime_recorder();

    info!(config = %config.summary(), "Configuration loaded");

    let store = Arc::new(StateStore::open(&config.storage.data_dir)?);
    info!(data_dir = %config.storage.data_dir.display(), "State store opened");

    let localization_manager =
        localization::create_localization_manager_with_default(&config.bot.default_language)?;

    let completion = Arc::new(CompletionClient::new(&config.completion)?);
    let speech = Arc::new(SpeechSynthesizer::from_config(
        &config.speech,
        Duration::from_secs(config.bot.http_timeout_secs),
    )?);

    // Initialize the bot with custom client configuration for better reliability
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.bot.http_timeout_secs))
        .build()?;
    let bot = Bot::with_client(config.bot.token.clone(), client);

    info!(
        timeout_secs = config.bot.http_timeout_secs,
        "Bot initialized, starting background tasks"
    );

    // Liveness listener for the hosting platform
    let (liveness_addr, _liveness_handle) = liveness::start_liveness_listener(
        liveness::bind_address(config.server.port),
        metrics_handle,
    )
    .await?;
    info!(address = %liveness_addr, "Liveness listener ready");

    // Reminder scheduler
    let shutdown = CancellationToken::new();
    let notifier = Arc::new(TelegramNotifier::new(
        bot.clone(),
        Arc::clone(&localization_manager),
    ));
    let scheduler_handle = ReminderScheduler::new(
        Arc::clone(&store),
        notifier,
        Duration::from_secs(config.reminders.tick_secs),
    )
    .spawn(shutdown.clone());

    let deps = BotDeps {
        store,
        localization: localization_manager,
        completion,
        speech,
        master_admin_id: config.bot.master_admin_id,
    };

    // Create shared dialogue storage
    let dialogue_storage = InMemStorage::<AssistantDialogueState>::new();

    let handler = dptree::entry().branch(Update::filter_message().endpoint({
        let storage = dialogue_storage.clone();
        let deps = deps.clone();
        move |bot: Bot, msg: Message| {
            let storage = storage.clone();
            let deps = deps.clone();
            let dialogue = AssistantDialogue::new(storage, msg.chat.id);
            async move { bot::message_handler(bot, msg, dialogue, deps).await }
        }
    }));

    info!("Starting dispatcher");

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, shutting down background tasks");
    shutdown.cancel();
    if let Err(e) = scheduler_handle.await {
        error_logging::log_internal_error(&e, "reminder_scheduler", "join", None);
    }

    Ok(())
}
