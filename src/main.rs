use std::env;
use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, GatewayIntents};
use tracing::info;

use warden::moderation::{
    DiscordGateway, ExpiryScheduler, HistoryStore, ModerationService, TracingNotifier,
};
use warden::{Data, Error, commands, handlers, logging};

/// Reprimand history file
const HISTORY_FILE: &str = "data/reprimands.yaml";

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    // Initialize logging
    logging::init()?;

    // Load environment variables
    let token = env::var("DISCORD_TOKEN").expect("DISCORD_TOKEN must be set");

    // Set up the bot's data and reprimand history
    let mut data = Data::load().await;
    let store = HistoryStore::load(HISTORY_FILE).await;

    // The gateway makes reprimands effective; the scheduler reverses the
    // time-bound ones once they lapse
    let http = Arc::new(serenity::Http::new(&token));
    let bot_user_id = http.get_current_user().await?.id.get();
    let gateway = Arc::new(DiscordGateway::new(http, data.configs(), bot_user_id));

    let (scheduler, rx) = ExpiryScheduler::new(store.clone(), gateway.clone());
    scheduler.start(rx);
    scheduler.load_and_reschedule(None).await;

    let service = ModerationService::new(
        store,
        gateway,
        scheduler,
        Arc::new(TracingNotifier),
        data.configs(),
    );
    data.set_moderation(service);

    // Configure the Poise framework
    let framework_data = data.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::ping(),
                commands::warn(),
                commands::notice(),
                commands::note(),
                commands::mute(),
                commands::ban(),
                commands::kick(),
                commands::pardon(),
                commands::update(),
                commands::hide(),
                commands::delete(),
                commands::history(),
            ],
            pre_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_start(ctx);
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_end(ctx);
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    logging::log_command_error(&error);
                })
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(framework_data)
            })
        })
        .build();

    // Configure the Serenity client
    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .event_handler(handlers::Handler)
        .framework(framework)
        .await
        .expect("Failed to create client");

    // Make the bot data reachable from raw serenity events
    client.data.write().await.insert::<Data>(data.clone());

    info!("Starting bot...");
    // Start the bot
    if let Err(err) = client.start().await {
        eprintln!("Error starting the bot: {err}");
    }

    Ok(())
}

fn main() {
    // Run the async main function
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async_main());

    // Handle any errors that occurred during execution
    if let Err(err) = result {
        eprintln!("Error: {err}");
    }
}
