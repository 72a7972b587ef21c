use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use songsnap_bus::{
    LocalBus, MetadataTokenSource, PubsubPublisher, Publisher, StaticToken, TokenSource,
};
use songsnap_common::Config;
use songsnap_pipeline::{
    ocr::VisionTextDetector,
    server::{app, AppState},
    stages::TokenStore,
    storage::FsBlobStore,
    traits::{BlobStore, SpotifyCatalog},
    PipelineDeps, PipelineRouter, PipelineSettings,
};
use spotify_client::SpotifyClient;
use twilio::{TwilioOptions, TwilioService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("songsnap=info".parse()?)
                .add_directive("spotify_client=info".parse()?)
                .add_directive("twilio=info".parse()?),
        )
        .init();

    info!("SongSnap pipeline starting...");

    let config = Config::from_env()?;
    config.log_redacted();

    let store: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.storage_root));

    // Pub/Sub when a project is configured, otherwise everything runs in-process
    let (publisher, local_bus): (Arc<dyn Publisher>, Option<Arc<LocalBus>>) =
        match &config.pubsub_project {
            Some(project) => {
                let tokens: Arc<dyn TokenSource> = match &config.pubsub_access_token {
                    Some(token) => Arc::new(StaticToken::new(token.clone())),
                    None => Arc::new(MetadataTokenSource::new()),
                };
                info!(project = %project, "Publishing to Pub/Sub");
                let publisher: Arc<dyn Publisher> =
                    Arc::new(PubsubPublisher::new(project.clone(), tokens));
                (publisher, None)
            }
            None => {
                info!("No PUBSUB_PROJECT set, using in-process bus");
                let bus = Arc::new(LocalBus::new());
                let publisher: Arc<dyn Publisher> = bus.clone();
                (publisher, Some(bus))
            }
        };

    let deps = PipelineDeps {
        publisher,
        detector: Arc::new(VisionTextDetector::new(
            config.vision_api_key.clone(),
            store.clone(),
        )),
        catalog: Arc::new(SpotifyCatalog::new(
            SpotifyClient::new(),
            config.spotify_client_id.clone(),
            config.spotify_client_secret.clone(),
        )),
        tokens: Arc::new(TokenStore::new()),
        sms: Arc::new(TwilioService::new(TwilioOptions {
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_from_number.clone(),
        })),
        store,
    };
    let pipeline = Arc::new(PipelineRouter::new(
        PipelineSettings::from_config(&config),
        deps,
    ));

    if let Some(bus) = local_bus {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { bus.run(&*pipeline).await });
    }

    let state = Arc::new(AppState { pipeline });
    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("SongSnap push endpoints listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
