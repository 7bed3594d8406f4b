use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Report, Result, WrapErr, eyre};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use academy_avatar::application::services::{
    AvatarStore, ImageTransformer, ResolutionCache, VersionBroadcaster,
};
use academy_avatar::application::use_cases::{
    ChangeAvatarRequest, ChangeAvatarUseCase, RemoveAvatarUseCase,
};
use academy_avatar::domain::entities::{Profile, SubjectId};
use academy_avatar::domain::errors::AvatarError;
use academy_avatar::domain::ports::ObjectStorePort;
use academy_avatar::infrastructure::config::{Command, TransformArgs};
use academy_avatar::infrastructure::{
    AppConfig, CliArgs, ConfigManager, FsObjectStore, HttpObjectStore, StoreBackend,
};
use academy_avatar::presentation::{AvatarRender, AvatarView};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let manager = ConfigManager::new()?;
    let mut config = manager.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn create_store(config: &AppConfig) -> Result<Arc<dyn ObjectStorePort>> {
    let store: Arc<dyn ObjectStorePort> = match config.store.backend {
        StoreBackend::Fs => {
            let root = config
                .effective_store_root()
                .ok_or_else(|| eyre!("no object store root configured"))?;
            info!(root = %root.display(), "Using filesystem object store");
            Arc::new(FsObjectStore::new(root, &config.store.public_base_url)?)
        }
        StoreBackend::Http => {
            let base_url = config
                .store
                .base_url
                .clone()
                .ok_or_else(|| eyre!("store.base_url is required for the http backend"))?;
            info!(base_url = %base_url, "Using HTTP object store");
            Arc::new(HttpObjectStore::new(
                &base_url,
                &config.store.public_base_url,
                config.store.api_key.clone(),
                config.store_timeout(),
            )?)
        }
    };
    Ok(store)
}

fn report(error: AvatarError) -> Report {
    let message = error.user_message();
    Report::new(error).wrap_err(message)
}

fn parse_subject(raw: &str) -> Result<SubjectId> {
    SubjectId::new(raw).ok_or_else(|| eyre!("invalid subject id: {raw:?}"))
}

async fn save(
    config: &AppConfig,
    subject: &str,
    image: &std::path::Path,
    transform: TransformArgs,
) -> Result<()> {
    let subject = parse_subject(subject)?;
    let source = tokio::fs::read(image)
        .await
        .wrap_err_with(|| format!("failed to read {}", image.display()))?;

    let use_case = ChangeAvatarUseCase::new(
        ImageTransformer::new(config.transformer_config()),
        AvatarStore::new(create_store(config)?, config.naming()),
        VersionBroadcaster::new(),
    );
    let response = use_case
        .execute(ChangeAvatarRequest::new(subject, source, transform.into()))
        .await
        .map_err(report)?;

    println!("{} {}", response.name, response.version);
    Ok(())
}

async fn remove(config: &AppConfig, subject: &str) -> Result<()> {
    let subject = parse_subject(subject)?;
    let use_case = RemoveAvatarUseCase::new(
        AvatarStore::new(create_store(config)?, config.naming()),
        VersionBroadcaster::new(),
    );
    let version = use_case
        .execute(&subject)
        .await
        .map_err(report)?;

    println!("removed {subject} {version}");
    Ok(())
}

async fn resolve(config: &AppConfig, subject: &str, name: Option<String>) -> Result<()> {
    let subject = parse_subject(subject)?;
    let broadcaster = VersionBroadcaster::new();
    let cache = ResolutionCache::new(create_store(config)?, config.naming(), config.cache_config());

    cache.resolve(&subject, broadcaster.current_token()).await;
    let view = AvatarView::mount(Profile::new(subject, name), cache, &broadcaster);

    match view.render() {
        AvatarRender::Image { url } => println!("{url}"),
        AvatarRender::Initials { text, color } => println!("{text} {color}"),
    }
    Ok(())
}

async fn render(
    config: &AppConfig,
    image: &std::path::Path,
    out: &std::path::Path,
    transform: TransformArgs,
) -> Result<()> {
    let source = tokio::fs::read(image)
        .await
        .wrap_err_with(|| format!("failed to read {}", image.display()))?;

    let blob = ImageTransformer::new(config.transformer_config())
        .transform(source.into(), transform.into())
        .await?;

    tokio::fs::write(out, blob.bytes())
        .await
        .wrap_err_with(|| format!("failed to write {}", out.display()))?;

    info!(path = %out.display(), bytes = blob.len(), "Rendered avatar");
    println!("{}", out.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = academy_avatar::VERSION, "Starting {}", academy_avatar::NAME);

    match args.command {
        Command::Save {
            subject,
            image,
            transform,
        } => save(&config, &subject, &image, transform).await,
        Command::Remove { subject } => remove(&config, &subject).await,
        Command::Resolve { subject, name } => resolve(&config, &subject, name).await,
        Command::Render {
            image,
            out,
            transform,
        } => render(&config, &image, &out, transform).await,
    }
}
