use std::{process, sync::Arc};

use apalis::{
    layers::WorkerBuilderExt,
    prelude::{Monitor, WorkerBuilder, WorkerFactoryFn},
};
use apalis_cron::CronStream;
use palaver::{
    application::{
        error::AppError,
        jobs::{
            EngineJobContext, JobLocks, process_flush_likes_job, process_flush_rates_job,
            process_flush_views_job, process_recompute_rank_job, run_reconciliation,
        },
        rank::RankEngine,
        repos::{ArticlesRepo, ArtifactsRepo, SubjectsRepo, TogglesRepo},
        toggles::ToggleService,
        views::ViewAccumulator,
    },
    cache::StagingStore,
    config,
    domain::scoring::GravityDecay,
    domain::types::ToggleKind,
    infra::{db::PostgresRepositories, error::InfraError, telemetry, warmup},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
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
        config::Command::RunJob(args) => run_job_once(settings, args.job).await,
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let url = settings.database.url.as_deref().ok_or_else(|| {
        AppError::from(InfraError::configuration(
            "database.url is required (set PALAVER__DATABASE__URL or --database-url)",
        ))
    })?;

    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn build_engine_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<EngineJobContext, AppError> {
    let staging = Arc::new(StagingStore::new());
    let articles: Arc<dyn ArticlesRepo> = repositories.clone();
    let toggles: Arc<dyn TogglesRepo> = repositories.clone();
    let subjects: Arc<dyn SubjectsRepo> = repositories.clone();
    let artifacts: Arc<dyn ArtifactsRepo> = repositories;

    let restored = warmup::restore_durable_artifacts(&staging, &artifacts)
        .await
        .map_err(palaver::application::error::EngineError::from)?;
    if restored > 0 {
        info!(restored, "restored durable artifacts into staging");
    }

    let views = Arc::new(ViewAccumulator::new(staging.clone(), articles.clone()));
    let likes = Arc::new(ToggleService::new(
        ToggleKind::Like,
        staging.clone(),
        toggles.clone(),
        subjects.clone(),
    ));
    let rates = Arc::new(ToggleService::new(
        ToggleKind::Rate,
        staging.clone(),
        toggles,
        subjects,
    ));
    let rank = Arc::new(RankEngine::new(
        staging,
        articles,
        artifacts,
        Arc::new(GravityDecay::default()),
        settings.engine.rank_window_days.get(),
        settings.engine.rank_size.get() as usize,
    ));

    Ok(EngineJobContext {
        views,
        likes,
        rates,
        rank,
        locks: Arc::new(JobLocks::default()),
    })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let context = build_engine_context(repositories, &settings).await?;

    let flush_views_worker = WorkerBuilder::new("flush-views-worker")
        .data(context.clone())
        .backend(CronStream::new(settings.engine.view_flush_cron.clone()))
        .build_fn(process_flush_views_job);
    let flush_likes_worker = WorkerBuilder::new("flush-likes-worker")
        .data(context.clone())
        .backend(CronStream::new(settings.engine.like_flush_cron.clone()))
        .build_fn(process_flush_likes_job);
    let flush_rates_worker = WorkerBuilder::new("flush-rates-worker")
        .data(context.clone())
        .backend(CronStream::new(settings.engine.rate_flush_cron.clone()))
        .build_fn(process_flush_rates_job);
    let recompute_rank_worker = WorkerBuilder::new("recompute-rank-worker")
        .data(context.clone())
        .backend(CronStream::new(settings.engine.rank_cron.clone()))
        .build_fn(process_recompute_rank_job);

    info!("starting reconciliation scheduler");
    Monitor::new()
        .register(flush_views_worker)
        .register(flush_likes_worker)
        .register(flush_rates_worker)
        .register(recompute_rank_worker)
        .run_with_signal(async {
            tokio::signal::ctrl_c().await?;
            info!("shutdown signal received");
            Ok(())
        })
        .await
        .map_err(|err| AppError::unexpected(format!("job monitor stopped: {err}")))?;

    Ok(())
}

async fn run_job_once(settings: config::Settings, job: config::JobName) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let context = build_engine_context(repositories, &settings).await?;

    match job {
        config::JobName::FlushViews => {
            run_reconciliation("flush_views", &context.locks.views, || {
                context.views.reconcile()
            })
            .await;
        }
        config::JobName::FlushLikes => {
            run_reconciliation("flush_likes", &context.locks.likes, || {
                context.likes.reconcile()
            })
            .await;
        }
        config::JobName::FlushRates => {
            run_reconciliation("flush_rates", &context.locks.rates, || {
                context.rates.reconcile()
            })
            .await;
        }
        config::JobName::RecomputeRank => {
            run_reconciliation("recompute_rank", &context.locks.rank, || {
                context.rank.recompute()
            })
            .await;
        }
    }

    Ok(())
}
