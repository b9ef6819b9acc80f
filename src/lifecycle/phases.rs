//! Phase Runner and the startup phases.
//!
//! # Phase Order
//! ```text
//! 1. registry        → registry_ready
//! 2. keys            → keys_ready
//! 3. token-signing   → token_signing_ready
//! 4. sql             → sql_ready, sql_seeded
//! 5. tls             → tls_ready
//! 6. listeners       → docs_ready, logging_api_ready, health_ready (dedicated host)
//! -- setup hook --
//!    primary         → router_ready, http_ready, health_ready (mounted)
//! ```
//!
//! Each phase runs only when its feature is enabled. The first error aborts the run;
//! completed phases are not rolled back.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use super::context::LifecycleContext;
use super::error::{LifecycleError, Result};
use crate::capabilities::{MemorySeeder, PgSeeder, SchemaSeeder};
use crate::features::{FeatureSet, JwtFeature, RegistryFeature, RsaFeature, SqlDriver, SqlFeature, TlsFeature};
use crate::net::tls::{LoadOutcome, TlsError, TlsMaterial};
use crate::net::host;
use crate::observability::metrics;
use crate::tokens::{parse_token_config_file, TokenConfig};
use crate::{health, http};

/// Run `work` as the named phase: inside its own span, timed, and recorded on success.
async fn phase<F>(ctx: &LifecycleContext, name: &'static str, work: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let span = tracing::info_span!(parent: ctx.span(), "phase", phase = name);
    let started = Instant::now();
    let result = work.instrument(span).await;
    let elapsed = started.elapsed();

    metrics::record_phase(name, elapsed, result.is_ok());
    match &result {
        Ok(()) => {
            ctx.record_phase(name);
            tracing::debug!(phase = name, elapsed_ms = elapsed.as_millis() as u64, "phase complete");
        }
        Err(e) => tracing::error!(phase = name, error = %e, "phase failed"),
    }
    result
}

/// Phases 1 to 5, in dependency order.
pub(crate) async fn run_phases(features: &FeatureSet, ctx: &LifecycleContext) -> Result<()> {
    if features.registry.enabled {
        phase(ctx, "registry", registry(&features.registry, ctx)).await?;
    }
    if features.rsa.enabled {
        phase(ctx, "keys", keys(&features.rsa, ctx)).await?;
    }
    if features.jwt.enabled {
        phase(ctx, "token-signing", token_signing(&features.jwt, ctx)).await?;
    }
    if features.sql.enabled {
        phase(ctx, "sql", sql(&features.sql, ctx)).await?;
    }
    if features.tls.enabled {
        phase(ctx, "tls", tls(&features.tls, ctx)).await?;
    }
    Ok(())
}

async fn registry(feature: &RegistryFeature, ctx: &LifecycleContext) -> Result<()> {
    let registry = &ctx.capabilities().registry;
    match &feature.path {
        Some(path) => {
            if !path.exists() {
                return Err(LifecycleError::RegistryNotFound(path.clone()));
            }
            registry.init(path)?;
            tracing::info!(path = %path.display(), "registry: loaded");
        }
        None => {
            registry.init_local();
            tracing::info!("registry: using local registry");
        }
    }
    ctx.state().mark_registry_ready();
    Ok(())
}

/// Read both halves of a PEM key pair. Absent or unreadable files are a soft failure.
fn read_key_pair(what: &'static str, private: &Path, public: &Path) -> Result<(Vec<u8>, Vec<u8>)> {
    let read = |path: &Path| {
        std::fs::read(path).map_err(|_| LifecycleError::MaterialUnavailable {
            what,
            path: path.to_path_buf(),
        })
    };
    Ok((read(private)?, read(public)?))
}

async fn keys(feature: &RsaFeature, ctx: &LifecycleContext) -> Result<()> {
    let store = &ctx.capabilities().key_store;

    let Some((private, public)) = feature.key_paths() else {
        tracing::info!("keys: no key paths given, generating key pair");
        store.generate_keys()?;
        ctx.state().mark_keys_ready();
        return Ok(());
    };

    match read_key_pair("RSA key", private, public) {
        Ok((private_pem, public_pem)) => {
            store.install_keys(&private_pem, &public_pem)?;
            tracing::info!(private = %private.display(), public = %public.display(), "keys: installed");
            ctx.state().mark_keys_ready();
        }
        Err(soft) => {
            tracing::warn!(error = %soft, "keys: skipping key files");
            store.generate_keys()?;
        }
    }
    Ok(())
}

async fn token_signing(feature: &JwtFeature, ctx: &LifecycleContext) -> Result<()> {
    let store = &ctx.capabilities().key_store;

    let key_installed = match feature.key_paths() {
        None => {
            tracing::info!("token-signing: no key paths given, generating signing key");
            store.generate_signing_key()?;
            true
        }
        Some((private, public)) => match read_key_pair("signing key", private, public) {
            Ok((private_pem, public_pem)) => {
                store.install_signing_key(&private_pem, &public_pem)?;
                tracing::info!(private = %private.display(), "token-signing: signing key installed");
                true
            }
            Err(soft) => {
                tracing::warn!(error = %soft, "token-signing: skipping key files");
                store.generate_signing_key()?;
                false
            }
        },
    };

    let mut issuers: HashMap<String, TokenConfig> = HashMap::new();
    for path in &feature.token_config_paths {
        if !path.exists() {
            return Err(LifecycleError::TokenConfigNotFound(path.clone()));
        }
        let config = parse_token_config_file(path)?;
        tracing::info!(issuer = %config.issuer, path = %path.display(), "token-signing: loaded token configuration");
        issuers.insert(config.issuer.clone(), config);
    }
    for config in &feature.token_configs {
        if config.issuer.trim().is_empty() {
            tracing::warn!("token-signing: ignoring inline token configuration without issuer");
            continue;
        }
        if issuers.insert(config.issuer.clone(), config.clone()).is_some() {
            tracing::info!(issuer = %config.issuer, "token-signing: inline configuration overrides file");
        }
    }
    ctx.set_issuers(issuers);

    if key_installed {
        ctx.state().mark_token_signing_ready();
    }
    Ok(())
}

fn seeder_for(feature: &SqlFeature, ctx: &LifecycleContext) -> Arc<dyn SchemaSeeder> {
    if let Some(seeder) = &ctx.capabilities().seeder {
        return seeder.clone();
    }
    match feature.driver {
        SqlDriver::Postgres => Arc::new(PgSeeder::new()),
        SqlDriver::Memory => Arc::new(MemorySeeder::new()),
    }
}

async fn sql(feature: &SqlFeature, ctx: &LifecycleContext) -> Result<()> {
    if !ctx.state().registry_ready() {
        tracing::warn!("sql: registry not ready, skipping schema seeding");
        return Ok(());
    }

    let endpoint = ctx
        .capabilities()
        .registry
        .database()
        .ok_or_else(|| LifecycleError::DriverInit {
            driver: "sql",
            reason: "registry has no database endpoint".to_string(),
        })?;

    for dir in &feature.dirs {
        if !dir.is_dir() {
            return Err(LifecycleError::ConfigurationMissing {
                what: "sql files directory",
                path: dir.clone(),
            });
        }
    }
    let files = feature.resolve_files().map_err(|e| LifecycleError::DriverInit {
        driver: "sql",
        reason: format!("failed to list sql files: {e}"),
    })?;

    let seeder = seeder_for(feature, ctx);
    seeder.init(&endpoint).await?;
    ctx.state().mark_sql_ready();
    tracing::info!(
        driver = feature.driver.as_str(),
        host = %endpoint.host,
        database = %endpoint.database,
        files = files.len(),
        "sql: driver initialized"
    );

    let mut loaded = 0usize;
    for file in &files {
        match seeder.load_file(file).await {
            Ok(()) => {
                loaded += 1;
                tracing::info!(file = %file.display(), "sql: file applied");
            }
            Err(e) => tracing::warn!(file = %file.display(), error = %e, "sql: file failed, continuing"),
        }
    }

    seeder
        .seed(&feature.create_table_stmts, &feature.create_index_stmts)
        .await;

    if loaded > 0 {
        ctx.state().mark_sql_seeded();
    } else {
        tracing::warn!("sql: no sql file contributed statements");
    }
    Ok(())
}

async fn tls(feature: &TlsFeature, ctx: &LifecycleContext) -> Result<()> {
    let outcome = TlsMaterial::load(feature).await.map_err(|e| match e {
        TlsError::Read { what, path, source } if source.kind() == io::ErrorKind::NotFound => {
            LifecycleError::ConfigurationMissing { what, path }
        }
        other => LifecycleError::Tls(other),
    })?;
    match outcome {
        LoadOutcome::Missing(missing) => Err(LifecycleError::TlsMaterialMissing(missing.as_str())),
        LoadOutcome::Loaded(material) => {
            let client = material.http_client()?;
            ctx.set_tls(material, client);
            ctx.state().mark_tls_ready();
            tracing::info!("tls: configuration ready");
            Ok(())
        }
    }
}

/// Health gets its own host only when no application router can carry it.
fn needs_dedicated_health(features: &FeatureSet) -> bool {
    features.health.enabled && !features.router.enabled && !features.http.enabled
}

/// Phase 6: documentation server, logging API and (if needed) the dedicated health host.
///
/// Returns the port of the dedicated health host, if one was started.
pub(crate) async fn start_auxiliary(features: &FeatureSet, ctx: &LifecycleContext) -> Result<Option<u16>> {
    if !features.docs.enabled && !features.logging_api.enabled && !needs_dedicated_health(features) {
        return Ok(None);
    }

    let mut health_port = None;
    phase(ctx, "listeners", async {
        if features.docs.enabled {
            let docs = &features.docs;
            let router = http::docs::router(&docs.dir, &docs.api_path)?;
            host::start(ctx, "docs", docs.port, router)?;
            ctx.state().mark_docs_ready();
        }

        if features.logging_api.enabled {
            let router = http::logging_api::router(ctx.log_handle().cloned());
            host::start(ctx, "logging-api", features.logging_api.port, router)?;
            ctx.state().mark_logging_api_ready();
        }

        if needs_dedicated_health(features) {
            let health = &features.health;
            let router = health::endpoint::router(&health.path, ctx.state().clone(), ctx.health_check().cloned());
            let addr = host::start(ctx, "health", health.port, router)?;
            ctx.state().mark_health_ready();
            health_port = Some(addr.port());
        }
        Ok(())
    })
    .await?;

    Ok(health_port)
}

/// Start the primary router and auxiliary HTTP listener, mounting health on each.
///
/// Returns the port the health monitor should probe: the last listener that carries
/// the health route.
pub(crate) fn start_primary(features: &FeatureSet, ctx: &LifecycleContext) -> Result<Option<u16>> {
    let health = &features.health;
    let with_health = |router: axum::Router| {
        if health.enabled {
            router.merge(health::endpoint::router(
                &health.path,
                ctx.state().clone(),
                ctx.health_check().cloned(),
            ))
        } else {
            router
        }
    };

    let mut probe_port = None;

    if features.router.enabled {
        let addr = host::start(ctx, "router", features.router.port, with_health(features.router.router.clone()))?;
        ctx.state().mark_router_ready();
        probe_port = Some(addr.port());
    }

    if features.http.enabled {
        let addr = host::start(ctx, "http", features.http.port, with_health(features.http.router.clone()))?;
        ctx.state().mark_http_ready();
        probe_port = Some(addr.port());
    }

    if health.enabled && probe_port.is_some() {
        ctx.state().mark_health_ready();
    }
    Ok(probe_port)
}
