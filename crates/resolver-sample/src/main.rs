//! # Resolver Sample
//!
//! Seeds an in-process content store with a blog article and its related resources, then
//! resolves the article for two different viewers.
//!
//! ## 🚀 Core Components
//!
//! - **[store]**: the content store actor and its client, which doubles as the resource fetcher.
//! - **[schema]**: the blog schema table.
//! - **[model]**: typed output models and the viewer context.
//! - **[lifecycle]**: starts the store and wires the resolution service to it.
//!
//! Set `RESOLVER_CONFIG` to a TOML file to override the resolver configuration.
//!
//! [store]: resolver_sample::store
//! [schema]: resolver_sample::schema
//! [model]: resolver_sample::model
//! [lifecycle]: resolver_sample::lifecycle

use entity_resolver::{setup_tracing, ResolverConfig};
use resolver_sample::lifecycle::BlogSystem;
use resolver_sample::model::{Role, Viewer};
use resolver_sample::seed;
use tracing::{error, info, Instrument};

fn load_config() -> Result<ResolverConfig, String> {
    match std::env::var("RESOLVER_CONFIG") {
        Ok(path) => {
            info!(%path, "Loading resolver config");
            ResolverConfig::load(&path).map_err(|e| e.to_string())
        }
        Err(_) => Ok(ResolverConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = load_config()?;
    info!(?config, "Starting blog system");
    let system = BlogSystem::new(config);

    let address = seed::seed(&system.store)
        .await
        .map_err(|e| e.to_string())?;
    let stored = system.store.len().await.map_err(|e| e.to_string())?;
    info!(%address, stored, "Content seeded");

    let reader = Viewer::new(Role::Anonymous).with_comment_limit(2);
    let span = tracing::info_span!("anonymous_reader");
    let result = async { system.article(&address, &reader).await }
        .instrument(span)
        .await;
    match result {
        Ok(article) => {
            let visible = article.comments.iter().filter(|c| !c.is_withheld()).count();
            info!(
                title = %article.title,
                author = %article.author.name,
                reviewer = article.reviewer.is_some(),
                comments = visible,
                "Article resolved"
            );
        }
        Err(e) => error!(error = %e, "Resolving for reader failed"),
    }

    let editor = Viewer::new(Role::Editor);
    let span = tracing::info_span!("editor");
    let result = async { system.raw_article(&address, &editor).await }
        .instrument(span)
        .await;
    match result {
        Ok(tree) => match serde_json::to_string_pretty(&tree) {
            Ok(pretty) => info!("Resolved tree:\n{pretty}"),
            Err(e) => error!(error = %e, "Rendering tree failed"),
        },
        Err(e) => error!(error = %e, "Resolving for editor failed"),
    }

    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
