//! Basic usage examples for synapsed-storage-resolver

use std::error::Error;
use std::sync::Arc;
use synapsed_storage_resolver::prelude::*;

type Result<T> = std::result::Result<T, Box<dyn Error>>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = ResolverConfig::from_json(r#"{"default_persist_root": "./.synapsed-demo"}"#)?;
    let resolver = Arc::new(StorageResolver::from_config(&config));

    // Example 1: In-memory storage survives re-resolution
    memory_example(&resolver).await?;

    // Example 2: Per-component factories and `persist = true`
    scoped_factory_example(resolver.clone(), &config).await?;

    // Example 3: Caller errors are distinguishable
    contract_violation_example(&resolver).await;

    resolver.dispose().await?;
    Ok(())
}

/// Example 1: In-memory storage
async fn memory_example(resolver: &StorageResolver) -> Result<()> {
    println!("=== Memory Storage Example ===");

    let users = resolver.resolve("users", None).await?;
    let value = serde_json::json!({ "name": "Alice", "role": "admin" });
    users.put(b"user:123", &serde_json::to_vec(&value)?).await?;

    // Same namespace, same store
    let again = resolver.resolve("users", None).await?;
    if let Some(stored) = again.get(b"user:123").await? {
        let user: serde_json::Value = serde_json::from_slice(&stored)?;
        println!("Retrieved user: {user}");
    }
    Ok(())
}

/// Example 2: Scoped factories
async fn scoped_factory_example(resolver: Arc<StorageResolver>, config: &ResolverConfig) -> Result<()> {
    println!("=== Scoped Factory Example ===");

    let kv = ScopedStorageFactory::from_config(resolver, "kv", config);
    let persisted = kv.storage("sessions", Some(&Persist::Flag(true))).await?;
    persisted.put(b"token", b"abc").await?;

    if let Some(file) = persisted.as_file() {
        println!("Sessions stored under {}", file.root().display());
    }
    Ok(())
}

/// Example 3: Boolean directives must be normalised before resolution
async fn contract_violation_example(resolver: &StorageResolver) {
    println!("=== Contract Violation Example ===");

    match resolver.resolve("users", Some(&Persist::Flag(true))).await {
        Err(err) if err.is_contract_violation() => println!("Rejected as expected: {err}"),
        Err(err) => println!("Unexpected error: {err}"),
        Ok(_) => println!("Unexpectedly resolved"),
    }
}
