//! Built-in tool set registered by the binary.
//!
//! The server core knows nothing about these: they are ordinary handlers
//! supplied through the public registration surface, and double as a worked
//! example of it. Two tools persist small JSON memory records across
//! sessions, and one resource reports the server's own status.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{json, Value};

use crate::handler::{async_handler, ContentBlock, HandlerFault};
use crate::registry::{
    ArgumentSchema, FieldKind, FieldSpec, Registry, RegistryError, ResourceDescriptor,
    ToolDescriptor,
};

/// URI of the built-in status resource.
pub const STATUS_URI: &str = "toolhost://status";

/// Registers the built-in tools and the status resource.
///
/// # Errors
///
/// Returns an error if any built-in name collides with an existing
/// registration.
pub fn register_builtins(
    registry: &mut Registry,
    server_name: &str,
    data_dir: &Path,
) -> Result<(), RegistryError> {
    register_store_memory(registry, data_dir.to_path_buf())?;
    register_retrieve_memory(registry, data_dir.to_path_buf())?;
    register_status_resource(registry, server_name.to_string(), data_dir.to_path_buf())?;
    Ok(())
}

fn register_store_memory(registry: &mut Registry, dir: PathBuf) -> Result<(), RegistryError> {
    let descriptor = ToolDescriptor::new(
        "store_memory",
        "Store a persistent memory record across sessions",
        ArgumentSchema::new(vec![
            FieldSpec::required("key", FieldKind::String).describe("Memory key/identifier"),
            FieldSpec::required("value", FieldKind::String).describe("Memory content to store"),
            FieldSpec::optional("category", FieldKind::String)
                .describe("Memory category (learning, preference, pattern, ...)")
                .with_default(json!("general")),
        ]),
    );

    registry.register_tool(
        descriptor,
        async_handler(move |args| {
            let dir = dir.clone();
            async move {
                let key = required_str(&args, "key")?;
                let value = required_str(&args, "value")?;
                let category = args.str("category").unwrap_or("general").to_string();

                let record = json!({
                    "key": key,
                    "value": value,
                    "category": category,
                    "stored_at": Utc::now().to_rfc3339(),
                });

                tokio::fs::create_dir_all(&dir).await?;
                let path = dir.join(record_filename(&key));
                tokio::fs::write(&path, serde_json::to_vec_pretty(&record)?).await?;

                Ok(vec![ContentBlock::text(format!(
                    "Stored memory `{key}` in category `{category}`"
                ))])
            }
        }),
    )
}

fn register_retrieve_memory(registry: &mut Registry, dir: PathBuf) -> Result<(), RegistryError> {
    let descriptor = ToolDescriptor::new(
        "retrieve_memory",
        "Retrieve stored memory records by key, category, or content substring",
        ArgumentSchema::new(vec![
            FieldSpec::optional("key", FieldKind::String)
                .describe("Specific memory key to retrieve"),
            FieldSpec::optional("category", FieldKind::String)
                .describe("Memory category to search"),
            FieldSpec::optional("pattern", FieldKind::String)
                .describe("Substring to search for in memory content"),
        ]),
    );

    registry.register_tool(
        descriptor,
        async_handler(move |args| {
            let dir = dir.clone();
            async move {
                if let Some(key) = args.str("key") {
                    return retrieve_by_key(&dir, key).await;
                }

                let category = args.str("category").map(ToString::to_string);
                let pattern = args.str("pattern").map(ToString::to_string);
                retrieve_matching(&dir, category.as_deref(), pattern.as_deref()).await
            }
        }),
    )
}

async fn retrieve_by_key(dir: &Path, key: &str) -> Result<Vec<ContentBlock>, HandlerFault> {
    let path = dir.join(record_filename(key));
    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => Ok(vec![ContentBlock::text(contents)]),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(vec![ContentBlock::text(
            format!("No memory stored under key `{key}`"),
        )]),
        Err(e) => Err(e.into()),
    }
}

async fn retrieve_matching(
    dir: &Path,
    category: Option<&str>,
    pattern: Option<&str>,
) -> Result<Vec<ContentBlock>, HandlerFault> {
    let mut matches: Vec<Value> = Vec::new();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(vec![ContentBlock::text("No memories stored yet")]);
        }
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        let Ok(contents) = tokio::fs::read_to_string(&path).await else {
            continue;
        };
        let Ok(record) = serde_json::from_str::<Value>(&contents) else {
            continue;
        };

        let category_matches =
            category.map_or(true, |wanted| record["category"].as_str() == Some(wanted));
        let pattern_matches = pattern.map_or(true, |needle| {
            record["value"]
                .as_str()
                .is_some_and(|value| value.contains(needle))
        });

        if category_matches && pattern_matches {
            matches.push(record);
        }
    }

    if matches.is_empty() {
        return Ok(vec![ContentBlock::text("No matching memories found")]);
    }

    // Deterministic order regardless of directory iteration order.
    matches.sort_by(|a, b| a["key"].as_str().cmp(&b["key"].as_str()));
    Ok(vec![ContentBlock::text(serde_json::to_string_pretty(
        &matches,
    )?)])
}

fn register_status_resource(
    registry: &mut Registry,
    server_name: String,
    dir: PathBuf,
) -> Result<(), RegistryError> {
    let descriptor = ResourceDescriptor::new(
        STATUS_URI,
        "Server status",
        "Server identity and session summary",
        "application/json",
    );
    let started_at = Utc::now().to_rfc3339();

    registry.register_resource(
        descriptor,
        Box::new(move |session| {
            let status = json!({
                "server": server_name,
                "version": env!("CARGO_PKG_VERSION"),
                "started_at": started_at,
                "session_entries": session.len(),
                "memory_dir": dir.display().to_string(),
            });
            Ok(serde_json::to_string_pretty(&status)?)
        }),
    )
}

/// Memory keys become filenames; anything outside `[A-Za-z0-9_-]` is
/// replaced so keys cannot escape the data directory.
fn record_filename(key: &str) -> String {
    let sanitised: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("memory_{sanitised}.json")
}

fn required_str(
    args: &crate::registry::ValidatedArguments,
    name: &str,
) -> Result<String, HandlerFault> {
    args.str(name)
        .map(ToString::to_string)
        .ok_or_else(|| HandlerFault::failed(format!("missing required field `{name}`")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry::{validate, UnknownFieldPolicy};
    use crate::session::SessionState;

    async fn call(
        registry: &Registry,
        session: &mut SessionState,
        tool: &str,
        arguments: Value,
    ) -> Vec<ContentBlock> {
        let registered = registry.lookup_tool(tool).unwrap();
        let args = validate(
            &registered.descriptor.schema,
            &arguments,
            UnknownFieldPolicy::Reject,
        )
        .unwrap();
        (registered.handler)(args, session).await.unwrap()
    }

    fn text_of(blocks: &[ContentBlock]) -> &str {
        let ContentBlock::Text { text } = &blocks[0] else {
            panic!("expected text block");
        };
        text
    }

    #[test]
    fn filenames_cannot_escape_the_data_dir() {
        assert_eq!(record_filename("notes/today"), "memory_notes_today.json");
        assert_eq!(record_filename("../../etc"), "memory______etc.json");
        assert_eq!(record_filename("plain-key_1"), "memory_plain-key_1.json");
    }

    #[tokio::test]
    async fn store_then_retrieve_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        register_builtins(&mut registry, "test", dir.path()).unwrap();
        let mut session = SessionState::new();

        let stored = call(
            &registry,
            &mut session,
            "store_memory",
            json!({"key": "greeting", "value": "hello there"}),
        )
        .await;
        assert!(text_of(&stored).contains("`greeting`"));
        assert!(text_of(&stored).contains("`general`"));

        let retrieved = call(
            &registry,
            &mut session,
            "retrieve_memory",
            json!({"key": "greeting"}),
        )
        .await;
        let record: Value = serde_json::from_str(text_of(&retrieved)).unwrap();
        assert_eq!(record["value"], "hello there");
        assert_eq!(record["category"], "general");
        assert!(record["stored_at"].is_string());
    }

    #[tokio::test]
    async fn retrieve_missing_key_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        register_builtins(&mut registry, "test", dir.path()).unwrap();
        let mut session = SessionState::new();

        let blocks = call(
            &registry,
            &mut session,
            "retrieve_memory",
            json!({"key": "absent"}),
        )
        .await;
        assert_eq!(text_of(&blocks), "No memory stored under key `absent`");
    }

    #[tokio::test]
    async fn retrieve_filters_by_category_and_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        register_builtins(&mut registry, "test", dir.path()).unwrap();
        let mut session = SessionState::new();

        for (key, value, category) in [
            ("a", "rust borrowing rules", "learning"),
            ("b", "prefers short replies", "preference"),
            ("c", "rust lifetimes", "learning"),
        ] {
            call(
                &registry,
                &mut session,
                "store_memory",
                json!({"key": key, "value": value, "category": category}),
            )
            .await;
        }

        let learning = call(
            &registry,
            &mut session,
            "retrieve_memory",
            json!({"category": "learning"}),
        )
        .await;
        let records: Vec<Value> = serde_json::from_str(text_of(&learning)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["key"], "a");
        assert_eq!(records[1]["key"], "c");

        let lifetimes = call(
            &registry,
            &mut session,
            "retrieve_memory",
            json!({"pattern": "lifetimes"}),
        )
        .await;
        let records: Vec<Value> = serde_json::from_str(text_of(&lifetimes)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["key"], "c");
    }

    #[tokio::test]
    async fn status_resource_reports_session_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        register_builtins(&mut registry, "status-test", dir.path()).unwrap();

        let mut session = SessionState::new();
        session.put("handle", 1_u8);

        let resource = registry.lookup_resource(STATUS_URI).unwrap();
        let body = (resource.reader)(&session).unwrap();
        let status: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(status["server"], "status-test");
        assert_eq!(status["session_entries"], 1);
    }
}
