//! Command implementations behind the CLI.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use quizform::data::{SchemaError, SchemaRoot};
use tokio::runtime::Handle;

use crate::{
    client::QuizClient,
    config::AppConfig,
    ctx::{AppShell, PAGE_KEY, USER_KEY, default_user},
    store::{FileStore, Storage},
    ui,
};

/// Builtin user profile schema.
pub const USER_SCHEMA: &str = include_str!("../assets/user-schema.json");

/// Load the user profile schema from `path`, or the builtin one.
pub fn user_schema(path: Option<&Path>) -> Result<SchemaRoot, SchemaError> {
    match path {
        Some(path) => SchemaRoot::from_path(path),
        None => SchemaRoot::from_str_with_ext(USER_SCHEMA, "json"),
    }
}

/// Data directory of the application (`~/.local/share/quizapp/` on Linux).
pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir()
        .ok_or_else(|| anyhow!("cannot determine the user data directory"))?
        .join("quizapp");
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir)
}

/// Send log records to `log_path`, since the terminal belongs to the UI.
///
/// With the `ui-log` feature the cursive debug console is used instead.
pub fn init_logging(level: log::LevelFilter, log_path: &Path) -> anyhow::Result<()> {
    if cfg!(feature = "ui-log") {
        return Ok(());
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(())
}

/// Run the interactive quiz against the configured server.
pub async fn run_quiz(config: &AppConfig, schema: SchemaRoot, store_path: PathBuf) -> anyhow::Result<()> {
    let client = QuizClient::new(&config.server)?;
    let default = default_user(&config.default_user_id);
    let runtime = Handle::current();
    info!(
        "starting quiz against {} with store {}",
        client.base(),
        store_path.display()
    );

    // The session holds `Rc`s, so it is built on the UI thread.
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let storage = Storage::new(FileStore::open(&store_path)?);
        let shell = AppShell::new(&schema, storage, default)?;
        let mut shell = ui::run(shell, client, runtime)?;
        shell.save_user()?;
        Ok(())
    })
    .await??;
    Ok(())
}

/// Forget the saved profile and page.
pub fn reset(store_path: &Path) -> anyhow::Result<()> {
    let mut storage = Storage::new(FileStore::open(store_path)?);
    storage.remove(USER_KEY)?;
    storage.remove(PAGE_KEY)?;
    Ok(())
}

/// Saved entries of the store.
pub fn show(store_path: &Path) -> anyhow::Result<Vec<(String, String)>> {
    let storage = Storage::new(FileStore::open(store_path)?);
    Ok(storage.entries()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizform::data::FieldSchema;
    use serde_json::json;

    #[test]
    fn test_builtin_user_schema() {
        let schema = user_schema(None).unwrap();
        assert_eq!(schema.title.as_deref(), Some("User Profile"));
        let ids: Vec<_> = schema.fields.iter().map(|f| f.id()).collect();
        assert_eq!(ids, ["id", "name", "prefs"]);
        assert_eq!(schema.get("id").unwrap().name(), "User ID");

        let Some(FieldSchema::Group(prefs)) = schema.get("prefs") else {
            panic!("prefs should be a group");
        };
        match &prefs.fields[1] {
            FieldSchema::Choice(state) => {
                assert_eq!(state.options, ["Alaska", "California", "Colorado"])
            }
            other => panic!("unexpected field {other:?}"),
        }
    }

    #[test]
    fn test_user_schema_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.toml");
        fs::write(&path, "[[schema]]\nid = \"nick\"\nname = \"Nickname\"\n").unwrap();

        let schema = user_schema(Some(&path)).unwrap();
        assert_eq!(schema.fields.len(), 1);
        assert_eq!(schema.get("nick").unwrap().name(), "Nickname");
    }

    #[test]
    fn test_reset_and_show() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        {
            let mut storage = Storage::new(FileStore::open(&path).unwrap());
            storage.save(USER_KEY, &json!({"id": "7"})).unwrap();
            storage.save(PAGE_KEY, "question").unwrap();
            storage.save("other", &1).unwrap();
        }

        let entries = show(&path).unwrap();
        assert_eq!(
            entries,
            vec![
                ("other".to_string(), "1".to_string()),
                ("page".to_string(), "\"question\"".to_string()),
                ("user".to_string(), r#"{"id":"7"}"#.to_string()),
            ]
        );

        reset(&path).unwrap();
        assert_eq!(
            show(&path).unwrap(),
            vec![("other".to_string(), "1".to_string())]
        );
    }
}
