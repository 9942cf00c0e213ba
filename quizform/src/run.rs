use std::{cell::Cell, path::Path, rc::Rc};

use anyhow::{Context, anyhow};
pub use cursive;
use cursive::{
    Cursive, CursiveExt,
    event::{Event, Key},
    traits::Scrollable,
    views::Dialog,
};
use schemars::JsonSchema;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    data::{Model, SchemaRoot},
    form::{Form, on_change},
    ui::{FormHost, form_view, init_ui_logger, show_error},
};

type Check = Box<dyn Fn(&Model) -> anyhow::Result<()>>;

/// Cursive user data of the configuration editor.
struct ConfigEditor {
    form: Form,
    dirty: Rc<Cell<bool>>,
    check: Check,
    saved: bool,
}

impl FormHost for ConfigEditor {
    fn form_mut(&mut self) -> &mut Form {
        &mut self.form
    }
}

/// Run the configuration editor workflow for a typed config.
///
/// When `always_use_ui` is false and the config file can be parsed,
/// the parsed config is returned without launching the UI. Otherwise a form
/// generated from the type's JSON Schema is shown; if the user saves, the
/// edited config is written back in the file's format and returned.
///
/// # Errors
///
/// Returns errors when schema conversion, parsing, or I/O fails.
pub async fn run<C>(config_path: impl AsRef<Path>, always_use_ui: bool) -> anyhow::Result<Option<C>>
where
    C: JsonSchema + DeserializeOwned + Serialize + 'static,
{
    let config_path = config_path.as_ref();
    let content = tokio::fs::read_to_string(config_path)
        .await
        .unwrap_or_default();
    let ext = extension(config_path);

    if let Ok(c) = to_typed::<C>(&content, &ext)
        && !always_use_ui
    {
        return Ok(Some(c));
    }

    let schema = serde_json::to_value(schemars::schema_for!(C))?;
    let root = SchemaRoot::from_json_schema(&schema)?;
    let check: Check = Box::new(|model: &Model| {
        serde_json::from_value::<C>(model.to_json())?;
        Ok(())
    });

    let Some(model) = edit_in_ui(&root, initial_model(&content, &ext), check)? else {
        return Ok(None);
    };

    let c: C = serde_json::from_value(model.into_json())?;
    let content = to_text(&c, &ext)?;
    tokio::fs::write(config_path, content)
        .await
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    Ok(Some(c))
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn to_typed<C: DeserializeOwned>(s: &str, ext: &str) -> anyhow::Result<C> {
    let c = match ext {
        "json" => serde_json::from_str::<C>(s)?,
        "toml" => toml::from_str::<C>(s)?,
        _ => {
            anyhow::bail!("unsupported config file extension: {ext}");
        }
    };
    Ok(c)
}

fn to_text<C: Serialize>(c: &C, ext: &str) -> anyhow::Result<String> {
    let s = match ext {
        "json" => serde_json::to_string_pretty(c)?,
        "toml" => toml::to_string_pretty(c)?,
        _ => {
            anyhow::bail!("unsupported config file extension: {ext}");
        }
    };
    Ok(s)
}

/// Current file content as a model; unreadable content starts empty.
fn initial_model(content: &str, ext: &str) -> Model {
    let parsed = match ext {
        "json" => serde_json::from_str::<serde_json::Value>(content).map_err(anyhow::Error::from),
        "toml" => toml::from_str::<toml::Value>(content)
            .map_err(anyhow::Error::from)
            .and_then(|v| serde_json::to_value(v).map_err(anyhow::Error::from)),
        _ => Err(anyhow!("unsupported config file extension: {ext}")),
    };
    match parsed.and_then(|v| Model::try_from(v).map_err(anyhow::Error::from)) {
        Ok(model) => model,
        Err(e) => {
            debug!("starting from an empty configuration: {e}");
            Model::new()
        }
    }
}

fn edit_in_ui(root: &SchemaRoot, model: Model, check: Check) -> anyhow::Result<Option<Model>> {
    let dirty = Rc::new(Cell::new(false));
    let form = Form::new(root, model, {
        let dirty = dirty.clone();
        on_change(move |_| dirty.set(true))
    });
    let title = root
        .title
        .clone()
        .unwrap_or_else(|| "Configuration".to_string());
    let body = form_view::<ConfigEditor>(&form.view());

    init_ui_logger();
    let mut siv = Cursive::default();

    siv.set_user_data(ConfigEditor {
        form,
        dirty,
        check,
        saved: false,
    });

    siv.add_global_callback(Event::CtrlChar('s'), handle_save);
    siv.add_global_callback(Key::Esc, handle_quit);
    siv.add_global_callback('~', Cursive::toggle_debug_console);
    siv.add_fullscreen_layer(
        Dialog::around(body.scrollable())
            .title(title)
            .button("Save", handle_save)
            .button("Quit", handle_quit),
    );

    siv.run();

    let editor = siv
        .take_user_data::<ConfigEditor>()
        .ok_or_else(|| anyhow!("configuration editor state lost"))?;
    if !editor.saved {
        return Ok(None);
    }
    Ok(Some(editor.form.into_model()))
}

fn handle_save(siv: &mut Cursive) {
    let checked = siv.with_user_data(|editor: &mut ConfigEditor| {
        editor.form.flush();
        (editor.check)(editor.form.model())
    });
    match checked {
        Some(Ok(())) => {
            if let Some(editor) = siv.user_data::<ConfigEditor>() {
                editor.saved = true;
            }
            siv.quit();
        }
        Some(Err(e)) => show_error(siv, "Invalid configuration", format!("{e:#}")),
        None => siv.quit(),
    }
}

fn handle_quit(siv: &mut Cursive) {
    let dirty = siv
        .with_user_data(|editor: &mut ConfigEditor| editor.dirty.get())
        .unwrap_or(false);
    if !dirty {
        siv.quit();
        return;
    }
    siv.add_layer(
        Dialog::text("Discard unsaved changes?")
            .button("Discard", |s| s.quit())
            .dismiss_button("Back"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn test_run_returns_parsed_config_without_ui() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.toml");
        tokio::fs::write(&path, "name = \"quiz\"\ncount = 3\n")
            .await
            .unwrap();

        let c = run::<Sample>(&path, false).await.unwrap();
        assert_eq!(
            c,
            Some(Sample {
                name: "quiz".into(),
                count: 3
            })
        );
    }

    #[test]
    fn test_initial_model_tolerates_garbage() {
        assert!(initial_model("not json", "json").is_empty());
        assert!(initial_model("", "toml").is_empty());
        let m = initial_model("count = 3", "toml");
        assert_eq!(m.get("count"), Some(&serde_json::json!(3)));
        assert!(initial_model("{}", "yaml").is_empty());
    }

    #[test]
    fn test_text_roundtrip_by_extension() {
        let s = Sample {
            name: "a".into(),
            count: 1,
        };
        let toml = to_text(&s, "toml").unwrap();
        assert_eq!(to_typed::<Sample>(&toml, "toml").unwrap(), s);
        let json = to_text(&s, "json").unwrap();
        assert_eq!(to_typed::<Sample>(&json, "json").unwrap(), s);
        assert!(to_text(&s, "ini").is_err());
    }
}
