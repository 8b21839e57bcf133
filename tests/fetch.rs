use hfspaces::space::{FetchError, LocalFetcher, SourceFetcher};
use hfspaces::{ApplicationModel, Error, Settings};
use std::fs;
use tempfile::TempDir;

const APP: &str = r#"
import gradio as gr

def reverse(text):
    return text[::-1]

gr.Interface(reverse, gr.Textbox(placeholder="Type here"), "text").launch()
"#;

#[test]
fn builds_a_model_from_a_local_checkout() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("src/app.py"), APP).unwrap();

    let settings = Settings {
        ws_host: "spaces.test".to_string(),
        ..Settings::builtin()
    };
    let fetcher = LocalFetcher::new(temp.path());
    let model = ApplicationModel::build("team_x", "text_tools", "src/app.py", &fetcher, &settings).unwrap();

    assert_eq!(model.owner(), "team_x");
    assert_eq!(model.endpoint(), "wss://team-x-text-tools.spaces.test/queue/join");
    assert_eq!(model.schemas().len(), 1);
    let input = &model.schemas()[0].inputs[0];
    assert_eq!(input.component_type, "Textbox");
    assert_eq!(input.placeholder.as_ref().and_then(|p| p.as_str()), Some("Type here"));
}

#[test]
fn missing_files_are_fetch_errors() {
    let temp = TempDir::new().unwrap();
    let fetcher = LocalFetcher::new(temp.path());

    assert!(matches!(
        fetcher.fetch("o", "a", "app.py"),
        Err(FetchError::Io { .. })
    ));

    let result = ApplicationModel::build("o", "a", "app.py", &fetcher, &Settings::builtin());
    assert!(matches!(result, Err(Error::Fetch(_))));
}

#[test]
fn unparsable_sources_are_analysis_errors() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("app.py"), "def broken(:\n    pass\n").unwrap();

    let fetcher = LocalFetcher::new(temp.path());
    let result = ApplicationModel::build("o", "a", "app.py", &fetcher, &Settings::builtin());
    assert!(matches!(result, Err(Error::Analyzer(_))));
}

#[test]
fn models_serialize_for_the_cli() {
    let model = ApplicationModel::from_source("o", "a", APP, &Settings::builtin()).unwrap();
    let json = serde_json::to_value(&model).unwrap();
    assert_eq!(json["endpoint"], "wss://o-a.hf.space/queue/join");
    assert_eq!(json["schemas"][0]["fn_index"], 0);
    assert_eq!(json["schemas"][0]["trigger"], "gr.Interface");
    assert_eq!(json["schemas"][0]["inputs"][0]["expected_datatype"], "string");
}
