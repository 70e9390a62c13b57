use std::env;
use std::sync::mpsc::Receiver;

use buddy_engine::{
    load_layout, resolve_app_paths, AppPaths, LayoutDef, LayoutError, LoopConfig, Scene,
    StartupError,
};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use super::chat::{ChatSession, ChatSettings, ChatWorker, CompletionClient, ScriptedCompletion};
use super::companion::{CompanionParts, CompanionScene};
use super::console::spawn_stdin_reader;
use super::http_completion::HttpCompletion;
use super::navigation::{NavigationError, PageNavigator};
use super::quiz::{load_questions, Quiz};
use super::settings::{load_settings, SettingsError};

const MIN_WINDOW_EDGE_PX: u32 = 160;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("failed to load layout: {0}")]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Buddy Startup ===");

    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), "project_root_resolved");

    let console = match spawn_stdin_reader() {
        Ok(receiver) => Some(receiver),
        Err(error) => {
            warn!(error = %error, "console_unavailable");
            None
        }
    };
    wire_app(&paths, console, true)
}

fn wire_app(
    paths: &AppPaths,
    console: Option<Receiver<String>>,
    echo_to_stdout: bool,
) -> Result<AppWiring, BootstrapError> {
    let settings = load_settings(&paths.config_file())?;
    let layout = load_layout(&paths.layout_file())?;
    info!(
        page_count = layout.pages.len(),
        global_panel_count = layout.global_panels.len(),
        arena_width = layout.arena.width(),
        arena_height = layout.arena.height(),
        "layout_loaded"
    );

    let navigator = PageNavigator::new(layout.pages.iter().map(|page| page.name.clone()).collect())?;

    // Buddy still runs without a quiz; the quiz page just says so.
    let questions = match load_questions(&paths.questions_file()) {
        Ok(questions) => questions,
        Err(error) => {
            error!(error = %error, "questions_unavailable");
            Vec::new()
        }
    };

    let api_key = api_key_from_env(&settings.chat.api_key_env);
    let client = completion_client(&settings.chat, api_key);
    let chat = match ChatWorker::spawn(ChatSession::new(client, &settings.chat)) {
        Ok(worker) => Some(worker),
        Err(error) => {
            warn!(error = %error, "chat_worker_spawn_failed");
            None
        }
    };

    let config = loop_config_for(&layout);
    let scene = CompanionScene::new(CompanionParts {
        layout,
        buddy_config: settings.buddy,
        wander_seed: settings.wander_seed,
        navigator,
        quiz: Quiz::new(questions),
        chat,
        console,
        echo_to_stdout,
    });

    Ok(AppWiring {
        config,
        scene: Box::new(scene),
    })
}

fn api_key_from_env(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The HTTP client when a key is present, otherwise the offline replies.
fn completion_client(settings: &ChatSettings, api_key: Option<String>) -> Box<dyn CompletionClient> {
    let scripted = || -> Box<dyn CompletionClient> {
        Box::new(ScriptedCompletion::new(settings.scripted_replies.clone()))
    };
    let Some(api_key) = api_key else {
        warn!(
            env_var = settings.api_key_env.as_str(),
            "chat_api_key_missing_using_scripted_replies"
        );
        return scripted();
    };
    match HttpCompletion::new(settings, api_key) {
        Ok(client) => {
            info!(
                endpoint = settings.endpoint.as_str(),
                model = settings.model.as_str(),
                "chat_http_client_ready"
            );
            Box::new(client)
        }
        Err(error) => {
            warn!(error = %error, "chat_http_client_unavailable_using_scripted_replies");
            scripted()
        }
    }
}

/// One arena unit per window pixel, never smaller than a usable window.
fn loop_config_for(layout: &LayoutDef) -> LoopConfig {
    let edge = |units: f32| (units.round() as u32).max(MIN_WINDOW_EDGE_PX);
    LoopConfig {
        window_width: edge(layout.arena.width()),
        window_height: edge(layout.arena.height()),
        ..LoopConfig::default()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use std::fs;

    use buddy_engine::{app_paths_for_root, LayoutErrorCode};
    use tempfile::TempDir;

    use super::*;
    use crate::app::chat::{ChatError, ChatRequest};

    fn empty_request(settings: &ChatSettings) -> ChatRequest {
        ChatRequest {
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            messages: Vec::new(),
        }
    }

    #[test]
    fn without_api_key_chat_uses_scripted_replies() {
        let settings = ChatSettings {
            scripted_replies: vec!["offline hello".to_string()],
            ..ChatSettings::default()
        };
        let mut client = completion_client(&settings, None);
        assert_eq!(
            client.complete(&empty_request(&settings)).expect("reply"),
            "offline hello"
        );
    }

    #[test]
    fn with_api_key_chat_goes_over_http() {
        let settings = ChatSettings {
            endpoint: "not a url".to_string(),
            scripted_replies: vec!["offline hello".to_string()],
            ..ChatSettings::default()
        };
        let mut client = completion_client(&settings, Some("test-key".to_string()));
        assert!(matches!(
            client.complete(&empty_request(&settings)),
            Err(ChatError::Request(_))
        ));
    }

    #[test]
    fn unset_api_key_variable_counts_as_missing() {
        let var = "BUDDY_TEST_UNSET_CHAT_KEY_VAR";
        assert_eq!(api_key_from_env(var), None);
    }

    const LAYOUT: &str = r#"<Layout>
        <Arena width="640" height="100"/>
        <Buddy width="20" height="20"/>
        <Page name="home"/>
        <Page name="chat" wander="false"/>
    </Layout>"#;

    fn project_with(layout: Option<&str>, settings: Option<&str>) -> (TempDir, AppPaths) {
        let temp = TempDir::new().expect("temp");
        let paths = app_paths_for_root(temp.path().to_path_buf());
        fs::create_dir_all(&paths.assets_dir).expect("assets dir");
        if let Some(layout) = layout {
            fs::write(paths.layout_file(), layout).expect("layout");
        }
        if let Some(settings) = settings {
            fs::write(paths.config_file(), settings).expect("settings");
        }
        (temp, paths)
    }

    #[test]
    fn wires_scene_with_window_sized_from_arena() {
        let (_temp, paths) = project_with(Some(LAYOUT), None);
        let wiring = wire_app(&paths, None, false).expect("wiring");
        assert_eq!(wiring.config.window_width, 640);
        assert_eq!(wiring.config.window_height, MIN_WINDOW_EDGE_PX);
        assert_eq!(wiring.config.target_tps, LoopConfig::default().target_tps);
    }

    #[test]
    fn missing_layout_is_fatal() {
        let (_temp, paths) = project_with(None, None);
        match wire_app(&paths, None, false) {
            Err(BootstrapError::Layout(error)) => assert_eq!(error.code, LayoutErrorCode::ReadFile),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected layout error"),
        }
    }

    #[test]
    fn broken_settings_are_fatal() {
        let (_temp, paths) = project_with(Some(LAYOUT), Some(r#"{"buddy":{"gravity":-1.0}}"#));
        assert!(matches!(
            wire_app(&paths, None, false),
            Err(BootstrapError::Settings(SettingsError::Invalid { .. }))
        ));
    }
}
