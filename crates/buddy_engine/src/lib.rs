use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod geometry;
pub mod layout;
pub mod physics;

pub use app::{
    arena_to_screen, screen_to_arena, run_app, AppError, BuddyVisual, InputAction, InputSnapshot,
    LoopConfig, PanelVisual, Renderer, Scene, SceneCommand, SceneWorld, Viewport,
    SLOW_FRAME_ENV_VAR,
};
pub use geometry::{Rect, Vec2};
pub use layout::{
    load_layout, parse_layout, BuddyDef, LayoutDef, LayoutError, LayoutErrorCode, PageDef,
    PanelDef, SourceLocation,
};
pub use physics::{
    Buddy, BuddyConfig, Collidable, ConfigError, LocomotionState, ObstacleProvider,
    ObstacleRegistry,
};

pub const ROOT_ENV_VAR: &str = "BUDDY_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
}

impl AppPaths {
    pub fn config_file(&self) -> PathBuf {
        self.assets_dir.join("buddy.json")
    }

    pub fn layout_file(&self) -> PathBuf {
        self.assets_dir.join("layout.xml")
    }

    pub fn questions_file(&self) -> PathBuf {
        self.assets_dir.join("questions.txt")
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "BUDDY_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/buddy\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    Ok(app_paths_for_root(root))
}

pub fn app_paths_for_root(root: PathBuf) -> AppPaths {
    let assets_dir = root.join("assets");
    AppPaths { root, assets_dir }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            find_root_above(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
