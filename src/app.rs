use log::{error, info};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tauri::{Emitter, Manager};
use tokio::process::Command;
use tokio::sync::{Mutex, OnceCell};

use crate::engine::{Context, Engine, Reporter};
use crate::operations::{
    AudioFormat, Flip, MediaKind, Operation, OperationDescriptor, OperationKind, Resolution,
    VideoFormat, OPERATIONS,
};
use crate::output::Output;
use crate::progress::ProgressState;
use crate::session::{SelectedFile, Session};
use crate::utils::capitalize_first_letter;
use crate::Settings;

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationInfo {
    #[serde(flatten)]
    pub descriptor: &'static OperationDescriptor,
    pub emoji: &'static str,
    /// Choices for the operation's option panel, empty when it has none.
    pub options: Vec<String>,
    /// The operation as the form starts out.
    pub defaults: Operation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path: String,
    pub name: String,
    pub display_name: String,
    pub size: String,
    pub kind: Option<MediaKind>,
    pub emoji: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputInfo {
    pub path: String,
    pub file_name: String,
    pub mime: String,
    pub size: String,
    /// Inline preview for image results.
    pub preview: Option<String>,
}

impl From<&SelectedFile> for FileInfo {
    fn from(file: &SelectedFile) -> Self {
        Self {
            path: file.path.to_string_lossy().to_string(),
            name: file.name.clone(),
            display_name: file.display_name(),
            size: file.display_size(),
            kind: file.kind,
            emoji: file.emoji(),
        }
    }
}

impl OutputInfo {
    fn new(output: &Output, path: PathBuf) -> Self {
        Self {
            path: path.to_string_lossy().to_string(),
            file_name: output.file_name.clone(),
            mime: output.mime.clone(),
            size: output.size(),
            preview: (output.kind == MediaKind::Image).then(|| output.data_url()),
        }
    }
}

fn option_labels(kind: OperationKind) -> Vec<String> {
    match kind {
        OperationKind::ConvertVideo => VideoFormat::ALL.iter().map(|f| f.extension().to_string()).collect(),
        OperationKind::ConvertAudio => AudioFormat::ALL.iter().map(|f| f.name().to_string()).collect(),
        OperationKind::RescaleVideo => Resolution::ALL.iter().map(|r| r.label()).collect(),
        OperationKind::FlipVideo => Flip::ALL.iter().map(|f| f.name().to_string()).collect(),
        _ => Vec::new(),
    }
}

// ============================================================================
// Global State
// ============================================================================

struct AppState {
    settings: Mutex<Settings>,
    engine: OnceCell<Engine>,
    session: Mutex<Session>,
}

impl AppState {
    fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
            engine: OnceCell::new(),
            session: Mutex::new(Session::new()),
        }
    }

    async fn engine(&self, settings: &Settings) -> Result<&Engine, String> {
        self.engine
            .get_or_try_init(|| Engine::from_settings(settings))
            .await
            .map_err(|e| e.to_string())
    }
}

/// Forwards session callbacks to the webview as events.
struct EventReporter {
    app: tauri::AppHandle,
}

impl Reporter for EventReporter {
    fn loading(&mut self, is_loading: bool) {
        let _ = self.app.emit("entropy://loading", is_loading);
    }

    fn progress(&mut self, state: &ProgressState) {
        let _ = self.app.emit("entropy://progress", state);
    }

    fn log(&mut self, line: &str) {
        let _ = self.app.emit("entropy://log", line);
    }

    fn notice(&mut self, message: &str) {
        let _ = self.app.emit("entropy://notice", message);
    }
}

// ============================================================================
// Utility Commands
// ============================================================================

#[tauri::command]
async fn get_app_version(app: tauri::AppHandle) -> Result<String, String> {
    info!("get_app_version called");
    Ok(app.package_info().version.to_string())
}

#[tauri::command]
async fn list_operations() -> Result<Vec<OperationInfo>, String> {
    info!("list_operations called");

    Ok(OPERATIONS
        .iter()
        .map(|descriptor| OperationInfo {
            descriptor,
            emoji: descriptor.icon.emoji(),
            options: option_labels(descriptor.kind),
            defaults: Operation::with_defaults(descriptor.kind),
        })
        .collect())
}

#[tauri::command]
async fn get_settings(app: tauri::AppHandle) -> Result<Settings, String> {
    info!("get_settings called");
    let state = app.state::<Arc<AppState>>();
    let settings = state.settings.lock().await;
    Ok(settings.clone())
}

#[tauri::command]
async fn save_settings(app: tauri::AppHandle, settings: Settings) -> Result<(), String> {
    info!("save_settings called with: {:?}", settings);
    let state = app.state::<Arc<AppState>>();
    settings.save().map_err(|e| e.to_string())?;
    *state.settings.lock().await = settings;
    Ok(())
}

// ============================================================================
// File Commands
// ============================================================================

#[tauri::command]
async fn select_file(app: tauri::AppHandle, kind: Option<MediaKind>) -> Result<Option<FileInfo>, String> {
    info!("select_file called for kind: {:?}", kind);

    use tauri_plugin_dialog::DialogExt;

    let mut builder = app.dialog().file();
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => vec![MediaKind::Video, MediaKind::Audio],
    };
    for kind in kinds {
        builder = builder.add_filter(capitalize_first_letter(kind.as_str()), kind.input_extensions());
    }

    let Some(picked) = builder.blocking_pick_file() else {
        return Ok(None);
    };
    let path = PathBuf::from(picked.to_string());

    let state = app.state::<Arc<AppState>>();
    let settings = state.settings.lock().await.clone();
    let mut reporter = EventReporter { app: app.clone() };

    let mut session = state.session.lock().await;
    let file = session
        .select_file(&settings, &mut reporter, &path)
        .map_err(|e| e.to_string())?;
    Ok(Some(FileInfo::from(file)))
}

#[tauri::command]
async fn clear_file(app: tauri::AppHandle) -> Result<(), String> {
    info!("clear_file called");

    let state = app.state::<Arc<AppState>>();
    let mut reporter = EventReporter { app: app.clone() };

    state.session.lock().await.clear(&mut reporter);
    Ok(())
}

// ============================================================================
// Conversion Commands
// ============================================================================

#[tauri::command]
async fn run_operation(app: tauri::AppHandle, operation: Operation) -> Result<Option<OutputInfo>, String> {
    info!("run_operation called with: {:?}", operation);

    let state = app.state::<Arc<AppState>>();
    let settings = state.settings.lock().await.clone();
    let engine = state.engine(&settings).await?;
    let mut reporter = EventReporter { app: app.clone() };
    let mut ctx = Context::new(&settings, engine, &mut reporter);

    let mut session = state.session.lock().await;
    let Some(output) = session.run(&mut ctx, &operation).await else {
        return Ok(None);
    };
    let Some(path) = Session::download(&mut ctx, &output).await else {
        return Ok(None);
    };

    Ok(Some(OutputInfo::new(&output, path)))
}

// ============================================================================
// Shell Commands
// ============================================================================

#[tauri::command]
async fn open_folder(folder_path: String) -> Result<(), String> {
    info!("open_folder called for: {}", folder_path);

    #[cfg(target_os = "windows")]
    {
        let mut cmd = Command::new("explorer");
        cmd.creation_flags(0x08000000);
        cmd.args(["/select,", &folder_path])
            .spawn()
            .map_err(|e| format!("Failed to open folder: {}", e))?;
    }

    #[cfg(target_os = "macos")]
    {
        Command::new("open")
            .args(["-R", &folder_path])
            .spawn()
            .map_err(|e| format!("Failed to open folder: {}", e))?;
    }

    #[cfg(target_os = "linux")]
    {
        let folder = PathBuf::from(&folder_path);
        let target = if folder.is_file() {
            folder.parent().map(|p| p.to_path_buf()).unwrap_or(folder)
        } else {
            folder
        };
        Command::new("xdg-open")
            .arg(&target)
            .spawn()
            .map_err(|e| format!("Failed to open folder: {}", e))?;
    }

    Ok(())
}

// ============================================================================
// Application Entry Point
// ============================================================================

pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_log::Builder::new()
            .target(tauri_plugin_log::Target::new(
                tauri_plugin_log::TargetKind::LogDir { file_name: Some("entropy".into()) },
            ))
            .build())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            info!("Entropy starting up...");
            let settings = Settings::load().unwrap_or_else(|e| {
                error!("Failed to load settings, using defaults: {}", e);
                Settings::default()
            });
            app.manage(Arc::new(AppState::new(settings)));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Utility commands
            get_app_version,
            list_operations,
            get_settings,
            save_settings,
            // File commands
            select_file,
            clear_file,
            // Conversion commands
            run_operation,
            // Shell commands
            open_folder,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
