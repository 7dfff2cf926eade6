//! Hot-reload of player tuning.
//!
//! Watches a RON tuning file with `notify`:
//! - reloads on modify/create events for the watched file name
//! - validates before applying, keeping the last good tuning on failure
//! - reports each attempt as a [`TuningReloadEvent`]

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};

use crate::engine::plugin::CaveEngineResource;
use crate::error::{CaveError, Result};
use crate::player::PlayerTuning;

/// Read and validate a tuning file
pub fn load_tuning(path: impl AsRef<Path>) -> Result<PlayerTuning> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| CaveError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    PlayerTuning::from_ron_str(&text)
}

/// File watcher for one tuning file
pub struct TuningWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
    receiver: Arc<Mutex<Receiver<notify::Result<Event>>>>,
    current: PlayerTuning,
    reload_count: u32,
}

impl TuningWatcher {
    /// Load the file once and start watching its directory
    pub fn watch(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let current = load_tuning(&path)?;

        let (tx, rx) = channel();
        let mut watcher = notify::recommended_watcher(tx).map_err(|e| CaveError::Watch(e.to_string()))?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| CaveError::Watch(e.to_string()))?;

        info!("Hot-reload enabled for {:?}", path);
        Ok(Self {
            path,
            _watcher: watcher,
            receiver: Arc::new(Mutex::new(rx)),
            current,
            reload_count: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last tuning that loaded and validated
    pub fn current(&self) -> &PlayerTuning {
        &self.current
    }

    pub fn reload_count(&self) -> u32 {
        self.reload_count
    }

    /// Drain pending file events. Returns the outcome of a reload when at
    /// least one event touched the watched file.
    pub fn poll(&mut self) -> Option<Result<PlayerTuning>> {
        let touched = {
            let receiver = self.receiver.lock().ok()?;
            let mut touched = false;
            while let Ok(result) = receiver.try_recv() {
                match result {
                    Ok(event) => touched |= is_tuning_event(&event, &self.path),
                    Err(e) => warn!("File watcher error: {}", e),
                }
            }
            touched
        };
        if !touched {
            return None;
        }

        let result = load_tuning(&self.path);
        match &result {
            Ok(tuning) => {
                self.current = tuning.clone();
                self.reload_count += 1;
                info!("Tuning reloaded (count: {})", self.reload_count);
            }
            Err(e) => error!("Tuning reload failed, keeping previous values: {}", e),
        }
        Some(result)
    }
}

/// Whether a filesystem event modifies or recreates the watched file
pub fn is_tuning_event(event: &Event, watched: &Path) -> bool {
    let Some(name) = watched.file_name().map(OsString::from) else {
        return false;
    };
    let relevant_kind = event.kind.is_modify() || event.kind.is_create();
    relevant_kind && event.paths.iter().any(|p| p.file_name() == Some(name.as_os_str()))
}

pub struct HotReloadPlugin {
    pub path: PathBuf,
}

impl Plugin for HotReloadPlugin {
    fn build(&self, app: &mut App) {
        let mut state = HotReloadState::default();
        match TuningWatcher::watch(self.path.clone()) {
            Ok(watcher) => {
                state.enabled = true;
                state.watched_file = Some(self.path.clone());
                app.insert_resource(WatcherResource(watcher));
            }
            Err(e) => {
                warn!("Tuning hot-reload disabled: {}", e);
                state.last_error = Some(e.to_string());
            }
        }
        app.insert_resource(state)
            .add_event::<TuningReloadEvent>()
            .add_systems(Update, (poll_tuning_file, apply_tuning_reloads).chain());
    }
}

#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct HotReloadState {
    pub enabled: bool,
    pub watched_file: Option<PathBuf>,
    pub reload_count: u32,
    pub last_reload_success: bool,
    pub last_error: Option<String>,
}

#[derive(Event, Debug, Clone)]
pub struct TuningReloadEvent {
    pub path: PathBuf,
    pub tuning: Option<PlayerTuning>,
    pub error: Option<String>,
}

#[derive(Resource)]
struct WatcherResource(TuningWatcher);

fn poll_tuning_file(
    watcher: Option<ResMut<WatcherResource>>,
    mut state: ResMut<HotReloadState>,
    mut events: EventWriter<TuningReloadEvent>,
) {
    let Some(mut watcher) = watcher else {
        return;
    };
    let Some(result) = watcher.0.poll() else {
        return;
    };
    let path = watcher.0.path().to_path_buf();
    match result {
        Ok(tuning) => {
            state.reload_count += 1;
            state.last_reload_success = true;
            state.last_error = None;
            events.send(TuningReloadEvent {
                path,
                tuning: Some(tuning),
                error: None,
            });
        }
        Err(e) => {
            state.last_reload_success = false;
            state.last_error = Some(e.to_string());
            events.send(TuningReloadEvent {
                path,
                tuning: None,
                error: Some(e.to_string()),
            });
        }
    }
}

fn apply_tuning_reloads(mut events: EventReader<TuningReloadEvent>, engine: Option<ResMut<CaveEngineResource>>) {
    let Some(mut engine) = engine else {
        events.clear();
        return;
    };
    for event in events.read() {
        if let Some(tuning) = &event.tuning {
            if let Err(e) = engine.0.apply_tuning(tuning.clone()) {
                error!("Rejected reloaded tuning: {}", e);
            }
        }
    }
}
