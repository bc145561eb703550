//! Media player capability and the default external-process implementation.
//!
//! Playback is fire-and-forget: `play` returns as soon as the video is
//! launched. Completion is reported through the player's own event callback.

use crate::error::PlayerError;
use crate::media::MediaItem;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use tracing::{info, warn};

/// Anything that can start playing a video without blocking.
pub trait MediaPlayer: Send {
    fn play(&mut self, item: &MediaItem) -> Result<(), PlayerError>;
}

/// Notifications emitted by a player from its own threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Started { name: String },
    /// The player process exited. Background audio has been stopped.
    Finished { name: String, success: bool },
    AudioFailed { name: String, error: String },
}

type EventCallback = Arc<dyn Fn(PlayerEvent) + Send + Sync>;

/// Launches an external command per video and loops background audio until it exits.
pub struct ExternalPlayer {
    command: String,
    args: Vec<String>,
    background_audio: Option<PathBuf>,
    on_event: EventCallback,
}

impl ExternalPlayer {
    pub fn new<F>(
        command: impl Into<String>,
        args: Vec<String>,
        background_audio: Option<PathBuf>,
        on_event: F,
    ) -> Self
    where
        F: Fn(PlayerEvent) + Send + Sync + 'static,
    {
        ExternalPlayer {
            command: command.into(),
            args,
            background_audio,
            on_event: Arc::new(on_event),
        }
    }

    fn start_audio(&self, name: &str) -> Option<LoopingAudio> {
        let path = self.background_audio.as_ref()?;
        match LoopingAudio::start(path) {
            Ok(audio) => {
                info!("Playing background audio: {}", path.display());
                Some(audio)
            }
            Err(e) => {
                warn!("Background audio for {} failed: {}", name, e);
                (self.on_event)(PlayerEvent::AudioFailed {
                    name: name.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }
}

impl MediaPlayer for ExternalPlayer {
    fn play(&mut self, item: &MediaItem) -> Result<(), PlayerError> {
        if !item.locator.exists() {
            return Err(PlayerError::MissingMedia(item.locator.clone()));
        }

        // Watcher first: every launched child gets waited on.
        let (watch_tx, watch_rx) = mpsc::channel::<(Child, Option<LoopingAudio>)>();
        let on_event = self.on_event.clone();
        let name = item.name.clone();
        thread::Builder::new()
            .name("playback-watch".into())
            .spawn(move || {
                let Ok((mut child, audio)) = watch_rx.recv() else {
                    return;
                };
                let success = match child.wait() {
                    Ok(status) => status.success(),
                    Err(e) => {
                        warn!("Lost track of player for {}: {}", name, e);
                        false
                    }
                };
                if let Some(audio) = audio {
                    audio.stop();
                    info!("Stopped background audio");
                }
                on_event(PlayerEvent::Finished { name, success });
            })
            .map_err(|source| PlayerError::Spawn {
                command: "playback-watch".to_string(),
                source,
            })?;

        let child = Command::new(&self.command)
            .args(&self.args)
            .arg(&item.locator)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| PlayerError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        info!("Playing video: {}", item.name);
        let audio = self.start_audio(&item.name);
        (self.on_event)(PlayerEvent::Started {
            name: item.name.clone(),
        });
        if watch_tx.send((child, audio)).is_err() {
            warn!("Playback watcher for {} is gone", item.name);
        }
        Ok(())
    }
}

/// Logs instead of playing. Used for dry runs.
#[derive(Debug, Default)]
pub struct LogPlayer;

impl MediaPlayer for LogPlayer {
    fn play(&mut self, item: &MediaItem) -> Result<(), PlayerError> {
        info!("Dry run: would play {} ({})", item.name, item.locator.display());
        Ok(())
    }
}

// ── Background audio ────────────────────────────────────────────────────────

/// An audio file looping on the default output device until stopped.
///
/// rodio's output stream is not `Send`, so it lives on its own thread.
pub struct LoopingAudio {
    stop_tx: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl LoopingAudio {
    /// Open the output device, decode `path` and start looping it.
    pub fn start(path: &Path) -> Result<Self, PlayerError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let path = path.to_path_buf();

        let handle = thread::Builder::new()
            .name("background-audio".into())
            .spawn(move || {
                let (_stream, stream_handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("Failed to open audio output: {}", e)));
                        return;
                    }
                };
                let sink = match open_looped(&stream_handle, &path) {
                    Ok(sink) => sink,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                // Stop on request or when the owner is gone.
                let _ = stop_rx.recv();
                sink.stop();
            })
            .map_err(|e| PlayerError::Audio(format!("cannot spawn audio thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(LoopingAudio {
                stop_tx,
                thread: Some(handle),
            }),
            Ok(Err(msg)) => {
                let _ = handle.join();
                Err(PlayerError::Audio(msg))
            }
            Err(_) => Err(PlayerError::Audio("audio thread exited early".to_string())),
        }
    }

    /// Stop the loop and wait for the audio thread to finish.
    pub fn stop(mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LoopingAudio {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}

fn open_looped(handle: &OutputStreamHandle, path: &Path) -> Result<Sink, String> {
    let file = File::open(path).map_err(|e| format!("Cannot open '{}': {}", path.display(), e))?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| format!("Cannot decode '{}': {}", path.display(), e))?;
    let sink = Sink::try_new(handle).map_err(|e| format!("Failed to create audio sink: {}", e))?;
    sink.append(source.repeat_infinite());
    sink.play();
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn collecting_player(command: &str) -> (ExternalPlayer, Arc<Mutex<Vec<PlayerEvent>>>) {
        let events: Arc<Mutex<Vec<PlayerEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let player = ExternalPlayer::new(command, Vec::new(), None, move |evt| {
            sink.lock().unwrap().push(evt);
        });
        (player, events)
    }

    fn channel_player(
        command: &str,
        background_audio: Option<PathBuf>,
    ) -> (ExternalPlayer, mpsc::Receiver<PlayerEvent>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let player = ExternalPlayer::new(command, Vec::new(), background_audio, move |evt| {
            let _ = tx.lock().unwrap().send(evt);
        });
        (player, rx)
    }

    #[test]
    fn missing_media_is_rejected_before_launch() {
        let (mut player, events) = collecting_player("true");
        let item = MediaItem::new("ghost.mp4", "/nonexistent/ghost.mp4");
        let err = player.play(&item).unwrap_err();
        assert!(matches!(err, PlayerError::MissingMedia(_)));
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_command_reports_spawn_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let (mut player, rx) = channel_player("__corebot_no_such_player__", None);
        let err = player.play(&MediaItem::from_path(file.path())).unwrap_err();
        assert!(matches!(err, PlayerError::Spawn { .. }));
        // The idle watcher exits without reporting anything.
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn finished_event_arrives_after_process_exits() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let (mut player, rx) = channel_player("true", None);
        let item = MediaItem::from_path(file.path());
        player.play(&item).unwrap();

        let started = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(started, PlayerEvent::Started { name: item.name.clone() });
        let finished = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            finished,
            PlayerEvent::Finished {
                name: item.name.clone(),
                success: true
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn broken_background_audio_still_plays_the_video() {
        let video = tempfile::NamedTempFile::new().unwrap();
        let not_audio = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(not_audio.path(), b"not an audio file").unwrap();

        for audio in [not_audio.path().to_path_buf(), PathBuf::from("/nonexistent/corebot.mp3")] {
            let (mut player, rx) = channel_player("true", Some(audio));
            let item = MediaItem::from_path(video.path());
            assert!(player.play(&item).is_ok());

            let failed = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert!(matches!(&failed, PlayerEvent::AudioFailed { name, .. } if *name == item.name));
            let started = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(started, PlayerEvent::Started { name: item.name.clone() });
            let finished = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(
                finished,
                PlayerEvent::Finished {
                    name: item.name.clone(),
                    success: true
                }
            );
        }
    }

    #[test]
    fn looping_audio_missing_file_errors() {
        // Errors either on the device or on the file, never panics.
        let result = LoopingAudio::start(Path::new("__nonexistent_audio__.mp3"));
        assert!(matches!(result, Err(PlayerError::Audio(_))));
    }

    #[test]
    fn log_player_always_succeeds() {
        let mut player = LogPlayer;
        assert!(player.play(&MediaItem::new("a.mp4", "/nowhere/a.mp4")).is_ok());
    }
}
