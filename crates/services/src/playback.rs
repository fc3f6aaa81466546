//! Speaker output for audio cues.

use std::io::Cursor;
use std::sync::mpsc;
use std::thread;

use rodio::{Decoder, OutputStream, Sink};

use crate::error::NotificationError;
use crate::notification::CuePlayer;

/// Plays cues on the default output device.
///
/// Each cue gets its own detached thread that holds the output stream until
/// the clip ends. `play` returns once playback has started.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeakerCuePlayer;

impl CuePlayer for SpeakerCuePlayer {
    fn play(&self, class_name: &str, audio: Vec<u8>) -> Result<(), NotificationError> {
        let (started_tx, started_rx) = mpsc::sync_channel(1);
        let name = class_name.to_string();

        thread::Builder::new()
            .name("audio-cue".into())
            .spawn(move || match start(audio) {
                Ok((_stream, sink)) => {
                    // The receiver may have given up; playback goes on regardless.
                    let _ = started_tx.send(Ok(()));
                    sink.sleep_until_end();
                    tracing::debug!(class_name = %name, "audio cue finished");
                }
                Err(reason) => {
                    let _ = started_tx.send(Err(reason));
                }
            })
            .map_err(|e| playback(class_name, e.to_string()))?;

        started_rx
            .recv()
            .map_err(|e| playback(class_name, e.to_string()))?
            .map_err(|reason| playback(class_name, reason))
    }
}

fn start(audio: Vec<u8>) -> Result<(OutputStream, Sink), String> {
    let source = Decoder::new(Cursor::new(audio)).map_err(|e| format!("cannot decode: {e}"))?;
    let (stream, handle) =
        OutputStream::try_default().map_err(|e| format!("no output device: {e}"))?;
    let sink = Sink::try_new(&handle).map_err(|e| format!("no output device: {e}"))?;
    sink.append(source);
    Ok((stream, sink))
}

fn playback(class_name: &str, reason: String) -> NotificationError {
    NotificationError::Playback {
        class_name: class_name.to_string(),
        reason,
    }
}
