//! Audio output - triangle tones fed from the note queue
//!
//! The audio thread owns the consumer end of the note queue and counts the
//! frames it renders. That counter, published through an atomic, is the time
//! source the UI thread's clock runs on, so scheduled note times and the
//! rendered audio share one timeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use polyrhythm::sequencing::midi_note_to_freq;
use polyrhythm::synth::{NoteEvent, NoteReceiver};
use polyrhythm::transport::TimeSource;
use rtrb::{Producer, RingBuffer};
use tracing::{error, info};

/// Notes in flight between the UI and audio threads
const QUEUE_CAPACITY: usize = 256;
/// Tones sounding at once; later notes are skipped until one retires
const MAX_TONES: usize = 32;
/// Notes arriving later than this are skipped
const MAX_LATENESS: f64 = 0.1;
const ATTACK_SECONDS: f64 = 0.005;
const RELEASE_SECONDS: f64 = 0.08;
const TONE_GAIN: f32 = 0.15;

/// Seconds of rendered audio plus the configured lead
#[derive(Debug, Clone)]
pub struct FrameClock {
    frames: Arc<AtomicU64>,
    sample_rate: f64,
    latency: f64,
}

impl TimeSource for FrameClock {
    fn now(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate + self.latency
    }
}

/// Running output stream; audio stops when this is dropped
pub struct AudioEngine {
    sample_rate: u32,
    late: Arc<AtomicU64>,
    _stream: cpal::Stream,
}

impl AudioEngine {
    /// Open the default output device
    ///
    /// Returns the engine, the clock source that follows it, and the queue
    /// end rhythms push notes into.
    pub fn start(latency: Duration) -> EyreResult<(Self, FrameClock, Producer<NoteEvent>)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;
        info!(
            host = ?host.id(),
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            ?config,
            "audio device"
        );

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let (producer, consumer) = RingBuffer::new(QUEUE_CAPACITY);
        let frames = Arc::new(AtomicU64::new(0));
        let late = Arc::new(AtomicU64::new(0));
        let mixer = Mixer::new(consumer, sample_rate as f64, frames.clone(), late.clone());

        let stream_config: cpal::StreamConfig = config.clone().into();
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32, _>(&device, &stream_config, mixer, channels),
            cpal::SampleFormat::I16 => build_stream::<i16, _>(&device, &stream_config, mixer, channels),
            cpal::SampleFormat::U16 => build_stream::<u16, _>(&device, &stream_config, mixer, channels),
            other => return Err(eyre!("unsupported sample format {:?}", other)),
        }?;
        stream.play().wrap_err("failed to start audio stream")?;
        info!(sample_rate, channels, latency_ms = latency.as_millis() as u64, "audio stream started");

        let clock = FrameClock {
            frames,
            sample_rate: sample_rate as f64,
            latency: latency.as_secs_f64(),
        };
        Ok((
            Self {
                sample_rate,
                late,
                _stream: stream,
            },
            clock,
            producer,
        ))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Notes skipped for arriving too late
    pub fn late_notes(&self) -> u64 {
        self.late.load(Ordering::Relaxed)
    }
}

fn build_stream<T, R>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer<R>,
    channels: usize,
) -> EyreResult<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
    R: NoteReceiver + Send + 'static,
{
    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| mixer.process(data, channels),
            |err| error!("audio stream error: {}", err),
            None,
        )
        .wrap_err("failed to build output stream")?;
    Ok(stream)
}

/// One sounding note, in absolute frames
struct Tone {
    increment: f32,
    phase: f32,
    start: u64,
    stop: u64,
}

struct Mixer<R> {
    notes: R,
    tones: Vec<Tone>,
    /// Frames rendered so far
    frame: u64,
    sample_rate: f64,
    attack: u64,
    release: u64,
    frames: Arc<AtomicU64>,
    late: Arc<AtomicU64>,
}

impl<R: NoteReceiver> Mixer<R> {
    fn new(notes: R, sample_rate: f64, frames: Arc<AtomicU64>, late: Arc<AtomicU64>) -> Self {
        Self {
            notes,
            tones: Vec::with_capacity(MAX_TONES),
            frame: 0,
            sample_rate,
            attack: (ATTACK_SECONDS * sample_rate) as u64,
            release: (RELEASE_SECONDS * sample_rate) as u64,
            frames,
            late,
        }
    }

    fn process<T>(&mut self, output: &mut [T], channels: usize)
    where
        T: SizedSample + FromSample<f32>,
    {
        self.take_notes();

        for frame in output.chunks_mut(channels.max(1)) {
            let value = self.next_sample();
            for sample in frame.iter_mut() {
                *sample = T::from_sample(value);
            }
        }

        let now = self.frame;
        let release = self.release;
        self.tones.retain(|tone| now < tone.stop + release);
        self.frames.store(self.frame, Ordering::Release);
    }

    fn take_notes(&mut self) {
        let now = self.frame as f64 / self.sample_rate;
        while let Some(event) = self.notes.pop() {
            if event.time < now - MAX_LATENESS {
                self.late.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            if self.tones.len() >= MAX_TONES {
                continue;
            }
            let start = (event.time * self.sample_rate).max(self.frame as f64) as u64;
            let held = (event.duration.max(0.0) * self.sample_rate) as u64;
            self.tones.push(Tone {
                increment: midi_note_to_freq(event.note) / self.sample_rate as f32,
                phase: 0.0,
                start,
                stop: start + held,
            });
        }
    }

    fn next_sample(&mut self) -> f32 {
        let frame = self.frame;
        let mut out = 0.0;
        for tone in &mut self.tones {
            if frame < tone.start {
                continue;
            }
            let gain = envelope(frame - tone.start, tone.stop - tone.start, self.attack, self.release);
            out += triangle(tone.phase) * gain * TONE_GAIN;
            tone.phase = (tone.phase + tone.increment).fract();
        }
        self.frame += 1;
        out.clamp(-1.0, 1.0)
    }
}

fn triangle(phase: f32) -> f32 {
    4.0 * (phase - 0.5).abs() - 1.0
}

/// Linear attack while held, then a linear release from wherever it got to
fn envelope(elapsed: u64, held: u64, attack: u64, release: u64) -> f32 {
    let level = if attack == 0 {
        1.0
    } else {
        (elapsed as f32 / attack as f32).min(1.0)
    };
    if elapsed <= held {
        return level;
    }
    let since = elapsed - held;
    if since >= release {
        0.0
    } else {
        level * (1.0 - since as f32 / release as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    const RATE: f64 = 1000.0;

    fn mixer(notes: Vec<NoteEvent>) -> Mixer<VecDeque<NoteEvent>> {
        Mixer::new(
            notes.into(),
            RATE,
            Arc::new(AtomicU64::new(0)),
            Arc::new(AtomicU64::new(0)),
        )
    }

    fn note(time: f64) -> NoteEvent {
        NoteEvent {
            voice: 0,
            note: 69,
            duration: 0.05,
            time,
        }
    }

    #[test]
    fn test_frame_counter_follows_rendering() {
        let mut mixer = mixer(Vec::new());
        let clock = FrameClock {
            frames: mixer.frames.clone(),
            sample_rate: RATE,
            latency: 0.03,
        };
        let mut out = vec![0.0f32; 200];
        mixer.process(&mut out, 2);
        assert_eq!(mixer.frame, 100);
        assert!((clock.now() - 0.13).abs() < 1e-9);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_note_sounds_from_its_time() {
        let mut mixer = mixer(vec![note(0.02)]);
        let mut out = vec![0.0f32; 100];
        mixer.process(&mut out, 1);
        assert!(out[..20].iter().all(|&s| s == 0.0));
        assert!(out[20..70].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_late_notes_are_skipped() {
        let mut mixer = mixer(Vec::new());
        let mut out = vec![0.0f32; 500];
        mixer.process(&mut out, 1);

        mixer.notes.push_back(note(0.1));
        mixer.notes.push_back(note(0.45));
        mixer.process(&mut out, 1);
        assert_eq!(mixer.late.load(Ordering::Relaxed), 1);
        // The on-time one still sounds, from the first frame of this block
        assert!(out[..80].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_tones_retire_after_release() {
        let mut mixer = mixer(vec![note(0.0)]);
        let mut out = vec![0.0f32; 50];
        mixer.process(&mut out, 1);
        assert_eq!(mixer.tones.len(), 1);
        let mut out = vec![0.0f32; 200];
        mixer.process(&mut out, 1);
        assert!(mixer.tones.is_empty());
    }

    #[test]
    fn test_envelope_shape() {
        assert_eq!(envelope(0, 100, 10, 20), 0.0);
        assert_eq!(envelope(50, 100, 10, 20), 1.0);
        assert!((envelope(110, 100, 10, 20) - 0.5).abs() < 1e-6);
        assert_eq!(envelope(130, 100, 10, 20), 0.0);
    }
}
