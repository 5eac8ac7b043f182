//! Audio output using cpal
//!
//! Binds the sink ring's consumer half to a real output device with a
//! callback-based stream. This is device glue around the pacing core: the
//! callback pops frames from the ring (freeing sink capacity the engine
//! paces against) and outputs silence on underrun.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::audio::ring_buffer::SinkConsumer;
use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};

/// CD audio sample rate; no resampling is done, so other device rates play
/// with a pitch shift.
const CD_SAMPLE_RATE: u32 = 44_100;

/// Audio output manager using cpal.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    volume: Arc<Mutex<f32>>,
}

impl AudioOutput {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an output device.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    /// - `buffer_size`: Optional device buffer size in frames (None = device default)
    ///
    /// If the requested device is not found, falls back to the default device.
    pub fn new(device_name: Option<String>, buffer_size: Option<u32>) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(name) = device_name.as_ref() {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

            match devices.find(|d| d.name().ok().as_ref() == Some(name)) {
                Some(dev) => {
                    info!("Found requested audio device: {}", name);
                    dev
                }
                None => {
                    warn!(
                        "Requested device '{}' not found, falling back to default device",
                        name
                    );
                    host.default_output_device().ok_or_else(|| {
                        Error::AudioOutput(format!(
                            "Device '{}' not found and no default device available",
                            name
                        ))
                    })?
                }
            }
        } else {
            let dev = host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?;
            info!(
                "Using default audio device: {}",
                dev.name().unwrap_or_else(|_| "Unknown".to_string())
            );
            dev
        };

        let (mut config, sample_format) = Self::get_best_config(&device)?;

        if let Some(size) = buffer_size {
            config.buffer_size = cpal::BufferSize::Fixed(size);
            debug!("Using requested buffer size: {} frames", size);
        }

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
            config.sample_rate.0, config.channels, sample_format, config.buffer_size
        );

        if config.sample_rate.0 != CD_SAMPLE_RATE {
            warn!(
                "Device runs at {} Hz, not {} Hz; playback will be pitch-shifted",
                config.sample_rate.0, CD_SAMPLE_RATE
            );
        }

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            volume: Arc::new(Mutex::new(1.0)),
        })
    }

    /// Get the best supported configuration for playback.
    ///
    /// Prefers 44.1kHz stereo (the payload's native rate and layout).
    fn get_best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
        let mut supported_configs = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

        let preferred = supported_configs.find(|config| {
            config.channels() == 2
                && config.min_sample_rate().0 <= CD_SAMPLE_RATE
                && config.max_sample_rate().0 >= CD_SAMPLE_RATE
                && matches!(config.sample_format(), SampleFormat::F32 | SampleFormat::I16)
        });

        if let Some(supported_config) = preferred {
            let sample_format = supported_config.sample_format();
            let config = supported_config
                .with_sample_rate(cpal::SampleRate(CD_SAMPLE_RATE))
                .config();
            return Ok((config, sample_format));
        }

        // Fallback: use default config
        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        let sample_format = supported_config.sample_format();
        let config = supported_config.config();
        Ok((config, sample_format))
    }

    /// Start the output stream, draining `consumer` from the audio thread.
    ///
    /// Underruns (ring empty) output silence without crashing.
    pub fn start(&mut self, consumer: SinkConsumer) -> Result<()> {
        info!("Starting audio stream");

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream_f32(consumer)?,
            SampleFormat::I16 => self.build_stream_i16(consumer)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);

        info!("Audio stream started successfully");
        Ok(())
    }

    /// Build audio stream for f32 samples
    fn build_stream_f32(&self, mut consumer: SinkConsumer) -> Result<Stream> {
        let channels = self.config.channels as usize;
        let volume = Arc::clone(&self.volume);

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let current_volume = *volume.lock().unwrap();

                    for frame in data.chunks_mut(channels) {
                        let (left, right) =
                            consumer.pop().unwrap_or_else(AudioFrame::zero).to_f32();

                        frame[0] = (left * current_volume).clamp(-1.0, 1.0);
                        if channels > 1 {
                            frame[1] = (right * current_volume).clamp(-1.0, 1.0);
                        }
                    }
                },
                move |err| {
                    warn!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))?;

        Ok(stream)
    }

    /// Build audio stream for i16 samples (payload-native, no conversion)
    fn build_stream_i16(&self, mut consumer: SinkConsumer) -> Result<Stream> {
        let channels = self.config.channels as usize;
        let volume = Arc::clone(&self.volume);

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    let current_volume = *volume.lock().unwrap();

                    for frame in data.chunks_mut(channels) {
                        let sample = consumer.pop().unwrap_or_else(AudioFrame::zero);

                        frame[0] = (sample.left as f32 * current_volume) as i16;
                        if channels > 1 {
                            frame[1] = (sample.right as f32 * current_volume) as i16;
                        }
                    }
                },
                move |err| {
                    warn!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))?;

        Ok(stream)
    }

    /// Stop audio playback.
    pub fn stop(&mut self) -> Result<()> {
        info!("Stopping audio stream");

        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
            drop(stream);
        }

        Ok(())
    }

    /// Set output volume (0.0 = silent, 1.0 = full volume).
    pub fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        *self.volume.lock().unwrap() = clamped;
        debug!("Volume set to {:.2}", clamped);
    }

    /// Get device name.
    pub fn device_name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "Unknown".to_string())
    }

    /// Get sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Get channel count.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        // Ensure stream is stopped on drop
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices() {
        // This test requires audio hardware
        // Just verify it doesn't panic
        let result = AudioOutput::list_devices();
        assert!(result.is_ok() || result.is_err()); // Either is acceptable
    }

    // Actual playback tests require hardware and are best done manually with
    // the cdap binary against a known image.
}
