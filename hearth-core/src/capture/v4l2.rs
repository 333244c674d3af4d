//! V4L2 webcam backend (Linux, feature `v4l2`)
//!
//! Enumerates `/dev/video*` capture nodes and streams MJPEG or YUYV frames
//! through memory-mapped buffers. Frames are converted to packed RGB24
//! before they reach the capture thread.

use std::time::Duration;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;

use super::backend::{CameraBackend, CaptureSettings, DeviceStream};
use crate::error::{HearthError, Result};
use crate::types::{CameraDevice, CameraPosition, Frame, FrameFormat};

/// Longest wait for the driver to hand back a buffer
const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(200);

const MJPG: [u8; 4] = *b"MJPG";
const YUYV: [u8; 4] = *b"YUYV";

/// Backend for local V4L2 devices
#[derive(Debug, Clone, Default)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

impl CameraBackend for V4l2Backend {
    fn name(&self) -> &str {
        "v4l2"
    }

    fn list_devices(&self) -> Result<Vec<CameraDevice>> {
        let mut devices = Vec::new();
        for node in v4l::context::enum_devices() {
            let path = node.path().to_string_lossy().to_string();
            let device = match v4l::Device::with_path(node.path()) {
                Ok(device) => device,
                Err(e) => {
                    debug!("Skipping {}: {}", path, e);
                    continue;
                }
            };
            let caps = match device.query_caps() {
                Ok(caps) => caps,
                Err(e) => {
                    debug!("Skipping {}: {}", path, e);
                    continue;
                }
            };
            if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
                continue;
            }

            let name = node.name().unwrap_or_else(|| caps.card.clone());
            devices.push(CameraDevice::new(path, name, CameraPosition::External));
        }
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(devices)
    }

    fn open(
        &self,
        device: &CameraDevice,
        settings: &CaptureSettings,
    ) -> Result<Box<dyn DeviceStream>> {
        let dev = v4l::Device::with_path(&device.id)
            .map_err(|e| HearthError::camera(format!("open v4l2 device {}: {}", device.id, e)))?;

        let mut format = dev
            .format()
            .map_err(|e| HearthError::camera(format!("read v4l2 format: {}", e)))?;
        format.width = settings.width;
        format.height = settings.height;
        format.fourcc = v4l::FourCC::new(&MJPG);

        let format = match dev.set_format(&format) {
            Ok(format) => format,
            Err(e) => {
                warn!("Failed to set format on {}: {}", device.id, e);
                dev.format()
                    .map_err(|e| HearthError::camera(format!("read v4l2 format: {}", e)))?
            }
        };

        let pixel = match format.fourcc.repr {
            MJPG => PixelFormat::Mjpeg,
            YUYV => PixelFormat::Yuyv,
            other => {
                return Err(HearthError::camera(format!(
                    "{} offers unsupported pixel format {}",
                    device.id,
                    String::from_utf8_lossy(&other)
                )));
            }
        };

        if settings.fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(settings.fps);
            if let Err(e) = dev.set_params(&params) {
                warn!("Failed to set fps on {}: {}", device.id, e);
            }
        }

        let mut stream = MmapStream::with_buffers(&dev, Type::VideoCapture, 4)
            .map_err(|e| HearthError::camera(format!("create v4l2 buffer stream: {}", e)))?;
        stream.set_timeout(DEQUEUE_TIMEOUT);

        info!(
            "Opened {} at {}x{} ({:?})",
            device.id, format.width, format.height, pixel
        );

        Ok(Box::new(V4l2Stream {
            _device: dev,
            stream,
            pixel,
            format: FrameFormat {
                width: format.width,
                height: format.height,
            },
            sequence: 0,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelFormat {
    Mjpeg,
    Yuyv,
}

struct V4l2Stream {
    // Keeps the device handle open for the lifetime of the stream
    _device: v4l::Device,
    stream: MmapStream<'static>,
    pixel: PixelFormat,
    format: FrameFormat,
    sequence: u64,
}

impl DeviceStream for V4l2Stream {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let (buf, meta) = match self.stream.next() {
            Ok(next) => next,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(None),
            Err(e) => return Err(HearthError::camera(format!("capture v4l2 frame: {}", e))),
        };
        let used = (meta.bytesused as usize).min(buf.len());
        let buf = &buf[..used];
        if buf.is_empty() {
            return Ok(None);
        }

        let (data, width, height) = match self.pixel {
            PixelFormat::Mjpeg => {
                let image = image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg)?
                    .to_rgb8();
                let (width, height) = image.dimensions();
                (image.into_raw(), width, height)
            }
            PixelFormat::Yuyv => (
                yuyv_to_rgb(buf, self.format.width, self.format.height)?,
                self.format.width,
                self.format.height,
            ),
        };

        self.sequence += 1;
        Ok(Some(Frame::new(width, height, data, self.sequence)))
    }

    fn format(&self) -> FrameFormat {
        self.format
    }
}

/// Convert packed YUYV 4:2:2 to RGB24
fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let expected = width as usize * height as usize * 2;
    if pixels.len() < expected {
        return Err(HearthError::camera(format!(
            "YUYV frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        )));
    }

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for chunk in pixels[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0], chunk[2]] {
            let y = y as f32;
            let r = y + 1.402 * v;
            let g = y - 0.344_136 * u - 0.714_136 * v;
            let b = y + 1.772 * u;
            rgb.push(r.clamp(0.0, 255.0) as u8);
            rgb.push(g.clamp(0.0, 255.0) as u8);
            rgb.push(b.clamp(0.0, 255.0) as u8);
        }
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_gray() {
        // Two gray pixels: Y=128, U=V=128
        let rgb = yuyv_to_rgb(&[128, 128, 128, 128], 2, 1).unwrap();
        assert_eq!(rgb, vec![128, 128, 128, 128, 128, 128]);
    }

    #[test]
    fn test_dequeue_wait_is_bounded() {
        // Stop joins the capture thread, which only checks for shutdown between dequeues
        assert!(DEQUEUE_TIMEOUT > Duration::ZERO);
        assert!(DEQUEUE_TIMEOUT <= Duration::from_millis(500));
    }

    #[test]
    fn test_yuyv_short_buffer() {
        assert!(yuyv_to_rgb(&[0; 3], 2, 1).is_err());
    }
}
