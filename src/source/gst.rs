// SPDX-License-Identifier: MPL-2.0

//! GStreamer-based video decoding.
//!
//! ```text
//! uridecodebin → videoconvert → video/x-raw,format=BGRx → appsink
//! ```
//!
//! The appsink is unsynchronised (`sync=false`): GStreamer decodes as fast
//! as frames are pulled and the render loop alone decides when each one is
//! shown. `max-buffers=4` bounds how far decoding runs ahead.

use std::path::Path;

use eyre::WrapErr;
use gstreamer::prelude::*;
use tracing::{debug, info, warn};

use super::{FrameSource, Next, detection::is_uri};
use crate::{
    frame::{Frame, RowOrder},
    signals::CancelToken,
};

/// How long opening may take to preroll the first frame.
const PREROLL_TIMEOUT_SECS: u64 = 10;

/// How long one appsink pull blocks before the cancel token is checked again.
const PULL_POLL_MS: u64 = 100;

pub struct GstSource {
    pipeline: gstreamer::Pipeline,
    appsink: gstreamer_app::AppSink,
    uri: String,
    frame_rate: f64,
    cancel: CancelToken,
}

impl GstSource {
    /// Build the pipeline for `location` (a path or URI) and preroll it.
    ///
    /// Pulls stop waiting for the stream and report end of stream once
    /// `cancel` fires.
    pub fn open(location: &str, cancel: CancelToken) -> eyre::Result<Self> {
        gstreamer::init()?;

        let uri = if is_uri(location) {
            location.to_owned()
        } else {
            let path = std::path::absolute(Path::new(location))
                .wrap_err_with(|| format!("invalid path: {location}"))?;
            gstreamer::glib::filename_to_uri(&path, None)?.to_string()
        };

        let escaped_uri = uri.replace('\\', "\\\\").replace('"', "\\\"");
        let pipeline_str = format!(
            concat!(
                "uridecodebin uri=\"{uri}\" ! ",
                "videoconvert ! ",
                "video/x-raw,format=BGRx ! ",
                "appsink name=sink sync=false max-buffers=4"
            ),
            uri = escaped_uri,
        );
        debug!(pipeline = %pipeline_str, "Creating GStreamer pipeline");

        let pipeline = gstreamer::parse::launch(&pipeline_str)?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| eyre::eyre!("Failed to create pipeline"))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| eyre::eyre!("Failed to get appsink from pipeline"))?
            .downcast::<gstreamer_app::AppSink>()
            .map_err(|_| eyre::eyre!("Element 'sink' is not an AppSink"))?;

        let mut source = Self {
            pipeline,
            appsink,
            uri,
            frame_rate: 0.0,
            cancel,
        };
        source.preroll()?;
        source.frame_rate = source.detect_framerate();

        source
            .pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| eyre::eyre!("Failed to start pipeline: {e:?}"))?;

        Ok(source)
    }

    fn preroll(&self) -> eyre::Result<()> {
        let changed = self.pipeline.set_state(gstreamer::State::Paused);
        let (result, state, _) = self
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(PREROLL_TIMEOUT_SECS));

        if changed.is_err() || result.is_err() {
            let reason = self
                .pending_error()
                .unwrap_or_else(|| "pipeline failed to preroll".to_owned());
            eyre::bail!(reason);
        }

        debug!(?state, "Pipeline prerolled");
        Ok(())
    }

    /// Frame rate from the caps negotiated on the appsink, 0 when unknown.
    fn detect_framerate(&self) -> f64 {
        let Some(caps) = self
            .appsink
            .static_pad("sink")
            .and_then(|pad| pad.current_caps())
        else {
            debug!("No current caps on appsink pad");
            return 0.0;
        };

        let Ok(video_info) = gstreamer_video::VideoInfo::from_caps(&caps) else {
            debug!(caps = %caps, "Caps are not raw video");
            return 0.0;
        };

        let fps = video_info.fps();
        info!(
            fps = format!("{}/{}", fps.numer(), fps.denom()),
            resolution = format!("{}x{}", video_info.width(), video_info.height()),
            "Detected video format"
        );

        if fps.numer() > 0 && fps.denom() > 0 {
            f64::from(fps.numer()) / f64::from(fps.denom())
        } else {
            0.0
        }
    }

    /// First error message waiting on the pipeline bus, if any.
    fn pending_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        let message = bus.pop_filtered(&[gstreamer::MessageType::Error])?;
        match message.view() {
            gstreamer::MessageView::Error(err) => Some(match err.debug() {
                Some(debug) => format!("{} ({debug})", err.error()),
                None => err.error().to_string(),
            }),
            _ => None,
        }
    }

    fn sample_to_frame(sample: &gstreamer::Sample) -> eyre::Result<Frame> {
        let caps = sample
            .caps()
            .ok_or_else(|| eyre::eyre!("sample carries no caps"))?;
        let video_info = gstreamer_video::VideoInfo::from_caps(caps)?;
        let buffer = sample
            .buffer()
            .ok_or_else(|| eyre::eyre!("sample carries no buffer"))?;

        let video_frame =
            gstreamer_video::VideoFrameRef::from_buffer_ref_readable(buffer, &video_info)?;
        let stride = usize::try_from(video_frame.plane_stride()[0])
            .map_err(|_| eyre::eyre!("negative stride in raw video frame"))?;
        let data = video_frame.plane_data(0)?;

        Frame::new(
            video_info.width(),
            video_info.height(),
            4,
            stride,
            RowOrder::TopDown,
            data.to_vec(),
        )
    }
}

impl FrameSource for GstSource {
    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn next_frame(&mut self) -> Next {
        let timeout = gstreamer::ClockTime::from_mseconds(PULL_POLL_MS);
        loop {
            if let Some(sample) = self.appsink.try_pull_sample(timeout) {
                return match Self::sample_to_frame(&sample) {
                    Ok(frame) => frame.into(),
                    Err(e) => Next::Error(e),
                };
            }
            if self.appsink.is_eos() {
                return Next::EndOfStream;
            }
            if let Some(reason) = self.pending_error() {
                return Next::Error(eyre::eyre!(reason));
            }
            if self.cancel.is_cancelled() {
                debug!(uri = %self.uri, "Pull abandoned on cancellation");
                return Next::EndOfStream;
            }
        }
    }

    fn rewind(&mut self) -> eyre::Result<()> {
        self.pipeline
            .seek_simple(
                gstreamer::SeekFlags::FLUSH | gstreamer::SeekFlags::KEY_UNIT,
                gstreamer::ClockTime::ZERO,
            )
            .wrap_err("failed to seek to start")?;
        debug!(uri = %self.uri, "Seeked to start");
        Ok(())
    }

    fn describe(&self) -> String {
        self.uri.clone()
    }
}

impl Drop for GstSource {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(?e, "Failed to stop video pipeline on drop");
        }
    }
}
