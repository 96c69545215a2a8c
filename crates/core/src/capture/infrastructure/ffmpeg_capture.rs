use crate::capture::domain::capture_source::{CaptureError, CaptureSource};
use crate::shared::camera::Locator;
use crate::shared::frame::Frame;

/// Live capture via ffmpeg-next (libavdevice + libavformat + libavcodec).
///
/// Device indices open through the platform's capture demuxer; stream
/// addresses (RTSP/HTTP URLs, files) open directly. Every decoded frame is
/// converted to RGB24.
pub struct FfmpegCapture {
    input: Option<ffmpeg_next::format::context::Input>,
    decoder: Option<ffmpeg_next::decoder::Video>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    video_stream_index: usize,
    width: u32,
    height: u32,
}

// Safety: FfmpegCapture is owned by one session and only used from a single
// thread at a time. The raw pointers inside ffmpeg types are not shared.
unsafe impl Send for FfmpegCapture {}

impl FfmpegCapture {
    pub fn new() -> Self {
        Self {
            input: None,
            decoder: None,
            scaler: None,
            video_stream_index: 0,
            width: 0,
            height: 0,
        }
    }

    fn open_input(locator: &Locator) -> Result<ffmpeg_next::format::context::Input, String> {
        match locator {
            Locator::Stream(address) => {
                ffmpeg_next::format::input(address).map_err(|e| e.to_string())
            }
            Locator::Device(index) => {
                ffmpeg_next::device::register_all();
                let (demuxer, url) = device_url(*index);
                let format = ffmpeg_next::device::input::video()
                    .find(|f| f.name().split(',').any(|n| n == demuxer))
                    .ok_or_else(|| format!("capture demuxer {demuxer} unavailable"))?;
                let context = ffmpeg_next::format::open_with(
                    &url,
                    &ffmpeg_next::format::Format::Input(format),
                    ffmpeg_next::Dictionary::new(),
                )
                .map_err(|e| e.to_string())?;
                match context {
                    ffmpeg_next::format::context::Context::Input(input) => Ok(input),
                    ffmpeg_next::format::context::Context::Output(_) => {
                        Err("device opened as output".to_string())
                    }
                }
            }
        }
    }
}

impl Default for FfmpegCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for FfmpegCapture {
    fn open(&mut self, locator: &Locator) -> Result<(), CaptureError> {
        let open_error = |reason: String| CaptureError::Open {
            locator: locator.to_string(),
            reason,
        };

        ffmpeg_next::init().map_err(|e| open_error(e.to_string()))?;
        let input = Self::open_input(locator).map_err(open_error)?;

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| open_error("no video stream found".into()))?;
        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| open_error(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| open_error(e.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| open_error(e.to_string()))?;

        log::debug!("Opened {locator}: {width}x{height}");
        self.video_stream_index = video_stream_index;
        self.width = width;
        self.height = height;
        self.decoder = Some(decoder);
        self.scaler = Some(scaler);
        self.input = Some(input);
        Ok(())
    }

    fn grab(&mut self) -> Result<Option<Frame>, CaptureError> {
        let (Some(input), Some(decoder), Some(scaler)) = (
            self.input.as_mut(),
            self.decoder.as_mut(),
            self.scaler.as_mut(),
        ) else {
            return Err(CaptureError::NotOpen);
        };
        let stream_index = self.video_stream_index;

        loop {
            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            if decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
                scaler
                    .run(&decoded, &mut rgb_frame)
                    .map_err(|e| CaptureError::Read(e.to_string()))?;
                let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
                return Ok(Some(Frame::new(pixels, self.width, self.height, 3, 0)));
            }

            let Some((stream, packet)) = input.packets().next() else {
                // End of stream or device has nothing buffered.
                return Ok(None);
            };
            if stream.index() != stream_index {
                continue;
            }
            if let Err(e) = decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable packet: {e}");
            }
        }
    }

    fn close(&mut self) {
        self.scaler = None;
        self.decoder = None;
        self.input = None;
    }
}

/// Capture demuxer name and device URL for a local device index.
fn device_url(index: u32) -> (&'static str, String) {
    #[cfg(target_os = "macos")]
    {
        ("avfoundation", format!("{index}:none"))
    }
    #[cfg(target_os = "windows")]
    {
        ("dshow", format!("video={index}"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        ("video4linux2", format!("/dev/video{index}"))
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// Writes a short MPEG-4 clip of uniform gray frames.
    fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32) {
        ffmpeg_next::init().unwrap();
        let fps = 30;

        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();
        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }
        let mut encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut write_packets = |encoder: &mut ffmpeg_next::encoder::Video,
                                 octx: &mut ffmpeg_next::format::context::Output| {
            let mut encoded = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                encoded.write_interleaved(octx).unwrap();
            }
        };

        for i in 0..num_frames {
            let mut yuv_frame = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::YUV420P,
                width,
                height,
            );
            for plane in 0..3 {
                yuv_frame.data_mut(plane).fill(128);
            }
            yuv_frame.set_pts(Some(i as i64));
            encoder.send_frame(&yuv_frame).unwrap();
            write_packets(&mut encoder, &mut octx);
        }
        encoder.send_eof().unwrap();
        write_packets(&mut encoder, &mut octx);
        octx.write_trailer().unwrap();
    }

    #[test]
    fn test_reads_every_frame_then_reports_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 4, 160, 120);

        let mut capture = FfmpegCapture::new();
        capture
            .open(&Locator::Stream(path.to_string_lossy().into_owned()))
            .unwrap();

        let mut frames = Vec::new();
        while let Some(frame) = capture.grab().unwrap() {
            frames.push(frame);
            assert!(frames.len() <= 4, "decoder returned extra frames");
        }
        assert_eq!(frames.len(), 4);
        assert_eq!((frames[0].width(), frames[0].height()), (160, 120));
        assert_eq!(frames[0].data().len(), 160 * 120 * 3);
    }

    #[test]
    fn test_open_missing_stream_is_open_error() {
        let mut capture = FfmpegCapture::new();
        let err = capture
            .open(&Locator::Stream("/nonexistent/clip.mp4".into()))
            .unwrap_err();
        assert!(matches!(err, CaptureError::Open { .. }));
    }

    #[test]
    fn test_grab_before_open_is_not_open() {
        let mut capture = FfmpegCapture::new();
        assert!(matches!(capture.grab(), Err(CaptureError::NotOpen)));
    }

    #[test]
    fn test_close_releases_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 2, 64, 48);

        let mut capture = FfmpegCapture::new();
        capture
            .open(&Locator::Stream(path.to_string_lossy().into_owned()))
            .unwrap();
        capture.close();
        assert!(matches!(capture.grab(), Err(CaptureError::NotOpen)));
    }
}
