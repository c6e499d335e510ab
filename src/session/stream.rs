use crate::audio::CaptureDevice;
use crate::error::CaptureError;

/// A started capture stream. Stops the device exactly once, either through
/// [`ActiveStream::stop`] or on drop if the session unwinds first.
pub(super) struct ActiveStream<'a, D: CaptureDevice> {
    device: &'a mut D,
    stopped: bool,
}

impl<'a, D: CaptureDevice> ActiveStream<'a, D> {
    pub(super) fn start(device: &'a mut D) -> Result<Self, CaptureError> {
        device.start()?;
        Ok(Self {
            device,
            stopped: false,
        })
    }

    pub(super) fn device(&mut self) -> &mut D {
        self.device
    }

    pub(super) fn stop(mut self) -> Result<(), CaptureError> {
        self.stopped = true;
        let result = self.device.stop();
        if let Err(err) = &result {
            tracing::warn!(error = %err, "failed to stop capture stream");
        }
        result
    }
}

impl<D: CaptureDevice> Drop for ActiveStream<'_, D> {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Err(err) = self.device.stop() {
            tracing::warn!(error = %err, "failed to stop capture stream during unwind");
        }
    }
}
