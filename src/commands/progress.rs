//! Progress reporting for streamed transfers

use gpioflash_core::stream::{ByteStream, StreamMode};
use gpioflash_core::Result as CoreResult;
use indicatif::{ProgressBar, ProgressStyle};

/// Bar redraws are batched to one per KiB
const UPDATE_EVERY: u64 = 1024;

/// Bar for a transfer of `total` bytes, labelled `verb`
pub fn transfer_bar(
    total: u64,
    verb: &str,
) -> Result<ProgressBar, indicatif::style::TemplateError> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {binary_bytes}/{binary_total_bytes} ({binary_bytes_per_sec}, {eta})",
            )?
            .progress_chars("#>-"),
    );
    pb.set_message(verb.to_string());
    Ok(pb)
}

/// Stream adapter that advances a progress bar per byte moved
pub struct ProgressStream<S> {
    inner: S,
    pb: ProgressBar,
    count: u64,
}

impl<S: ByteStream> ProgressStream<S> {
    pub fn new(inner: S, pb: ProgressBar) -> Self {
        Self {
            inner,
            pb,
            count: 0,
        }
    }

    /// Bytes that went through the adapter
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Finish the bar and hand the inner stream back
    pub fn finish(self) -> S {
        self.pb.set_position(self.count);
        self.pb.finish();
        self.inner
    }

    fn tick(&mut self) {
        self.count += 1;
        if self.count % UPDATE_EVERY == 0 {
            self.pb.set_position(self.count);
        }
    }
}

impl<S: ByteStream> ByteStream for ProgressStream<S> {
    fn mode(&self) -> StreamMode {
        self.inner.mode()
    }

    fn push(&mut self, byte: u8) -> CoreResult<()> {
        self.inner.push(byte)?;
        self.tick();
        Ok(())
    }

    fn pull(&mut self) -> CoreResult<Option<u8>> {
        let byte = self.inner.pull()?;
        if byte.is_some() {
            self.tick();
        }
        Ok(byte)
    }

    fn flush(&mut self) -> CoreResult<()> {
        self.pb.set_position(self.count);
        self.inner.flush()
    }
}
