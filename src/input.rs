use anyhow::{Context, Result};
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Spawn a plain thread that forwards each non-empty line of `reader` as one
/// message. Returns immediately.
///
/// The thread sits outside the async runtime, so a read that never returns
/// does not hold up process exit.
pub fn spawn_reader<R>(reader: R, tx: mpsc::Sender<String>) -> Result<std::thread::JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name("message-reader".into())
        .spawn(move || {
            if let Err(e) = forward_messages(reader, &tx) {
                warn!(error = %e, "message reader failed");
            }
        })
        .context("failed to spawn message reader")
}

/// `tx` should have capacity 1: a send waits until the overlay has taken the
/// previous message, so nothing is dropped. Returns once input is exhausted
/// or the overlay has gone away.
fn forward_messages(reader: impl BufRead, tx: &mpsc::Sender<String>) -> std::io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        debug!(chars = line.chars().count(), "message read");
        if tx.blocking_send(line).is_err() {
            info!("overlay closed, stopping reader");
            return Ok(());
        }
    }
    info!("message source exhausted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Read};
    use std::sync::mpsc as std_mpsc;
    use std::time::{Duration, Instant};

    /// A source that stays open until its sender is dropped.
    struct OpenPipe {
        chunks: std_mpsc::Receiver<Vec<u8>>,
        pending: Vec<u8>,
    }

    impl Read for OpenPipe {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pending.is_empty() {
                match self.chunks.recv() {
                    Ok(chunk) => self.pending = chunk,
                    Err(_) => return Ok(0),
                }
            }
            let n = buf.len().min(self.pending.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            Ok(n)
        }
    }

    fn open_pipe() -> (std_mpsc::Sender<Vec<u8>>, BufReader<OpenPipe>) {
        let (tx, chunks) = std_mpsc::channel();
        (tx, BufReader::new(OpenPipe { chunks, pending: Vec::new() }))
    }

    #[test]
    fn skips_empty_lines_and_preserves_order() {
        let (tx, mut rx) = mpsc::channel(1);
        let input: &[u8] = b"hello\n\nworld\\nagain\r\n\nlast";
        let reader = spawn_reader(input, tx).unwrap();

        let mut got = Vec::new();
        while let Some(msg) = rx.blocking_recv() {
            got.push(msg);
        }
        reader.join().unwrap();
        assert_eq!(got, ["hello", "world\\nagain", "last"]);
    }

    #[test]
    fn full_slot_blocks_instead_of_dropping() {
        let (tx, mut rx) = mpsc::channel(1);
        let reader = spawn_reader(&b"one\ntwo\nthree\n"[..], tx).unwrap();

        // Let the reader run ahead of the consumer.
        std::thread::sleep(Duration::from_millis(50));
        assert!(!reader.is_finished());

        assert_eq!(rx.blocking_recv().as_deref(), Some("one"));
        assert_eq!(rx.blocking_recv().as_deref(), Some("two"));
        assert_eq!(rx.blocking_recv().as_deref(), Some("three"));
        assert!(rx.blocking_recv().is_none());
        reader.join().unwrap();
    }

    #[test]
    fn stops_when_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        forward_messages(&b"a\nb\n"[..], &tx).unwrap();
    }

    #[test]
    fn open_source_does_not_hold_up_runtime_shutdown() {
        let (feed, source) = open_pipe();
        feed.send(b"hello\n".to_vec()).unwrap();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (tx, mut rx) = mpsc::channel(1);
        let reader = spawn_reader(source, tx).unwrap();
        assert_eq!(runtime.block_on(rx.recv()).as_deref(), Some("hello"));

        // Consumer gone, source still open and the reader blocked on it.
        drop(rx);
        let start = Instant::now();
        drop(runtime);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(!reader.is_finished());

        // Closing the source lets the reader finish on its own.
        drop(feed);
        reader.join().unwrap();
    }
}
