use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use tracing::{debug, info};

use super::MuxOptions;
use crate::error::{Error, Result};

/// What ffmpeg prints on stderr when `-n` meets an existing output.
const EXISTS_MARKER: &[u8] = b"exists";
const PIPE_BUFFER_SIZE: usize = 1024;

/// Stream-copies one video and one audio input into a container.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    executable: PathBuf,
    options: MuxOptions,
}

impl Ffmpeg {
    pub fn new(executable: PathBuf, options: MuxOptions) -> Self {
        Self {
            executable,
            options,
        }
    }

    pub fn options(&self) -> &MuxOptions {
        &self.options
    }

    pub fn command(&self, video: &Path, audio: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .arg("-c:v")
            .arg("copy")
            .arg("-c:a")
            .arg("copy")
            .arg("-strict")
            .arg("experimental")
            .arg(self.options.overwrite_flag())
            .arg(output)
            .arg("-hide_banner")
            .arg("-stats");
        cmd
    }

    /// Start the muxer with both output pipes drained on their own threads.
    pub fn spawn(&self, video: &Path, audio: &Path, output: &Path) -> Result<RunningMux> {
        let mut cmd = self.command(video, audio, output);
        let args: Vec<String> = cmd
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        debug!("{} {}", self.executable.display(), args.join(" "));

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::MuxerSpawn {
                path: self.executable.clone(),
                source,
            })?;

        info!(
            "Preparing to merge: {}",
            output.file_name().unwrap_or_default().to_string_lossy()
        );

        let stdout = child.stdout.take().map(|out| spawn_pump(out, io::stdout(), b""));
        let stderr = child
            .stderr
            .take()
            .map(|err| spawn_pump(err, io::stderr(), EXISTS_MARKER));

        Ok(RunningMux {
            child,
            stdout,
            stderr,
        })
    }
}

pub struct RunningMux {
    child: Child,
    stdout: Option<thread::JoinHandle<bool>>,
    stderr: Option<thread::JoinHandle<bool>>,
}

#[derive(Debug)]
pub struct MuxReport {
    pub status: io::Result<ExitStatus>,
    /// The muxer said the output already exists.
    pub output_exists: bool,
}

impl MuxReport {
    pub fn succeeded(&self) -> bool {
        matches!(&self.status, Ok(status) if status.success())
    }
}

impl RunningMux {
    /// Wait for the process. The pump threads end on their own once the
    /// pipes close, so joining them afterwards keeps their trailing output.
    pub fn wait(mut self) -> MuxReport {
        let status = self.child.wait();

        if let Some(handle) = self.stdout.take() {
            let _ = handle.join();
        }
        let output_exists = self
            .stderr
            .take()
            .map(|handle| handle.join().unwrap_or(false))
            .unwrap_or(false);

        MuxReport {
            status,
            output_exists,
        }
    }
}

/// Copy `reader` to `writer` until EOF, reporting whether `marker` was seen.
fn spawn_pump<R, W>(mut reader: R, mut writer: W, marker: &'static [u8]) -> thread::JoinHandle<bool>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = [0; PIPE_BUFFER_SIZE];
        let mut window: Vec<u8> = Vec::with_capacity(PIPE_BUFFER_SIZE + marker.len());
        let mut found = false;
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    let _ = writer.write_all(&buffer[..n]);
                    let _ = writer.flush();
                    if !found && !marker.is_empty() {
                        window.extend_from_slice(&buffer[..n]);
                        found = window.windows(marker.len()).any(|w| w == marker);
                        // Keep enough tail to catch a marker split across reads.
                        let keep = (marker.len() - 1).min(window.len());
                        window.drain(..window.len() - keep);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Muxer pipe read failed: {}", e);
                    break;
                }
            }
        }
        found
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_pump(chunks: Vec<&'static [u8]>, marker: &'static [u8]) -> (bool, Vec<u8>) {
        struct Chunks(Vec<&'static [u8]>);
        impl Read for Chunks {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0.is_empty() {
                    return Ok(0);
                }
                let chunk = self.0.remove(0);
                buf[..chunk.len()].copy_from_slice(chunk);
                Ok(chunk.len())
            }
        }

        let sink = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        struct Sink(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);
        impl Write for Sink {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let found = spawn_pump(Chunks(chunks), Sink(sink.clone()), marker)
            .join()
            .unwrap();
        let written = sink.lock().unwrap().clone();
        (found, written)
    }

    #[test]
    fn test_pump_forwards_everything() {
        let (found, written) = run_pump(vec![&b"frame=1\r"[..], &b"frame=2\n"[..]], b"");
        assert!(!found);
        assert_eq!(written, b"frame=1\rframe=2\n");
    }

    #[test]
    fn test_pump_finds_marker_split_across_reads() {
        let (found, _) = run_pump(
            vec![&b"File 'a.mp4' already ex"[..], &b"ists. Exiting.\n"[..]],
            EXISTS_MARKER,
        );
        assert!(found);
    }

    #[test]
    fn test_pump_without_marker() {
        let (found, _) = run_pump(vec![&b"Conversion failed!\n"[..]], EXISTS_MARKER);
        assert!(!found);
    }

    #[test]
    fn test_command_arguments() {
        let ffmpeg = Ffmpeg::new(
            PathBuf::from("ffmpeg"),
            MuxOptions {
                overwrite: false,
                container: "mp4".to_string(),
            },
        );
        let cmd = ffmpeg.command(Path::new("v.mp4"), Path::new("a.m4a"), Path::new("out.mp4"));
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-i", "v.mp4", "-i", "a.m4a", "-c:v", "copy", "-c:a", "copy", "-strict",
                "experimental", "-n", "out.mp4", "-hide_banner", "-stats",
            ]
        );
    }
}
