use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use std::{
    io::{self, ErrorKind, Read, Write},
    process::{Child, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use crate::{
    context::BuildContext,
    error::{Error, Result},
    models::InvocationPlan,
};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long a terminated child's pipes may stay open before the runner
/// gives up on them.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

enum Chunk {
    Bytes(Vec<u8>),
    Failed(io::Error),
}

/// Runs an invocation to completion, forwarding stdout and stderr into one
/// sink as the bytes arrive.
#[derive(Clone, Debug)]
pub struct ProcessRunner {
    poll_interval: Duration,
}

impl ProcessRunner {
    pub fn new() -> ProcessRunner {
        ProcessRunner {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// How often the child is checked for exit and the context for
    /// cancellation.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> ProcessRunner {
        self.poll_interval = poll_interval;
        self
    }

    pub fn run(
        &self,
        plan: &InvocationPlan,
        context: &BuildContext,
        sink: &mut (dyn Write + Send),
    ) -> Result<()> {
        let command_line = plan.command_line();
        if let Some(reason) = context.interruption() {
            warn!("not starting {}: {}", command_line, reason);
            return Err(Error::Cancelled {
                command: command_line,
                reason,
            });
        }
        info!("running {}", command_line);

        let mut command = plan.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // The tool leads its own process group so that terminating it also
        // reaches everything it started.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn().map_err(|source| Error::Launch {
            program: plan.program.clone(),
            source,
        })?;
        let mut child = ChildGuard::new(child);
        debug!("started {} as pid {}", command_line, child.id());

        let (sender, receiver) = crossbeam_channel::unbounded();
        if let Some(stdout) = child.child.stdout.take() {
            spawn_pump(stdout, sender.clone());
        }
        if let Some(stderr) = child.child.stderr.take() {
            spawn_pump(stderr, sender);
        } else {
            drop(sender);
        }

        let mut output = Output::new(sink);
        let status = self.supervise(&mut child, &receiver, &mut output, context, &command_line)?;

        if let Some(err) = output.into_error(&command_line) {
            return Err(err);
        }

        if status.success() {
            debug!("{} finished successfully", command_line);
            Ok(())
        } else {
            warn!("{} failed: {}", command_line, status);
            Err(Error::Execution {
                command: command_line,
                status,
            })
        }
    }

    /// Forwards output until the child has exited and both pipes are closed,
    /// or until the context asks to stop.
    fn supervise(
        &self,
        child: &mut ChildGuard,
        receiver: &Receiver<Chunk>,
        output: &mut Output<'_>,
        context: &BuildContext,
        command_line: &str,
    ) -> Result<ExitStatus> {
        let mut pipes_open = true;
        let mut status = None;

        loop {
            if pipes_open {
                match receiver.recv_timeout(self.poll_interval) {
                    Ok(chunk) => {
                        output.accept(chunk);
                        for chunk in receiver.try_iter() {
                            output.accept(chunk);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => (),
                    Err(RecvTimeoutError::Disconnected) => pipes_open = false,
                }
            } else if status.is_none() {
                thread::sleep(self.poll_interval);
            }

            if status.is_none() {
                status = child.try_wait().map_err(|source| Error::Wait {
                    command: command_line.to_owned(),
                    source,
                })?;
            }

            if let (Some(status), false) = (status, pipes_open) {
                return Ok(status);
            }

            if let Some(reason) = context.interruption() {
                warn!("stopping {}: {}", command_line, reason);
                child.terminate();
                drain(receiver, output, command_line);
                return Err(Error::Cancelled {
                    command: command_line.to_owned(),
                    reason,
                });
            }
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        ProcessRunner::new()
    }
}

/// Forwards what is left once the child's process group is gone. Returns
/// when both pumps have closed their pipes.
fn drain(receiver: &Receiver<Chunk>, output: &mut Output<'_>, command_line: &str) {
    let deadline = Instant::now() + TERMINATE_GRACE;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok(chunk) => output.accept(chunk),
            Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "output of {} still open {:?} after termination",
                    command_line, TERMINATE_GRACE
                );
                return;
            }
        }
    }
}

/// Reads a pipe on its own thread until it closes. The thread also stops
/// once nobody listens anymore. The pipe is closed before the sender is
/// dropped, so a disconnected channel means the pipe is released.
fn spawn_pump<R>(pipe: R, sender: Sender<Chunk>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        pump(pipe, &sender);
        drop(sender);
    });
}

fn pump<R: Read>(mut pipe: R, sender: &Sender<Chunk>) {
    let mut buffer = [0u8; 8192];

    loop {
        let chunk = match pipe.read(&mut buffer) {
            Ok(0) => return,
            Ok(read) => Chunk::Bytes(buffer[..read].to_vec()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => Chunk::Failed(err),
        };

        let failed = matches!(chunk, Chunk::Failed(_));
        if sender.send(chunk).is_err() || failed {
            return;
        }
    }
}

enum Failure {
    Read(io::Error),
    Write(io::Error),
}

/// The sink side of a run. After the first failure bytes are discarded, but
/// the pipes are still drained so the child never blocks on a full pipe.
struct Output<'a> {
    sink: &'a mut (dyn Write + Send),
    failure: Option<Failure>,
}

impl<'a> Output<'a> {
    fn new(sink: &'a mut (dyn Write + Send)) -> Output<'a> {
        Output {
            sink,
            failure: None,
        }
    }

    fn accept(&mut self, chunk: Chunk) {
        if self.failure.is_some() {
            return;
        }

        match chunk {
            Chunk::Bytes(bytes) => {
                let written = self
                    .sink
                    .write_all(&bytes)
                    .and_then(|_| self.sink.flush());
                if let Err(err) = written {
                    warn!("dropping build output: {}", err);
                    self.failure = Some(Failure::Write(err));
                }
            }
            Chunk::Failed(err) => {
                warn!("could not read build output: {}", err);
                self.failure = Some(Failure::Read(err));
            }
        }
    }

    fn into_error(self, command_line: &str) -> Option<Error> {
        let command = command_line.to_owned();
        self.failure.map(|failure| match failure {
            Failure::Read(source) => Error::Read { command, source },
            Failure::Write(source) => Error::Output { command, source },
        })
    }
}

/// Owns a running child. Dropping it before the child was reaped kills the
/// child's process group, so no exit path leaves one behind.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> ChildGuard {
        ChildGuard {
            child,
            reaped: false,
        }
    }

    fn id(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.reaped = true;
        }
        Ok(status)
    }

    /// Kills the whole process group, even when the leader already exited,
    /// then reaps the leader if that has not happened yet.
    fn terminate(&mut self) {
        self.kill();

        if !self.reaped {
            if let Err(err) = self.child.wait() {
                warn!("could not reap pid {}: {}", self.child.id(), err);
            }
            self.reaped = true;
        }
    }

    #[cfg(unix)]
    fn kill(&mut self) {
        let group = self.child.id() as libc::pid_t;
        if unsafe { libc::kill(-group, libc::SIGKILL) } != 0 {
            let err = io::Error::last_os_error();
            // ESRCH means every process in the group is already gone.
            if err.raw_os_error() != Some(libc::ESRCH) {
                warn!("could not kill process group {}: {}", group, err);
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&mut self) {
        if let Err(err) = self.child.kill() {
            // InvalidInput means the child already exited.
            if err.kind() != ErrorKind::InvalidInput {
                warn!("could not kill pid {}: {}", self.child.id(), err);
            }
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            self.terminate();
        }
    }
}
