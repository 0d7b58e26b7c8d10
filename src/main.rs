use anyhow::{anyhow, Result};
use log::info;
use serde_json::json;
use std::time::Duration;
use structopt::StructOpt;

use dobi_build::{BuildContext, Buildable, Controller, DobiBuilder, TerminalReporter};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "dobi-build",
    about = "Builds or pushes a dobi image resource with live progress."
)]
struct Opt {
    /// Image resource to build, as named in dobi.yaml.
    image: String,

    #[structopt(long)]
    /// Push the image instead of building it.
    push: bool,

    #[structopt(short, long = "env", number_of_values = 1)]
    /// Extra environment for dobi, as KEY=VALUE. May be repeated.
    env: Vec<String>,

    #[structopt(long)]
    /// Stop dobi after this many seconds.
    timeout: Option<u64>,

    #[structopt(long)]
    /// Run this executable instead of the dobi found on PATH.
    dobi: Option<String>,
}

fn main() -> Result<()> {
    pretty_env_logger::init_custom_env("DOBI_BUILD_LOG");

    let opt = Opt::from_args();

    let config = json!({
        "image": opt.image,
        "env": opt.env,
        "push": opt.push,
    });

    let mut builder = DobiBuilder::validate(config)?;
    if let Some(dobi) = opt.dobi {
        builder = builder.with_program(dobi);
    }
    info!("accepted configuration {:?}", builder.config());

    let mut context = BuildContext::new();
    if let Some(timeout) = opt.timeout {
        if timeout == 0 {
            return Err(anyhow!("--timeout must be at least one second."));
        }
        context = context.with_timeout(Duration::from_secs(timeout));
    }

    #[cfg(unix)]
    interrupt::cancel_on_signal(context.cancel_token());

    let controller = Controller::init(builder);
    let mut ui = TerminalReporter::new();
    controller.build(&context, &mut ui)?;

    Ok(())
}

/// dobi runs in its own process group, so a Ctrl-C on the terminal only
/// reaches this process. It is turned into a cancellation of the build,
/// which then takes the whole group down.
#[cfg(unix)]
mod interrupt {
    use dobi_build::CancelToken;
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        thread,
        time::Duration,
    };

    static INTERRUPTED: AtomicBool = AtomicBool::new(false);

    extern "C" fn on_signal(_signal: libc::c_int) {
        INTERRUPTED.store(true, Ordering::SeqCst);
    }

    pub fn cancel_on_signal(token: CancelToken) {
        unsafe {
            libc::signal(libc::SIGINT, on_signal as libc::sighandler_t);
            libc::signal(libc::SIGTERM, on_signal as libc::sighandler_t);
        }

        thread::spawn(move || {
            while !INTERRUPTED.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(50));
            }
            token.cancel();
        });
    }
}
