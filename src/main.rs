use anyhow::{Context, Result};
use liquidfand::{
    arg_parser::ArgsOptions, config::Config, controller::Controller, logger,
};
use tokio::{
    select,
    signal::{
        ctrl_c,
        unix::{SignalKind, signal},
    },
    sync::mpsc,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logging();

    // Parse the command line arguments
    let args_options = ArgsOptions::parse();

    let mut config = Config::load(&args_options.config_file_path)
        .with_context(|| "Failed to load the daemon configuration")?;

    if let Some(root) = args_options.pwm_root {
        config.pwm.root = root.into();
    }

    // This token and tracker will be used to handle graceful shutdown
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    // Thin channel moving fatal controller errors back to the main task
    let (tx_err, mut rx_err) = mpsc::channel(16);

    // Bring up the hardware before entering the control loop,
    // a failure here aborts the process without ever running it
    let controller = Controller::start(&config)
        .with_context(|| "Failed to initialize the fan controller")?;

    {
        let token = token.clone();

        tracker.spawn(async move {
            controller.run(token, tx_err).await;
        });
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    // Wait for a termination signal or a fatal controller error
    let failed = select! {
        _ = ctrl_c() => {
            info!("Received interrupt signal");
            false
        },
        _ = sigterm.recv() => {
            info!("Received termination signal");
            false
        },
        _ = sigquit.recv() => {
            info!("Received quit signal");
            false
        },
        err_msg = rx_err.recv() => {
            if let Some(err) = err_msg {
                for e in err.chain() {
                    error!("{e}");
                }
            }

            true
        }
    };

    // Cancel the token to communicate the program
    // termination to the running task
    token.cancel();

    // Wait for the task to finish
    tracker.close();
    tracker.wait().await;

    if failed {
        std::process::exit(1);
    }

    Ok(())
}
