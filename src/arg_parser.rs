use std::path::PathBuf;

use argparse::{ArgumentParser, Print, Store, StoreOption};

pub struct ArgsOptions {
    pub config_file_path: PathBuf,

    // Overrides the PWM root location from the configuration
    pub pwm_root: Option<String>,
}

impl ArgsOptions {
    pub fn parse() -> Self {
        let mut options = ArgsOptions::default();

        {
            let mut parser = ArgumentParser::new();

            // Configuration file path
            parser.refer(&mut options.config_file_path).add_option(
                &["-c", "--config"],
                Store,
                "The file path of the configuration file",
            );

            // PWM root override
            parser.refer(&mut options.pwm_root).add_option(
                &["--pwm-root"],
                StoreOption,
                "Override the PWM root location",
            );

            // Show daemon version
            parser.add_option(
                &["-V", "--version"],
                Print(env!("CARGO_PKG_VERSION").to_string()),
                "Show the daemon version"
            );

            parser.parse_args_or_exit();
        }

        options
    }
}

impl Default for ArgsOptions {
    fn default() -> Self {
        Self {
            config_file_path: PathBuf::from("/etc/liquidfan/config.json"),
            pwm_root: None,
        }
    }
}
