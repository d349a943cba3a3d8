use argh::FromArgs;
use minish::Interpreter;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;

#[derive(FromArgs)]
/// A small interactive shell with pipelines, output redirection and a few builtins.
struct Args {
    #[argh(option, short = 'c')]
    /// run a single command line and exit with its status
    command: Option<String>,

    #[argh(option)]
    /// history file to load at startup and append to on exit; defaults to $HISTFILE
    histfile: Option<PathBuf>,

    #[argh(switch, short = 'v')]
    /// log debug diagnostics to standard error
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    // a second logger can't be installed; nothing else to do about it
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    init_logging(args.verbose);

    let mut sh = Interpreter::default();

    let code = match args.command {
        Some(line) => {
            let code = sh.execute_line(&line);
            sh.exit_code().unwrap_or(code)
        }
        None => {
            let histfile = args
                .histfile
                .or_else(|| std::env::var_os("HISTFILE").map(PathBuf::from));
            sh = sh.with_history_file(histfile);
            sh.repl()?
        }
    };
    std::process::exit(code)
}
