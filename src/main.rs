//! exec-bridge binary entry point.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use exec_bridge::cli::{self, Args};
use exec_bridge::{logging, Config, ExecError, Executor, LocalTransport, TargetRegistry};
use tracing::debug;

/// Exit status reported when the deadline expires, as `timeout(1)` does.
const EXIT_TIMEOUT: u8 = 124;

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _ = logging::init_with_filter(config.log_filter());
    debug!("exec-bridge v{}", env!("CARGO_PKG_VERSION"));

    let registry = match config.registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&args, &config, registry) {
        Ok(code) => code,
        Err(e) => {
            if let Some(partial) = e.partial_output() {
                print!("{}", partial);
                let _ = std::io::stdout().flush();
            }
            eprintln!("error: {}", e);
            match e {
                ExecError::Timeout { .. } => ExitCode::from(EXIT_TIMEOUT),
                ExecError::NonZeroExit { code, .. } => exit_code(code),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(args: &Args, config: &Config, registry: TargetRegistry) -> Result<ExitCode, ExecError> {
    let transport = LocalTransport::new()?;
    let executor = Executor::new(Arc::new(transport), Arc::new(registry))
        .with_exit_policy(config.execution.exit_policy);

    let out = executor.execute(&args.target_name(), &args.to_command(), config.timeout())?;

    print!("{}", out.output);
    std::io::stdout().flush()?;

    Ok(exit_code(out.exit_code))
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
