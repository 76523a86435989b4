use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init,
    SetPassword { service: String },
    GetPassword { service: String },
}

#[derive(Debug)]
pub struct CliArgs {
    pub command: Command,
    pub config_dir: Option<PathBuf>,
}

pub fn parse_args() -> Result<CliArgs, String> {
    let mut args = env::args().skip(1);
    let mut config_dir = None;
    let mut command = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config-dir" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --config-dir".to_string())?;
                config_dir = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "init" => {
                command = Some(Command::Init);
            }
            "set-password" => {
                let service = args
                    .next()
                    .ok_or_else(|| "missing service name for set-password".to_string())?;
                command = Some(Command::SetPassword { service });
            }
            "get-password" => {
                let service = args
                    .next()
                    .ok_or_else(|| "missing service name for get-password".to_string())?;
                command = Some(Command::GetPassword { service });
            }
            _ => {
                return Err(format!("unknown argument: {arg}"));
            }
        }
    }

    let command = command.ok_or_else(|| "no command given".to_string())?;
    Ok(CliArgs {
        command,
        config_dir,
    })
}

pub fn print_help() {
    println!(
        "Connector credential vault CLI\n\n\
Usage:\n  connector-cli [--config-dir <dir>] <command>\n\n\
Commands:\n  init                     Create the vault keypair and credential store\n  set-password <service>   Store the secret from $CONNECTOR_SECRET for <service>\n  get-password <service>   Print the stored secret for <service>\n\n\
Options:\n  --config-dir <dir>  Override the connector config directory\n  -h, --help          Show this help message\n"
    );
}
