mod args;
mod config;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use vault::Vault;

use crate::args::Command;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match args::parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            args::print_help();
            return ExitCode::FAILURE;
        }
    };

    let load = match config::load_or_create(&config::config_dir(args.config_dir)) {
        Ok(load) => load,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if load.created {
        println!("Created config at {}.", load.file.display());
    }

    let vault = Vault::new(load.vault);
    let result = match args.command {
        Command::Init => vault
            .ensure_initialized()
            .map(|()| println!("Vault initialized."))
            .map_err(|err| err.to_string()),
        Command::SetPassword { service } => set_password(&vault, &service),
        Command::GetPassword { service } => vault
            .get_password(&service)
            .map(|plaintext| println!("{plaintext}"))
            .map_err(|err| err.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn set_password(vault: &Vault, service: &str) -> Result<(), String> {
    // Secrets come in through the environment so they never show up in argv
    // or shell history.
    let secret = std::env::var("CONNECTOR_SECRET")
        .map_err(|_| "CONNECTOR_SECRET environment variable is not set".to_string())?;
    vault.ensure_initialized().map_err(|err| err.to_string())?;
    let id = vault
        .set_password(service, &secret)
        .map_err(|err| err.to_string())?;
    println!("Stored credential for {service} (row {id}).");
    Ok(())
}
