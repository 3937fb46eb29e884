use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use csr_reconcile::{FieldCode, Parameters, State, reconcile};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CSR_RECONCILE_LOG";

/// Long flag name and short alias for each subject field.
fn field_flag(code: FieldCode) -> (&'static str, &'static str) {
    match code {
        FieldCode::Country => ("country-name", "C"),
        FieldCode::StateOrProvince => ("state-or-province-name", "ST"),
        FieldCode::Locality => ("locality-name", "L"),
        FieldCode::Organization => ("organization-name", "O"),
        FieldCode::OrganizationalUnit => ("organizational-unit-name", "OU"),
        FieldCode::CommonName => ("common-name", "CN"),
        FieldCode::EmailAddress => ("email-address", "E"),
    }
}

fn command() -> Command {
    let command = Command::new("csr-reconcile")
        .about("Ensures a PKCS#10 certificate signing request is present or absent")
        .arg(
            Arg::new("args")
                .long("args")
                .value_name("FILE")
                .help("JSON document holding the parameters; flags override its values")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("path")
                .long("path")
                .value_name("FILE")
                .help("Certificate signing request file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("privatekey_path")
                .long("privatekey-path")
                .value_name("FILE")
                .help("PKCS#8 PEM private key used to sign the request")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("state")
                .long("state")
                .help("present or absent [default: present]")
                .value_parser(value_parser!(State)),
        )
        .arg(
            Arg::new("digest")
                .long("digest")
                .help("Digest used to sign the request [default: sha256]"),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Request version [default: 3]")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("force")
                .long("force")
                .help("Regenerate the request even when it is up to date")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check_mode")
                .long("check")
                .help("Report what would change without touching the file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("subject_alt_name")
                .long("subject-alt-name")
                .alias("subjectAltName")
                .value_name("NAMES")
                .help("Comma separated alternative names, e.g. DNS:a.com,DNS:b.com"),
        );
    FieldCode::ALL.into_iter().fold(command, |command, code| {
        let (long, alias) = field_flag(code);
        command.arg(
            Arg::new(long)
                .long(long)
                .alias(alias)
                .value_name("VALUE")
                .help(format!("Subject {code} field")),
        )
    })
}

fn parameters(matches: &ArgMatches) -> Result<Parameters, String> {
    let mut parameters = match matches.get_one::<PathBuf>("args") {
        Some(file) => {
            let text = std::fs::read_to_string(file)
                .map_err(|err| format!("could not read {}: {err}", file.display()))?;
            serde_json::from_str::<Parameters>(&text)
                .map_err(|err| format!("invalid parameters in {}: {err}", file.display()))?
        }
        None => {
            let path = matches
                .get_one::<PathBuf>("path")
                .ok_or("missing required argument --path")?;
            let privatekey_path = matches
                .get_one::<PathBuf>("privatekey_path")
                .ok_or("missing required argument --privatekey-path")?;
            Parameters::new(path, privatekey_path)
        }
    };
    if let Some(path) = matches.get_one::<PathBuf>("path") {
        parameters.path = path.clone();
    }
    if let Some(privatekey_path) = matches.get_one::<PathBuf>("privatekey_path") {
        parameters.privatekey_path = privatekey_path.clone();
    }
    if let Some(state) = matches.get_one::<State>("state") {
        parameters.state = *state;
    }
    if let Some(digest) = matches.get_one::<String>("digest") {
        parameters.digest = digest.clone();
    }
    if let Some(version) = matches.get_one::<u32>("version") {
        parameters.version = *version;
    }
    if let Some(subject_alt_name) = matches.get_one::<String>("subject_alt_name") {
        parameters.subject_alt_name = Some(subject_alt_name.clone());
    }
    for code in FieldCode::ALL {
        if let Some(value) = matches.get_one::<String>(field_flag(code).0) {
            *parameters.field_mut(code) = Some(value.clone());
        }
    }
    parameters.force |= matches.get_flag("force");
    parameters.check_mode |= matches.get_flag("check_mode");
    Ok(parameters)
}

fn failure(msg: String) -> Value {
    json!({ "failed": true, "msg": msg })
}

fn run(matches: Result<ArgMatches, clap::Error>) -> Result<Value, String> {
    let matches = matches.map_err(|err| err.to_string())?;
    let parameters = parameters(&matches)?;
    let result = reconcile(&parameters).map_err(|err| err.to_string())?;
    serde_json::to_value(&result).map_err(|err| err.to_string())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new("csr_reconcile=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let matches = match command().try_get_matches() {
        // --help
        Err(err) if !err.use_stderr() => err.exit(),
        matches => matches,
    };
    match run(matches) {
        Ok(result) => {
            println!("{result}");
            ExitCode::SUCCESS
        }
        Err(msg) => {
            tracing::error!("{msg}");
            println!("{}", failure(msg));
            ExitCode::FAILURE
        }
    }
}
