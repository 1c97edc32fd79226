use clap::builder::PossibleValue;
use clap::{Arg, ArgAction, Command, crate_authors, crate_description, crate_name, crate_version};
use lazy_static::lazy_static;

lazy_static! {
    static ref VERSION_AND_COMMIT: String = format!(
        "gateway-api-admission-webhook version: {} ({})",
        crate_version!(),
        option_env!("GIT_COMMIT").unwrap_or("dev"),
    );
}

pub fn build_cli() -> Command {
    let mut args = vec![
        Arg::new("log-level")
            .long("log-level")
            .value_name("LOG_LEVEL")
            .env("GATEWAY_ADMISSION_LOG_LEVEL")
            .default_value("info")
            .value_parser([
                PossibleValue::new("trace"),
                PossibleValue::new("debug"),
                PossibleValue::new("info"),
                PossibleValue::new("warn"),
                PossibleValue::new("error"),
            ])
            .help("Log level"),
        Arg::new("log-fmt")
            .long("log-fmt")
            .value_name("LOG_FMT")
            .env("GATEWAY_ADMISSION_LOG_FMT")
            .default_value("text")
            .value_parser([PossibleValue::new("text"), PossibleValue::new("json")])
            .help("Log output format"),
        Arg::new("log-no-color")
            .long("log-no-color")
            .env("NO_COLOR")
            .action(ArgAction::SetTrue)
            .help("Disable colored output for logs"),
        Arg::new("address")
            .long("addr")
            .value_name("BIND_ADDRESS")
            .default_value("0.0.0.0")
            .env("GATEWAY_ADMISSION_BIND_ADDRESS")
            .help("Bind against ADDRESS"),
        Arg::new("port")
            .long("port")
            .value_name("PORT")
            .default_value("8443")
            .env("GATEWAY_ADMISSION_PORT")
            .help("Listen on PORT"),
        Arg::new("cert-file")
            .long("cert-file")
            .value_name("CERT_FILE")
            .default_value("/etc/certs/tls.crt")
            .env("GATEWAY_ADMISSION_CERT_FILE")
            .help("Path to the PEM encoded X.509 certificate served over HTTPS"),
        Arg::new("key-file")
            .long("key-file")
            .value_name("KEY_FILE")
            .default_value("/etc/certs/tls.key")
            .env("GATEWAY_ADMISSION_KEY_FILE")
            .help("Path to the PEM encoded private key of the certificate"),
        Arg::new("shutdown-timeout")
            .long("shutdown-timeout")
            .value_name("SECONDS")
            .default_value("30")
            .env("GATEWAY_ADMISSION_SHUTDOWN_TIMEOUT")
            .value_parser(clap::value_parser!(u64))
            .help("Seconds given to in-flight requests to complete once a shutdown signal is received"),
    ];
    args.sort_by(|a, b| a.get_id().cmp(b.get_id()));

    Command::new(crate_name!())
        .author(crate_authors!())
        .version(crate_version!())
        .about(crate_description!())
        .long_version(VERSION_AND_COMMIT.as_str())
        .args(args)
}
