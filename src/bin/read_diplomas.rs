//! Verify diploma register extracts and print their attributes.
//!
//! Usage:
//!   read_diplomas [--certdir DIR] [--tmpdir DIR] [--keep-output] [--debug] FILE...
//!
//! Exits with status 1 on the first file that fails.

use diploma_oxide::{verify_and_extract_with, CertificateTrustStore, DiplomaConfig, Pdf2HtmlEx};
use std::path::PathBuf;
use std::process::ExitCode;

struct Args {
    config: DiplomaConfig,
    files: Vec<PathBuf>,
}

impl Args {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut config = DiplomaConfig::new();
        let mut files = Vec::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--certdir" | "--certs" => {
                    i += 1;
                    let dir = args.get(i).ok_or("--certdir needs a directory")?;
                    config = config.with_cert_dir(dir);
                },
                "--tmpdir" => {
                    i += 1;
                    let dir = args.get(i).ok_or("--tmpdir needs a directory")?;
                    config = config.with_tmp_dir(dir);
                },
                "--keep-output" => config = config.with_keep_output(true),
                "--debug" => config = config.with_debug(true),
                "--help" | "-h" => return Err(String::new()),
                flag if flag.starts_with("--") => return Err(format!("unknown flag {}", flag)),
                file => files.push(PathBuf::from(file)),
            }
            i += 1;
        }

        if files.is_empty() {
            return Err("no PDF files given".to_string());
        }
        Ok(Self { config, files })
    }
}

fn usage() {
    eprintln!("Usage: read_diplomas [--certdir DIR] [--tmpdir DIR] [--keep-output] [--debug] FILE...");
}

fn main() -> ExitCode {
    let args = match Args::from_args() {
        Ok(args) => args,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("{}", message);
            }
            usage();
            return ExitCode::from(2);
        },
    };

    let default_filter = if args.config.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let trust = match CertificateTrustStore::load_dir(&args.config.cert_dir) {
        Ok(trust) => trust,
        Err(e) => {
            eprintln!("{}", e.chain());
            return ExitCode::FAILURE;
        },
    };
    let renderer = Pdf2HtmlEx::from_config(&args.config);

    for (n, path) in args.files.iter().enumerate() {
        if n > 0 {
            println!();
        }
        println!("Processing: {}", path.display());

        let result = std::fs::read(path)
            .map_err(diploma_oxide::Error::from)
            .and_then(|pdf| verify_and_extract_with(&pdf, &trust, &renderer, &args.config.requirements));
        let diplomas = match result {
            Ok(diplomas) => diplomas,
            Err(e) => {
                eprintln!("{}: {}", path.display(), e.chain());
                return ExitCode::FAILURE;
            },
        };

        for (d, diploma) in diplomas.iter().enumerate() {
            if d > 0 {
                println!();
            }
            let mut entries: Vec<_> = diploma.iter().map(|(k, v)| (k.as_str(), v)).collect();
            entries.sort();
            for (key, value) in entries {
                println!("  {:<12}: {}", key, value);
            }
        }
    }
    ExitCode::SUCCESS
}
