use clap::{Arg, ArgMatches, Command};
use log::LevelFilter;
use mail_otp::config_loader::ConfigLoader;
use mail_otp::notification::{NotificationSummary, PreviewLimit};
use mail_otp::{CodeExtractor, DetectionConfig, ExtractionResult};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::process;

fn main() {
    let matches = Command::new("mail-otp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract verification codes from incoming email")
        .long_about(
            "Finds one-time login and verification codes in the subject and body of an \
             email (plain text or HTML) and ranks them by confidence. Codes that clear the \
             score threshold are reported as verified; the rest are listed as uncertain.",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("YAML detection config (defaults to the built-in rules)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("env-overrides")
                .long("env-overrides")
                .help("Apply CODE_* environment variables on top of the config")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Write the default detection config and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the detection config and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("email")
                .long("email")
                .value_name("FILE")
                .help("Raw email file (headers, blank line, body)")
                .conflicts_with_all(["subject", "body-file"])
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("subject")
                .short('s')
                .long("subject")
                .value_name("TEXT")
                .help("Subject line of the message")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("body-file")
                .short('b')
                .long("body-file")
                .value_name("FILE")
                .help("Message body; read from stdin when omitted")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the full extraction result as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("summary")
                .long("summary")
                .help("Print the new-mail notification summary")
                .conflicts_with("json")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging of every candidate hit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        match ConfigLoader::write_default(generate_path) {
            Ok(()) => println!("Default detection config written to: {generate_path}"),
            Err(e) => {
                eprintln!("Error writing configuration file: {e:#}");
                process::exit(1);
            }
        }
        return;
    }

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        match config.validate() {
            Ok(()) => {
                println!("Detection config is valid.");
                println!(
                    "  length {}..={}, context window {}, threshold {}",
                    config.min_length,
                    config.max_length,
                    config.context_window,
                    config.score_threshold
                );
                for rule in &config.patterns {
                    println!("  pattern: {}", rule.name);
                }
            }
            Err(e) => {
                println!("❌ Configuration validation failed:");
                println!("Error: {e:#}");
                process::exit(1);
            }
        }
        return;
    }

    let message = match read_message(&matches) {
        Ok(message) => message,
        Err(e) => {
            eprintln!("❌ Error reading message: {e:#}");
            process::exit(1);
        }
    };

    let extractor = CodeExtractor::new(config);

    if matches.get_flag("summary") {
        let summary = NotificationSummary::build(
            &message.to,
            &message.from,
            &message.subject,
            &message.body,
            &extractor,
            PreviewLimit::Notification,
        );
        print_summary(&summary);
        return;
    }

    let result = extractor.extract(&message.subject, &message.body);
    if matches.get_flag("json") {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("❌ Failed to serialize result: {e}");
                process::exit(1);
            }
        }
    } else {
        print_result(&result);
    }
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<DetectionConfig> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => ConfigLoader::load_file(path)?,
        None => DetectionConfig::default(),
    };

    if matches.get_flag("env-overrides") {
        let vars: HashMap<String, String> = std::env::vars().collect();
        return Ok(ConfigLoader::apply_overrides(config, &vars));
    }
    Ok(config)
}

#[derive(Debug, Default)]
struct Message {
    subject: String,
    from: String,
    to: String,
    body: String,
}

fn read_message(matches: &ArgMatches) -> anyhow::Result<Message> {
    use anyhow::Context;

    if let Some(email_file) = matches.get_one::<String>("email") {
        let raw = fs::read_to_string(email_file)
            .with_context(|| format!("Failed to read email file: {email_file}"))?;
        return Ok(parse_raw_email(&raw));
    }

    let body = match matches.get_one::<String>("body-file") {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read body file: {path}"))?,
        None => {
            let mut body = String::new();
            io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read body from stdin")?;
            body
        }
    };

    Ok(Message {
        subject: matches
            .get_one::<String>("subject")
            .cloned()
            .unwrap_or_default(),
        body,
        ..Message::default()
    })
}

fn parse_raw_email(raw: &str) -> Message {
    let mut headers: HashMap<String, String> = HashMap::new();
    let mut body = String::new();
    let mut in_headers = true;
    let mut last_header_key: Option<String> = None;

    for line in raw.lines() {
        if in_headers {
            if line.trim().is_empty() {
                in_headers = false;
                continue;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                // folded header continuation
                if let Some(ref key) = last_header_key {
                    if let Some(existing_value) = headers.get_mut(key) {
                        existing_value.push(' ');
                        existing_value.push_str(line.trim());
                    }
                }
            } else if let Some((key, value)) = line.split_once(':') {
                let key = key.trim().to_lowercase();
                headers.insert(key.clone(), value.trim().to_string());
                last_header_key = Some(key);
            }
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }

    let mut header = |name: &str| headers.remove(name).unwrap_or_default();
    Message {
        subject: header("subject"),
        from: header("from"),
        to: header("to"),
        body,
    }
}

fn print_result(result: &ExtractionResult) {
    if result.is_empty() {
        println!("No verification code candidates found.");
        return;
    }

    if !result.high_confidence.is_empty() {
        println!("Verification codes:");
        for code in &result.high_confidence {
            println!("  {code}");
        }
    }
    if !result.low_confidence.is_empty() {
        println!("Low-confidence candidates (verify manually):");
        for code in &result.low_confidence {
            println!("  {code}");
        }
    }
}

fn print_summary(summary: &NotificationSummary) {
    if summary.important {
        println!("🚨 Important message");
    }
    println!("📬 New mail");
    println!("  To:      {}", summary.to_address);
    println!("  From:    {}", summary.from_address);
    println!("  Subject: {}", summary.subject);

    if !summary.codes.is_empty() {
        println!();
        println!("Verification codes:");
        for code in &summary.codes {
            println!("  {code}");
        }
    }
    if !summary.uncertain_codes.is_empty() {
        println!();
        println!("Low-confidence candidates (verify manually):");
        for code in &summary.uncertain_codes {
            println!("  {code}");
        }
    }
    if !summary.preview.is_empty() {
        println!();
        println!("Preview:");
        println!("  {}", summary.preview);
    }
}
