use crate::cli::args::{CliArgs, Command};

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 {
            return Err("invalid concurrency, expected positive integer".to_string());
        }
    }
    if let Some(rate) = args.rate {
        if rate == 0 {
            return Err("invalid rate, expected positive integer".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive number of seconds".to_string());
        }
    }
    if let Some(raw) = args.success_status.as_deref() {
        crate::prober::parse_status_range(raw)
            .map_err(|e| format!("invalid --success-status '{raw}': {e}"))?;
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!("invalid --output-format '{raw}', expected text or json"));
        }
    }
    match &args.command {
        Command::Cmdi(e) => validate_param(&e.param)?,
        Command::Xss(x) => {
            validate_param(&x.target.param)?;
            if x.payload.as_deref().is_some_and(|p| p.is_empty()) {
                return Err("invalid --payload, expected non-empty string".to_string());
            }
        }
        Command::Discover(_) | Command::Crawl(_) | Command::Mine(_) | Command::Recon(_) => {}
    }
    Ok(())
}

fn validate_param(param: &str) -> Result<(), String> {
    if param.trim().is_empty() {
        return Err("invalid --param, expected non-empty name".to_string());
    }
    Ok(())
}
