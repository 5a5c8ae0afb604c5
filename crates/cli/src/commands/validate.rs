use std::path::Path;
use std::process;

use serde::de::DeserializeOwned;

use effeff_core::{validate, Form, SubmissionRequest};

use crate::{report_error, OutputFormat};

/// `effeff validate <form.json> <submission.json>`: run the validation
/// engine offline. Exits 1 when the submission is invalid or a file cannot
/// be read.
pub(crate) fn cmd_validate(
    form_path: &Path,
    submission_path: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let form: Form = read_json_file(form_path, output, quiet);
    let submission: SubmissionRequest = read_json_file(submission_path, output, quiet);

    let errors = validate(&form, &submission);

    if errors.is_empty() {
        if !quiet {
            match output {
                OutputFormat::Text => println!("valid"),
                OutputFormat::Json => println!("{{\"valid\": true}}"),
            }
        }
        return;
    }

    match output {
        OutputFormat::Text => {
            if !quiet {
                eprintln!("invalid submission");
                for (question_id, message) in &errors {
                    eprintln!("  - {}: {}", question_id, message);
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "valid": false,
                "errors": errors,
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
    }
    process::exit(1);
}

fn read_json_file<T: DeserializeOwned>(path: &Path, output: OutputFormat, quiet: bool) -> T {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}
