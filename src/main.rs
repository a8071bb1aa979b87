use std::env;
use std::process::ExitCode;

use log::error;

use recipe_scan::{
    scan_image, scan_url, CommitCoordinator, HttpRecipeStore, ScanConfig, VisionRecognizer,
};

fn usage() -> &'static str {
    "Usage: recipe-scan [--commit] <url>\n       recipe-scan [--commit] --image <path>"
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let commit = if let Some(pos) = args.iter().position(|a| a == "--commit") {
        args.remove(pos);
        true
    } else {
        false
    };

    let config = match ScanConfig::load() {
        Ok(config) => config,
        Err(err) => {
            error!("Could not load configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.as_slice() {
        [flag, path] if flag == "--image" => {
            let Some(recognizer) = VisionRecognizer::from_config(&config.ocr) else {
                error!("Image scanning needs RECIPE_SCAN__OCR__ENDPOINT and __API_KEY");
                return ExitCode::FAILURE;
            };
            let bytes = match tokio::fs::read(path).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    error!("Could not read {}: {}", path, err);
                    return ExitCode::FAILURE;
                }
            };
            scan_image(bytes, mime_for(path), Box::new(recognizer), &config).await
        }
        [url] if !url.starts_with('-') => scan_url(url, &config).await,
        _ => {
            eprintln!("{}", usage());
            return ExitCode::FAILURE;
        }
    };

    let (draft, warnings) = match result {
        Ok(result) => result,
        Err(err) => {
            error!("Scan failed while {}: {}", err.stage(), err);
            return ExitCode::FAILURE;
        }
    };

    for warning in &warnings {
        eprintln!("warning: {}", warning);
    }

    if commit {
        let coordinator = CommitCoordinator::new(HttpRecipeStore::new(&config.backend));
        match coordinator.commit(&draft).await {
            Ok(recipe_id) => println!("Created recipe {}", recipe_id),
            Err(err) => {
                error!("Commit failed: {}", err);
                return ExitCode::FAILURE;
            }
        }
    } else {
        match serde_json::to_string_pretty(&draft) {
            Ok(json) => println!("{}", json),
            Err(err) => {
                error!("Could not serialize draft: {}", err);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn mime_for(path: &str) -> &'static str {
    match path.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}
