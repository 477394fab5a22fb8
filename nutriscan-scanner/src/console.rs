//! Line-oriented console front end
//!
//! Stands in for the presentation layer when the scanner runs in a terminal:
//! parses typed commands and renders [`FlowSnapshot`]s as text. Also hosts
//! the add-product action, which sits outside the scan flow.

use crate::error::{CatalogError, CatalogResult};
use crate::flow::FlowSnapshot;
use crate::models::LookupResult;
use crate::services::{CatalogClient, ProductImage, ProductSubmission, SubmissionReceipt};
use chrono::Utc;
use nutriscan_common::events::{CapabilityState, EventBus, FlowMode, NoticeLevel, ScanEvent};
use nutriscan_common::{Error, Result};
use std::path::{Path, PathBuf};

pub const HELP: &str = "\
Commands:
  start                        scan a product
  scan <code>                  deliver a camera decode event
  again                        scan another product
  menu                         back to menu
  add <barcode> <front> [back] submit a new product with image files
  status                       show the current screen
  quit                         leave the screen and exit";

/// One typed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Scan(String),
    Again,
    Menu,
    Add {
        barcode: String,
        front: PathBuf,
        back: Option<PathBuf>,
    },
    Status,
    Help,
    Quit,
}

/// Parse one input line
pub fn parse_command(line: &str) -> Result<ConsoleCommand> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(Error::InvalidInput("empty command".to_string()));
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("start", []) => ConsoleCommand::Start,
        ("scan", [code]) => ConsoleCommand::Scan(code.to_string()),
        ("again", []) => ConsoleCommand::Again,
        ("menu" | "back", []) => ConsoleCommand::Menu,
        ("add", [barcode, front]) => ConsoleCommand::Add {
            barcode: barcode.to_string(),
            front: PathBuf::from(front),
            back: None,
        },
        ("add", [barcode, front, back]) => ConsoleCommand::Add {
            barcode: barcode.to_string(),
            front: PathBuf::from(front),
            back: Some(PathBuf::from(back)),
        },
        ("status", []) => ConsoleCommand::Status,
        ("help" | "?", []) => ConsoleCommand::Help,
        ("quit" | "exit", []) => ConsoleCommand::Quit,
        _ => {
            return Err(Error::InvalidInput(format!(
                "unrecognized command '{}' (type 'help')",
                line.trim()
            )))
        }
    };

    Ok(command)
}

/// Text rendering of the current screen
pub fn render_snapshot(snapshot: &FlowSnapshot) -> Vec<String> {
    match (snapshot.capability, snapshot.mode) {
        (CapabilityState::Unknown, _) => vec!["Requesting camera permission...".to_string()],
        (CapabilityState::Denied, _) => vec![
            "No access to camera. Please enable camera permission in settings.".to_string(),
        ],
        (CapabilityState::Granted, FlowMode::Menu) => {
            vec!["Ready. Type 'start' to scan a product.".to_string()]
        }
        (CapabilityState::Granted, FlowMode::Scanning) => {
            vec!["Align the barcode within the frame".to_string()]
        }
        (CapabilityState::Granted, FlowMode::Processing) => vec![format!(
            "Checking product {}...",
            snapshot.barcode.as_deref().unwrap_or("")
        )],
        (CapabilityState::Granted, FlowMode::Result) => {
            let mut lines = match &snapshot.last_result {
                Some(LookupResult::Found(record)) => {
                    let mut lines = vec!["Product Found!".to_string()];
                    lines.extend(record.display_lines().into_iter().map(|l| format!("  {}", l)));
                    lines
                }
                Some(result) => vec![format!("{}: {}", result.title(), result.message())],
                None => Vec::new(),
            };
            lines.push("Type 'again' to scan another product or 'menu' to go back.".to_string());
            lines
        }
    }
}

/// Text rendering of a notice event, `None` for other events
pub fn render_notice(event: &ScanEvent) -> Option<String> {
    let ScanEvent::Notice {
        level,
        title,
        detail,
        ..
    } = event
    else {
        return None;
    };

    let marker = match level {
        NoticeLevel::Info => "i",
        NoticeLevel::Success => "+",
        NoticeLevel::Error => "!",
    };
    Some(match detail {
        Some(detail) => format!("[{}] {}: {}", marker, title, detail),
        None => format!("[{}] {}", marker, title),
    })
}

/// Submit a new product from image files, reporting progress as notices
pub async fn add_product(
    client: &CatalogClient,
    event_bus: &EventBus,
    barcode: &str,
    front: &Path,
    back: Option<&Path>,
) -> CatalogResult<SubmissionReceipt> {
    let result = upload(client, event_bus, barcode, front, back).await;

    match &result {
        Ok(receipt) => {
            event_bus.emit_lossy(ScanEvent::ProductSubmitted {
                barcode: barcode.trim().to_string(),
                product_id: receipt.product_id.clone(),
                timestamp: Utc::now(),
            });
            event_bus.emit_lossy(ScanEvent::notice(NoticeLevel::Success, "Product uploaded!", None));
        }
        Err(CatalogError::InvalidSubmission(reason)) => {
            event_bus.emit_lossy(ScanEvent::notice(NoticeLevel::Error, reason.clone(), None));
        }
        Err(e) => {
            let detail = e.detail().map(str::to_string).unwrap_or_else(|| e.to_string());
            event_bus.emit_lossy(ScanEvent::notice(NoticeLevel::Error, "Upload Failed", Some(detail)));
        }
    }

    result
}

async fn upload(
    client: &CatalogClient,
    event_bus: &EventBus,
    barcode: &str,
    front: &Path,
    back: Option<&Path>,
) -> CatalogResult<SubmissionReceipt> {
    if barcode.trim().is_empty() {
        return Err(CatalogError::InvalidSubmission("Barcode Required".to_string()));
    }

    let front_image = ProductImage::from_path(front).await?;
    let back_image = match back {
        Some(path) => Some(ProductImage::from_path(path).await?),
        None => None,
    };

    event_bus.emit_lossy(ScanEvent::notice(NoticeLevel::Info, "Uploading...", None));

    client
        .submit_product(ProductSubmission {
            barcode: barcode.to_string(),
            front_image,
            back_image,
        })
        .await
}
