use std::io::{IsTerminal, Write};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use oscwire_feedback::{arg_json, arg_text};
use oscwire_frame::{encode_message, OscMessage};
use serde::Serialize;
use serde_json::Value as Json;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// Re-encoded OSC bytes.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    address: &'a str,
    type_tags: String,
    args: Vec<Json>,
    from: Option<String>,
    timestamp: String,
}

pub fn print_message(message: &OscMessage, from: Option<SocketAddr>, format: OutputFormat) {
    let from = from.map(|addr| addr.to_string());
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                address: &message.address,
                type_tags: message.type_tags(),
                args: message.args.iter().map(arg_json).collect(),
                from,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDRESS", "TAGS", "ARGS", "FROM"])
                .add_row(vec![
                    message.address.clone(),
                    message.type_tags(),
                    args_preview(message),
                    from.unwrap_or_else(|| "-".to_string()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} {} [{}] from={}",
                message.address,
                message.type_tags(),
                args_preview(message),
                from.as_deref().unwrap_or("-")
            );
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout();
            let _ = out.write_all(&encode_message(message));
            let _ = out.flush();
        }
    }
}

fn args_preview(message: &OscMessage) -> String {
    message
        .args
        .iter()
        .map(arg_text)
        .collect::<Vec<_>>()
        .join(" ")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
