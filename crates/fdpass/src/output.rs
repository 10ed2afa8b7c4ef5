use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

/// One received message as reported by `listen`.
#[derive(Serialize)]
pub struct MessageOutput {
    pub schema_id: &'static str,
    pub sequence: usize,
    pub payload_size: usize,
    pub payload: String,
    pub descriptor: DescriptorStatus,
    /// First bytes read through the received descriptor, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor_preview: Option<String>,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorStatus {
    /// A descriptor arrived with this message.
    Received,
    /// The message carried no descriptor.
    Missing,
}

impl DescriptorStatus {
    fn label(self) -> &'static str {
        match self {
            DescriptorStatus::Received => "received",
            DescriptorStatus::Missing => "missing",
        }
    }
}

pub fn print_message(message: &MessageOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(message).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "SIZE", "DESCRIPTOR", "PAYLOAD"])
                .add_row(vec![
                    message.sequence.to_string(),
                    message.payload_size.to_string(),
                    message.descriptor.label().to_string(),
                    message.payload.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "seq={} size={} descriptor={} payload={}",
                message.sequence,
                message.payload_size,
                message.descriptor.label(),
                message.payload
            );
            if let Some(preview) = &message.descriptor_preview {
                println!("  fd-preview={preview}");
            }
        }
    }
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
