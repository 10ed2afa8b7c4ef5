use std::fs::File;

use fdpass_rights::send_fd;
use fdpass_transport::PassSocket;
use serde::Serialize;

use crate::cmd::SendArgs;
use crate::exit::{io_error, rights_error, transport_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct SendOutput {
    schema_id: &'static str,
    requested: usize,
    sent: usize,
    descriptor_attached: bool,
}

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let socket = PassSocket::connect(&args.path)
        .map_err(|err| transport_error("connect failed", err))?;

    let file = File::open(&args.file)
        .map_err(|err| io_error(&format!("failed opening {}", args.file.display()), err))?;

    let payload = args.data.as_bytes();
    let payload = match args.take {
        Some(n) => &payload[..n.min(payload.len())],
        None => payload,
    };

    let sent = send_fd(&socket, &file, payload).map_err(|err| rights_error("send failed", err))?;
    tracing::info!(requested = payload.len(), sent, "descriptor sent");

    let output = SendOutput {
        schema_id: "https://schemas.3leaps.dev/fdpass/cli/v1/send-report.schema.json",
        requested: payload.len(),
        sent,
        descriptor_attached: !payload.is_empty(),
    };
    print_send(&output, format);

    Ok(SUCCESS)
}

fn print_send(output: &SendOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "sent {} of {} bytes (descriptor {})",
                output.sent,
                output.requested,
                if output.descriptor_attached {
                    "attached"
                } else {
                    "not delivered"
                }
            );
        }
    }
}
