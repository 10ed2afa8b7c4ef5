use std::fs::File;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fdpass_rights::{recv_fd, RecvOutcome, RightsError};
use fdpass_transport::PassListener;

use crate::cmd::ListenArgs;
use crate::exit::{rights_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{payload_preview, print_message, DescriptorStatus, MessageOutput, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let listener =
        PassListener::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut buf = vec![0u8; args.buffer_size.max(1)];
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let socket = match listener.accept() {
            Ok(socket) => socket,
            Err(err) => return Err(transport_error("accept failed", err)),
        };

        while running.load(Ordering::SeqCst) {
            let outcome = match recv_fd(&socket, &mut buf) {
                Ok(outcome) => outcome,
                Err(RightsError::Closed) => break,
                Err(err) => return Err(rights_error("receive failed", err)),
            };

            printed = printed.saturating_add(1);
            print_message(&report(outcome, &buf, printed, args.read_fd), format);

            if let Some(count) = args.count {
                if printed >= count {
                    return Ok(SUCCESS);
                }
            }
        }
    }

    Ok(SUCCESS)
}

fn report(
    outcome: RecvOutcome,
    buf: &[u8],
    sequence: usize,
    read_fd: Option<usize>,
) -> MessageOutput {
    let len = outcome.payload_len();
    let (descriptor, descriptor_preview) = match outcome {
        RecvOutcome::Descriptor { fd, .. } => {
            let preview = read_fd.map(|limit| preview_through_fd(File::from(fd), limit));
            (DescriptorStatus::Received, preview)
        }
        RecvOutcome::Missing { .. } => (DescriptorStatus::Missing, None),
    };

    MessageOutput {
        schema_id: "https://schemas.3leaps.dev/fdpass/cli/v1/message-received.schema.json",
        sequence,
        payload_size: len,
        payload: payload_preview(&buf[..len]),
        descriptor,
        descriptor_preview,
    }
}

fn preview_through_fd(mut file: File, limit: usize) -> String {
    let mut contents = vec![0u8; limit];
    match file.read(&mut contents) {
        Ok(n) => payload_preview(&contents[..n]),
        Err(err) => format!("<read failed: {err}>"),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
