use std::fs::File;
use std::io::{Read, Seek, Write};

use fdpass_rights::{recv_fd, send_fd, RecvOutcome};
use fdpass_transport::PassSocket;
use serde::Serialize;

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Info,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    schema_id: &'static str,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let checks = vec![
        platform_check(),
        temp_dir_writable_check(),
        roundtrip_check("stream_fd_roundtrip", PassSocket::stream_pair()),
        roundtrip_check("datagram_fd_roundtrip", PassSocket::datagram_pair()),
        descriptor_loss_check(),
    ];

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput {
        schema_id: "https://schemas.3leaps.dev/fdpass/cli/v1/doctor-report.schema.json",
        checks,
        overall,
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn platform_check() -> CheckResult {
    CheckResult {
        name: "platform".to_string(),
        status: CheckStatus::Info,
        detail: format!(
            "{}/{} (descriptor passing is unix-local)",
            std::env::consts::OS,
            std::env::consts::ARCH
        ),
    }
}

fn temp_dir_writable_check() -> CheckResult {
    let path = std::env::temp_dir().join(format!("fdpass-doctor-{}", std::process::id()));
    let result = std::fs::write(&path, b"probe").and_then(|()| std::fs::remove_file(&path));
    match result {
        Ok(()) => CheckResult {
            name: "temp_dir_writable".to_string(),
            status: CheckStatus::Pass,
            detail: std::env::temp_dir().display().to_string(),
        },
        Err(err) => CheckResult {
            name: "temp_dir_writable".to_string(),
            status: CheckStatus::Fail,
            detail: err.to_string(),
        },
    }
}

/// Send a scratch file's descriptor across a socket pair and read known
/// content back through the received descriptor.
fn roundtrip_check(
    name: &str,
    pair: fdpass_transport::Result<(PassSocket, PassSocket)>,
) -> CheckResult {
    let result = pair
        .map_err(|err| err.to_string())
        .and_then(|(a, b)| run_roundtrip(&a, &b, name));
    match result {
        Ok(()) => CheckResult {
            name: name.to_string(),
            status: CheckStatus::Pass,
            detail: "payload and descriptor round-tripped".to_string(),
        },
        Err(detail) => CheckResult {
            name: name.to_string(),
            status: CheckStatus::Fail,
            detail,
        },
    }
}

fn run_roundtrip(a: &PassSocket, b: &PassSocket, tag: &str) -> Result<(), String> {
    let mut file = scratch_file(tag).map_err(|err| format!("scratch file: {err}"))?;
    file.write_all(b"doctor-probe")
        .and_then(|()| file.rewind())
        .map_err(|err| format!("scratch file: {err}"))?;

    let sent = send_fd(a, &file, b"probe").map_err(|err| format!("send: {err}"))?;
    if sent != 5 {
        return Err(format!("short write: {sent} of 5 bytes"));
    }

    let mut buf = [0u8; 16];
    let outcome = recv_fd(b, &mut buf).map_err(|err| format!("receive: {err}"))?;
    let RecvOutcome::Descriptor { fd, len } = outcome else {
        return Err("descriptor did not arrive".to_string());
    };
    if &buf[..len] != b"probe" {
        return Err("payload mismatch".to_string());
    }

    let mut received = File::from(fd);
    let mut contents = String::new();
    received
        .read_to_string(&mut contents)
        .map_err(|err| format!("read through received fd: {err}"))?;
    if contents != "doctor-probe" {
        return Err("content mismatch through received descriptor".to_string());
    }
    Ok(())
}

/// Consume an fd-bearing message through the plain data path, then verify
/// the next control-aware receive reports the descriptor as missing.
fn descriptor_loss_check() -> CheckResult {
    let name = "descriptor_loss_detection".to_string();
    let result = (|| -> Result<(), String> {
        let (a, b) = PassSocket::stream_pair().map_err(|err| err.to_string())?;
        let file = scratch_file("loss").map_err(|err| format!("scratch file: {err}"))?;

        send_fd(&a, &file, b"mismatch").map_err(|err| format!("send: {err}"))?;
        a.send_plain(b"mismatch").map_err(|err| err.to_string())?;

        let mut buf = [0u8; 8];
        let n = b.recv_plain(&mut buf).map_err(|err| err.to_string())?;
        if n != 8 {
            return Err(format!("plain receive: {n} of 8 bytes"));
        }

        match recv_fd(&b, &mut buf).map_err(|err| format!("receive: {err}"))? {
            RecvOutcome::Missing { len: 8 } => Ok(()),
            RecvOutcome::Missing { len } => Err(format!("unexpected payload length {len}")),
            RecvOutcome::Descriptor { .. } => {
                Err("descriptor survived a plain receive".to_string())
            }
        }
    })();

    match result {
        Ok(()) => CheckResult {
            name,
            status: CheckStatus::Pass,
            detail: "loss surfaced as missing-descriptor outcome".to_string(),
        },
        Err(detail) => CheckResult {
            name,
            status: CheckStatus::Fail,
            detail,
        },
    }
}

/// An unlinked temp file; the open description outlives the path.
fn scratch_file(tag: &str) -> std::io::Result<File> {
    let path = std::env::temp_dir().join(format!("fdpass-doctor-{tag}-{}", std::process::id()));
    let file = File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)?;
    std::fs::remove_file(&path)?;
    Ok(file)
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("fdpass doctor\n");
            for c in &output.checks {
                println!("  [{:?}] {}: {}", c.status, c.name, c.detail);
            }
            println!("\noverall: {}", output.overall);
        }
    }
}
