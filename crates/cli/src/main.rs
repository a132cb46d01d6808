//! keycmd CLI: send one command byte to a HID keyboard.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use keycmd_core::command::Command;
use keycmd_core::comm::DEFAULT_OPEN_RETRY_DELAY_MS;
use keycmd_core::device::{self, parse_usb_id, DeviceIds, HidApiBackend};
use keycmd_core::error::Error;
use keycmd_core::sender::{CommandSender, SendReport, SenderConfig, DEFAULT_REPLY_TIMEOUT_MS};

#[derive(Parser, Debug)]
#[command(
    name = "keycmd",
    version,
    about = "Send a single command byte to a HID keyboard"
)]
struct Cli {
    /// Command code to send (0-255, decimal unless --hex).
    #[arg(allow_negative_numbers = true)]
    command: Option<String>,

    /// Parse the command code as hexadecimal.
    #[arg(long)]
    hex: bool,

    /// USB vendor id (hex).
    #[arg(long, value_parser = parse_usb_id, default_value = "FEED")]
    vid: u16,

    /// USB product id (hex).
    #[arg(long, value_parser = parse_usb_id, default_value = "1337")]
    pid: u16,

    /// Retry opening the device this many times.
    #[arg(long, default_value_t = 0)]
    open_retries: u32,

    /// Delay between open attempts in milliseconds.
    #[arg(long, default_value_t = DEFAULT_OPEN_RETRY_DELAY_MS)]
    open_retry_delay_ms: u64,

    /// Read and decode the device's reply after sending.
    #[arg(long)]
    read_reply: bool,

    /// How long to wait for a reply in milliseconds.
    #[arg(long, default_value_t = DEFAULT_REPLY_TIMEOUT_MS)]
    reply_timeout_ms: u64,

    /// List connected devices matching --vid/--pid and exit.
    #[arg(long, conflicts_with = "command")]
    list: bool,

    /// Print the send report as JSON.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn ids(&self) -> DeviceIds {
        DeviceIds::new(self.vid, self.pid)
    }

    fn sender_config(&self) -> SenderConfig {
        SenderConfig {
            ids: self.ids(),
            open_retries: self.open_retries,
            open_retry_delay: Duration::from_millis(self.open_retry_delay_ms),
            read_reply: self.read_reply,
            reply_timeout: Duration::from_millis(self.reply_timeout_ms),
        }
    }

    fn parse_command(&self) -> keycmd_core::error::Result<Command> {
        match (self.command.as_deref(), self.hex) {
            (Some(s), true) => Command::parse_hex(s),
            (arg, _) => Command::from_arg(arg),
        }
    }
}

/// Process exit status for a failed run.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>() {
        Some(Error::InvalidCommand { .. }) => 2,
        Some(Error::DeviceUnavailable(_)) => 3,
        Some(Error::WriteFailed(_)) => 4,
        Some(Error::ReadFailed(_)) | Some(Error::ReplyTimeout(_)) => 5,
        None => 1,
    }
}

fn print_report(report: &SendReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Sent command {} to {}", report.command, report.device);
    if let Some(reply) = &report.reply {
        println!("Device reply: {reply}");
    }
    Ok(())
}

fn list_devices(ids: DeviceIds, json: bool) -> Result<()> {
    let devices = device::discover_devices(ids)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else if devices.is_empty() {
        println!("No device {ids} found.");
        println!("Ensure the keyboard is connected and you have permission to access it.");
    } else {
        for dev in &devices {
            println!(
                "{} (interface: {}, product: {}, serial: {}, path: {})",
                dev.ids,
                dev.interface_number,
                dev.product.as_deref().unwrap_or("-"),
                dev.serial.as_deref().unwrap_or("-"),
                dev.path
            );
        }
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    if cli.list {
        return list_devices(cli.ids(), cli.json);
    }

    let command = cli.parse_command()?;
    let config = cli.sender_config();
    tracing::debug!(?config, "Sender configured");

    let sender = CommandSender::new(HidApiBackend::new(), config);
    let report = sender
        .send_command(command)
        .with_context(|| format!("sending command {command} to {}", cli.ids()))?;

    print_report(&report, cli.json)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}
