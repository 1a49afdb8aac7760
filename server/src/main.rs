// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `rsp-replay-server`: an RSP stub that replays a pre-recorded trace to a
//! connecting debugger instead of executing anything.

use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use replay_trace::Architecture;
use rsp_protocol::{encode_packet, Frame, FrameReader, Session};

/// Replay a recorded execution trace as if it were a live target, so a
/// source-level debugger can step and inspect it over RSP.
#[derive(Debug, Parser)]
#[clap(max_term_width = 80)]
struct ServerArgs {
    /// Path to the recorded trace file.
    trace_path: PathBuf,

    /// Trace format: one of `spike`, `sifive-rtl`, `jsonl`.
    #[clap(short, long)]
    format: String,

    /// Address to bind the debugger-facing listener on.
    #[clap(long, default_value = "localhost")]
    host: String,

    /// TCP port to listen on.
    #[clap(long, default_value_t = 1234)]
    port: u16,

    /// Increase log verbosity. Repeat for more (`-v` = debug, `-vv` = trace).
    #[clap(short, long, parse(from_occurrences))]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = ServerArgs::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            // A bind failure and a trace-load failure are distinguished so
            // scripts driving this binary can tell them apart.
            if e.downcast_ref::<std::io::Error>()
                .map(|io| io.kind() == ErrorKind::AddrInUse || io.kind() == ErrorKind::AddrNotAvailable)
                .unwrap_or(false)
            {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(args: &ServerArgs) -> Result<()> {
    let text = fs::read_to_string(&args.trace_path)
        .with_context(|| format!("reading trace file {}", args.trace_path.display()))?;
    // Both shipped formats are recordings of RISC-V targets today; a future
    // format with a different architecture would thread its own descriptor
    // through here instead of this fixed default.
    let trace = replay_formats::parse(&args.format, &text, Architecture::riscv32())
        .with_context(|| format!("parsing trace as {}", args.format))?;
    info!("loaded {} events from {}", trace_len(&trace), args.trace_path.display());

    let listener = TcpListener::bind((args.host.as_str(), args.port))
        .with_context(|| format!("binding {}:{}", args.host, args.port))?;
    info!("listening on {}:{}", args.host, args.port);

    loop {
        let (stream, peer) = listener.accept().context("accepting connection")?;
        info!("debugger connected from {peer}");
        if let Err(e) = serve_connection(stream, Rc::clone(&trace)) {
            warn!("connection from {peer} ended: {e}");
        }
        info!("debugger disconnected");
    }
}

fn trace_len(trace: &Rc<dyn replay_trace::TraceSource>) -> usize {
    trace.len()
}

/// One RSP session over one accepted connection. A new `Session` is built
/// per connection (cursor reset to -1, breakpoints cleared); the underlying
/// trace is shared, read-only, across connections.
fn serve_connection(mut stream: TcpStream, trace: Rc<dyn replay_trace::TraceSource>) -> Result<()> {
    let mut session = Session::new(trace);
    let mut reader = FrameReader::new();
    // The last framed reply we sent, kept around so a `-` (Nack) can be
    // answered by retransmitting it rather than silently dropped (spec
    // §4.E/§3: "retransmits on `-` until `+` or noack mode is active").
    let mut last_reply: Option<Vec<u8>> = None;
    // Used only to detect a pending 0x03 between cursor motions during
    // `c`/`bc`; the blocking reads that drive packet framing itself use a
    // regular blocking read.
    stream
        .set_nonblocking(false)
        .context("configuring blocking mode")?;

    let mut buf = [0u8; 512];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => return Ok(()), // debugger closed the connection
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("reading from debugger"),
        };

        for &byte in &buf[..n] {
            match reader.push(byte) {
                Some(Frame::Packet(payload)) => {
                    if !session.noack() {
                        stream.write_all(b"+").context("sending ack")?;
                    }
                    let mut interrupt_stream = stream.try_clone().context("cloning socket")?;
                    let mut interrupted = move || poll_interrupt(&mut interrupt_stream);
                    let reply = session.handle_packet(&payload, &mut interrupted);
                    let framed = encode_packet(&reply);
                    stream.write_all(&framed).context("sending reply")?;
                    last_reply = Some(framed);
                }
                Some(Frame::BadChecksum) => {
                    stream.write_all(b"-").context("sending nack")?;
                }
                Some(Frame::Ack) => {}
                Some(Frame::Nack) => {
                    if let Some(framed) = &last_reply {
                        stream.write_all(framed).context("retransmitting reply")?;
                    }
                }
                Some(Frame::Interrupt) => {
                    // Arrived between packets rather than mid-motion; there
                    // is nothing running to interrupt, so it is dropped.
                }
                None => {}
            }
        }
    }
}

/// Non-blocking peek for a pending `0x03`, used as the `interrupted`
/// closure passed into `continue_forward`/`continue_backward`.
fn poll_interrupt(stream: &mut TcpStream) -> bool {
    stream.set_nonblocking(true).ok();
    let mut buf = [0u8; 1];
    let result = stream.peek(&mut buf);
    stream.set_nonblocking(false).ok();
    matches!(result, Ok(n) if n > 0 && buf[0] == 0x03)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_with_defaults() {
        let args = ServerArgs::parse_from(["rsp-replay-server", "trace.jsonl", "-f", "jsonl"]);
        assert_eq!(args.host, "localhost");
        assert_eq!(args.port, 1234);
        assert_eq!(args.verbose, 0);
        assert_eq!(args.format, "jsonl");
    }

    #[test]
    fn args_accept_overridden_host_and_port() {
        let args = ServerArgs::parse_from([
            "rsp-replay-server",
            "trace.jsonl",
            "-f",
            "spike",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "-vv",
        ]);
        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.port, 9000);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn a_connection_with_no_pending_bytes_is_not_interrupted() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (mut server_side, _) = listener.accept().unwrap();
        assert!(!poll_interrupt(&mut server_side));
        drop(client);
    }

    #[test]
    fn a_pending_0x03_byte_is_observed_without_being_consumed() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).unwrap();
        let (mut server_side, _) = listener.accept().unwrap();
        client.write_all(&[0x03]).unwrap();
        // Give the byte a moment to arrive; loopback delivery is effectively
        // immediate but not synchronous with the write call returning.
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(poll_interrupt(&mut server_side));
        // peek must not have consumed it.
        let mut buf = [0u8; 1];
        server_side.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], 0x03);
    }
}
