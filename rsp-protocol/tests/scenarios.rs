// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenarios driven over a real loopback socket, one `Session`
//! per connection, mirroring how the server binary wires `FrameReader` and
//! `Session` together but without any of its CLI/config plumbing.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::rc::Rc;
use std::thread;

use replay_trace::{Architecture, MaterializedTraceSource, MemWrite, RegWrite, TraceEvent, TraceSource};
use rsp_protocol::{encode_packet, Frame, FrameReader, Session};

fn event(index: u64, pc_before: u64, pc_after: u64) -> TraceEvent {
    TraceEvent {
        index,
        pc_before,
        pc_after,
        reg_writes: vec![RegWrite { reg: 10, old_value: if index == 0 { None } else { Some(index) }, new_value: index + 1 }],
        mem_writes: if index == 0 {
            vec![MemWrite {
                address: 0x2000,
                width: 4,
                old_bytes: Some(vec![0, 0, 0, 0]),
                new_bytes: vec![0x11, 0x22, 0x33, 0x44],
            }]
        } else {
            vec![]
        },
        mem_reads: vec![],
        disasm_hint: None,
    }
}

fn spawn_server(event_count: u64) -> (std::net::SocketAddr, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let events = (0..event_count).map(|i| event(i, i * 4, (i + 1) * 4)).collect();
        let trace: Rc<dyn TraceSource> =
            Rc::new(MaterializedTraceSource::new(events, Architecture::riscv32()).unwrap());
        let mut session = Session::new(trace);
        let mut reader = FrameReader::new();
        let mut buf = [0u8; 1];
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(_) => break,
            };
            if n == 0 {
                break;
            }
            if let Some(frame) = reader.push(buf[0]) {
                match frame {
                    Frame::Packet(payload) => {
                        stream.write_all(b"+").unwrap();
                        let reply = session.handle_packet(&payload, &mut || false);
                        stream.write_all(&encode_packet(&reply)).unwrap();
                    }
                    Frame::BadChecksum => {
                        stream.write_all(b"-").unwrap();
                    }
                    Frame::Ack | Frame::Nack | Frame::Interrupt => {}
                }
            }
        }
    });
    (addr, handle)
}

struct Client {
    stream: TcpStream,
    reader: FrameReader,
}

impl Client {
    fn connect(addr: std::net::SocketAddr) -> Self {
        Self { stream: TcpStream::connect(addr).unwrap(), reader: FrameReader::new() }
    }

    /// Sends a packet and returns the decoded reply payload, skipping over
    /// the leading `+` ack byte.
    fn roundtrip(&mut self, payload: &[u8]) -> Vec<u8> {
        self.stream.write_all(&encode_packet(payload)).unwrap();
        let mut buf = [0u8; 1];
        loop {
            self.stream.read_exact(&mut buf).unwrap();
            match self.reader.push(buf[0]) {
                Some(Frame::Ack) => continue,
                Some(Frame::Packet(reply)) => return reply,
                Some(Frame::BadChecksum) => panic!("server sent a malformed reply"),
                _ => continue,
            }
        }
    }
}

// S1: connect + status.
#[test]
fn connect_and_query_status() {
    let (addr, _handle) = spawn_server(3);
    let mut client = Client::connect(addr);

    let supported = client.roundtrip(b"qSupported:multiprocess+;swbreak+");
    let supported = String::from_utf8(supported).unwrap();
    assert!(supported.contains("ReverseStep+"));
    assert!(supported.contains("ReverseContinue+"));

    let status = client.roundtrip(b"?");
    assert_eq!(status, b"S05");
}

// S2: step forward then reverse-step restores the prior state.
#[test]
fn step_then_reverse_step() {
    let (addr, _handle) = spawn_server(3);
    let mut client = Client::connect(addr);

    let step = client.roundtrip(b"s");
    assert_eq!(step, b"T05thread:1;");

    let regs_after_step = client.roundtrip(b"g");

    let reverse = client.roundtrip(b"bs");
    assert_eq!(reverse, b"T05thread:1;reason:trace-start;");

    let regs_after_reverse = client.roundtrip(b"g");
    assert_ne!(regs_after_step, regs_after_reverse);
}

// S3: breakpoint insert then continue stops there.
#[test]
fn breakpoint_continue_stops_at_address() {
    let (addr, _handle) = spawn_server(5);
    let mut client = Client::connect(addr);

    // event[2].pc_after == 0xc
    let insert = client.roundtrip(b"Z0,c,4");
    assert_eq!(insert, b"OK");

    let stop = client.roundtrip(b"c");
    let stop = String::from_utf8(stop).unwrap();
    assert!(stop.contains("swbreak:;"));
    assert!(stop.contains("0c000000")); // pc, little-endian hex
}

// S4: reverse-continue runs all the way back to the start of the trace.
#[test]
fn reverse_continue_reaches_trace_start() {
    let (addr, _handle) = spawn_server(3);
    let mut client = Client::connect(addr);

    for _ in 0..3 {
        client.roundtrip(b"s");
    }
    let stop = client.roundtrip(b"bc");
    assert_eq!(stop, b"T05thread:1;reason:trace-start;");
}

// S5: memory load then read.
#[test]
fn memory_write_then_read() {
    let (addr, _handle) = spawn_server(1);
    let mut client = Client::connect(addr);

    let write = client.roundtrip(b"M3000,2:cafe");
    assert_eq!(write, b"OK");

    let read = client.roundtrip(b"m3000,2");
    assert_eq!(read, b"cafe");
}

// S6: reading memory never recorded anywhere is fully unavailable.
#[test]
fn read_of_never_written_memory_is_an_error() {
    let (addr, _handle) = spawn_server(1);
    let mut client = Client::connect(addr);

    let read = client.roundtrip(b"mf000,4");
    assert_eq!(read, b"E14");
}
