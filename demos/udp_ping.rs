//! Two UDP clients trading datagrams, one of them on a background client thread.
//!
//! Run with `cargo run --example udp_ping`.

use {
    socklib::{udp, AddressFamily, ClientTask, Endpoint},
    std::{error::Error, time::Duration},
};

const ROUNDS: u8 = 3;

fn main() -> Result<(), Box<dyn Error>> {
    let loopback = Endpoint::new("127.0.0.1", 0);
    let mut ponger = udp::Client::bound(AddressFamily::IPv4, &loopback)?;
    let pinger = udp::Client::bound(AddressFamily::IPv4, &loopback)?;
    let ponger_addr = ponger.local_addr()?;

    // Answers every ping with a pong carrying the same sequence number.
    ponger.start(
        ClientTask::socket(|socket| {
            let mut buf = [0; 5];
            for _ in 0..ROUNDS {
                let (n, from) = match socket.receive_from(&mut buf, 5, 0) {
                    Ok(Some(got)) => got,
                    Ok(None) => continue,
                    Err(e) => {
                        eprintln!("Ponger failed to receive: {e}");
                        return;
                    }
                };
                buf[..4].copy_from_slice(b"pong");
                if let Err(e) = socket.send_to(&buf, n, 0, from) {
                    eprintln!("Ponger failed to reply: {e}");
                }
            }
        }),
        false,
    )?;

    pinger.socket().set_timeout(Duration::from_secs(2))?;
    let mut buf = [0; 5];
    for seq in 0..ROUNDS {
        let ping = [b'p', b'i', b'n', b'g', seq];
        pinger.send_to(&ping, ping.len(), 0, ponger_addr)?;
        match pinger.receive_from_endpoint(&mut buf, 5, 0)? {
            Some((n, from)) => {
                let word = String::from_utf8_lossy(&buf[..n.saturating_sub(1)]);
                println!("{word} #{} from {from}", buf[4]);
            }
            None => println!("Ping #{seq} timed out"),
        }
    }

    if ponger.join().is_err() {
        eprintln!("Ponger thread panicked");
    }
    Ok(())
}
