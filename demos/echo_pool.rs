//! A pooled echo server on the loopback interface, exercised by a handful of clients.
//!
//! Run with `cargo run --example echo_pool`.

use {
    socklib::{
        tcp::{Client, ConnectionHandler, ServerOptions},
        AddressFamily, Endpoint,
    },
    std::{error::Error, thread, time::Duration},
};

const WORKERS: usize = 3;
const CLIENTS: usize = 6;
const BUF_SIZE: usize = 256;

fn echo(conn: Client) {
    let mut buf = [0; BUF_SIZE];
    loop {
        match conn.receive(&mut buf, BUF_SIZE, 0) {
            // Peer hung up.
            Ok(Some(0)) => break,
            Ok(Some(n)) => {
                if let Err(e) = conn.send(&buf, n, 0) {
                    eprintln!("Echo failed: {e}");
                    break;
                }
            }
            Ok(None) => continue,
            Err(e) => {
                eprintln!("Receive failed: {e}");
                break;
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let server = ServerOptions::new()
        .endpoint(Endpoint::new("127.0.0.1", 0))
        .poll_interval(Duration::from_millis(100))
        .create()?;
    let addr = server.local_addr()?;
    println!("Listening on {addr}");

    server.start_pool(ConnectionHandler::client(echo), WORKERS)?;

    let clients = (0..CLIENTS)
        .map(|i| {
            thread::spawn(move || -> std::io::Result<String> {
                let endpoint = Endpoint::from(addr);
                let conn = Client::connect_endpoint_to(AddressFamily::IPv4, &endpoint)?;
                let msg = format!("Hello from client {i}!");
                conn.send(msg.as_bytes(), msg.len(), 0)?;

                let mut buf = vec![0; msg.len()];
                let mut got = 0;
                while got < msg.len() {
                    match conn.receive(&mut buf, msg.len() - got, got)? {
                        Some(0) | None => break,
                        Some(n) => got += n,
                    }
                }
                conn.disconnect()?;
                buf.truncate(got);
                Ok(String::from_utf8_lossy(&buf).into_owned())
            })
        })
        .collect::<Vec<_>>();

    for client in clients {
        match client.join() {
            Ok(Ok(answer)) => println!("Server answered: {answer}"),
            Ok(Err(e)) => eprintln!("Client failed: {e}"),
            Err(_) => eprintln!("Client thread panicked"),
        }
    }

    server.stop();
    if server.join().is_err() {
        eprintln!("Acceptor thread panicked");
    }
    Ok(())
}
