use {
    crate::{
        tcp::{Client, ConnectionHandler, Server, ServerOptions},
        tests::util::*,
        AddressFamily, Endpoint, NativeSocket, SocketHandle,
    },
    color_eyre::eyre::{ensure, eyre},
    std::{
        io,
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering::SeqCst},
            Arc, Mutex,
        },
        time::{Duration, Instant},
    },
};

const POLL: Duration = Duration::from_millis(50);
const PATIENCE: Duration = Duration::from_secs(10);

fn server() -> TestResult<(Server, std::net::SocketAddr)> {
    let server = ServerOptions::new()
        .endpoint(Endpoint::new(LOCALHOST, 0))
        .poll_interval(POLL)
        .create()
        .opname("create")?;
    let addr = server.local_addr().opname("local_addr")?;
    Ok((server, addr))
}

fn shut_down(server: &Server) -> TestResult {
    server.stop();
    server.join().map_err(|_| eyre!("acceptor panicked"))?;
    ensure!(!server.is_running());
    Ok(())
}

fn echo(socket: &SocketHandle) {
    let mut buf = [0; 64];
    while let Ok(Some(n)) = socket.receive(&mut buf, 64, 0) {
        if n == 0 || socket.send(&buf, n, 0).is_err() {
            break;
        }
    }
}

fn echo_round_trip(addr: std::net::SocketAddr, msg: &[u8]) -> TestResult {
    let conn = connect(addr)?;
    send_all(&conn, msg)?;
    ensure_eq!(receive_exact(&conn, msg.len())?, msg);
    Ok(())
}

#[test]
fn stop_and_join_without_start() -> TestResult {
    testinit();
    let (server, _) = server()?;
    let start = Instant::now();
    shut_down(&server)?;
    server.join().map_err(|_| eyre!("second join failed"))?;
    ensure!(start.elapsed() < Duration::from_secs(1));

    let idle = Server::default();
    idle.stop();
    idle.join().map_err(|_| eyre!("join failed"))?;
    Ok(())
}

#[test]
fn thread_per_connection_client_handler() -> TestResult {
    testinit();
    let (server, addr) = server()?;
    server
        .start(ConnectionHandler::client(|c: Client| echo(c.socket())))
        .opname("start")?;
    ensure!(server.is_running());
    for i in 0..4 {
        echo_round_trip(addr, format!("message {i}").as_bytes())?;
    }
    shut_down(&server)
}

#[test]
fn thread_per_connection_socket_handler() -> TestResult {
    testinit();
    let (server, addr) = server()?;
    server
        .start(ConnectionHandler::socket(|s: SocketHandle| echo(&s)))
        .opname("start")?;
    // Connections are served concurrently: hold one open while using another.
    let idle = connect(addr)?;
    echo_round_trip(addr, b"while another connection idles")?;
    drop(idle);
    shut_down(&server)
}

#[test]
fn thread_per_connection_descriptor_handler() -> TestResult {
    testinit();
    let (server, addr) = server()?;
    let seen = Arc::new(Mutex::new(Vec::<NativeSocket>::new()));
    let seen2 = Arc::clone(&seen);
    server
        .start(ConnectionHandler::descriptor(move |fd| seen2.lock().unwrap().push(fd)))
        .opname("start")?;
    let _conn = connect(addr)?;
    wait_until("descriptor handler", PATIENCE, || !seen.lock().unwrap().is_empty())?;
    ensure!(seen.lock().unwrap()[0] != crate::INVALID_SOCKET);
    shut_down(&server)
}

#[test]
fn pool_serves_in_arrival_order() -> TestResult {
    const CLIENTS: u8 = 5;
    testinit();
    let (server, addr) = server()?;
    let order = Arc::new(Mutex::new(Vec::new()));
    let release = Arc::new(AtomicBool::new(false));

    let (order2, release2) = (Arc::clone(&order), Arc::clone(&release));
    let handler = ConnectionHandler::socket(move |s| {
        let Ok(id) = receive_exact(&s, 1) else { return };
        order2.lock().unwrap().push(id[0]);
        if id[0] == 0 {
            while !release2.load(SeqCst) {
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    });
    server.start_pool(handler, 1).opname("start_pool")?;

    let mut conns = Vec::new();
    for id in 0..CLIENTS {
        let conn = connect(addr)?;
        send_all(&conn, &[id])?;
        conns.push(conn);
        if id == 0 {
            // Let the only worker pick up the first connection before queueing the rest.
            wait_until("first connection", PATIENCE, || order.lock().unwrap().len() == 1)?;
        }
    }
    wait_until("queue to fill", PATIENCE, || {
        server.queued_connections() == usize::from(CLIENTS - 1)
    })?;
    release.store(true, SeqCst);
    wait_until("all connections", PATIENCE, || {
        order.lock().unwrap().len() == usize::from(CLIENTS)
    })?;

    ensure_eq!(*order.lock().unwrap(), (0..CLIENTS).collect::<Vec<_>>());
    shut_down(&server)
}

#[test]
fn pool_handles_each_connection_once() -> TestResult {
    const CLIENTS: u8 = 8;
    testinit();
    let (server, addr) = server()?;
    let served = Arc::new(Mutex::new(Vec::new()));
    let served2 = Arc::clone(&served);
    server
        .start_pool(
            ConnectionHandler::client(move |c: Client| {
                let Ok(id) = receive_exact(c.socket(), 1) else { return };
                served2.lock().unwrap().push(id[0]);
                let _ = c.send(&id, 1, 0);
            }),
            3,
        )
        .opname("start_pool")?;

    let handles = (0..CLIENTS)
        .map(|id| {
            std::thread::spawn(move || -> TestResult {
                let conn = connect(addr)?;
                send_all(&conn, &[id])?;
                ensure_eq!(receive_exact(&conn, 1)?, [id]);
                Ok(())
            })
        })
        .collect::<Vec<_>>();
    for h in handles {
        h.join().map_err(|_| eyre!("client thread panicked"))??;
    }

    let mut served = served.lock().unwrap().clone();
    served.sort_unstable();
    ensure_eq!(served, (0..CLIENTS).collect::<Vec<_>>());
    shut_down(&server)
}

#[test]
fn pool_survives_handler_panic() -> TestResult {
    testinit();
    let (server, addr) = server()?;
    server
        .start_pool(
            ConnectionHandler::socket(|s| {
                let Ok(msg) = receive_exact(&s, 1) else { return };
                if msg[0] == b'!' {
                    panic!("handler failure");
                }
                let _ = s.send(&msg, 1, 0);
            }),
            1,
        )
        .opname("start_pool")?;

    let doomed = connect(addr)?;
    send_all(&doomed, b"!")?;
    let mut buf = [0; 1];
    // The connection is closed once the panicking handler unwinds.
    let _ = doomed.receive(&mut buf, 1, 0);

    let conn = connect(addr)?;
    send_all(&conn, b"?")?;
    ensure_eq!(receive_exact(&conn, 1)?, b"?");
    shut_down(&server)
}

#[test]
fn pool_descriptor_handler() -> TestResult {
    testinit();
    let (server, addr) = server()?;
    let count = Arc::new(Mutex::new(0_usize));
    let count2 = Arc::clone(&count);
    server
        .start_pool(
            ConnectionHandler::descriptor(move |fd: NativeSocket| {
                if fd != crate::INVALID_SOCKET {
                    *count2.lock().unwrap() += 1;
                }
            }),
            2,
        )
        .opname("start_pool")?;
    let _a = connect(addr)?;
    let _b = connect(addr)?;
    wait_until("both connections", PATIENCE, || *count.lock().unwrap() == 2)?;
    shut_down(&server)
}

#[test]
fn stop_discards_queued_connections() -> TestResult {
    testinit();
    let (server, addr) = server()?;
    let busy = Arc::new(AtomicBool::new(false));
    let release = Arc::new(AtomicBool::new(false));
    let (busy2, release2) = (Arc::clone(&busy), Arc::clone(&release));
    server
        .start_pool(
            ConnectionHandler::socket(move |_| {
                busy2.store(true, SeqCst);
                while !release2.load(SeqCst) {
                    std::thread::sleep(Duration::from_millis(5));
                }
            }),
            1,
        )
        .opname("start_pool")?;

    let _first = connect(addr)?;
    wait_until("worker to get busy", PATIENCE, || busy.load(SeqCst))?;
    let queued = connect(addr)?;
    wait_until("queue", PATIENCE, || server.queued_connections() == 1)?;

    server.stop();
    ensure_eq!(server.queued_connections(), 0);
    queued.set_timeout(Duration::from_secs(5)).opname("set_timeout")?;
    let mut buf = [0; 1];
    match queued.receive(&mut buf, 1, 0) {
        Ok(Some(0)) | Err(_) => {}
        other => color_eyre::eyre::bail!("queued connection was not closed: {other:?}"),
    }

    release.store(true, SeqCst);
    server.join().map_err(|_| eyre!("acceptor panicked"))?;
    Ok(())
}

#[test]
fn restart_after_join() -> TestResult {
    testinit();
    let (server, addr) = server()?;
    server.start(ConnectionHandler::socket(|s| echo(&s))).opname("start")?;
    shut_down(&server)?;
    server.start_pool(ConnectionHandler::socket(|s| echo(&s)), 2).opname("start_pool")?;
    echo_round_trip(addr, b"second life")?;
    shut_down(&server)
}

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    (Arc::clone(&count), count)
}

#[test]
fn restart_without_join_retires_old_acceptor() -> TestResult {
    const CLIENTS: usize = 20;
    testinit();
    let (server, addr) = server()?;
    let (old, old2) = counter();
    let (new, new2) = counter();
    server
        .start(ConnectionHandler::socket(move |_| {
            old2.fetch_add(1, SeqCst);
        }))
        .opname("start")?;
    server.stop();
    server
        .start(ConnectionHandler::socket(move |_| {
            new2.fetch_add(1, SeqCst);
        }))
        .opname("restart")?;

    for _ in 0..CLIENTS {
        drop(connect(addr)?);
    }
    wait_until("new handler", PATIENCE, || new.load(SeqCst) == CLIENTS)?;
    ensure_eq!(old.load(SeqCst), 0);
    shut_down(&server)
}

#[test]
fn restarted_pool_leaves_out_old_workers() -> TestResult {
    const CLIENTS: usize = 10;
    testinit();
    let (server, addr) = server()?;
    let (old, old2) = counter();
    let (new, new2) = counter();
    let release = Arc::new(AtomicBool::new(false));
    let release2 = Arc::clone(&release);
    server
        .start_pool(
            ConnectionHandler::socket(move |_| {
                old2.fetch_add(1, SeqCst);
                while !release2.load(SeqCst) {
                    std::thread::sleep(Duration::from_millis(5));
                }
            }),
            1,
        )
        .opname("start_pool")?;
    let _busy = connect(addr)?;
    wait_until("old worker to get busy", PATIENCE, || old.load(SeqCst) == 1)?;
    shut_down(&server)?;

    server
        .start_pool(
            ConnectionHandler::socket(move |_| {
                new2.fetch_add(1, SeqCst);
            }),
            1,
        )
        .opname("restart")?;
    release.store(true, SeqCst);
    for _ in 0..CLIENTS {
        drop(connect(addr)?);
    }
    wait_until("new handler", PATIENCE, || new.load(SeqCst) == CLIENTS)?;
    ensure_eq!(old.load(SeqCst), 1);
    shut_down(&server)
}

#[test]
fn start_requires_listening_socket() -> TestResult {
    testinit();
    let server = Server::new(AddressFamily::IPv4).opname("new")?;
    server.bind(loopback_addr()).opname("bind")?;
    ensure!(!server.socket().is_listening().opname("is_listening")?);

    let err = server.start(ConnectionHandler::socket(|_| {})).unwrap_err();
    ensure_eq!(err.kind(), io::ErrorKind::InvalidInput);
    let err = server.start_pool(ConnectionHandler::socket(|_| {}), 2).unwrap_err();
    ensure_eq!(err.kind(), io::ErrorKind::InvalidInput);
    ensure!(!server.is_running());

    server.listen_default().opname("listen")?;
    ensure!(server.socket().is_listening().opname("is_listening")?);
    server.start(ConnectionHandler::socket(|_| {})).opname("start")?;
    shut_down(&server)
}

/// Linux turns a shut down listener back into an unconnected socket, which then fails to accept.
#[cfg(target_os = "linux")]
#[test]
fn server_stops_when_listener_cannot_accept() -> TestResult {
    testinit();
    let (mut server, _) = server()?;
    server.set_poll_interval(Duration::from_secs(1));
    server.start_pool(ConnectionHandler::socket(|_| {}), 1).opname("start_pool")?;
    let _ = server.socket().shutdown(std::net::Shutdown::Both);

    wait_until("server to stop", Duration::from_secs(2), || !server.is_running())?;
    server.join().map_err(|_| eyre!("acceptor panicked"))?;
    Ok(())
}

#[test]
fn clones_share_running_state() -> TestResult {
    testinit();
    let (mut server, addr) = server()?;
    let clone = server.clone();
    server.start(ConnectionHandler::socket(|s| echo(&s))).opname("start")?;
    ensure!(clone.is_running());
    echo_round_trip(addr, b"shared")?;
    shut_down(&clone)?;
    ensure!(!server.is_running());

    let taken = server.take();
    ensure!(!server.socket().is_open());
    ensure!(taken.socket().is_open());
    server.join().map_err(|_| eyre!("join of a fresh server failed"))?;
    Ok(())
}

#[test]
#[should_panic = "already running"]
fn start_twice_panics() {
    let server = Server::bind_addr(loopback_addr(), 16).unwrap();
    server.start(ConnectionHandler::socket(|_| {})).unwrap();
    let _ = server.start(ConnectionHandler::socket(|_| {}));
}

#[test]
fn bind_helpers() -> TestResult {
    testinit();
    let server = Server::bind_to(AddressFamily::IPv4, &Endpoint::new(LOCALHOST, 0), 8)
        .opname("bind_to")?;
    ensure_eq!(server.socket().family(), AddressFamily::IPv4);
    ensure!(server.local_addr().opname("local_addr")?.port() != 0);

    let manual = Server::new(AddressFamily::IPv4).opname("new")?;
    manual.bind(loopback_addr()).opname("bind")?;
    manual.listen_default().opname("listen")?;
    let addr = manual.local_addr().opname("local_addr")?;
    let _conn = connect(addr)?;
    manual.close().opname("close")?;
    ensure_eq!(manual.file_no(), crate::INVALID_SOCKET);
    Ok(())
}
