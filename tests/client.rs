use {
    crate::{
        tcp, tests::util::*, udp, AddressFamily, BasicClient, ClientTask, Endpoint, SocketType,
        ThreadState,
    },
    color_eyre::eyre::ensure,
    std::sync::mpsc,
};

#[test]
fn socket_task_runs_and_joins() -> TestResult {
    testinit();
    let (listener, addr) = listener()?;
    let mut client = tcp::Client::connect_to(addr).opname("connect_to")?;
    let (conn, _) = listener.accept().completed("accept")?;

    client
        .start(
            ClientTask::socket(|s| {
                s.send(b"from thread", 11, 0).unwrap();
            }),
            false,
        )
        .opname("start")?;
    ensure_eq!(client.thread_state(), ThreadState::Running);
    client.join().map_err(|_| color_eyre::eyre::eyre!("task panicked"))?;
    ensure_eq!(client.thread_state(), ThreadState::None);
    ensure!(client.socket().is_open());

    ensure_eq!(receive_exact(&conn, 11)?, b"from thread");
    Ok(())
}

#[test]
fn descriptor_task_sees_live_descriptor() -> TestResult {
    testinit();
    let (listener, addr) = listener()?;
    let mut client = tcp::Client::connect_to(addr).opname("connect_to")?;
    let _conn = listener.accept().completed("accept")?;
    let fd = client.file_no();

    let (tx, rx) = mpsc::channel();
    client
        .start(ClientTask::descriptor(move |fd| tx.send(fd).unwrap()), true)
        .opname("start")?;
    ensure_eq!(rx.recv()?, fd);
    Ok(())
}

#[test]
fn detached_start_hands_socket_to_thread() -> TestResult {
    testinit();
    let (listener, addr) = listener()?;
    let mut client = tcp::Client::connect_to(addr).opname("connect_to")?;
    let (conn, _) = listener.accept().completed("accept")?;

    let (go_tx, go_rx) = mpsc::channel::<()>();
    client
        .start(
            ClientTask::socket(move |s| {
                go_rx.recv().unwrap();
                s.send(b"detached", 8, 0).unwrap();
            }),
            true,
        )
        .opname("start")?;
    ensure_eq!(client.thread_state(), ThreadState::Detached);
    ensure!(!client.socket().is_open(), "client kept its socket after a detached start");

    go_tx.send(())?;
    ensure_eq!(receive_exact(&conn, 8)?, b"detached");
    Ok(())
}

#[test]
fn join_returns_task_panic() -> TestResult {
    testinit();
    let mut client = BasicClient::open_new(AddressFamily::IPv4, SocketType::Datagram, 0)
        .opname("open_new")?;
    client
        .start(ClientTask::socket(|_| panic!("task failure")), false)
        .opname("start")?;
    let payload = client.join().unwrap_err();
    ensure_eq!(payload.downcast_ref::<&str>(), Some(&"task failure"));
    ensure_eq!(client.thread_state(), ThreadState::None);
    Ok(())
}

#[test]
#[should_panic = "already has a thread"]
fn start_twice_panics() {
    let mut client =
        BasicClient::open_new(AddressFamily::IPv4, SocketType::Datagram, 0).unwrap();
    let (tx, rx) = mpsc::channel::<()>();
    client
        .start(ClientTask::socket(move |_| drop(rx.recv())), false)
        .unwrap();
    let _guard = tx;
    let _ = client.start(ClientTask::socket(|_| {}), false);
}

#[test]
#[should_panic = "no joinable client thread"]
fn join_without_thread_panics() {
    let mut client =
        BasicClient::open_new(AddressFamily::IPv4, SocketType::Datagram, 0).unwrap();
    let _ = client.join();
}

#[test]
#[should_panic = "not open"]
fn start_unopened_panics() {
    let _ = BasicClient::new().start(ClientTask::socket(|_| {}), false);
}

#[test]
fn clone_of_running_client_does_not_own_thread() -> TestResult {
    testinit();
    let mut client = BasicClient::open_new(AddressFamily::IPv4, SocketType::Datagram, 0)
        .opname("open_new")?;
    let (tx, rx) = mpsc::channel::<()>();
    client
        .start(ClientTask::socket(move |_| drop(rx.recv())), false)
        .opname("start")?;

    let clone = client.clone();
    ensure_eq!(clone.thread_state(), ThreadState::None);
    ensure!(clone.socket().same_lineage(client.socket()));

    drop(tx);
    client.join().map_err(|_| color_eyre::eyre::eyre!("task panicked"))?;
    Ok(())
}

#[test]
fn take_moves_the_thread() -> TestResult {
    testinit();
    let mut client = BasicClient::open_new(AddressFamily::IPv4, SocketType::Datagram, 0)
        .opname("open_new")?;
    client.start(ClientTask::socket(|_| {}), false).opname("start")?;
    let mut moved = client.take();
    ensure_eq!(client.thread_state(), ThreadState::None);
    ensure!(!client.socket().is_open());
    ensure_eq!(moved.thread_state(), ThreadState::Running);
    moved.join().map_err(|_| color_eyre::eyre::eyre!("task panicked"))?;
    Ok(())
}

#[test]
fn disconnect_signals_end_of_stream() -> TestResult {
    testinit();
    let (listener, addr) = listener()?;
    let client =
        tcp::Client::connect_endpoint_to(AddressFamily::IPv4, &addr.into()).opname("connect")?;
    let (conn, _) = listener.accept().completed("accept")?;

    send_all(client.socket(), b"bye")?;
    client.disconnect().opname("disconnect")?;
    ensure!(!client.socket().is_open());

    ensure_eq!(receive_exact(&conn, 3)?, b"bye");
    let mut buf = [0; 4];
    ensure_eq!(conn.receive(&mut buf, 4, 0).completed("receive")?, 0);
    Ok(())
}

#[test]
fn udp_clients_exchange_datagrams() -> TestResult {
    testinit();
    let a = udp::Client::bound(AddressFamily::IPv4, &Endpoint::new(LOCALHOST, 0))
        .opname("bound")?;
    let b = udp::Client::bound_to(loopback_addr()).opname("bound_to")?;
    let b_addr = b.local_addr().opname("local_addr")?;

    a.send_to(b"ping", 4, 0, b_addr).completed("send_to")?;
    let mut buf = [0; 8];
    let (n, from) = b.receive_from_endpoint(&mut buf, 8, 0).completed("receive_from")?;
    ensure_eq!(&buf[..n], b"ping");

    b.send_to_endpoint(b"pong", 4, 0, &from).completed("send_to")?;
    let (n, from) = a.receive_from(&mut buf, 8, 0).completed("receive_from")?;
    ensure_eq!(&buf[..n], b"pong");
    ensure_eq!(from, b_addr);
    Ok(())
}
