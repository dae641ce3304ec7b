use std::io::{ErrorKind, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use scheduler::channel::UnixListenerSource;
use scheduler::{Message, Policy, ProcessClient, Request, SimConfig, Simulation};

fn config(socket: &std::path::Path) -> SimConfig {
    SimConfig {
        pacing: false,
        socket_path: socket.to_path_buf(),
        ..SimConfig::default()
    }
}

fn client(path: &std::path::Path) -> ProcessClient {
    let client = ProcessClient::connect(path).unwrap();
    client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    client
}

#[test]
fn run_over_a_real_socket() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scheduler.sock");
    let listener = UnixListenerSource::bind(&path).unwrap();
    let mut sim = Simulation::new(listener, Policy::Fifo, &config(&path)).unwrap();

    let mut process = client(&path);
    process.send_run(300).unwrap();

    let report = sim.tick();
    assert_eq!(report.commands.accepted, 1);
    assert_eq!(report.decision.dispatched.map(|pid| pid.get()), Some(1));

    let ack = process.recv().unwrap();
    assert_eq!(ack.request, Request::Ack);
    assert_eq!(ack.time_ms, 0);
    assert_eq!(process.pid(), 1);

    sim.run_ticks(3);
    let done = process.wait_done().unwrap();
    assert_eq!(done.pid, 1);
    assert_eq!(done.time_ms, 300);

    /* The server released the connection along with the PCB */
    let err = process.recv().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
}

#[test]
fn block_then_run_on_one_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scheduler.sock");
    let listener = UnixListenerSource::bind(&path).unwrap();
    let mut sim = Simulation::new(listener, Policy::RoundRobin, &config(&path)).unwrap();

    let mut process = client(&path);
    process.send_block(200).unwrap();
    sim.tick();
    assert_eq!(process.recv().unwrap().request, Request::Ack);

    sim.run_ticks(2);
    let done = process.wait_done().unwrap();
    assert_eq!(done.time_ms, 200);

    process.send_run(100).unwrap();
    sim.tick();
    let ack = process.recv().unwrap();
    assert_eq!((ack.request, ack.time_ms), (Request::Ack, 300));

    sim.tick();
    assert_eq!(process.wait_done().unwrap().time_ms, 400);
}

#[test]
fn disconnect_is_a_silent_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scheduler.sock");
    let listener = UnixListenerSource::bind(&path).unwrap();
    let mut sim = Simulation::new(listener, Policy::Sjf, &config(&path)).unwrap();

    let stays = client(&path);
    let leaves = client(&path);
    sim.tick();
    assert_eq!(sim.command_queue().len(), 2);

    drop(leaves);
    let report = sim.tick();
    assert_eq!(report.commands.cancelled, 1);
    assert_eq!(sim.command_queue().len(), 1);

    drop(stays);
}

#[test]
fn stale_socket_file_is_replaced_and_cleaned_up() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scheduler.sock");
    std::fs::write(&path, b"stale").unwrap();

    let listener = UnixListenerSource::bind(&path).unwrap();
    assert_eq!(listener.path(), path.as_path());
    assert!(ProcessClient::connect(&path).is_ok());

    drop(listener);
    assert!(!path.exists());
}

#[test]
fn blocking_client_against_a_ticking_server() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scheduler.sock");
    let listener = UnixListenerSource::bind(&path).unwrap();
    let mut sim = Simulation::new(listener, Policy::Mlfq, &config(&path)).unwrap();

    let client_path = path.clone();
    let worker = std::thread::spawn(move || {
        let mut process = client(&client_path);
        let block_ack = process.block(100).unwrap();
        let unblocked = process.wait_done().unwrap().time_ms;
        let run_ack = process.run(300).unwrap();
        let finished = process.wait_done().unwrap().time_ms;
        (block_ack, unblocked, run_ack, finished)
    });

    while !worker.is_finished() {
        sim.tick();
        std::thread::sleep(Duration::from_millis(2));
    }

    let (block_ack, unblocked, run_ack, finished) = worker.join().unwrap();
    assert_eq!(unblocked, block_ack + 100);
    assert!(run_ack >= unblocked);
    /* 300 ms at level 0 then 1: one demotion, no extra delay with a lone process */
    assert_eq!(finished, run_ack + 300);
}

#[test]
fn client_that_stops_reading_is_dropped_without_stalling_others() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scheduler.sock");
    let listener = UnixListenerSource::bind(&path).unwrap();
    let mut sim = Simulation::new(listener, Policy::Fifo, &config(&path)).unwrap();

    let mut steady = client(&path);
    steady.send_run(200).unwrap();

    /* Every BLOCK{0} earns an ACK and a DONE that are never read */
    let mut greedy = UnixStream::connect(&path).unwrap();
    let burst: Vec<u8> = (0..2000)
        .flat_map(|_| Message::new(0, Request::Block, 0).encode())
        .collect();
    greedy.write_all(&burst).unwrap();

    let mut cancelled = 0;
    for _ in 0..1000 {
        cancelled += sim.tick().commands.cancelled;
        if cancelled > 0 {
            break;
        }
    }
    assert_eq!(cancelled, 1);
    assert_eq!(sim.command_queue().len(), 0);

    assert_eq!(steady.recv().unwrap().request, Request::Ack);
    assert_eq!(steady.wait_done().unwrap().time_ms, 200);
}
