//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//

use std::os::unix::io::{AsRawFd, FromRawFd};

use dson::io::{FdSink, FdSource};
use dson::objects::{DsonRouteObj, DsonStringObj};
use dson::{Dson, DsonObj, XferResult};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn nonblocking_pipe() -> (std::fs::File, std::fs::File) {
    let mut fds = [0 as libc::c_int; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
    for fd in fds {
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    }
    unsafe {
        (
            std::fs::File::from_raw_fd(fds[0]),
            std::fs::File::from_raw_fd(fds[1]),
        )
    }
}

fn drive_copy<F: FnMut(&mut FdSink) -> XferResult>(mut step: F, sink: &mut FdSink) {
    loop {
        match step(sink) {
            XferResult::Ready => return,
            XferResult::InProcess => continue,
            XferResult::Error => panic!("unexpected copy error"),
        }
    }
}

fn drive_load<F: FnMut(&mut FdSource) -> XferResult>(mut step: F, source: &mut FdSource) {
    loop {
        match step(source) {
            XferResult::Ready => return,
            XferResult::InProcess => continue,
            XferResult::Error => panic!("unexpected load error"),
        }
    }
}

#[test]
fn scalar_value_round_trips_through_a_pipe_in_host_order() {
    init_tracing();
    let (read_end, write_end) = nonblocking_pipe();
    let mut sink = FdSink::new(write_end.as_raw_fd());
    let mut source = FdSource::new(read_end.as_raw_fd());

    let mut sent = Dson::from_i64(11, -9_000_000_000).unwrap();
    drive_copy(|s| sent.copy_to_fd_host_order(s), &mut sink);

    let mut received = Dson::empty();
    drive_load(|s| received.load_from_fd(s), &mut source);
    assert_eq!(received.key(), 11);
    assert_eq!(received.to_i64_or(0), -9_000_000_000);
}

#[test]
fn nested_container_round_trips_through_a_pipe_in_network_order() {
    init_tracing();
    let (read_end, write_end) = nonblocking_pipe();
    let mut sink = FdSink::new(write_end.as_raw_fd());
    let mut source = FdSource::new(read_end.as_raw_fd());

    let mut inner = Dson::empty();
    inner.insert(1, Dson::from_u32(0, 7).unwrap()).unwrap();
    inner.insert(2, Dson::from_string(0, "nested").unwrap()).unwrap();

    let mut root = Dson::empty();
    root.insert(1, Dson::from_i32(0, -5).unwrap()).unwrap();
    root.insert(2, inner).unwrap();

    drive_copy(|s| root.copy_to_fd_network_order(s), &mut sink);

    let mut received = Dson::empty();
    drive_load(|s| received.load_from_fd(s), &mut source);

    let map = received.map().unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map[&1].to_i32_or(0), -5);

    let inner_key = map[&2].key();
    drop(map);
    let inner_received = received.get_mut(inner_key).unwrap().unwrap();
    let inner_map = inner_received.map().unwrap();
    assert_eq!(inner_map[&1].to_u32_or(0), 7);
    assert_eq!(inner_map[&2].to_string_lossy().as_deref(), Some("nested"));
}

#[test]
fn opaque_object_types_round_trip_through_a_temp_file() {
    use std::io::{Seek, SeekFrom};

    let mut file = tempfile::tempfile().unwrap();

    let mut route = DsonRouteObj::new(1);
    route.set_address(dson::Address {
        from_serv_id: 1,
        from_cli_id: 2,
        to_serv_id: 3,
        to_cli_id: 4,
    });
    route.copy_to_stream_network_order(&mut file).unwrap();

    let mut string_obj = DsonStringObj::new(2, "a routed string".to_string());
    string_obj
        .copy_to_stream_network_order(&mut file)
        .unwrap();

    file.seek(SeekFrom::Start(0)).unwrap();
    let mut bytes = Vec::new();
    std::io::Read::read_to_end(&mut file, &mut bytes).unwrap();

    let mut root = dson::Dson::adopt_owned({
        // Frame the two independent records as one synthetic container
        // so a single `Dson::map()` can pull both back out.
        let mut framed = dson::Header::new(0, dson::type_marker::CONTAINER, bytes.len() as i32)
            .encode(dson::byte_order::ByteOrder::Host)
            .to_vec();
        framed.extend_from_slice(&bytes);
        framed
    })
    .unwrap();

    let map = root.map().unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map[&2].to_string_lossy().as_deref(), Some("a routed string"));
}

#[test]
fn one_megabyte_string_resumes_across_small_pipe_chunks() {
    init_tracing();
    let (read_end, write_end) = nonblocking_pipe();
    let mut sink = FdSink::new(write_end.as_raw_fd());
    let mut source = FdSource::new(read_end.as_raw_fd());

    let payload = "x".repeat(1024 * 1024);
    let mut sent = Dson::from_string(42, payload.clone()).unwrap();

    // Drive both ends concurrently in small steps: the pipe buffer is
    // far smaller than 1 MiB, so neither side can complete alone.
    let mut received = Dson::empty();
    let mut copy_done = false;
    let mut load_done = false;
    while !copy_done || !load_done {
        if !copy_done {
            copy_done = matches!(sent.copy_to_fd_host_order(&mut sink), XferResult::Ready);
        }
        if !load_done {
            load_done = matches!(received.load_from_fd(&mut source), XferResult::Ready);
        }
    }

    assert_eq!(received.key(), 42);
    assert_eq!(received.to_string_lossy().as_deref(), Some(payload.as_str()));
}

#[test]
fn inserting_into_a_single_scalar_buffer_promotes_it_to_a_container() {
    let mut scalar = Dson::from_i32(9, 123).unwrap();
    assert_eq!(scalar.to_i32_or(0), 123);

    scalar.insert(10, Dson::from_string(0, "promoted").unwrap()).unwrap();

    let map = scalar.map().unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map[&9].to_i32_or(0), 123);
    assert_eq!(map[&10].to_string_lossy().as_deref(), Some("promoted"));
}
