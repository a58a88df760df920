#![cfg(unix)]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! End-to-end session over real named pipes
//!
//! Plays the client side: creates the request pipe, connects to the server
//! thread, exchanges a few commands and checks that both pipe paths are
//! gone once the session ends.

use segarc_format::ArchiveBuilder;
use segarc_server::channel::make_fifo;
use segarc_server::{Server, ServerConfig, SessionEnd};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::thread;
use tempfile::TempDir;

fn read_exact(pipe: &mut File, n: usize) -> Vec<u8> {
    let mut buf = vec![0; n];
    pipe.read_exact(&mut buf).unwrap();
    buf
}

fn send(pipe: &mut File, parts: &[&[u8]]) {
    for part in parts {
        pipe.write_all(part).unwrap();
    }
    pipe.flush().unwrap();
}

fn connect(request: &Path, response: &Path) -> (File, File) {
    // The server creates the response pipe before opening the request
    // pipe, so it exists once this open returns.
    let req = OpenOptions::new().write(true).open(request).unwrap();
    let resp = File::open(response).unwrap();
    (req, resp)
}

#[test]
fn session_over_named_pipes() {
    let dir = TempDir::new().unwrap();
    let request = dir.path().join("REQ_PIPE");
    let response = dir.path().join("RESP_PIPE");
    let archive = dir.path().join("archive.bin");
    std::fs::write(
        &archive,
        ArchiveBuilder::new(40)
            .section("a", 13, b"hello".to_vec())
            .section("b", 13, b"world".to_vec())
            .build()
            .unwrap(),
    )
    .unwrap();

    make_fifo(&request, 0o600).unwrap();

    let config = ServerConfig {
        request_pipe: request.clone(),
        response_pipe: response.clone(),
        shm_name: format!("/segarc_it_{}", std::process::id()),
        variant: 75664,
    };
    let server = Server::new(config).unwrap();
    assert_eq!(server.config().request_pipe, request);
    assert_eq!(server.config().variant, 75664);
    let handle = thread::spawn(move || server.run());

    let (mut req, mut resp) = connect(&request, &response);
    assert_eq!(read_exact(&mut resp, 6), b"BEGIN!");

    send(&mut req, &[b"PING!".as_slice()]);
    let pong = read_exact(&mut resp, 14);
    assert_eq!(&pong[..5], b"PING!");
    assert_eq!(u32::from_le_bytes(pong[5..9].try_into().unwrap()), 75664);
    assert_eq!(&pong[9..], b"PONG!");

    send(
        &mut req,
        &[
            b"MAP_FILE!".as_slice(),
            archive.to_str().unwrap().as_bytes(),
            b"!",
        ],
    );
    assert_eq!(read_exact(&mut resp, 17), b"MAP_FILE!SUCCESS!");

    // no output buffer yet
    send(
        &mut req,
        &[
            b"READ_FROM_FILE_OFFSET!".as_slice(),
            &0u32.to_le_bytes(),
            &4u32.to_le_bytes(),
        ],
    );
    assert_eq!(read_exact(&mut resp, 28), b"READ_FROM_FILE_OFFSET!ERROR!");

    send(&mut req, &[b"EXIT!".as_slice()]);
    let end = handle.join().unwrap().unwrap();
    assert_eq!(end, SessionEnd::Exit);

    // the server closed its end
    let mut rest = Vec::new();
    resp.read_to_end(&mut rest).unwrap();
    assert!(rest.is_empty());

    assert!(!request.exists());
    assert!(!response.exists());
}

#[test]
fn closing_request_pipe_ends_session() {
    let dir = TempDir::new().unwrap();
    let request = dir.path().join("req");
    let response = dir.path().join("resp");
    make_fifo(&request, 0o600).unwrap();

    let server = Server::new(ServerConfig {
        request_pipe: request.clone(),
        response_pipe: response.clone(),
        shm_name: format!("/segarc_it_eof_{}", std::process::id()),
        variant: 1,
    })
    .unwrap();
    let handle = thread::spawn(move || server.run());

    let (req, mut resp) = connect(&request, &response);
    assert_eq!(read_exact(&mut resp, 6), b"BEGIN!");
    drop(req);

    assert_eq!(handle.join().unwrap().unwrap(), SessionEnd::ChannelClosed);
    assert!(!request.exists());
    assert!(!response.exists());
}
