use crate::shared::net::udp_server::UdpParams;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{net, thread, time};

// Raised from the signal handler. Only async-signal-safe work happens in
// the handler itself; the relay thread does everything else.
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_stop_signal(_signal: libc::c_int) {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

/// Installs the SIGINT/SIGTERM handler requesting a clean shutdown, and
/// spawns the thread relaying the request to the rest of the process: on
/// a termination signal it raises the shared `stop` flag and wakes the
/// server socket, so the loop blocked in `recv_from` can observe the flag
/// and return.
pub fn install_stop_handler(stop: &Arc<AtomicBool>, udp_params: &UdpParams) {
    unsafe {
        let handler = handle_stop_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }

    let stop = Arc::clone(stop);
    let server_address = (udp_params.address.clone(), udp_params.port);
    thread::spawn(move || loop {
        if STOP_REQUESTED.load(Ordering::SeqCst) || stop.load(Ordering::SeqCst) {
            stop.store(true, Ordering::SeqCst);
            wake_up_server(&server_address.0, server_address.1);
            return;
        }
        thread::sleep(time::Duration::from_millis(200));
    });
}

/// Dirty hack. The only way to interrupt the blocking UDP 'recv_from'
/// call is sending it a message: the server checks the stop flag right
/// after every receive, so one dummy datagram unblocks it.
#[allow(unused_must_use)]
fn wake_up_server(address: &str, port: u16) {
    let server_addr: (&str, u16) = (address, port);
    match net::UdpSocket::bind("0.0.0.0:0") {
        Ok(udp_sock) => udp_sock.send_to(&[0], server_addr),
        Err(_) => return,
    };
}
