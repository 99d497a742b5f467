//! C ABI for linking multipeer-core as a static library from iOS/Android hosts.
//! The host owns the platform transport and UI: it reports transport callbacks here, renders
//! the log and title read back from here, and executes the transport commands it drains.
//! Every function must be called from the host's UI thread.

use std::collections::VecDeque;
use std::ffi::c_void;
use std::os::raw::c_int;
use std::slice;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::identity::{LocalIdentity, PeerId};
use crate::log::{MessageLog, Origin};
use crate::protocol::{PeerState, Reliability, ServiceTag};
use crate::settings::{FileSettings, MemorySettings};
use crate::store::IdentityStore;
use crate::transport::{PeerTransport, TransportError, UiSurface};
use crate::SessionController;

/// Command kinds written by `mpc_session_next_command`.
pub const CMD_ADVERTISE: u8 = 1;
pub const CMD_BROWSE: u8 = 2;
pub const CMD_SEND: u8 = 3;
pub const CMD_RESPOND: u8 = 4;
pub const CMD_DISCONNECT: u8 = 5;

/// Transport command waiting for the host.
#[derive(Debug, Clone, Eq, PartialEq)]
enum HostCommand {
    Advertise(ServiceTag),
    Browse(ServiceTag),
    Send(Vec<u8>, Vec<PeerId>, Reliability),
    Respond(PeerId, bool),
    Disconnect,
}

impl HostCommand {
    /// Layout: 1 byte kind, then
    /// advertise/browse: tag bytes;
    /// send: 1 reliability, 4 count (LE), count*16 peer ids, payload;
    /// respond: 16 peer id, 1 accept;
    /// disconnect: nothing.
    fn encode(&self) -> Vec<u8> {
        match self {
            HostCommand::Advertise(tag) => {
                let mut out = vec![CMD_ADVERTISE];
                out.extend_from_slice(tag.as_str().as_bytes());
                out
            }
            HostCommand::Browse(tag) => {
                let mut out = vec![CMD_BROWSE];
                out.extend_from_slice(tag.as_str().as_bytes());
                out
            }
            HostCommand::Send(payload, peers, reliability) => {
                let mut out = Vec::with_capacity(6 + peers.len() * 16 + payload.len());
                out.push(CMD_SEND);
                out.push(reliability.as_u8());
                out.extend_from_slice(&(peers.len() as u32).to_le_bytes());
                for p in peers {
                    out.extend_from_slice(p.as_bytes());
                }
                out.extend_from_slice(payload);
                out
            }
            HostCommand::Respond(peer, accept) => {
                let mut out = vec![CMD_RESPOND];
                out.extend_from_slice(peer.as_bytes());
                out.push(u8::from(*accept));
                out
            }
            HostCommand::Disconnect => vec![CMD_DISCONNECT],
        }
    }
}

#[derive(Default)]
struct HostState {
    commands: VecDeque<HostCommand>,
    refresh: bool,
    /// (title, message) in the order they were raised.
    alerts: VecDeque<(String, String)>,
}

type Shared = Arc<Mutex<HostState>>;

fn lock(state: &Shared) -> MutexGuard<'_, HostState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

struct HostTransport(Shared);

impl PeerTransport for HostTransport {
    fn advertise(&mut self, _identity: &LocalIdentity, tag: &ServiceTag) {
        lock(&self.0).commands.push_back(HostCommand::Advertise(tag.clone()));
    }

    fn browse_and_invite(&mut self, _identity: &LocalIdentity, tag: &ServiceTag) {
        lock(&self.0).commands.push_back(HostCommand::Browse(tag.clone()));
    }

    fn send(
        &mut self,
        payload: &[u8],
        peers: &[PeerId],
        reliability: Reliability,
    ) -> Result<(), TransportError> {
        // Delivery happens on the host; its failures never come back.
        lock(&self.0).commands.push_back(HostCommand::Send(
            payload.to_vec(),
            peers.to_vec(),
            reliability,
        ));
        Ok(())
    }

    fn respond_to_invitation(&mut self, peer: &PeerId, accept: bool) {
        lock(&self.0).commands.push_back(HostCommand::Respond(*peer, accept));
    }

    fn disconnect(&mut self) {
        lock(&self.0).commands.push_back(HostCommand::Disconnect);
    }
}

struct HostSurface(Shared);

impl UiSurface for HostSurface {
    fn messages_changed(&mut self, _log: &MessageLog) {
        lock(&self.0).refresh = true;
    }

    fn title_changed(&mut self, _title: &str) {
        lock(&self.0).refresh = true;
    }

    fn show_alert(&mut self, title: &str, message: &str) {
        lock(&self.0)
            .alerts
            .push_back((title.to_string(), message.to_string()));
    }
}

struct HostSession {
    controller: SessionController,
    state: Shared,
}

unsafe fn str_arg<'a>(ptr: *const u8, len: usize) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    std::str::from_utf8(slice::from_raw_parts(ptr, len)).ok()
}

unsafe fn peer_arg(peer_id_16: *const u8) -> PeerId {
    let mut id = [0u8; 16];
    id.copy_from_slice(slice::from_raw_parts(peer_id_16, 16));
    PeerId::from_bytes(id)
}

unsafe fn session<'a>(h: *mut c_void) -> &'a mut HostSession {
    &mut *(h as *mut HostSession)
}

/// Copy `bytes` to out_buf. Returns bytes written, or -1 if null or too small.
fn encode_alert(title: &str, message: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + title.len() + message.len());
    out.extend_from_slice(&(title.len() as u32).to_le_bytes());
    out.extend_from_slice(title.as_bytes());
    out.extend_from_slice(message.as_bytes());
    out
}

fn write_out(bytes: &[u8], out_buf: *mut u8, out_buf_len: usize) -> c_int {
    if out_buf.is_null() || bytes.len() > out_buf_len {
        return -1;
    }
    unsafe {
        out_buf.copy_from_nonoverlapping(bytes.as_ptr(), bytes.len());
    }
    bytes.len() as c_int
}

/// Create a session. `device_name` is the current device name (UTF-8). `settings_path` may be
/// null to keep the identity in memory only. `service_tag` may be null for the default.
/// Returns opaque handle or null on failure.
#[no_mangle]
pub extern "C" fn mpc_session_create(
    device_name: *const u8,
    device_name_len: usize,
    settings_path: *const u8,
    settings_path_len: usize,
    service_tag: *const u8,
    service_tag_len: usize,
) -> *mut c_void {
    let name = match unsafe { str_arg(device_name, device_name_len) } {
        Some(n) => n,
        None => return std::ptr::null_mut(),
    };
    let tag = if service_tag.is_null() {
        ServiceTag::default()
    } else {
        match unsafe { str_arg(service_tag, service_tag_len) }.map(ServiceTag::new) {
            Some(Ok(t)) => t,
            _ => return std::ptr::null_mut(),
        }
    };
    let identity = if settings_path.is_null() {
        IdentityStore::new(MemorySettings::new()).get_or_create_identity(name)
    } else {
        let path = match unsafe { str_arg(settings_path, settings_path_len) } {
            Some(p) => p,
            None => return std::ptr::null_mut(),
        };
        IdentityStore::new(FileSettings::open(path)).get_or_create_identity(name)
    };
    let identity = match identity {
        Ok(i) => i,
        Err(e) => {
            tracing::warn!(error = %e, "cannot persist identity");
            return std::ptr::null_mut();
        }
    };
    let state: Shared = Arc::new(Mutex::new(HostState::default()));
    let controller = SessionController::new(
        identity,
        tag,
        Box::new(HostTransport(state.clone())),
        Box::new(HostSurface(state.clone())),
    );
    Box::into_raw(Box::new(HostSession { controller, state })) as *mut c_void
}

/// Destroy session. No-op if h is null. Does not disconnect; call `mpc_session_teardown` first.
#[no_mangle]
pub extern "C" fn mpc_session_destroy(h: *mut c_void) {
    if h.is_null() {
        return;
    }
    let _ = unsafe { Box::from_raw(h as *mut HostSession) };
}

/// Local peer id (16 bytes). Returns 0 on success, -1 if h null or out_buf too small.
#[no_mangle]
pub extern "C" fn mpc_session_peer_id(h: *mut c_void, out_buf: *mut u8, out_len: usize) -> c_int {
    if h.is_null() || out_buf.is_null() || out_len < 16 {
        return -1;
    }
    let s = unsafe { session(h) };
    let id = s.controller.identity().peer_id();
    unsafe {
        out_buf.copy_from_nonoverlapping(id.as_bytes().as_ptr(), 16);
    }
    0
}

/// Start advertising (queues an advertise command) and publish the title.
#[no_mangle]
pub extern "C" fn mpc_session_start(h: *mut c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let s = unsafe { session(h) };
    s.controller.start();
    0
}

/// Peer state changed. state: 0 connecting, 1 connected, 2 disconnected.
#[no_mangle]
pub extern "C" fn mpc_session_peer_state_changed(
    h: *mut c_void,
    peer_id_16: *const u8,
    state: u8,
) -> c_int {
    if h.is_null() || peer_id_16.is_null() {
        return -1;
    }
    let state = match PeerState::from_u8(state) {
        Some(s) => s,
        None => return -1,
    };
    let peer = unsafe { peer_arg(peer_id_16) };
    let s = unsafe { session(h) };
    s.controller.on_peer_state_changed(peer, state);
    0
}

/// Data received from a peer. Returns 1 if a message was appended, 0 if dropped, -1 on error.
#[no_mangle]
pub extern "C" fn mpc_session_data_received(
    h: *mut c_void,
    peer_id_16: *const u8,
    data: *const u8,
    data_len: usize,
) -> c_int {
    if h.is_null() || peer_id_16.is_null() || (data.is_null() && data_len > 0) {
        return -1;
    }
    let peer = unsafe { peer_arg(peer_id_16) };
    let bytes: &[u8] = if data_len == 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(data, data_len) }
    };
    c_int::from(unsafe { session(h) }.controller.on_data_received(bytes, peer))
}

/// Invitation from a peer. Always accepted (queues a respond command).
#[no_mangle]
pub extern "C" fn mpc_session_invitation_received(h: *mut c_void, peer_id_16: *const u8) -> c_int {
    if h.is_null() || peer_id_16.is_null() {
        return -1;
    }
    let peer = unsafe { peer_arg(peer_id_16) };
    let s = unsafe { session(h) };
    s.controller.on_invitation_received(peer);
    0
}

/// Advertising failed; message is a UTF-8 description (may be null). Raises an alert.
#[no_mangle]
pub extern "C" fn mpc_session_advertising_failed(
    h: *mut c_void,
    message: *const u8,
    message_len: usize,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let reason = unsafe { str_arg(message, message_len) }.unwrap_or("advertising failed");
    let s = unsafe { session(h) };
    s.controller.on_advertising_failed(reason);
    0
}

/// Send a message typed by the user. Returns 1 if sent, 0 if blank, -1 on error.
#[no_mangle]
pub extern "C" fn mpc_session_send(h: *mut c_void, text: *const u8, text_len: usize) -> c_int {
    if h.is_null() {
        return -1;
    }
    let text = match unsafe { str_arg(text, text_len) } {
        Some(t) => t,
        None => return -1,
    };
    c_int::from(unsafe { session(h) }.controller.send_message(text))
}

#[no_mangle]
pub extern "C" fn mpc_session_clear(h: *mut c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let s = unsafe { session(h) };
    s.controller.clear_messages();
    0
}

/// Queue a browse command for the host's browser UI.
#[no_mangle]
pub extern "C" fn mpc_session_browse(h: *mut c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let s = unsafe { session(h) };
    s.controller.browse();
    0
}

/// UI went away: queue a disconnect command.
#[no_mangle]
pub extern "C" fn mpc_session_teardown(h: *mut c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let s = unsafe { session(h) };
    s.controller.teardown();
    0
}

/// Number of messages in the log, or -1 if h null.
#[no_mangle]
pub extern "C" fn mpc_session_message_count(h: *mut c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let s = unsafe { session(h) };
    s.controller.messages().len() as c_int
}

/// Message text at index (UTF-8) into out_buf; out_origin gets 0 local, 1 remote (may be null).
/// Returns bytes written, or -1 on bad index or small buffer.
#[no_mangle]
pub extern "C" fn mpc_session_message_at(
    h: *mut c_void,
    index: usize,
    out_buf: *mut u8,
    out_buf_len: usize,
    out_origin: *mut u8,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let s = unsafe { session(h) };
    let msg = match s.controller.messages().get(index) {
        Some(m) => m,
        None => return -1,
    };
    let n = write_out(msg.text.as_bytes(), out_buf, out_buf_len);
    if n >= 0 && !out_origin.is_null() {
        let origin = match msg.origin {
            Origin::Local => 0,
            Origin::Remote(_) => 1,
        };
        unsafe {
            *out_origin = origin;
        }
    }
    n
}

/// Title reflecting peer count (UTF-8). Returns bytes written or -1.
#[no_mangle]
pub extern "C" fn mpc_session_title(h: *mut c_void, out_buf: *mut u8, out_buf_len: usize) -> c_int {
    if h.is_null() {
        return -1;
    }
    let title = unsafe { session(h) }.controller.peer_count_summary();
    write_out(title.as_bytes(), out_buf, out_buf_len)
}

/// Returns 1 (and clears the flag) if the log or title changed since the last call, else 0.
#[no_mangle]
pub extern "C" fn mpc_session_take_refresh(h: *mut c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let s = unsafe { session(h) };
    let mut st = lock(&s.state);
    c_int::from(std::mem::take(&mut st.refresh))
}

/// Pop the oldest pending alert. Layout: 4 title length (LE), UTF-8 title, UTF-8 message.
/// Alerts queue up until taken. Returns bytes written, 0 if none, -1 if out_buf too small
/// (the alert stays pending).
#[no_mangle]
pub extern "C" fn mpc_session_take_alert(h: *mut c_void, out_buf: *mut u8, out_buf_len: usize) -> c_int {
    if h.is_null() {
        return -1;
    }
    let s = unsafe { session(h) };
    let mut st = lock(&s.state);
    let bytes = match st.alerts.front() {
        Some((title, message)) => encode_alert(title, message),
        None => return 0,
    };
    let n = write_out(&bytes, out_buf, out_buf_len);
    if n >= 0 {
        st.alerts.pop_front();
    }
    n
}

/// Pop the next transport command for the host to execute (layout on `HostCommand::encode`).
/// Returns bytes written, 0 if none, -1 if out_buf too small (the command stays queued).
#[no_mangle]
pub extern "C" fn mpc_session_next_command(
    h: *mut c_void,
    out_buf: *mut u8,
    out_buf_len: usize,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let s = unsafe { session(h) };
    let mut st = lock(&s.state);
    let bytes = match st.commands.front() {
        Some(cmd) => cmd.encode(),
        None => return 0,
    };
    let n = write_out(&bytes, out_buf, out_buf_len);
    if n >= 0 {
        st.commands.pop_front();
    }
    n
}
