//! `SessionToken` issuance: 256-bit random, base64-encoded, bound to
//! `(sessionId, clientId)` at issuance.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

use veilshare_protocol::SessionToken;

pub fn issue() -> SessionToken {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    SessionToken(URL_SAFE_NO_PAD.encode(bytes))
}
