//! Request signing for the appliance management API.
//!
//! Every call carries a `ClientAuth` structure whose `hash` is the
//! lowercase hex MD5 of the concatenation of: client id, user id,
//! method name, the method's simple arguments in declaration order,
//! the shared secret, and the unix time floored to a 600 s boundary.
//! The appliance tolerates clock skew up to that boundary; beyond it
//! authentication fails.

use md5::{Digest, Md5};
use serde::Serialize;

/// Signature time granularity mandated by the appliance.
pub const SIGNATURE_TIME_STEP_SECS: u64 = 600;

/// Authentication block sent with every API call.
#[derive(Debug, Clone, Serialize)]
pub struct ClientAuth {
    pub client_id: u64,
    pub user_id: u64,
    pub hash: String,
}

/// Computes the call signature for the given unix time.
#[must_use]
pub fn signature(
    client_id: u64,
    user_id: u64,
    method: &str,
    simple_args: &str,
    secret_key: &str,
    unix_time_secs: u64,
) -> String {
    let window = unix_time_secs - unix_time_secs % SIGNATURE_TIME_STEP_SECS;
    let message = format!("{client_id}{user_id}{method}{simple_args}{secret_key}{window}");
    hex::encode(Md5::digest(message.as_bytes()))
}

/// Builds the auth block for one call at the given unix time.
#[must_use]
pub fn client_auth(
    client_id: u64,
    user_id: u64,
    method: &str,
    simple_args: &str,
    secret_key: &str,
    unix_time_secs: u64,
) -> ClientAuth {
    ClientAuth {
        client_id,
        user_id,
        hash: signature(
            client_id,
            user_id,
            method,
            simple_args,
            secret_key,
            unix_time_secs,
        ),
    }
}
