//! Transport layer: HTTP middleware that runs the flow-control filter in
//! front of every proxied request.

pub mod http;
